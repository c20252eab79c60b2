use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::core::error::ApiError;
use crate::core::models::{
  Album, AlbumSort, Artist, ArtistDetail, ArtistSongOrder, Episode, ListItem, Page, Playlist,
  Podcast, SearchType, Song,
};
use crate::core::snapshot::CategoryId;

/// The remote catalog. Implementations own transport, auth and timeouts.
/// A rejected offset must surface as [`ApiError::BadParameter`] or carry a
/// recognizable message.
#[async_trait]
pub trait ContentApi: Send + Sync {
  fn current_user_id(&self) -> Option<u64>;

  async fn get_album_songs(&self, album_id: &str) -> Result<Vec<Song>>;
  /// All albums of an artist in ascending release order.
  async fn get_artist_albums(&self, artist_id: u64) -> Result<Vec<Album>>;
  async fn get_artist_detail(&self, artist_id: u64) -> Result<ArtistDetail>;
  async fn get_artist_songs(
    &self,
    artist_id: u64,
    limit: usize,
    offset: usize,
    order: ArtistSongOrder,
  ) -> Result<Page<Song>>;
  async fn get_user_playlists(&self, user_id: u64, limit: usize, offset: usize)
    -> Result<Page<Playlist>>;
  async fn get_user_albums(&self, limit: usize, offset: usize) -> Result<Page<Album>>;
  async fn get_subscribed_podcasts(&self, limit: usize, offset: usize) -> Result<Page<Podcast>>;
  async fn get_artist_subscriptions(&self, limit: usize, offset: usize) -> Result<Page<Artist>>;
  async fn get_user_liked_song_ids(&self, user_id: u64) -> Result<Vec<String>>;

  async fn get_artist_top_songs(&self, artist_id: u64) -> Result<Vec<Song>>;
  async fn get_artist_album_page(
    &self,
    artist_id: u64,
    limit: usize,
    offset: usize,
    sort: AlbumSort,
  ) -> Result<Page<Album>>;
  async fn get_playlist_songs(&self, playlist_id: &str) -> Result<Vec<Song>>;
  async fn search(
    &self,
    search_type: SearchType,
    keyword: &str,
    limit: usize,
    offset: usize,
  ) -> Result<Page<ListItem>>;
  async fn get_podcast_episodes(
    &self,
    radio_id: u64,
    limit: usize,
    offset: usize,
    ascending: bool,
  ) -> Result<Page<Episode>>;
  async fn get_artists_by_category(
    &self,
    type_code: i32,
    area_code: i32,
    limit: usize,
    offset: usize,
  ) -> Result<Page<Artist>>;
  async fn get_albums_by_category(
    &self,
    period_code: i32,
    area_code: i32,
    limit: usize,
    offset: usize,
  ) -> Result<Page<Album>>;
  async fn get_category_page(
    &self,
    category: &CategoryId,
    limit: usize,
    offset: usize,
  ) -> Result<Page<ListItem>>;
  async fn get_song(&self, song_id: &str) -> Result<Song>;
}

/// Share of network bandwidth currently available to background work, 0.0 to 1.0.
pub trait BandwidthMonitor: Send + Sync {
  fn download_allocation(&self) -> f64;
}

/// Reports a fixed allocation. Used when no download manager is attached.
pub struct FixedBandwidth(pub f64);

impl BandwidthMonitor for FixedBandwidth {
  fn download_allocation(&self) -> f64 {
    self.0
  }
}

/// Races `fut` against `token`, turning cancellation into [`ApiError::Cancelled`].
pub async fn with_cancel<T, F>(token: &CancellationToken, fut: F) -> Result<T>
where
  F: Future<Output = Result<T>>,
{
  if token.is_cancelled() {
    return Err(ApiError::Cancelled.into());
  }
  tokio::select! {
    _ = token.cancelled() => Err(ApiError::Cancelled.into()),
    result = fut => result,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::error::is_cancelled;
  use std::time::Duration;

  #[tokio::test]
  async fn test_with_cancel_passes_result_through() {
    let token = CancellationToken::new();
    let value = with_cancel(&token, async { Ok::<_, anyhow::Error>(5) }).await;
    assert_eq!(value.unwrap(), 5);
  }

  #[tokio::test]
  async fn test_with_cancel_interrupts_pending_work() {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(10)).await;
      trigger.cancel();
    });
    let result = with_cancel(&token, async {
      tokio::time::sleep(Duration::from_secs(30)).await;
      Ok::<_, anyhow::Error>(())
    })
    .await;
    assert!(is_cancelled(&result.unwrap_err()));
  }

  #[tokio::test]
  async fn test_with_cancel_checks_token_first() {
    let token = CancellationToken::new();
    token.cancel();
    let result = with_cancel(&token, async { Ok::<_, anyhow::Error>(1) }).await;
    assert!(result.is_err());
  }
}
