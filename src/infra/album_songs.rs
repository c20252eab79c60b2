use anyhow::Result;
use log::{debug, warn};
use parking_lot::Mutex;
use std::{
  collections::{HashMap, VecDeque},
  sync::Arc,
};
use tokio_util::sync::CancellationToken;

use super::api::{with_cancel, ContentApi};
use super::retry::{fetch_with_retry, RetryPolicy};
use crate::core::error::is_cancelled;
use crate::core::keyed_lock::KeyedLock;
use crate::core::models::Song;

#[derive(Default)]
struct Entries {
  songs: HashMap<String, Arc<Vec<Song>>>,
  /// Insertion order, oldest first.
  order: VecDeque<String>,
}

/// Songs per album id, fetched at most once at a time per album.
pub struct AlbumSongsCache {
  api: Arc<dyn ContentApi>,
  entries: Mutex<Entries>,
  locks: KeyedLock,
  limit: usize,
  retry: RetryPolicy,
}

impl AlbumSongsCache {
  pub fn new(api: Arc<dyn ContentApi>, limit: usize, retry: RetryPolicy) -> Self {
    Self {
      api,
      entries: Mutex::new(Entries::default()),
      locks: KeyedLock::new(),
      limit: limit.max(1),
      retry,
    }
  }

  pub fn cached(&self, album_id: &str) -> Option<Arc<Vec<Song>>> {
    self.entries.lock().songs.get(album_id).cloned()
  }

  pub fn len(&self) -> usize {
    self.entries.lock().songs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Returns the album's songs. An album that keeps failing is remembered as
  /// empty so it is not hammered again. Only cancellation is reported as an error.
  pub async fn get_songs(
    &self,
    album_id: &str,
    token: &CancellationToken,
  ) -> Result<Arc<Vec<Song>>> {
    if let Some(songs) = self.cached(album_id) {
      return Ok(songs);
    }

    let _guard = with_cancel(token, async { Ok(self.locks.lock(album_id).await) }).await?;
    if let Some(songs) = self.cached(album_id) {
      return Ok(songs);
    }

    let label = format!("album {} songs", album_id);
    let songs = match fetch_with_retry(&label, self.retry, token, || {
      self.api.get_album_songs(album_id)
    })
    .await
    {
      Ok(songs) => songs,
      Err(e) if is_cancelled(&e) => return Err(e),
      Err(e) => {
        warn!("[AlbumSongs] giving up on album {}: {}", album_id, e);
        Vec::new()
      }
    };

    let songs = Arc::new(songs);
    self.store(album_id, Arc::clone(&songs));
    Ok(songs)
  }

  fn store(&self, album_id: &str, songs: Arc<Vec<Song>>) {
    let mut entries = self.entries.lock();
    if entries.songs.insert(album_id.to_string(), songs).is_none() {
      entries.order.push_back(album_id.to_string());
    }
    while entries.songs.len() > self.limit {
      let Some(oldest) = entries.order.pop_front() else {
        break;
      };
      debug!("[AlbumSongs] evicting album {}", oldest);
      entries.songs.remove(&oldest);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::infra::fixture::tests::big_artist;
  use crate::infra::fixture::FixtureCatalog;
  use std::time::Duration;

  fn quick_retry() -> RetryPolicy {
    RetryPolicy {
      max_attempts: 3,
      base_delay: Duration::from_millis(1),
    }
  }

  #[tokio::test]
  async fn test_concurrent_requests_share_one_fetch() {
    let catalog =
      Arc::new(FixtureCatalog::new(big_artist(30)).with_latency(Duration::from_millis(20)));
    let cache = Arc::new(AlbumSongsCache::new(catalog.clone(), 16, quick_retry()));
    let token = CancellationToken::new();

    let requests = (0..8).map(|_| cache.get_songs("a1", &token));
    let results = futures::future::join_all(requests).await;

    for songs in results {
      assert_eq!(songs.unwrap().len(), 10);
    }
    assert_eq!(catalog.album_fetch_count("a1"), 1);
  }

  #[tokio::test]
  async fn test_failing_album_is_cached_empty() {
    let mut data = big_artist(20);
    data.failing_albums.insert("a0".to_string());
    let catalog = Arc::new(FixtureCatalog::new(data));
    let cache = AlbumSongsCache::new(catalog.clone(), 16, quick_retry());
    let token = CancellationToken::new();

    assert!(cache.get_songs("a0", &token).await.unwrap().is_empty());
    assert!(cache.get_songs("a0", &token).await.unwrap().is_empty());
    assert_eq!(catalog.album_fetch_count("a0"), 3);
  }

  #[tokio::test]
  async fn test_evicts_oldest_first() {
    let catalog = Arc::new(FixtureCatalog::new(big_artist(40)));
    let cache = AlbumSongsCache::new(catalog, 2, quick_retry());
    let token = CancellationToken::new();

    for id in ["a0", "a1", "a2"] {
      cache.get_songs(id, &token).await.unwrap();
    }
    assert_eq!(cache.len(), 2);
    assert!(cache.cached("a0").is_none());
    assert!(cache.cached("a2").is_some());
  }

  #[tokio::test]
  async fn test_cancelled_fetch_stores_nothing() {
    let catalog = Arc::new(FixtureCatalog::new(big_artist(10)).with_latency(Duration::from_secs(30)));
    let cache = AlbumSongsCache::new(catalog, 16, quick_retry());
    let token = CancellationToken::new();
    token.cancel();

    let err = cache.get_songs("a0", &token).await.unwrap_err();
    assert!(is_cancelled(&err));
    assert!(cache.cached("a0").is_none());
  }
}
