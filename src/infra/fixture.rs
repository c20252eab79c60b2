//! In-memory catalog loaded from JSON
//!
//! Reproduces the upstream quirks the core has to cope with: declared totals
//! larger than what can be served, out-of-range offsets that either fail with a
//! parameter error or return an empty page, and albums whose song listing
//! always fails.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::{
  collections::{HashMap, HashSet},
  path::Path,
  time::Duration,
};

use super::api::ContentApi;
use crate::core::error::ApiError;
use crate::core::models::{
  Album, AlbumSort, Artist, ArtistDetail, ArtistSongOrder, Episode, ListItem, Page, Playlist,
  Podcast, SearchType, Song,
};
use crate::core::snapshot::CategoryId;

/// What upstream does when asked for an offset past the servable limit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowMode {
  #[default]
  BadParameter,
  EmptyPage,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FixtureAlbum {
  pub id: String,
  pub name: String,
  pub artist_id: u64,
  #[serde(default)]
  pub publish_time: i64,
  #[serde(default)]
  pub song_ids: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FixtureArtist {
  pub id: u64,
  pub name: String,
  /// Popularity order for the `hot` listing. Defaults to catalog order.
  #[serde(default)]
  pub hot_song_ids: Vec<String>,
  /// Song count reported by the detail endpoint, when it disagrees with reality.
  #[serde(default)]
  pub declared_song_count: Option<usize>,
  #[serde(default = "any_code")]
  pub type_code: i32,
  #[serde(default = "any_code")]
  pub area_code: i32,
}

fn any_code() -> i32 {
  -1
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FixturePlaylist {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub creator_id: u64,
  #[serde(default)]
  pub song_ids: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FixturePodcast {
  pub id: u64,
  pub name: String,
  #[serde(default)]
  pub episodes: Vec<Episode>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FixtureLibrary {
  #[serde(default)]
  pub liked_song_ids: Vec<String>,
  /// Owned and subscribed playlists together, as upstream lists them.
  #[serde(default)]
  pub playlist_ids: Vec<String>,
  #[serde(default)]
  pub album_ids: Vec<String>,
  #[serde(default)]
  pub artist_ids: Vec<u64>,
  #[serde(default)]
  pub podcast_ids: Vec<u64>,
  #[serde(default)]
  pub cloud_song_ids: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CatalogData {
  #[serde(default)]
  pub user_id: Option<u64>,
  #[serde(default)]
  pub songs: Vec<Song>,
  #[serde(default)]
  pub albums: Vec<FixtureAlbum>,
  #[serde(default)]
  pub artists: Vec<FixtureArtist>,
  #[serde(default)]
  pub playlists: Vec<FixturePlaylist>,
  #[serde(default)]
  pub podcasts: Vec<FixturePodcast>,
  #[serde(default)]
  pub library: FixtureLibrary,
  #[serde(default)]
  pub failing_albums: HashSet<String>,
  /// Offsets at or past this limit are never served, whatever the declared total.
  #[serde(default)]
  pub servable_limit: Option<usize>,
  #[serde(default)]
  pub overflow: OverflowMode,
}

pub struct FixtureCatalog {
  data: CatalogData,
  latency: Duration,
  album_fetches: Mutex<HashMap<String, usize>>,
  request_log: Mutex<Vec<String>>,
}

impl FixtureCatalog {
  pub fn new(data: CatalogData) -> Self {
    Self {
      data,
      latency: Duration::ZERO,
      album_fetches: Mutex::new(HashMap::new()),
      request_log: Mutex::new(Vec::new()),
    }
  }

  pub fn from_json(json: &str) -> Result<Self> {
    let data: CatalogData = serde_json::from_str(json)?;
    Ok(Self::new(data))
  }

  pub fn load(path: &Path) -> Result<Self> {
    let json = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read catalog fixture {}", path.display()))?;
    Self::from_json(&json)
  }

  /// Delays every call, so tests can overlap requests.
  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = latency;
    self
  }

  pub fn album_fetch_count(&self, album_id: &str) -> usize {
    self
      .album_fetches
      .lock()
      .get(album_id)
      .copied()
      .unwrap_or(0)
  }

  /// Every paged request as `operation:offset`, in call order.
  pub fn requests(&self) -> Vec<String> {
    self.request_log.lock().clone()
  }

  async fn simulate_latency(&self) {
    if !self.latency.is_zero() {
      tokio::time::sleep(self.latency).await;
    }
  }

  fn log_request(&self, operation: &str, offset: usize) {
    self
      .request_log
      .lock()
      .push(format!("{}:{}", operation, offset));
  }

  fn song(&self, id: &str) -> Option<Song> {
    self.data.songs.iter().find(|song| song.id == id).cloned()
  }

  fn songs(&self, ids: &[String]) -> Vec<Song> {
    ids.iter().filter_map(|id| self.song(id)).collect()
  }

  fn album(&self, fixture: &FixtureAlbum) -> Album {
    Album {
      id: fixture.id.clone(),
      name: fixture.name.clone(),
      artist: self
        .artist(fixture.artist_id)
        .map(|artist| artist.name.clone())
        .unwrap_or_default(),
      publish_time: fixture.publish_time,
      is_subscribed: false,
    }
  }

  fn artist(&self, artist_id: u64) -> Option<&FixtureArtist> {
    self.data.artists.iter().find(|artist| artist.id == artist_id)
  }

  fn artist_model(fixture: &FixtureArtist) -> Artist {
    Artist {
      id: fixture.id,
      name: fixture.name.clone(),
      is_subscribed: false,
    }
  }

  fn playlist_model(fixture: &FixturePlaylist) -> Playlist {
    Playlist {
      id: fixture.id.clone(),
      name: fixture.name.clone(),
      creator_id: fixture.creator_id,
      is_subscribed: false,
      is_owned: false,
    }
  }

  fn podcast_model(fixture: &FixturePodcast) -> Podcast {
    Podcast {
      id: fixture.id,
      name: fixture.name.clone(),
      is_subscribed: false,
    }
  }

  /// Albums of an artist, oldest first.
  fn artist_albums_ascending(&self, artist_id: u64) -> Vec<&FixtureAlbum> {
    let mut albums: Vec<&FixtureAlbum> = self
      .data
      .albums
      .iter()
      .filter(|album| album.artist_id == artist_id)
      .collect();
    albums.sort_by_key(|album| album.publish_time);
    albums
  }

  fn artist_song_ids(&self, artist_id: u64, order: ArtistSongOrder) -> Vec<String> {
    let mut seen = HashSet::new();
    let from_albums = |albums: Vec<&FixtureAlbum>| -> Vec<String> {
      albums
        .into_iter()
        .flat_map(|album| album.song_ids.iter().cloned())
        .collect()
    };
    let ids = match order {
      ArtistSongOrder::Hot => match self.artist(artist_id) {
        Some(artist) if !artist.hot_song_ids.is_empty() => artist.hot_song_ids.clone(),
        _ => from_albums(self.artist_albums_ascending(artist_id)),
      },
      ArtistSongOrder::Time => {
        let mut albums = self.artist_albums_ascending(artist_id);
        albums.reverse();
        from_albums(albums)
      }
    };
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
  }

  fn serve_page<T: Clone>(
    &self,
    operation: &str,
    items: &[T],
    limit: usize,
    offset: usize,
    declared_total: usize,
  ) -> Result<Page<T>> {
    self.log_request(operation, offset);
    let servable = self
      .data
      .servable_limit
      .map(|limit| limit.min(items.len()))
      .unwrap_or(items.len());
    // An explicit limit of 0 refuses even the first page.
    let refused = offset > 0 || self.data.servable_limit == Some(0);
    if offset >= servable && refused {
      return match self.data.overflow {
        OverflowMode::BadParameter => {
          Err(ApiError::BadParameter(format!("{} offset {} out of range", operation, offset)).into())
        }
        OverflowMode::EmptyPage => Ok(Page::new(Vec::new(), declared_total, false)),
      };
    }
    let end = (offset + limit).min(servable);
    let page_items = items[offset.min(end)..end].to_vec();
    Ok(Page::new(page_items, declared_total, end < declared_total))
  }

  fn require_user(&self) -> Result<u64> {
    self
      .data
      .user_id
      .ok_or_else(|| ApiError::NotLoggedIn.into())
  }
}

#[async_trait]
impl ContentApi for FixtureCatalog {
  fn current_user_id(&self) -> Option<u64> {
    self.data.user_id
  }

  async fn get_album_songs(&self, album_id: &str) -> Result<Vec<Song>> {
    *self
      .album_fetches
      .lock()
      .entry(album_id.to_string())
      .or_insert(0) += 1;
    self.simulate_latency().await;
    if self.data.failing_albums.contains(album_id) {
      return Err(ApiError::Upstream(format!("album {} unavailable", album_id)).into());
    }
    let album = self
      .data
      .albums
      .iter()
      .find(|album| album.id == album_id)
      .ok_or_else(|| ApiError::NotFound(format!("album {}", album_id)))?;
    Ok(
      self
        .songs(&album.song_ids)
        .into_iter()
        .map(|mut song| {
          song.album_id = album.id.clone();
          song
        })
        .collect(),
    )
  }

  async fn get_artist_albums(&self, artist_id: u64) -> Result<Vec<Album>> {
    self.simulate_latency().await;
    Ok(
      self
        .artist_albums_ascending(artist_id)
        .into_iter()
        .map(|album| self.album(album))
        .collect(),
    )
  }

  async fn get_artist_detail(&self, artist_id: u64) -> Result<ArtistDetail> {
    self.simulate_latency().await;
    let artist = self
      .artist(artist_id)
      .ok_or_else(|| ApiError::NotFound(format!("artist {}", artist_id)))?;
    let actual = self.artist_song_ids(artist_id, ArtistSongOrder::Hot).len();
    Ok(ArtistDetail {
      id: artist.id,
      name: artist.name.clone(),
      music_count: artist.declared_song_count.unwrap_or(actual),
      album_count: self.artist_albums_ascending(artist_id).len(),
    })
  }

  async fn get_artist_songs(
    &self,
    artist_id: u64,
    limit: usize,
    offset: usize,
    order: ArtistSongOrder,
  ) -> Result<Page<Song>> {
    self.simulate_latency().await;
    let songs = self.songs(&self.artist_song_ids(artist_id, order));
    let declared = self
      .artist(artist_id)
      .and_then(|artist| artist.declared_song_count)
      .unwrap_or(songs.len())
      .max(songs.len());
    self.serve_page("artist_songs", &songs, limit, offset, declared)
  }

  async fn get_user_playlists(
    &self,
    user_id: u64,
    limit: usize,
    offset: usize,
  ) -> Result<Page<Playlist>> {
    self.simulate_latency().await;
    if self.data.user_id != Some(user_id) {
      return Err(anyhow!("playlists of user {} are private", user_id));
    }
    let playlists: Vec<Playlist> = self
      .data
      .library
      .playlist_ids
      .iter()
      .filter_map(|id| self.data.playlists.iter().find(|p| &p.id == id))
      .map(Self::playlist_model)
      .collect();
    let total = playlists.len();
    self.serve_page("user_playlists", &playlists, limit, offset, total)
  }

  async fn get_user_albums(&self, limit: usize, offset: usize) -> Result<Page<Album>> {
    self.simulate_latency().await;
    self.require_user()?;
    let albums: Vec<Album> = self
      .data
      .library
      .album_ids
      .iter()
      .filter_map(|id| self.data.albums.iter().find(|a| &a.id == id))
      .map(|album| self.album(album))
      .collect();
    let total = albums.len();
    self.serve_page("user_albums", &albums, limit, offset, total)
  }

  async fn get_subscribed_podcasts(&self, limit: usize, offset: usize) -> Result<Page<Podcast>> {
    self.simulate_latency().await;
    self.require_user()?;
    let podcasts: Vec<Podcast> = self
      .data
      .library
      .podcast_ids
      .iter()
      .filter_map(|id| self.data.podcasts.iter().find(|p| &p.id == id))
      .map(Self::podcast_model)
      .collect();
    let total = podcasts.len();
    self.serve_page("subscribed_podcasts", &podcasts, limit, offset, total)
  }

  async fn get_artist_subscriptions(&self, limit: usize, offset: usize) -> Result<Page<Artist>> {
    self.simulate_latency().await;
    self.require_user()?;
    let artists: Vec<Artist> = self
      .data
      .library
      .artist_ids
      .iter()
      .filter_map(|id| self.artist(*id))
      .map(Self::artist_model)
      .collect();
    let total = artists.len();
    self.serve_page("artist_subscriptions", &artists, limit, offset, total)
  }

  async fn get_user_liked_song_ids(&self, user_id: u64) -> Result<Vec<String>> {
    self.simulate_latency().await;
    if self.data.user_id != Some(user_id) {
      return Err(ApiError::NotLoggedIn.into());
    }
    Ok(self.data.library.liked_song_ids.clone())
  }

  async fn get_artist_top_songs(&self, artist_id: u64) -> Result<Vec<Song>> {
    self.simulate_latency().await;
    let ids = self.artist_song_ids(artist_id, ArtistSongOrder::Hot);
    Ok(self.songs(&ids[..ids.len().min(50)]))
  }

  async fn get_artist_album_page(
    &self,
    artist_id: u64,
    limit: usize,
    offset: usize,
    sort: AlbumSort,
  ) -> Result<Page<Album>> {
    self.simulate_latency().await;
    let mut albums: Vec<Album> = self
      .artist_albums_ascending(artist_id)
      .into_iter()
      .map(|album| self.album(album))
      .collect();
    if sort == AlbumSort::Latest {
      albums.reverse();
    }
    let total = albums.len();
    self.serve_page("artist_albums", &albums, limit, offset, total)
  }

  async fn get_playlist_songs(&self, playlist_id: &str) -> Result<Vec<Song>> {
    self.simulate_latency().await;
    let playlist = self
      .data
      .playlists
      .iter()
      .find(|playlist| playlist.id == playlist_id)
      .ok_or_else(|| ApiError::NotFound(format!("playlist {}", playlist_id)))?;
    Ok(self.songs(&playlist.song_ids))
  }

  async fn search(
    &self,
    search_type: SearchType,
    keyword: &str,
    limit: usize,
    offset: usize,
  ) -> Result<Page<ListItem>> {
    self.simulate_latency().await;
    let needle = keyword.to_lowercase();
    let is_match = |name: &str| name.to_lowercase().contains(&needle);
    let items: Vec<ListItem> = match search_type {
      SearchType::Song => self
        .data
        .songs
        .iter()
        .filter(|song| is_match(&song.name))
        .cloned()
        .map(ListItem::Song)
        .collect(),
      SearchType::Album => self
        .data
        .albums
        .iter()
        .filter(|album| is_match(&album.name))
        .map(|album| ListItem::Album(self.album(album)))
        .collect(),
      SearchType::Artist => self
        .data
        .artists
        .iter()
        .filter(|artist| is_match(&artist.name))
        .map(|artist| ListItem::Artist(Self::artist_model(artist)))
        .collect(),
      SearchType::Playlist => self
        .data
        .playlists
        .iter()
        .filter(|playlist| is_match(&playlist.name))
        .map(|playlist| ListItem::Playlist(Self::playlist_model(playlist)))
        .collect(),
      SearchType::Podcast => self
        .data
        .podcasts
        .iter()
        .filter(|podcast| is_match(&podcast.name))
        .map(|podcast| ListItem::Podcast(Self::podcast_model(podcast)))
        .collect(),
    };
    let total = items.len();
    self.serve_page("search", &items, limit, offset, total)
  }

  async fn get_podcast_episodes(
    &self,
    radio_id: u64,
    limit: usize,
    offset: usize,
    ascending: bool,
  ) -> Result<Page<Episode>> {
    self.simulate_latency().await;
    let podcast = self
      .data
      .podcasts
      .iter()
      .find(|podcast| podcast.id == radio_id)
      .ok_or_else(|| ApiError::NotFound(format!("podcast {}", radio_id)))?;
    let mut episodes = podcast.episodes.clone();
    episodes.sort_by_key(|episode| episode.serial);
    if !ascending {
      episodes.reverse();
    }
    let total = episodes.len();
    self.serve_page("podcast", &episodes, limit, offset, total)
  }

  async fn get_artists_by_category(
    &self,
    type_code: i32,
    area_code: i32,
    limit: usize,
    offset: usize,
  ) -> Result<Page<Artist>> {
    self.simulate_latency().await;
    let artists: Vec<Artist> = self
      .data
      .artists
      .iter()
      .filter(|artist| artist.type_code == -1 || type_code == -1 || artist.type_code == type_code)
      .filter(|artist| artist.area_code == -1 || area_code == -1 || artist.area_code == area_code)
      .map(Self::artist_model)
      .collect();
    let total = artists.len();
    self.serve_page("artist_category_list", &artists, limit, offset, total)
  }

  async fn get_albums_by_category(
    &self,
    _period_code: i32,
    _area_code: i32,
    limit: usize,
    offset: usize,
  ) -> Result<Page<Album>> {
    self.simulate_latency().await;
    let mut albums: Vec<&FixtureAlbum> = self.data.albums.iter().collect();
    albums.sort_by_key(|album| std::cmp::Reverse(album.publish_time));
    let albums: Vec<Album> = albums.into_iter().map(|album| self.album(album)).collect();
    let total = albums.len();
    self.serve_page("new_albums", &albums, limit, offset, total)
  }

  async fn get_category_page(
    &self,
    category: &CategoryId,
    limit: usize,
    offset: usize,
  ) -> Result<Page<ListItem>> {
    self.simulate_latency().await;
    let items: Vec<ListItem> = match category {
      CategoryId::Toplist | CategoryId::HighQualityPlaylists | CategoryId::PlaylistCategory(_) => {
        self
          .data
          .playlists
          .iter()
          .map(|playlist| ListItem::Playlist(Self::playlist_model(playlist)))
          .collect()
      }
      CategoryId::PodcastCategory(_) => self
        .data
        .podcasts
        .iter()
        .map(|podcast| ListItem::Podcast(Self::podcast_model(podcast)))
        .collect(),
      CategoryId::NewSongs(_) => self.data.songs.iter().cloned().map(ListItem::Song).collect(),
      CategoryId::UserCloud => {
        self.require_user()?;
        self
          .songs(&self.data.library.cloud_song_ids)
          .into_iter()
          .map(ListItem::Song)
          .collect()
      }
    };
    let total = items.len();
    self.serve_page(&category.to_string(), &items, limit, offset, total)
  }

  async fn get_song(&self, song_id: &str) -> Result<Song> {
    self.simulate_latency().await;
    self
      .song(song_id)
      .ok_or_else(|| ApiError::NotFound(format!("song {}", song_id)).into())
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::core::error::is_bad_parameter_error;

  pub(crate) fn song(id: &str) -> Song {
    Song {
      id: id.to_string(),
      name: format!("Song {}", id),
      ..Default::default()
    }
  }

  pub(crate) fn album(id: &str, artist_id: u64, publish_time: i64, song_ids: &[&str]) -> FixtureAlbum {
    FixtureAlbum {
      id: id.to_string(),
      name: format!("Album {}", id),
      artist_id,
      publish_time,
      song_ids: song_ids.iter().map(|id| id.to_string()).collect(),
    }
  }

  pub(crate) fn artist(id: u64, name: &str) -> FixtureArtist {
    FixtureArtist {
      id,
      name: name.to_string(),
      type_code: -1,
      area_code: -1,
      ..Default::default()
    }
  }

  /// Artist 42 with `count` songs spread over albums of ten.
  pub(crate) fn big_artist(count: usize) -> CatalogData {
    let songs: Vec<Song> = (0..count).map(|i| song(&format!("s{}", i))).collect();
    let albums = songs
      .chunks(10)
      .enumerate()
      .map(|(i, chunk)| {
        let ids: Vec<&str> = chunk.iter().map(|song| song.id.as_str()).collect();
        album(&format!("a{}", i), 42, i as i64, &ids)
      })
      .collect();
    CatalogData {
      user_id: Some(1),
      songs,
      albums,
      artists: vec![artist(42, "Forty Two")],
      ..Default::default()
    }
  }

  #[tokio::test]
  async fn test_overflow_bad_parameter() {
    let mut data = big_artist(500);
    data.servable_limit = Some(300);
    let catalog = FixtureCatalog::new(data);
    let page = catalog
      .get_artist_songs(42, 100, 200, ArtistSongOrder::Hot)
      .await
      .unwrap();
    assert_eq!(page.items.len(), 100);
    assert_eq!(page.total, 500);
    let err = catalog
      .get_artist_songs(42, 100, 300, ArtistSongOrder::Hot)
      .await
      .unwrap_err();
    assert!(is_bad_parameter_error(&err));
  }

  #[tokio::test]
  async fn test_overflow_empty_page() {
    let mut data = big_artist(500);
    data.servable_limit = Some(300);
    data.overflow = OverflowMode::EmptyPage;
    let catalog = FixtureCatalog::new(data);
    let page = catalog
      .get_artist_songs(42, 100, 400, ArtistSongOrder::Hot)
      .await
      .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 500);
  }

  #[tokio::test]
  async fn test_parses_json_and_orders_albums() {
    let catalog = FixtureCatalog::from_json(
      r#"{
        "user_id": 1,
        "songs": [{"id": "x", "name": "X"}, {"id": "y", "name": "Y"}],
        "albums": [
          {"id": "new", "name": "New", "artist_id": 5, "publish_time": 20, "song_ids": ["y"]},
          {"id": "old", "name": "Old", "artist_id": 5, "publish_time": 10, "song_ids": ["x"]}
        ],
        "artists": [{"id": 5, "name": "Five"}],
        "overflow": "empty_page"
      }"#,
    )
    .unwrap();
    let albums = catalog.get_artist_albums(5).await.unwrap();
    let ids: Vec<&str> = albums.iter().map(|album| album.id.as_str()).collect();
    assert_eq!(ids, vec!["old", "new"]);
    let newest = catalog
      .get_artist_songs(5, 10, 0, ArtistSongOrder::Time)
      .await
      .unwrap();
    assert_eq!(newest.items[0].id, "y");
    assert_eq!(catalog.get_album_songs("old").await.unwrap()[0].album_id, "old");
    assert_eq!(catalog.album_fetch_count("old"), 1);
  }
}
