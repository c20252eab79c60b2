//! Incremental per-artist song index
//!
//! Materializes "the first N songs across an artist's whole catalog" by
//! walking the artist's albums in a fixed order and merging each album's
//! songs, skipping ids already seen. Entries are resumable: a later request
//! for more songs continues from the album cursor instead of starting over.

use anyhow::Result;
use futures::future::join_all;
use log::{debug, info};
use parking_lot::Mutex;
use std::{
  collections::{HashMap, HashSet},
  sync::Arc,
  time::Instant,
};
use tokio_util::sync::CancellationToken;

use super::album_songs::AlbumSongsCache;
use super::api::{with_cancel, ContentApi};
use crate::core::error::ApiError;
use crate::core::keyed_lock::KeyedLock;
use crate::core::models::{Album, Song};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexProgress {
  pub albums_processed: usize,
  pub album_count: usize,
  pub songs: usize,
}

pub type ProgressFn<'a> = dyn Fn(IndexProgress) + Send + Sync + 'a;

#[derive(Clone, Debug, PartialEq)]
pub struct IndexSnapshot {
  pub songs: Vec<Song>,
  pub is_complete: bool,
  pub albums_processed: usize,
  pub album_count: usize,
}

struct IndexEntry {
  albums: Option<Vec<Album>>,
  cursor: usize,
  songs: Vec<Song>,
  seen: HashSet<String>,
  complete: bool,
  last_access: Instant,
}

impl IndexEntry {
  fn new() -> Self {
    Self {
      albums: None,
      cursor: 0,
      songs: Vec::new(),
      seen: HashSet::new(),
      complete: false,
      last_access: Instant::now(),
    }
  }

  fn satisfies(&self, required: usize) -> bool {
    self.complete || self.songs.len() >= required
  }

  fn album_count(&self) -> usize {
    self.albums.as_ref().map_or(0, Vec::len)
  }

  fn snapshot(&self) -> IndexSnapshot {
    IndexSnapshot {
      songs: self.songs.clone(),
      is_complete: self.complete,
      albums_processed: self.cursor,
      album_count: self.album_count(),
    }
  }

  fn merge(&mut self, songs: &[Song]) {
    for song in songs {
      if self.seen.insert(song.id.clone()) {
        self.songs.push(song.clone());
      }
    }
  }
}

pub struct ArtistSongIndex {
  api: Arc<dyn ContentApi>,
  album_songs: Arc<AlbumSongsCache>,
  locks: KeyedLock,
  entries: Mutex<HashMap<String, Arc<Mutex<IndexEntry>>>>,
  limit: usize,
  concurrency: usize,
  progress_interval: usize,
}

impl ArtistSongIndex {
  pub fn new(
    api: Arc<dyn ContentApi>,
    album_songs: Arc<AlbumSongsCache>,
    limit: usize,
    concurrency: usize,
    progress_interval: usize,
  ) -> Self {
    Self {
      api,
      album_songs,
      locks: KeyedLock::new(),
      entries: Mutex::new(HashMap::new()),
      limit: limit.max(1),
      concurrency: concurrency.max(1),
      progress_interval: progress_interval.max(1),
    }
  }

  pub fn len(&self) -> usize {
    self.entries.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn contains(&self, key: &str) -> bool {
    self.entries.lock().contains_key(key)
  }

  /// Builds the index for `key` until it holds at least `required` songs or
  /// every album has been consumed. Concurrent callers for one key wait for
  /// each other; a cancelled build keeps everything merged so far.
  pub async fn ensure_index(
    &self,
    key: &str,
    artist_id: u64,
    newest_first: bool,
    required: usize,
    token: &CancellationToken,
    progress: Option<&ProgressFn<'_>>,
  ) -> Result<IndexSnapshot> {
    if let Some(snapshot) = self.satisfied(key, required) {
      return Ok(snapshot);
    }

    let _guard = with_cancel(token, async { Ok(self.locks.lock(key).await) }).await?;
    let entry = self.entry(key);

    let needs_albums = entry.lock().albums.is_none();
    if needs_albums {
      let mut albums = with_cancel(token, self.api.get_artist_albums(artist_id)).await?;
      if newest_first {
        albums.reverse();
      }
      info!(
        "[ArtistIndex] {} has {} albums (newest first: {})",
        key,
        albums.len(),
        newest_first
      );
      let mut entry = entry.lock();
      entry.complete = albums.is_empty();
      entry.albums = Some(albums);
    }

    loop {
      let batch: Vec<String> = {
        let entry = entry.lock();
        if entry.satisfies(required) {
          break;
        }
        let albums = entry.albums.as_deref().unwrap_or_default();
        let end = (entry.cursor + self.concurrency).min(albums.len());
        albums[entry.cursor..end]
          .iter()
          .map(|album| album.id.clone())
          .collect()
      };
      if token.is_cancelled() {
        return Err(ApiError::Cancelled.into());
      }

      let fetched = join_all(
        batch
          .iter()
          .map(|album_id| self.album_songs.get_songs(album_id, token)),
      )
      .await;
      // Failed albums come back empty; the only error left is cancellation,
      // and a partially fetched batch is not merged.
      let fetched = fetched.into_iter().collect::<Result<Vec<_>>>()?;

      let report = {
        let mut entry = entry.lock();
        let previous_cursor = entry.cursor;
        for songs in &fetched {
          entry.merge(songs);
        }
        entry.cursor += batch.len();
        let album_count = entry.album_count();
        if entry.cursor >= album_count {
          entry.complete = true;
        }
        let crossed_interval =
          previous_cursor / self.progress_interval != entry.cursor / self.progress_interval;
        (crossed_interval || entry.complete).then_some(IndexProgress {
          albums_processed: entry.cursor,
          album_count,
          songs: entry.songs.len(),
        })
      };
      if let Some(report) = report {
        debug!(
          "[ArtistIndex] {}: {}/{} albums, {} songs",
          key, report.albums_processed, report.album_count, report.songs
        );
        if let Some(progress) = progress {
          progress(report);
        }
      }
    }

    let mut entry = entry.lock();
    entry.last_access = Instant::now();
    Ok(entry.snapshot())
  }

  fn satisfied(&self, key: &str, required: usize) -> Option<IndexSnapshot> {
    let entry = self.entries.lock().get(key).cloned()?;
    let mut entry = entry.lock();
    if !entry.satisfies(required) {
      return None;
    }
    entry.last_access = Instant::now();
    Some(entry.snapshot())
  }

  fn entry(&self, key: &str) -> Arc<Mutex<IndexEntry>> {
    let mut entries = self.entries.lock();
    if let Some(entry) = entries.get(key) {
      return Arc::clone(entry);
    }
    let entry = Arc::new(Mutex::new(IndexEntry::new()));
    entries.insert(key.to_string(), Arc::clone(&entry));

    // Linear scan for the stalest entry; the table stays small.
    while entries.len() > self.limit {
      let oldest = entries
        .iter()
        .filter(|(k, _)| k.as_str() != key)
        .min_by_key(|(_, e)| e.lock().last_access)
        .map(|(k, _)| k.clone());
      let Some(oldest) = oldest else {
        break;
      };
      debug!("[ArtistIndex] evicting {}", oldest);
      entries.remove(&oldest);
    }
    entry
  }
}
