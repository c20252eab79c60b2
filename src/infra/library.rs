//! Liked / subscribed / owned membership for the signed-in user
//!
//! Each library kind is refreshed as a whole and swapped in under one lock, so
//! a reader sees either the previous set or the new one. Point updates after a
//! successful user action land in the same sets without waiting for the next
//! refresh.

use anyhow::Result;
use futures::future::join_all;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::{
  collections::{HashMap, HashSet},
  future::Future,
  sync::Arc,
  time::{Duration, Instant},
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::api::{with_cancel, BandwidthMonitor, ContentApi};
use crate::core::error::is_cancelled;
use crate::core::models::{Album, Artist, LibraryKind, ListItem, ListRow, Page, Playlist, Podcast, Song};

/// Upper bound on pages walked for one kind, in case upstream never runs dry.
const MAX_LIBRARY_PAGES: usize = 200;

pub type LibraryListener = Arc<dyn Fn(LibraryKind) + Send + Sync>;

#[derive(Clone, Copy, Debug)]
pub struct LibraryPageSizes {
  pub playlists: usize,
  pub albums: usize,
  pub podcasts: usize,
  pub artists: usize,
}

impl Default for LibraryPageSizes {
  fn default() -> Self {
    Self {
      playlists: 1000,
      albums: 100,
      podcasts: 300,
      artists: 200,
    }
  }
}

#[derive(Default)]
struct MembershipSets {
  liked_songs: HashSet<String>,
  subscribed_playlists: HashSet<String>,
  owned_playlists: HashSet<String>,
  subscribed_albums: HashSet<String>,
  subscribed_artists: HashSet<u64>,
  subscribed_podcasts: HashSet<u64>,
  refreshed_at: HashMap<LibraryKind, Instant>,
}

enum Fetched {
  Songs(HashSet<String>),
  Playlists {
    subscribed: HashSet<String>,
    owned: HashSet<String>,
  },
  Albums(HashSet<String>),
  Artists(HashSet<u64>),
  Podcasts(HashSet<u64>),
}

pub struct LibraryStateCache {
  api: Arc<dyn ContentApi>,
  sets: Mutex<MembershipSets>,
  freshness_window: Duration,
  bandwidth: Arc<dyn BandwidthMonitor>,
  concurrent_threshold: f64,
  page_sizes: LibraryPageSizes,
  listener: Mutex<Option<LibraryListener>>,
  session: CancellationToken,
  tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl LibraryStateCache {
  pub fn new(
    api: Arc<dyn ContentApi>,
    bandwidth: Arc<dyn BandwidthMonitor>,
    freshness_window: Duration,
    concurrent_threshold: f64,
    page_sizes: LibraryPageSizes,
  ) -> Self {
    Self {
      api,
      sets: Mutex::new(MembershipSets::default()),
      freshness_window,
      bandwidth,
      concurrent_threshold,
      page_sizes,
      listener: Mutex::new(None),
      session: CancellationToken::new(),
      tasks: Mutex::new(Vec::new()),
    }
  }

  /// Called after every refresh, and for fresh kinds on request, so the
  /// caller can re-annotate whatever is on screen.
  pub fn set_listener(&self, listener: LibraryListener) {
    *self.listener.lock() = Some(listener);
  }

  fn notify(&self, kind: LibraryKind) {
    let listener = self.listener.lock().clone();
    if let Some(listener) = listener {
      listener(kind);
    }
  }

  pub fn is_fresh(&self, kind: LibraryKind) -> bool {
    self
      .sets
      .lock()
      .refreshed_at
      .get(&kind)
      .is_some_and(|at| at.elapsed() < self.freshness_window)
  }

  pub fn refreshed_at(&self, kind: LibraryKind) -> Option<Instant> {
    self.sets.lock().refreshed_at.get(&kind).copied()
  }

  /// Number of ids held for a kind. Playlists count owned and subscribed.
  pub fn count(&self, kind: LibraryKind) -> usize {
    let sets = self.sets.lock();
    match kind {
      LibraryKind::Songs => sets.liked_songs.len(),
      LibraryKind::Playlists => sets.subscribed_playlists.len() + sets.owned_playlists.len(),
      LibraryKind::Albums => sets.subscribed_albums.len(),
      LibraryKind::Artists => sets.subscribed_artists.len(),
      LibraryKind::Podcasts => sets.subscribed_podcasts.len(),
    }
  }

  /// Fire-and-forget refresh. The task lives until it finishes or
  /// [`shutdown`](Self::shutdown) cancels it.
  pub fn request_refresh(self: &Arc<Self>, kind: LibraryKind, force: bool) {
    if !force && self.is_fresh(kind) {
      self.notify(kind);
      return;
    }
    let cache = Arc::clone(self);
    let token = self.session.child_token();
    let handle = tokio::spawn(async move {
      match cache.refresh_kind(kind, force, &token).await {
        Ok(_) => {}
        Err(e) if is_cancelled(&e) => debug!("[Library] {} refresh cancelled", kind.display_name()),
        Err(e) => warn!("[Library] {} refresh failed: {}", kind.display_name(), e),
      }
    });
    let mut tasks = self.tasks.lock();
    tasks.retain(|task| !task.is_finished());
    tasks.push(handle);
  }

  /// Refreshes several kinds, concurrently only when enough bandwidth is
  /// available so a running download is not starved.
  pub async fn refresh_all(
    &self,
    kinds: &[LibraryKind],
    force: bool,
    token: &CancellationToken,
  ) -> Result<()> {
    let mut targets: Vec<LibraryKind> = Vec::with_capacity(kinds.len());
    for kind in kinds {
      if !targets.contains(kind) {
        targets.push(*kind);
      }
    }

    let allocation = self.bandwidth.download_allocation();
    if targets.len() > 1 && allocation >= self.concurrent_threshold {
      debug!(
        "[Library] refreshing {} kinds concurrently (allocation {:.2})",
        targets.len(),
        allocation
      );
      let results = join_all(
        targets
          .iter()
          .map(|kind| self.refresh_kind(*kind, force, token)),
      )
      .await;
      for result in results {
        result?;
      }
    } else {
      for kind in targets {
        self.refresh_kind(kind, force, token).await?;
      }
    }
    Ok(())
  }

  /// Returns whether the set was replaced. Fetch failures are logged and
  /// leave the old set in place; only cancellation is returned as an error.
  pub async fn refresh_kind(
    &self,
    kind: LibraryKind,
    force: bool,
    token: &CancellationToken,
  ) -> Result<bool> {
    if !force && self.is_fresh(kind) {
      self.notify(kind);
      return Ok(false);
    }
    let Some(user_id) = self.api.current_user_id() else {
      debug!("[Library] not logged in, skipping {} refresh", kind.display_name());
      return Ok(false);
    };

    let fetched = match self.fetch(kind, user_id, token).await {
      Ok(fetched) => fetched,
      Err(e) if is_cancelled(&e) => return Err(e),
      Err(e) => {
        warn!("[Library] failed to refresh {}: {}", kind.display_name(), e);
        return Ok(false);
      }
    };

    {
      let mut sets = self.sets.lock();
      match fetched {
        Fetched::Songs(ids) => sets.liked_songs = ids,
        Fetched::Playlists { subscribed, owned } => {
          sets.subscribed_playlists = subscribed;
          sets.owned_playlists = owned;
        }
        Fetched::Albums(ids) => sets.subscribed_albums = ids,
        Fetched::Artists(ids) => sets.subscribed_artists = ids,
        Fetched::Podcasts(ids) => sets.subscribed_podcasts = ids,
      }
      sets.refreshed_at.insert(kind, Instant::now());
    }
    info!(
      "[Library] refreshed {} ({} ids)",
      kind.display_name(),
      self.count(kind)
    );
    self.notify(kind);
    Ok(true)
  }

  async fn fetch(&self, kind: LibraryKind, user_id: u64, token: &CancellationToken) -> Result<Fetched> {
    let api = &self.api;
    let sizes = self.page_sizes;
    Ok(match kind {
      LibraryKind::Songs => {
        let ids = with_cancel(token, api.get_user_liked_song_ids(user_id)).await?;
        Fetched::Songs(ids.into_iter().collect())
      }
      LibraryKind::Playlists => {
        let playlists: Vec<Playlist> = collect_pages(sizes.playlists, token, |offset| {
          api.get_user_playlists(user_id, sizes.playlists, offset)
        })
        .await?;
        let (owned, subscribed): (Vec<Playlist>, Vec<Playlist>) = playlists
          .into_iter()
          .partition(|playlist| playlist.creator_id == user_id);
        Fetched::Playlists {
          subscribed: subscribed.into_iter().map(|p| p.id).collect(),
          owned: owned.into_iter().map(|p| p.id).collect(),
        }
      }
      LibraryKind::Albums => {
        let albums: Vec<Album> = collect_pages(sizes.albums, token, |offset| {
          api.get_user_albums(sizes.albums, offset)
        })
        .await?;
        Fetched::Albums(albums.into_iter().map(|album| album.id).collect())
      }
      LibraryKind::Artists => {
        let artists: Vec<Artist> = collect_pages(sizes.artists, token, |offset| {
          api.get_artist_subscriptions(sizes.artists, offset)
        })
        .await?;
        Fetched::Artists(artists.into_iter().map(|artist| artist.id).collect())
      }
      LibraryKind::Podcasts => {
        let podcasts: Vec<Podcast> = collect_pages(sizes.podcasts, token, |offset| {
          api.get_subscribed_podcasts(sizes.podcasts, offset)
        })
        .await?;
        Fetched::Podcasts(podcasts.into_iter().map(|podcast| podcast.id).collect())
      }
    })
  }

  pub fn is_song_liked(&self, song: &mut Song) -> bool {
    if song.is_liked {
      return true;
    }
    let liked = self.sets.lock().liked_songs.contains(&song.id);
    song.is_liked = liked;
    liked
  }

  pub fn is_playlist_owned(&self, playlist: &mut Playlist) -> bool {
    if playlist.is_owned {
      return true;
    }
    let owned = self.api.current_user_id() == Some(playlist.creator_id)
      || self.sets.lock().owned_playlists.contains(&playlist.id);
    playlist.is_owned = owned;
    owned
  }

  /// An owned playlist is never reported as subscribed.
  pub fn is_playlist_subscribed(&self, playlist: &mut Playlist) -> bool {
    if self.is_playlist_owned(playlist) {
      playlist.is_subscribed = false;
      return false;
    }
    if playlist.is_subscribed {
      return true;
    }
    let subscribed = self.sets.lock().subscribed_playlists.contains(&playlist.id);
    playlist.is_subscribed = subscribed;
    subscribed
  }

  pub fn is_album_subscribed(&self, album: &mut Album) -> bool {
    if album.is_subscribed {
      return true;
    }
    let subscribed = self.sets.lock().subscribed_albums.contains(&album.id);
    album.is_subscribed = subscribed;
    subscribed
  }

  pub fn is_artist_subscribed(&self, artist: &mut Artist) -> bool {
    if artist.is_subscribed {
      return true;
    }
    let subscribed = self.sets.lock().subscribed_artists.contains(&artist.id);
    artist.is_subscribed = subscribed;
    subscribed
  }

  pub fn is_podcast_subscribed(&self, podcast: &mut Podcast) -> bool {
    if podcast.is_subscribed {
      return true;
    }
    let subscribed = self.sets.lock().subscribed_podcasts.contains(&podcast.id);
    podcast.is_subscribed = subscribed;
    subscribed
  }

  pub fn update_song_like(&self, song_id: &str, liked: bool) {
    toggle(&mut self.sets.lock().liked_songs, song_id.to_string(), liked);
  }

  pub fn update_playlist_subscription(&self, playlist_id: &str, subscribed: bool) {
    toggle(
      &mut self.sets.lock().subscribed_playlists,
      playlist_id.to_string(),
      subscribed,
    );
  }

  /// Taking ownership (e.g. after creating a playlist) also drops any subscription.
  pub fn update_playlist_ownership(&self, playlist_id: &str, owned: bool) {
    let mut sets = self.sets.lock();
    toggle(&mut sets.owned_playlists, playlist_id.to_string(), owned);
    if owned {
      sets.subscribed_playlists.remove(playlist_id);
    }
  }

  pub fn update_album_subscription(&self, album_id: &str, subscribed: bool) {
    toggle(
      &mut self.sets.lock().subscribed_albums,
      album_id.to_string(),
      subscribed,
    );
  }

  pub fn update_artist_subscription(&self, artist_id: u64, subscribed: bool) {
    toggle(&mut self.sets.lock().subscribed_artists, artist_id, subscribed);
  }

  pub fn update_podcast_subscription(&self, podcast_id: u64, subscribed: bool) {
    toggle(&mut self.sets.lock().subscribed_podcasts, podcast_id, subscribed);
  }

  /// Marks a kind stale so the next request refetches it.
  pub fn invalidate(&self, kind: LibraryKind) {
    self.sets.lock().refreshed_at.remove(&kind);
  }

  /// Forgets everything, e.g. on logout.
  pub fn invalidate_all(&self) {
    *self.sets.lock() = MembershipSets::default();
  }

  /// Writes membership flags of `kind` onto matching rows. Once a kind has
  /// been refreshed its sets are authoritative and stale flags are cleared too.
  pub fn apply_to_rows(&self, kind: LibraryKind, rows: &mut [ListRow]) {
    let user_id = self.api.current_user_id();
    let sets = self.sets.lock();
    let authoritative = sets.refreshed_at.contains_key(&kind);
    let resolve = |flag: &mut bool, member: bool| {
      *flag = if authoritative { member } else { *flag || member };
    };
    for row in rows.iter_mut() {
      match (&mut row.item, kind) {
        (ListItem::Song(song), LibraryKind::Songs) => {
          resolve(&mut song.is_liked, sets.liked_songs.contains(&song.id));
        }
        (ListItem::Playlist(playlist), LibraryKind::Playlists) => {
          let owned = user_id == Some(playlist.creator_id) || sets.owned_playlists.contains(&playlist.id);
          resolve(&mut playlist.is_owned, owned);
          let subscribed = !playlist.is_owned && sets.subscribed_playlists.contains(&playlist.id);
          resolve(&mut playlist.is_subscribed, subscribed);
          if playlist.is_owned {
            playlist.is_subscribed = false;
          }
        }
        (ListItem::Album(album), LibraryKind::Albums) => {
          resolve(&mut album.is_subscribed, sets.subscribed_albums.contains(&album.id));
        }
        (ListItem::Artist(artist), LibraryKind::Artists) => {
          resolve(&mut artist.is_subscribed, sets.subscribed_artists.contains(&artist.id));
        }
        (ListItem::Podcast(podcast), LibraryKind::Podcasts) => {
          resolve(
            &mut podcast.is_subscribed,
            sets.subscribed_podcasts.contains(&podcast.id),
          );
        }
        _ => {}
      }
    }
  }

  /// Cancels running refreshes and waits for them to unwind.
  pub async fn shutdown(&self) {
    self.session.cancel();
    let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
    for task in tasks {
      if let Err(e) = task.await {
        warn!("[Library] refresh task ended abnormally: {}", e);
      }
    }
  }
}

fn toggle<T: std::hash::Hash + Eq>(set: &mut HashSet<T>, id: T, present: bool) {
  if present {
    set.insert(id);
  } else {
    set.remove(&id);
  }
}

/// Walks pages from offset 0 until a short page or the declared total.
async fn collect_pages<T, F, Fut>(page_size: usize, token: &CancellationToken, mut fetch: F) -> Result<Vec<T>>
where
  F: FnMut(usize) -> Fut,
  Fut: Future<Output = Result<Page<T>>>,
{
  let mut items = Vec::new();
  let mut offset = 0;
  for _ in 0..MAX_LIBRARY_PAGES {
    let page = with_cancel(token, fetch(offset)).await?;
    let count = page.items.len();
    let total = page.total;
    items.extend(page.items);
    if count == 0 || count < page_size || (total > 0 && items.len() >= total) {
      break;
    }
    offset += count;
  }
  Ok(items)
}
