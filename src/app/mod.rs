//! The coordinator that owns what is on screen
//!
//! Every view change goes through a loader registered per [`PageType`]. Loaders
//! cancel whatever was loading before, save the outgoing view to history,
//! normalize offsets against learned caps and commit rows only if nothing
//! newer has started in the meantime.

mod loaders;

use anyhow::{anyhow, Result};
use log::{info, warn};
use parking_lot::Mutex;
use std::{
  collections::HashMap,
  sync::{Arc, Weak},
  time::Instant,
};
use tokio_util::sync::CancellationToken;

use crate::core::error::{is_cancelled, is_not_logged_in};
use crate::core::history::{resolve_selection, BackDecision, BackGate, NavigationHistory, PushOutcome};
use crate::core::models::{
  Album, Artist, ArtistSongOrder, LibraryKind, ListItem, ListRow, Playlist, Podcast, Song,
};
use crate::core::pagination::{
  clamp_offset_to_total, max_page_from_total, PaginationKey, PaginationOffsetTracker,
};
use crate::core::snapshot::{PageType, View, ViewSnapshot};
use crate::infra::album_songs::AlbumSongsCache;
use crate::infra::api::{BandwidthMonitor, ContentApi};
use crate::infra::artist_index::{ArtistSongIndex, IndexSnapshot};
use crate::infra::library::LibraryStateCache;
use crate::user_config::UserConfig;

use loaders::ViewLoader;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
  Loaded,
  /// Upstream refused the page; a retry row pointing at the last servable page is shown.
  Anomaly,
  /// A newer load or a back request took over.
  Cancelled,
  /// The request was a no-op, e.g. next page on the last page.
  Unchanged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackOutcome {
  Restored(PageType),
  WentHome,
  AlreadyHome,
  Failed,
  Cancelled,
  Debounced,
  Deferred,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PageState {
  pub key: Option<PaginationKey>,
  pub page_size: usize,
  pub offset: usize,
  pub total: usize,
  pub has_more: bool,
}

impl PageState {
  /// 1-based.
  pub fn page(&self) -> usize {
    if self.page_size == 0 {
      1
    } else {
      self.offset / self.page_size + 1
    }
  }
}

/// Shown in place of rows when a page could not be served.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryRow {
  pub message: String,
  pub target: View,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LiveView {
  pub view: View,
  pub name: String,
  pub rows: Vec<ListRow>,
  pub selected: Option<usize>,
  pub paging: Option<PageState>,
  pub retry: Option<RetryRow>,
  pub status: Option<String>,
  /// Blocking notice for failures the user has to act on, such as logging in.
  pub notice: Option<String>,
}

impl LiveView {
  fn blank() -> Self {
    Self {
      view: View::Homepage,
      name: String::new(),
      rows: Vec::new(),
      selected: None,
      paging: None,
      retry: None,
      status: None,
      notice: None,
    }
  }
}

/// Everything a loader hands to [`App::commit`].
pub(crate) struct Rendered {
  view: View,
  name: String,
  rows: Vec<ListRow>,
  paging: Option<PageState>,
  retry: Option<RetryRow>,
  status: Option<String>,
}

impl Rendered {
  fn list(view: View, name: String, rows: Vec<ListRow>) -> Self {
    Self {
      view,
      name,
      rows,
      paging: None,
      retry: None,
      status: None,
    }
  }
}

pub struct App {
  api: Arc<dyn ContentApi>,
  pub config: UserConfig,
  pub tracker: PaginationOffsetTracker,
  pub library: Arc<LibraryStateCache>,
  pub album_songs: Arc<AlbumSongsCache>,
  pub artist_index: ArtistSongIndex,
  live: Mutex<LiveView>,
  history: Mutex<NavigationHistory>,
  back_gate: Mutex<BackGate>,
  view_token: Mutex<CancellationToken>,
  session: CancellationToken,
  loaders: HashMap<PageType, ViewLoader>,
  mixed_queries: Mutex<HashMap<String, Vec<String>>>,
}

impl App {
  pub fn new(
    api: Arc<dyn ContentApi>,
    bandwidth: Arc<dyn BandwidthMonitor>,
    config: UserConfig,
  ) -> Arc<App> {
    Arc::new_cyclic(|weak: &Weak<App>| {
      let library = Arc::new(LibraryStateCache::new(
        Arc::clone(&api),
        bandwidth,
        config.library_freshness(),
        config.behavior.concurrent_refresh_threshold,
        config.paging.library,
      ));
      let listener_app = weak.clone();
      library.set_listener(Arc::new(move |kind: LibraryKind| {
        if let Some(app) = listener_app.upgrade() {
          app.apply_library_flags(kind);
        }
      }));

      let album_songs = Arc::new(AlbumSongsCache::new(
        Arc::clone(&api),
        config.cache.album_songs_limit,
        config.album_retry_policy(),
      ));
      let artist_index = ArtistSongIndex::new(
        Arc::clone(&api),
        Arc::clone(&album_songs),
        config.cache.artist_index_limit,
        config.cache.album_fetch_concurrency,
        config.cache.index_progress_interval,
      );

      App {
        api,
        back_gate: Mutex::new(BackGate::new(config.back_debounce())),
        config,
        tracker: PaginationOffsetTracker::new(),
        library,
        album_songs,
        artist_index,
        live: Mutex::new(LiveView::blank()),
        history: Mutex::new(NavigationHistory::new()),
        view_token: Mutex::new(CancellationToken::new()),
        session: CancellationToken::new(),
        loaders: loaders::registry(),
        mixed_queries: Mutex::new(HashMap::new()),
      }
    })
  }

  pub fn live(&self) -> LiveView {
    self.live.lock().clone()
  }

  pub fn status(&self) -> Option<String> {
    self.live.lock().status.clone()
  }

  pub fn history_depth(&self) -> usize {
    self.history.lock().depth()
  }

  pub fn set_status(&self, message: impl Into<String>) {
    let message = message.into();
    info!("[App] {}", message);
    self.live.lock().status = Some(message);
  }

  pub fn handle_error(&self, e: anyhow::Error) {
    if is_cancelled(&e) {
      return;
    }
    warn!("[App] {}", e);
    let mut live = self.live.lock();
    if is_not_logged_in(&e) {
      live.notice = Some("Please log in first".to_string());
    } else {
      live.status = Some(e.to_string());
    }
  }

  pub fn select(&self, index: usize) -> bool {
    let mut live = self.live.lock();
    if index < live.rows.len() {
      live.selected = Some(index);
      true
    } else {
      false
    }
  }

  pub async fn open(&self, view: View) -> Result<LoadOutcome> {
    self.load_view(view, false).await
  }

  pub(crate) async fn load_view(&self, view: View, skip_save: bool) -> Result<LoadOutcome> {
    let page_type = view.page_type();
    let Some(loader) = self.loaders.get(&page_type) else {
      return Err(anyhow!("No loader registered for {} views", page_type.as_str()));
    };
    loader(self, view, skip_save).await
  }

  /// Opens whatever the selected row points at, or the retry target when a
  /// page anomaly is on screen.
  pub async fn open_selected(&self) -> Result<LoadOutcome> {
    let target = {
      let live = self.live.lock();
      match &live.retry {
        Some(retry) => Some(retry.target.clone()),
        None => live
          .selected
          .and_then(|index| live.rows.get(index))
          .and_then(|row| target_of(&row.item)),
      }
    };
    match target {
      Some(view) => self.load_view(view, false).await,
      None => Ok(LoadOutcome::Unchanged),
    }
  }

  /// Records the view on screen so back navigation can return to it.
  pub fn save_current_state(&self) -> PushOutcome {
    let snapshot = {
      let live = self.live.lock();
      if live.rows.is_empty() {
        return PushOutcome::Skipped;
      }
      let data_index = live
        .selected
        .and_then(|index| live.rows.get(index))
        .map(|row| row.data_index);
      ViewSnapshot::new(live.view.clone(), live.name.clone()).with_selection(live.selected, data_index)
    };
    let outcome = self.history.lock().push_or_merge(snapshot);
    info!("[App] saved {} ({:?})", self.live.lock().view.view_source(), outcome);
    outcome
  }

  /// Cancels the previous view load, saves the outgoing view unless asked
  /// not to, and hands out the token for the new load.
  fn begin_load(&self, skip_save: bool) -> CancellationToken {
    if !skip_save {
      self.save_current_state();
    }
    let token = self.session.child_token();
    let previous = std::mem::replace(&mut *self.view_token.lock(), token.clone());
    previous.cancel();
    token
  }

  fn commit(&self, token: &CancellationToken, rendered: Rendered) -> LoadOutcome {
    let Rendered {
      view,
      name,
      mut rows,
      paging,
      retry,
      status,
    } = rendered;
    let anomaly = retry.is_some();
    let kinds = kinds_in(&rows);
    for kind in &kinds {
      self.library.apply_to_rows(*kind, &mut rows);
    }

    {
      let mut live = self.live.lock();
      if token.is_cancelled() {
        return LoadOutcome::Cancelled;
      }
      info!("[App] showing {} ({} rows)", view.view_source(), rows.len());
      *live = LiveView {
        view,
        name,
        selected: (!rows.is_empty()).then_some(0),
        rows,
        paging,
        retry,
        status,
        notice: None,
      };
    }

    for kind in kinds {
      self.library.request_refresh(kind, false);
    }
    if anomaly {
      LoadOutcome::Anomaly
    } else {
      LoadOutcome::Loaded
    }
  }

  fn page_size_for(&self, view: &View) -> usize {
    let paging = &self.config.paging;
    match view {
      View::Search { .. } => paging.search,
      View::ArtistSongs { .. } => paging.artist_songs,
      View::ArtistAlbums { .. } => paging.artist_albums,
      View::ArtistCategoryList { .. } => paging.artist_category,
      View::NewAlbumCategoryList { .. } => paging.new_albums,
      View::Podcast { .. } => paging.podcast_episodes,
      _ => paging.category,
    }
  }

  /// Applies the learned cap, then the declared total.
  fn normalize_offset(
    &self,
    key: Option<&PaginationKey>,
    page_size: usize,
    requested: usize,
  ) -> (usize, bool) {
    let Some(key) = key else {
      return (requested, false);
    };
    let (offset, capped) = self.tracker.normalize_offset(key, page_size, requested);
    let (offset, clamped) = match self.tracker.declared_total(key) {
      Some(total) => clamp_offset_to_total(offset, page_size, total),
      None => (offset, false),
    };
    (offset, capped || clamped)
  }

  /// The view a restore of `view` is expected to land on.
  fn expected_view(&self, view: &View) -> View {
    let page_size = self.page_size_for(view);
    match (view.pagination_key(), view.offset(page_size)) {
      (Some(key), Some(offset)) => {
        let (offset, _) = self.normalize_offset(Some(&key), page_size, offset);
        view.at_offset(offset, page_size)
      }
      _ => view.clone(),
    }
  }

  pub async fn go_back(&self) -> BackOutcome {
    let mut bypass_debounce = false;
    loop {
      let decision = self.back_gate.lock().try_begin(Instant::now(), bypass_debounce);
      match decision {
        BackDecision::Proceed => {}
        BackDecision::Debounced => {
          info!("[App] back request debounced");
          return BackOutcome::Debounced;
        }
        BackDecision::Deferred => {
          info!("[App] back request deferred, cancelling the running one");
          self.view_token.lock().cancel();
          return BackOutcome::Deferred;
        }
      }

      let outcome = self.navigate_back().await;
      let pending = self.back_gate.lock().finish();
      if !pending {
        return outcome;
      }
      bypass_debounce = true;
    }
  }

  async fn navigate_back(&self) -> BackOutcome {
    let top = self.history.lock().peek().cloned();
    let Some(snapshot) = top else {
      let on_home = matches!(self.live.lock().view, View::Homepage);
      if on_home {
        self.set_status("Already on the home page");
        return BackOutcome::AlreadyHome;
      }
      return match self.load_view(View::Homepage, true).await {
        Ok(LoadOutcome::Cancelled) => BackOutcome::Cancelled,
        Ok(_) => BackOutcome::WentHome,
        Err(e) => {
          self.handle_error(e);
          BackOutcome::Failed
        }
      };
    };

    let previous = self.live();
    let expected = self.expected_view(&snapshot.view);
    let page_type = snapshot.page_type();
    let result = self.load_view(snapshot.view.clone(), true).await;

    let verified = {
      let live = self.live.lock();
      live.view.is_same_view(&expected)
    };
    match result {
      Ok(LoadOutcome::Cancelled) => {
        info!("[App] back to {} cancelled", snapshot.view.view_source());
        BackOutcome::Cancelled
      }
      Ok(_) if verified => {
        self.history.lock().pop();
        let mut live = self.live.lock();
        live.selected = resolve_selection(&snapshot, &live.rows);
        info!("[App] back to {}", snapshot.view.view_source());
        BackOutcome::Restored(page_type)
      }
      Ok(_) => {
        warn!(
          "[App] back to {} landed on {}, rolling back",
          expected.view_source(),
          self.live.lock().view.view_source()
        );
        self.rollback(previous, "Could not return to the previous page");
        BackOutcome::Failed
      }
      Err(e) => {
        warn!("[App] back to {} failed: {}", snapshot.view.view_source(), e);
        self.rollback(previous, format!("Could not return to the previous page: {}", e));
        BackOutcome::Failed
      }
    }
  }

  fn rollback(&self, previous: LiveView, message: impl Into<String>) {
    let mut live = self.live.lock();
    *live = previous;
    live.status = Some(message.into());
  }

  fn current_paging(&self) -> Option<(View, PageState)> {
    let live = self.live.lock();
    live
      .paging
      .clone()
      .map(|paging| (live.view.clone(), paging))
  }

  pub fn max_page(&self, paging: &PageState) -> usize {
    let fallback = paging.page() + usize::from(paging.has_more);
    let declared = max_page_from_total(paging.total, paging.page_size, fallback);
    match &paging.key {
      Some(key) => self.tracker.resolve_max_page(key, paging.page_size, declared),
      None => declared,
    }
  }

  pub async fn load_next_page(&self) -> Result<LoadOutcome> {
    let Some((view, paging)) = self.current_paging() else {
      self.set_status("This list has no pages");
      return Ok(LoadOutcome::Unchanged);
    };
    let max_page = self.max_page(&paging);
    if paging.page() >= max_page {
      self.set_status(format!("Already on the last page ({})", max_page));
      return Ok(LoadOutcome::Unchanged);
    }
    let next = view.at_offset(paging.offset + paging.page_size, paging.page_size);
    self.load_view(next, false).await
  }

  pub async fn load_previous_page(&self) -> Result<LoadOutcome> {
    let Some((view, paging)) = self.current_paging() else {
      self.set_status("This list has no pages");
      return Ok(LoadOutcome::Unchanged);
    };
    if paging.offset == 0 {
      self.set_status("Already on the first page");
      return Ok(LoadOutcome::Unchanged);
    }
    let previous = view.at_offset(
      paging.offset.saturating_sub(paging.page_size),
      paging.page_size,
    );
    self.load_view(previous, false).await
  }

  /// Jumps to a 1-based page, clamped into the range the tracker allows.
  pub async fn jump_to_page(&self, page: usize) -> Result<LoadOutcome> {
    let Some((view, paging)) = self.current_paging() else {
      self.set_status("This list has no pages");
      return Ok(LoadOutcome::Unchanged);
    };
    let max_page = self.max_page(&paging);
    let (target, clamped) = match &paging.key {
      Some(key) => self
        .tracker
        .normalize_page(key, paging.page_size, page, max_page),
      None => {
        let target = page.clamp(1, max_page.max(1));
        (target, target != page)
      }
    };
    let outcome = self
      .load_view(
        view.at_offset((target - 1) * paging.page_size, paging.page_size),
        false,
      )
      .await?;
    if clamped && outcome == LoadOutcome::Loaded {
      self.set_status(format!(
        "Page {} is out of range, jumped to page {}",
        page, target
      ));
    }
    Ok(outcome)
  }

  fn apply_library_flags(&self, kind: LibraryKind) {
    let mut live = self.live.lock();
    self.library.apply_to_rows(kind, &mut live.rows);
  }

  fn patch_rows(&self, patch: impl Fn(&mut ListItem)) {
    let mut live = self.live.lock();
    for row in live.rows.iter_mut() {
      patch(&mut row.item);
    }
  }

  pub fn ensure_library_fresh(&self, kind: LibraryKind, force: bool) {
    self.library.request_refresh(kind, force);
  }

  /// Refreshes the given kinds and waits for them.
  pub async fn refresh_library(&self, kinds: &[LibraryKind], force: bool) -> Result<()> {
    let token = self.session.child_token();
    self.library.refresh_all(kinds, force, &token).await
  }

  pub fn is_liked(&self, song: &mut Song) -> bool {
    self.library.is_song_liked(song)
  }

  pub fn is_playlist_owned(&self, playlist: &mut Playlist) -> bool {
    self.library.is_playlist_owned(playlist)
  }

  pub fn is_playlist_subscribed(&self, playlist: &mut Playlist) -> bool {
    self.library.is_playlist_subscribed(playlist)
  }

  pub fn is_album_subscribed(&self, album: &mut Album) -> bool {
    self.library.is_album_subscribed(album)
  }

  pub fn is_artist_subscribed(&self, artist: &mut Artist) -> bool {
    self.library.is_artist_subscribed(artist)
  }

  pub fn is_podcast_subscribed(&self, podcast: &mut Podcast) -> bool {
    self.library.is_podcast_subscribed(podcast)
  }

  pub fn set_song_liked(&self, song_id: &str, liked: bool) {
    self.library.update_song_like(song_id, liked);
    self.patch_rows(|item| {
      if let ListItem::Song(song) = item {
        if song.id == song_id {
          song.is_liked = liked;
        }
      }
    });
  }

  pub fn set_playlist_subscribed(&self, playlist_id: &str, subscribed: bool) {
    self
      .library
      .update_playlist_subscription(playlist_id, subscribed);
    self.patch_rows(|item| {
      if let ListItem::Playlist(playlist) = item {
        if playlist.id == playlist_id && !playlist.is_owned {
          playlist.is_subscribed = subscribed;
        }
      }
    });
  }

  pub fn set_playlist_owned(&self, playlist_id: &str, owned: bool) {
    self.library.update_playlist_ownership(playlist_id, owned);
    self.patch_rows(|item| {
      if let ListItem::Playlist(playlist) = item {
        if playlist.id == playlist_id {
          playlist.is_owned = owned;
          if owned {
            playlist.is_subscribed = false;
          }
        }
      }
    });
  }

  pub fn set_album_subscribed(&self, album_id: &str, subscribed: bool) {
    self.library.update_album_subscription(album_id, subscribed);
    self.patch_rows(|item| {
      if let ListItem::Album(album) = item {
        if album.id == album_id {
          album.is_subscribed = subscribed;
        }
      }
    });
  }

  pub fn set_artist_subscribed(&self, artist_id: u64, subscribed: bool) {
    self.library.update_artist_subscription(artist_id, subscribed);
    self.patch_rows(|item| {
      if let ListItem::Artist(artist) = item {
        if artist.id == artist_id {
          artist.is_subscribed = subscribed;
        }
      }
    });
  }

  pub fn set_podcast_subscribed(&self, podcast_id: u64, subscribed: bool) {
    self
      .library
      .update_podcast_subscription(podcast_id, subscribed);
    self.patch_rows(|item| {
      if let ListItem::Podcast(podcast) = item {
        if podcast.id == podcast_id {
          podcast.is_subscribed = subscribed;
        }
      }
    });
  }

  /// Forgets every membership set and clears the flags on screen.
  pub fn on_logout(&self) {
    self.library.invalidate_all();
    self.patch_rows(|item| match item {
      ListItem::Song(song) => song.is_liked = false,
      ListItem::Album(album) => album.is_subscribed = false,
      ListItem::Artist(artist) => artist.is_subscribed = false,
      ListItem::Playlist(playlist) => {
        playlist.is_subscribed = false;
        playlist.is_owned = false;
      }
      ListItem::Podcast(podcast) => podcast.is_subscribed = false,
      ListItem::Episode(_) | ListItem::Entry(_) => {}
    });
    info!("[App] library state cleared after logout");
  }

  /// Builds the song index of an artist far enough to hold `required` songs.
  pub async fn ensure_artist_index(
    &self,
    artist_id: u64,
    order: ArtistSongOrder,
    required: usize,
  ) -> Result<IndexSnapshot> {
    let key = PaginationKey::ArtistSongs { artist_id, order }.to_string();
    let token = self.session.child_token();
    self
      .artist_index
      .ensure_index(
        &key,
        artist_id,
        order == ArtistSongOrder::Time,
        required,
        &token,
        None,
      )
      .await
  }

  /// Registers a list of song ids under a fresh key and returns the view showing them.
  pub fn register_mixed_query(&self, song_ids: Vec<String>) -> View {
    let mut queries = self.mixed_queries.lock();
    let query_key = format!("links{}", queries.len() + 1);
    queries.insert(query_key.clone(), song_ids);
    View::UrlMixed { query_key }
  }

  pub fn forget_mixed_query(&self, query_key: &str) -> bool {
    self.mixed_queries.lock().remove(query_key).is_some()
  }

  pub async fn shutdown(&self) {
    self.session.cancel();
    self.library.shutdown().await;
  }
}

fn kinds_in(rows: &[ListRow]) -> Vec<LibraryKind> {
  let mut kinds = Vec::new();
  for kind in rows.iter().filter_map(|row| row.item.library_kind()) {
    if !kinds.contains(&kind) {
      kinds.push(kind);
    }
  }
  kinds
}

fn target_of(item: &ListItem) -> Option<View> {
  match item {
    ListItem::Entry(entry) => Some(entry.target.clone()),
    ListItem::Album(album) => Some(View::Album {
      album_id: album.id.clone(),
    }),
    ListItem::Playlist(playlist) => Some(View::Playlist {
      playlist_id: playlist.id.clone(),
    }),
    ListItem::Artist(artist) => Some(View::ArtistEntries {
      artist_id: artist.id,
    }),
    ListItem::Podcast(podcast) => Some(View::Podcast {
      radio_id: podcast.id,
      offset: 0,
      ascending: false,
    }),
    ListItem::Song(_) | ListItem::Episode(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::models::ArtistSongOrder;
  use crate::core::snapshot::CategoryId;
  use crate::infra::api::FixedBandwidth;
  use crate::infra::fixture::tests::big_artist;
  use crate::infra::fixture::{CatalogData, FixtureCatalog, OverflowMode};
  use std::time::Duration;

  fn app_with(data: CatalogData) -> Arc<App> {
    app_with_config(FixtureCatalog::new(data), UserConfig::new())
  }

  fn app_with_config(catalog: FixtureCatalog, config: UserConfig) -> Arc<App> {
    App::new(Arc::new(catalog), Arc::new(FixedBandwidth(1.0)), config)
  }

  fn no_debounce() -> UserConfig {
    let mut config = UserConfig::new();
    config.behavior.back_debounce_milliseconds = 0;
    config
  }

  fn album(id: &str) -> View {
    View::Album {
      album_id: id.to_string(),
    }
  }

  fn hot_songs(offset: usize) -> View {
    View::ArtistSongs {
      artist_id: 42,
      offset,
      order: ArtistSongOrder::Hot,
    }
  }

  fn first_song_id(app: &App) -> String {
    match &app.live().rows[0].item {
      ListItem::Song(song) => song.id.clone(),
      other => panic!("expected a song row, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_back_restores_view_and_selection() {
    let app = app_with(big_artist(30));
    app.open(View::Homepage).await.unwrap();
    app.open(album("a1")).await.unwrap();
    assert!(app.select(4));
    app.open(album("a2")).await.unwrap();
    assert_eq!(app.history_depth(), 2);

    assert_eq!(app.go_back().await, BackOutcome::Restored(PageType::Album));
    let live = app.live();
    assert_eq!(live.view, album("a1"));
    assert_eq!(live.selected, Some(4));
    assert_eq!(app.history_depth(), 1);
  }

  #[tokio::test]
  async fn test_double_back_is_debounced() {
    let app = app_with(big_artist(30));
    app.open(View::Homepage).await.unwrap();
    app.open(album("a1")).await.unwrap();
    app.open(album("a2")).await.unwrap();

    assert_eq!(app.go_back().await, BackOutcome::Restored(PageType::Album));
    assert_eq!(app.go_back().await, BackOutcome::Debounced);
    assert_eq!(app.live().view, album("a1"));
    assert_eq!(app.history_depth(), 1);
  }

  #[tokio::test]
  async fn test_reopening_same_view_merges_history() {
    let app = app_with(big_artist(30));
    app.open(album("a0")).await.unwrap();
    app.open(album("a1")).await.unwrap();
    app.select(2);
    assert_eq!(app.save_current_state(), PushOutcome::Pushed);
    app.select(7);
    assert_eq!(app.save_current_state(), PushOutcome::Merged);
    app.open(album("a1")).await.unwrap();
    assert_eq!(app.history_depth(), 2);
  }

  #[tokio::test]
  async fn test_back_with_empty_history() {
    let app = app_with_config(FixtureCatalog::new(big_artist(30)), no_debounce());
    app.open(album("a0")).await.unwrap();
    assert_eq!(app.history_depth(), 0);

    assert_eq!(app.go_back().await, BackOutcome::WentHome);
    assert_eq!(app.live().view, View::Homepage);
    assert_eq!(app.go_back().await, BackOutcome::AlreadyHome);
    assert_eq!(app.status().as_deref(), Some("Already on the home page"));
  }

  #[tokio::test]
  async fn test_failed_restore_rolls_back() {
    let app = app_with(big_artist(30));
    let links = app.register_mixed_query(vec!["s1".to_string(), "s3".to_string()]);
    let View::UrlMixed { query_key } = &links else {
      panic!("expected a mixed view");
    };
    let query_key = query_key.clone();
    app.open(links).await.unwrap();
    app.open(album("a2")).await.unwrap();
    assert_eq!(app.history_depth(), 1);

    assert!(app.forget_mixed_query(&query_key));
    assert_eq!(app.go_back().await, BackOutcome::Failed);
    let live = app.live();
    assert_eq!(live.view, album("a2"));
    assert_eq!(live.rows.len(), 10);
    assert!(live.status.unwrap().starts_with("Could not return"));
    assert_eq!(app.history_depth(), 1);
  }

  #[tokio::test]
  async fn test_deferred_back_cancels_and_retries() {
    let catalog = FixtureCatalog::new(big_artist(30)).with_latency(Duration::from_millis(50));
    let app = app_with_config(catalog, no_debounce());
    app.open(album("a0")).await.unwrap();
    app.open(album("a1")).await.unwrap();
    app.open(album("a2")).await.unwrap();
    assert_eq!(app.history_depth(), 2);

    let first = {
      let app = Arc::clone(&app);
      tokio::spawn(async move { app.go_back().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(app.go_back().await, BackOutcome::Deferred);

    assert_eq!(first.await.unwrap(), BackOutcome::Restored(PageType::Album));
    assert_eq!(app.live().view, album("a1"));
    assert_eq!(app.history_depth(), 1);
  }

  #[tokio::test]
  async fn test_overflow_learns_cap_and_offers_retry() {
    let mut data = big_artist(500);
    data.servable_limit = Some(300);
    let app = app_with(data);

    assert_eq!(app.open(hot_songs(400)).await.unwrap(), LoadOutcome::Anomaly);
    let key = PaginationKey::ArtistSongs {
      artist_id: 42,
      order: ArtistSongOrder::Hot,
    };
    assert_eq!(app.tracker.get_cap(&key), Some(399));
    let live = app.live();
    assert!(live.rows.is_empty());
    assert_eq!(live.retry.unwrap().target, hot_songs(300));

    assert_eq!(app.open_selected().await.unwrap(), LoadOutcome::Anomaly);
    assert_eq!(app.tracker.get_cap(&key), Some(299));
    assert_eq!(app.live().retry.unwrap().target, hot_songs(200));

    assert_eq!(app.open_selected().await.unwrap(), LoadOutcome::Loaded);
    let live = app.live();
    assert_eq!(live.view, hot_songs(200));
    assert_eq!(live.rows.len(), 100);
    assert_eq!(live.rows[0].data_index, 200);
    assert_eq!(first_song_id(&app), "s200");
  }

  #[tokio::test]
  async fn test_refused_first_page_is_a_failure() {
    let mut data = big_artist(30);
    data.servable_limit = Some(0);
    let app = app_with(data);

    assert!(app.open(hot_songs(0)).await.is_err());
    let key = PaginationKey::ArtistSongs {
      artist_id: 42,
      order: ArtistSongOrder::Hot,
    };
    assert_eq!(app.tracker.get_cap(&key), None);
    let live = app.live();
    assert!(live.retry.is_none());
    assert!(live.status.unwrap().starts_with("Load failed"));
  }

  #[tokio::test]
  async fn test_category_pages_each_get_a_history_entry() {
    let app = app_with_config(FixtureCatalog::new(big_artist(200)), no_debounce());
    let new_songs = |offset| View::Category {
      id: CategoryId::NewSongs(0),
      offset,
    };
    app.open(album("a0")).await.unwrap();
    app.open(new_songs(0)).await.unwrap();
    assert_eq!(app.load_next_page().await.unwrap(), LoadOutcome::Loaded);
    assert_eq!(app.load_next_page().await.unwrap(), LoadOutcome::Loaded);
    assert_eq!(app.live().view, new_songs(100));
    assert_eq!(app.history_depth(), 3);

    assert_eq!(app.go_back().await, BackOutcome::Restored(PageType::Category));
    assert_eq!(app.live().view, new_songs(50));
    assert_eq!(app.go_back().await, BackOutcome::Restored(PageType::Category));
    assert_eq!(app.live().view, new_songs(0));
    assert_eq!(first_song_id(&app), "s0");
    assert_eq!(app.go_back().await, BackOutcome::Restored(PageType::Album));
    assert_eq!(app.live().view, album("a0"));
  }

  #[tokio::test]
  async fn test_empty_overflow_page_learns_cap() {
    let mut data = big_artist(500);
    data.servable_limit = Some(300);
    data.overflow = OverflowMode::EmptyPage;
    let app = app_with(data);

    assert_eq!(app.open(hot_songs(300)).await.unwrap(), LoadOutcome::Anomaly);
    let live = app.live();
    assert_eq!(live.retry.unwrap().target, hot_songs(200));
    assert_eq!(app.max_page(&live.paging.unwrap()), 3);
  }

  #[tokio::test]
  async fn test_learned_cap_jumps_to_last_page() {
    let app = app_with(big_artist(500));
    let key = PaginationKey::ArtistSongs {
      artist_id: 42,
      order: ArtistSongOrder::Hot,
    };
    app.tracker.set_cap(&key, 250);

    assert_eq!(app.open(hot_songs(400)).await.unwrap(), LoadOutcome::Loaded);
    let live = app.live();
    assert_eq!(live.view, hot_songs(200));
    assert_eq!(
      live.status.as_deref(),
      Some("Page too large, jumped to page 3")
    );
  }

  #[tokio::test]
  async fn test_paging_stops_at_both_ends() {
    let app = app_with(big_artist(150));
    app.open(hot_songs(0)).await.unwrap();
    assert_eq!(app.load_previous_page().await.unwrap(), LoadOutcome::Unchanged);

    assert_eq!(app.load_next_page().await.unwrap(), LoadOutcome::Loaded);
    assert_eq!(app.live().rows.len(), 50);
    assert_eq!(app.load_next_page().await.unwrap(), LoadOutcome::Unchanged);
    assert_eq!(
      app.status().as_deref(),
      Some("Already on the last page (2)")
    );

    assert_eq!(app.load_previous_page().await.unwrap(), LoadOutcome::Loaded);
    assert_eq!(app.live().view, hot_songs(0));
  }

  #[tokio::test]
  async fn test_jump_to_page_clamps() {
    let app = app_with(big_artist(250));
    app.open(hot_songs(0)).await.unwrap();
    assert_eq!(app.jump_to_page(9).await.unwrap(), LoadOutcome::Loaded);
    assert_eq!(app.live().view, hot_songs(200));
    assert_eq!(
      app.status().as_deref(),
      Some("Page 9 is out of range, jumped to page 3")
    );
  }

  #[tokio::test]
  async fn test_newest_songs_come_from_index() {
    let app = app_with(big_artist(250));
    let view = View::ArtistSongs {
      artist_id: 42,
      offset: 0,
      order: ArtistSongOrder::Time,
    };
    assert_eq!(app.open(view).await.unwrap(), LoadOutcome::Loaded);
    assert_eq!(first_song_id(&app), "s240");
    let paging = app.live().paging.unwrap();
    assert_eq!(paging.total, 250);
    assert!(paging.has_more);
    assert_eq!(app.max_page(&paging), 3);

    app.jump_to_page(3).await.unwrap();
    let live = app.live();
    assert_eq!(live.rows.len(), 50);
    assert!(!live.paging.unwrap().has_more);
  }

  #[tokio::test]
  async fn test_ensure_artist_index() {
    let app = app_with(big_artist(100));
    let snapshot = app
      .ensure_artist_index(42, ArtistSongOrder::Time, 30)
      .await
      .unwrap();
    assert!(snapshot.songs.len() >= 30);
    assert_eq!(snapshot.songs[0].id, "s90");
  }

  #[tokio::test]
  async fn test_library_flags_reach_rows() {
    let mut data = big_artist(30);
    data.library.liked_song_ids = vec!["s1".to_string()];
    let app = app_with(data);
    app.open(album("a0")).await.unwrap();
    app
      .refresh_library(&[LibraryKind::Songs], true)
      .await
      .unwrap();

    let liked: Vec<bool> = app
      .live()
      .rows
      .iter()
      .map(|row| matches!(&row.item, ListItem::Song(song) if song.is_liked))
      .collect();
    assert!(liked[1]);
    assert_eq!(liked.iter().filter(|liked| **liked).count(), 1);
  }

  #[tokio::test]
  async fn test_set_song_liked_patches_rows() {
    let app = app_with(big_artist(30));
    app.open(album("a0")).await.unwrap();
    app.set_song_liked("s2", true);
    match &app.live().rows[2].item {
      ListItem::Song(song) => assert!(song.is_liked),
      other => panic!("expected a song row, got {:?}", other),
    }
    let mut song = Song {
      id: "s2".to_string(),
      ..Default::default()
    };
    assert!(app.is_liked(&mut song));

    app.on_logout();
    assert!(!app.is_liked(&mut Song {
      id: "s2".to_string(),
      ..Default::default()
    }));
  }

  #[tokio::test]
  async fn test_cloud_drive_requires_login() {
    let mut data = big_artist(30);
    data.user_id = None;
    let app = app_with(data);
    let cloud = View::Category {
      id: CategoryId::UserCloud,
      offset: 0,
    };
    let err = app.open(cloud).await.unwrap_err();
    assert!(is_not_logged_in(&err));
    assert!(app.live().notice.is_some());
  }

  #[tokio::test]
  async fn test_mixed_links_skip_missing_songs() {
    let app = app_with(big_artist(30));
    let view = app.register_mixed_query(vec![
      "s1".to_string(),
      "missing".to_string(),
      "s3".to_string(),
    ]);
    assert_eq!(app.open(view).await.unwrap(), LoadOutcome::Loaded);
    assert_eq!(app.live().rows.len(), 2);
  }

  #[tokio::test]
  async fn test_entry_rows_open_their_target() {
    let app = app_with(big_artist(30));
    app.open(View::ArtistEntries { artist_id: 42 }).await.unwrap();
    app.select(3);
    app.open_selected().await.unwrap();
    let live = app.live();
    assert_eq!(live.rows.len(), 3);
    assert!(matches!(live.rows[0].item, ListItem::Album(_)));
  }
}
