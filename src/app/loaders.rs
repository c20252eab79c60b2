//! One loader per page type, and the table back navigation restores through

use anyhow::{anyhow, Result};
use futures::future::{join_all, BoxFuture};
use log::{debug, warn};
use std::{collections::HashMap, convert::identity, future::Future};
use tokio_util::sync::CancellationToken;

use super::{App, LoadOutcome, PageState, Rendered, RetryRow};
use crate::core::error::{is_cancelled, is_not_logged_in, ApiError};
use crate::core::menus;
use crate::core::models::{
  rows_from, AlbumSort, ArtistSongOrder, ListItem, ListRow, Page, SearchType,
};
use crate::core::pagination::PaginationKey;
use crate::core::snapshot::{CategoryId, PageType, View};
use crate::infra::api::with_cancel;
use crate::infra::artist_index::{IndexProgress, ProgressFn};

pub(crate) type ViewLoader =
  for<'a> fn(&'a App, View, bool) -> BoxFuture<'a, Result<LoadOutcome>>;

macro_rules! view_loader {
  ($name: ident, $page: ident, |$app: ident, $skip: ident| $pattern: pat => $load: expr) => {
    fn $name($app: &App, view: View, $skip: bool) -> BoxFuture<'_, Result<LoadOutcome>> {
      Box::pin(async move {
        match view {
          $pattern => $load.await,
          other => Err(anyhow!(
            "{} loader cannot open {}",
            PageType::$page.as_str(),
            other.view_source()
          )),
        }
      })
    }
  };
}

view_loader!(homepage, Homepage, |app, skip_save| View::Homepage => app.load_homepage(skip_save));
view_loader!(category, Category, |app, skip_save| View::Category { id, offset } =>
  app.load_category(id, offset, skip_save));
view_loader!(playlist, Playlist, |app, skip_save| View::Playlist { playlist_id } =>
  app.load_playlist(playlist_id, skip_save));
view_loader!(album, Album, |app, skip_save| View::Album { album_id } =>
  app.load_album(album_id, skip_save));
view_loader!(search, Search, |app, skip_save| View::Search { search_type, keyword, page } =>
  app.load_search(search_type, keyword, page, skip_save));
view_loader!(artist_entries, ArtistEntries, |app, skip_save| View::ArtistEntries { artist_id } =>
  app.load_artist_entries(artist_id, skip_save));
view_loader!(artist_top, ArtistTop, |app, skip_save| View::ArtistTop { artist_id } =>
  app.load_artist_top(artist_id, skip_save));
view_loader!(artist_songs, ArtistSongs, |app, skip_save| View::ArtistSongs { artist_id, offset, order } =>
  app.load_artist_songs(artist_id, offset, order, skip_save));
view_loader!(artist_albums, ArtistAlbums, |app, skip_save| View::ArtistAlbums { artist_id, offset, sort } =>
  app.load_artist_albums(artist_id, offset, sort, skip_save));
view_loader!(artist_favorites, ArtistFavorites, |app, skip_save| View::ArtistFavorites =>
  app.load_artist_favorites(skip_save));
view_loader!(artist_category_types, ArtistCategoryTypes, |app, skip_save| View::ArtistCategoryTypes =>
  app.load_artist_category_types(skip_save));
view_loader!(artist_category_type, ArtistCategoryType, |app, skip_save| View::ArtistCategoryType { type_code } =>
  app.load_artist_category_type(type_code, skip_save));
view_loader!(artist_category_list, ArtistCategoryList, |app, skip_save| View::ArtistCategoryList { type_code, area_code, offset } =>
  app.load_artist_category_list(type_code, area_code, offset, skip_save));
view_loader!(new_album_periods, NewAlbumCategoryPeriods, |app, skip_save| View::NewAlbumCategoryPeriods =>
  app.load_new_album_periods(skip_save));
view_loader!(new_album_period, NewAlbumCategoryPeriod, |app, skip_save| View::NewAlbumCategoryPeriod { period_code } =>
  app.load_new_album_period(period_code, skip_save));
view_loader!(new_album_list, NewAlbumCategoryList, |app, skip_save| View::NewAlbumCategoryList { period_code, area_code, offset } =>
  app.load_new_album_list(period_code, area_code, offset, skip_save));
view_loader!(podcast, Podcast, |app, skip_save| View::Podcast { radio_id, offset, ascending } =>
  app.load_podcast(radio_id, offset, ascending, skip_save));
view_loader!(url_song, UrlSong, |app, skip_save| View::UrlSong { song_id } =>
  app.load_url_song(song_id, skip_save));
view_loader!(url_mixed, UrlMixed, |app, skip_save| View::UrlMixed { query_key } =>
  app.load_url_mixed(query_key, skip_save));

pub(crate) fn registry() -> HashMap<PageType, ViewLoader> {
  let mut loaders: HashMap<PageType, ViewLoader> = HashMap::new();
  loaders.insert(PageType::Homepage, homepage);
  loaders.insert(PageType::Category, category);
  loaders.insert(PageType::Playlist, playlist);
  loaders.insert(PageType::Album, album);
  loaders.insert(PageType::Search, search);
  loaders.insert(PageType::ArtistEntries, artist_entries);
  loaders.insert(PageType::ArtistTop, artist_top);
  loaders.insert(PageType::ArtistSongs, artist_songs);
  loaders.insert(PageType::ArtistAlbums, artist_albums);
  loaders.insert(PageType::ArtistFavorites, artist_favorites);
  loaders.insert(PageType::ArtistCategoryTypes, artist_category_types);
  loaders.insert(PageType::ArtistCategoryType, artist_category_type);
  loaders.insert(PageType::ArtistCategoryList, artist_category_list);
  loaders.insert(PageType::NewAlbumCategoryPeriods, new_album_periods);
  loaders.insert(PageType::NewAlbumCategoryPeriod, new_album_period);
  loaders.insert(PageType::NewAlbumCategoryList, new_album_list);
  loaders.insert(PageType::Podcast, podcast);
  loaders.insert(PageType::UrlSong, url_song);
  loaders.insert(PageType::UrlMixed, url_mixed);
  loaders
}

pub(crate) struct PagedRequest {
  view: View,
  name: String,
  page_size: usize,
}

fn jumped_message(offset: usize, page_size: usize) -> String {
  format!(
    "Page too large, jumped to page {}",
    offset / page_size.max(1) + 1
  )
}

fn area_name(area_code: i32) -> &'static str {
  menus::AREAS
    .iter()
    .find(|(code, _)| *code == area_code)
    .map_or("Unknown area", |(_, name)| name)
}

fn category_title(id: &CategoryId) -> String {
  match id {
    CategoryId::Toplist => "Toplists".to_string(),
    CategoryId::HighQualityPlaylists => "High quality playlists".to_string(),
    CategoryId::PlaylistCategory(name) => format!("{} playlists", name),
    CategoryId::PodcastCategory(category_id) => format!("Podcast category {}", category_id),
    CategoryId::NewSongs(area_type) => format!("New songs ({})", area_type),
    CategoryId::UserCloud => "Cloud drive".to_string(),
  }
}

fn artist_songs_title(artist_id: u64, order: ArtistSongOrder) -> String {
  match order {
    ArtistSongOrder::Hot => format!("Artist {}: popular songs", artist_id),
    ArtistSongOrder::Time => format!("Artist {}: newest songs", artist_id),
  }
}

impl App {
  async fn load_list<Fut>(
    &self,
    token: CancellationToken,
    view: View,
    name: String,
    fetch: Fut,
  ) -> Result<LoadOutcome>
  where
    Fut: Future<Output = Result<Vec<ListRow>>>,
  {
    match with_cancel(&token, fetch).await {
      Ok(rows) => Ok(self.commit(&token, Rendered::list(view, name, rows))),
      Err(e) if is_cancelled(&e) => Ok(LoadOutcome::Cancelled),
      Err(e) => self.report_failure(e),
    }
  }

  async fn load_paged<T, F, Fut>(
    &self,
    token: CancellationToken,
    request: PagedRequest,
    fetch: F,
    wrap: fn(T) -> ListItem,
  ) -> Result<LoadOutcome>
  where
    F: FnOnce(usize) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
  {
    let PagedRequest {
      view,
      name,
      page_size,
    } = request;
    let key = view.pagination_key();
    let requested = view.offset(page_size).unwrap_or(0);
    let (offset, clamped) = self.normalize_offset(key.as_ref(), page_size, requested);
    let view = view.at_offset(offset, page_size);
    if clamped {
      debug!("[App] offset {} normalized to {}", requested, offset);
    }

    let page = match with_cancel(&token, fetch(offset)).await {
      Ok(page) => page,
      Err(e) => return self.fail_page(&token, view, name, key, page_size, e),
    };

    if let Some(key) = &key {
      if page.items.is_empty() && offset > 0 {
        if let Some(max_page) =
          self
            .tracker
            .learn_from_empty_page(key, offset, page_size, 0, page.total)
        {
          return Ok(self.show_anomaly(&token, view, name, Some(key.clone()), page_size, max_page));
        }
      }
      self.tracker.record_total(key, page.total);
    }

    let paging = PageState {
      key,
      page_size,
      offset,
      total: page.total,
      has_more: page.has_more,
    };
    let rows = rows_from(page.items, offset, wrap);
    Ok(self.commit(
      &token,
      Rendered {
        view,
        name,
        rows,
        paging: Some(paging),
        retry: None,
        status: clamped.then(|| jumped_message(offset, page_size)),
      },
    ))
  }

  fn fail_page(
    &self,
    token: &CancellationToken,
    view: View,
    name: String,
    key: Option<PaginationKey>,
    page_size: usize,
    e: anyhow::Error,
  ) -> Result<LoadOutcome> {
    if is_cancelled(&e) {
      return Ok(LoadOutcome::Cancelled);
    }
    if let Some(key) = key {
      let offset = view.offset(page_size).unwrap_or(0);
      if let Some(max_page) = self.tracker.learn_from_error(&key, offset, page_size, &e) {
        return Ok(self.show_anomaly(token, view, name, Some(key), page_size, max_page));
      }
    }
    self.report_failure(e)
  }

  fn show_anomaly(
    &self,
    token: &CancellationToken,
    view: View,
    name: String,
    key: Option<PaginationKey>,
    page_size: usize,
    max_page: usize,
  ) -> LoadOutcome {
    let offset = view.offset(page_size).unwrap_or(0);
    let target = view.at_offset((max_page.max(1) - 1) * page_size, page_size);
    let message = format!(
      "Page {} is not available, the last page is {}. Press Enter to jump there",
      offset / page_size.max(1) + 1,
      max_page
    );
    warn!("[App] {} on {}", message, view.view_source());
    let total = key
      .as_ref()
      .and_then(|key| self.tracker.declared_total(key))
      .unwrap_or(0);
    self.commit(
      token,
      Rendered {
        view,
        name,
        rows: Vec::new(),
        paging: Some(PageState {
          key,
          page_size,
          offset,
          total,
          has_more: false,
        }),
        retry: Some(RetryRow {
          message: message.clone(),
          target,
        }),
        status: Some(message),
      },
    )
  }

  fn report_failure(&self, e: anyhow::Error) -> Result<LoadOutcome> {
    warn!("[App] load failed: {}", e);
    {
      let mut live = self.live.lock();
      if is_not_logged_in(&e) {
        live.notice = Some("Please log in first".to_string());
      } else {
        live.status = Some(format!("Load failed: {}", e));
      }
    }
    Err(e)
  }

  fn require_login(&self, what: &str) -> Result<()> {
    if self.api.current_user_id().is_some() {
      return Ok(());
    }
    self.live.lock().notice = Some(format!("Log in to open {}", what));
    Err(ApiError::NotLoggedIn.into())
  }

  /// Max of the listing total and the artist detail count; either may fail.
  async fn resolve_artist_song_total(
    &self,
    artist_id: u64,
    order: ArtistSongOrder,
    token: &CancellationToken,
  ) -> Option<usize> {
    let (sample, detail) = futures::join!(
      with_cancel(token, self.api.get_artist_songs(artist_id, 1, 0, order)),
      with_cancel(token, self.api.get_artist_detail(artist_id)),
    );
    let from_listing = sample.ok().map(|page| page.total);
    let from_detail = detail.ok().map(|detail| detail.music_count);
    from_listing.max(from_detail).filter(|total| *total > 0)
  }

  pub async fn load_homepage(&self, skip_save: bool) -> Result<LoadOutcome> {
    let token = self.begin_load(skip_save);
    self
      .load_list(token, View::Homepage, "Home".to_string(), async {
        Ok(menus::homepage())
      })
      .await
  }

  pub async fn load_category(
    &self,
    id: CategoryId,
    offset: usize,
    skip_save: bool,
  ) -> Result<LoadOutcome> {
    let name = category_title(&id);
    if id.requires_login() {
      self.require_login(&name)?;
    }
    let page_size = self.config.paging.category;
    let token = self.begin_load(skip_save);
    let request = PagedRequest {
      view: View::Category {
        id: id.clone(),
        offset,
      },
      name,
      page_size,
    };
    self
      .load_paged(
        token,
        request,
        |offset| self.api.get_category_page(&id, page_size, offset),
        identity,
      )
      .await
  }

  pub async fn load_playlist(&self, playlist_id: String, skip_save: bool) -> Result<LoadOutcome> {
    let token = self.begin_load(skip_save);
    let view = View::Playlist {
      playlist_id: playlist_id.clone(),
    };
    self
      .load_list(token, view, format!("Playlist {}", playlist_id), async {
        let songs = self.api.get_playlist_songs(&playlist_id).await?;
        Ok(rows_from(songs, 0, ListItem::Song))
      })
      .await
  }

  pub async fn load_album(&self, album_id: String, skip_save: bool) -> Result<LoadOutcome> {
    let token = self.begin_load(skip_save);
    let view = View::Album {
      album_id: album_id.clone(),
    };
    self
      .load_list(token, view, format!("Album {}", album_id), async {
        let songs = self.api.get_album_songs(&album_id).await?;
        Ok(rows_from(songs, 0, ListItem::Song))
      })
      .await
  }

  pub async fn load_search(
    &self,
    search_type: SearchType,
    keyword: String,
    page: usize,
    skip_save: bool,
  ) -> Result<LoadOutcome> {
    if keyword.trim().is_empty() {
      self.set_status("Enter a keyword to search");
      return Ok(LoadOutcome::Unchanged);
    }
    let page_size = self.config.paging.search;
    let token = self.begin_load(skip_save);
    let request = PagedRequest {
      view: View::Search {
        search_type,
        keyword: keyword.clone(),
        page: page.max(1),
      },
      name: format!("Search \"{}\" in {}", keyword, search_type),
      page_size,
    };
    self
      .load_paged(
        token,
        request,
        |offset| self.api.search(search_type, &keyword, page_size, offset),
        identity,
      )
      .await
  }

  pub async fn load_artist_entries(&self, artist_id: u64, skip_save: bool) -> Result<LoadOutcome> {
    let token = self.begin_load(skip_save);
    self
      .load_list(
        token,
        View::ArtistEntries { artist_id },
        format!("Artist {}", artist_id),
        async { Ok(menus::artist_entries(artist_id)) },
      )
      .await
  }

  pub async fn load_artist_top(&self, artist_id: u64, skip_save: bool) -> Result<LoadOutcome> {
    let token = self.begin_load(skip_save);
    self
      .load_list(
        token,
        View::ArtistTop { artist_id },
        format!("Artist {}: top songs", artist_id),
        async {
          let songs = self.api.get_artist_top_songs(artist_id).await?;
          Ok(rows_from(songs, 0, ListItem::Song))
        },
      )
      .await
  }

  pub async fn load_artist_songs(
    &self,
    artist_id: u64,
    offset: usize,
    order: ArtistSongOrder,
    skip_save: bool,
  ) -> Result<LoadOutcome> {
    let token = self.begin_load(skip_save);
    let key = PaginationKey::ArtistSongs { artist_id, order };
    if self.tracker.declared_total(&key).is_none() {
      if let Some(total) = self
        .resolve_artist_song_total(artist_id, order, &token)
        .await
      {
        self.tracker.record_total(&key, total);
      }
    }

    match order {
      ArtistSongOrder::Hot => {
        let page_size = self.config.paging.artist_songs;
        let request = PagedRequest {
          view: View::ArtistSongs {
            artist_id,
            offset,
            order,
          },
          name: artist_songs_title(artist_id, order),
          page_size,
        };
        self
          .load_paged(
            token,
            request,
            |offset| self.api.get_artist_songs(artist_id, page_size, offset, order),
            ListItem::Song,
          )
          .await
      }
      ArtistSongOrder::Time => self.load_artist_songs_from_index(artist_id, offset, token).await,
    }
  }

  /// Newest-first songs are not paged upstream; pages are cut from the
  /// album index, which grows only as far as the requested page needs.
  async fn load_artist_songs_from_index(
    &self,
    artist_id: u64,
    requested: usize,
    token: CancellationToken,
  ) -> Result<LoadOutcome> {
    let order = ArtistSongOrder::Time;
    let page_size = self.config.paging.artist_songs;
    let key = PaginationKey::ArtistSongs { artist_id, order };
    let (offset, clamped) = self.normalize_offset(Some(&key), page_size, requested);
    let view = View::ArtistSongs {
      artist_id,
      offset,
      order,
    };
    let name = artist_songs_title(artist_id, order);

    let progress: &ProgressFn<'_> = &|report: IndexProgress| {
      self.set_status(format!(
        "Indexing albums {}/{} ({} songs)",
        report.albums_processed, report.album_count, report.songs
      ));
    };
    let snapshot = match self
      .artist_index
      .ensure_index(
        &key.to_string(),
        artist_id,
        true,
        offset + page_size,
        &token,
        Some(progress),
      )
      .await
    {
      Ok(snapshot) => snapshot,
      Err(e) => return self.fail_page(&token, view, name, Some(key), page_size, e),
    };

    let available = snapshot.songs.len();
    if offset >= available && offset > 0 {
      if let Some(max_page) = self
        .tracker
        .learn_from_empty_page(&key, offset, page_size, 0, available)
      {
        return Ok(self.show_anomaly(&token, view, name, Some(key), page_size, max_page));
      }
    }

    let total = if snapshot.is_complete {
      available
    } else {
      self
        .tracker
        .declared_total(&key)
        .unwrap_or(0)
        .max(available)
    };
    self.tracker.record_total(&key, total);

    let end = (offset + page_size).min(available);
    let songs = snapshot.songs[offset.min(end)..end].to_vec();
    let paging = PageState {
      key: Some(key),
      page_size,
      offset,
      total,
      has_more: end < available || !snapshot.is_complete,
    };
    Ok(self.commit(
      &token,
      Rendered {
        view,
        name,
        rows: rows_from(songs, offset, ListItem::Song),
        paging: Some(paging),
        retry: None,
        status: clamped.then(|| jumped_message(offset, page_size)),
      },
    ))
  }

  pub async fn load_artist_albums(
    &self,
    artist_id: u64,
    offset: usize,
    sort: AlbumSort,
    skip_save: bool,
  ) -> Result<LoadOutcome> {
    let page_size = self.config.paging.artist_albums;
    let token = self.begin_load(skip_save);
    let request = PagedRequest {
      view: View::ArtistAlbums {
        artist_id,
        offset,
        sort,
      },
      name: format!("Artist {}: albums ({})", artist_id, sort),
      page_size,
    };
    self
      .load_paged(
        token,
        request,
        |offset| self.api.get_artist_album_page(artist_id, page_size, offset, sort),
        ListItem::Album,
      )
      .await
  }

  pub async fn load_artist_favorites(&self, skip_save: bool) -> Result<LoadOutcome> {
    self.require_login("followed artists")?;
    let token = self.begin_load(skip_save);
    let limit = self.config.paging.library.artists;
    self
      .load_list(
        token,
        View::ArtistFavorites,
        "Followed artists".to_string(),
        async {
          let page = self.api.get_artist_subscriptions(limit, 0).await?;
          Ok(rows_from(page.items, 0, ListItem::Artist))
        },
      )
      .await
  }

  pub async fn load_artist_category_types(&self, skip_save: bool) -> Result<LoadOutcome> {
    let token = self.begin_load(skip_save);
    self
      .load_list(
        token,
        View::ArtistCategoryTypes,
        "Artist categories".to_string(),
        async { Ok(menus::artist_category_types()) },
      )
      .await
  }

  pub async fn load_artist_category_type(
    &self,
    type_code: i32,
    skip_save: bool,
  ) -> Result<LoadOutcome> {
    let token = self.begin_load(skip_save);
    self
      .load_list(
        token,
        View::ArtistCategoryType { type_code },
        menus::type_name(type_code).to_string(),
        async { Ok(menus::artist_category_areas(type_code)) },
      )
      .await
  }

  pub async fn load_artist_category_list(
    &self,
    type_code: i32,
    area_code: i32,
    offset: usize,
    skip_save: bool,
  ) -> Result<LoadOutcome> {
    let page_size = self.config.paging.artist_category;
    let token = self.begin_load(skip_save);
    let request = PagedRequest {
      view: View::ArtistCategoryList {
        type_code,
        area_code,
        offset,
      },
      name: format!("{}: {}", menus::type_name(type_code), area_name(area_code)),
      page_size,
    };
    self
      .load_paged(
        token,
        request,
        |offset| {
          self
            .api
            .get_artists_by_category(type_code, area_code, page_size, offset)
        },
        ListItem::Artist,
      )
      .await
  }

  pub async fn load_new_album_periods(&self, skip_save: bool) -> Result<LoadOutcome> {
    let token = self.begin_load(skip_save);
    self
      .load_list(
        token,
        View::NewAlbumCategoryPeriods,
        "New albums".to_string(),
        async { Ok(menus::new_album_periods()) },
      )
      .await
  }

  pub async fn load_new_album_period(
    &self,
    period_code: i32,
    skip_save: bool,
  ) -> Result<LoadOutcome> {
    let token = self.begin_load(skip_save);
    self
      .load_list(
        token,
        View::NewAlbumCategoryPeriod { period_code },
        menus::period_name(period_code).to_string(),
        async { Ok(menus::new_album_areas(period_code)) },
      )
      .await
  }

  /// New album listings page by the declared total only; no cap is learned for them.
  pub async fn load_new_album_list(
    &self,
    period_code: i32,
    area_code: i32,
    offset: usize,
    skip_save: bool,
  ) -> Result<LoadOutcome> {
    let page_size = self.config.paging.new_albums;
    let token = self.begin_load(skip_save);
    let request = PagedRequest {
      view: View::NewAlbumCategoryList {
        period_code,
        area_code,
        offset,
      },
      name: format!(
        "New albums {}: {}",
        menus::period_name(period_code),
        area_name(area_code)
      ),
      page_size,
    };
    self
      .load_paged(
        token,
        request,
        |offset| {
          self
            .api
            .get_albums_by_category(period_code, area_code, page_size, offset)
        },
        ListItem::Album,
      )
      .await
  }

  pub async fn load_podcast(
    &self,
    radio_id: u64,
    offset: usize,
    ascending: bool,
    skip_save: bool,
  ) -> Result<LoadOutcome> {
    let page_size = self.config.paging.podcast_episodes;
    let token = self.begin_load(skip_save);
    let request = PagedRequest {
      view: View::Podcast {
        radio_id,
        offset,
        ascending,
      },
      name: format!("Podcast {}", radio_id),
      page_size,
    };
    self
      .load_paged(
        token,
        request,
        |offset| {
          self
            .api
            .get_podcast_episodes(radio_id, page_size, offset, ascending)
        },
        ListItem::Episode,
      )
      .await
  }

  pub async fn load_url_song(&self, song_id: String, skip_save: bool) -> Result<LoadOutcome> {
    let token = self.begin_load(skip_save);
    let view = View::UrlSong {
      song_id: song_id.clone(),
    };
    self
      .load_list(token, view, format!("Link: song {}", song_id), async {
        let song = self.api.get_song(&song_id).await?;
        Ok(vec![ListRow::new(ListItem::Song(song), 0)])
      })
      .await
  }

  /// Only restorable while the query key is still registered.
  pub async fn load_url_mixed(&self, query_key: String, skip_save: bool) -> Result<LoadOutcome> {
    let song_ids = self.mixed_queries.lock().get(&query_key).cloned();
    let Some(song_ids) = song_ids else {
      return self.report_failure(anyhow!("Link list {} is no longer available", query_key));
    };
    let token = self.begin_load(skip_save);
    let view = View::UrlMixed {
      query_key: query_key.clone(),
    };
    self
      .load_list(
        token,
        view,
        format!("Links ({} songs)", song_ids.len()),
        async {
          let fetched = join_all(song_ids.iter().map(|id| self.api.get_song(id))).await;
          let mut songs = Vec::with_capacity(fetched.len());
          for (id, result) in song_ids.iter().zip(fetched) {
            match result {
              Ok(song) => songs.push(song),
              Err(e) => warn!("[App] skipping linked song {}: {}", id, e),
            }
          }
          Ok(rows_from(songs, 0, ListItem::Song))
        },
      )
      .await
  }
}
