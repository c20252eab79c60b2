//! Views and the snapshots navigation history keeps of them
//!
//! A [`View`] names what is on screen: the page type plus only the parameters
//! needed to load it again. A [`ViewSnapshot`] adds the title and the focused
//! row at the moment the view was left.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::models::{AlbumSort, ArtistSongOrder, SearchType};
use super::pagination::PaginationKey;

/// Paginated category feeds reachable from the home view.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryId {
  Toplist,
  HighQualityPlaylists,
  PlaylistCategory(String),
  PodcastCategory(u32),
  NewSongs(i32),
  UserCloud,
}

impl CategoryId {
  pub fn pagination_key(&self) -> PaginationKey {
    match self {
      CategoryId::Toplist => PaginationKey::Toplist,
      CategoryId::HighQualityPlaylists => PaginationKey::HighQualityPlaylists,
      CategoryId::PlaylistCategory(name) => PaginationKey::PlaylistCategory { name: name.clone() },
      CategoryId::PodcastCategory(category_id) => PaginationKey::PodcastCategory {
        category_id: *category_id,
      },
      CategoryId::NewSongs(area_type) => PaginationKey::NewSongs {
        area_type: *area_type,
      },
      CategoryId::UserCloud => PaginationKey::UserCloud,
    }
  }

  pub fn requires_login(&self) -> bool {
    matches!(self, CategoryId::UserCloud)
  }
}

impl fmt::Display for CategoryId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.pagination_key())
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PageType {
  Homepage,
  Category,
  Playlist,
  Album,
  Search,
  ArtistEntries,
  ArtistTop,
  ArtistSongs,
  ArtistAlbums,
  ArtistFavorites,
  ArtistCategoryTypes,
  ArtistCategoryType,
  ArtistCategoryList,
  NewAlbumCategoryPeriods,
  NewAlbumCategoryPeriod,
  NewAlbumCategoryList,
  Podcast,
  UrlSong,
  UrlMixed,
}

impl PageType {
  pub const ALL: [PageType; 19] = [
    PageType::Homepage,
    PageType::Category,
    PageType::Playlist,
    PageType::Album,
    PageType::Search,
    PageType::ArtistEntries,
    PageType::ArtistTop,
    PageType::ArtistSongs,
    PageType::ArtistAlbums,
    PageType::ArtistFavorites,
    PageType::ArtistCategoryTypes,
    PageType::ArtistCategoryType,
    PageType::ArtistCategoryList,
    PageType::NewAlbumCategoryPeriods,
    PageType::NewAlbumCategoryPeriod,
    PageType::NewAlbumCategoryList,
    PageType::Podcast,
    PageType::UrlSong,
    PageType::UrlMixed,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      PageType::Homepage => "homepage",
      PageType::Category => "category",
      PageType::Playlist => "playlist",
      PageType::Album => "album",
      PageType::Search => "search",
      PageType::ArtistEntries => "artist_entries",
      PageType::ArtistTop => "artist_top",
      PageType::ArtistSongs => "artist_songs",
      PageType::ArtistAlbums => "artist_albums",
      PageType::ArtistFavorites => "artist_favorites",
      PageType::ArtistCategoryTypes => "artist_category_types",
      PageType::ArtistCategoryType => "artist_category_type",
      PageType::ArtistCategoryList => "artist_category_list",
      PageType::NewAlbumCategoryPeriods => "new_album_category_periods",
      PageType::NewAlbumCategoryPeriod => "new_album_category_period",
      PageType::NewAlbumCategoryList => "new_album_category_list",
      PageType::Podcast => "podcast",
      PageType::UrlSong => "url_song",
      PageType::UrlMixed => "url_mixed",
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "page_type", rename_all = "snake_case")]
pub enum View {
  Homepage,
  Category {
    id: CategoryId,
    offset: usize,
  },
  Playlist {
    playlist_id: String,
  },
  Album {
    album_id: String,
  },
  Search {
    search_type: SearchType,
    keyword: String,
    /// 1-based.
    page: usize,
  },
  ArtistEntries {
    artist_id: u64,
  },
  ArtistTop {
    artist_id: u64,
  },
  ArtistSongs {
    artist_id: u64,
    offset: usize,
    order: ArtistSongOrder,
  },
  ArtistAlbums {
    artist_id: u64,
    offset: usize,
    sort: AlbumSort,
  },
  ArtistFavorites,
  ArtistCategoryTypes,
  ArtistCategoryType {
    type_code: i32,
  },
  ArtistCategoryList {
    type_code: i32,
    area_code: i32,
    offset: usize,
  },
  NewAlbumCategoryPeriods,
  NewAlbumCategoryPeriod {
    period_code: i32,
  },
  NewAlbumCategoryList {
    period_code: i32,
    area_code: i32,
    offset: usize,
  },
  Podcast {
    radio_id: u64,
    offset: usize,
    ascending: bool,
  },
  UrlSong {
    song_id: String,
  },
  UrlMixed {
    query_key: String,
  },
}

impl View {
  pub fn page_type(&self) -> PageType {
    match self {
      View::Homepage => PageType::Homepage,
      View::Category { .. } => PageType::Category,
      View::Playlist { .. } => PageType::Playlist,
      View::Album { .. } => PageType::Album,
      View::Search { .. } => PageType::Search,
      View::ArtistEntries { .. } => PageType::ArtistEntries,
      View::ArtistTop { .. } => PageType::ArtistTop,
      View::ArtistSongs { .. } => PageType::ArtistSongs,
      View::ArtistAlbums { .. } => PageType::ArtistAlbums,
      View::ArtistFavorites => PageType::ArtistFavorites,
      View::ArtistCategoryTypes => PageType::ArtistCategoryTypes,
      View::ArtistCategoryType { .. } => PageType::ArtistCategoryType,
      View::ArtistCategoryList { .. } => PageType::ArtistCategoryList,
      View::NewAlbumCategoryPeriods => PageType::NewAlbumCategoryPeriods,
      View::NewAlbumCategoryPeriod { .. } => PageType::NewAlbumCategoryPeriod,
      View::NewAlbumCategoryList { .. } => PageType::NewAlbumCategoryList,
      View::Podcast { .. } => PageType::Podcast,
      View::UrlSong { .. } => PageType::UrlSong,
      View::UrlMixed { .. } => PageType::UrlMixed,
    }
  }

  /// History equality: every identifying field counts, offsets included, so
  /// each page of a feed gets its own history entry.
  pub fn is_same_view(&self, other: &View) -> bool {
    self == other
  }

  /// Canonical marker for the view currently on screen.
  pub fn view_source(&self) -> String {
    match self {
      View::Homepage => "homepage".to_string(),
      View::Category { id, offset } => format!("{}:offset{}", id, offset),
      View::Playlist { playlist_id } => format!("playlist:{}", playlist_id),
      View::Album { album_id } => format!("album:{}", album_id),
      View::Search {
        search_type,
        keyword,
        page,
      } => format!("search:{}:{}:page{}", search_type, keyword, page),
      View::ArtistEntries { artist_id } => format!("artist_entries:{}", artist_id),
      View::ArtistTop { artist_id } => format!("artist_top:{}", artist_id),
      View::ArtistSongs {
        artist_id,
        offset,
        order,
      } => format!("artist_songs:{}:order{}:offset{}", artist_id, order, offset),
      View::ArtistAlbums {
        artist_id,
        offset,
        sort,
      } => format!("artist_albums:{}:order{}:offset{}", artist_id, sort, offset),
      View::ArtistFavorites => "artist_favorites".to_string(),
      View::ArtistCategoryTypes => "artist_category_types".to_string(),
      View::ArtistCategoryType { type_code } => format!("artist_category_type:{}", type_code),
      View::ArtistCategoryList {
        type_code,
        area_code,
        offset,
      } => format!(
        "artist_category_list:{}:{}:offset{}",
        type_code, area_code, offset
      ),
      View::NewAlbumCategoryPeriods => "new_album_category_periods".to_string(),
      View::NewAlbumCategoryPeriod { period_code } => {
        format!("new_album_category_period:{}", period_code)
      }
      View::NewAlbumCategoryList {
        period_code,
        area_code,
        offset,
      } => format!(
        "new_album_category_list:{}:{}:offset{}",
        period_code, area_code, offset
      ),
      View::Podcast {
        radio_id,
        offset,
        ascending,
      } => format!(
        "podcast:{}:asc{}:offset{}",
        radio_id,
        u8::from(*ascending),
        offset
      ),
      View::UrlSong { song_id } => format!("url_song:{}", song_id),
      View::UrlMixed { query_key } => format!("url_mixed:{}", query_key),
    }
  }

  /// Key under which offset caps for this view are learned.
  pub fn pagination_key(&self) -> Option<PaginationKey> {
    match self {
      View::Category { id, .. } => Some(id.pagination_key()),
      View::Search {
        search_type,
        keyword,
        ..
      } => Some(PaginationKey::Search {
        search_type: *search_type,
        keyword: keyword.clone(),
      }),
      View::ArtistSongs {
        artist_id, order, ..
      } => Some(PaginationKey::ArtistSongs {
        artist_id: *artist_id,
        order: *order,
      }),
      View::ArtistAlbums {
        artist_id, sort, ..
      } => Some(PaginationKey::ArtistAlbums {
        artist_id: *artist_id,
        sort: *sort,
      }),
      View::ArtistCategoryList {
        type_code,
        area_code,
        ..
      } => Some(PaginationKey::ArtistCategoryList {
        type_code: *type_code,
        area_code: *area_code,
      }),
      View::Podcast {
        radio_id,
        ascending,
        ..
      } => Some(PaginationKey::Podcast {
        radio_id: *radio_id,
        ascending: *ascending,
      }),
      _ => None,
    }
  }

  /// Offset of the first row, for views that page.
  pub fn offset(&self, page_size: usize) -> Option<usize> {
    match self {
      View::Category { offset, .. }
      | View::ArtistSongs { offset, .. }
      | View::ArtistAlbums { offset, .. }
      | View::ArtistCategoryList { offset, .. }
      | View::NewAlbumCategoryList { offset, .. }
      | View::Podcast { offset, .. } => Some(*offset),
      View::Search { page, .. } => Some(page.saturating_sub(1) * page_size),
      _ => None,
    }
  }

  /// The same view moved to another offset. Views that do not page are
  /// returned unchanged.
  pub fn at_offset(&self, new_offset: usize, page_size: usize) -> View {
    let mut view = self.clone();
    match &mut view {
      View::Category { offset, .. }
      | View::ArtistSongs { offset, .. }
      | View::ArtistAlbums { offset, .. }
      | View::ArtistCategoryList { offset, .. }
      | View::NewAlbumCategoryList { offset, .. }
      | View::Podcast { offset, .. } => *offset = new_offset,
      View::Search { page, .. } => {
        *page = if page_size == 0 {
          1
        } else {
          new_offset / page_size + 1
        }
      }
      _ => {}
    }
    view
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewSnapshot {
  pub view: View,
  pub view_name: String,
  pub selected_index: Option<usize>,
  /// Stable identifier of the focused row, independent of its list position.
  pub selected_data_index: Option<usize>,
}

impl ViewSnapshot {
  pub fn new(view: View, view_name: impl Into<String>) -> Self {
    Self {
      view,
      view_name: view_name.into(),
      selected_index: None,
      selected_data_index: None,
    }
  }

  pub fn with_selection(mut self, selected_index: Option<usize>, data_index: Option<usize>) -> Self {
    self.selected_index = selected_index;
    self.selected_data_index = data_index;
    self
  }

  pub fn page_type(&self) -> PageType {
    self.view.page_type()
  }

  pub fn is_same_view(&self, other: &ViewSnapshot) -> bool {
    self.view.is_same_view(&other.view)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn artist_songs(offset: usize, order: ArtistSongOrder) -> View {
    View::ArtistSongs {
      artist_id: 42,
      offset,
      order,
    }
  }

  #[test]
  fn test_equality_ignores_selection() {
    let a = ViewSnapshot::new(View::Album { album_id: "7".into() }, "Album 7");
    let b = ViewSnapshot::new(View::Album { album_id: "7".into() }, "Album 7 (renamed)")
      .with_selection(Some(3), Some(3));
    assert!(a.is_same_view(&b));
  }

  #[test]
  fn test_equality_is_tag_specific() {
    assert!(!artist_songs(0, ArtistSongOrder::Hot).is_same_view(&artist_songs(100, ArtistSongOrder::Hot)));
    assert!(!artist_songs(0, ArtistSongOrder::Hot).is_same_view(&artist_songs(0, ArtistSongOrder::Time)));
    assert!(!View::Category {
      id: CategoryId::Toplist,
      offset: 0
    }
    .is_same_view(&View::Category {
      id: CategoryId::Toplist,
      offset: 50
    }));
    assert!(!View::Album { album_id: "7".into() }.is_same_view(&View::Playlist {
      playlist_id: "7".into()
    }));
    assert!(View::ArtistFavorites.is_same_view(&View::ArtistFavorites));
  }

  #[test]
  fn test_view_source_and_pagination_key() {
    let view = artist_songs(300, ArtistSongOrder::Time);
    assert_eq!(view.view_source(), "artist_songs:42:ordertime:offset300");
    assert_eq!(
      view.pagination_key().map(|key| key.to_string()),
      Some("artist_songs:42:ordertime".to_string())
    );
    let category = View::Category {
      id: CategoryId::PlaylistCategory("jazz".into()),
      offset: 0,
    };
    assert_eq!(category.view_source(), "playlist_cat_jazz:offset0");
    assert_eq!(
      category.pagination_key().map(|key| key.to_string()),
      Some("playlist_cat_jazz".to_string())
    );
    assert_eq!(View::Album { album_id: "7".into() }.pagination_key(), None);
  }

  #[test]
  fn test_search_offsets_map_to_pages() {
    let view = View::Search {
      search_type: SearchType::Song,
      keyword: "blue".into(),
      page: 3,
    };
    assert_eq!(view.offset(30), Some(60));
    assert_eq!(
      view.at_offset(90, 30),
      View::Search {
        search_type: SearchType::Song,
        keyword: "blue".into(),
        page: 4,
      }
    );
    assert_eq!(
      artist_songs(0, ArtistSongOrder::Hot).at_offset(200, 100),
      artist_songs(200, ArtistSongOrder::Hot)
    );
    assert_eq!(View::Homepage.at_offset(100, 100), View::Homepage);
  }

  #[test]
  fn test_every_page_type_has_a_name() {
    for page_type in PageType::ALL {
      assert!(!page_type.as_str().is_empty());
    }
  }
}
