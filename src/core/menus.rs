//! Static menu views that need no network round trip

use super::models::{AlbumSort, ArtistSongOrder, Entry, ListItem, ListRow};
use super::snapshot::{CategoryId, View};

/// Artist category type codes accepted by the category listing endpoint.
pub const ARTIST_TYPES: [(i32, &str); 3] = [(1, "Male artists"), (2, "Female artists"), (3, "Bands")];

/// Area codes shared by artist and album category listings.
pub const AREAS: [(i32, &str); 6] = [
  (-1, "All"),
  (7, "Chinese"),
  (96, "Western"),
  (8, "Japanese"),
  (16, "Korean"),
  (0, "Other"),
];

pub const ALBUM_PERIODS: [(i32, &str); 2] = [(1, "This week"), (2, "This month")];

fn entry_rows(entries: Vec<(String, View)>) -> Vec<ListRow> {
  entries
    .into_iter()
    .enumerate()
    .map(|(i, (title, target))| ListRow::new(ListItem::Entry(Entry { title, target }), i))
    .collect()
}

pub fn homepage() -> Vec<ListRow> {
  entry_rows(vec![
    (
      "Toplists".to_string(),
      View::Category {
        id: CategoryId::Toplist,
        offset: 0,
      },
    ),
    (
      "High quality playlists".to_string(),
      View::Category {
        id: CategoryId::HighQualityPlaylists,
        offset: 0,
      },
    ),
    (
      "New songs".to_string(),
      View::Category {
        id: CategoryId::NewSongs(0),
        offset: 0,
      },
    ),
    (
      "Cloud drive".to_string(),
      View::Category {
        id: CategoryId::UserCloud,
        offset: 0,
      },
    ),
    ("Followed artists".to_string(), View::ArtistFavorites),
    ("Artist categories".to_string(), View::ArtistCategoryTypes),
    ("New albums".to_string(), View::NewAlbumCategoryPeriods),
  ])
}

pub fn artist_entries(artist_id: u64) -> Vec<ListRow> {
  entry_rows(vec![
    ("Top songs".to_string(), View::ArtistTop { artist_id }),
    (
      "All songs (popular)".to_string(),
      View::ArtistSongs {
        artist_id,
        offset: 0,
        order: ArtistSongOrder::Hot,
      },
    ),
    (
      "All songs (newest)".to_string(),
      View::ArtistSongs {
        artist_id,
        offset: 0,
        order: ArtistSongOrder::Time,
      },
    ),
    (
      "Albums".to_string(),
      View::ArtistAlbums {
        artist_id,
        offset: 0,
        sort: AlbumSort::Latest,
      },
    ),
  ])
}

pub fn artist_category_types() -> Vec<ListRow> {
  entry_rows(
    ARTIST_TYPES
      .iter()
      .map(|(type_code, name)| {
        (
          name.to_string(),
          View::ArtistCategoryType {
            type_code: *type_code,
          },
        )
      })
      .collect(),
  )
}

pub fn artist_category_areas(type_code: i32) -> Vec<ListRow> {
  entry_rows(
    AREAS
      .iter()
      .map(|(area_code, name)| {
        (
          name.to_string(),
          View::ArtistCategoryList {
            type_code,
            area_code: *area_code,
            offset: 0,
          },
        )
      })
      .collect(),
  )
}

pub fn new_album_periods() -> Vec<ListRow> {
  entry_rows(
    ALBUM_PERIODS
      .iter()
      .map(|(period_code, name)| {
        (
          name.to_string(),
          View::NewAlbumCategoryPeriod {
            period_code: *period_code,
          },
        )
      })
      .collect(),
  )
}

pub fn new_album_areas(period_code: i32) -> Vec<ListRow> {
  entry_rows(
    AREAS
      .iter()
      .map(|(area_code, name)| {
        (
          name.to_string(),
          View::NewAlbumCategoryList {
            period_code,
            area_code: *area_code,
            offset: 0,
          },
        )
      })
      .collect(),
  )
}

pub fn type_name(type_code: i32) -> &'static str {
  ARTIST_TYPES
    .iter()
    .find(|(code, _)| *code == type_code)
    .map(|(_, name)| *name)
    .unwrap_or("Artists")
}

pub fn period_name(period_code: i32) -> &'static str {
  ALBUM_PERIODS
    .iter()
    .find(|(code, _)| *code == period_code)
    .map(|(_, name)| *name)
    .unwrap_or("New albums")
}
