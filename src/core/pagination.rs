//! Pagination keys and the learned offset ceilings behind them
//!
//! Upstream declares totals it cannot always serve. Past some offset a page
//! request either fails with a parameter error or comes back empty. The
//! tracker remembers, per pagination key, the last offset known to be safe and
//! clamps every later page computation to it.

use log::{info, warn};
use parking_lot::Mutex;
use std::{collections::HashMap, fmt};

use super::error::is_bad_parameter_error;
use super::models::{AlbumSort, ArtistSongOrder, SearchType};

/// One paginated resource plus its ordering. The `Display` form doubles as the
/// cache key and is only ever generated, never parsed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PaginationKey {
  Search {
    search_type: SearchType,
    keyword: String,
  },
  ArtistSongs {
    artist_id: u64,
    order: ArtistSongOrder,
  },
  ArtistAlbums {
    artist_id: u64,
    sort: AlbumSort,
  },
  ArtistCategoryList {
    type_code: i32,
    area_code: i32,
  },
  Podcast {
    radio_id: u64,
    ascending: bool,
  },
  PodcastCategory {
    category_id: u32,
  },
  PlaylistCategory {
    name: String,
  },
  NewSongs {
    area_type: i32,
  },
  HighQualityPlaylists,
  Toplist,
  UserCloud,
}

impl fmt::Display for PaginationKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PaginationKey::Search {
        search_type,
        keyword,
      } => write!(f, "search:{}:{}", search_type, keyword),
      PaginationKey::ArtistSongs { artist_id, order } => {
        write!(f, "artist_songs:{}:order{}", artist_id, order)
      }
      PaginationKey::ArtistAlbums { artist_id, sort } => {
        write!(f, "artist_albums:{}:order{}", artist_id, sort)
      }
      PaginationKey::ArtistCategoryList {
        type_code,
        area_code,
      } => write!(f, "artist_category_list:{}:{}", type_code, area_code),
      PaginationKey::Podcast {
        radio_id,
        ascending,
      } => write!(f, "podcast:{}:asc{}", radio_id, u8::from(*ascending)),
      PaginationKey::PodcastCategory { category_id } => write!(f, "podcast_cat_{}", category_id),
      PaginationKey::PlaylistCategory { name } => write!(f, "playlist_cat_{}", name),
      PaginationKey::NewSongs { area_type } => write!(f, "new_songs:{}", area_type),
      PaginationKey::HighQualityPlaylists => f.write_str("highquality_playlists"),
      PaginationKey::Toplist => f.write_str("toplist"),
      PaginationKey::UserCloud => f.write_str("user_cloud"),
    }
  }
}

/// Number of pages implied by a declared total, or `fallback` (at least 1)
/// when either side is unknown.
pub fn max_page_from_total(total: usize, page_size: usize, fallback: usize) -> usize {
  if total == 0 || page_size == 0 {
    return fallback.max(1);
  }
  total.div_ceil(page_size)
}

/// Snaps `offset` back to the start of the last page a declared total allows.
pub fn clamp_offset_to_total(offset: usize, page_size: usize, total: usize) -> (usize, bool) {
  if total == 0 || page_size == 0 {
    return (offset, false);
  }
  let max_start = ((total - 1) / page_size) * page_size;
  if offset > max_start {
    (max_start, true)
  } else {
    (offset, false)
  }
}

#[derive(Default)]
struct TrackerState {
  caps: HashMap<String, usize>,
  totals: HashMap<String, usize>,
}

#[derive(Default)]
pub struct PaginationOffsetTracker {
  state: Mutex<TrackerState>,
}

impl PaginationOffsetTracker {
  pub fn new() -> Self {
    Self::default()
  }

  /// Highest offset known to be servable, if a ceiling has been learned.
  pub fn get_cap(&self, key: &PaginationKey) -> Option<usize> {
    self.state.lock().caps.get(&key.to_string()).copied()
  }

  /// Records `candidate` unless an equal or tighter cap is already known.
  /// Returns whether the stored cap changed.
  pub fn set_cap(&self, key: &PaginationKey, candidate: usize) -> bool {
    let key = key.to_string();
    let mut state = self.state.lock();
    match state.caps.get(&key) {
      Some(&existing) if existing <= candidate => false,
      _ => {
        info!("[Pagination] learned offset cap {} for {}", candidate, key);
        state.caps.insert(key, candidate);
        true
      }
    }
  }

  pub fn record_total(&self, key: &PaginationKey, total: usize) {
    if total > 0 {
      self.state.lock().totals.insert(key.to_string(), total);
    }
  }

  pub fn declared_total(&self, key: &PaginationKey) -> Option<usize> {
    self.state.lock().totals.get(&key.to_string()).copied()
  }

  pub fn resolve_max_page(
    &self,
    key: &PaginationKey,
    page_size: usize,
    declared_max_page: usize,
  ) -> usize {
    let max_page = declared_max_page.max(1);
    match self.get_cap(key) {
      Some(cap) if page_size > 0 => max_page.min(cap / page_size + 1),
      _ => max_page,
    }
  }

  /// Clamps a requested offset to the start of the last page under the cap.
  pub fn normalize_offset(
    &self,
    key: &PaginationKey,
    page_size: usize,
    requested: usize,
  ) -> (usize, bool) {
    let Some(cap) = self.get_cap(key) else {
      return (requested, false);
    };
    if page_size == 0 || requested <= cap {
      return (requested, false);
    }
    let last_page = cap / page_size + 1;
    let offset = (last_page - 1) * page_size;
    (offset, offset != requested)
  }

  /// Clamps a 1-based page number into `1..=resolve_max_page`.
  pub fn normalize_page(
    &self,
    key: &PaginationKey,
    page_size: usize,
    requested_page: usize,
    declared_max_page: usize,
  ) -> (usize, bool) {
    let max_page = self.resolve_max_page(key, page_size, declared_max_page);
    let page = requested_page.clamp(1, max_page);
    (page, page != requested_page)
  }

  /// Learns a cap from a failed page request. Returns the resulting max page
  /// when the failure was a parameter error.
  pub fn learn_from_error(
    &self,
    key: &PaginationKey,
    offset: usize,
    page_size: usize,
    err: &anyhow::Error,
  ) -> Option<usize> {
    if !is_bad_parameter_error(err) {
      return None;
    }
    // Nothing below offset 0 to fall back to; the failure is not a paging anomaly.
    if offset == 0 {
      warn!("[Pagination] {} refused its first page", key);
      return None;
    }
    self.set_cap(key, offset - 1);
    Some(self.current_max_page(key, page_size))
  }

  /// Learns a cap from an empty page at an offset the previously declared
  /// total said should have data.
  pub fn learn_from_empty_page(
    &self,
    key: &PaginationKey,
    offset: usize,
    page_size: usize,
    item_count: usize,
    response_total: usize,
  ) -> Option<usize> {
    if page_size == 0 || item_count > 0 {
      return None;
    }
    let declared = self.declared_total(key).unwrap_or(response_total);
    if offset == 0 || declared == 0 || declared <= offset {
      return None;
    }
    self.set_cap(key, offset - 1);
    Some(self.current_max_page(key, page_size))
  }

  fn current_max_page(&self, key: &PaginationKey, page_size: usize) -> usize {
    if page_size == 0 {
      return 1;
    }
    let declared_max_page = self
      .declared_total(key)
      .map(|total| max_page_from_total(total, page_size, 1))
      .unwrap_or(usize::MAX);
    self.resolve_max_page(key, page_size, declared_max_page)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::error::ApiError;
  use anyhow::anyhow;

  fn hot_key() -> PaginationKey {
    PaginationKey::ArtistSongs {
      artist_id: 42,
      order: ArtistSongOrder::Hot,
    }
  }

  #[test]
  fn test_key_formats() {
    assert_eq!(hot_key().to_string(), "artist_songs:42:orderhot");
    assert_eq!(
      PaginationKey::Search {
        search_type: SearchType::Song,
        keyword: "blue".into()
      }
      .to_string(),
      "search:song:blue"
    );
    assert_eq!(
      PaginationKey::ArtistAlbums {
        artist_id: 9,
        sort: AlbumSort::Oldest
      }
      .to_string(),
      "artist_albums:9:orderoldest"
    );
    assert_eq!(
      PaginationKey::ArtistCategoryList {
        type_code: 1,
        area_code: 96
      }
      .to_string(),
      "artist_category_list:1:96"
    );
    assert_eq!(
      PaginationKey::Podcast {
        radio_id: 5,
        ascending: true
      }
      .to_string(),
      "podcast:5:asc1"
    );
    assert_eq!(
      PaginationKey::PodcastCategory { category_id: 3 }.to_string(),
      "podcast_cat_3"
    );
    assert_eq!(
      PaginationKey::PlaylistCategory { name: "jazz".into() }.to_string(),
      "playlist_cat_jazz"
    );
    assert_eq!(PaginationKey::NewSongs { area_type: 7 }.to_string(), "new_songs:7");
    assert_eq!(
      PaginationKey::HighQualityPlaylists.to_string(),
      "highquality_playlists"
    );
    assert_eq!(PaginationKey::Toplist.to_string(), "toplist");
    assert_eq!(PaginationKey::UserCloud.to_string(), "user_cloud");
  }

  #[test]
  fn test_normalize_offset_snaps_to_last_page_under_cap() {
    let tracker = PaginationOffsetTracker::new();
    tracker.set_cap(&hot_key(), 250);
    assert_eq!(tracker.normalize_offset(&hot_key(), 100, 400), (200, true));
    assert_eq!(tracker.normalize_offset(&hot_key(), 100, 200), (200, false));
    assert_eq!(tracker.normalize_offset(&hot_key(), 100, 0), (0, false));
  }

  #[test]
  fn test_normalize_offset_without_cap_is_identity() {
    let tracker = PaginationOffsetTracker::new();
    assert_eq!(tracker.get_cap(&hot_key()), None);
    assert_eq!(tracker.normalize_offset(&hot_key(), 100, 900), (900, false));
  }

  #[test]
  fn test_caps_only_tighten() {
    let tracker = PaginationOffsetTracker::new();
    assert!(tracker.set_cap(&hot_key(), 499));
    assert!(!tracker.set_cap(&hot_key(), 800));
    assert!(!tracker.set_cap(&hot_key(), 499));
    assert!(tracker.set_cap(&hot_key(), 299));
    assert_eq!(tracker.get_cap(&hot_key()), Some(299));
  }

  #[test]
  fn test_resolve_max_page_is_monotone() {
    let tracker = PaginationOffsetTracker::new();
    let mut previous = tracker.resolve_max_page(&hot_key(), 100, 20);
    assert_eq!(previous, 20);
    for cap in [1500, 1900, 999, 1200, 450, 0] {
      tracker.set_cap(&hot_key(), cap);
      let max_page = tracker.resolve_max_page(&hot_key(), 100, 20);
      assert!(max_page <= previous);
      previous = max_page;
    }
    assert_eq!(previous, 1);
  }

  #[test]
  fn test_normalized_offset_never_exceeds_cap() {
    for cap in [0, 1, 99, 100, 101, 250, 999] {
      let tracker = PaginationOffsetTracker::new();
      tracker.set_cap(&hot_key(), cap);
      for page_size in [1, 30, 50, 100] {
        for requested in (0..2000).step_by(37) {
          let (offset, _) = tracker.normalize_offset(&hot_key(), page_size, requested);
          assert!(offset <= cap);
          assert!(offset <= requested);
        }
      }
    }
  }

  #[test]
  fn test_normalize_page() {
    let tracker = PaginationOffsetTracker::new();
    tracker.set_cap(&hot_key(), 250);
    assert_eq!(tracker.normalize_page(&hot_key(), 100, 9, 10), (3, true));
    assert_eq!(tracker.normalize_page(&hot_key(), 100, 2, 10), (2, false));
    assert_eq!(tracker.normalize_page(&hot_key(), 100, 0, 10), (1, true));
  }

  #[test]
  fn test_learn_from_bad_parameter_error() {
    let tracker = PaginationOffsetTracker::new();
    tracker.record_total(&hot_key(), 1000);
    let err: anyhow::Error = ApiError::BadParameter("offset".into()).into();
    assert_eq!(tracker.learn_from_error(&hot_key(), 300, 100, &err), Some(3));
    assert_eq!(tracker.get_cap(&hot_key()), Some(299));

    assert_eq!(
      tracker.learn_from_error(&hot_key(), 100, 100, &anyhow!("timeout")),
      None
    );
    assert_eq!(tracker.get_cap(&hot_key()), Some(299));
  }

  #[test]
  fn test_refused_first_page_learns_no_cap() {
    let tracker = PaginationOffsetTracker::new();
    tracker.record_total(&PaginationKey::Toplist, 200);
    let err: anyhow::Error = ApiError::BadParameter("offset".into()).into();
    assert_eq!(tracker.learn_from_error(&PaginationKey::Toplist, 0, 50, &err), None);
    assert_eq!(tracker.get_cap(&PaginationKey::Toplist), None);
    assert_eq!(
      tracker.learn_from_empty_page(&PaginationKey::Toplist, 0, 50, 0, 200),
      None
    );
    assert_eq!(tracker.get_cap(&PaginationKey::Toplist), None);
  }

  #[test]
  fn test_learn_from_empty_page_uses_previous_total() {
    let tracker = PaginationOffsetTracker::new();
    tracker.record_total(&hot_key(), 500);
    assert_eq!(
      tracker.learn_from_empty_page(&hot_key(), 300, 100, 0, 0),
      Some(3)
    );
    assert_eq!(tracker.get_cap(&hot_key()), Some(299));

    // a non-empty page or an offset past the declared total teaches nothing
    assert_eq!(tracker.learn_from_empty_page(&hot_key(), 200, 100, 5, 0), None);
    assert_eq!(tracker.learn_from_empty_page(&hot_key(), 600, 100, 0, 0), None);
  }

  #[test]
  fn test_total_helpers() {
    assert_eq!(max_page_from_total(0, 100, 0), 1);
    assert_eq!(max_page_from_total(250, 100, 1), 3);
    assert_eq!(max_page_from_total(300, 100, 1), 3);
    assert_eq!(clamp_offset_to_total(500, 100, 250), (200, true));
    assert_eq!(clamp_offset_to_total(100, 100, 250), (100, false));
    assert_eq!(clamp_offset_to_total(100, 100, 0), (100, false));
  }
}
