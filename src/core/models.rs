//! Catalog entities and the rows handed to the list renderer

use serde::{Deserialize, Serialize};
use std::fmt;

use super::snapshot::View;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Song {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub artist: String,
  #[serde(default)]
  pub album_id: String,
  #[serde(default)]
  pub is_liked: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Album {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub artist: String,
  /// Release date as a unix timestamp in milliseconds.
  #[serde(default)]
  pub publish_time: i64,
  #[serde(default)]
  pub is_subscribed: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Artist {
  pub id: u64,
  pub name: String,
  #[serde(default)]
  pub is_subscribed: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtistDetail {
  pub id: u64,
  pub name: String,
  #[serde(default)]
  pub music_count: usize,
  #[serde(default)]
  pub album_count: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub creator_id: u64,
  #[serde(default)]
  pub is_subscribed: bool,
  #[serde(default)]
  pub is_owned: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Podcast {
  pub id: u64,
  pub name: String,
  #[serde(default)]
  pub is_subscribed: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Episode {
  pub id: String,
  pub name: String,
  pub radio_id: u64,
  /// Position of the episode in the podcast, oldest first.
  #[serde(default)]
  pub serial: usize,
}

/// A static menu row that opens another view when activated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
  pub title: String,
  pub target: View,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListItem {
  Song(Song),
  Album(Album),
  Artist(Artist),
  Playlist(Playlist),
  Podcast(Podcast),
  Episode(Episode),
  Entry(Entry),
}

impl ListItem {
  pub fn name(&self) -> &str {
    match self {
      ListItem::Song(song) => &song.name,
      ListItem::Album(album) => &album.name,
      ListItem::Artist(artist) => &artist.name,
      ListItem::Playlist(playlist) => &playlist.name,
      ListItem::Podcast(podcast) => &podcast.name,
      ListItem::Episode(episode) => &episode.name,
      ListItem::Entry(entry) => &entry.title,
    }
  }

  /// Library kind whose membership flags apply to this row, if any.
  pub fn library_kind(&self) -> Option<LibraryKind> {
    match self {
      ListItem::Song(_) => Some(LibraryKind::Songs),
      ListItem::Album(_) => Some(LibraryKind::Albums),
      ListItem::Artist(_) => Some(LibraryKind::Artists),
      ListItem::Playlist(_) => Some(LibraryKind::Playlists),
      ListItem::Podcast(_) => Some(LibraryKind::Podcasts),
      ListItem::Episode(_) | ListItem::Entry(_) => None,
    }
  }
}

/// A rendered row. `data_index` is the item's absolute position in its source
/// collection and survives re-rendering at a different list position.
#[derive(Clone, Debug, PartialEq)]
pub struct ListRow {
  pub item: ListItem,
  pub data_index: usize,
}

impl ListRow {
  pub fn new(item: ListItem, data_index: usize) -> Self {
    Self { item, data_index }
  }
}

pub fn rows_from<T>(items: Vec<T>, first_index: usize, wrap: fn(T) -> ListItem) -> Vec<ListRow> {
  items
    .into_iter()
    .enumerate()
    .map(|(i, item)| ListRow::new(wrap(item), first_index + i))
    .collect()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  /// Total declared by upstream. It may exceed what is actually servable.
  pub total: usize,
  #[serde(default)]
  pub has_more: bool,
}

impl<T> Page<T> {
  pub fn new(items: Vec<T>, total: usize, has_more: bool) -> Self {
    Self {
      items,
      total,
      has_more,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryKind {
  Songs,
  Playlists,
  Albums,
  Artists,
  Podcasts,
}

impl LibraryKind {
  pub const ALL: [LibraryKind; 5] = [
    LibraryKind::Songs,
    LibraryKind::Playlists,
    LibraryKind::Albums,
    LibraryKind::Artists,
    LibraryKind::Podcasts,
  ];

  pub fn display_name(&self) -> &'static str {
    match self {
      LibraryKind::Songs => "liked songs",
      LibraryKind::Playlists => "playlists",
      LibraryKind::Albums => "albums",
      LibraryKind::Artists => "artists",
      LibraryKind::Podcasts => "podcasts",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
  Song,
  Album,
  Artist,
  Playlist,
  Podcast,
}

impl SearchType {
  pub fn as_str(&self) -> &'static str {
    match self {
      SearchType::Song => "song",
      SearchType::Album => "album",
      SearchType::Artist => "artist",
      SearchType::Playlist => "playlist",
      SearchType::Podcast => "podcast",
    }
  }
}

impl fmt::Display for SearchType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Song ordering accepted by the artist songs endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtistSongOrder {
  #[default]
  Hot,
  Time,
}

impl ArtistSongOrder {
  pub fn token(&self) -> &'static str {
    match self {
      ArtistSongOrder::Hot => "hot",
      ArtistSongOrder::Time => "time",
    }
  }

  pub fn from_token(token: &str) -> Option<Self> {
    match token {
      "hot" => Some(ArtistSongOrder::Hot),
      "time" => Some(ArtistSongOrder::Time),
      _ => None,
    }
  }
}

impl fmt::Display for ArtistSongOrder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.token())
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlbumSort {
  #[default]
  Latest,
  Oldest,
}

impl AlbumSort {
  pub fn token(&self) -> &'static str {
    match self {
      AlbumSort::Latest => "latest",
      AlbumSort::Oldest => "oldest",
    }
  }
}

impl fmt::Display for AlbumSort {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.token())
  }
}
