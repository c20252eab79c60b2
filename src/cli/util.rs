use crate::app::LiveView;
use crate::core::models::{ArtistSongOrder, ListItem, ListRow};
use crate::infra::artist_index::IndexSnapshot;
use clap::ArgMatches;

pub fn order_from_matches(m: &ArgMatches) -> ArtistSongOrder {
  m.get_one::<String>("order")
    .and_then(|token| ArtistSongOrder::from_token(token))
    // Enforced by clap
    .unwrap_or(ArtistSongOrder::Time)
}

fn flags(item: &ListItem) -> &'static str {
  match item {
    ListItem::Song(song) if song.is_liked => " ♥",
    ListItem::Album(album) if album.is_subscribed => " +",
    ListItem::Artist(artist) if artist.is_subscribed => " +",
    ListItem::Playlist(playlist) if playlist.is_owned => " *",
    ListItem::Playlist(playlist) if playlist.is_subscribed => " +",
    ListItem::Podcast(podcast) if podcast.is_subscribed => " +",
    _ => "",
  }
}

pub fn format_row(row: &ListRow) -> String {
  let detail = match &row.item {
    ListItem::Song(song) if !song.artist.is_empty() => format!(" - {}", song.artist),
    ListItem::Album(album) if !album.artist.is_empty() => format!(" - {}", album.artist),
    ListItem::Entry(_) => " >".to_string(),
    _ => String::new(),
  };
  format!(
    "{:>5}  {}{}{}",
    row.data_index,
    row.item.name(),
    detail,
    flags(&row.item)
  )
}

/// Renders a view the way the list pane would, with `max_page` for the footer.
pub fn format_view(live: &LiveView, max_page: Option<usize>) -> String {
  let mut lines = vec![format!("== {} [{}]", live.name, live.view.view_source())];
  if let Some(notice) = &live.notice {
    lines.push(format!("!! {}", notice));
  }
  for (position, row) in live.rows.iter().enumerate() {
    let marker = if live.selected == Some(position) { ">" } else { " " };
    lines.push(format!("{}{}", marker, format_row(row)));
  }
  if let Some(retry) = &live.retry {
    lines.push(format!(">  {}", retry.message));
  }
  if let (Some(paging), Some(max_page)) = (&live.paging, max_page) {
    lines.push(format!(
      "-- page {}/{} ({} total)",
      paging.page(),
      max_page,
      paging.total
    ));
  }
  if let Some(status) = &live.status {
    lines.push(format!("-- {}", status));
  }
  lines.join("\n")
}

pub fn format_index(snapshot: &IndexSnapshot, count: usize) -> String {
  let mut lines = vec![format!(
    "{} songs from {}/{} albums{}",
    snapshot.songs.len(),
    snapshot.albums_processed,
    snapshot.album_count,
    if snapshot.is_complete { " (complete)" } else { "" }
  )];
  for (i, song) in snapshot.songs.iter().take(count).enumerate() {
    lines.push(format!("{:>5}  {} [{}]", i, song.name, song.album_id));
  }
  lines.join("\n")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::models::{Entry, Song};
  use crate::core::snapshot::View;

  #[test]
  fn test_format_row_marks_liked_songs() {
    let row = ListRow::new(
      ListItem::Song(Song {
        id: "1".to_string(),
        name: "Intro".to_string(),
        artist: "Band".to_string(),
        is_liked: true,
        ..Default::default()
      }),
      12,
    );
    assert_eq!(format_row(&row), "   12  Intro - Band ♥");
  }

  #[test]
  fn test_format_row_entry() {
    let row = ListRow::new(
      ListItem::Entry(Entry {
        title: "Albums".to_string(),
        target: View::ArtistFavorites,
      }),
      0,
    );
    assert_eq!(format_row(&row), "    0  Albums >");
  }
}
