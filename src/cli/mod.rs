mod clap;
mod util;

pub use self::clap::{browse_subcommand, index_subcommand, library_subcommand, pages_subcommand};

use crate::app::{App, BackOutcome, LoadOutcome};
use crate::core::models::{ArtistSongOrder, LibraryKind};
use crate::core::snapshot::View;
use crate::network::IoEvent;
use ::clap::ArgMatches;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use util::{format_index, format_view, order_from_matches};

fn artist_from_matches(m: &ArgMatches) -> Result<u64> {
  m.get_one::<u64>("artist")
    .copied()
    .ok_or_else(|| anyhow!("--artist is required"))
}

pub fn render(app: &App) -> String {
  let live = app.live();
  let max_page = live.paging.as_ref().map(|paging| app.max_page(paging));
  format_view(&live, max_page)
}

/// Parses one line of the interactive prompt into an event. `None` for
/// anything that isn't a known command.
pub fn parse_command(line: &str) -> Option<IoEvent> {
  let words: Vec<&str> = line.split_whitespace().collect();
  let number = |i: usize| words.get(i).and_then(|w| w.parse::<u64>().ok());
  let switch = |i: usize| !matches!(words.get(i), Some(&"off") | Some(&"no"));
  let event = match words.as_slice() {
    ["home"] => IoEvent::Open(View::Homepage),
    ["artist", _] => IoEvent::Open(View::ArtistEntries {
      artist_id: number(1)?,
    }),
    ["songs", _, rest @ ..] => IoEvent::Open(View::ArtistSongs {
      artist_id: number(1)?,
      offset: 0,
      order: match rest.first() {
        Some(token) => ArtistSongOrder::from_token(token)?,
        None => ArtistSongOrder::Hot,
      },
    }),
    ["album", id] => IoEvent::Open(View::Album {
      album_id: id.to_string(),
    }),
    ["playlist", id] => IoEvent::Open(View::Playlist {
      playlist_id: id.to_string(),
    }),
    ["select", _] => IoEvent::Select(number(1)? as usize),
    ["enter"] => IoEvent::OpenSelected,
    ["back"] => IoEvent::GoBack,
    ["next"] => IoEvent::NextPage,
    ["prev"] => IoEvent::PreviousPage,
    ["page", _] => IoEvent::JumpToPage(number(1)? as usize),
    ["refresh", ..] => IoEvent::RefreshLibrary(LibraryKind::ALL.to_vec(), words.len() > 1),
    ["like", id, ..] => IoEvent::SetSongLiked(id.to_string(), switch(2)),
    ["follow", _, ..] => IoEvent::SetArtistSubscribed(number(1)?, switch(2)),
    ["index", _, _] => IoEvent::BuildArtistIndex(
      number(1)?,
      ArtistSongOrder::Time,
      number(2)? as usize,
    ),
    ["logout"] => IoEvent::Logout,
    _ => return None,
  };
  Some(event)
}

/// Runs one subcommand against the app and returns what should be printed.
pub async fn handle_matches(m: &ArgMatches, cmd: String, app: &Arc<App>) -> Result<String> {
  match cmd.as_str() {
    "index" => {
      let artist_id = artist_from_matches(m)?;
      let order = order_from_matches(m);
      let count = m.get_one::<usize>("count").copied().unwrap_or(50);
      let snapshot = app.ensure_artist_index(artist_id, order, count).await?;
      Ok(format_index(&snapshot, count))
    }
    "pages" => {
      let artist_id = artist_from_matches(m)?;
      let view = View::ArtistSongs {
        artist_id,
        offset: m.get_one::<usize>("offset").copied().unwrap_or(0),
        order: order_from_matches(m),
      };
      let mut output = Vec::new();
      let mut outcome = app.open(view).await?;
      output.push(render(app));
      // Each retry targets a strictly lower offset, so this ends.
      while outcome == LoadOutcome::Anomaly && m.get_flag("follow") {
        outcome = app.open_selected().await?;
        output.push(render(app));
      }
      Ok(output.join("\n\n"))
    }
    "library" => {
      app
        .refresh_library(&LibraryKind::ALL, m.get_flag("force"))
        .await?;
      let lines: Vec<String> = LibraryKind::ALL
        .iter()
        .map(|kind| format!("{:<12} {}", kind.display_name(), app.library.count(*kind)))
        .collect();
      Ok(lines.join("\n"))
    }
    "browse" => {
      let artist_id = artist_from_matches(m)?;
      let mut output = Vec::new();
      app.open(View::ArtistEntries { artist_id }).await?;
      output.push(render(app));
      let entries = app.live().rows.len();
      for position in 0..entries {
        app.select(position);
        app.open_selected().await?;
        output.push(render(app));
        // The gate refuses back requests that follow each other too closely.
        tokio::time::sleep(app.config.back_debounce()).await;
        match app.go_back().await {
          BackOutcome::Restored(_) => output.push(render(app)),
          outcome => output.push(format!("-- back: {:?}", outcome)),
        }
      }
      Ok(output.join("\n\n"))
    }
    _ => Err(anyhow!("unknown command {}", cmd)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::infra::api::FixedBandwidth;
  use crate::infra::fixture::tests::big_artist;
  use crate::infra::fixture::FixtureCatalog;
  use crate::user_config::UserConfig;
  use ::clap::Command;

  fn app() -> Arc<App> {
    let mut data = big_artist(500);
    data.servable_limit = Some(300);
    let mut config = UserConfig::new();
    config.behavior.back_debounce_milliseconds = 0;
    App::new(
      Arc::new(FixtureCatalog::new(data)),
      Arc::new(FixedBandwidth(1.0)),
      config,
    )
  }

  fn command() -> Command {
    Command::new("catalog-nav")
      .subcommand(index_subcommand())
      .subcommand(pages_subcommand())
      .subcommand(library_subcommand())
      .subcommand(browse_subcommand())
  }

  async fn run(args: &[&str]) -> String {
    let matches = command().try_get_matches_from(args).unwrap();
    let (cmd, m) = matches.subcommand().unwrap();
    handle_matches(m, cmd.to_string(), &app()).await.unwrap()
  }

  #[test]
  fn test_parse_command() {
    assert!(matches!(
      parse_command("songs 42 time"),
      Some(IoEvent::Open(View::ArtistSongs {
        artist_id: 42,
        offset: 0,
        order: ArtistSongOrder::Time,
      }))
    ));
    assert!(matches!(parse_command(" back "), Some(IoEvent::GoBack)));
    assert!(matches!(
      parse_command("like s1 off"),
      Some(IoEvent::SetSongLiked(id, false)) if id == "s1"
    ));
    assert!(matches!(
      parse_command("refresh force"),
      Some(IoEvent::RefreshLibrary(_, true))
    ));
    assert!(parse_command("songs 42 loudest").is_none());
    assert!(parse_command("select x").is_none());
    assert!(parse_command("").is_none());
  }

  #[tokio::test]
  async fn test_index_command() {
    let output = run(&["catalog-nav", "index", "--artist", "42", "-n", "15"]).await;
    assert!(output.starts_with("40 songs from 4/50 albums"));
    assert!(output.contains("s490"));
  }

  #[tokio::test]
  async fn test_pages_command_follows_retry_row() {
    let output = run(&[
      "catalog-nav",
      "pages",
      "--artist",
      "42",
      "--order",
      "hot",
      "--offset",
      "400",
      "--follow",
    ])
    .await;
    assert!(output.contains("Press Enter to jump there"));
    assert!(output.contains("-- page 3/3"));
  }

  #[tokio::test]
  async fn test_demo_catalog_skips_failing_album() {
    let path = std::path::Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/demos/catalog.json"));
    let mut config = UserConfig::new();
    config.cache.album_fetch_retry_delay_milliseconds = 1;
    let app = App::new(
      Arc::new(FixtureCatalog::load(path).unwrap()),
      Arc::new(FixedBandwidth(1.0)),
      config,
    );
    let matches = command()
      .try_get_matches_from(["catalog-nav", "index", "-a", "42"])
      .unwrap();
    let (cmd, m) = matches.subcommand().unwrap();
    let output = handle_matches(m, cmd.to_string(), &app).await.unwrap();
    assert!(output.contains("Last Boat Out"));
    assert!(output.contains("Morning Ferry"));
    assert!(!output.contains("Low Tide"));
  }

  #[tokio::test]
  async fn test_library_command() {
    let output = run(&["catalog-nav", "library"]).await;
    assert_eq!(output.lines().count(), LibraryKind::ALL.len());
    assert!(output.starts_with("liked songs"));
  }

  #[tokio::test]
  async fn test_browse_command_returns_to_menu() {
    let output = run(&["catalog-nav", "browse", "--artist", "42"]).await;
    assert!(!output.contains("-- back:"));
    assert!(output.contains("[artist_albums:42:orderlatest:offset0]"));
  }
}
