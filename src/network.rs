use crate::app::{App, LoadOutcome};
use crate::core::models::{ArtistSongOrder, LibraryKind};
use crate::core::snapshot::View;
use anyhow::Result;
use log::debug;
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinSet};

#[derive(Debug)]
pub enum IoEvent {
  Open(View),
  OpenSelected,
  Select(usize),
  GoBack,
  NextPage,
  PreviousPage,
  JumpToPage(usize),
  RefreshLibrary(Vec<LibraryKind>, bool),
  SetSongLiked(String, bool),
  SetAlbumSubscribed(String, bool),
  SetArtistSubscribed(u64, bool),
  SetPlaylistSubscribed(String, bool),
  SetPodcastSubscribed(u64, bool),
  BuildArtistIndex(u64, ArtistSongOrder, usize),
  Logout,
}

#[derive(Clone)]
pub struct Network {
  pub app: Arc<App>,
}

impl Network {
  pub fn new(app: &Arc<App>) -> Self {
    Network {
      app: Arc::clone(app),
    }
  }

  pub async fn handle_network_event(&self, io_event: IoEvent) {
    match io_event {
      IoEvent::Open(view) => {
        let source = view.view_source();
        self.report(&source, self.app.open(view).await);
      }
      IoEvent::OpenSelected => {
        self.report("selection", self.app.open_selected().await);
      }
      IoEvent::Select(index) => {
        self.app.select(index);
      }
      IoEvent::GoBack => {
        let outcome = self.app.go_back().await;
        debug!("[Network] back: {:?}", outcome);
      }
      IoEvent::NextPage => {
        self.report("next page", self.app.load_next_page().await);
      }
      IoEvent::PreviousPage => {
        self.report("previous page", self.app.load_previous_page().await);
      }
      IoEvent::JumpToPage(page) => {
        self.report("page jump", self.app.jump_to_page(page).await);
      }
      IoEvent::RefreshLibrary(kinds, force) => {
        if let Err(e) = self.app.refresh_library(&kinds, force).await {
          self.app.handle_error(e);
        }
      }
      IoEvent::SetSongLiked(song_id, liked) => {
        self.app.set_song_liked(&song_id, liked);
      }
      IoEvent::SetAlbumSubscribed(album_id, subscribed) => {
        self.app.set_album_subscribed(&album_id, subscribed);
      }
      IoEvent::SetArtistSubscribed(artist_id, subscribed) => {
        self.app.set_artist_subscribed(artist_id, subscribed);
      }
      IoEvent::SetPlaylistSubscribed(playlist_id, subscribed) => {
        self.app.set_playlist_subscribed(&playlist_id, subscribed);
      }
      IoEvent::SetPodcastSubscribed(podcast_id, subscribed) => {
        self.app.set_podcast_subscribed(podcast_id, subscribed);
      }
      IoEvent::BuildArtistIndex(artist_id, order, required) => {
        match self.app.ensure_artist_index(artist_id, order, required).await {
          Ok(snapshot) => self.app.set_status(format!(
            "Indexed {} songs from {}/{} albums",
            snapshot.songs.len(),
            snapshot.albums_processed,
            snapshot.album_count
          )),
          Err(e) => self.app.handle_error(e),
        }
      }
      IoEvent::Logout => {
        self.app.on_logout();
      }
    };
  }

  // Loaders surface their own failures on the live view.
  fn report(&self, what: &str, result: Result<LoadOutcome>) {
    match result {
      Ok(outcome) => debug!("[Network] {}: {:?}", what, outcome),
      Err(e) => debug!("[Network] {} failed: {}", what, e),
    }
  }
}

/// Runs every event on its own task so a back request can overtake a slow
/// load. Returns once the sender side is gone and all events have finished.
pub async fn start_tokio(mut io_rx: mpsc::UnboundedReceiver<IoEvent>, network: Network) {
  let mut running = JoinSet::new();
  while let Some(io_event) = io_rx.recv().await {
    let network = network.clone();
    running.spawn(async move { network.handle_network_event(io_event).await });
    while running.try_join_next().is_some() {}
  }
  while running.join_next().await.is_some() {}
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::infra::api::FixedBandwidth;
  use crate::infra::fixture::tests::big_artist;
  use crate::infra::fixture::FixtureCatalog;
  use crate::user_config::UserConfig;

  fn network() -> Network {
    let app = App::new(
      Arc::new(FixtureCatalog::new(big_artist(30))),
      Arc::new(FixedBandwidth(1.0)),
      UserConfig::new(),
    );
    Network::new(&app)
  }

  #[tokio::test]
  async fn test_events_drive_the_app() {
    let network = network();
    network
      .handle_network_event(IoEvent::Open(View::ArtistEntries { artist_id: 42 }))
      .await;
    network.handle_network_event(IoEvent::Select(3)).await;
    network.handle_network_event(IoEvent::OpenSelected).await;
    assert_eq!(network.app.live().rows.len(), 3);

    network.handle_network_event(IoEvent::GoBack).await;
    assert_eq!(
      network.app.live().view,
      View::ArtistEntries { artist_id: 42 }
    );
  }

  #[tokio::test]
  async fn test_loop_drains_after_sender_closes() {
    let network = network();
    let app = Arc::clone(&network.app);
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(IoEvent::BuildArtistIndex(42, ArtistSongOrder::Time, 10))
      .unwrap();
    drop(tx);
    start_tokio(rx, network).await;
    assert_eq!(
      app.status().as_deref(),
      Some("Indexed 30 songs from 3/3 albums")
    );
  }
}
