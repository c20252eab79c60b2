pub mod album_songs;
pub mod api;
pub mod artist_index;
pub mod fixture;
pub mod library;
pub mod retry;
