use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::{
  fs,
  path::{Path, PathBuf},
  str::FromStr,
  time::Duration,
};

use crate::infra::library::LibraryPageSizes;
use crate::infra::retry::RetryPolicy;

const FILE_NAME: &str = "config.yml";
const CONFIG_DIR: &str = ".config";
const APP_CONFIG_DIR: &str = "catalog-nav";

#[derive(Default, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BehaviorConfigString {
  pub back_debounce_milliseconds: Option<u64>,
  pub library_freshness_seconds: Option<u64>,
  pub concurrent_refresh_threshold: Option<f64>,
  pub log_level: Option<String>,
}

#[derive(Clone, Debug)]
pub struct BehaviorConfig {
  pub back_debounce_milliseconds: u64,
  pub library_freshness_seconds: u64,
  /// Minimum download allocation at which library kinds refresh concurrently.
  pub concurrent_refresh_threshold: f64,
  pub log_level: log::LevelFilter,
}

#[derive(Default, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheConfigString {
  pub album_fetch_concurrency: Option<usize>,
  pub album_fetch_attempts: Option<u32>,
  pub album_fetch_retry_delay_milliseconds: Option<u64>,
  pub artist_index_limit: Option<usize>,
  pub album_songs_limit: Option<usize>,
  pub index_progress_interval: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct CacheConfig {
  pub album_fetch_concurrency: usize,
  pub album_fetch_attempts: u32,
  pub album_fetch_retry_delay_milliseconds: u64,
  pub artist_index_limit: usize,
  pub album_songs_limit: usize,
  pub index_progress_interval: usize,
}

#[derive(Default, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PagingConfigString {
  pub search: Option<usize>,
  pub category: Option<usize>,
  pub artist_songs: Option<usize>,
  pub artist_albums: Option<usize>,
  pub artist_category: Option<usize>,
  pub new_albums: Option<usize>,
  pub podcast_episodes: Option<usize>,
  pub library_playlists: Option<usize>,
  pub library_albums: Option<usize>,
  pub library_podcasts: Option<usize>,
  pub library_artists: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct PagingConfig {
  pub search: usize,
  pub category: usize,
  pub artist_songs: usize,
  pub artist_albums: usize,
  pub artist_category: usize,
  pub new_albums: usize,
  pub podcast_episodes: usize,
  pub library: LibraryPageSizes,
}

#[derive(Default, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserConfigString {
  behavior: Option<BehaviorConfigString>,
  cache: Option<CacheConfigString>,
  paging: Option<PagingConfigString>,
}

#[derive(Clone, Debug)]
pub struct UserConfigPaths {
  pub config_file_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct UserConfig {
  pub behavior: BehaviorConfig,
  pub cache: CacheConfig,
  pub paging: PagingConfig,
  pub path_to_config: Option<UserConfigPaths>,
}

impl Default for UserConfig {
  fn default() -> Self {
    Self::new()
  }
}

impl UserConfig {
  pub fn new() -> UserConfig {
    UserConfig {
      behavior: BehaviorConfig {
        back_debounce_milliseconds: 300,
        library_freshness_seconds: 5 * 60,
        concurrent_refresh_threshold: 0.6,
        log_level: log::LevelFilter::Info,
      },
      cache: CacheConfig {
        album_fetch_concurrency: 4,
        album_fetch_attempts: 3,
        album_fetch_retry_delay_milliseconds: 400,
        artist_index_limit: 16,
        album_songs_limit: 256,
        index_progress_interval: 8,
      },
      paging: PagingConfig {
        search: 30,
        category: 50,
        artist_songs: 100,
        artist_albums: 100,
        artist_category: 100,
        new_albums: 50,
        podcast_episodes: 50,
        library: LibraryPageSizes::default(),
      },
      path_to_config: None,
    }
  }

  pub fn back_debounce(&self) -> Duration {
    Duration::from_millis(self.behavior.back_debounce_milliseconds)
  }

  pub fn library_freshness(&self) -> Duration {
    Duration::from_secs(self.behavior.library_freshness_seconds)
  }

  pub fn album_retry_policy(&self) -> RetryPolicy {
    RetryPolicy {
      max_attempts: self.cache.album_fetch_attempts,
      base_delay: Duration::from_millis(self.cache.album_fetch_retry_delay_milliseconds),
    }
  }

  pub fn get_or_build_paths(&mut self) -> Result<()> {
    match dirs::home_dir() {
      Some(home) => {
        let app_config_dir = Path::new(&home).join(CONFIG_DIR).join(APP_CONFIG_DIR);
        if !app_config_dir.exists() {
          fs::create_dir_all(&app_config_dir)?;
        }
        self.path_to_config = Some(UserConfigPaths {
          config_file_path: app_config_dir.join(FILE_NAME),
        });
        Ok(())
      }
      None => Err(anyhow!("No $HOME directory found for config")),
    }
  }

  pub fn load_behaviorconfig(&mut self, behavior_config: BehaviorConfigString) -> Result<()> {
    if let Some(debounce) = behavior_config.back_debounce_milliseconds {
      if debounce > 5000 {
        return Err(anyhow!(
          "Back debounce must be at most 5000 milliseconds, is {}",
          debounce
        ));
      }
      self.behavior.back_debounce_milliseconds = debounce;
    }

    if let Some(freshness) = behavior_config.library_freshness_seconds {
      if freshness == 0 {
        return Err(anyhow!("Library freshness must be at least one second"));
      }
      self.behavior.library_freshness_seconds = freshness;
    }

    if let Some(threshold) = behavior_config.concurrent_refresh_threshold {
      if !(0.0..=1.0).contains(&threshold) {
        return Err(anyhow!(
          "Concurrent refresh threshold must be between 0 and 1, is {}",
          threshold
        ));
      }
      self.behavior.concurrent_refresh_threshold = threshold;
    }

    if let Some(level) = behavior_config.log_level {
      self.behavior.log_level = log::LevelFilter::from_str(&level)
        .map_err(|_| anyhow!("Unknown log level \"{}\"", level))?;
    }

    Ok(())
  }

  pub fn load_cacheconfig(&mut self, cache_config: CacheConfigString) -> Result<()> {
    macro_rules! positive {
      ($name: ident) => {
        if let Some(value) = cache_config.$name {
          if value == 0 {
            return Err(anyhow!("{} must be greater than 0", stringify!($name)));
          }
          self.cache.$name = value;
        }
      };
    }

    positive!(album_fetch_concurrency);
    positive!(album_fetch_attempts);
    positive!(artist_index_limit);
    positive!(album_songs_limit);
    positive!(index_progress_interval);

    if let Some(delay) = cache_config.album_fetch_retry_delay_milliseconds {
      self.cache.album_fetch_retry_delay_milliseconds = delay;
    }

    Ok(())
  }

  pub fn load_pagingconfig(&mut self, paging_config: PagingConfigString) -> Result<()> {
    macro_rules! page_size {
      ($name: ident => $($target: ident).+) => {
        if let Some(size) = paging_config.$name {
          if size == 0 || size > 1000 {
            return Err(anyhow!(
              "Page size {} must be between 1 and 1000, is {}",
              stringify!($name),
              size
            ));
          }
          self.paging.$($target).+ = size;
        }
      };
    }

    page_size!(search => search);
    page_size!(category => category);
    page_size!(artist_songs => artist_songs);
    page_size!(artist_albums => artist_albums);
    page_size!(artist_category => artist_category);
    page_size!(new_albums => new_albums);
    page_size!(podcast_episodes => podcast_episodes);
    page_size!(library_playlists => library.playlists);
    page_size!(library_albums => library.albums);
    page_size!(library_podcasts => library.podcasts);
    page_size!(library_artists => library.artists);

    Ok(())
  }

  pub fn load_from_str(&mut self, config_string: &str) -> Result<()> {
    // serde fails if file is empty
    if config_string.trim().is_empty() {
      return Ok(());
    }

    let config_yml: UserConfigString = serde_yaml::from_str(config_string)?;

    if let Some(behavior) = config_yml.behavior {
      self.load_behaviorconfig(behavior)?;
    }
    if let Some(cache) = config_yml.cache {
      self.load_cacheconfig(cache)?;
    }
    if let Some(paging) = config_yml.paging {
      self.load_pagingconfig(paging)?;
    }

    Ok(())
  }

  pub fn load_config(&mut self) -> Result<()> {
    if self.path_to_config.is_none() {
      self.get_or_build_paths()?;
    }
    let Some(paths) = &self.path_to_config else {
      return Err(anyhow!("Config path not initialized"));
    };
    if paths.config_file_path.exists() {
      let config_string = fs::read_to_string(&paths.config_file_path)?;
      self.load_from_str(&config_string)
    } else {
      Ok(())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = UserConfig::new();
    assert_eq!(config.back_debounce(), Duration::from_millis(300));
    assert_eq!(config.cache.album_fetch_concurrency, 4);
    assert_eq!(config.paging.library.playlists, 1000);
    assert_eq!(config.album_retry_policy().max_attempts, 3);
  }

  #[test]
  fn test_load_overrides() {
    let mut config = UserConfig::new();
    config
      .load_from_str(
        "behavior:\n  back_debounce_milliseconds: 150\n  log_level: debug\ncache:\n  album_fetch_concurrency: 8\npaging:\n  artist_songs: 50\n  library_albums: 20\n",
      )
      .unwrap();
    assert_eq!(config.behavior.back_debounce_milliseconds, 150);
    assert_eq!(config.behavior.log_level, log::LevelFilter::Debug);
    assert_eq!(config.cache.album_fetch_concurrency, 8);
    assert_eq!(config.paging.artist_songs, 50);
    assert_eq!(config.paging.library.albums, 20);
    assert_eq!(config.paging.search, 30);
  }

  #[test]
  fn test_empty_config_is_ok() {
    let mut config = UserConfig::new();
    assert!(config.load_from_str("  \n").is_ok());
  }

  #[test]
  fn test_rejects_invalid_values() {
    let mut config = UserConfig::new();
    assert!(config
      .load_from_str("behavior:\n  concurrent_refresh_threshold: 1.5\n")
      .is_err());
    assert!(config.load_from_str("cache:\n  artist_index_limit: 0\n").is_err());
    assert!(config.load_from_str("paging:\n  search: 5000\n").is_err());
    assert!(config.load_from_str("behavior:\n  log_level: chatty\n").is_err());
  }

  #[test]
  fn test_load_config_from_path() {
    let dir = std::env::temp_dir().join(format!("catalog-nav-config-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(FILE_NAME);
    fs::write(&path, "behavior:\n  library_freshness_seconds: 60\n").unwrap();

    let mut config = UserConfig::new();
    config.path_to_config = Some(UserConfigPaths {
      config_file_path: path,
    });
    config.load_config().unwrap();
    assert_eq!(config.library_freshness(), Duration::from_secs(60));
    fs::remove_dir_all(&dir).unwrap();
  }
}
