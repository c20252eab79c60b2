use anyhow::{anyhow, Result};
use catalog_nav::{
  app::App,
  cli,
  infra::{api::FixedBandwidth, fixture::FixtureCatalog},
  network::{start_tokio, Network},
  user_config::{UserConfig, UserConfigPaths},
};
use clap::{Arg, Command as ClapApp};
use log::info;
use std::{path::PathBuf, sync::Arc};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

fn setup_logging(level: log::LevelFilter) -> Result<()> {
  let pid = std::process::id();

  let log_dir = "/tmp/catalog-nav_logs/";
  let log_path = format!("{}catalog-navlog{}", log_dir, pid);

  if !std::path::Path::new(log_dir).exists() {
    std::fs::create_dir_all(log_dir)
      .map_err(|e| anyhow!("Failed to create log directory {}: {}", log_dir, e))?;
  }
  fern::Dispatch::new()
    .format(|out, message, record| {
      out.finish(format_args!(
        "{}[{}][{}] {}",
        chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
        record.target(),
        record.level(),
        message
      ))
    })
    .level(level)
    .chain(fern::log_file(&log_path)?)
    .apply()
    .map_err(|e| anyhow!("Failed to initialize logger: {}", e))?;

  println!("Logging to: {}", log_path);

  Ok(())
}

/// Reads commands from stdin and feeds them to the event loop until EOF or `quit`.
async fn run_prompt(app: Arc<App>) -> Result<()> {
  let (io_tx, io_rx) = mpsc::unbounded_channel();
  let network = Network::new(&app);
  let event_loop = tokio::spawn(start_tokio(io_rx, network));

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  while let Some(line) = lines.next_line().await? {
    match line.trim() {
      "" => continue,
      "quit" | "q" => break,
      "show" => println!("{}", cli::render(&app)),
      command => match cli::parse_command(command) {
        Some(event) => io_tx.send(event)?,
        None => println!("Unknown command: {}", command),
      },
    }
  }

  drop(io_tx);
  event_loop.await?;
  println!("{}", cli::render(&app));
  Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
  let matches = ClapApp::new(env!("CARGO_PKG_NAME"))
    .version(env!("CARGO_PKG_VERSION"))
    .author(env!("CARGO_PKG_AUTHORS"))
    .about(env!("CARGO_PKG_DESCRIPTION"))
    .after_help(
      "Without a subcommand, commands are read from stdin: home, artist <id>, \
songs <id> [hot|time], album <id>, playlist <id>, select <n>, enter, back, next, \
prev, page <n>, refresh [force], like <song> [off], follow <artist> [off], \
index <artist> <count>, logout, show, quit",
    )
    .arg(
      Arg::new("config")
        .short('c')
        .long("config")
        .help("Specify configuration file path."),
    )
    .arg(
      Arg::new("fixture")
        .short('f')
        .long("fixture")
        .value_name("FILE")
        .required(true)
        .help("JSON catalog to serve content from"),
    )
    .subcommand(cli::index_subcommand())
    .subcommand(cli::pages_subcommand())
    .subcommand(cli::library_subcommand())
    .subcommand(cli::browse_subcommand())
    .get_matches();

  let mut user_config = UserConfig::new();
  if let Some(config_file_path) = matches.get_one::<String>("config") {
    let config_file_path = PathBuf::from(config_file_path);
    let path = UserConfigPaths { config_file_path };
    user_config.path_to_config.replace(path);
  }
  user_config.load_config()?;

  setup_logging(user_config.behavior.log_level)?;
  info!("catalog-nav {} starting up", env!("CARGO_PKG_VERSION"));

  let fixture = matches
    .get_one::<String>("fixture")
    .ok_or_else(|| anyhow!("--fixture is required"))?;
  let catalog = FixtureCatalog::load(&PathBuf::from(fixture))?;
  info!("catalog loaded from {}", fixture);

  let app = App::new(Arc::new(catalog), Arc::new(FixedBandwidth(1.0)), user_config);

  let result = match matches.subcommand() {
    Some((cmd, m)) => cli::handle_matches(m, cmd.to_string(), &app)
      .await
      .map(|output| println!("{}", output)),
    None => run_prompt(Arc::clone(&app)).await,
  };
  app.shutdown().await;
  result
}
