use clap::{value_parser, Arg, ArgAction, Command};

fn artist_arg() -> Arg {
  Arg::new("artist")
    .short('a')
    .long("artist")
    .value_name("ARTIST_ID")
    .value_parser(value_parser!(u64))
    .required(true)
    .help("Artist id in the catalog")
}

fn order_arg() -> Arg {
  Arg::new("order")
    .short('o')
    .long("order")
    .value_name("ORDER")
    .value_parser(["hot", "time"])
    .default_value("time")
    .help("Song order: `hot` (popularity) or `time` (newest first)")
}

pub fn index_subcommand() -> Command {
  Command::new("index")
    .version(env!("CARGO_PKG_VERSION"))
    .author(env!("CARGO_PKG_AUTHORS"))
    .about("Builds the song index of an artist from its albums")
    .long_about(
      "Walks the albums of an artist in batches until at least `--count` songs \
are known or every album has been read. Failing albums are retried and then \
skipped; the result is deduplicated by song id.",
    )
    .visible_alias("ix")
    .arg(artist_arg())
    .arg(order_arg())
    .arg(
      Arg::new("count")
        .short('n')
        .long("count")
        .value_name("COUNT")
        .value_parser(value_parser!(usize))
        .default_value("50")
        .help("Number of songs the index must hold"),
    )
}

pub fn pages_subcommand() -> Command {
  Command::new("pages")
    .version(env!("CARGO_PKG_VERSION"))
    .author(env!("CARGO_PKG_AUTHORS"))
    .about("Opens one page of an artist's songs")
    .long_about(
      "Loads the page starting at `--offset`. Offsets past what upstream can \
serve are learned and the last reachable page is offered instead. Use \
`--follow` to jump there automatically.",
    )
    .visible_alias("pg")
    .arg(artist_arg())
    .arg(order_arg())
    .arg(
      Arg::new("offset")
        .long("offset")
        .value_name("OFFSET")
        .value_parser(value_parser!(usize))
        .default_value("0")
        .help("Offset of the first song"),
    )
    .arg(
      Arg::new("follow")
        .long("follow")
        .action(ArgAction::SetTrue)
        .help("Follow the retry row when the page is not available"),
    )
}

pub fn library_subcommand() -> Command {
  Command::new("library")
    .version(env!("CARGO_PKG_VERSION"))
    .author(env!("CARGO_PKG_AUTHORS"))
    .about("Refreshes the library membership sets and prints their sizes")
    .visible_alias("lib")
    .arg(
      Arg::new("force")
        .long("force")
        .action(ArgAction::SetTrue)
        .help("Refresh even if the sets are still fresh"),
    )
}

pub fn browse_subcommand() -> Command {
  Command::new("browse")
    .version(env!("CARGO_PKG_VERSION"))
    .author(env!("CARGO_PKG_AUTHORS"))
    .about("Walks through the views of an artist and back again")
    .long_about(
      "Opens the artist menu, follows each entry, then navigates back and \
prints every view on the way, including the restored selection.",
    )
    .arg(artist_arg())
}
