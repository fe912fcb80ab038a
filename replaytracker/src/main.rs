use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rl_replays::ReplayFile;
use rl_replays::stats::{player_stats, tracked_players};

mod discover;

use discover::find_replays;

const DEFAULT_HEXDUMP_BYTES: &str = "256";

fn init_logging(verbosity: u64) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_replay(path: &Path) -> anyhow::Result<ReplayFile> {
    ReplayFile::from_file(path).with_context(|| format!("failed to decode {}", path.display()))
}

fn replay_arg() -> Arg<'static, 'static> {
    Arg::with_name("REPLAY")
        .help("The replay file to process")
        .required(true)
        .index(1)
}

fn dump(matches: &ArgMatches) -> anyhow::Result<()> {
    let path = matches.value_of("REPLAY").context("missing replay path")?;
    let replay = load_replay(Path::new(path))?;
    println!("{}", serde_json::to_string_pretty(&replay)?);
    Ok(())
}

fn summary(matches: &ArgMatches) -> anyhow::Result<()> {
    let path = matches.value_of("REPLAY").context("missing replay path")?;
    let replay = load_replay(Path::new(path))?;
    print!("{replay}");

    let mismatches = replay.header().length_mismatches();
    if !mismatches.is_empty() {
        println!("Length mismatches ({}):", mismatches.len());
        for m in mismatches {
            println!(
                "  {} ({}): declared {}, read {}",
                m.name, m.typ, m.declared, m.actual
            );
        }
    }
    Ok(())
}

fn stats(matches: &ArgMatches) -> anyhow::Result<()> {
    let root = matches.value_of("PATH").context("missing replay path")?;
    let tracked: Vec<String> = matches
        .values_of("PLAYERS")
        .map(|names| names.map(str::to_string).collect())
        .unwrap_or_default();

    let replays = find_replays(Path::new(root))?;
    info!(count = replays.len(), "found replays");

    for entry in replays {
        let replay = match ReplayFile::from_file(&entry.path) {
            Ok(replay) => replay,
            Err(err) => {
                warn!(path = %entry.path.display(), error = %err, "skipping undecodable replay");
                continue;
            }
        };
        let players = match player_stats(&replay) {
            Ok(players) => players,
            Err(err) => {
                warn!(
                    path = %entry.path.display(),
                    error = %err,
                    "skipping replay without player stats"
                );
                continue;
            }
        };

        let modified: DateTime<Utc> = entry.modified.into();
        for player in tracked_players(players, &tracked) {
            let line = serde_json::json!({
                "file": entry.path.display().to_string(),
                "modified": modified.to_rfc3339(),
                "key": player.sheet_key(),
                "player": player,
            });
            println!("{line}");
        }
    }
    Ok(())
}

fn network(matches: &ArgMatches) -> anyhow::Result<()> {
    let path = matches.value_of("REPLAY").context("missing replay path")?;
    let limit: usize = matches
        .value_of("BYTES")
        .context("missing byte count")?
        .parse()
        .context("invalid byte count")?;

    let replay = load_replay(Path::new(path))?;
    let stream = replay.network_stream();
    println!("Network stream: {} bytes", stream.len());
    hexdump::hexdump(&stream[..stream.len().min(limit)]);
    Ok(())
}

fn cli() -> App<'static, 'static> {
    App::new("Replay Tracker")
        .about("Decodes Rocket League replay files")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("VERBOSE")
                .help("Increase log verbosity (repeatable). RUST_LOG takes precedence")
                .short("v")
                .long("verbose")
                .multiple(true),
        )
        .subcommand(
            SubCommand::with_name("dump")
                .about("Print the decoded replay as JSON")
                .arg(replay_arg()),
        )
        .subcommand(
            SubCommand::with_name("summary")
                .about("Print a readable summary of the replay")
                .arg(replay_arg()),
        )
        .subcommand(
            SubCommand::with_name("stats")
                .about("Print per-player stats for a replay or every replay in a directory")
                .arg(
                    Arg::with_name("PLAYERS")
                        .help("Only report this player; repeat the flag for several (-p A -p B)")
                        .short("p")
                        .long("players")
                        .takes_value(true)
                        .multiple(true)
                        .number_of_values(1),
                )
                .arg(
                    Arg::with_name("PATH")
                        .help("A replay file or a directory of replays")
                        .required(true)
                        .index(1),
                ),
        )
        .subcommand(
            SubCommand::with_name("network")
                .about("Hexdump the start of the raw network stream")
                .arg(
                    Arg::with_name("BYTES")
                        .help("How many bytes to dump")
                        .short("n")
                        .long("bytes")
                        .takes_value(true)
                        .default_value(DEFAULT_HEXDUMP_BYTES),
                )
                .arg(replay_arg()),
        )
}

fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    init_logging(matches.occurrences_of("VERBOSE"));

    match matches.subcommand() {
        ("dump", Some(m)) => dump(m),
        ("summary", Some(m)) => summary(m),
        ("stats", Some(m)) => stats(m),
        ("network", Some(m)) => network(m),
        (name, _) => Err(anyhow!("unknown subcommand {name:?}")),
    }
}
