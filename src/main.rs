use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use lyricdb::app::events::LookupEvent;
use lyricdb::app::App;
use lyricdb::config::{self, Config};
use lyricdb::lookup::LyricsService;
use lyricdb::lyrics::{text, Aggregator, SearchResult, SourceRegistry};
use lyricdb::storage::LrcDb;
use lyricdb::track::{parse_tracknum, TrackMetadata};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "lyricdb", version, about = "Find, download and remember lyrics for tracks")]
struct Cli {
    /// Override config file path.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Track metadata as reported by a player.
#[derive(Debug, Args)]
struct TrackArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    artist: Option<String>,
    #[arg(long)]
    album: Option<String>,
    /// Track number; anything unparsable or negative counts as 0.
    #[arg(long, allow_hyphen_values = true)]
    tracknum: Option<String>,
    /// Canonical URI of the track file.
    #[arg(long)]
    location: Option<String>,
}

impl TrackArgs {
    fn into_track(self) -> TrackMetadata {
        TrackMetadata {
            title: self.title,
            artist: self.artist,
            album: self.album,
            tracknum: self.tracknum.as_deref().map(parse_tracknum).unwrap_or(0),
            location: self.location,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the lyric file assigned to a track.
    Find {
        #[command(flatten)]
        track: TrackArgs,
    },
    /// Assign a lyric file (path or URI) to a track.
    Assign {
        /// Path or URI of the lyric file. Omit with --none.
        lyric: Option<String>,
        /// Assign "no lyrics" so sources are not searched for this track.
        #[arg(long, conflicts_with = "lyric")]
        none: bool,
        #[command(flatten)]
        track: TrackArgs,
    },
    /// Remove the assignments of a track.
    Delete {
        #[command(flatten)]
        track: TrackArgs,
    },
    /// List every stored assignment.
    List,
    /// Search the enabled sources and print the candidates.
    Search {
        #[command(flatten)]
        track: TrackArgs,
    },
    /// Look a track up, downloading and assigning a candidate on a miss.
    Fetch {
        /// Candidate number to download (as printed by `search`).
        #[arg(long, default_value_t = 1)]
        pick: usize,
        /// Search even if lyrics are already assigned.
        #[arg(long)]
        force: bool,
        /// Print the lyrics instead of only their location.
        #[arg(long)]
        print: bool,
        #[command(flatten)]
        track: TrackArgs,
    },
    /// Show or change the enabled lyric sources.
    Sources {
        #[command(subcommand)]
        cmd: Option<SourcesCommand>,
    },
    /// Read player events (JSON lines) from stdin and look up each new track.
    Watch {
        /// Only list candidates instead of downloading the first one.
        #[arg(long)]
        no_download: bool,
    },
}

#[derive(Debug, Subcommand)]
enum SourcesCommand {
    /// List known sources.
    List,
    /// Enable a source; it is queried after the already enabled ones.
    Enable { id: String },
    /// Disable a source.
    Disable { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref()).context("load config")?;

    match cli.command {
        Command::Find { track } => {
            let svc = make_service(&cfg)?;
            match svc.find(&track.into_track()).await.context("find lyrics")? {
                Some(location) if location.is_empty() => println!("(assigned: no lyrics)"),
                Some(location) => println!("{location}"),
                None => println!("not found"),
            }
        }
        Command::Assign { lyric, none, track } => {
            let svc = make_service(&cfg)?;
            let track = track.into_track();
            match lyric {
                _ if none => {
                    svc.assign_none(&track).await.context("assign")?;
                    println!("Assigned no lyrics to {}.", track.display_name());
                }
                Some(lyric) if lyric.contains("://") => {
                    svc.assign(&track, &lyric).await.context("assign")?;
                    println!("Assigned {lyric} to {}.", track.display_name());
                }
                Some(lyric) => {
                    let location = svc
                        .assign_file(&track, std::path::Path::new(&lyric))
                        .await
                        .context("assign")?;
                    println!("Assigned {location} to {}.", track.display_name());
                }
                None => anyhow::bail!("give a lyric path or --none"),
            }
        }
        Command::Delete { track } => {
            let svc = make_service(&cfg)?;
            let removed = svc.forget(&track.into_track()).await.context("delete")?;
            println!("Removed {removed} assignment(s).");
        }
        Command::List => {
            let db = open_db(&cfg)?;
            for r in db.records().context("list assignments")? {
                println!(
                    "{:>4}. {} - {} [{}] #{}  {}  -> {}",
                    r.id,
                    r.artist,
                    r.title,
                    r.album,
                    r.tracknum,
                    r.location.as_deref().unwrap_or("-"),
                    if r.lyrcpath.is_empty() { "(none)" } else { r.lyrcpath.as_str() }
                );
            }
        }
        Command::Search { track } => {
            let svc = make_service(&cfg)?;
            let outcome = svc
                .aggregator()
                .search(
                    &track.into_track(),
                    cfg.sources.timeout(),
                    &CancellationToken::new(),
                )
                .await
                .context("search lyrics")?;
            for failure in &outcome.failures {
                eprintln!("warning: {failure}");
            }
            if outcome.is_empty() {
                println!("No candidates.");
            }
            print_results(&outcome.results);
        }
        Command::Fetch {
            pick,
            force,
            print,
            track,
        } => {
            let svc = make_service(&cfg)?;
            let timeout = cfg.sources.timeout();
            fetch(&svc, track.into_track(), timeout, pick, force, print).await?;
        }
        Command::Sources { cmd } => {
            let registry = SourceRegistry::default();
            match cmd.unwrap_or(SourcesCommand::List) {
                SourcesCommand::List => {
                    for entry in registry.entries() {
                        let position = cfg.sources.enabled.iter().position(|id| id == entry.id);
                        let state = match position {
                            Some(i) => format!("enabled (#{})", i + 1),
                            None => "disabled".to_string(),
                        };
                        println!("{:<12} {:<22} {state}", entry.id, entry.name);
                    }
                }
                SourcesCommand::Enable { id } => {
                    if registry.get(&id).is_none() {
                        anyhow::bail!("unknown lyric source: {id}");
                    }
                    let mut cfg = cfg;
                    if !cfg.sources.enabled.contains(&id) {
                        cfg.sources.enabled.push(id.clone());
                    }
                    config::save(&cfg, cli.config.as_deref()).context("save config")?;
                    println!("Enabled {id}.");
                }
                SourcesCommand::Disable { id } => {
                    let mut cfg = cfg;
                    cfg.sources.enabled.retain(|e| e != &id);
                    config::save(&cfg, cli.config.as_deref()).context("save config")?;
                    println!("Disabled {id}.");
                }
            }
        }
        Command::Watch { no_download } => {
            let svc = make_service(&cfg)?;
            let auto_download = cfg.lookup.auto_download && !no_download;
            watch(svc, auto_download).await;
        }
    }

    Ok(())
}

fn open_db(cfg: &Config) -> anyhow::Result<LrcDb> {
    let path = cfg.paths.db_path();
    LrcDb::open(&path).with_context(|| format!("open lyric database {}", path.display()))
}

fn make_service(cfg: &Config) -> anyhow::Result<LyricsService> {
    let db = open_db(cfg)?;
    let sources = SourceRegistry::default()
        .build_enabled(&cfg.sources)
        .context("build lyric sources")?;
    Ok(LyricsService::new(
        Arc::new(db),
        Aggregator::new(sources),
        cfg.paths.lyrics_dir.clone(),
        cfg.sources.timeout(),
    ))
}

async fn fetch(
    svc: &LyricsService,
    track: TrackMetadata,
    timeout: Duration,
    pick: usize,
    force: bool,
    print: bool,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    if !force {
        match svc.find(&track).await.context("find lyrics")? {
            Some(location) if location.is_empty() => {
                println!("{} is assigned no lyrics.", track.display_name());
                return Ok(());
            }
            Some(location) => {
                if print {
                    print!("{}", svc.load(&location).await.context("read lyrics")?);
                } else {
                    println!("{location}");
                }
                return Ok(());
            }
            None => {}
        }
    }

    let outcome = svc
        .aggregator()
        .search(&track, timeout, &cancel)
        .await
        .context("search lyrics")?;
    for failure in &outcome.failures {
        eprintln!("warning: {failure}");
    }
    let Some(result) = pick.checked_sub(1).and_then(|i| outcome.results.get(i)) else {
        anyhow::bail!(
            "no candidate #{pick} for {} ({} found)",
            track.display_name(),
            outcome.results.len()
        );
    };

    let accepted = svc
        .accept(&track, result, &cancel)
        .await
        .with_context(|| format!("download from {}", result.source_id))?;
    if print {
        print!("{}", accepted.text);
    } else {
        let kind = if text::is_synced(&accepted.text) {
            "synced"
        } else {
            "plain"
        };
        println!("{} ({kind}, from {})", accepted.location, result.source_id);
    }
    Ok(())
}

async fn watch(svc: LyricsService, auto_download: bool) {
    let (player_tx, player_rx) = mpsc::channel(64);
    let (tx, mut rx) = mpsc::channel(64);

    tokio::spawn(lyricdb::player::read_feed(tokio::io::stdin(), player_tx));
    let mut app = App::new(svc, auto_download);
    tokio::spawn(async move { app.run(player_rx, tx).await });

    while let Some(ev) = rx.recv().await {
        print_event(&ev);
    }
}

fn print_event(ev: &LookupEvent) {
    match ev {
        LookupEvent::Loaded {
            track, location, ..
        } => println!("{}: assigned {location}", track.display_name()),
        LookupEvent::Downloaded {
            track,
            location,
            source_id,
            text: lyrics,
        } => {
            let kind = if text::is_synced(lyrics) { "synced" } else { "plain" };
            println!(
                "{}: downloaded {location} ({kind}, from {source_id})",
                track.display_name()
            );
        }
        LookupEvent::Candidates { track, results } => {
            println!("{}: {} candidate(s)", track.display_name(), results.len());
            print_results(results);
        }
        LookupEvent::Suppressed { track } => {
            println!("{}: assigned no lyrics", track.display_name())
        }
        LookupEvent::NotFound { track } => println!("{}: not found", track.display_name()),
        LookupEvent::Failed { track, error } => {
            eprintln!("{}: lookup failed: {error}", track.display_name())
        }
        LookupEvent::Status(status) => tracing::debug!(?status, "player status"),
    }
}

fn print_results(results: &[SearchResult]) {
    for (i, r) in results.iter().enumerate() {
        let album = if r.album.is_empty() {
            "".to_string()
        } else {
            format!(" [{}]", r.album)
        };
        println!(
            "{:02}. {} - {}{}  ({})",
            i + 1,
            r.artist,
            r.title,
            album,
            r.source_id
        );
    }
}
