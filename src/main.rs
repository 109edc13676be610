use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};
use tunebox::app_core::{AppCore, Command};
use tunebox::config::Config;
use tunebox::host::{HostEvent, MediaHost, RecordingHost};
use tunebox::persist::{JsonFileStore, KeyValueStore, MemoryStore};
use tunebox::player::RodioHost;
use tunebox::track::MediaCandidate;

#[derive(Parser)]
#[command(name = "tunebox", about = "Local playlist player", version)]
struct Cli {
    /// Config file (defaults to the platform config dir). An explicit file
    /// that exists but is invalid is an error.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Session file holding the active playlist name
    #[arg(long)]
    session: Option<PathBuf>,
    /// Keep the session in memory only
    #[arg(long)]
    no_session: bool,
    /// Run without audio output
    #[arg(long)]
    dry_run: bool,
    /// Playlist to create (or switch to) before adding FILES
    #[arg(short, long)]
    playlist: Option<String>,
    /// Audio files to add to the active playlist
    files: Vec<PathBuf>,
}

/// One line typed at the prompt.
#[derive(Parser)]
#[command(no_binary_name = true, disable_help_flag = true, disable_help_subcommand = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCmd,
}

#[derive(Subcommand)]
enum ShellCmd {
    /// Create a playlist and switch to it
    Create {
        #[arg(required = true)]
        name: Vec<String>,
    },
    /// Delete a playlist (the active one if no name is given)
    Delete { name: Vec<String> },
    /// Switch to a playlist
    Use {
        #[arg(required = true)]
        name: Vec<String>,
    },
    /// List playlists
    #[command(alias = "ls")]
    List,
    /// List tracks of the active playlist
    Tracks,
    /// Add audio files to the active playlist
    Add {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Remove a track by number (1-based)
    Rm { number: usize },
    /// Play, or jump to a track by number (1-based)
    #[command(alias = "select")]
    Play { number: Option<usize> },
    Pause,
    /// Toggle play/pause
    Toggle,
    Next,
    #[command(alias = "previous")]
    Prev,
    /// Seek forward by the configured step
    Ff,
    /// Seek backward by the configured step
    Rew,
    /// Seek to a percentage of the track
    Seek { percent: f64 },
    /// Set volume, 0-100
    Vol { level: f32 },
    /// Set playback speed, or list presets
    Speed { rate: Option<f32> },
    /// Toggle shuffle
    Shuffle,
    /// Save the current volume and speed as defaults
    Save,
    Status,
    /// Show recent notices
    Notices,
    Help,
    #[command(alias = "exit")]
    Quit,
}

enum Input {
    Line(String),
    Host(HostEvent),
    Eof,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "tunebox=info".into()))
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::try_load_from(path)
            .with_context(|| format!("cannot load config '{}'", path.display()))?,
        None => Config::load(),
    };

    let session: Box<dyn KeyValueStore> = if cli.no_session {
        Box::new(MemoryStore::new())
    } else {
        match cli.session.clone().or_else(JsonFileStore::default_path) {
            Some(path) => {
                let store = JsonFileStore::open(&path);
                info!(path = %store.path().display(), "session file");
                Box::new(store)
            }
            None => {
                warn!("no data directory, session will not be saved");
                Box::new(MemoryStore::new())
            }
        }
    };

    let (tx, rx) = mpsc::channel::<Input>();
    spawn_stdin_reader(tx.clone())?;

    if cli.dry_run {
        let core = AppCore::new(RecordingHost::new(), session, config);
        run(core, &cli, rx)
    } else {
        let host_tx = tx.clone();
        let host = RodioHost::spawn(move |evt| {
            let _ = host_tx.send(Input::Host(evt));
        })?;
        let core = AppCore::new(host, session, config);
        run(core, &cli, rx)
    }
}

fn spawn_stdin_reader(tx: mpsc::Sender<Input>) -> anyhow::Result<()> {
    std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(Input::Line(line)).is_err() {
                            return;
                        }
                    }
                    Err(_) => break,
                }
            }
            let _ = tx.send(Input::Eof);
        })?;
    Ok(())
}

fn run<H: MediaHost>(mut core: AppCore<H>, cli: &Cli, rx: mpsc::Receiver<Input>) -> anyhow::Result<()> {
    if let Some(name) = &cli.playlist {
        let exists = core.playlists().iter().any(|p| p.name == name.trim());
        let result = if exists {
            core.set_active_playlist(name.trim())
        } else {
            core.create_playlist(name)
        };
        result.with_context(|| format!("cannot open playlist '{}'", name))?;
    }
    if !cli.files.is_empty() {
        if core.active_playlist_name().is_none() {
            bail!("no active playlist; pass --playlist <NAME> to add files");
        }
        add_paths(&mut core, &cli.files);
    }

    let config_path = cli.config.clone().or_else(Config::default_path);
    let mut cursor = 0;
    print_notices(&core, &mut cursor);
    print_status(&core);
    prompt();

    while let Ok(input) = rx.recv() {
        match input {
            Input::Line(line) => {
                let words = split_words(&line);
                if words.is_empty() {
                    prompt();
                    continue;
                }
                match ShellLine::try_parse_from(&words) {
                    Ok(ShellLine {
                        command: ShellCmd::Quit,
                    }) => break,
                    Ok(parsed) => execute(&mut core, parsed.command, config_path.as_deref()),
                    Err(e) => println!("{}", e.to_string().trim_end()),
                }
                print_notices(&core, &mut cursor);
                prompt();
            }
            Input::Host(evt) => {
                let before = core.controller().load_id();
                if let Err(e) = core.on_host_event(evt) {
                    println!("\n{}", e);
                    prompt();
                } else if core.controller().load_id() != before {
                    println!();
                    print_status(&core);
                    prompt();
                }
            }
            Input::Eof => break,
        }
    }
    Ok(())
}

fn execute<H: MediaHost>(core: &mut AppCore<H>, cmd: ShellCmd, config_path: Option<&Path>) {
    let result = match cmd {
        ShellCmd::Create { name } => core.handle(Command::CreatePlaylist(name.join(" "))),
        ShellCmd::Delete { name } if name.is_empty() => core.handle(Command::DeleteActivePlaylist),
        ShellCmd::Delete { name } => core.handle(Command::DeletePlaylist(name.join(" "))),
        ShellCmd::Use { name } => core.handle(Command::SetActive(name.join(" "))),
        ShellCmd::List => {
            print_playlists(core);
            Ok(())
        }
        ShellCmd::Tracks => {
            print_tracks(core);
            Ok(())
        }
        ShellCmd::Add { files } => {
            add_paths(core, &files);
            Ok(())
        }
        ShellCmd::Rm { number } => match number.checked_sub(1) {
            Some(index) => core.handle(Command::RemoveTrack(index)),
            None => {
                println!("Track numbers start at 1");
                Ok(())
            }
        },
        ShellCmd::Play { number: None } => core.handle(Command::Play),
        ShellCmd::Play {
            number: Some(number),
        } => match number.checked_sub(1) {
            Some(index) => core.handle(Command::SelectTrack(index)),
            None => {
                println!("Track numbers start at 1");
                Ok(())
            }
        },
        ShellCmd::Pause => core.handle(Command::Pause),
        ShellCmd::Toggle => core.handle(Command::TogglePlay),
        ShellCmd::Next => core.handle(Command::Next),
        ShellCmd::Prev => core.handle(Command::Previous),
        ShellCmd::Ff => core.handle(Command::SeekForward),
        ShellCmd::Rew => core.handle(Command::SeekBackward),
        ShellCmd::Seek { percent } => core.handle(Command::SeekToFraction(percent / 100.0)),
        ShellCmd::Vol { level } => core.handle(Command::SetVolume(level / 100.0)),
        ShellCmd::Speed { rate: Some(rate) } => core.handle(Command::SetRate(rate)),
        ShellCmd::Speed { rate: None } => {
            let presets: Vec<String> = core
                .speed_presets()
                .iter()
                .map(|r| format!("{}x", r))
                .collect();
            println!("Speed {}x (presets: {})", core.transport().rate, presets.join(" "));
            Ok(())
        }
        ShellCmd::Shuffle => core.handle(Command::ToggleShuffle),
        ShellCmd::Save => match config_path {
            Some(path) => save_preferences(core, path),
            None => {
                println!("No config directory on this platform; pass --config");
                Ok(())
            }
        },
        ShellCmd::Status => Ok(()),
        ShellCmd::Notices => {
            for n in core.notices(0) {
                println!("[{}] {}", n.timestamp, n.message);
            }
            Ok(())
        }
        ShellCmd::Help => {
            println!(
                "create <name> | delete [name] | use <name> | list | tracks | add <files..> | rm <n>\n\
                 play [n] | pause | toggle | next | prev | ff | rew | seek <%> | vol <0-100>\n\
                 speed [rate] | shuffle | save | status | notices | quit"
            );
            Ok(())
        }
        ShellCmd::Quit => Ok(()),
    };
    match result {
        Ok(()) => print_status(core),
        Err(e) => println!("{}", e),
    }
}

fn save_preferences<H: MediaHost>(core: &AppCore<H>, path: &Path) -> tunebox::Result<()> {
    let t = core.transport();
    let config = Config {
        volume: t.volume,
        playback_rate: t.rate,
        ..core.config().clone()
    };
    config.save_to(path)?;
    println!("Saved volume and speed to {}", path.display());
    Ok(())
}

fn add_paths<H: MediaHost>(core: &mut AppCore<H>, paths: &[PathBuf]) {
    let mut candidates = Vec::new();
    for path in paths {
        match MediaCandidate::from_path(path) {
            Ok(c) => candidates.push(c),
            Err(e) => println!("Skipping '{}': {}", path.display(), e),
        }
    }
    if let Err(e) = core.handle(Command::AddFiles(candidates)) {
        println!("{}", e);
    }
}

fn print_playlists<H: MediaHost>(core: &AppCore<H>) {
    let playlists = core.playlists();
    if playlists.is_empty() {
        println!("No playlists. Use `create <name>`.");
    }
    for p in playlists {
        let marker = if p.is_active { "*" } else { " " };
        println!("{} {} ({} tracks)", marker, p.name, p.track_count);
    }
}

fn print_tracks<H: MediaHost>(core: &AppCore<H>) {
    let Some(name) = core.active_playlist_name() else {
        println!("No active playlist.");
        return;
    };
    println!("Playlist '{}':", name);
    for t in core.tracks() {
        let marker = if t.is_current { ">" } else { " " };
        println!("{} {:>3}. {} - {}", marker, t.index + 1, t.artist, t.name);
    }
}

fn print_status<H: MediaHost>(core: &AppCore<H>) {
    let t = core.transport();
    let state = if t.is_playing {
        "Playing"
    } else if t.is_loaded {
        "Paused"
    } else {
        "Stopped"
    };
    let track = match (&t.track_name, &t.track_artist) {
        (Some(name), Some(artist)) => format!("{} - {}", artist, name),
        _ => "(no track)".to_string(),
    };
    let progress = core
        .progress()
        .map(|p| format!(" [{} / {}]", p.position_display, p.duration_display))
        .unwrap_or_default();
    println!(
        "{}: {}{} | vol {:.0}% | {}x{}",
        state,
        track,
        progress,
        t.volume * 100.0,
        t.rate,
        if t.is_shuffle { " | shuffle" } else { "" }
    );
}

fn print_notices<H: MediaHost>(core: &AppCore<H>, cursor: &mut usize) {
    for n in core.notices(*cursor) {
        println!("{}", n.message);
    }
    *cursor = core.notice_cursor();
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

/// Split a shell line on whitespace, keeping "double quoted" runs together.
fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_word = false;
    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_word = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_word {
                    words.push(std::mem::take(&mut current));
                    has_word = false;
                }
            }
            c => {
                current.push(c);
                has_word = true;
            }
        }
    }
    if has_word {
        words.push(current);
    }
    words
}
