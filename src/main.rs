//! yaudio CLI: play notation or WAVE files, or render notation offline.
//!
//! Usage:
//!   ya-cli notes "T160 O5 C8 D8 E4"
//!   ya-cli notes "C D E" --render out.wav
//!   ya-cli wav sounds/beep.wav --volume 8
//!   ya-cli --print-config

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, Level};
use ya_engine::EngineConfig;
use ya_master::Player;

#[derive(Parser)]
#[command(name = "ya-cli")]
#[command(about = "Play notation text or 16 kHz mono WAVE files")]
struct Args {
    /// Engine configuration as JSON; missing fields take defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Play notation text
    Notes {
        /// Notation, e.g. "T120 O5 C4 E4 G2"
        text: String,

        /// Render to a WAVE file instead of playing
        #[arg(short, long)]
        render: Option<PathBuf>,
    },
    /// Stream a mono 16-bit 16 kHz WAVE file
    Wav {
        path: PathBuf,

        /// Playback volume, 0-10
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=10))]
        volume: Option<u8>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let config = load_config(args.config.as_deref())?;
    config.validate().context("invalid configuration")?;

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    match args.command {
        Some(Command::Notes { text, render: Some(out) }) => render_notes(&text, &out, config),
        Some(Command::Notes { text, render: None }) => play_notes(&text, config),
        Some(Command::Wav { path, volume }) => play_wav(&path, volume, config),
        None => bail!("no command given; try --help"),
    }
}

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn play_notes(text: &str, config: EngineConfig) -> Result<()> {
    let mut player = Player::open(config, ".").context("opening audio output")?;
    debug!("audio device at {} Hz", player.device_rate());
    info!("playing {} notation characters", text.len());
    player.play_notes_blocking(text)?;
    Ok(())
}

fn render_notes(text: &str, out: &Path, config: EngineConfig) -> Result<()> {
    let wav = ya_master::render_notes_to_wav(text, config)?;
    fs::write(out, &wav).with_context(|| format!("writing {}", out.display()))?;
    info!("wrote {} ({} bytes)", out.display(), wav.len());
    Ok(())
}

fn play_wav(path: &Path, volume: Option<u8>, config: EngineConfig) -> Result<()> {
    let (root, name) = match (path.parent(), path.file_name().and_then(|n| n.to_str())) {
        (Some(parent), Some(name)) => (parent.to_path_buf(), name.to_owned()),
        _ => bail!("not a file path: {}", path.display()),
    };

    let mut player = Player::open(config, root).context("opening audio output")?;
    debug!("audio device at {} Hz", player.device_rate());
    if let Some(v) = volume {
        player.set_wave_volume(v);
    }
    info!("playing {} at volume {}", path.display(), player.wave_volume());
    player
        .play_file_blocking(&name)
        .with_context(|| format!("cannot play {}", path.display()))?;
    Ok(())
}
