//! CLI tool for playing a melody
//!
//! Usage: play <input> [--bpm N] [--instrument NAME] [--output out.wav]
//!             [--config cfg.toml] [--realtime] [--preview PITCH]
//!
//! Input is either the text format (`C4 1, D4 0.5, R 1`) or recognizer
//! JSON. Without `--realtime` the melody is rendered to <input>.wav.

use clap::Parser;
use notecast::pipeline::parser::{parse_melody, parse_melody_json, Melody};
use notecast::{EngineConfig, Instrument, PlaybackEngine};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

const DEFAULT_BPM: f64 = 120.0;

#[derive(Parser, Debug)]
#[command(name = "play", about = "Play a melody or render it to a WAV file")]
struct Args {
    /// Melody file (text format or JSON)
    input: Option<PathBuf>,

    /// Tempo in beats per minute (overrides the file)
    #[arg(long)]
    bpm: Option<f64>,

    /// piano, guitar, violin, flute or synth (overrides the file)
    #[arg(long)]
    instrument: Option<String>,

    /// Output WAV path (defaults to <input>.wav)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Engine settings in TOML
    #[arg(long)]
    config: Option<PathBuf>,

    /// Play through the default output device instead of writing a file
    #[arg(long)]
    realtime: bool,

    /// Audition a single pitch instead of a melody
    #[arg(long, value_name = "PITCH")]
    preview: Option<String>,
}

fn load_melody(path: &Path) -> Result<Melody, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("Error reading {}: {}", path.display(), e))?;

    let is_json = path.extension().is_some_and(|ext| ext == "json")
        || content.trim_start().starts_with(['[', '{']);
    if is_json {
        parse_melody_json(&content).map_err(|e| format!("Parse error: {}", e))
    } else {
        let notes = parse_melody(&content).map_err(|e| format!("Parse error: {}", e))?;
        Ok(Melody {
            notes,
            ..Default::default()
        })
    }
}

fn default_output(input: Option<&Path>) -> PathBuf {
    match input {
        Some(path) => path.with_extension("wav"),
        None => PathBuf::from("preview.wav"),
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path).unwrap_or_else(|e| fail(e)),
        None => EngineConfig::default(),
    };

    let melody = match (&args.input, &args.preview) {
        (Some(path), _) => load_melody(path).unwrap_or_else(|e| fail(e)),
        (None, Some(_)) => Melody::default(),
        (None, None) => fail("Nothing to play: pass an input file or --preview PITCH"),
    };

    let bpm = args.bpm.or(melody.bpm).unwrap_or(DEFAULT_BPM);
    let instrument = args
        .instrument
        .as_deref()
        .map(Instrument::from_name)
        .or(melody.instrument)
        .unwrap_or_default();

    println!("Configuration:");
    println!("  Sample rate: {} Hz", config.sample_rate);
    println!("  Tempo: {} bpm", bpm);
    println!("  Instrument: {}", instrument);
    println!("  Notes: {}", melody.notes.len());
    println!();

    if args.realtime {
        run_realtime(config, &melody, bpm, instrument, args.preview.as_deref());
    } else {
        let output = args
            .output
            .clone()
            .unwrap_or_else(|| default_output(args.input.as_deref()));
        run_offline(config, &melody, bpm, instrument, args.preview.as_deref(), &output);
    }
}

fn run_offline(
    config: EngineConfig,
    melody: &Melody,
    bpm: f64,
    instrument: Instrument,
    preview: Option<&str>,
    output: &Path,
) {
    let mut engine = PlaybackEngine::offline(config).unwrap_or_else(|e| fail(e));

    match preview {
        Some(pitch) => match engine.play_tone(pitch, instrument) {
            Ok(Some(_)) => {}
            Ok(None) => fail(format!("Nothing to preview for '{}'", pitch)),
            Err(e) => fail(e),
        },
        None => {
            let report = engine
                .play_sequence(&melody.notes, bpm, instrument, || {})
                .unwrap_or_else(|e| fail(e));
            for skipped in &report.skipped {
                println!("  ! skipped note {} ('{}')", skipped.index, skipped.pitch);
            }
        }
    }

    println!("Generating audio...");
    match engine.generate_wav(output) {
        Ok(samples) => println!("✓ Generated {} ({} samples)", output.display(), samples),
        Err(e) => fail(format!("Error writing WAV file: {}", e)),
    }
}

#[cfg(feature = "realtime")]
fn run_realtime(
    config: EngineConfig,
    melody: &Melody,
    bpm: f64,
    instrument: Instrument,
    preview: Option<&str>,
) {
    use notecast::{CursorFeed, CursorTracker, Timeline};
    use std::sync::mpsc;
    use std::time::Duration;

    let mut engine = PlaybackEngine::realtime(config.clone()).unwrap_or_else(|e| fail(e));

    if let Some(pitch) = preview {
        match engine.play_tone(pitch, instrument) {
            Ok(Some(_)) => {
                std::thread::sleep(Duration::from_secs_f64(config.preview_duration_secs + 0.1));
            }
            Ok(None) => fail(format!("Nothing to preview for '{}'", pitch)),
            Err(e) => fail(e),
        }
        return;
    }

    let timeline = Timeline::new(&melody.notes, bpm).unwrap_or_else(|e| fail(e));
    let (done_tx, done_rx) = mpsc::channel();
    engine
        .play_sequence(&melody.notes, bpm, instrument, move || {
            let _ = done_tx.send(());
        })
        .unwrap_or_else(|e| fail(e));

    let tracker = CursorTracker::new(timeline, &config).unwrap_or_else(|e| fail(e));
    let feed = CursorFeed::spawn(tracker, config.cursor_frame_interval());

    println!("Playing...");
    let mut last = None;
    for index in feed.receiver().iter() {
        if index != last {
            match index.and_then(|i| melody.notes.get(i).map(|n| (i, n))) {
                Some((i, note)) => println!("  ♪ {:>3}  {} ({} beats)", i, note.pitch, note.duration),
                None => println!("  ·"),
            }
            last = index;
        }
    }
    feed.join();

    // The cursor grace tail outlasts the last note, so this is normally immediate
    let _ = done_rx.recv_timeout(Duration::from_secs(1));
    engine.stop();
    println!("✓ Done");
}

#[cfg(not(feature = "realtime"))]
fn run_realtime(
    _config: EngineConfig,
    _melody: &Melody,
    _bpm: f64,
    _instrument: Instrument,
    _preview: Option<&str>,
) {
    fail("Realtime playback needs the `realtime` feature (cargo build --features realtime)");
}
