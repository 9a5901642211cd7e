use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use dialogue_engine::{
    ids_match, parse_with_diagnostics, playback_config_schema, speaker_library_schema, DialogueScheduler,
    EndReason, PlaybackConfig, PlaybackTrace, Severity, SpeakerDirectory, SpeakerLibrary,
    TraceEvent,
};

#[derive(Parser)]
#[command(author, version, about = "Dialogue script checker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a dialogue script and report every diagnostic.
    Check {
        script: PathBuf,
        /// Speaker library (TOML or JSON) to check speaker and sprite ids against.
        #[arg(long)]
        speakers: Option<PathBuf>,
    },
    /// Play a script headlessly, advancing as soon as allowed, and dump the trace.
    Trace {
        script: PathBuf,
        #[arg(long)]
        speakers: Option<PathBuf>,
        /// Playback config TOML.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Seconds per tick.
        #[arg(long, default_value_t = 1.0 / 60.0)]
        dt: f32,
        #[arg(long, default_value_t = 100_000)]
        max_ticks: usize,
        /// Leave per-character reveal events out of the trace.
        #[arg(long, default_value_t = false)]
        compact: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the JSON Schema of a data file.
    Schema {
        #[arg(value_enum)]
        document: SchemaDocument,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaDocument {
    Speakers,
    Config,
}

#[derive(Serialize)]
struct TraceEnvelope<'a> {
    trace_format_version: u16,
    ticks: usize,
    end_reason: Option<EndReason>,
    events: &'a [TraceEvent],
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Check { script, speakers } => check_script(&script, speakers.as_deref()),
        Command::Trace {
            script,
            speakers,
            config,
            dt,
            max_ticks,
            compact,
            output,
        } => trace_script(
            &script,
            speakers.as_deref(),
            config.as_deref(),
            dt,
            max_ticks,
            compact,
            output.as_deref(),
        ),
        Command::Schema { document } => print_schema(document),
    }
}

fn load_speakers(path: Option<&Path>) -> Result<SpeakerLibrary> {
    match path {
        Some(path) => SpeakerLibrary::load(path)
            .map_err(miette::Report::new)
            .map_err(|report| anyhow::anyhow!("{report:?}"))
            .with_context(|| format!("load speakers {}", path.display())),
        None => Ok(SpeakerLibrary::new()),
    }
}

fn check_script(path: &Path, speakers: Option<&Path>) -> Result<()> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let parsed = parse_with_diagnostics(&raw);
    let mut failed = parsed.has_errors();

    for diagnostic in &parsed.diagnostics {
        let level = match diagnostic.severity() {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        println!("{}: {level}: {}", path.display(), diagnostic.message());
    }

    if let Some(speakers_path) = speakers {
        let library = load_speakers(Some(speakers_path))?;
        for (idx, line) in parsed.lines.iter().enumerate() {
            let Some(info) = library.speaker(&line.speaker_id) else {
                println!(
                    "{}: warning: dialogue line {} uses unknown speaker '{}'",
                    path.display(),
                    idx + 1,
                    line.speaker_id
                );
                continue;
            };
            if let Some(sprite) = line.sprite_id.as_deref() {
                let known = info
                    .advanced
                    .extra_sprites
                    .iter()
                    .any(|entry| ids_match(&entry.sprite_id, sprite));
                if !known {
                    println!(
                        "{}: warning: dialogue line {} uses unknown sprite '{sprite}' for '{}'",
                        path.display(),
                        idx + 1,
                        info.id
                    );
                }
            }
        }
    }

    if parsed.lines.is_empty() {
        println!("{}: error: no usable dialogue lines", path.display());
        failed = true;
    } else {
        println!("{}: {} dialogue lines", path.display(), parsed.lines.len());
    }

    if failed {
        bail!("{} has errors", path.display());
    }
    Ok(())
}

fn trace_script(
    path: &Path,
    speakers: Option<&Path>,
    config: Option<&Path>,
    dt: f32,
    max_ticks: usize,
    compact: bool,
    output: Option<&Path>,
) -> Result<()> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let library = load_speakers(speakers)?;
    let config = match config {
        Some(config_path) => PlaybackConfig::load(config_path)
            .map_err(miette::Report::new)
            .map_err(|report| anyhow::anyhow!("{report:?}"))
            .with_context(|| format!("load config {}", config_path.display()))?,
        None => PlaybackConfig::default(),
    };
    let recorder = if compact {
        PlaybackTrace::without_reveals()
    } else {
        PlaybackTrace::new()
    };

    let mut scheduler = DialogueScheduler::new(config, library, recorder);
    if !scheduler.start_session(Some(&raw)) {
        bail!("{} did not produce a dialogue session", path.display());
    }

    let mut ticks = 0usize;
    while scheduler.is_running() && ticks < max_ticks {
        scheduler.request_advance();
        scheduler.tick(dt);
        ticks += 1;
    }
    if scheduler.is_running() {
        scheduler.end_now();
    }

    let envelope = TraceEnvelope {
        trace_format_version: 1,
        ticks,
        end_reason: scheduler.last_end_reason(),
        events: scheduler.presenter().events(),
    };
    let json = serde_json::to_string_pretty(&envelope)?;
    match output {
        Some(out) => {
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(out, json).with_context(|| format!("write {}", out.display()))?;
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn print_schema(document: SchemaDocument) -> Result<()> {
    let schema = match document {
        SchemaDocument::Speakers => speaker_library_schema(),
        SchemaDocument::Config => playback_config_schema(),
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
