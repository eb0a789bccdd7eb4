use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use crescent_domain::tempo::{MAX_REQUEST_BPM, MIN_REQUEST_BPM};
use crescent_domain::{BeatHistory, GenerateRequest, Genre, Instrument, Mood, MusicalKey, Presets};
use crescent_services::{
    audio_url, ArtifactStore, BeatWorkflow, ElevenLabsClient, ServiceConfig, SoundEffect,
};
use crescent_transcriber::{write_genre_midi, TranscriptionJob, TranscriptionPipeline};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate beats and export their drums as MIDI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a beat with the music API and convert its rhythm to MIDI
    Generate(GenerateArgs),
    /// Ask the music API for a composition plan without generating audio
    Plan {
        #[command(flatten)]
        args: GenerateArgs,
        /// Save the plan here for `render-plan`
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate a beat from a saved composition plan and convert its rhythm to MIDI
    RenderPlan {
        /// Plan JSON as printed by `plan`
        plan: PathBuf,
        #[command(flatten)]
        args: GenerateArgs,
        #[arg(long)]
        seed: Option<u32>,
    },
    /// Generate a short sound effect from a text description
    Sfx {
        text: String,
        /// Length in seconds
        #[arg(long, default_value_t = 2.0)]
        duration: f64,
        #[arg(long = "loop")]
        looping: bool,
        #[arg(long, default_value_t = 0.5)]
        prompt_influence: f64,
    },
    /// Write the genre's drum groove as MIDI without generating audio
    Groove {
        #[arg(long, value_parser = parse_choice::<Genre>)]
        genre: Genre,
        /// Defaults to the genre's usual tempo
        #[arg(long, value_parser = bpm_range())]
        bpm: Option<u16>,
        /// Length in seconds
        #[arg(long, default_value_t = 30)]
        duration: u32,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Convert an existing audio file into a MIDI drum track
    Convert {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 120, value_parser = bpm_range())]
        bpm: u16,
        #[arg(long)]
        normalize: bool,
    },
    /// Print the genre, mood, key and instrument options
    Presets,
    /// Show recently generated beats
    History {
        /// Show a single entry
        #[arg(long)]
        id: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    #[arg(long, value_parser = parse_choice::<Genre>)]
    genre: Genre,
    #[arg(long, value_parser = parse_choice::<Mood>)]
    mood: Mood,
    /// e.g. "C minor"
    #[arg(long, value_parser = parse_choice::<MusicalKey>)]
    key: Option<MusicalKey>,
    /// Defaults to the genre's usual tempo
    #[arg(long, value_parser = bpm_range())]
    bpm: Option<u16>,
    /// Length in seconds
    #[arg(long, default_value_t = 30)]
    duration: u32,
    #[arg(long = "instrument", value_parser = parse_choice::<Instrument>, default_value = "drums")]
    instruments: Vec<Instrument>,
    /// Free-form prompt used instead of the genre description
    #[arg(long, default_value = "")]
    prompt: String,
}

impl GenerateArgs {
    fn into_request(self) -> GenerateRequest {
        let mut request = GenerateRequest::new(self.genre, self.mood, self.instruments);
        request.bpm = self
            .bpm
            .unwrap_or_else(|| crescent_domain::presets::genre_default_bpm(self.genre));
        if let Some(key) = self.key {
            request.key = key;
        }
        request.duration = self.duration;
        request.custom_prompt = self.prompt;
        request
    }
}

fn bpm_range() -> clap::builder::RangedI64ValueParser<u16> {
    clap::value_parser!(u16).range(MIN_REQUEST_BPM as i64..=MAX_REQUEST_BPM as i64)
}

/// Parses a CLI value with the same spelling the JSON API uses.
fn parse_choice<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("unknown value {value:?}"))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// History is best-effort: an unreadable file starts a fresh one.
fn load_history_or_empty(path: &Path) -> BeatHistory {
    BeatHistory::load(path).unwrap_or_else(|err| {
        warn!(error = %err, path = %path.display(), "ignoring unreadable history");
        BeatHistory::new()
    })
}

fn read_plan(path: &Path) -> anyhow::Result<serde_json::Value> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a JSON plan", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = ServiceConfig::from_env();

    match cli.command {
        Command::Generate(args) => {
            let request = args.into_request();
            let history_path = config.history_path();
            let mut history = load_history_or_empty(&history_path);
            let workflow = BeatWorkflow::new(
                ElevenLabsClient::new(&config),
                ArtifactStore::new(&config.output_dir),
            )
            .with_history_path(&history_path);

            let response = workflow
                .generate(&request, &mut history)
                .await
                .context("beat generation failed")?;
            info!(id = %response.id, "generated beat");
            print_json(&response)?;
        }
        Command::Plan { args, output } => {
            let request = args.into_request();
            request.validate()?;
            let plan = ElevenLabsClient::new(&config)
                .composition_plan(&request.build_prompt(), request.length_ms())
                .await
                .context("composition plan failed")?;
            if let Some(output) = output {
                fs::write(&output, serde_json::to_string_pretty(&plan)?)
                    .with_context(|| format!("failed to write {}", output.display()))?;
                info!(path = %output.display(), "saved composition plan");
            }
            print_json(&plan)?;
        }
        Command::RenderPlan { plan, args, seed } => {
            let plan = read_plan(&plan)?;
            let mut request = args.into_request();
            request.seed = seed;
            let history_path = config.history_path();
            let mut history = load_history_or_empty(&history_path);
            let workflow = BeatWorkflow::new(
                ElevenLabsClient::new(&config),
                ArtifactStore::new(&config.output_dir),
            )
            .with_history_path(&history_path);

            let response = workflow
                .generate_from_plan(&plan, &request, &mut history)
                .await
                .context("rendering the composition plan failed")?;
            info!(id = %response.id, "generated beat from plan");
            print_json(&response)?;
        }
        Command::Sfx {
            text,
            duration,
            looping,
            prompt_influence,
        } => {
            let effect = SoundEffect::new(text)
                .with_duration(duration)
                .with_loop(looping)
                .with_prompt_influence(prompt_influence);
            let audio = ElevenLabsClient::new(&config)
                .generate_sound_effect(&effect)
                .await
                .context("sound effect generation failed")?;
            let id = ArtifactStore::new_sfx_id();
            let path = ArtifactStore::new(&config.output_dir).write_audio(
                &id,
                audio.extension,
                &audio.bytes,
            )?;
            info!(%id, path = %path.display(), "stored sound effect");
            print_json(&serde_json::json!({ "id": id, "audio_url": audio_url(&id) }))?;
        }
        Command::Groove {
            genre,
            bpm,
            duration,
            output,
        } => {
            let bpm = bpm.unwrap_or_else(|| crescent_domain::presets::genre_default_bpm(genre));
            let pattern = write_genre_midi(&output, genre, bpm, duration)
                .with_context(|| format!("failed to write {}", output.display()))?;
            print_json(&serde_json::json!({
                "output_path": output,
                "genre": genre,
                "bpm": bpm,
                "event_count": pattern.events.len(),
            }))?;
        }
        Command::Convert {
            input,
            output,
            bpm,
            normalize,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension("mid"));
            let job = TranscriptionJob::new(&input, output)
                .with_target_bpm(bpm)
                .with_normalize(normalize);
            let pipeline = TranscriptionPipeline::default();
            let report = tokio::task::spawn_blocking(move || pipeline.transcribe(&job))
                .await?
                .with_context(|| format!("failed to convert {}", input.display()))?;
            print_json(&report)?;
        }
        Command::Presets => print_json(&Presets::catalog())?,
        Command::History { id } => {
            let history_path = config.history_path();
            let history = BeatHistory::load(&history_path)
                .with_context(|| format!("failed to read {}", history_path.display()))?;
            match id {
                Some(id) => match history.get(&id) {
                    Some(item) => print_json(item)?,
                    None => bail!("no beat with id {id}"),
                },
                None => print_json(&history.recent())?,
            }
        }
    }
    Ok(())
}
