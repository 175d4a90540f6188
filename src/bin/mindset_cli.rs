use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use mindset_core::api::{SpeedPresetInfo, TickSoundInfo};
use mindset_core::engine::{EngineHandle, StubOutput};
use mindset_core::synth::{synthesize, write_wav, TickSoundType, ToneReport};
use mindset_core::tempo::{Bpm, Clock, ManualClock, SpeedPreset, TempoScheduler, TickEvent};
use serde::Serialize;
use tokio::sync::broadcast;

/// Virtual time advanced per step while simulating, so the tick channel
/// is drained well before it could lag
const SIMULATION_STEP: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(
    name = "mindset_cli",
    about = "Metronome tick rendering, scheduling simulation and playback"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List tick sounds with their synthesis parameters
    Sounds,
    /// List supported tempos and speed presets
    Bpms,
    /// Synthesize a tick and print its report
    Render {
        #[arg(long)]
        sound: TickSoundType,
        /// Also write the tick as a WAV file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the scheduler on virtual time and print every tick as JSON
    Simulate(SimulateArgs),
    /// Play the metronome on the default output device
    Play {
        #[arg(long, default_value_t = 80)]
        bpm: u32,
        #[arg(long, default_value = "classic")]
        sound: TickSoundType,
        #[arg(long, default_value_t = 5.0)]
        seconds: f64,
    },
}

#[derive(Args, Debug)]
struct SimulateArgs {
    #[arg(long, default_value_t = 80)]
    bpm: u32,
    #[arg(long, default_value = "classic")]
    sound: TickSoundType,
    #[arg(long, default_value_t = 5.0)]
    seconds: f64,
    /// Change tempo at this many seconds in
    #[arg(long, requires = "retune_bpm")]
    retune_at: Option<f64>,
    #[arg(long, requires = "retune_at")]
    retune_bpm: Option<u32>,
    /// Change tick sound at this many seconds in
    #[arg(long, requires = "revoice_sound")]
    revoice_at: Option<f64>,
    #[arg(long, requires = "revoice_at")]
    revoice_sound: Option<TickSoundType>,
}

enum Action {
    Retune(Bpm),
    Revoice(TickSoundType),
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    mindset_core::init_logging();

    match cli.command {
        Commands::Sounds => run_sounds(),
        Commands::Bpms => run_bpms(),
        Commands::Render { sound, output } => run_render(sound, output),
        Commands::Simulate(args) => run_simulate(args),
        Commands::Play {
            bpm,
            sound,
            seconds,
        } => run_play(bpm, sound, seconds),
    }
}

fn parse_bpm(value: u32) -> Result<Bpm> {
    Bpm::try_from(value).with_context(|| format!("invalid --bpm {}", value))
}

fn parse_seconds(value: f64, flag: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(value).with_context(|| format!("invalid {} {}", flag, value))
}

fn run_sounds() -> Result<ExitCode> {
    let sounds: Vec<TickSoundInfo> = TickSoundType::ALL
        .into_iter()
        .map(TickSoundInfo::from)
        .collect();
    println!("{}", serde_json::to_string_pretty(&sounds)?);
    Ok(ExitCode::from(0))
}

#[derive(Serialize)]
struct TempoEntry {
    bpm: u32,
    interval_seconds: f64,
}

#[derive(Serialize)]
struct TempoListing {
    bpms: Vec<TempoEntry>,
    presets: Vec<SpeedPresetInfo>,
}

fn run_bpms() -> Result<ExitCode> {
    let listing = TempoListing {
        bpms: Bpm::ALL
            .into_iter()
            .map(|bpm| TempoEntry {
                bpm: bpm.value(),
                interval_seconds: bpm.interval_seconds(),
            })
            .collect(),
        presets: SpeedPreset::ALL
            .into_iter()
            .map(SpeedPresetInfo::from)
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(ExitCode::from(0))
}

fn run_render(sound: TickSoundType, output: Option<PathBuf>) -> Result<ExitCode> {
    let tone = synthesize(sound);
    if let Some(path) = output {
        write_wav(&tone, &path).with_context(|| format!("writing {}", path.display()))?;
    }
    let report = ToneReport::from_buffer(&tone);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::from(0))
}

fn run_simulate(args: SimulateArgs) -> Result<ExitCode> {
    let bpm = parse_bpm(args.bpm)?;
    let end = parse_seconds(args.seconds, "--seconds")?;

    let mut actions: Vec<(Duration, Action)> = Vec::new();
    if let (Some(at), Some(value)) = (args.retune_at, args.retune_bpm) {
        let retune = Bpm::try_from(value)
            .with_context(|| format!("invalid --retune-bpm {}", value))?;
        actions.push((parse_seconds(at, "--retune-at")?, Action::Retune(retune)));
    }
    if let (Some(at), Some(sound)) = (args.revoice_at, args.revoice_sound) {
        actions.push((parse_seconds(at, "--revoice-at")?, Action::Revoice(sound)));
    }
    actions.sort_by_key(|(at, _)| *at);

    let clock = Arc::new(ManualClock::new());
    let output = Arc::new(StubOutput::new());
    let scheduler = TempoScheduler::new(clock.clone(), output.clone(), bpm, args.sound);
    let mut ticks = scheduler.subscribe_ticks();

    scheduler.start(bpm, args.sound)?;
    print_ticks(&mut ticks)?;

    for (at, action) in actions {
        if at > end {
            break;
        }
        advance_printing(&clock, at, &mut ticks)?;
        match action {
            Action::Retune(bpm) => scheduler.set_bpm(bpm)?,
            Action::Revoice(sound) => scheduler.set_sound_type(sound)?,
        }
        print_ticks(&mut ticks)?;
    }

    advance_printing(&clock, end, &mut ticks)?;
    scheduler.stop()?;

    log::info!(
        "[Simulate] {} ticks over {:.3}s",
        output.play_count(),
        end.as_secs_f64()
    );
    Ok(ExitCode::from(0))
}

fn advance_printing(
    clock: &ManualClock,
    target: Duration,
    ticks: &mut broadcast::Receiver<TickEvent>,
) -> Result<()> {
    while clock.now() < target {
        let step = (clock.now() + SIMULATION_STEP).min(target);
        clock.advance_to(step);
        print_ticks(ticks)?;
    }
    Ok(())
}

fn print_ticks(ticks: &mut broadcast::Receiver<TickEvent>) -> Result<()> {
    while let Ok(tick) = ticks.try_recv() {
        println!("{}", serde_json::to_string(&tick)?);
    }
    Ok(())
}

fn run_play(bpm: u32, sound: TickSoundType, seconds: f64) -> Result<ExitCode> {
    let bpm = parse_bpm(bpm)?;
    let duration = parse_seconds(seconds, "--seconds")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_time()
        .build()
        .context("creating timer runtime")?;

    runtime.block_on(async move {
        let engine = EngineHandle::with_platform_defaults()?;
        let mut ticks = Box::pin(engine.tick_stream());

        engine.start_metronome(bpm, sound)?;
        let _ = tokio::time::timeout(duration, async {
            while let Some(tick) = ticks.next().await {
                if let Ok(line) = serde_json::to_string(&tick) {
                    println!("{line}");
                }
            }
        })
        .await;
        engine.stop_metronome()?;

        Ok::<_, anyhow::Error>(ExitCode::from(0))
    })
}
