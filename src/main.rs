use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use typist::backend::{countdown, open_sink, resolve_backend, PlaybackBackend};
use typist::config::{Preset, TypingConfig};
use typist::dispatch::{CancelToken, DispatchOutcome, Dispatcher, KeySink};
use typist::engine::run;
use typist::error::TypistError;
use typist::keyboard::find_first_unsupported_char;
use typist::model::{Plan, PLAN_VERSION};
use typist::planner::{generate_plan, normalize_line_endings};
use typist::sim;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PresetArg {
    Balanced,
    FastButMessy,
    SlowAndCareful,
}

impl PresetArg {
    fn to_library(self) -> Preset {
        match self {
            PresetArg::Balanced => Preset::Balanced,
            PresetArg::FastButMessy => Preset::FastButMessy,
            PresetArg::SlowAndCareful => Preset::SlowAndCareful,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlaybackBackendArg {
    Auto,
    X11,
    Echo,
}

impl PlaybackBackendArg {
    fn to_library(self) -> PlaybackBackend {
        match self {
            PlaybackBackendArg::Auto => PlaybackBackend::Auto,
            PlaybackBackendArg::X11 => PlaybackBackend::X11,
            PlaybackBackendArg::Echo => PlaybackBackend::Echo,
        }
    }
}

#[derive(Debug, Args, Clone)]
struct ProfileArgs {
    /// Named typing profile to start from.
    #[arg(long, value_enum, default_value_t = PresetArg::Balanced)]
    preset: PresetArg,

    /// JSON profile file; fields it omits come from the Balanced preset.
    #[arg(long, value_name = "PATH", conflicts_with = "preset")]
    config: Option<PathBuf>,

    #[arg(long)]
    wpm_min: Option<f64>,

    #[arg(long)]
    wpm_max: Option<f64>,

    /// Per-key timing noise as a fraction of the base delay.
    #[arg(long)]
    jitter: Option<f64>,

    /// Probability (0.0-1.0) that a character is mistyped and then fixed.
    #[arg(long)]
    typo_rate: Option<f64>,

    /// Probability (0.0-1.0) that a punctuation mark is mistyped and then fixed.
    #[arg(long)]
    punctuation_mistake_rate: Option<f64>,

    /// Probability (0.0-1.0) of a longer hesitation between words.
    #[arg(long)]
    think_pause_rate: Option<f64>,

    /// Disable long-word, punctuation and think pauses.
    #[arg(long)]
    no_micro_pauses: bool,
}

#[derive(Debug, Args, Clone)]
struct PlaybackArgs {
    /// Playback backend.
    ///
    /// - auto: choose a backend based on the runtime environment
    /// - x11: force X11 playback (XTEST)
    /// - echo: print the keystrokes to this terminal
    #[arg(long, value_enum, default_value_t = PlaybackBackendArg::Auto)]
    backend: PlaybackBackendArg,

    /// Countdown seconds before typing starts
    #[arg(long, default_value_t = 5)]
    countdown: u64,

    /// Disable console typing trace output
    #[arg(long)]
    no_trace: bool,
}

#[derive(Debug, Parser)]
#[command(name = "typist")]
#[command(about = "Types text into the focused window like a person would", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a typing plan (JSON)
    Plan {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Output plan file (defaults to stdout)
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Optional RNG seed (for reproducible plans)
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        profile: ProfileArgs,
    },

    /// Type a saved plan into the focused window
    Play {
        /// Plan file (JSON)
        #[arg(long, value_name = "PATH")]
        plan: PathBuf,

        /// Optional RNG seed for the timing draws
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        playback: PlaybackArgs,
    },

    /// Type a text file straight away (use `plan` + `play` to keep the plan)
    Run {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Optional RNG seed
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        profile: ProfileArgs,

        #[command(flatten)]
        playback: PlaybackArgs,
    },

    /// Print the built-in presets as JSON
    Presets,
}

fn read_input(path: &PathBuf) -> Result<String> {
    let raw = if path.as_os_str() == std::ffi::OsStr::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    };
    Ok(normalize_line_endings(&raw))
}

fn write_output(path: &PathBuf, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn load_profile(path: &PathBuf) -> Result<TypingConfig> {
    let json =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("failed to parse typing profile {}", path.display()))
}

fn build_config(args: &ProfileArgs) -> Result<TypingConfig> {
    let mut cfg = match &args.config {
        Some(path) => load_profile(path)?,
        None => args.preset.to_library().config(),
    };

    if let Some(v) = args.wpm_min {
        cfg.wpm_min = v;
    }
    if let Some(v) = args.wpm_max {
        cfg.wpm_max = v;
    }
    if let Some(v) = args.jitter {
        cfg.jitter_fraction = v;
    }
    if let Some(v) = args.typo_rate {
        cfg.typo_rate = v;
    }
    if let Some(v) = args.punctuation_mistake_rate {
        cfg.punctuation_mistake_rate = v;
    }
    if let Some(v) = args.think_pause_rate {
        cfg.think_pause_rate = v;
    }
    if args.no_micro_pauses {
        cfg.micro_pauses = false;
    }

    cfg.validate().context("invalid typing profile")?;
    Ok(cfg)
}

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn log_plan_stats(verb: &str, plan: &Plan) {
    let stats = sim::plan_stats(plan);
    info!(
        "{verb}: {} actions, {} key presses, {} corrections, {} pauses (~{:.1}s)",
        stats.actions, stats.key_presses, stats.corrections, stats.pauses, stats.expected_pause_secs
    );
}

fn install_cancel_handler() -> Result<CancelToken> {
    let cancel = CancelToken::new();
    let handle = cancel.clone();
    ctrlc::set_handler(move || handle.cancel()).context("failed to install Ctrl+C handler")?;
    Ok(cancel)
}

fn check_typable(backend: PlaybackBackend, text: &str) -> Result<()> {
    if backend == PlaybackBackend::Echo {
        return Ok(());
    }
    if let Some((byte_idx, c)) = find_first_unsupported_char(text) {
        return Err(anyhow!(
            "unsupported character {c:?} (U+{:04X}) at byte {byte_idx}. Supported: ASCII, newline, and smart quotes. Tabs are not allowed.",
            c as u32
        ));
    }
    Ok(())
}

/// Count down, then open the sink. Ctrl+C during the countdown aborts.
fn start_playback(
    backend: PlaybackBackend,
    playback: &PlaybackArgs,
) -> Result<Dispatcher<Box<dyn KeySink>>> {
    let cancel = install_cancel_handler()?;
    if !countdown(playback.countdown, &cancel) {
        return Err(anyhow!("aborted"));
    }

    let sink = open_sink(backend)?;
    Ok(Dispatcher::new(sink, cancel).with_trace(!playback.no_trace))
}

fn finish_playback(result: Result<DispatchOutcome, TypistError>) -> Result<()> {
    match result {
        Ok(DispatchOutcome::Completed(progress)) => {
            info!("Done: {} keys sent", progress.keys_sent);
            Ok(())
        }
        Ok(DispatchOutcome::Cancelled(progress)) => {
            warn!(
                "Stopped by user after {} keys; partial text was left in place",
                progress.keys_sent
            );
            Err(anyhow!("aborted"))
        }
        Err(err) => {
            error!("{err}");
            Err(err).context("typing stopped part-way")
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("typist=info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Plan {
            input,
            output,
            seed,
            profile,
        } => {
            let text = read_input(&input)?;
            let cfg = build_config(&profile)?;
            let mut rng = rng_from_seed(seed);

            let plan = generate_plan(&text, cfg, &mut rng)?;
            log_plan_stats("Planned", &plan);

            let json = serde_json::to_string_pretty(&plan).context("failed to serialize plan")?;
            if let Some(out) = output {
                write_output(&out, &json)?;
            } else {
                println!("{json}");
            }
        }
        Command::Play {
            plan,
            seed,
            playback,
        } => {
            // Fail fast on unsupported environments/backends.
            let backend = resolve_backend(playback.backend.to_library())?;

            let json = fs::read_to_string(&plan)
                .with_context(|| format!("failed to read {}", plan.display()))?;
            let plan: Plan = serde_json::from_str(&json).context("failed to parse plan JSON")?;
            if plan.version != PLAN_VERSION {
                return Err(anyhow!(
                    "unsupported plan version {}; expected {PLAN_VERSION}",
                    plan.version
                ));
            }
            plan.config.validate().context("plan has an invalid typing profile")?;

            log_plan_stats("Playing", &plan);
            let text = sim::replay(&plan.actions).context("plan does not replay cleanly")?;
            check_typable(backend, &text)?;

            let mut rng = rng_from_seed(seed);
            let mut dispatcher = start_playback(backend, &playback)?;
            finish_playback(dispatcher.dispatch(plan.actions, &plan.config, &mut rng))?;
        }
        Command::Run {
            input,
            seed,
            profile,
            playback,
        } => {
            // Fail fast on unsupported environments/backends.
            let backend = resolve_backend(playback.backend.to_library())?;

            let text = read_input(&input)?;
            let cfg = build_config(&profile)?;
            check_typable(backend, &text)?;

            let mut rng = rng_from_seed(seed);
            let mut dispatcher = start_playback(backend, &playback)?;
            finish_playback(run(&text, &cfg, &mut dispatcher, &mut rng))?;
        }
        Command::Presets => {
            let mut presets = serde_json::Map::new();
            for preset in Preset::ALL {
                let value = serde_json::to_value(preset.config())
                    .with_context(|| format!("failed to serialize preset {}", preset.name()))?;
                presets.insert(preset.name().to_string(), value);
            }
            println!("{}", serde_json::to_string_pretty(&presets)?);
        }
    }

    Ok(())
}
