#![forbid(unsafe_code)]

//! Headless knotscroll session runner.
//!
//! Replays a scripted session against a [`LetterScroll`] and logs every
//! lifecycle transition. `RUST_LOG` controls verbosity (default `info`);
//! `RUST_LOG=knotscroll_runtime=trace` shows tweens and notifications.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use knotscroll_core::event::KeyCode;
use knotscroll_runtime::{FrameLoop, LetterScroll, ScrollConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod script;

use script::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Script {
    /// Drag the knot apart.
    Drag,
    /// Hold the untie key.
    Hold,
}

#[derive(Parser)]
#[command(name = "knotscroll-demo")]
#[command(version, about = "Replay a scripted letter-scroll session")]
struct Cli {
    /// Scroll configuration (TOML). Defaults apply to missing keys.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Script::Drag)]
    script: Script,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json: bool,

    /// Pace frames against the wall clock instead of simulating time.
    #[arg(long)]
    realtime: bool,

    /// Seed for the petal generator.
    #[arg(long)]
    seed: Option<u64>,

    /// Frame interval in milliseconds.
    #[arg(long, default_value_t = 16, value_parser = clap::value_parser!(u64).range(1..=1000))]
    frame_ms: u64,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_target(false)))
        .init();
}

fn load_config(cli: &Cli) -> Result<ScrollConfig> {
    let mut config = match &cli.config {
        Some(path) => ScrollConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ScrollConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config = config.with_petal_seed(seed);
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let config = load_config(&cli)?;
    if cli.print_config {
        print!("{}", config.to_toml_string().context("serializing config")?);
        return Ok(());
    }

    let hold_key: KeyCode = config.hold_key;
    let frames = FrameLoop::shared();
    let scroll = LetterScroll::try_new(frames.clone(), config).context("invalid scroll config")?;
    scroll.set_viewport_height(900.0);
    scroll.set_content_height(1600.0);
    scroll.set_canvas_size(480.0, 720.0);

    let steps = match cli.script {
        Script::Drag => script::drag_session(),
        Script::Hold => script::hold_session(hold_key),
    };
    tracing::info!(script = ?cli.script, steps = steps.len(), realtime = cli.realtime, "session starting");

    let mut session = Session::new(frames, scroll, Duration::from_millis(cli.frame_ms), cli.realtime);
    let report = session.run(&steps)?;
    let view = session.scroll().view();

    tracing::info!(
        final_state = %report.final_state,
        opening_seed = report.opening_seed,
        elapsed_ms = report.elapsed.as_millis() as u64,
        ticks = report.ticks,
        peak_petals = report.peak_petals,
        knot_focus_id = view.knot_focus_id,
        paper_focus_id = view.paper_focus_id,
        "session finished"
    );
    Ok(())
}
