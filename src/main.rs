//! Typefall headless runner
//!
//! Plays a seeded session with the attract-mode player at a fixed frame
//! rate and logs every outcome.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Builder, Env};
use log::LevelFilter;

use typefall::consts::{DEFAULT_PLAYFIELD_HEIGHT, DEFAULT_PLAYFIELD_WIDTH};
use typefall::sim::{Bounds, FrameClock, GameEvent, Session};
use typefall::{AutoPlayer, Settings, Tuning};

/// Run a headless Typefall session
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run seed (same seed, same game)
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Simulated seconds to play
    #[arg(long, default_value_t = 120.0)]
    seconds: f64,
    #[arg(long, default_value_t = 60)]
    fps: u32,
    /// Tuning overrides (JSON)
    #[arg(long)]
    tuning: Option<PathBuf>,
    /// Player settings (JSON)
    #[arg(long)]
    settings: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_PLAYFIELD_WIDTH)]
    width: f32,
    #[arg(long, default_value_t = DEFAULT_PLAYFIELD_HEIGHT)]
    height: f32,
    /// Autoplayer delay between submissions
    #[arg(long, default_value_t = 450)]
    reaction_ms: u64,
    #[arg(long, default_value_t = 0.05)]
    typo_rate: f32,
    /// Enable bounce rotation
    #[arg(long)]
    rotate: bool,
    /// Retry failed levels instead of stopping
    #[arg(long)]
    auto_retry: bool,
    /// Print the final frame as JSON
    #[arg(long)]
    json: bool,
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let env = Env::default().default_filter_or(level.to_string());
    // Fails only if a logger is already installed
    let _ = Builder::from_env(env).try_init();
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.settings {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading settings from {}", path.display()))?;
            Settings::from_json(&json)
                .with_context(|| format!("parsing settings from {}", path.display()))?
        }
        None => Settings::default(),
    };
    if args.rotate {
        settings.rotation_enabled = true;
    }
    Ok(settings)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    anyhow::ensure!(args.fps > 0, "--fps must be positive");
    anyhow::ensure!(
        args.width > 0.0 && args.height > 0.0,
        "play area must have positive size"
    );

    let tuning = match &args.tuning {
        Some(path) => Tuning::load(path)
            .with_context(|| format!("loading tuning from {}", path.display()))?,
        None => Tuning::default(),
    };
    let settings = load_settings(&args)?;

    log::info!("Typefall starting with seed {}", args.seed);
    let mut session = Session::new(
        args.seed,
        Bounds::new(args.width, args.height),
        tuning,
        settings,
    );
    let mut clock = FrameClock::new(session.tuning().max_frame_secs);
    let mut bot = AutoPlayer::new(
        args.seed.wrapping_add(1),
        args.reaction_ms as f32 / 1000.0,
        args.typo_rate,
    );

    session.start();
    let frame_ms = 1000.0 / f64::from(args.fps);
    let frames = (args.seconds * f64::from(args.fps)).ceil() as u64;

    for i in 0..=frames {
        let dt = clock.delta(i as f64 * frame_ms);
        session.frame(dt);
        if let Some(text) = bot.think(&session, dt) {
            session.submit_text(&text);
        }

        for event in session.drain_events() {
            match event {
                GameEvent::LevelFailed { .. } if args.auto_retry => {
                    session.retry_current_level();
                }
                GameEvent::LevelFailed { .. } => {
                    log::info!("Level failed, stopping at {:.1}s", session.now());
                    return finish(&session, args.json);
                }
                GameEvent::GameReset => {
                    // Collapse finished; play the loop again
                    session.start();
                }
                other => log::debug!("{other:?}"),
            }
        }
    }

    finish(&session, args.json)
}

fn finish(session: &Session, json: bool) -> Result<()> {
    let view = session.view();
    log::info!(
        "{} | score {} | popped {} | best streak {} | {} live words",
        view.hud.level,
        view.hud.score,
        view.hud.popped,
        view.hud.best_streak,
        view.hud.active_words,
    );
    if json {
        let out = serde_json::to_string_pretty(&view).context("serializing final frame")?;
        println!("{out}");
    }
    Ok(())
}
