//! Skillforge demo
//!
//! Runs one user's engine against the in-memory backend and prints timer
//! ticks and completions until the requested number of sessions is credited.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use skillforge::core::error::Result;
use skillforge::engine::EngineEvent;
use skillforge::{Backend, EngineConfig, MemoryBackend, ProgressionEngine, SkillCatalog, SkillId, UserId};

/// Train a skill in real time and watch it progress
#[derive(Parser, Debug)]
#[command(name = "skillforge")]
#[command(about = "Run timed skill training sessions against an in-memory ledger")]
struct Args {
    /// Skill to train
    #[arg(long, default_value = "woodcutting")]
    skill: String,

    /// Number of completed sessions before exiting
    #[arg(long, default_value_t = 3)]
    sessions: u32,

    /// Skill catalog (TOML with [[skills]] tables); built-in skills when omitted
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Engine configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override every interval length (seconds), for quick runs
    #[arg(long)]
    interval: Option<u64>,

    /// Random seed for drop rolls
    #[arg(long)]
    seed: Option<u64>,

    /// Print every tick, not only whole seconds
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Dump the backend as JSON on exit
    #[arg(long)]
    dump: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("skillforge=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if args.seed.is_some() {
        config.rng_seed = args.seed;
    }

    let mut catalog = match &args.catalog {
        Some(path) => SkillCatalog::load_from_toml(path)?,
        None => SkillCatalog::with_defaults(),
    };
    if let Some(seconds) = args.interval {
        let overridden: Vec<_> = catalog
            .all()
            .iter()
            .cloned()
            .map(|mut skill| {
                skill.interval_seconds = seconds;
                skill
            })
            .collect();
        for skill in overridden {
            catalog.add(skill);
        }
    }

    let user = UserId::new("demo");
    let skill = SkillId::new(args.skill.as_str());
    let store = Arc::new(MemoryBackend::new());
    let engine = ProgressionEngine::builder(user.clone(), Arc::new(catalog), Backend::shared(store.clone()))
        .config(config)
        .build()?;

    let mut events = engine.subscribe();
    engine.attach().await?;
    engine.set_auto_training(&skill, true).await?;

    let mut completed = 0;
    let mut last_second = None;
    while completed < args.sessions {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "event stream lagged");
                continue;
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        };

        match event {
            EngineEvent::Started { interval } => {
                println!("started {} (ends {})", interval.skill_id, interval.end_time.format("%H:%M:%S"));
            }
            EngineEvent::Tick(view) => {
                if args.verbose || last_second != Some(view.remaining_seconds) {
                    println!(
                        "  {:<12} {:>4}s left  {:>5.1}%",
                        view.skill_id, view.remaining_seconds, view.progress_percent
                    );
                    last_second = Some(view.remaining_seconds);
                }
            }
            EngineEvent::Completed {
                skill_id,
                exp_gained,
                drops,
                level,
                leveled_up,
                ..
            } => {
                completed += 1;
                let drops: Vec<_> = drops.iter().map(|d| d.to_string()).collect();
                println!(
                    "completed {} #{}: +{} exp, level {}{}, drops [{}]",
                    skill_id,
                    completed,
                    exp_gained,
                    level,
                    if leveled_up { " (level up!)" } else { "" },
                    drops.join(", ")
                );
            }
            EngineEvent::Notice { skill_id, message } => println!("note [{}]: {}", skill_id, message),
            EngineEvent::Failed { skill_id, error } => println!("failed [{}]: {}", skill_id, error),
        }
    }

    engine.set_auto_training(&skill, false).await?;
    engine.abandon_training(&skill).await?;
    engine.detach();

    let record = store.user(&user);
    println!();
    println!("=== {} ===", user);
    for (skill_id, progress) in &record.skills {
        let max_level = engine.config().max_level;
        println!(
            "{:<12} {:>6} exp  level {:>2}  ({:.0}% to next)",
            skill_id,
            progress.experience,
            progress.level(max_level),
            progress.level_progress(max_level) * 100.0
        );
    }
    for (item, count) in record.inventory.iter() {
        println!("{:<12} x{}", item, count);
    }

    if args.dump {
        println!("{}", store.export_json()?);
    }
    Ok(())
}
