use anyhow::{anyhow, bail, Context};
use std::path::PathBuf;
use stratevo::engines::generation::LogObserver;
use stratevo::engines::planning::planner::current_metric_value;
use stratevo::{BusinessSnapshot, ConfigManager, EvolutionEngine};

const USAGE: &str =
    "usage: stratevo [--config <file>] [--snapshot <file.json>] [--seed <n>] [--generations <n>]";

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    snapshot: Option<PathBuf>,
    seed: Option<u64>,
    generations: Option<u32>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args::default();
    let mut argv = std::env::args().skip(1);

    while let Some(flag) = argv.next() {
        let mut value = || argv.next().ok_or_else(|| anyhow!("{} needs a value\n{}", flag, USAGE));
        match flag.as_str() {
            "--config" => args.config = Some(PathBuf::from(value()?)),
            "--snapshot" => args.snapshot = Some(PathBuf::from(value()?)),
            "--seed" => args.seed = Some(value()?.parse().context("--seed expects an integer")?),
            "--generations" => {
                args.generations = Some(value()?.parse().context("--generations expects an integer")?)
            }
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            other => bail!("unknown argument {}\n{}", other, USAGE),
        }
    }
    Ok(args)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = parse_args()?;

    let manager = ConfigManager::new();
    manager
        .load_layered(args.config.as_deref())
        .context("failed to load configuration")?;
    let mut app = manager.get();
    if let Some(seed) = args.seed {
        app.evolution.seed = Some(seed);
    }

    let snapshot = match &args.snapshot {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read snapshot {}", path.display()))?;
            serde_json::from_str::<BusinessSnapshot>(&raw).context("invalid snapshot JSON")?
        }
        None => BusinessSnapshot::default(),
    };

    let mut engine = EvolutionEngine::from_app_config(&app, snapshot)?;
    engine.subscribe(LogObserver);
    let summary = engine.run_evolution(args.generations)?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    println!(
        "{}",
        serde_json::to_string_pretty(&engine.simulate_parallel_universes(3))?
    );

    let current = current_metric_value("margin", engine.simulator().frame().snapshot());
    let plan = engine.optimize_metric("margin", current + 10.0);
    println!("{}", serde_json::to_string_pretty(&plan)?);

    Ok(())
}
