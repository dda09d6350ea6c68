//! nodle-shuffle - build a shuffle distribution and print its samples
//!
//! Usage: `nodle-shuffle [--config FILE] [--seed N] [--ticks N] [--name NAME] CHOICE...`
//!
//! Each CHOICE is parsed as a JSON literal (`3`, `2.5`, `true`, `[1, 2]`) and
//! falls back to a plain string.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use serde_json::Value;

use nodle_sampling::constants::attributes;
use nodle_sampling::nodes::interface::{Element, NodeData};
use nodle_sampling::nodes::NodeId;
use nodle_sampling::{
    DistributionArgs, DistributionContext, DistributionRegistry, EvaluationOutcome, Extension,
    ExtensionHost, Literal, NodeGraphEngine, NodeRegistry, Result, RngRegistry, SamplingConfig,
    SamplingExtension,
};

/// Command line arguments of the shuffle binary
#[derive(Parser, Debug)]
#[clap(
    name = "nodle-shuffle",
    version,
    about = "Build a shuffle distribution and print its samples"
)]
struct Args {
    #[clap(long, help = "JSON sampling config file")]
    config: Option<PathBuf>,

    #[clap(
        long,
        allow_negative_numbers = true,
        help = "Random seed; negative values use the global seed"
    )]
    seed: Option<i64>,

    #[clap(long, default_value_t = 1, help = "Number of ticks to evaluate")]
    ticks: usize,

    #[clap(long, help = "Name of the shuffle node")]
    name: Option<String>,

    #[clap(
        required = true,
        allow_negative_numbers = true,
        help = "Values to shuffle, each a JSON literal or a plain string"
    )]
    choices: Vec<String>,
}

fn parse_choice(raw: &str) -> Literal {
    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|value| Literal::from_json(&value).ok())
        .unwrap_or_else(|| Literal::Str(raw.to_string()))
}

fn element_to_json(element: &Element) -> Value {
    match element {
        Element::Int(i) => Value::from(*i),
        Element::Double(d) => Value::from(*d),
        Element::Bool(b) => Value::from(*b),
        Element::Token(t) => Value::from(t.as_str()),
        Element::IntTuple(items) => Value::from(items.clone()),
        Element::DoubleTuple(items) => Value::from(items.clone()),
    }
}

/// Samples committed by the shuffle's latest evaluation, if it computed
fn tick_samples(engine: &NodeGraphEngine, shuffle: NodeId) -> Option<Value> {
    if engine.last_outcome(shuffle) != Some(&EvaluationOutcome::Computed) {
        return None;
    }
    let samples = engine
        .output(shuffle, attributes::SAMPLES)
        .and_then(NodeData::as_array)?;
    Some(Value::Array(
        samples.items().iter().map(element_to_json).collect(),
    ))
}

fn run(options: Args) -> Result<()> {
    let config = match &options.config {
        Some(path) => SamplingConfig::from_file(path)?,
        None => SamplingConfig::default(),
    }
    .with_env_overrides()?;

    let mut node_types = NodeRegistry::new();
    let mut distributions = DistributionRegistry::new();
    let mut extension = SamplingExtension::new();
    extension.on_startup(&mut ExtensionHost::new(&mut node_types, &mut distributions))?;

    let mut engine = NodeGraphEngine::new(Arc::new(RngRegistry::from_config(&config)));

    let mut args = DistributionArgs::new(options.choices.iter().map(|c| parse_choice(c)).collect());
    if let Some(seed) = options.seed {
        args = args.with_seed(seed);
    }
    if let Some(name) = &options.name {
        args = args.with_name(name);
    }

    let shuffle = {
        let mut ctx = DistributionContext::new(&mut engine, &node_types, &config);
        distributions.call(SamplingExtension::DISTRIBUTION, &mut ctx, &args)?
    };
    info!("Sampling from {}", engine.node(shuffle)?.path);

    for tick in 1..=options.ticks {
        engine.tick()?;
        match tick_samples(&engine, shuffle) {
            Some(samples) => println!("{}", samples),
            None => error!("Tick {} produced no samples: {:?}", tick, engine.last_outcome(shuffle)),
        }
    }

    engine.shutdown();
    extension.on_shutdown(&mut ExtensionHost::new(&mut node_types, &mut distributions));
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = Args::parse();

    match run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
