//! `choromap stats`: descriptive statistics of joined feature properties.

use std::collections::HashMap;

use clap::Args;
use choromap::config::ConfigFile;
use choromap::layer::JoinOptions;
use choromap::stats::{StatisticKind, Statistics, StatisticsOptions, DEFAULT_TRIM};

use super::common::{build_map, create_layer, DataArgs, GeometryArgs};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct StatsArgs {
    #[command(flatten)]
    pub geometry: GeometryArgs,

    #[command(flatten)]
    pub data: DataArgs,

    /// Properties to summarize; may be repeated
    #[arg(long = "key", short = 'k', required = true)]
    pub keys: Vec<String>,

    /// Fraction trimmed from each tail before the deviation
    #[arg(long, default_value_t = DEFAULT_TRIM)]
    pub trim: f64,
}

/// Outcome of a stats run.
#[derive(Debug, Clone)]
pub struct StatsSummary {
    pub matched: usize,
    pub unmatched: usize,
    pub statistics: HashMap<String, Statistics>,
}

pub async fn run(args: StatsArgs, config: ConfigFile) -> Result<(), CliError> {
    let summary = execute(&args, &config).await?;

    println!(
        "{} features matched, {} without data",
        summary.matched, summary.unmatched
    );
    for key in &args.keys {
        println!();
        println!("{}", console::style(key).bold());
        match summary.statistics.get(key) {
            Some(stats) => print_statistics(stats),
            None => println!("  (no numeric values)"),
        }
    }

    Ok(())
}

pub async fn execute(args: &StatsArgs, config: &ConfigFile) -> Result<StatsSummary, CliError> {
    if !(0.0..=0.5).contains(&args.trim) {
        return Err(CliError::InvalidArgument(format!(
            "trim must be in [0, 0.5], got {}",
            args.trim
        )));
    }

    let (map, fetcher) = build_map(config)?;
    let layer = create_layer(&map, &args.geometry, config);
    let dataset = args.data.load(fetcher)?;

    let load = layer.load(&args.geometry.geometry);
    let join = layer.join(&dataset, JoinOptions::new());
    let statistics = layer.statistics_with(
        args.keys.iter().cloned(),
        &StatisticKind::ALL,
        StatisticsOptions::default().with_trim(args.trim),
    );

    load.settled().await?;
    let joined = join.settled().await?;
    let statistics = statistics.settled().await?;

    Ok(StatsSummary {
        matched: joined.matched,
        unmatched: joined.unmatched.len(),
        statistics,
    })
}

fn print_statistics(stats: &Statistics) {
    let show = |value: Option<f64>| value.map_or_else(|| "-".to_string(), |v| v.to_string());

    match stats.domain {
        Some((min, max)) => println!("  domain:    [{}, {}]", min, max),
        None => println!("  domain:    -"),
    }
    println!("  count:     {}", stats.count.unwrap_or(0));
    println!("  sum:       {}", show(stats.sum));
    println!("  mean:      {}", show(stats.mean));
    println!("  median:    {}", show(stats.median));
    println!("  deviation: {}", show(stats.deviation));
}
