//! `choromap fill`: joins a dataset onto a geometry layer and colors it.

use clap::Args;
use choromap::config::ConfigFile;
use choromap::layer::{FeatureState, FillOptions, FillReport, JoinOptions};
use choromap::Value;
use tracing::info;

use super::common::{
    build_map, create_layer, describe_state, describe_value, parse_colors, parse_domain, DataArgs,
    GeometryArgs,
};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct FillArgs {
    #[command(flatten)]
    pub geometry: GeometryArgs,

    #[command(flatten)]
    pub data: DataArgs,

    /// Column whose values color the features
    #[arg(long, short = 'k')]
    pub key: String,

    /// Feature property matched against the data key (defaults to --primary)
    #[arg(long)]
    pub geo_key: Option<String>,

    /// Two or three ramp colors, e.g. "#ffffff,#000000"
    #[arg(long)]
    pub colors: Option<String>,

    /// Explicit scale domain as min,max
    #[arg(long)]
    pub domain: Option<String>,

    /// Extrapolate values outside the domain instead of clamping them
    #[arg(long)]
    pub no_clamp: bool,
}

/// One printed row: a feature and how it was colored.
#[derive(Debug, Clone)]
pub struct FeatureRow {
    pub id: String,
    pub name: String,
    pub value: Option<Value>,
    pub state: FeatureState,
}

/// Outcome of a fill run.
#[derive(Debug, Clone)]
pub struct FillSummary {
    pub features: usize,
    pub matched: usize,
    pub report: FillReport,
    pub rows: Vec<FeatureRow>,
}

/// Runs the pipeline and prints feature states.
pub async fn run(args: FillArgs, config: ConfigFile) -> Result<(), CliError> {
    let summary = execute(&args, &config).await?;
    print_summary(&summary);
    Ok(())
}

/// Runs the load, render, join and fill pipeline.
pub async fn execute(args: &FillArgs, config: &ConfigFile) -> Result<FillSummary, CliError> {
    let mut options = match &args.colors {
        Some(colors) => FillOptions::new(parse_colors(colors)?),
        None => config.fill_options(),
    };
    if let Some(domain) = &args.domain {
        let (min, max) = parse_domain(domain)?;
        options = options.with_domain(min, max);
    }
    options = options.with_clamp(!args.no_clamp);

    let (map, fetcher) = build_map(config)?;
    let layer = create_layer(&map, &args.geometry, config);
    let dataset = args.data.load(fetcher)?;

    let mut join_options = JoinOptions::new();
    if let Some(geo_key) = &args.geo_key {
        join_options = join_options.with_geo_key(geo_key);
    }

    // Declared up front; each queued step waits for the previous one.
    let load = layer.load(&args.geometry.geometry);
    let render = layer.render();
    let join = layer.join(&dataset, join_options);
    let fill = layer.fill(&args.key, options);

    let features = load.settled().await?;
    render.settled().await?;
    let joined = join.settled().await?;
    let report = fill.settled().await?;
    info!(
        features,
        matched = joined.matched,
        filled = report.filled,
        blank = report.blank,
        "Fill complete"
    );

    let rows = layer
        .shapes()
        .into_iter()
        .map(|shape| FeatureRow {
            value: layer
                .properties(&shape.id)
                .and_then(|properties| properties.get(&args.key).cloned()),
            name: layer.feature_name(&shape.id).unwrap_or_default(),
            state: shape.state(),
            id: shape.id,
        })
        .collect();

    Ok(FillSummary {
        features,
        matched: joined.matched,
        report,
        rows,
    })
}

fn print_summary(summary: &FillSummary) {
    let report = &summary.report;
    println!(
        "{} features, {} matched, {} filled, {} blank",
        summary.features, summary.matched, report.filled, report.blank
    );
    if !report.scale.is_flat() {
        let breakpoints: Vec<String> = report
            .scale
            .breakpoints()
            .iter()
            .map(|b| b.to_string())
            .collect();
        println!("Breakpoints: {}", breakpoints.join(", "));
    }
    println!();

    for row in &summary.rows {
        println!(
            "{:<12} {:<24} {:>12}  {}",
            row.id,
            row.name,
            describe_value(row.value.as_ref()),
            describe_state(row.state)
        );
    }
}
