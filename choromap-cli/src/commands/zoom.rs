//! `choromap zoom`: the viewport transform framing a layer or one feature.

use std::time::Duration;

use clap::Args;
use choromap::config::ConfigFile;
use choromap::viewport::{ViewportSize, ViewportTransform};

use super::common::{build_map_with, create_layer, GeometryArgs, LAYER_ID};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ZoomArgs {
    #[command(flatten)]
    pub geometry: GeometryArgs,

    /// Feature id to frame; the whole layer when omitted
    #[arg(long, short = 'f')]
    pub feature: Option<String>,

    /// Fraction of the viewport the framed box may cover
    #[arg(long, default_value = "1.0")]
    pub margin: f64,

    /// Play the transition in real time instead of jumping to the target
    #[arg(long)]
    pub animate: bool,
}

/// Outcome of a zoom run.
#[derive(Debug, Clone, Copy)]
pub struct ZoomSummary {
    pub size: ViewportSize,
    pub target: ViewportTransform,
    pub scale_extent: (f64, f64),
}

pub async fn run(args: ZoomArgs, config: ConfigFile) -> Result<(), CliError> {
    let summary = execute(&args, config).await?;
    let (min, max) = summary.scale_extent;

    println!("Viewport:     {} x {}", summary.size.width, summary.size.height);
    println!(
        "Translate:    [{:.3}, {:.3}]",
        summary.target.x, summary.target.y
    );
    println!("Scale:        {:.4}", summary.target.k);
    println!("Scale extent: [{}, {}]", min, max);

    Ok(())
}

pub async fn execute(args: &ZoomArgs, mut config: ConfigFile) -> Result<ZoomSummary, CliError> {
    if !(args.margin > 0.0 && args.margin <= 1.0) {
        return Err(CliError::InvalidArgument(format!(
            "margin must be in (0, 1], got {}",
            args.margin
        )));
    }
    if !args.animate {
        config.map.delay = Duration::ZERO;
        config.map.duration = Duration::ZERO;
    }

    let options = config.composition_options().with_zoom_margin(args.margin);
    let (map, _) = build_map_with(&config, options)?;
    let layer = create_layer(&map, &args.geometry, &config);

    let load = layer.load(&args.geometry.geometry);
    let render = layer.render();
    let zoom = map.zoom_on(LAYER_ID, args.feature.as_deref())?;

    load.settled().await?;
    render.settled().await?;
    let target = zoom.settled().await?;

    Ok(ZoomSummary {
        size: map.viewport().size(),
        target,
        scale_extent: map.zoom().scale_extent(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::common::fixtures;

    fn args(feature: Option<&str>, margin: f64) -> ZoomArgs {
        ZoomArgs {
            geometry: fixtures::geometry_args(),
            feature: feature.map(str::to_string),
            margin,
            animate: false,
        }
    }

    #[tokio::test]
    async fn test_zoom_on_whole_layer_and_feature() {
        let (_dir, config) = fixtures::workspace();

        let whole = execute(&args(None, 1.0), config.clone()).await.unwrap();
        assert!((whole.target.k - 1.0).abs() < 1e-6);
        assert_eq!(whole.scale_extent.1, whole.target.k * 4.0);

        let single = execute(&args(Some("2"), 1.0), config).await.unwrap();
        assert!(single.target.k > whole.target.k);
        assert_eq!(single.scale_extent.1, single.target.k * 4.0);
    }

    #[tokio::test]
    async fn test_zoom_rejects_bad_margin() {
        let (_dir, config) = fixtures::workspace();
        assert!(matches!(
            execute(&args(None, 1.5), config).await,
            Err(CliError::InvalidArgument(_))
        ));
    }
}
