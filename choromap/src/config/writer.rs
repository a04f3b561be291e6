//! INI serialization of a `ConfigFile`.

use super::settings::ConfigFile;

/// Hex digits of a `#rrggbb` color.
fn hex(color: &str) -> String {
    color.trim_start_matches('#').to_string()
}

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let margins = config.map.margins;
    let colors = config
        .fill
        .colors
        .iter()
        .map(|c| hex(&c.to_string()))
        .collect::<Vec<_>>()
        .join(", ");
    let base_dir = config
        .fetch
        .base_dir
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    format!(
        r#"[map]
; Outer size of the map in pixels
width = {}
height = {}
; Margins around the drawing area: top, right, bottom, left
margins = {}, {}, {}, {}
; Zoom transition timing in milliseconds
duration_ms = {}
delay_ms = {}
; Allow drag and wheel zoom
zoomable = {}

[fill]
; Two or three hex ramp colors (rgb or rrggbb); with three, the middle one sits at the mean
colors = {}
; Color of features without a value
blank = {}

[labels]
; Label entrance timing in milliseconds
delay_ms = {}
duration_ms = {}

[fetch]
; HTTP request timeout in seconds
timeout_secs = {}
; Directory relative file sources resolve against (empty: working directory)
base_dir = {}
"#,
        config.map.width,
        config.map.height,
        margins.top,
        margins.right,
        margins.bottom,
        margins.left,
        config.map.duration.as_millis(),
        config.map.delay.as_millis(),
        config.map.zoomable,
        colors,
        hex(&config.fill.blank.to_string()),
        config.labels.delay.as_millis(),
        config.labels.duration.as_millis(),
        config.fetch.timeout_secs,
        base_dir,
    )
}
