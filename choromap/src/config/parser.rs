//! INI parsing: the single place where INI keys map to settings fields.

use std::path::PathBuf;
use std::time::Duration;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::color::Color;
use crate::composition::Margins;

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_dimension(section: &str, key: &str, v: &str) -> Result<f64, ConfigFileError> {
    match v.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && n > 0.0 => Ok(n),
        _ => Err(invalid(section, key, v, "must be a positive number (pixels)")),
    }
}

fn parse_millis(section: &str, key: &str, v: &str) -> Result<Duration, ConfigFileError> {
    v.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| invalid(section, key, v, "must be a non-negative integer (milliseconds)"))
}

fn parse_bool(section: &str, key: &str, v: &str) -> Result<bool, ConfigFileError> {
    match v.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(invalid(section, key, v, "must be 'true' or 'false'")),
    }
}

fn parse_margins(v: &str) -> Result<Margins, ConfigFileError> {
    let reason = "expected 'top,right,bottom,left' in pixels";
    let values = v
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid("map", "margins", v, reason))?;
    match values.as_slice() {
        [top, right, bottom, left] if values.iter().all(|m| *m >= 0.0) => {
            Ok(Margins::new(*top, *right, *bottom, *left))
        }
        _ => Err(invalid("map", "margins", v, reason)),
    }
}

/// Hex color with or without the leading `#`, which INI readers may take
/// for a comment.
fn parse_color(v: &str) -> Result<Color, crate::color::ColorError> {
    let v = v.trim();
    if v.starts_with('#') {
        Color::parse(v)
    } else {
        Color::parse(&format!("#{}", v))
    }
}

fn parse_colors(v: &str) -> Result<Vec<Color>, ConfigFileError> {
    let colors = v
        .split(',')
        .map(parse_color)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| invalid("fill", "colors", v, &e.to_string()))?;
    if !(2..=3).contains(&colors.len()) {
        return Err(invalid("fill", "colors", v, "expected two or three colors"));
    }
    Ok(colors)
}

fn parse_map(section: &Properties, config: &mut ConfigFile) -> Result<(), ConfigFileError> {
    if let Some(v) = section.get("width") {
        config.map.width = parse_dimension("map", "width", v)?;
    }
    if let Some(v) = section.get("height") {
        config.map.height = parse_dimension("map", "height", v)?;
    }
    if let Some(v) = section.get("margins") {
        config.map.margins = parse_margins(v)?;
    }
    if let Some(v) = section.get("duration_ms") {
        config.map.duration = parse_millis("map", "duration_ms", v)?;
    }
    if let Some(v) = section.get("delay_ms") {
        config.map.delay = parse_millis("map", "delay_ms", v)?;
    }
    if let Some(v) = section.get("zoomable") {
        config.map.zoomable = parse_bool("map", "zoomable", v)?;
    }
    Ok(())
}

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    if let Some(section) = ini.section(Some("map")) {
        parse_map(section, &mut config)?;
    }

    // [fill] section
    if let Some(section) = ini.section(Some("fill")) {
        if let Some(v) = section.get("colors") {
            config.fill.colors = parse_colors(v)?;
        }
        if let Some(v) = section.get("blank") {
            config.fill.blank = parse_color(v)
                .map_err(|e| invalid("fill", "blank", v, &e.to_string()))?;
        }
    }

    // [labels] section
    if let Some(section) = ini.section(Some("labels")) {
        if let Some(v) = section.get("delay_ms") {
            config.labels.delay = parse_millis("labels", "delay_ms", v)?;
        }
        if let Some(v) = section.get("duration_ms") {
            config.labels.duration = parse_millis("labels", "duration_ms", v)?;
        }
    }

    // [fetch] section
    if let Some(section) = ini.section(Some("fetch")) {
        if let Some(v) = section.get("timeout_secs") {
            config.fetch.timeout_secs = match v.trim().parse::<u64>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(invalid(
                        "fetch",
                        "timeout_secs",
                        v,
                        "must be a positive integer (seconds)",
                    ))
                }
            };
        }
        if let Some(v) = section.get("base_dir") {
            let v = v.trim();
            if !v.is_empty() {
                config.fetch.base_dir = Some(expand_tilde(v));
            }
        }
    }

    Ok(config)
}

/// Expands a leading `~/` to the home directory.
fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<ConfigFile, ConfigFileError> {
        ConfigFile::parse(content)
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_map_section() {
        let config = parse(
            "[map]\nwidth = 800\nheight = 600\nmargins = 5, 30, 5, 5\nduration_ms = 1000\nzoomable = no\n",
        )
        .unwrap();

        assert_eq!(config.map.width, 800.0);
        assert_eq!(config.map.margins, Margins::new(5.0, 30.0, 5.0, 5.0));
        assert_eq!(config.map.duration, Duration::from_millis(1000));
        assert!(!config.map.zoomable);
        assert_eq!(config.map_size().effective().width, 765.0);
    }

    #[test]
    fn test_fill_colors() {
        let config = parse("[fill]\ncolors = fff, fdd49e, b30000\nblank = ccc\n").unwrap();
        assert_eq!(config.fill.colors.len(), 3);
        assert_eq!(config.fill.colors[2], Color::rgb(0xb3, 0, 0));
        assert_eq!(config.fill.blank, Color::rgb(0xcc, 0xcc, 0xcc));
    }

    #[test]
    fn test_invalid_values_name_their_key() {
        let cases = [
            ("[map]\nwidth = -3\n", "width"),
            ("[map]\nmargins = 1,2,3\n", "margins"),
            ("[map]\nzoomable = maybe\n", "zoomable"),
            ("[fill]\ncolors = fff\n", "colors"),
            ("[fill]\nblank = teal\n", "blank"),
            ("[labels]\ndelay_ms = soon\n", "delay_ms"),
            ("[fetch]\ntimeout_secs = 0\n", "timeout_secs"),
        ];
        for (content, expected) in cases {
            match parse(content) {
                Err(ConfigFileError::InvalidValue { key, .. }) => assert_eq!(key, expected),
                other => panic!("{:?} parsed as {:?}", content, other),
            }
        }
    }

    #[test]
    fn test_fetch_base_dir() {
        let config = parse("[fetch]\nbase_dir = /srv/maps\ntimeout_secs = 5\n").unwrap();
        assert_eq!(config.fetch.base_dir, Some(PathBuf::from("/srv/maps")));
        assert_eq!(config.fetch.timeout_secs, 5);
    }
}
