//! Linear and diverging color scales.

use super::{Color, ColorError, Lab};
use crate::stats::Statistics;

/// Numeric domain of a scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleDomain {
    pub min: f64,
    pub max: f64,
    /// Middle breakpoint of diverging scales.
    pub mean: Option<f64>,
}

impl ScaleDomain {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            mean: None,
        }
    }

    pub fn with_mean(mut self, mean: f64) -> Self {
        self.mean = Some(mean);
        self
    }

    /// Domain taken from computed statistics; `None` without a domain.
    pub fn from_statistics(stats: &Statistics) -> Option<Self> {
        stats.domain.map(|(min, max)| Self {
            min,
            max,
            mean: stats.mean,
        })
    }

    fn is_degenerate(&self) -> bool {
        !(self.max > self.min)
    }
}

/// Options for [`ColorScale::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleOptions {
    /// Two colors for a linear scale, three for a diverging one.
    pub colors: Vec<Color>,
    /// `None` when there is no numeric data.
    pub domain: Option<ScaleDomain>,
    /// Clamp values outside the domain to the end colors.
    pub clamp: bool,
}

impl ScaleOptions {
    pub fn new(colors: Vec<Color>, domain: Option<ScaleDomain>) -> Self {
        Self {
            colors,
            domain,
            clamp: true,
        }
    }

    pub fn with_clamp(mut self, clamp: bool) -> Self {
        self.clamp = clamp;
        self
    }
}

/// A function from numbers to colors.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorScale {
    /// Every value maps to the same color.
    Flat(Color),
    /// Piecewise linear interpolation in Lab between breakpoints.
    Piecewise {
        breakpoints: Vec<f64>,
        colors: Vec<Color>,
        clamp: bool,
    },
}

impl ColorScale {
    /// Builds a scale.
    ///
    /// A degenerate domain (`min == max`) or a missing one yields a flat
    /// scale using the middle of the color ramp.
    pub fn build(options: ScaleOptions) -> Result<Self, ColorError> {
        let colors = options.colors;
        if !(2..=3).contains(&colors.len()) {
            return Err(ColorError::ColorCount(colors.len()));
        }

        let domain = match options.domain {
            Some(domain) if !domain.is_degenerate() => domain,
            _ => return Ok(ColorScale::Flat(middle_color(&colors))),
        };

        let breakpoints = if colors.len() == 3 {
            let mean = domain.mean.ok_or(ColorError::MissingMean)?;
            vec![domain.min, mean.clamp(domain.min, domain.max), domain.max]
        } else {
            vec![domain.min, domain.max]
        };

        Ok(ColorScale::Piecewise {
            breakpoints,
            colors,
            clamp: options.clamp,
        })
    }

    /// Maps `value` to a color.
    pub fn apply(&self, value: f64) -> Color {
        match self {
            ColorScale::Flat(color) => *color,
            ColorScale::Piecewise {
                breakpoints,
                colors,
                clamp,
            } => {
                let last = breakpoints.len() - 1;
                let value = if *clamp {
                    value.clamp(breakpoints[0], breakpoints[last])
                } else {
                    value
                };

                // Rightmost segment whose start is <= value, within bounds.
                let segment = breakpoints[1..last]
                    .iter()
                    .take_while(|b| **b <= value)
                    .count();
                let (d0, d1) = (breakpoints[segment], breakpoints[segment + 1]);
                let (c0, c1) = (colors[segment], colors[segment + 1]);

                let t = if d1 > d0 { (value - d0) / (d1 - d0) } else { 0.5 };
                if t == 0.0 {
                    c0
                } else if t == 1.0 {
                    c1
                } else {
                    c0.to_lab().lerp(c1.to_lab(), t).to_color()
                }
            }
        }
    }

    /// Breakpoints of the scale; empty for flat scales.
    pub fn breakpoints(&self) -> &[f64] {
        match self {
            ColorScale::Flat(_) => &[],
            ColorScale::Piecewise { breakpoints, .. } => breakpoints,
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, ColorScale::Flat(_))
    }
}

fn middle_color(colors: &[Color]) -> Color {
    match colors {
        [first, last] => first.to_lab().lerp(last.to_lab(), 0.5).to_color(),
        [_, middle, _] => *middle,
        _ => Lab { l: 0.0, a: 0.0, b: 0.0 }.to_color(),
    }
}
