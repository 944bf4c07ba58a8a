use serde::Deserialize;

use crate::color;
use crate::domain;

/// How percentage metrics are stored in the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentMode {
    /// Proportions in 0..1.
    Proportion,
    /// Values already in percent.
    Points,
}

/// How a color scale maps values to colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleKind {
    /// Explicit cut points; `colors.len() == domain.len() + 1`.
    Threshold,
    /// `[min, max]` split into `colors.len()` equal bins.
    Quantize,
    /// Continuous interpolation through the colors over `[min, max]`.
    Linear,
}

/// Legend/tick label formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFormat {
    /// One decimal below 10 in magnitude, integers above.
    Auto,
    Fixed(usize),
    /// Proportions in 0..1 shown as percentages.
    Percent { decimals: usize },
    /// Values already expressed in percent.
    PercentPoints { decimals: usize },
}

impl TickFormat {
    pub fn format(&self, value: f64) -> String {
        match self {
            TickFormat::Auto if value.abs() < 10.0 => format!("{value:.1}"),
            TickFormat::Auto => format!("{value:.0}"),
            TickFormat::Fixed(decimals) => format!("{:.*}", *decimals, value),
            TickFormat::Percent { decimals } => format!("{:.*}%", *decimals, value * 100.0),
            TickFormat::PercentPoints { decimals } => format!("{:.*}%", *decimals, value),
        }
    }
}

/// One row of a legend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendEntry {
    pub color: String,
    pub label: String,
}

/// Resolved color scale handed to the backend alongside the layers.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    pub kind: ScaleKind,
    /// Scheme the colors were drawn from.
    pub scheme: String,
    pub colors: Vec<String>,
    pub domain: Vec<f64>,
    /// Fill for missing values, and for values outside an unclamped domain.
    pub unknown: String,
    pub clamp: bool,
    pub label: String,
    pub tick_format: TickFormat,
    pub legend: bool,
}

impl ColorScale {
    /// Color for a value; `None`, NaN and unmappable values get the unknown color.
    pub fn color(&self, value: Option<f64>) -> String {
        self.try_color(value).unwrap_or_else(|| self.unknown.clone())
    }

    fn try_color(&self, value: Option<f64>) -> Option<String> {
        let v = value.filter(|v| v.is_finite())?;
        match self.kind {
            ScaleKind::Threshold => {
                if self.domain.is_empty() {
                    return None;
                }
                let bin = self.domain.partition_point(|t| *t <= v);
                self.colors.get(bin).cloned()
            }
            ScaleKind::Quantize => {
                let t = self.position(v)?;
                let n = self.colors.len();
                let bin = ((t * n as f64).floor() as usize).min(n.checked_sub(1)?);
                self.colors.get(bin).cloned()
            }
            ScaleKind::Linear => {
                let t = self.position(v)?;
                color::interpolate(&self.colors, t).map(|c| c.to_hex())
            }
        }
    }

    /// Position of `v` in `[min, max]` as a fraction, honoring `clamp`.
    fn position(&self, v: f64) -> Option<f64> {
        let (lo, hi) = self.extent()?;
        if !self.clamp && (v < lo || v > hi) {
            return None;
        }
        if hi == lo {
            return Some(0.5);
        }
        Some(((v - lo) / (hi - lo)).clamp(0.0, 1.0))
    }

    fn extent(&self) -> Option<(f64, f64)> {
        match self.domain.as_slice() {
            [] | [_] => None,
            [lo, .., hi] if hi >= lo => Some((*lo, *hi)),
            _ => None,
        }
    }

    /// Cut points between consecutive colors.
    pub fn thresholds(&self) -> Vec<f64> {
        match self.kind {
            ScaleKind::Threshold => self.domain.clone(),
            ScaleKind::Quantize => match self.extent() {
                Some((lo, hi)) => {
                    let n = self.colors.len();
                    (1..n).map(|i| lo + (hi - lo) * i as f64 / n as f64).collect()
                }
                None => Vec::new(),
            },
            ScaleKind::Linear => Vec::new(),
        }
    }

    /// Darkest color of the palette (its last entry).
    pub fn darkest(&self) -> Option<&str> {
        self.colors.last().map(String::as_str)
    }

    pub fn legend_entries(&self) -> Vec<LegendEntry> {
        if self.kind == ScaleKind::Linear {
            let Some((lo, hi)) = self.extent() else {
                return Vec::new();
            };
            return domain::ticks(lo, hi, 5)
                .into_iter()
                .map(|tick| LegendEntry {
                    color: self.color(Some(tick)),
                    label: self.tick_format.format(tick),
                })
                .collect();
        }

        let cuts = self.thresholds();
        if cuts.is_empty() {
            return Vec::new();
        }
        let fmt = |v: f64| self.tick_format.format(v);
        self.colors
            .iter()
            .enumerate()
            .take(cuts.len() + 1)
            .map(|(i, color)| {
                let label = if i == 0 {
                    format!("< {}", fmt(cuts[0]))
                } else if i == cuts.len() {
                    format!("≥ {}", fmt(cuts[i - 1]))
                } else {
                    format!("{} – {}", fmt(cuts[i - 1]), fmt(cuts[i]))
                };
                LegendEntry {
                    color: color.clone(),
                    label,
                }
            })
            .collect()
    }
}

/// Square-root size scale for proportional symbols, from `[0, max]` onto a radius range.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeScale {
    pub max: f64,
    pub range: (f64, f64),
    pub label: String,
}

impl SizeScale {
    pub fn new(max: f64, range: (f64, f64), label: impl Into<String>) -> Self {
        SizeScale {
            max,
            range,
            label: label.into(),
        }
    }

    /// Radius for a size value; `None` means no symbol is drawn.
    pub fn radius(&self, value: Option<f64>) -> Option<f64> {
        let v = value.filter(|v| v.is_finite())?;
        let (min_r, max_r) = self.range;
        if !(self.max > 0.0) {
            return Some(min_r);
        }
        let t = (v.max(0.0) / self.max).sqrt().min(1.0);
        Some(min_r + (max_r - min_r) * t)
    }
}
