// Tooltip text attached to hit targets

use serde::Deserialize;

use crate::geometry::GeoFeature;
use crate::join::{JoinEntry, NumberNormalizer, ValueSource};
use crate::scale::PercentMode;

/// Shown in place of a missing value.
pub const MISSING_VALUE: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TooltipTemplate {
    /// `name`, then `label: value`.
    #[default]
    SingleMetric,
    /// Adds the indicator label and a second metric read from the same row.
    DualMetric,
    /// `name (code)`, the variation and the population behind the symbol.
    Variation,
}

/// How the values of one metric are written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueFormat<'a> {
    pub label: &'a str,
    pub percent: Option<PercentMode>,
}

impl<'a> ValueFormat<'a> {
    pub fn new(label: &'a str, percent: Option<PercentMode>) -> Self {
        ValueFormat { label, percent }
    }

    pub fn format(&self, value: Option<f64>) -> String {
        let Some(v) = value.filter(|v| v.is_finite()) else {
            return MISSING_VALUE.to_string();
        };
        match self.percent {
            Some(PercentMode::Proportion) => format!("{:.1} %", v * 100.0),
            Some(PercentMode::Points) => format!("{v:.1} %"),
            None if is_duration(self.label) => format!("{v:.1} min"),
            None => format!("{v:.1}"),
        }
    }
}

fn is_duration(label: &str) -> bool {
    let lower = label.to_lowercase();
    lower.contains("min") || lower.contains("durée")
}

/// Integer with French digit grouping (narrow no-break space every three digits).
pub fn format_grouped(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('\u{202f}');
        }
        out.push(ch);
    }
    if rounded < 0.0 {
        out.insert(0, '-');
    }
    out
}

/// A second metric shown by the dual-metric template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecondaryMetric<'a> {
    pub source: &'a ValueSource,
    pub format: ValueFormat<'a>,
}

/// Builds the tooltip text of each feature for one render.
#[derive(Debug, Clone, Copy)]
pub struct TooltipBuilder<'a> {
    pub template: TooltipTemplate,
    pub metric: ValueFormat<'a>,
    pub indicator_label: &'a str,
    pub secondary: Option<SecondaryMetric<'a>>,
    pub normalizer: &'a NumberNormalizer,
}

impl<'a> TooltipBuilder<'a> {
    pub fn new(template: TooltipTemplate, metric: ValueFormat<'a>, normalizer: &'a NumberNormalizer) -> Self {
        TooltipBuilder {
            template,
            metric,
            indicator_label: "-",
            secondary: None,
            normalizer,
        }
    }

    pub fn with_indicator_label(mut self, label: &'a str) -> Self {
        self.indicator_label = label;
        self
    }

    pub fn with_secondary(mut self, secondary: SecondaryMetric<'a>) -> Self {
        self.secondary = Some(secondary);
        self
    }

    /// Tooltip for a feature; `code` is its raw join code, `entry` its joined row if any.
    pub fn title(&self, feature: &GeoFeature, code: Option<&str>, entry: Option<&JoinEntry<'_>>) -> String {
        let value = entry.and_then(|e| e.value);
        match self.template {
            TooltipTemplate::SingleMetric => {
                let name = self.display_name(feature, code);
                format!("{name}\n{}: {}", self.metric.label, self.metric.format(value))
            }
            TooltipTemplate::DualMetric => {
                let name = self.display_name(feature, code);
                let mut text = format!(
                    "{name}\n{}\n{}: {}",
                    self.indicator_label,
                    self.metric.label,
                    self.metric.format(value)
                );
                if let (Some(secondary), Some(entry)) = (self.secondary, entry) {
                    let other = secondary.source.value(entry.row, self.normalizer);
                    text.push_str(&format!("\n{}: {}", secondary.format.label, secondary.format.format(other)));
                }
                text
            }
            TooltipTemplate::Variation => {
                let name = feature.name().unwrap_or_else(|| "Unknown".to_string());
                let code = code.unwrap_or("??");
                let (Some(v), Some(entry)) = (value, entry) else {
                    return format!("{name} ({code}): Pas de données");
                };
                let variation = match self.metric.percent {
                    Some(_) => format!("{v:.1}%"),
                    None => format!("{v:.2}"),
                };
                let population = format_grouped(entry.size.unwrap_or(0.0));
                format!("{name} ({code})\nVariation: {variation}\nPopulation: {population}")
            }
        }
    }

    fn display_name(&self, feature: &GeoFeature, code: Option<&str>) -> String {
        feature
            .name()
            .or_else(|| code.map(str::to_string))
            .unwrap_or_else(|| MISSING_VALUE.to_string())
    }
}
