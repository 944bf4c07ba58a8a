use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::geometry::FeatureKey;
use crate::join::{NumberNormalizer, RowKey, ValueSource};
use crate::scale::PercentMode;
use crate::tooltip::TooltipTemplate;

fn default_true() -> bool {
    true
}

/// A title, or titles per indicator with a `default` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TitleTemplate {
    Text(String),
    ByIndicator(BTreeMap<String, String>),
}

fn default_bins() -> usize {
    6
}

fn default_min_index() -> usize {
    1
}

fn default_max_index() -> usize {
    13
}

/// Fields only a diverging scale uses.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DivergingSpec {
    #[serde(default)]
    pub pivot: f64,
    #[serde(default = "default_bins")]
    pub bins: usize,
    #[serde(default)]
    pub asymmetric: bool,
    /// Hand-picked ramp indices (0..=18 negative ramp, 19..=37 positive ramp).
    #[serde(default)]
    pub color_indices: Option<Vec<usize>>,
    #[serde(default = "default_min_index")]
    pub min_index: usize,
    #[serde(default = "default_max_index")]
    pub max_index: usize,
}

impl Default for DivergingSpec {
    fn default() -> Self {
        DivergingSpec {
            pivot: 0.0,
            bins: default_bins(),
            asymmetric: false,
            color_indices: None,
            min_index: default_min_index(),
            max_index: default_max_index(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ScaleFamily {
    /// Continuous; `domain` is `[min, max]`.
    Sequential,
    /// Pivoted thresholds; derived from data when `domain` is absent.
    Diverging(DivergingSpec),
    /// Cut points; four rounded thresholds when `domain` is absent.
    Threshold,
    /// Five even bins over `domain = [min, max]`, rounded thresholds when absent.
    Quantize,
}

/// Color scale of one metric.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScaleSpec {
    #[serde(flatten)]
    pub family: ScaleFamily,
    pub scheme: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub domain: Option<Vec<f64>>,
    #[serde(default)]
    pub percent: Option<PercentMode>,
    #[serde(default = "default_true")]
    pub clamp: bool,
    #[serde(default)]
    pub tick_decimals: Option<usize>,
    #[serde(default = "default_true")]
    pub legend: bool,
}

impl ScaleSpec {
    pub fn new(family: ScaleFamily, scheme: &str) -> Self {
        ScaleSpec {
            family,
            scheme: scheme.to_string(),
            label: String::new(),
            domain: None,
            percent: None,
            clamp: true,
            tick_decimals: None,
            legend: true,
        }
    }

    pub fn with_domain(mut self, domain: Vec<f64>) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn with_percent(mut self, percent: PercentMode) -> Self {
        self.percent = Some(percent);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct DataKeys {
    #[serde(default)]
    pub row_key: RowKey,
    #[serde(default)]
    pub feature_key: FeatureKey,
    /// Column holding every metric's value; defaults to a column named after the metric.
    #[serde(default)]
    pub value_column: Option<String>,
    /// Keep only rows whose value in this column equals the selected indicator.
    #[serde(default)]
    pub indicator_column: Option<String>,
    #[serde(default)]
    pub expansions: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct TooltipConfig {
    #[serde(default)]
    pub template: TooltipTemplate,
    /// Metric shown second by the dual-metric template; the first other configured metric when unset.
    #[serde(default)]
    pub secondary_metric: Option<String>,
}

fn default_size_label() -> String {
    "Population".to_string()
}

fn default_radius_range() -> (f64, f64) {
    (3.0, 30.0)
}

/// Presence selects proportional symbols instead of filled regions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SymbolConfig {
    pub size: ValueSource,
    #[serde(default = "default_size_label")]
    pub size_label: String,
    #[serde(default = "default_radius_range")]
    pub radius_range: (f64, f64),
    /// Draw feature codes on the symbols.
    #[serde(default = "default_true")]
    pub labels: bool,
}

impl SymbolConfig {
    pub fn new(size: ValueSource) -> Self {
        SymbolConfig {
            size,
            size_label: default_size_label(),
            radius_range: default_radius_range(),
            labels: true,
        }
    }
}

/// Frame and fixed colors. Unset sizes and unknown fill depend on the map idiom.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapStyle {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub inset: f64,
    pub fill_unknown: Option<String>,
    pub background_fill: String,
    pub outline_stroke_width: f64,
    pub overlay_stroke_width: f64,
    pub hit_radius: f64,
    pub show_legend: bool,
}

impl Default for MapStyle {
    fn default() -> Self {
        MapStyle {
            width: None,
            height: None,
            inset: 8.0,
            fill_unknown: None,
            background_fill: "#d8d8d8".to_string(),
            outline_stroke_width: 1.25,
            overlay_stroke_width: 0.5,
            hit_radius: 15.0,
            show_legend: true,
        }
    }
}

impl MapStyle {
    pub fn size(&self, symbols: bool) -> (u32, u32) {
        let (w, h) = if symbols { (975, 610) } else { (750, 500) };
        (self.width.unwrap_or(w), self.height.unwrap_or(h))
    }

    pub fn unknown_fill(&self, symbols: bool) -> &str {
        match &self.fill_unknown {
            Some(fill) => fill.as_str(),
            None if symbols => "#ddd",
            None => "#eee",
        }
    }
}

/// Everything a render needs besides the data and geometry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderConfig {
    pub title_templates: BTreeMap<String, TitleTemplate>,
    pub scales: BTreeMap<String, ScaleSpec>,
    #[serde(default)]
    pub data_keys: DataKeys,
    #[serde(default)]
    pub values: BTreeMap<String, ValueSource>,
    #[serde(default)]
    pub normalizer: NumberNormalizer,
    #[serde(default)]
    pub tooltip: TooltipConfig,
    #[serde(default)]
    pub symbols: Option<SymbolConfig>,
    #[serde(default)]
    pub style: MapStyle,
}

impl RenderConfig {
    pub fn new() -> Self {
        RenderConfig {
            title_templates: BTreeMap::new(),
            scales: BTreeMap::new(),
            data_keys: DataKeys::default(),
            values: BTreeMap::new(),
            normalizer: NumberNormalizer::default(),
            tooltip: TooltipConfig::default(),
            symbols: None,
            style: MapStyle::default(),
        }
    }

    pub fn with_scale(mut self, metric: &str, spec: ScaleSpec) -> Self {
        self.scales.insert(metric.to_string(), spec);
        self
    }

    pub fn with_title(mut self, metric: &str, template: &str) -> Self {
        self.title_templates
            .insert(metric.to_string(), TitleTemplate::Text(template.to_string()));
        self
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse render configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid configuration file {}", path.display()))
    }

    /// How a metric's value is read: explicit override, then the shared value column, then the metric name.
    pub fn value_source(&self, metric: &str) -> ValueSource {
        if let Some(source) = self.values.get(metric) {
            return source.clone();
        }
        let column = self.data_keys.value_column.as_deref().unwrap_or(metric);
        ValueSource::Column(column.to_string())
    }

    pub fn is_symbol_map(&self) -> bool {
        self.symbols.is_some()
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig::new()
    }
}

/// The caller's current selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderRequest {
    pub metric: Option<String>,
    pub indicator: Option<String>,
    pub indicator_label: Option<String>,
    /// Scheme chosen by the user; `None` or `"auto"` keeps the metric's own scheme.
    pub scheme: Option<String>,
}

impl RenderRequest {
    pub fn new(metric: &str) -> Self {
        RenderRequest {
            metric: Some(metric.to_string()),
            ..RenderRequest::default()
        }
    }

    pub fn with_indicator(mut self, key: &str, label: &str) -> Self {
        self.indicator = Some(key.to_string());
        self.indicator_label = Some(label.to_string());
        self
    }

    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = Some(scheme.to_string());
        self
    }

    /// Selected metric, `default` when none is selected.
    pub fn metric_key(&self) -> &str {
        self.metric.as_deref().filter(|m| !m.is_empty()).unwrap_or("default")
    }

    /// User-selected scheme, ignoring `auto`.
    pub fn selected_scheme(&self) -> Option<&str> {
        self.scheme
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("auto"))
    }
}
