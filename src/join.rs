// Joining tabular rows to geographic features by territorial code

use serde::Deserialize;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::geometry::{FeatureKey, GeoFeature};

/// Normalize a territorial code: trimmed, uppercased, left-padded with `0` to two characters.
///
/// Applied identically to row keys and feature keys; idempotent.
pub fn normalize_key(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    if upper.chars().count() >= 2 {
        upper
    } else {
        format!("{:0>2}", upper)
    }
}

/// A cell value as delivered by the data provider.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawValue {
    #[default]
    Missing,
    Number(f64),
    Text(String),
}

impl RawValue {
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            RawValue::Missing => None,
            RawValue::Number(n) => Some(Cow::Owned(n.to_string())),
            RawValue::Text(s) => Some(Cow::Borrowed(s.as_str())),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

/// One flat record: column name to raw value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataRow {
    fields: HashMap<String, RawValue>,
}

impl DataRow {
    pub fn new() -> Self {
        DataRow::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<RawValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        DataRow {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn get(&self, column: &str) -> &RawValue {
        static MISSING: RawValue = RawValue::Missing;
        self.fields.get(column).unwrap_or(&MISSING)
    }

    pub fn text(&self, column: &str) -> Option<Cow<'_, str>> {
        self.get(column).as_text()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: RawValue) {
        self.fields.insert(column.into(), value);
    }
}

/// Converts raw cell values into numbers.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberNormalizer {
    /// Numbers pass through, text must already use a `.` decimal separator.
    Identity,
    /// A `,` decimal separator is accepted.
    #[default]
    LocaleDecimal,
    /// Locale-decimal parse, then division (e.g. percent points to proportions).
    Scaled { divisor: f64 },
}

impl NumberNormalizer {
    pub fn normalize(&self, raw: &RawValue) -> Option<f64> {
        let value = match raw {
            RawValue::Missing => return None,
            RawValue::Number(n) => *n,
            RawValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                match self {
                    NumberNormalizer::Identity => trimmed.parse::<f64>().ok()?,
                    _ => trimmed.replacen(',', ".", 1).parse::<f64>().ok()?,
                }
            }
        };
        let value = match self {
            NumberNormalizer::Scaled { divisor } if *divisor != 0.0 => value / divisor,
            _ => value,
        };
        value.is_finite().then_some(value)
    }
}

/// Where a row's join code comes from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKey {
    Column(String),
    /// A column whose codes carry a fixed-length prefix (`A01` for academy `01`).
    StripPrefix { column: String, len: usize },
}

impl RowKey {
    pub fn raw_key(&self, row: &DataRow) -> Option<String> {
        let raw = match self {
            RowKey::Column(column) => row.text(column)?.trim().to_string(),
            RowKey::StripPrefix { column, len } => row.text(column)?.trim().chars().skip(*len).collect(),
        };
        (!raw.is_empty()).then_some(raw)
    }

    pub fn key(&self, row: &DataRow) -> Option<String> {
        self.raw_key(row).map(|k| normalize_key(&k))
    }
}

impl Default for RowKey {
    fn default() -> Self {
        RowKey::Column("DEP".to_string())
    }
}

/// How a metric value is read from a row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    Column(String),
    /// `minuend - subtrahend`, e.g. an amplitude between two deciles.
    Difference { minuend: String, subtrahend: String },
}

impl ValueSource {
    pub fn value(&self, row: &DataRow, normalizer: &NumberNormalizer) -> Option<f64> {
        match self {
            ValueSource::Column(column) => normalizer.normalize(row.get(column)),
            ValueSource::Difference {
                minuend,
                subtrahend,
            } => {
                let a = normalizer.normalize(row.get(minuend))?;
                let b = normalizer.normalize(row.get(subtrahend))?;
                Some(a - b)
            }
        }
    }
}

/// Everything needed to index a set of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinRules {
    pub row_key: RowKey,
    pub value: ValueSource,
    pub size: Option<ValueSource>,
    pub normalizer: NumberNormalizer,
    /// Normalized key to the keys a matching row is replicated under.
    pub expansions: BTreeMap<String, Vec<String>>,
}

impl JoinRules {
    pub fn new(row_key: RowKey, value: ValueSource) -> Self {
        JoinRules {
            row_key,
            value,
            size: None,
            normalizer: NumberNormalizer::default(),
            expansions: BTreeMap::new(),
        }
    }

    pub fn with_size(mut self, size: ValueSource) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_normalizer(mut self, normalizer: NumberNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_expansion(mut self, key: &str, targets: &[&str]) -> Self {
        self.expansions.insert(
            normalize_key(key),
            targets.iter().map(|t| t.to_string()).collect(),
        );
        self
    }
}

/// A row matched to a normalized key, with its metric value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinEntry<'a> {
    pub row: &'a DataRow,
    pub value: Option<f64>,
    /// Symbol size, when the render sizes symbols.
    pub size: Option<f64>,
}

/// Normalized-key lookup from features to rows, rebuilt for every render.
#[derive(Debug, Clone, Default)]
pub struct JoinIndex<'a> {
    entries: HashMap<String, JoinEntry<'a>>,
}

impl<'a> JoinIndex<'a> {
    /// Index `rows`; rows without a key are skipped and later duplicates win.
    pub fn build(rows: &'a [DataRow], rules: &JoinRules) -> Self {
        let mut entries = HashMap::with_capacity(rows.len());
        let mut skipped = 0usize;
        let mut duplicates = 0usize;

        for row in rows {
            let Some(key) = rules.row_key.key(row) else {
                skipped += 1;
                continue;
            };
            let entry = JoinEntry {
                row,
                value: rules.value.value(row, &rules.normalizer),
                size: rules.size.as_ref().and_then(|s| s.value(row, &rules.normalizer)),
            };
            if let Some(targets) = rules.expansions.get(&key) {
                for target in targets {
                    entries.insert(normalize_key(target), entry);
                }
            }
            if entries.insert(key, entry).is_some() {
                duplicates += 1;
            }
        }

        debug!(rows = rows.len(), keys = entries.len(), skipped, duplicates, "built join index");
        JoinIndex { entries }
    }

    /// Look up a key, normalizing it first.
    pub fn get(&self, key: &str) -> Option<&JoinEntry<'a>> {
        self.entries.get(&normalize_key(key))
    }

    pub fn lookup(&self, feature: &GeoFeature, feature_key: &FeatureKey) -> Option<&JoinEntry<'a>> {
        feature_key.key(feature).and_then(|key| self.entries.get(&key))
    }

    /// Non-null metric values, for domain inference.
    pub fn values(&self) -> Vec<f64> {
        self.entries.values().filter_map(|e| e.value).collect()
    }

    /// Largest non-null size.
    pub fn max_size(&self) -> Option<f64> {
        self.entries
            .values()
            .filter_map(|e| e.size)
            .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |m| m.max(s))))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Copy `source_column` from `source` rows into `target_column` of `rows`, matching by normalized key.
///
/// Returns how many rows received a value.
pub fn attach_column(
    rows: &mut [DataRow],
    row_key: &RowKey,
    target_column: &str,
    source: &[DataRow],
    source_key: &RowKey,
    source_column: &str,
) -> usize {
    let lookup: HashMap<String, &RawValue> = source
        .iter()
        .filter_map(|r| source_key.key(r).map(|k| (k, r.get(source_column))))
        .collect();

    let mut attached = 0;
    for row in rows.iter_mut() {
        let Some(value) = row_key.key(row).and_then(|k| lookup.get(&k).copied()) else {
            continue;
        };
        row.insert(target_column, value.clone());
        attached += 1;
    }
    debug!(attached, total = rows.len(), column = target_column, "attached secondary column");
    attached
}
