// Color palette registry and sampling rules

use std::collections::HashMap;

use crate::color;
use crate::error::RenderError;
use crate::schemes::{self, RAMP_SHADES};

/// Ramp positions used for the 5-color sequential palettes (shades 100, 250, 400, 550, 700).
pub const SEQUENTIAL_INDICES: [usize; 5] = [1, 4, 7, 10, 13];

/// Number of samples taken from an interpolator for sequential use.
const INTERPOLATOR_STEPS: usize = 8;

/// A scheme coming from the color library rather than the custom ramps.
#[derive(Debug, Clone, PartialEq)]
pub enum LibraryScheme {
    /// Fixed set of colors used as-is.
    Discrete(Vec<String>),
    /// Evenly spaced stops of a continuous interpolator.
    Interpolated(Vec<String>),
}

/// What a scheme name refers to in a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeKind {
    Ramp,
    DivergingPair,
    Library,
}

/// Sampling parameters for a diverging pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivergingSampling {
    pub num_negative: usize,
    pub num_positive: usize,
    pub min_index: usize,
    pub max_index: usize,
}

impl DivergingSampling {
    /// Equal halves of `total` colors over the default index window 1..=13.
    pub fn symmetric(total: usize) -> Self {
        let num_negative = total / 2;
        DivergingSampling {
            num_negative,
            num_positive: total - num_negative,
            min_index: 1,
            max_index: 13,
        }
    }

    pub fn with_counts(mut self, num_negative: usize, num_positive: usize) -> Self {
        self.num_negative = num_negative;
        self.num_positive = num_positive;
        self
    }

    pub fn with_window(mut self, min_index: usize, max_index: usize) -> Self {
        self.min_index = min_index;
        self.max_index = max_index;
        self
    }

    pub fn total(&self) -> usize {
        self.num_negative + self.num_positive
    }
}

impl Default for DivergingSampling {
    fn default() -> Self {
        DivergingSampling::symmetric(6)
    }
}

/// How many colors to draw from a scheme, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
    /// The scheme's natural palette (5 ramp shades, the full library scheme, or 8 interpolated steps).
    Sequential,
    /// Exactly `count` colors taken at bin centers.
    Quantize { count: usize },
    /// Negative side walking dark to light, then positive side light to dark.
    Diverging(DivergingSampling),
}

/// Immutable lookup of every color scheme the resolver knows about.
///
/// Built once (usually with [`PaletteRegistry::builtin`]) and passed to the
/// renderer; tests construct their own with synthetic ramps.
#[derive(Debug, Clone, Default)]
pub struct PaletteRegistry {
    ramps: HashMap<String, Vec<String>>,
    pairs: HashMap<String, (String, String)>,
    library: HashMap<String, LibraryScheme>,
}

impl PaletteRegistry {
    /// An empty registry; every lookup returns `None`.
    pub fn empty() -> Self {
        PaletteRegistry::default()
    }

    /// The seven custom ramps, their ten diverging pairs and the library schemes.
    pub fn builtin() -> Self {
        let mut registry = PaletteRegistry::empty();
        for (name, shades) in schemes::RAMPS {
            registry
                .ramps
                .insert(name.to_string(), shades.iter().map(|s| s.to_string()).collect());
        }
        for (name, negative, positive) in schemes::DIVERGING_PAIRS {
            registry
                .pairs
                .insert(name.to_string(), (negative.to_string(), positive.to_string()));
        }
        for (name, hex) in schemes::SEQUENTIAL_9.iter().chain(schemes::DIVERGING_11.iter()) {
            registry.library.insert(
                name.to_string(),
                LibraryScheme::Discrete(schemes::decode_hex_list(hex)),
            );
        }
        for (name, hex) in schemes::INTERPOLATORS {
            registry.library.insert(
                name.to_string(),
                LibraryScheme::Interpolated(schemes::decode_hex_list(hex)),
            );
        }
        registry
    }

    /// Register a 19-shade ramp, ordered light to dark.
    pub fn with_ramp(mut self, name: &str, shades: Vec<String>) -> Result<Self, RenderError> {
        if shades.len() != RAMP_SHADES {
            return Err(RenderError::InvalidRamp {
                name: name.to_string(),
                len: shades.len(),
                expected: RAMP_SHADES,
            });
        }
        self.ramps.insert(name.to_ascii_lowercase(), shades);
        Ok(self)
    }

    /// Register a diverging pair over two already-registered ramps.
    pub fn with_pair(mut self, name: &str, negative: &str, positive: &str) -> Result<Self, RenderError> {
        for ramp in [negative, positive] {
            if !self.ramps.contains_key(&ramp.to_ascii_lowercase()) {
                return Err(RenderError::UnknownRamp {
                    name: name.to_string(),
                    ramp: ramp.to_string(),
                });
            }
        }
        self.pairs.insert(
            name.to_ascii_lowercase(),
            (negative.to_ascii_lowercase(), positive.to_ascii_lowercase()),
        );
        Ok(self)
    }

    pub fn with_library(mut self, name: &str, scheme: LibraryScheme) -> Self {
        self.library.insert(name.to_ascii_lowercase(), scheme);
        self
    }

    pub fn kind_of(&self, scheme: &str) -> Option<SchemeKind> {
        let key = lookup_key(scheme);
        if self.pairs.contains_key(&key) {
            Some(SchemeKind::DivergingPair)
        } else if self.ramps.contains_key(&key) {
            Some(SchemeKind::Ramp)
        } else if self.library.contains_key(&key) {
            Some(SchemeKind::Library)
        } else {
            None
        }
    }

    /// Darkest shade of a custom ramp.
    pub fn darkest_shade(&self, ramp: &str) -> Option<&str> {
        self.ramps
            .get(&lookup_key(ramp))
            .and_then(|shades| shades.last())
            .map(String::as_str)
    }

    /// Resolve a scheme name into an ordered list of colors.
    ///
    /// Returns `None` for names the registry does not know; the caller falls
    /// back to a library default.
    pub fn resolve(&self, scheme: &str, sampling: Sampling) -> Option<Vec<String>> {
        let key = lookup_key(scheme);

        if let Some((negative, positive)) = self.pair_ramps(&key) {
            let params = match sampling {
                Sampling::Diverging(params) => params,
                Sampling::Sequential => DivergingSampling::default(),
                Sampling::Quantize { count } => DivergingSampling::symmetric(count),
            };
            return Some(sample_diverging(negative, positive, params));
        }

        if let Some(shades) = self.ramps.get(&key) {
            let base: Vec<String> = SEQUENTIAL_INDICES
                .iter()
                .filter_map(|&i| shades.get(i).cloned())
                .collect();
            return Some(match sampling {
                Sampling::Sequential => base,
                Sampling::Quantize { count } => color::resample(&base, count),
                Sampling::Diverging(params) => color::resample(&base, params.total()),
            });
        }

        match self.library.get(&key)? {
            LibraryScheme::Discrete(colors) => Some(match sampling {
                Sampling::Sequential => colors.clone(),
                Sampling::Quantize { count } => color::resample(colors, count),
                Sampling::Diverging(params) => color::resample(colors, params.total()),
            }),
            LibraryScheme::Interpolated(stops) => {
                let positions: Vec<f64> = match sampling {
                    Sampling::Sequential => (0..INTERPOLATOR_STEPS)
                        .map(|i| (i + 1) as f64 / INTERPOLATOR_STEPS as f64)
                        .collect(),
                    Sampling::Quantize { count } => bin_centers(count),
                    Sampling::Diverging(params) => bin_centers(params.total()),
                };
                Some(
                    positions
                        .into_iter()
                        .filter_map(|t| color::interpolate(stops, t))
                        .map(|c| c.to_hex())
                        .collect(),
                )
            }
        }
    }

    /// Pick diverging colors by raw ramp index.
    ///
    /// Indices 0..=18 address the negative ramp, 19..=37 the positive ramp.
    /// Returns `None` for an unknown pair or an index past the positive ramp.
    pub fn resolve_indices(&self, pair: &str, indices: &[usize]) -> Option<Vec<String>> {
        let (negative, positive) = self.pair_ramps(&lookup_key(pair))?;
        indices
            .iter()
            .map(|&index| {
                if index < RAMP_SHADES {
                    negative.get(index).cloned()
                } else {
                    positive.get(index - RAMP_SHADES).cloned()
                }
            })
            .collect()
    }

    fn pair_ramps(&self, key: &str) -> Option<(&[String], &[String])> {
        let (negative, positive) = self.pairs.get(key)?;
        Some((self.ramps.get(negative)?, self.ramps.get(positive)?))
    }
}

fn lookup_key(scheme: &str) -> String {
    scheme.trim().to_ascii_lowercase()
}

/// Positions `(2i + 1) / 2n`, i.e. the middle of `n` equal bins.
fn bin_centers(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| (2 * i + 1) as f64 / (2 * count) as f64)
        .collect()
}

/// Evenly spread ramp index for sample `step` of `count` over `[min, max]`.
fn sample_index(step: usize, count: usize, min: usize, max: usize) -> usize {
    let span = max.saturating_sub(min) as f64;
    let denominator = count.saturating_sub(1).max(1) as f64;
    let index = (span * step as f64 / denominator).round() as usize + min;
    index.min(RAMP_SHADES - 1)
}

fn sample_diverging(negative: &[String], positive: &[String], params: DivergingSampling) -> Vec<String> {
    let (min, max) = (params.min_index, params.max_index.max(params.min_index));
    let mut colors = Vec::with_capacity(params.total());

    for i in 0..params.num_negative {
        let step = params.num_negative - 1 - i;
        if let Some(c) = negative.get(sample_index(step, params.num_negative, min, max)) {
            colors.push(c.clone());
        }
    }
    for i in 0..params.num_positive {
        if let Some(c) = positive.get(sample_index(i, params.num_positive, min, max)) {
            colors.push(c.clone());
        }
    }
    colors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_ramp(prefix: &str) -> Vec<String> {
        (0..RAMP_SHADES).map(|i| format!("{prefix}{i}")).collect()
    }

    fn synthetic_registry() -> PaletteRegistry {
        PaletteRegistry::empty()
            .with_ramp("neg", synthetic_ramp("n"))
            .unwrap()
            .with_ramp("pos", synthetic_ramp("p"))
            .unwrap()
            .with_pair("neg-pos", "neg", "pos")
            .unwrap()
    }

    #[test]
    fn test_sequential_ramp_takes_fixed_indices() {
        let registry = synthetic_registry();
        let colors = registry.resolve("neg", Sampling::Sequential).unwrap();
        assert_eq!(colors, vec!["n1", "n4", "n7", "n10", "n13"]);
    }

    #[test]
    fn test_builtin_sequential_ramp() {
        let registry = PaletteRegistry::builtin();
        let colors = registry.resolve("canard", Sampling::Sequential).unwrap();
        assert_eq!(colors, vec!["#CBE9E6", "#79C8C2", "#00A79F", "#00847D", "#005A55"]);
    }

    #[test]
    fn test_diverging_three_and_three() {
        let registry = synthetic_registry();
        let sampling = Sampling::Diverging(DivergingSampling::default().with_counts(3, 3));
        let colors = registry.resolve("neg-pos", sampling).unwrap();
        assert_eq!(colors.len(), 6);
        assert_eq!(colors, vec!["n13", "n7", "n1", "p1", "p7", "p13"]);
        assert!(colors[..3].iter().all(|c| c.starts_with('n')));
        assert!(colors[3..].iter().all(|c| c.starts_with('p')));
    }

    #[test]
    fn test_diverging_asymmetric_counts() {
        let registry = synthetic_registry();
        let sampling = Sampling::Diverging(DivergingSampling::default().with_counts(2, 4));
        let colors = registry.resolve("neg-pos", sampling).unwrap();
        assert_eq!(colors, vec!["n13", "n1", "p1", "p5", "p9", "p13"]);
    }

    #[test]
    fn test_diverging_single_color_per_side_uses_lightest() {
        let registry = synthetic_registry();
        let sampling = Sampling::Diverging(DivergingSampling::symmetric(2));
        let colors = registry.resolve("neg-pos", sampling).unwrap();
        assert_eq!(colors, vec!["n1", "p1"]);
    }

    #[test]
    fn test_diverging_window_is_clamped_to_ramp() {
        let registry = synthetic_registry();
        let sampling = Sampling::Diverging(DivergingSampling::symmetric(4).with_window(0, 40));
        let colors = registry.resolve("neg-pos", sampling).unwrap();
        assert_eq!(colors, vec!["n18", "n0", "p0", "p18"]);
    }

    #[test]
    fn test_explicit_indices_span_both_ramps() {
        let registry = synthetic_registry();
        let colors = registry.resolve_indices("neg-pos", &[9, 5, 1, 20, 24, 28, 32]).unwrap();
        assert_eq!(colors, vec!["n9", "n5", "n1", "p1", "p5", "p9", "p13"]);
    }

    #[test]
    fn test_explicit_indices_out_of_range() {
        let registry = synthetic_registry();
        assert!(registry.resolve_indices("neg-pos", &[1, 38]).is_none());
        assert!(registry.resolve_indices("missing", &[1]).is_none());
    }

    #[test]
    fn test_unknown_scheme_is_none() {
        let registry = PaletteRegistry::builtin();
        assert!(registry.resolve("no-such-scheme", Sampling::Sequential).is_none());
        assert_eq!(registry.kind_of("no-such-scheme"), None);
    }

    #[test]
    fn test_library_names_are_case_insensitive() {
        let registry = PaletteRegistry::builtin();
        let colors = registry.resolve("OrRd", Sampling::Sequential).unwrap();
        assert_eq!(colors.len(), 9);
        assert_eq!(colors[0], "#fff7ec");
        assert_eq!(registry.kind_of("RdBu"), Some(SchemeKind::Library));
    }

    #[test]
    fn test_interpolator_sequential_and_quantize() {
        let registry = PaletteRegistry::builtin();
        assert_eq!(registry.resolve("viridis", Sampling::Sequential).unwrap().len(), 8);
        let five = registry.resolve("viridis", Sampling::Quantize { count: 5 }).unwrap();
        assert_eq!(five.len(), 5);
        assert_ne!(five[0], five[4]);
    }

    #[test]
    fn test_quantize_resamples_discrete_scheme() {
        let registry = PaletteRegistry::builtin();
        let colors = registry.resolve("blues", Sampling::Quantize { count: 5 }).unwrap();
        assert_eq!(colors.len(), 5);
        assert_eq!(colors[0], "#f7fbff");
        assert_eq!(colors[4], "#08306b");
    }

    #[test]
    fn test_with_ramp_rejects_wrong_length() {
        let result = PaletteRegistry::empty().with_ramp("short", vec!["#fff".to_string()]);
        assert!(matches!(result, Err(RenderError::InvalidRamp { len: 1, .. })));
    }

    #[test]
    fn test_with_pair_requires_ramps() {
        let result = PaletteRegistry::empty().with_pair("a-b", "a", "b");
        assert!(matches!(result, Err(RenderError::UnknownRamp { .. })));
    }

    #[test]
    fn test_darkest_shade() {
        let registry = PaletteRegistry::builtin();
        assert_eq!(registry.darkest_shade("ambre"), Some("#1A0F01"));
        assert_eq!(registry.darkest_shade("blues"), None);
    }
}
