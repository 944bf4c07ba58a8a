// Domain inference for color scales
//
// An explicit domain is always passed through untouched. Otherwise the domain
// is derived from the joined values of the current render.

use tracing::debug;

/// Internal thresholds produced by the rounded-threshold inference (5 bins).
pub const INFERRED_THRESHOLDS: usize = 4;

/// Largest number of decimals a derived diverging threshold is rounded to.
const MAX_DIVERGING_DECIMALS: i32 = 10;

/// Parameters of a diverging (pivoted) domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PivotDomain {
    pub pivot: f64,
    /// Requested number of color bins; half of them on each side of the pivot.
    pub bins: usize,
    /// Space each side over its own extent instead of the largest absolute deviation.
    pub asymmetric: bool,
}

impl Default for PivotDomain {
    fn default() -> Self {
        PivotDomain {
            pivot: 0.0,
            bins: 6,
            asymmetric: false,
        }
    }
}

/// Which inference rule applies when no explicit domain is configured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DomainFamily {
    /// `[min, max]` of the values.
    Sequential,
    /// Thresholds around a pivot, which is always part of the domain.
    Diverging(PivotDomain),
    /// Four rounded thresholds.
    Threshold,
    /// Same inference as `Threshold`; an explicit domain is an extent to split evenly.
    Quantize,
}

/// Compute the domain of a color scale.
///
/// Returns an empty vector when nothing can be derived (no finite values);
/// callers render every feature as unknown in that case.
pub fn compute_domain(family: DomainFamily, explicit: Option<&[f64]>, values: &[f64]) -> Vec<f64> {
    if let Some(domain) = explicit {
        return domain.to_vec();
    }

    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        debug!("no finite values, domain left empty");
        return Vec::new();
    }

    let domain = match family {
        DomainFamily::Sequential => {
            let (min, max) = extent(&finite);
            vec![min, max]
        }
        DomainFamily::Diverging(params) if params.asymmetric => asymmetric_domain(params, &finite),
        DomainFamily::Diverging(params) => symmetric_domain(params, &finite),
        DomainFamily::Threshold | DomainFamily::Quantize => {
            let (min, max) = extent(&finite);
            rounded_thresholds(min, max)
        }
    };
    debug!(?family, ?domain, values = finite.len(), "inferred domain");
    domain
}

/// Negative and positive color counts implied by a diverging domain.
///
/// Thresholds at or below the pivot open a negative bin; the rest of the
/// `len + 1` bins are positive. An empty domain splits `bins` in halves.
pub fn diverging_counts(domain: &[f64], pivot: f64, bins: usize) -> (usize, usize) {
    if domain.is_empty() {
        let negative = bins / 2;
        return (negative, bins - negative);
    }
    let negative = domain.iter().filter(|t| **t <= pivot).count();
    (negative, domain.len() + 1 - negative)
}

fn extent(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| (min.min(*v), max.max(*v)))
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Offsets `i * extent / k` for `i = 1..k`, rounded to the precision of the step.
///
/// Offsets are strictly positive and strictly increasing.
fn pivot_offsets(extent: f64, k: usize) -> Vec<f64> {
    if !(extent > 0.0) || k < 2 {
        return Vec::new();
    }
    let step = extent / k as f64;
    let decimals = (1 - step.log10().floor() as i32).clamp(1, MAX_DIVERGING_DECIMALS);

    let mut offsets: Vec<f64> = Vec::with_capacity(k - 1);
    for i in 1..k {
        let offset = round_to(step * i as f64, decimals);
        if offset > 0.0 && offsets.last().map_or(true, |last| offset > *last) {
            offsets.push(offset);
        }
    }
    offsets
}

/// Assemble `pivot - neg[rev]..., pivot, pivot + pos...`.
fn splice(pivot: f64, negative: &[f64], positive: &[f64]) -> Vec<f64> {
    let mut domain = Vec::with_capacity(negative.len() + positive.len() + 1);
    domain.extend(negative.iter().rev().map(|offset| pivot - offset));
    domain.push(pivot);
    domain.extend(positive.iter().map(|offset| pivot + offset));
    domain
}

fn symmetric_domain(params: PivotDomain, values: &[f64]) -> Vec<f64> {
    let max_abs = values
        .iter()
        .map(|v| (v - params.pivot).abs())
        .fold(0.0, f64::max);
    // The negative side reuses the positive offsets so both sides are exact mirrors.
    let offsets = pivot_offsets(max_abs, params.bins / 2);
    splice(params.pivot, &offsets, &offsets)
}

fn asymmetric_domain(params: PivotDomain, values: &[f64]) -> Vec<f64> {
    let (min, max) = extent(values);
    let negative_bins = params.bins / 2;
    let positive_bins = params.bins - negative_bins;

    let mut negative = pivot_offsets(params.pivot - min, negative_bins);
    let mut positive = pivot_offsets(max - params.pivot, positive_bins);
    if negative.is_empty() && !positive.is_empty() {
        negative = pivot_offsets(max - params.pivot, negative_bins);
    }
    if positive.is_empty() && !negative.is_empty() {
        positive = pivot_offsets(params.pivot - min, positive_bins);
    }
    splice(params.pivot, &negative, &positive)
}

/// Four readable thresholds over `[min, max]`.
pub fn rounded_thresholds(min: f64, max: f64) -> Vec<f64> {
    let span = max - min;
    if span <= 1.0 {
        return vec![0.2, 0.4, 0.6, 0.8];
    }
    let decimals = if span < 10.0 { 1 } else { 0 };

    let all = ticks(min, max, 5);
    let inner: Vec<f64> = if all.len() > 2 {
        all[1..all.len() - 1].iter().map(|t| round_to(*t, decimals)).collect()
    } else {
        Vec::new()
    };
    if inner.len() == INFERRED_THRESHOLDS {
        return inner;
    }

    let step = span / 5.0;
    (1..=INFERRED_THRESHOLDS)
        .map(|i| round_to(min + step * i as f64, decimals))
        .collect()
}

fn js_round(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn tick_spec(start: f64, stop: f64, count: f64) -> (f64, f64, f64) {
    let step = (stop - start) / count.max(0.0);
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };

    let (mut i1, mut i2, inc);
    if power < 0.0 {
        let scale = 10f64.powf(-power) / factor;
        i1 = js_round(start * scale);
        i2 = js_round(stop * scale);
        if i1 / scale < start {
            i1 += 1.0;
        }
        if i2 / scale > stop {
            i2 -= 1.0;
        }
        inc = -scale;
    } else {
        let step = 10f64.powf(power) * factor;
        i1 = js_round(start / step);
        i2 = js_round(stop / step);
        if i1 * step < start {
            i1 += 1.0;
        }
        if i2 * step > stop {
            i2 -= 1.0;
        }
        inc = step;
    }

    if i2 < i1 && (0.5..2.0).contains(&count) {
        return tick_spec(start, stop, count * 2.0);
    }
    (i1, i2, inc)
}

/// Round tick values inside `[start, stop]`, about `count` of them.
///
/// Ticks are multiples of 1, 2 or 5 times a power of ten; negative powers are
/// computed by division to avoid accumulating floating-point error.
pub fn ticks(start: f64, stop: f64, count: usize) -> Vec<f64> {
    if count == 0 || !start.is_finite() || !stop.is_finite() {
        return Vec::new();
    }
    if start == stop {
        return vec![start];
    }
    let reverse = stop < start;
    let (lo, hi) = if reverse { (stop, start) } else { (start, stop) };

    let (i1, i2, inc) = tick_spec(lo, hi, count as f64);
    if !(i2 >= i1) {
        return Vec::new();
    }
    let n = (i2 - i1) as usize + 1;
    let mut out: Vec<f64> = (0..n)
        .map(|i| {
            let k = i1 + i as f64;
            if inc < 0.0 {
                k / -inc
            } else {
                k * inc
            }
        })
        .collect();
    if reverse {
        out.reverse();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diverging(bins: usize) -> DomainFamily {
        DomainFamily::Diverging(PivotDomain {
            bins,
            ..PivotDomain::default()
        })
    }

    #[test]
    fn test_explicit_domain_passes_through() {
        let explicit = [-0.2, -0.1, 0.0, 0.1, 0.2, 0.4];
        for family in [DomainFamily::Sequential, diverging(6), DomainFamily::Threshold, DomainFamily::Quantize] {
            assert_eq!(compute_domain(family, Some(&explicit), &[100.0]), explicit.to_vec());
        }
    }

    #[test]
    fn test_diverging_scenario() {
        let domain = compute_domain(diverging(6), None, &[-8.7, 1.7]);
        assert_eq!(domain, vec![-5.8, -2.9, 0.0, 2.9, 5.8]);
    }

    #[test]
    fn test_diverging_domain_is_symmetric_with_single_zero() {
        let samples: [&[f64]; 4] = [&[0.013, -0.002], &[120.0, -3.5, 44.0], &[-1.0], &[7.0, 7.0]];
        for values in samples {
            let domain = compute_domain(diverging(6), None, values);
            assert_eq!(domain.iter().filter(|t| **t == 0.0).count(), 1, "{values:?}");
            let n = domain.len();
            for i in 0..n {
                assert_eq!(domain[i], -domain[n - 1 - i], "{values:?}");
            }
        }
    }

    #[test]
    fn test_diverging_bins_control_threshold_count() {
        let domain = compute_domain(diverging(10), None, &[-50.0, 20.0]);
        assert_eq!(domain, vec![-40.0, -30.0, -20.0, -10.0, 0.0, 10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_diverging_small_values_keep_precision() {
        let domain = compute_domain(diverging(6), None, &[0.03, -0.01]);
        assert_eq!(domain, vec![-0.02, -0.01, 0.0, 0.01, 0.02]);
    }

    #[test]
    fn test_diverging_all_at_pivot() {
        assert_eq!(compute_domain(diverging(6), None, &[0.0, 0.0]), vec![0.0]);
    }

    #[test]
    fn test_diverging_nonzero_pivot() {
        let family = DomainFamily::Diverging(PivotDomain {
            pivot: 100.0,
            bins: 6,
            asymmetric: false,
        });
        let domain = compute_domain(family, None, &[70.0, 112.0]);
        assert_eq!(domain, vec![80.0, 90.0, 100.0, 110.0, 120.0]);
    }

    #[test]
    fn test_asymmetric_sides_use_own_extent() {
        let family = DomainFamily::Diverging(PivotDomain {
            asymmetric: true,
            ..PivotDomain::default()
        });
        let domain = compute_domain(family, None, &[-3.0, 30.0]);
        assert_eq!(domain, vec![-2.0, -1.0, 0.0, 10.0, 20.0]);
    }

    #[test]
    fn test_asymmetric_one_sided_data_mirrors() {
        let family = DomainFamily::Diverging(PivotDomain {
            asymmetric: true,
            ..PivotDomain::default()
        });
        let domain = compute_domain(family, None, &[5.0, 30.0]);
        assert_eq!(domain, vec![-20.0, -10.0, 0.0, 10.0, 20.0]);
    }

    #[test]
    fn test_threshold_small_span_uses_fixed_ticks() {
        let domain = compute_domain(DomainFamily::Threshold, None, &[0.0, 0.31, 0.84]);
        assert_eq!(domain, vec![0.2, 0.4, 0.6, 0.8]);
    }

    #[test]
    fn test_threshold_integer_ticks() {
        let domain = compute_domain(DomainFamily::Quantize, None, &[0.0, 55.0, 100.0]);
        assert_eq!(domain, vec![20.0, 40.0, 60.0, 80.0]);
    }

    #[test]
    fn test_threshold_fallback_is_evenly_spaced() {
        let domain = compute_domain(DomainFamily::Threshold, None, &[1.2, 8.9]);
        assert_eq!(domain, vec![2.7, 4.3, 5.8, 7.4]);
    }

    #[test]
    fn test_threshold_always_four() {
        let ranges = [(0.0, 3.3), (12.0, 17.0), (-40.0, 1000.0), (1.5, 2.6), (0.0, 1e6)];
        for (min, max) in ranges {
            assert_eq!(rounded_thresholds(min, max).len(), INFERRED_THRESHOLDS, "{min}..{max}");
        }
    }

    #[test]
    fn test_sequential_extent() {
        let domain = compute_domain(DomainFamily::Sequential, None, &[3.0, f64::NAN, -1.0, 9.0]);
        assert_eq!(domain, vec![-1.0, 9.0]);
    }

    #[test]
    fn test_no_values_gives_empty_domain() {
        assert!(compute_domain(diverging(6), None, &[]).is_empty());
        assert!(compute_domain(DomainFamily::Threshold, None, &[f64::NAN]).is_empty());
    }

    #[test]
    fn test_diverging_counts() {
        assert_eq!(diverging_counts(&[-0.2, -0.1, 0.0, 0.1, 0.2, 0.4], 0.0, 6), (3, 4));
        assert_eq!(diverging_counts(&[-5.8, -2.9, 0.0, 2.9, 5.8], 0.0, 6), (3, 3));
        assert_eq!(diverging_counts(&[], 0.0, 7), (3, 4));
    }

    #[test]
    fn test_ticks_matches_reference_values() {
        assert_eq!(ticks(0.0, 10.0, 5), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(ticks(0.0, 1.0, 5), vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
        assert_eq!(ticks(1.2, 8.9, 5), vec![2.0, 4.0, 6.0, 8.0]);
        assert_eq!(ticks(10.0, 0.0, 2), vec![10.0, 5.0, 0.0]);
        assert_eq!(ticks(3.0, 3.0, 5), vec![3.0]);
    }
}
