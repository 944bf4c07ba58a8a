use tracing::debug;

use crate::config::{DivergingSpec, RenderConfig, RenderRequest, ScaleFamily, ScaleSpec, TitleTemplate};
use crate::domain::{DomainFamily, PivotDomain};
use crate::error::RenderError;
use crate::ir::{OutlineHint, ResolvedRender};
use crate::join::{normalize_key, JoinRules};
use crate::palette::{PaletteRegistry, SchemeKind};
use crate::scale::{PercentMode, ScaleKind, TickFormat};
use crate::schemes::RAMP_SHADES;

/// Resolve a request against the configuration.
///
/// Raises the configuration errors: no scale for the metric, no title
/// template, or a scale that cannot be rendered as configured.
pub fn resolve_render(
    config: &RenderConfig,
    request: &RenderRequest,
    registry: &PaletteRegistry,
) -> Result<ResolvedRender, RenderError> {
    let metric = request.metric_key();
    let spec = scale_spec(config, metric)?;

    let indicator = request.indicator.as_deref().unwrap_or("");
    let template = title_template(config, metric, indicator)?;
    let title = interpolate_title(
        template,
        request.indicator_label.as_deref().unwrap_or("-"),
        metric,
        &spec.label,
    );

    // 1. Scheme selection; a diverging pair forces the diverging path
    let selected = request.selected_scheme();
    let selected_kind = selected.and_then(|s| registry.kind_of(s));
    let forced = selected_kind == Some(SchemeKind::DivergingPair);
    let scheme = selected.unwrap_or(&spec.scheme).to_string();

    let forced_spec = DivergingSpec::default();
    let diverging: Option<&DivergingSpec> = match &spec.family {
        ScaleFamily::Diverging(d) => Some(d),
        _ if forced => Some(&forced_spec),
        _ => None,
    };

    // 2. Domain inference rule and classification
    let explicit_domain = spec.domain.clone().or_else(|| {
        let extent_family = matches!(spec.family, ScaleFamily::Sequential | ScaleFamily::Quantize);
        (diverging.is_none() && extent_family && spec.percent == Some(PercentMode::Proportion))
            .then(|| vec![0.0, 1.0])
    });

    let (family, kind) = match diverging {
        Some(d) => (
            DomainFamily::Diverging(PivotDomain {
                pivot: d.pivot,
                bins: d.bins,
                asymmetric: d.asymmetric,
            }),
            ScaleKind::Threshold,
        ),
        None => match spec.family {
            ScaleFamily::Sequential => (DomainFamily::Sequential, ScaleKind::Linear),
            ScaleFamily::Threshold => (DomainFamily::Threshold, ScaleKind::Threshold),
            ScaleFamily::Quantize if explicit_domain.is_some() => (DomainFamily::Quantize, ScaleKind::Quantize),
            _ => (DomainFamily::Quantize, ScaleKind::Threshold),
        },
    };

    validate(metric, kind, diverging, explicit_domain.as_deref())?;

    // 3. Outline color source
    let outline = if diverging.is_some() {
        OutlineHint::Diverging
    } else if let (Some(name), Some(SchemeKind::Ramp)) = (selected, selected_kind) {
        OutlineHint::Ramp(name.to_string())
    } else {
        OutlineHint::Palette
    };

    // 4. Join rules
    let mut join_rules = JoinRules::new(config.data_keys.row_key.clone(), config.value_source(metric))
        .with_normalizer(config.normalizer.clone());
    if let Some(symbols) = &config.symbols {
        join_rules = join_rules.with_size(symbols.size.clone());
    }
    join_rules.expansions = config
        .data_keys
        .expansions
        .iter()
        .map(|(k, targets)| (normalize_key(k), targets.clone()))
        .collect();

    let row_filter = match (&config.data_keys.indicator_column, request.indicator.as_deref()) {
        (Some(column), Some(indicator)) if !indicator.is_empty() => Some((column.clone(), indicator.to_string())),
        _ => None,
    };

    debug!(metric, scheme = %scheme, ?family, ?kind, forced, "resolved render request");

    Ok(ResolvedRender {
        metric: metric.to_string(),
        title,
        scheme,
        family,
        kind,
        explicit_domain,
        color_indices: diverging.and_then(|d| d.color_indices.clone()),
        index_window: diverging.map_or((1, 13), |d| (d.min_index, d.max_index)),
        outline,
        label: spec.label.clone(),
        percent: spec.percent,
        clamp: spec.clamp,
        legend: spec.legend,
        tick_format: tick_format(spec),
        join_rules,
        row_filter,
    })
}

/// The scale configured for a metric; no fallback to another metric.
pub fn scale_spec<'c>(config: &'c RenderConfig, metric: &str) -> Result<&'c ScaleSpec, RenderError> {
    config.scales.get(metric).ok_or_else(|| RenderError::MissingScale {
        metric: metric.to_string(),
    })
}

/// Title template: the metric's entry, then the `default` entry; inside a
/// per-indicator map, the indicator's template, then its `default`.
pub fn title_template<'c>(config: &'c RenderConfig, metric: &str, indicator: &str) -> Result<&'c str, RenderError> {
    let pick = |entry: &'c TitleTemplate| -> Option<&'c str> {
        match entry {
            TitleTemplate::Text(text) => Some(text.as_str()),
            TitleTemplate::ByIndicator(map) => map
                .get(indicator)
                .filter(|_| !indicator.is_empty())
                .or_else(|| map.get("default"))
                .map(String::as_str),
        }
    };

    [metric, "default"]
        .iter()
        .filter_map(|key| config.title_templates.get(*key))
        .find_map(pick)
        .ok_or_else(|| RenderError::MissingTitle {
            metric: metric.to_string(),
            indicator: indicator.to_string(),
        })
}

/// Fill `{facility}` with the indicator label and `{metric}` with the metric label (or key).
pub fn interpolate_title(template: &str, indicator_label: &str, metric: &str, metric_label: &str) -> String {
    let metric_text = if metric_label.is_empty() { metric } else { metric_label };
    template
        .replacen("{facility}", indicator_label, 1)
        .replacen("{metric}", metric_text, 1)
}

pub fn tick_format(spec: &ScaleSpec) -> TickFormat {
    match (spec.percent, spec.tick_decimals) {
        (Some(PercentMode::Proportion), decimals) => TickFormat::Percent {
            decimals: decimals.unwrap_or(0),
        },
        (Some(PercentMode::Points), decimals) => TickFormat::PercentPoints {
            decimals: decimals.unwrap_or(1),
        },
        (None, Some(decimals)) => TickFormat::Fixed(decimals),
        (None, None) => TickFormat::Auto,
    }
}

fn validate(
    metric: &str,
    kind: ScaleKind,
    diverging: Option<&DivergingSpec>,
    explicit: Option<&[f64]>,
) -> Result<(), RenderError> {
    let invalid = |reason: &str| RenderError::InvalidScale {
        metric: metric.to_string(),
        reason: reason.to_string(),
    };

    if let Some(d) = diverging {
        if d.bins < 2 {
            return Err(invalid("a diverging scale needs at least two bins"));
        }
        if d.min_index > d.max_index || d.max_index >= RAMP_SHADES {
            return Err(invalid("diverging index window must satisfy min_index <= max_index <= 18"));
        }
    }

    let Some(domain) = explicit else {
        return Ok(());
    };
    if domain.iter().any(|v| !v.is_finite()) {
        return Err(invalid("domain values must be finite"));
    }
    match kind {
        ScaleKind::Linear | ScaleKind::Quantize => {
            if domain.len() < 2 || domain[0] > domain[domain.len() - 1] {
                return Err(invalid("domain must be an extent [min, max]"));
            }
        }
        ScaleKind::Threshold => {
            if domain.windows(2).any(|w| w[0] > w[1]) {
                return Err(invalid("thresholds must be in ascending order"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SymbolConfig;
    use crate::join::ValueSource;

    fn config() -> RenderConfig {
        RenderConfig::new()
            .with_scale("mediane", ScaleSpec::new(ScaleFamily::Quantize, "oranges").with_label("Durée médiane (min)"))
            .with_scale(
                "variation",
                ScaleSpec::new(ScaleFamily::Diverging(DivergingSpec::default()), "rdbu")
                    .with_percent(PercentMode::Points),
            )
            .with_scale(
                "part",
                ScaleSpec::new(ScaleFamily::Threshold, "purples")
                    .with_domain(vec![0.2, 0.25, 0.3, 0.4])
                    .with_percent(PercentMode::Proportion),
            )
            .with_title("default", "Carte de {metric}")
    }

    #[test]
    fn test_missing_scale_is_configuration_error() {
        let err = resolve_render(&config(), &RenderRequest::new("absent"), &PaletteRegistry::builtin()).unwrap_err();
        assert_eq!(err, RenderError::MissingScale { metric: "absent".into() });
    }

    #[test]
    fn test_missing_title_is_configuration_error() {
        let mut config = config();
        config.title_templates.clear();
        let err = resolve_render(&config, &RenderRequest::new("mediane"), &PaletteRegistry::builtin()).unwrap_err();
        assert!(matches!(err, RenderError::MissingTitle { .. }));
    }

    #[test]
    fn test_title_lookup_order() {
        let mut config = config();
        config.title_templates.insert(
            "mediane".into(),
            TitleTemplate::ByIndicator(
                [("default".to_string(), "Durée vers {facility}".to_string()), ("police".to_string(), "Police".to_string())]
                    .into_iter()
                    .collect(),
            ),
        );
        assert_eq!(title_template(&config, "mediane", "police").unwrap(), "Police");
        assert_eq!(title_template(&config, "mediane", "cinema").unwrap(), "Durée vers {facility}");
        assert_eq!(title_template(&config, "part", "x").unwrap(), "Carte de {metric}");
    }

    #[test]
    fn test_interpolate_title() {
        assert_eq!(interpolate_title("Accès à \"{facility}\"", "Cinéma", "mediane", ""), "Accès à \"Cinéma\"");
        assert_eq!(interpolate_title("Carte de {metric}", "-", "gini", "Indice de Gini"), "Carte de Indice de Gini");
        assert_eq!(interpolate_title("Carte de {metric}", "-", "gini", ""), "Carte de gini");
    }

    #[test]
    fn test_quantize_without_domain_becomes_threshold() {
        let resolved = resolve_render(&config(), &RenderRequest::new("mediane"), &PaletteRegistry::builtin()).unwrap();
        assert_eq!(resolved.family, DomainFamily::Quantize);
        assert_eq!(resolved.kind, ScaleKind::Threshold);
        assert_eq!(resolved.explicit_domain, None);
        assert_eq!(resolved.outline, OutlineHint::Palette);
        assert_eq!(resolved.title, "Carte de Durée médiane (min)");
    }

    #[test]
    fn test_selected_diverging_pair_forces_diverging() {
        let request = RenderRequest::new("mediane").with_scheme("canard-fuschia");
        let resolved = resolve_render(&config(), &request, &PaletteRegistry::builtin()).unwrap();
        assert_eq!(resolved.scheme, "canard-fuschia");
        assert!(matches!(resolved.family, DomainFamily::Diverging(p) if p.bins == 6 && p.pivot == 0.0));
        assert_eq!(resolved.kind, ScaleKind::Threshold);
        assert_eq!(resolved.outline, OutlineHint::Diverging);
    }

    #[test]
    fn test_selected_ramp_drives_outline() {
        let request = RenderRequest::new("mediane").with_scheme("ambre");
        let resolved = resolve_render(&config(), &request, &PaletteRegistry::builtin()).unwrap();
        assert_eq!(resolved.scheme, "ambre");
        assert_eq!(resolved.outline, OutlineHint::Ramp("ambre".into()));
    }

    #[test]
    fn test_auto_keeps_metric_scheme() {
        let request = RenderRequest::new("mediane").with_scheme("auto");
        let resolved = resolve_render(&config(), &request, &PaletteRegistry::builtin()).unwrap();
        assert_eq!(resolved.scheme, "oranges");
    }

    #[test]
    fn test_tick_formats_follow_percent_mode() {
        let cfg = config();
        assert_eq!(tick_format(&cfg.scales["part"]), TickFormat::Percent { decimals: 0 });
        assert_eq!(tick_format(&cfg.scales["variation"]), TickFormat::PercentPoints { decimals: 1 });
        assert_eq!(tick_format(&cfg.scales["mediane"]), TickFormat::Auto);
    }

    #[test]
    fn test_proportion_quantize_defaults_to_unit_extent() {
        let config = config().with_scale(
            "taux",
            ScaleSpec::new(ScaleFamily::Quantize, "blues").with_percent(PercentMode::Proportion),
        );
        let resolved = resolve_render(&config, &RenderRequest::new("taux"), &PaletteRegistry::builtin()).unwrap();
        assert_eq!(resolved.explicit_domain, Some(vec![0.0, 1.0]));
        assert_eq!(resolved.kind, ScaleKind::Quantize);
    }

    #[test]
    fn test_invalid_domains_are_rejected() {
        let config = config()
            .with_scale("bad", ScaleSpec::new(ScaleFamily::Threshold, "blues").with_domain(vec![3.0, 1.0]))
            .with_scale("flat", ScaleSpec::new(ScaleFamily::Sequential, "blues").with_domain(vec![1.0]));
        let registry = PaletteRegistry::builtin();
        for metric in ["bad", "flat"] {
            let err = resolve_render(&config, &RenderRequest::new(metric), &registry).unwrap_err();
            assert!(matches!(err, RenderError::InvalidScale { .. }), "{metric}");
        }
    }

    #[test]
    fn test_join_rules_from_config() {
        let mut config = config();
        config.symbols = Some(SymbolConfig::new(ValueSource::Column("population".into())));
        config.data_keys.expansions.insert("97".into(), vec!["971".into()]);
        config.data_keys.indicator_column = Some("equipement".into());
        let request = RenderRequest::new("mediane").with_indicator("police", "Police");
        let resolved = resolve_render(&config, &request, &PaletteRegistry::builtin()).unwrap();

        assert_eq!(resolved.join_rules.value, ValueSource::Column("mediane".into()));
        assert_eq!(resolved.join_rules.size, Some(ValueSource::Column("population".into())));
        assert!(resolved.join_rules.expansions.contains_key("97"));
        assert_eq!(resolved.row_filter, Some(("equipement".into(), "police".into())));
    }
}
