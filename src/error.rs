use thiserror::Error;

/// Errors raised by the rendering engine.
///
/// Every variant is a wiring problem on the caller's side. Data-quality issues
/// (join misses, unparseable values, empty domains) never surface here; they
/// degrade to "no data" styling instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("no color scale configured for metric `{metric}`")]
    MissingScale { metric: String },

    #[error("no title template configured for metric `{metric}` and indicator `{indicator}`")]
    MissingTitle { metric: String, indicator: String },

    #[error("invalid color scale for metric `{metric}`: {reason}")]
    InvalidScale { metric: String, reason: String },

    #[error("ramp `{name}` has {len} shades, expected {expected}")]
    InvalidRamp {
        name: String,
        len: usize,
        expected: usize,
    },

    #[error("diverging pair `{name}` references unknown ramp `{ramp}`")]
    UnknownRamp { name: String, ramp: String },
}

impl RenderError {
    /// True for errors caused by the scale/title configuration of a metric.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RenderError::MissingScale { .. }
                | RenderError::MissingTitle { .. }
                | RenderError::InvalidScale { .. }
        )
    }
}
