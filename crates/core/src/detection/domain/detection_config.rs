use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{
    COARSE_MAX_FACE_SIZE, COARSE_MIN_FACE_SIZE, COARSE_SAMPLE_STRIDE, COARSE_SCAN_STEP_SIZE,
    COARSE_SKIN_THRESHOLD, DEFAULT_EXPAND_FACTOR, DEFAULT_MAX_FACE_SIZE, DEFAULT_MIN_FACE_SIZE,
    DEFAULT_SAMPLE_STRIDE, DEFAULT_SCAN_STEP_SIZE, DEFAULT_SKIN_THRESHOLD,
};

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be at least {min}, got {value}")]
    TooSmall {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("skin_threshold must be between 0.0 and 1.0, got {0}")]
    ThresholdRange(f64),
    #[error("max_face_size ({max}) must not be below min_face_size ({min})")]
    SizeOrder { min: u32, max: u32 },
}

/// Tuning knobs for one detection call.
///
/// Deserializing a partial document fills the missing fields from
/// [`DetectionConfig::default`], so callers only spell out what they change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub min_face_size: u32,
    pub max_face_size: u32,
    pub scan_step_size: u32,
    pub skin_threshold: f64,
    pub expand_factor: f64,
    pub sample_stride: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_face_size: DEFAULT_MIN_FACE_SIZE,
            max_face_size: DEFAULT_MAX_FACE_SIZE,
            scan_step_size: DEFAULT_SCAN_STEP_SIZE,
            skin_threshold: DEFAULT_SKIN_THRESHOLD,
            expand_factor: DEFAULT_EXPAND_FACTOR,
            sample_stride: DEFAULT_SAMPLE_STRIDE,
        }
    }
}

impl DetectionConfig {
    /// Cheaper preset for large frames: sparser grid and sampling.
    pub fn coarse() -> Self {
        Self {
            min_face_size: COARSE_MIN_FACE_SIZE,
            max_face_size: COARSE_MAX_FACE_SIZE,
            scan_step_size: COARSE_SCAN_STEP_SIZE,
            skin_threshold: COARSE_SKIN_THRESHOLD,
            expand_factor: DEFAULT_EXPAND_FACTOR,
            sample_stride: COARSE_SAMPLE_STRIDE,
        }
    }

    /// Range checks for caller-facing entry points.
    ///
    /// The detector itself accepts any value; a zero stride is the only
    /// input it cannot make progress on and is clamped to 1 there.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("min_face_size", self.min_face_size),
            ("scan_step_size", self.scan_step_size),
            ("sample_stride", self.sample_stride),
        ] {
            if value < 1 {
                return Err(ConfigError::TooSmall {
                    field,
                    min: 1.0,
                    value: value as f64,
                });
            }
        }
        if self.max_face_size < self.min_face_size {
            return Err(ConfigError::SizeOrder {
                min: self.min_face_size,
                max: self.max_face_size,
            });
        }
        if !(0.0..=1.0).contains(&self.skin_threshold) {
            return Err(ConfigError::ThresholdRange(self.skin_threshold));
        }
        if self.expand_factor.is_nan() || self.expand_factor < 1.0 {
            return Err(ConfigError::TooSmall {
                field: "expand_factor",
                min: 1.0,
                value: self.expand_factor,
            });
        }
        Ok(())
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_default_table() {
        let c = DetectionConfig::default();
        assert_eq!(c.min_face_size, 40);
        assert_eq!(c.max_face_size, 250);
        assert_eq!(c.scan_step_size, 15);
        assert_relative_eq!(c.skin_threshold, 0.25);
        assert_relative_eq!(c.expand_factor, 1.5);
        assert_eq!(c.sample_stride, 3);
    }

    #[test]
    fn test_coarse_preset() {
        let c = DetectionConfig::coarse();
        assert_eq!(c.min_face_size, 60);
        assert_eq!(c.max_face_size, 300);
        assert_eq!(c.scan_step_size, 30);
        assert_relative_eq!(c.skin_threshold, 0.3);
        assert_eq!(c.sample_stride, 5);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_partial_json_merges_over_defaults() {
        let c = DetectionConfig::from_json(r#"{"min_face_size": 60, "expand_factor": 2.0}"#)
            .unwrap();
        assert_eq!(c.min_face_size, 60);
        assert_relative_eq!(c.expand_factor, 2.0);
        assert_eq!(c.max_face_size, 250);
        assert_eq!(c.scan_step_size, 15);
        assert_relative_eq!(c.skin_threshold, 0.25);
    }

    #[test]
    fn test_empty_json_is_default() {
        let c = DetectionConfig::from_json("{}").unwrap();
        assert_eq!(c, DetectionConfig::default());
    }

    #[test]
    fn test_json_roundtrip() {
        let c = DetectionConfig {
            skin_threshold: 0.4,
            ..DetectionConfig::default()
        };
        let back = DetectionConfig::from_json(&c.to_json().unwrap()).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(DetectionConfig::from_json(r#"{"min_face_size": "big"}"#).is_err());
    }

    #[test]
    fn test_default_is_valid() {
        assert!(DetectionConfig::default().validate().is_ok());
    }

    #[rstest]
    #[case::zero_step(DetectionConfig { scan_step_size: 0, ..DetectionConfig::default() })]
    #[case::zero_min(DetectionConfig { min_face_size: 0, ..DetectionConfig::default() })]
    #[case::zero_stride(DetectionConfig { sample_stride: 0, ..DetectionConfig::default() })]
    #[case::max_below_min(DetectionConfig { max_face_size: 10, ..DetectionConfig::default() })]
    #[case::threshold_high(DetectionConfig { skin_threshold: 1.5, ..DetectionConfig::default() })]
    #[case::threshold_negative(DetectionConfig { skin_threshold: -0.1, ..DetectionConfig::default() })]
    #[case::shrinking_expand(DetectionConfig { expand_factor: 0.5, ..DetectionConfig::default() })]
    #[case::nan_expand(DetectionConfig { expand_factor: f64::NAN, ..DetectionConfig::default() })]
    fn test_validate_rejects(#[case] config: DetectionConfig) {
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_error_message_names_field() {
        let c = DetectionConfig {
            scan_step_size: 0,
            ..DetectionConfig::default()
        };
        let msg = c.validate().unwrap_err().to_string();
        assert!(msg.contains("scan_step_size"));
    }
}
