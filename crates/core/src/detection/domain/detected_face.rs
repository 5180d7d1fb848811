use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::bounding_box::BoundingBox;

/// One face-like region found in a single frame.
///
/// The detector fills in geometry and metadata only; `image_data` stays
/// `None` until a compositing step stores the crop's encoding or location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    pub id: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    pub bounding_box: BoundingBox,
    /// Simulated plausibility in `[0.7, 1.0]`; only meaningful for ordering
    /// and display.
    pub confidence: f64,
}

impl DetectedFace {
    pub fn new(at: DateTime<Utc>, id_fraction: f64, bounding_box: BoundingBox, confidence: f64) -> Self {
        Self {
            id: face_id(at.timestamp_millis(), id_fraction),
            timestamp: format_timestamp(at),
            image_data: None,
            bounding_box,
            confidence,
        }
    }

    pub fn with_image_data(mut self, image_data: impl Into<String>) -> Self {
        self.image_data = Some(image_data.into());
        self
    }
}

/// `face_<epoch-millis>_<fraction>`, e.g. `face_1700000000000_0.4213`.
pub fn face_id(epoch_millis: i64, fraction: f64) -> String {
    format!("face_{epoch_millis}_{fraction}")
}

/// Sortable UTC timestamp with millisecond precision: `2024-01-02T03:04:05.006Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
