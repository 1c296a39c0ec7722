use serde::{Deserialize, Serialize};
use validator::Validate;

/// A known station or grid cell, keyed by its code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StationMetadata {
    #[validate(length(min = 1))]
    pub code: String,

    #[serde(default)]
    pub name: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    #[serde(default)]
    pub elevation: Option<f64>,
}

impl StationMetadata {
    pub fn new(
        code: String,
        name: String,
        latitude: f64,
        longitude: f64,
        elevation: Option<f64>,
    ) -> Self {
        Self {
            code,
            name,
            latitude,
            longitude,
            elevation,
        }
    }
}
