use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SERVICE_NAME: &str = "slipscan-ocr";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
    pub ocr_engine_loaded: bool,
}

impl HealthStatus {
    /// The service is reported healthy even when the engine has not loaded yet;
    /// it is retried on the next request.
    pub fn now(ocr_engine_loaded: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            service: SERVICE_NAME.to_string(),
            timestamp: Utc::now(),
            ocr_engine_loaded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_engine_still_healthy() {
        let h = HealthStatus::now(false);
        assert_eq!(h.status, "healthy");
        assert_eq!(h.service, "slipscan-ocr");
        assert!(!h.ocr_engine_loaded);
    }

    #[test]
    fn timestamp_serializes_as_rfc3339() {
        let json = serde_json::to_value(HealthStatus::now(true)).unwrap();
        let ts = json["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
    }
}
