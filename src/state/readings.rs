//! Last weight reading per scale.
//!
//! Written by the table weight endpoint, read by `/simular-peso/ultimo`.
//! Concurrent writes for one scale resolve as last-writer-wins; nothing
//! orders requests against each other.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::SystemTime;

/// One simulated reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    /// Weight reported to the terminal (`PESO{n}`).
    pub weight: String,
    /// Weight reported as read by the scale (`PESOBALANCA{n}`).
    pub scale_weight: String,
    pub recorded_at: SystemTime,
}

impl Reading {
    pub fn new(weight: impl Into<String>, scale_weight: impl Into<String>) -> Self {
        Self {
            weight: weight.into(),
            scale_weight: scale_weight.into(),
            recorded_at: SystemTime::now(),
        }
    }
}

/// Shared store of readings keyed by scale name.
#[derive(Debug, Clone, Default)]
pub struct ScaleReadings {
    inner: Arc<DashMap<String, Reading>>,
}

impl ScaleReadings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `reading` for `scale`, replacing any earlier one.
    pub fn record(&self, scale: &str, reading: Reading) {
        tracing::debug!(scale, weight = %reading.weight, "Recording scale reading");
        self.inner.insert(scale.to_string(), reading);
    }

    pub fn get(&self, scale: &str) -> Option<Reading> {
        self.inner.get(scale).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_get() {
        let readings = ScaleReadings::new();
        assert!(readings.get("balanca1").is_none());

        readings.record("balanca1", Reading::new("1,500", "1,520"));
        let reading = readings.get("balanca1").unwrap();
        assert_eq!(reading.weight, "1,500");
        assert_eq!(reading.scale_weight, "1,520");
        assert!(readings.get("balanca2").is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let readings = ScaleReadings::new();
        readings.record("balanca2", Reading::new("1,000", "1,000"));
        readings.record("balanca2", Reading::new("2,000", "2,000"));
        assert_eq!(readings.get("balanca2").unwrap().weight, "2,000");
        assert_eq!(readings.len(), 1);
    }

    #[test]
    fn test_clones_share_storage() {
        let readings = ScaleReadings::new();
        let handle = readings.clone();
        handle.record("balanca1", Reading::new("3,000", "3,000"));
        assert_eq!(readings.get("balanca1").unwrap().weight, "3,000");
    }

    #[test]
    fn test_concurrent_writers() {
        let readings = ScaleReadings::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let readings = readings.clone();
                std::thread::spawn(move || {
                    readings.record("balanca1", Reading::new(format!("{i},000"), "0,500"));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(readings.len(), 1);
        assert!(readings.get("balanca1").unwrap().weight.ends_with(",000"));
    }
}
