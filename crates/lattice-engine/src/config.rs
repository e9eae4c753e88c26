use serde::{Deserialize, Serialize};

/// Configuration for the engine's bounded operations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum keys a cascade's dynamic discovery scan will visit when
    /// looking for collections owned by the destroyed object.
    pub cascade_scan_limit: usize,
    /// Maximum multi-index buckets the ghost reconciler will visit per
    /// index while pruning a stale identifier.
    pub reconcile_scan_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cascade_scan_limit: 1024,
            reconcile_scan_limit: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_bounded() {
        let config = EngineConfig::default();
        assert_eq!(config.cascade_scan_limit, 1024);
        assert_eq!(config.reconcile_scan_limit, 1024);
    }

    #[test]
    fn serde_roundtrip() {
        let config = EngineConfig {
            cascade_scan_limit: 16,
            reconcile_scan_limit: 8,
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.cascade_scan_limit, 16);
        assert_eq!(parsed.reconcile_scan_limit, 8);
    }
}
