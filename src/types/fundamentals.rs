use serde::{Deserialize, Serialize};

/// Non-price market attributes for an instrument.
///
/// Every field is optional; an absent value means "unknown" and is passed
/// through to consumers as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsSnapshot {
    pub market_cap: Option<f64>,
    pub volume_24h: Option<f64>,
    pub percent_change_1h: Option<f64>,
    pub percent_change_24h: Option<f64>,
    pub percent_change_7d: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
}

impl FundamentalsSnapshot {
    /// Snapshot with every field absent.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// True when no field carries a value.
    pub fn is_unknown(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_snapshot() {
        let snapshot = FundamentalsSnapshot::unknown();
        assert!(snapshot.is_unknown());

        let partial = FundamentalsSnapshot {
            volume_24h: Some(1_000_000.0),
            ..Default::default()
        };
        assert!(!partial.is_unknown());
    }

    #[test]
    fn test_absent_fields_serialize_as_null() {
        let json = serde_json::to_value(FundamentalsSnapshot::unknown()).unwrap();
        assert!(json["market_cap"].is_null());
        assert!(json["total_supply"].is_null());
    }
}
