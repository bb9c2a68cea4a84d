//! GDPR consent records.
//!
//! The log is append-only. A grant, a withdrawal and a re-grant are three rows;
//! the current state of a consent type is its newest row.

pub mod handlers;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentType {
    Essential,
    Analytics,
    Marketing,
    AiTraining,
}

impl ConsentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentType::Essential => "essential",
            ConsentType::Analytics => "analytics",
            ConsentType::Marketing => "marketing",
            ConsentType::AiTraining => "ai_training",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str_matches_serde_name() {
        for ct in [
            ConsentType::Essential,
            ConsentType::Analytics,
            ConsentType::Marketing,
            ConsentType::AiTraining,
        ] {
            let json = serde_json::to_string(&ct).unwrap();
            assert_eq!(json, format!("\"{}\"", ct.as_str()));
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(serde_json::from_str::<ConsentType>("\"profiling\"").is_err());
    }
}
