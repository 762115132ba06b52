use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{RiskCategory, RiskLevel};

/// Risk register entry. Score and level are derived from probability and
/// severity on every read, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Risk {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: RiskCategory,
    pub owner_id: Uuid,
    /// Probability rating, 1..=5.
    pub probability: i32,
    /// Severity rating, 1..=5.
    pub severity: i32,
    pub mitigation: Option<String>,
    /// Set when this entry was escalated from an incident.
    pub source_incident_id: Option<Uuid>,
    pub identified_at: NaiveDateTime,
}

impl Risk {
    pub fn score(&self) -> i32 {
        self.probability * self.severity
    }

    pub fn level(&self) -> RiskLevel {
        RiskLevel::from_score(self.score())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn risk(probability: i32, severity: i32) -> Risk {
        Risk {
            id: Uuid::new_v4(),
            title: "Falls on geriatric ward".into(),
            description: None,
            category: RiskCategory::Clinical,
            owner_id: Uuid::new_v4(),
            probability,
            severity,
            mitigation: None,
            source_incident_id: None,
            identified_at: NaiveDateTime::default(),
        }
    }

    #[test]
    fn score_is_product() {
        assert_eq!(risk(3, 4).score(), 12);
        assert_eq!(risk(1, 1).score(), 1);
        assert_eq!(risk(5, 5).score(), 25);
    }

    #[test]
    fn band_matches_table_for_all_ratings() {
        for probability in 1..=5 {
            for severity in 1..=5 {
                let r = risk(probability, severity);
                let score = probability * severity;
                let expected = if score > 16 {
                    RiskLevel::Critical
                } else if score > 9 {
                    RiskLevel::High
                } else if score > 4 {
                    RiskLevel::Medium
                } else {
                    RiskLevel::Low
                };
                assert_eq!(r.level(), expected, "p={probability} s={severity}");
            }
        }
    }
}
