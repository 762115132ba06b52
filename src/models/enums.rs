use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(IncidentCategory {
    Fall => "fall",
    MedicationError => "medication_error",
    Infection => "infection",
    PressureUlcer => "pressure_ulcer",
    Device => "device",
    Other => "other",
});

str_enum!(IncidentGrade {
    NearMiss => "near_miss",
    Minor => "minor",
    Moderate => "moderate",
    Severe => "severe",
    Catastrophic => "catastrophic",
});

impl IncidentGrade {
    /// Ordinal rank used for escalation thresholds (near_miss=0 .. catastrophic=4).
    pub fn rank(&self) -> i32 {
        match self {
            Self::NearMiss => 0,
            Self::Minor => 1,
            Self::Moderate => 2,
            Self::Severe => 3,
            Self::Catastrophic => 4,
        }
    }
}

str_enum!(IncidentStatus {
    Draft => "draft",
    Submitted => "submitted",
    Approved => "approved",
    Rejected => "rejected",
});

str_enum!(ApprovalDecision {
    Approved => "approved",
    Rejected => "rejected",
});

str_enum!(ActionStatus {
    Open => "open",
    InProgress => "in_progress",
    Completed => "completed",
    Verified => "verified",
    Cancelled => "cancelled",
});

str_enum!(RiskCategory {
    Clinical => "clinical",
    Medication => "medication",
    Infection => "infection",
    Equipment => "equipment",
    Environment => "environment",
    Organisational => "organisational",
});

str_enum!(RiskLevel {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

impl RiskLevel {
    /// Band a probability×severity score into a register level.
    pub fn from_score(score: i32) -> Self {
        if score > 16 {
            Self::Critical
        } else if score > 9 {
            Self::High
        } else if score > 4 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

str_enum!(IndicatorFrequency {
    Monthly => "monthly",
    Quarterly => "quarterly",
});

str_enum!(StaffRole {
    Reporter => "reporter",
    Qps => "qps",
    QualityManager => "quality_manager",
    Admin => "admin",
});

impl StaffRole {
    /// Whether this role may decide the given approval gate level.
    /// Level 1 is QPS review, level 2 is quality management sign-off.
    pub fn can_decide_level(&self, level: i32) -> bool {
        match self {
            Self::Admin => true,
            Self::Qps => level == 1,
            Self::QualityManager => level == 2,
            Self::Reporter => false,
        }
    }

    /// Whether this role may verify completed corrective actions.
    pub fn can_verify_actions(&self) -> bool {
        !matches!(self, Self::Reporter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn incident_category_round_trip() {
        for (variant, s) in [
            (IncidentCategory::Fall, "fall"),
            (IncidentCategory::MedicationError, "medication_error"),
            (IncidentCategory::Infection, "infection"),
            (IncidentCategory::PressureUlcer, "pressure_ulcer"),
            (IncidentCategory::Device, "device"),
            (IncidentCategory::Other, "other"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(IncidentCategory::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn action_status_round_trip() {
        for (variant, s) in [
            (ActionStatus::Open, "open"),
            (ActionStatus::InProgress, "in_progress"),
            (ActionStatus::Completed, "completed"),
            (ActionStatus::Verified, "verified"),
            (ActionStatus::Cancelled, "cancelled"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(ActionStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn grade_rank_is_ordered() {
        let grades = [
            IncidentGrade::NearMiss,
            IncidentGrade::Minor,
            IncidentGrade::Moderate,
            IncidentGrade::Severe,
            IncidentGrade::Catastrophic,
        ];
        for pair in grades.windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
        }
    }

    #[test]
    fn risk_band_boundaries() {
        assert_eq!(RiskLevel::from_score(1), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(4), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(5), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(9), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(10), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(16), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(17), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(25), RiskLevel::Critical);
    }

    #[test]
    fn role_gate_permissions() {
        assert!(StaffRole::Qps.can_decide_level(1));
        assert!(!StaffRole::Qps.can_decide_level(2));
        assert!(StaffRole::QualityManager.can_decide_level(2));
        assert!(!StaffRole::QualityManager.can_decide_level(1));
        assert!(StaffRole::Admin.can_decide_level(1));
        assert!(StaffRole::Admin.can_decide_level(2));
        assert!(!StaffRole::Reporter.can_decide_level(1));
        assert!(!StaffRole::Reporter.can_verify_actions());
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(IncidentCategory::from_str("invalid").is_err());
        assert!(ActionStatus::from_str("unknown").is_err());
        assert!(RiskLevel::from_str("").is_err());
    }
}
