//! User-chosen trial search filters

use serde::{Deserialize, Serialize};

/// Registry overall-status values, plus `ANY` to disable status filtering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecruitingStatus {
    Any,
    #[default]
    Recruiting,
    NotYetRecruiting,
    EnrollingByInvitation,
    ActiveNotRecruiting,
    Completed,
    Suspended,
    Terminated,
    Withdrawn,
}

impl RecruitingStatus {
    /// Value used in the registry's status field; `None` for [`RecruitingStatus::Any`]
    pub fn registry_value(&self) -> Option<&'static str> {
        match self {
            RecruitingStatus::Any => None,
            RecruitingStatus::Recruiting => Some("RECRUITING"),
            RecruitingStatus::NotYetRecruiting => Some("NOT_YET_RECRUITING"),
            RecruitingStatus::EnrollingByInvitation => Some("ENROLLING_BY_INVITATION"),
            RecruitingStatus::ActiveNotRecruiting => Some("ACTIVE_NOT_RECRUITING"),
            RecruitingStatus::Completed => Some("COMPLETED"),
            RecruitingStatus::Suspended => Some("SUSPENDED"),
            RecruitingStatus::Terminated => Some("TERMINATED"),
            RecruitingStatus::Withdrawn => Some("WITHDRAWN"),
        }
    }
}

/// Trial phases as enumerated by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "EARLY_PHASE1")]
    EarlyPhase1,
    #[serde(rename = "PHASE1")]
    Phase1,
    #[serde(rename = "PHASE2")]
    Phase2,
    #[serde(rename = "PHASE3")]
    Phase3,
    #[serde(rename = "PHASE4")]
    Phase4,
    #[serde(rename = "NA")]
    NotApplicable,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::EarlyPhase1 => "EARLY_PHASE1",
            Phase::Phase1 => "PHASE1",
            Phase::Phase2 => "PHASE2",
            Phase::Phase3 => "PHASE3",
            Phase::Phase4 => "PHASE4",
            Phase::NotApplicable => "NA",
        }
    }
}

/// Filters supplied alongside the extracted facts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    /// Absent means [`RecruitingStatus::Recruiting`]
    pub recruiting_status: Option<RecruitingStatus>,
    /// Travel radius in miles
    pub travel_radius: Option<f64>,
    #[serde(alias = "phase")]
    pub phases: Vec<Phase>,
    /// Free-text condition that replaces the extracted condition terms
    pub condition_keyword: Option<String>,
}
