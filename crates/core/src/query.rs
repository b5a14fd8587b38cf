//! Registry advanced-filter construction

use std::fmt;

use crate::facts::ExtractedFacts;
use crate::filters::{Phase, SearchFilters};

/// Study fields requested from the registry
pub const STUDY_FIELDS: &[&str] = &[
    "protocolSection.identificationModule",
    "protocolSection.statusModule",
    "protocolSection.designModule",
    "protocolSection.conditionsModule",
    "protocolSection.eligibilityModule",
    "protocolSection.descriptionModule",
    "protocolSection.contactsLocationsModule",
];

/// Server-side knobs that shape every query
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    /// Emit the age-range clause when the patient's age is known
    pub age_filter: bool,
}

/// Registry sex eligibility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
    All,
}

impl Sex {
    /// Map a free-text gender onto the registry's values
    pub fn from_gender(gender: Option<&str>) -> Self {
        match gender.map(|g| g.trim().to_ascii_lowercase()).as_deref() {
            Some("male" | "m" | "man") => Sex::Male,
            Some("female" | "f" | "woman") => Sex::Female,
            _ => Sex::All,
        }
    }
}

/// One conjunct of the advanced filter
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Status(&'static str),
    Keyword(String),
    Conditions(Vec<String>),
    Sex(Sex),
    Proximity { postal_code: String, radius_miles: f64 },
    Phases(Vec<Phase>),
    Age(u32),
}

fn quoted(term: &str) -> String {
    format!("\"{}\"", term.replace('"', "").trim())
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Status(status) => write!(f, "AREA[OverallStatus]{}", status),
            Clause::Keyword(keyword) => write!(f, "AREA[Condition]{}", quoted(keyword)),
            Clause::Conditions(terms) => {
                let terms: Vec<String> = terms.iter().map(|t| quoted(t)).collect();
                write!(f, "AREA[Condition]({})", terms.join(" OR "))
            }
            Clause::Sex(Sex::Male) => f.write_str("AREA[Sex](MALE OR ALL)"),
            Clause::Sex(Sex::Female) => f.write_str("AREA[Sex](FEMALE OR ALL)"),
            Clause::Sex(Sex::All) => f.write_str("AREA[Sex]ALL"),
            Clause::Proximity {
                postal_code,
                radius_miles,
            } => write!(
                f,
                "AREA[LocationZip]DISTANCE[{}, {}mi]",
                postal_code, radius_miles
            ),
            Clause::Phases(phases) => {
                let phases: Vec<&str> = phases.iter().map(Phase::as_str).collect();
                write!(f, "AREA[Phase]({})", phases.join(" OR "))
            }
            Clause::Age(age) => write!(
                f,
                "AREA[MinimumAge]RANGE[MIN, {age} years] AND AREA[MaximumAge]RANGE[{age} years, MAX]"
            ),
        }
    }
}

/// A conjunction of clauses sent as the registry's advanced filter
#[derive(Debug, Clone, PartialEq)]
pub struct TrialQuery {
    clauses: Vec<Clause>,
}

impl TrialQuery {
    /// Build the query for a patient and the caller's filters
    pub fn build(facts: &ExtractedFacts, filters: &SearchFilters, options: QueryOptions) -> Self {
        let mut clauses = Vec::new();

        if let Some(status) = filters
            .recruiting_status
            .unwrap_or_default()
            .registry_value()
        {
            clauses.push(Clause::Status(status));
        }

        let keyword = filters
            .condition_keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.replace('"', "").trim().is_empty());
        match keyword {
            Some(keyword) => clauses.push(Clause::Keyword(keyword.to_string())),
            None => {
                let terms: Vec<String> = facts
                    .condition_terms()
                    .filter(|t| !t.replace('"', "").trim().is_empty())
                    .map(str::to_string)
                    .collect();
                if !terms.is_empty() {
                    clauses.push(Clause::Conditions(terms));
                }
            }
        }

        clauses.push(Clause::Sex(Sex::from_gender(facts.gender.as_deref())));

        if let (Some(radius), Some(postal_code)) = (
            filters.travel_radius.filter(|r| r.is_finite() && *r > 0.0),
            facts.postal_code(),
        ) {
            clauses.push(Clause::Proximity {
                postal_code: postal_code.to_string(),
                radius_miles: radius,
            });
        }

        if !filters.phases.is_empty() {
            clauses.push(Clause::Phases(filters.phases.clone()));
        }

        if options.age_filter {
            if let Some(age) = facts.age {
                clauses.push(Clause::Age(age));
            }
        }

        Self { clauses }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Render the `filter.advanced` expression
    pub fn advanced_filter(&self) -> String {
        self.clauses
            .iter()
            .map(Clause::to_string)
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

/// Comma-separated `fields` projection
pub fn study_fields() -> String {
    STUDY_FIELDS.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::ConditionFact;
    use crate::filters::RecruitingStatus;

    fn facts() -> ExtractedFacts {
        ExtractedFacts {
            age: Some(55),
            gender: Some("Male".to_string()),
            conditions: vec![
                ConditionFact {
                    term: "diabetes".to_string(),
                    code: None,
                },
                ConditionFact {
                    term: "chronic \"kidney\" disease".to_string(),
                    code: Some("N18".to_string()),
                },
            ],
            medications: vec!["metformin".to_string()],
            zip_code: Some("10001".to_string()),
            immunizations: vec![],
        }
    }

    #[test]
    fn test_default_status_is_recruiting() {
        let query = TrialQuery::build(&facts(), &SearchFilters::default(), QueryOptions::default());
        assert_eq!(query.clauses()[0], Clause::Status("RECRUITING"));
        assert!(query.advanced_filter().starts_with("AREA[OverallStatus]RECRUITING AND "));
    }

    #[test]
    fn test_any_status_omits_clause() {
        let filters = SearchFilters {
            recruiting_status: Some(RecruitingStatus::Any),
            ..Default::default()
        };
        let query = TrialQuery::build(&facts(), &filters, QueryOptions::default());

        assert!(!query.clauses().iter().any(|c| matches!(c, Clause::Status(_))));
        assert!(!query.advanced_filter().contains("OverallStatus"));
    }

    #[test]
    fn test_conditions_disjunction() {
        let query = TrialQuery::build(&facts(), &SearchFilters::default(), QueryOptions::default());
        assert!(query
            .advanced_filter()
            .contains(r#"AREA[Condition]("diabetes" OR "chronic kidney disease")"#));
    }

    #[test]
    fn test_keyword_overrides_conditions() {
        let filters = SearchFilters {
            condition_keyword: Some("  heart failure ".to_string()),
            ..Default::default()
        };
        let filter = TrialQuery::build(&facts(), &filters, QueryOptions::default()).advanced_filter();
        assert!(filter.contains(r#"AREA[Condition]"heart failure""#));
        assert!(!filter.contains("diabetes"));

        // a blank override falls back to the extracted terms
        let filters = SearchFilters {
            condition_keyword: Some("   ".to_string()),
            ..Default::default()
        };
        let filter = TrialQuery::build(&facts(), &filters, QueryOptions::default()).advanced_filter();
        assert!(filter.contains("diabetes"));
    }

    #[test]
    fn test_no_conditions_no_clause() {
        let facts = ExtractedFacts::default();
        let query = TrialQuery::build(&facts, &SearchFilters::default(), QueryOptions::default());
        assert_eq!(query.advanced_filter(), "AREA[OverallStatus]RECRUITING AND AREA[Sex]ALL");
    }

    #[test]
    fn test_gender_mapping() {
        assert_eq!(Sex::from_gender(Some("female")), Sex::Female);
        assert_eq!(Sex::from_gender(Some(" MALE ")), Sex::Male);
        assert_eq!(Sex::from_gender(Some("F")), Sex::Female);
        assert_eq!(Sex::from_gender(Some("non-binary")), Sex::All);
        assert_eq!(Sex::from_gender(None), Sex::All);

        let filter =
            TrialQuery::build(&facts(), &SearchFilters::default(), QueryOptions::default()).advanced_filter();
        assert!(filter.contains("AREA[Sex](MALE OR ALL)"));
    }

    #[test]
    fn test_proximity_requires_radius_and_postal_code() {
        let filters = SearchFilters {
            travel_radius: Some(50.0),
            ..Default::default()
        };
        let filter = TrialQuery::build(&facts(), &filters, QueryOptions::default()).advanced_filter();
        assert!(filter.contains("AREA[LocationZip]DISTANCE[10001, 50mi]"));

        let mut no_zip = facts();
        no_zip.zip_code = None;
        let filter = TrialQuery::build(&no_zip, &filters, QueryOptions::default()).advanced_filter();
        assert!(!filter.contains("DISTANCE"));

        let filter =
            TrialQuery::build(&facts(), &SearchFilters::default(), QueryOptions::default()).advanced_filter();
        assert!(!filter.contains("DISTANCE"));
    }

    #[test]
    fn test_phase_clause() {
        let filters = SearchFilters {
            phases: vec![Phase::Phase2, Phase::Phase3],
            ..Default::default()
        };
        let filter = TrialQuery::build(&facts(), &filters, QueryOptions::default()).advanced_filter();
        assert!(filter.ends_with("AREA[Phase](PHASE2 OR PHASE3)"));
    }

    #[test]
    fn test_age_clause_only_when_enabled() {
        let filter =
            TrialQuery::build(&facts(), &SearchFilters::default(), QueryOptions::default()).advanced_filter();
        assert!(!filter.contains("MinimumAge"));

        let filter = TrialQuery::build(
            &facts(),
            &SearchFilters::default(),
            QueryOptions { age_filter: true },
        )
        .advanced_filter();
        assert!(filter.contains("AREA[MinimumAge]RANGE[MIN, 55 years]"));
        assert!(filter.contains("AREA[MaximumAge]RANGE[55 years, MAX]"));
    }

    #[test]
    fn test_study_fields_projection() {
        let fields = study_fields();
        assert!(fields.starts_with("protocolSection.identificationModule,"));
        assert_eq!(fields.split(',').count(), STUDY_FIELDS.len());
    }
}
