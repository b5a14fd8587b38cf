//! trialmatch-core: Shared intake pipeline types and pure logic
//!
//! This crate holds everything that does not touch the network: the
//! clinical summary and fact models, request-body shape detection, summary
//! post-validation, de-identification, registry query construction, trial
//! digests and ranking reconciliation, plus the shared error taxonomy.

pub mod deidentify;
pub mod document;
pub mod error;
pub mod facts;
pub mod filters;
pub mod query;
pub mod ranking;
pub mod summary;
pub mod trial;

// Re-export our types
pub use deidentify::deidentify;
pub use document::{BodyShape, document_text};
pub use error::{IntakeError, MISSING_API_KEY_MESSAGE, Upstream, truncate_chars};
pub use facts::{ConditionFact, ExtractedFacts, Immunization};
pub use filters::{Phase, RecruitingStatus, SearchFilters};
pub use query::{Clause, QueryOptions, Sex, TrialQuery};
pub use ranking::{RankedTrial, Reconciled, reconcile};
pub use summary::{ClinicalSummary, Demographics, VitalSigns, normalize_summary};
pub use trial::{ClinicalTrial, TrialDigest};
