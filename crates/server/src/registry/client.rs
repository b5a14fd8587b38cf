//! ClinicalTrials.gov v2 study search client

use serde::Deserialize;
use trialmatch_core::{ClinicalTrial, IntakeError, TrialQuery, Upstream, query, truncate_chars};

use crate::middleware::metrics::record_upstream;

const ERROR_BODY_LIMIT: usize = 500;

/// Client for the registry's `/studies` endpoint
#[derive(Clone)]
pub struct TrialRegistryClient {
    http: reqwest::Client,
    base_url: String,
    page_size: u32,
}

/// One page of `/studies` results
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudiesPage {
    #[serde(default)]
    pub studies: Vec<ClinicalTrial>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl TrialRegistryClient {
    /// Create a client for `base_url` (e.g. `https://clinicaltrials.gov/api/v2`)
    pub fn new(base_url: String, page_size: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size,
        }
    }

    /// Query parameters for one search
    pub fn params(&self, query: &TrialQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("format", "json".to_string()),
            ("fields", query::study_fields()),
            ("pageSize", self.page_size.to_string()),
        ];
        let filter = query.advanced_filter();
        if !filter.is_empty() {
            params.push(("filter.advanced", filter));
        }
        params
    }

    /// Fetch the first page of studies matching `query`
    pub async fn search(&self, query: &TrialQuery) -> Result<Vec<ClinicalTrial>, IntakeError> {
        let url = format!("{}/studies", self.base_url);
        let params = self.params(query);

        // the filter carries the postal code and condition terms
        tracing::info!(clauses = query.clauses().len(), "Searching trial registry");
        tracing::debug!(filter = %query.advanced_filter(), "Registry filter");

        let response = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                record_upstream(Upstream::Registry, "error");
                IntakeError::UpstreamRequest {
                    service: Upstream::Registry,
                    status: None,
                    body: format!("HTTP request failed: {}", e),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            record_upstream(Upstream::Registry, "error");
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Trial registry error");
            return Err(IntakeError::UpstreamRequest {
                service: Upstream::Registry,
                status: Some(status.as_u16()),
                body: truncate_chars(&body, ERROR_BODY_LIMIT),
            });
        }

        let page = response.json::<StudiesPage>().await.map_err(|e| {
            record_upstream(Upstream::Registry, "malformed");
            IntakeError::malformed(
                Upstream::Registry,
                format!("Failed to parse studies page: {}", e),
            )
        })?;
        record_upstream(Upstream::Registry, "ok");

        if page.next_page_token.is_some() {
            tracing::debug!(
                returned = page.studies.len(),
                "More studies available beyond the first page"
            );
        }

        Ok(page.studies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io;
    use std::sync::{Arc, Mutex};
    use trialmatch_core::{ConditionFact, ExtractedFacts, QueryOptions, SearchFilters};

    /// Log sink shared with the subscriber
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_params_include_projection_and_page_size() {
        let client = TrialRegistryClient::new("http://registry/api/v2/".to_string(), 10);
        let query = TrialQuery::build(
            &ExtractedFacts::default(),
            &SearchFilters::default(),
            QueryOptions::default(),
        );
        let params = client.params(&query);

        assert_eq!(client.base_url, "http://registry/api/v2");
        assert!(params.contains(&("format", "json".to_string())));
        assert!(params.contains(&("pageSize", "10".to_string())));
        let fields = &params.iter().find(|(k, _)| *k == "fields").unwrap().1;
        assert!(fields.contains("protocolSection.eligibilityModule"));
        let filter = &params.iter().find(|(k, _)| *k == "filter.advanced").unwrap().1;
        assert!(filter.contains("RECRUITING"));
    }

    #[test]
    fn test_studies_page_defaults() {
        let page: StudiesPage = serde_json::from_value(json!({})).unwrap();
        assert!(page.studies.is_empty());

        let page: StudiesPage = serde_json::from_value(json!({
            "studies": [{"protocolSection": {"identificationModule": {"nctId": "NCT1"}}}],
            "nextPageToken": "abc"
        }))
        .unwrap();
        assert_eq!(page.studies[0].nct_id().as_deref(), Some("NCT1"));
        assert_eq!(page.next_page_token.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_info_log_omits_patient_details() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let facts = ExtractedFacts {
            zip_code: Some("10001".to_string()),
            conditions: vec![ConditionFact {
                term: "Type 2 diabetes".to_string(),
                code: None,
            }],
            ..Default::default()
        };
        let filters = SearchFilters {
            travel_radius: Some(25.0),
            ..Default::default()
        };
        let query = TrialQuery::build(&facts, &filters, QueryOptions::default());

        // nothing listens on the discard port, so the call fails fast
        let client = TrialRegistryClient::new("http://127.0.0.1:9".to_string(), 5);
        assert!(client.search(&query).await.is_err());

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Searching trial registry"));
        assert!(!output.contains("10001"));
        assert!(!output.contains("diabetes"));
    }
}
