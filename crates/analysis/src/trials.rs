//! Clinical-trials enrichment
//!
//! Queries the ClinicalTrials.gov v2 study search for recruiting studies that
//! mention genetic testing of the given genes.

use async_trait::async_trait;
use omnyla_common::{config::TrialsConfig, ClinicalTrial};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Searched when a real run extracted no genes
pub const DEFAULT_GENES: [&str; 5] = ["CYP2D6", "SLCO1B1", "TPMT", "VKORC1", "G6PD"];

/// Searched on the mock paths
pub const MOCK_GENES: [&str; 2] = ["CYP2D6", "SLCO1B1"];

const TESTING_PHRASES: [&str; 4] = [
    "genetic testing",
    "mutation testing",
    "mutation analysis",
    "genetic analysis",
];

const RECRUITING: &str = "RECRUITING";
const UNKNOWN: &str = "Unknown";
const NO_PHASE: &str = "Not specified";
const CONTACT_PLACEHOLDER: &str = "See ClinicalTrials.gov";

#[derive(Error, Debug)]
pub enum TrialSearchError {
    #[error("Trial registry request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Trial registry returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Source of recruiting trials for a gene list
#[async_trait]
pub trait TrialRegistry: Send + Sync {
    async fn search(&self, genes: &[String]) -> Result<Vec<ClinicalTrial>, TrialSearchError>;
}

/// `("GENE" AND ("genetic testing" OR ...))` per gene, OR-ed together
pub fn build_trial_query(genes: &[String]) -> String {
    let phrases = TESTING_PHRASES
        .iter()
        .map(|phrase| format!("\"{}\"", phrase))
        .collect::<Vec<_>>()
        .join(" OR ");

    genes
        .iter()
        .map(|gene| format!("(\"{}\" AND ({}))", gene, phrases))
        .collect::<Vec<_>>()
        .join(" OR ")
}

pub fn default_genes() -> Vec<String> {
    DEFAULT_GENES.iter().map(|g| g.to_string()).collect()
}

pub fn mock_genes() -> Vec<String> {
    MOCK_GENES.iter().map(|g| g.to_string()).collect()
}

/// ClinicalTrials.gov v2 client
pub struct ClinicalTrialsGov {
    client: reqwest::Client,
    base_url: String,
    page_size: u32,
}

impl ClinicalTrialsGov {
    pub fn new(config: &TrialsConfig) -> Result<Self, TrialSearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            page_size: config.page_size,
        })
    }
}

#[async_trait]
impl TrialRegistry for ClinicalTrialsGov {
    #[instrument(skip(self), fields(genes = genes.len()))]
    async fn search(&self, genes: &[String]) -> Result<Vec<ClinicalTrial>, TrialSearchError> {
        let query = build_trial_query(genes);
        debug!(query = %query, "Searching clinical trials");

        let page_size = self.page_size.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[
                ("query.term", query.as_str()),
                ("filter.overallStatus", RECRUITING),
                ("pageSize", page_size.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TrialSearchError::Status { status, body });
        }

        let page: StudyPage = response.json().await?;
        let total = page.studies.len();
        let trials = normalize_studies(page);

        debug!(returned = total, kept = trials.len(), "Clinical trials normalized");
        Ok(trials)
    }
}

/// Registry used when enrichment is switched off
pub struct DisabledTrialRegistry;

#[async_trait]
impl TrialRegistry for DisabledTrialRegistry {
    async fn search(&self, _genes: &[String]) -> Result<Vec<ClinicalTrial>, TrialSearchError> {
        Ok(Vec::new())
    }
}

/// Studies stay raw so one off-type entry cannot sink the whole page
#[derive(Debug, Default, Deserialize)]
struct StudyPage {
    #[serde(default)]
    studies: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Study {
    #[serde(default)]
    protocol_section: ProtocolSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ProtocolSection {
    identification_module: IdentificationModule,
    status_module: StatusModule,
    design_module: DesignModule,
    locations_module: LocationsModule,
    conditions_module: ConditionsModule,
    arms_interventions_module: ArmsInterventionsModule,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct IdentificationModule {
    brief_title: Option<String>,
    nct_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StatusModule {
    overall_status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DesignModule {
    phases: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LocationsModule {
    locations: Vec<Location>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Location {
    city: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConditionsModule {
    conditions: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArmsInterventionsModule {
    interventions: Vec<Intervention>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Intervention {
    name: Option<String>,
}

fn or_default(value: Option<&String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| default.to_string())
}

fn normalize_study(study: Study) -> ClinicalTrial {
    let protocol = study.protocol_section;
    let location = protocol.locations_module.locations.first();
    let status = or_default(protocol.status_module.overall_status.as_ref(), UNKNOWN);

    ClinicalTrial {
        title: or_default(protocol.identification_module.brief_title.as_ref(), UNKNOWN),
        phase: or_default(protocol.design_module.phases.first(), NO_PHASE),
        city: or_default(location.and_then(|l| l.city.as_ref()), UNKNOWN),
        state: or_default(location.and_then(|l| l.state.as_ref()), UNKNOWN),
        distance: 0.0,
        condition: or_default(protocol.conditions_module.conditions.first(), UNKNOWN),
        intervention: or_default(
            protocol
                .arms_interventions_module
                .interventions
                .first()
                .and_then(|i| i.name.as_ref()),
            UNKNOWN,
        ),
        is_recruiting: status.eq_ignore_ascii_case(RECRUITING),
        status,
        nct_id: protocol.identification_module.nct_id.unwrap_or_default(),
        contact_info: CONTACT_PLACEHOLDER.to_string(),
    }
}

fn normalize_studies(page: StudyPage) -> Vec<ClinicalTrial> {
    page.studies
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<Study>(raw) {
            Ok(study) => Some(study),
            Err(e) => {
                warn!(error = %e, "Skipping malformed study");
                None
            }
        })
        .map(normalize_study)
        .filter(|trial| {
            let keep = !trial.nct_id.is_empty() && trial.is_recruiting;
            if !keep {
                warn!(nct_id = %trial.nct_id, status = %trial.status, "Dropping non-recruiting trial");
            }
            keep
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn genes(list: &[&str]) -> Vec<String> {
        list.iter().map(|g| g.to_string()).collect()
    }

    fn registry(server: &MockServer) -> ClinicalTrialsGov {
        let config = TrialsConfig {
            base_url: format!("{}/api/v2/studies", server.uri()),
            timeout_secs: 5,
            ..TrialsConfig::default()
        };
        ClinicalTrialsGov::new(&config).unwrap()
    }

    fn study(nct_id: &str, status: &str) -> serde_json::Value {
        json!({
            "protocolSection": {
                "identificationModule": {"nctId": nct_id, "briefTitle": format!("Study {}", nct_id)},
                "statusModule": {"overallStatus": status},
                "designModule": {"phases": ["PHASE2", "PHASE3"]},
                "locationsModule": {"locations": [{"city": "Boston", "state": "Massachusetts"}, {"city": "Austin"}]},
                "conditionsModule": {"conditions": ["Breast Cancer", "Pain"]},
                "armsInterventionsModule": {"interventions": [{"name": "Genotype-guided dosing"}]}
            }
        })
    }

    #[test]
    fn test_query_shape() {
        let query = build_trial_query(&genes(&["CYP2D6", "TPMT"]));
        assert_eq!(
            query,
            "(\"CYP2D6\" AND (\"genetic testing\" OR \"mutation testing\" OR \"mutation analysis\" OR \"genetic analysis\")) OR \
             (\"TPMT\" AND (\"genetic testing\" OR \"mutation testing\" OR \"mutation analysis\" OR \"genetic analysis\"))"
        );
        assert_eq!(build_trial_query(&[]), "");
    }

    #[test]
    fn test_normalize_defaults() {
        let page: StudyPage = serde_json::from_value(json!({
            "studies": [{"protocolSection": {
                "identificationModule": {"nctId": "NCT00000001"},
                "statusModule": {"overallStatus": "recruiting"}
            }}]
        }))
        .unwrap();

        let trials = normalize_studies(page);
        assert_eq!(trials.len(), 1);
        let trial = &trials[0];
        assert_eq!(trial.title, "Unknown");
        assert_eq!(trial.phase, "Not specified");
        assert_eq!((trial.city.as_str(), trial.state.as_str()), ("Unknown", "Unknown"));
        assert_eq!(trial.condition, "Unknown");
        assert_eq!(trial.intervention, "Unknown");
        assert_eq!(trial.status, "recruiting");
        assert!(trial.is_recruiting);
        assert_eq!(trial.distance, 0.0);
        assert_eq!(trial.contact_info, "See ClinicalTrials.gov");
    }

    #[test]
    fn test_filter_requires_id_and_exact_status() {
        let page: StudyPage = serde_json::from_value(json!({
            "studies": [
                study("NCT01", "RECRUITING"),
                study("", "RECRUITING"),
                study("NCT02", "NOT_YET_RECRUITING"),
                study("NCT03", "ACTIVE_NOT_RECRUITING"),
                {"protocolSection": {"identificationModule": {"nctId": "NCT04"}}}
            ]
        }))
        .unwrap();

        let trials = normalize_studies(page);
        let ids: Vec<_> = trials.iter().map(|t| t.nct_id.as_str()).collect();
        assert_eq!(ids, vec!["NCT01"]);
    }

    #[tokio::test]
    async fn test_search_against_registry() {
        let server = MockServer::start().await;
        let gene_list = genes(&["CYP2D6", "SLCO1B1"]);

        Mock::given(method("GET"))
            .and(path("/api/v2/studies"))
            .and(query_param("query.term", build_trial_query(&gene_list)))
            .and(query_param("filter.overallStatus", "RECRUITING"))
            .and(query_param("pageSize", "10"))
            .and(query_param("format", "json"))
            .and(header("accept", "application/json"))
            .and(header("user-agent", "GenomicsApp/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "studies": [study("NCT05", "RECRUITING"), study("NCT06", "COMPLETED")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let trials = registry(&server).search(&gene_list).await.unwrap();
        assert_eq!(trials.len(), 1);
        assert_eq!(trials[0].nct_id, "NCT05");
        assert_eq!(trials[0].phase, "PHASE2");
        assert_eq!(trials[0].city, "Boston");
        assert_eq!(trials[0].state, "Massachusetts");
        assert_eq!(trials[0].condition, "Breast Cancer");
        assert_eq!(trials[0].intervention, "Genotype-guided dosing");
    }

    #[tokio::test]
    async fn test_malformed_study_does_not_drop_page() {
        let server = MockServer::start().await;
        let mut broken = study("NCT08", "RECRUITING");
        broken["protocolSection"]["designModule"]["phases"] = Value::Null;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "studies": [study("NCT07", "RECRUITING"), broken, "not a study"]
            })))
            .mount(&server)
            .await;

        let trials = registry(&server).search(&genes(&["CYP2D6"])).await.unwrap();
        let ids: Vec<_> = trials.iter().map(|t| t.nct_id.as_str()).collect();
        assert_eq!(ids, vec!["NCT07"]);
    }

    #[tokio::test]
    async fn test_missing_studies_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalCount": 0})))
            .mount(&server)
            .await;

        let trials = registry(&server).search(&genes(&["TPMT"])).await.unwrap();
        assert!(trials.is_empty());
    }

    #[tokio::test]
    async fn test_registry_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = registry(&server).search(&genes(&["TPMT"])).await.unwrap_err();
        assert!(matches!(err, TrialSearchError::Status { status: 503, .. }));

        server.reset().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = registry(&server).search(&genes(&["TPMT"])).await.unwrap_err();
        assert!(matches!(err, TrialSearchError::Request(_)));
    }

    #[tokio::test]
    async fn test_disabled_registry() {
        let trials = DisabledTrialRegistry.search(&default_genes()).await.unwrap();
        assert!(trials.is_empty());
        assert_eq!(mock_genes(), vec!["CYP2D6", "SLCO1B1"]);
    }
}
