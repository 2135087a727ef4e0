//! Report agent client
//!
//! Optional downstream service that turns variants and drug recommendations
//! into a narrative report.

use async_trait::async_trait;
use omnyla_common::{config::ReportAgentConfig, DrugRecommendation, VariantRecord};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportAgentError {
    #[error("Report agent request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Report agent returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[async_trait]
pub trait ReportAgent: Send + Sync {
    async fn generate(
        &self,
        patient_id: &str,
        variants: &[VariantRecord],
        drugs: &[DrugRecommendation],
    ) -> Result<String, ReportAgentError>;
}

#[derive(Serialize)]
struct ReportRequest<'a> {
    patient_id: &'a str,
    variants: &'a [VariantRecord],
    drugs: &'a [DrugRecommendation],
}

#[derive(Deserialize)]
struct ReportResponse {
    report: String,
}

pub struct HttpReportAgent {
    client: reqwest::Client,
    url: String,
}

impl HttpReportAgent {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ReportAgentError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// `None` when no agent URL is configured
    pub fn from_config(config: &ReportAgentConfig) -> Result<Option<Self>, ReportAgentError> {
        match config.url.as_deref().filter(|url| !url.is_empty()) {
            Some(url) => Ok(Some(Self::new(url, Duration::from_secs(config.timeout_secs))?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ReportAgent for HttpReportAgent {
    async fn generate(
        &self,
        patient_id: &str,
        variants: &[VariantRecord],
        drugs: &[DrugRecommendation],
    ) -> Result<String, ReportAgentError> {
        let request = ReportRequest {
            patient_id,
            variants,
            drugs,
        };

        let response = self.client.post(&self.url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ReportAgentError::Status { status, body });
        }

        let reply: ReportResponse = response.json().await?;
        Ok(reply.report)
    }
}
