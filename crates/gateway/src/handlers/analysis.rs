//! VCF analysis handlers

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::time::Instant;
use validator::Validate;

use crate::AppState;
use omnyla_analysis::{intake, render_markdown, UploadLimits, UploadedFile};
use omnyla_common::{
    errors::{AppError, Result},
    metrics::RequestMetrics,
    AnalysisResult, PATIENT_FIELD, VCF_FIELD,
};

pub const ANALYZE_PATH: &str = "/api/analyze-vcf";
pub const REPORT_PATH: &str = "/api/analyze-vcf/report";

/// Parsed multipart submission. Names over 256 characters are rejected with
/// 400 rather than silently truncated to the 64-character output label.
#[derive(Debug, Validate)]
struct AnalysisForm {
    #[validate(length(max = 256))]
    patient_name: Option<String>,
}

/// Accept a VCF upload and run the full pipeline under the request deadline
pub async fn analyze_vcf(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResult>> {
    let started = Instant::now();
    let metrics = RequestMetrics::start("POST", ANALYZE_PATH);
    let deadline = state.config.request_timeout();

    let outcome = match tokio::time::timeout(deadline, run_analysis(&state, multipart, started)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::warn!(timeout_secs = deadline.as_secs(), "Analysis deadline exceeded");
            Err(AppError::Timeout {
                timeout_secs: deadline.as_secs(),
            })
        }
    };

    let status = match &outcome {
        Ok(_) => StatusCode::OK,
        Err(e) => e.status_code(),
    };
    metrics.finish(status.as_u16());

    outcome.map(Json)
}

async fn run_analysis(
    state: &AppState,
    multipart: std::result::Result<Multipart, MultipartRejection>,
    started: Instant,
) -> Result<AnalysisResult> {
    let multipart = multipart.map_err(|e| AppError::InvalidForm {
        message: e.body_text(),
    })?;

    let limits = state.pipeline.limits();
    let (upload, form) = read_form(multipart, &limits).await?;

    form.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some(PATIENT_FIELD.to_string()),
    })?;

    let label = intake::sanitize_label(form.patient_name.as_deref());
    state.pipeline.analyze(upload, &label, started).await
}

/// Stream the form. The file type is checked from the part headers before
/// any body is read; size is enforced per chunk.
async fn read_form(mut multipart: Multipart, limits: &UploadLimits) -> Result<(UploadedFile, AnalysisForm)> {
    let mut upload = None;
    let mut form = AnalysisForm { patient_name: None };

    while let Some(mut field) = multipart.next_field().await.map_err(|e| form_error(e, limits))? {
        let name = field.name().map(str::to_owned);

        match name.as_deref() {
            Some(VCF_FIELD) => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                intake::check_file_type(&file_name)?;

                let mut bytes = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(|e| form_error(e, limits))? {
                    intake::check_size((bytes.len() + chunk.len()) as u64, limits)?;
                    bytes.extend_from_slice(&chunk);
                }

                upload = Some(UploadedFile::new(file_name, bytes));
            }
            Some(PATIENT_FIELD) => {
                let text = field.text().await.map_err(|e| form_error(e, limits))?;
                form.patient_name = Some(text).filter(|t| !t.trim().is_empty());
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring form field");
            }
        }
    }

    let upload = upload.ok_or(AppError::MissingFile)?;
    Ok((upload, form))
}

fn form_error(err: MultipartError, limits: &UploadLimits) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        // the transport limit tripped; the actual size is unknown
        return AppError::PayloadTooLarge {
            size: 0,
            limit: limits.max_bytes,
        };
    }
    AppError::InvalidForm {
        message: err.body_text(),
    }
}

/// Render a previously returned result as a Markdown download
pub async fn analysis_report(Json(result): Json<AnalysisResult>) -> impl IntoResponse {
    let metrics = RequestMetrics::start("POST", REPORT_PATH);
    let body = render_markdown(&result);
    metrics.finish(StatusCode::OK.as_u16());

    (
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_validation() {
        let ok = AnalysisForm {
            patient_name: Some("Jane Doe".into()),
        };
        assert!(ok.validate().is_ok());

        let too_long = AnalysisForm {
            patient_name: Some("x".repeat(300)),
        };
        assert!(too_long.validate().is_err());

        assert!(AnalysisForm { patient_name: None }.validate().is_ok());
    }
}
