//! Variant annotator abstraction
//!
//! The external annotation tool sits behind a single capability so the
//! pipeline never checks for binaries itself:
//! - PharmCAT (out-of-process, file based)
//! - Not installed (always unavailable)

mod pharmcat;

pub use pharmcat::PharmcatAnnotator;

use async_trait::async_trait;
use omnyla_common::{config::AnnotatorConfig, DrugRecommendation, VariantRecord};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// What a successful annotator run contributes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotation {
    /// Raw recommendations, before sorting, capping, or fallback
    pub recommendations: Vec<DrugRecommendation>,
    pub variants: Vec<VariantRecord>,
}

#[derive(Error, Debug)]
pub enum AnnotatorError {
    #[error("Annotator unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Annotator timed out after {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },

    #[error("Annotator failed: {message}")]
    Failed { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnnotatorError {
    /// Metric label for this failure
    pub fn outcome(&self) -> &'static str {
        match self {
            AnnotatorError::Unavailable { .. } => "unavailable",
            AnnotatorError::TimedOut { .. } => "timeout",
            AnnotatorError::Failed { .. } => "failed",
            AnnotatorError::Io(_) => "io_error",
        }
    }
}

/// Trait for external variant annotation
#[async_trait]
pub trait VariantAnnotator: Send + Sync {
    /// Annotate a staged VCF, writing tool artifacts under `output_dir`
    async fn annotate(
        &self,
        vcf_path: &Path,
        output_dir: &Path,
        label: &str,
    ) -> Result<Annotation, AnnotatorError>;

    /// Whether the tool can be invoked at all
    async fn is_available(&self) -> bool;

    /// Provider name for logs
    fn name(&self) -> &str;
}

/// Annotator used when no tool is installed
pub struct NotInstalledAnnotator;

#[async_trait]
impl VariantAnnotator for NotInstalledAnnotator {
    async fn annotate(
        &self,
        _vcf_path: &Path,
        _output_dir: &Path,
        _label: &str,
    ) -> Result<Annotation, AnnotatorError> {
        Err(AnnotatorError::Unavailable {
            reason: "no annotator installed".to_string(),
        })
    }

    async fn is_available(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Create an annotator based on configuration
pub fn create_annotator(config: &AnnotatorConfig) -> Arc<dyn VariantAnnotator> {
    match config.provider.as_str() {
        "pharmcat" => Arc::new(PharmcatAnnotator::from_config(config)),
        "none" => Arc::new(NotInstalledAnnotator),
        other => {
            tracing::warn!(provider = other, "Unknown annotator provider, annotation disabled");
            Arc::new(NotInstalledAnnotator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_not_installed_is_unavailable() {
        let annotator = NotInstalledAnnotator;
        assert!(!annotator.is_available().await);

        let err = annotator
            .annotate(Path::new("a.vcf"), Path::new("out"), "patient")
            .await
            .unwrap_err();
        assert!(matches!(err, AnnotatorError::Unavailable { .. }));
        assert_eq!(err.outcome(), "unavailable");
    }

    #[test]
    fn test_factory() {
        let mut config = AnnotatorConfig::default();
        assert_eq!(create_annotator(&config).name(), "pharmcat");

        config.provider = "none".into();
        assert_eq!(create_annotator(&config).name(), "none");

        config.provider = "gatk".into();
        assert_eq!(create_annotator(&config).name(), "none");
    }
}
