//! Omnyla Common Library
//!
//! Shared code for the Omnyla analysis services including:
//! - Data model of the VCF analysis contract
//! - Error types and HTTP mapping
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use models::{AnalysisResult, ClinicalTrial, DrugRecommendation, VariantRecord};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Multipart field carrying the uploaded VCF
pub const VCF_FIELD: &str = "vcfFile";

/// Multipart field carrying the optional patient label
pub const PATIENT_FIELD: &str = "patientName";

/// Label used when no patient name is supplied
pub const DEFAULT_PATIENT_LABEL: &str = "patient";
