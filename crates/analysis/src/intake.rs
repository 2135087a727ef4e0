//! Upload intake
//!
//! Validation and routing decisions made before any extraction work:
//! - file type by extension (case-insensitive)
//! - hard size ceiling
//! - mock-data threshold for large uploads

use omnyla_common::{
    config::UploadConfig,
    errors::{AppError, Result},
    DEFAULT_PATIENT_LABEL,
};
use std::path::Path;

/// Accepted upload extension
pub const VCF_EXTENSION: &str = ".vcf";

/// Longest label handed to the annotator as an output basename
const MAX_LABEL_LEN: usize = 64;

/// Size thresholds applied to every upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_bytes: u64,
    pub mock_threshold_bytes: u64,
}

impl UploadLimits {
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            max_bytes: config.max_bytes,
            mock_threshold_bytes: config.mock_threshold_bytes,
        }
    }
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self::from_config(&UploadConfig::default())
    }
}

/// An accepted upload, owned by one request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lossy text view for the fallback scan
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Which pipeline an accepted upload takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeRoute {
    /// Stage the file and run extraction
    Full,
    /// Above the mock threshold: skip extraction entirely
    MockOnly,
}

/// Reject anything that is not named `*.vcf`
pub fn check_file_type(file_name: &str) -> Result<()> {
    if file_name.to_ascii_lowercase().ends_with(VCF_EXTENSION) {
        Ok(())
    } else {
        Err(AppError::InvalidFileType {
            file_name: file_name.to_string(),
        })
    }
}

/// Reject uploads above the hard ceiling
pub fn check_size(size: u64, limits: &UploadLimits) -> Result<()> {
    if size > limits.max_bytes {
        Err(AppError::PayloadTooLarge {
            size,
            limit: limits.max_bytes,
        })
    } else {
        Ok(())
    }
}

/// Pick the pipeline for an upload that already passed the size check
pub fn route(size: u64, limits: &UploadLimits) -> IntakeRoute {
    if size > limits.mock_threshold_bytes {
        IntakeRoute::MockOnly
    } else {
        IntakeRoute::Full
    }
}

/// Validate a declared upload and decide its route
pub fn validate(file_name: &str, size: u64, limits: &UploadLimits) -> Result<IntakeRoute> {
    tracing::info!(
        file_name,
        size_mb = %format!("{:.2}", size as f64 / (1024.0 * 1024.0)),
        "Processing VCF upload"
    );

    check_file_type(file_name)?;
    check_size(size, limits)?;

    let route = route(size, limits);
    if route == IntakeRoute::MockOnly {
        tracing::info!(file_name, size, "Large file detected, using mock data");
    }
    Ok(route)
}

/// Reduce a patient name to a safe output basename
pub fn sanitize_label(raw: Option<&str>) -> String {
    let label: String = raw
        .unwrap_or_default()
        .trim()
        .chars()
        .take(MAX_LABEL_LEN)
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    if label.is_empty() {
        DEFAULT_PATIENT_LABEL.to_string()
    } else {
        label
    }
}

/// File name used when staging the upload; only the final path component survives
pub fn staged_file_name(declared: &str) -> String {
    Path::new(declared)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty() && *name != "..")
        .map(str::to_string)
        .unwrap_or_else(|| format!("upload{}", VCF_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn test_extension_is_case_insensitive() {
        assert_ok!(check_file_type("sample.vcf"));
        assert_ok!(check_file_type("SAMPLE.VCF"));
        assert_ok!(check_file_type("trio.Vcf"));
    }

    #[test]
    fn test_rejects_other_extensions() {
        for name in ["notes.txt", "sample.vcf.gz", "vcf", "sample.vcfx", ""] {
            let err = check_file_type(name).unwrap_err();
            assert!(matches!(err, AppError::InvalidFileType { .. }), "{name}");
        }
    }

    #[test]
    fn test_size_ceiling() {
        let limits = UploadLimits::default();
        assert_ok!(check_size(100 * MIB, &limits));
        let err = check_size(200 * MIB, &limits).unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge { .. }));
    }

    #[test]
    fn test_route_by_threshold() {
        let limits = UploadLimits::default();
        assert_eq!(route(1024, &limits), IntakeRoute::Full);
        assert_eq!(route(4 * MIB, &limits), IntakeRoute::Full);
        assert_eq!(route(4 * MIB + 1, &limits), IntakeRoute::MockOnly);
        assert_eq!(route(10 * MIB, &limits), IntakeRoute::MockOnly);
    }

    #[test]
    fn test_validate_huge_vcf() {
        let err = validate("huge.vcf", 200 * MIB, &UploadLimits::default()).unwrap_err();
        assert_eq!(err.status_code().as_u16(), 413);
    }

    #[test]
    fn test_validate_wrong_type() {
        let err = validate("notes.txt", 1024, &UploadLimits::default()).unwrap_err();
        assert_eq!(err.status_code().as_u16(), 400);

        // type is judged before size
        let err = assert_err!(validate("huge.bin", 200 * MIB, &UploadLimits::default()));
        assert_eq!(err.status_code().as_u16(), 400);
    }

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize_label(None), "patient");
        assert_eq!(sanitize_label(Some("   ")), "patient");
        assert_eq!(sanitize_label(Some("Jane Doe")), "Jane_Doe");
        assert_eq!(sanitize_label(Some("../../etc/passwd")), "______etc_passwd");
        assert_eq!(sanitize_label(Some(&"x".repeat(200))).len(), 64);
    }

    #[test]
    fn test_staged_file_name_strips_directories() {
        assert_eq!(staged_file_name("sample.vcf"), "sample.vcf");
        assert_eq!(staged_file_name("/tmp/evil/sample.vcf"), "sample.vcf");
        assert_eq!(staged_file_name("../sample.vcf"), "sample.vcf");
        assert_eq!(staged_file_name(".."), "upload.vcf");
    }
}
