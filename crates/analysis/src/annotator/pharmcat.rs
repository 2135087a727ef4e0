//! PharmCAT invocation
//!
//! Runs the PharmCAT jar out of process with a bounded timeout and reads the
//! two JSON artifacts it leaves in the output directory.

use super::{Annotation, AnnotatorError, VariantAnnotator};
use crate::extraction::{parse_matcher, variants_from_matcher};
use crate::mapping::{parse_report, recommendations_from_report};
use async_trait::async_trait;
use omnyla_common::config::AnnotatorConfig;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Longest stderr excerpt carried into an error
const STDERR_EXCERPT: usize = 500;

pub struct PharmcatAnnotator {
    program: PathBuf,
    leading_args: Vec<OsString>,
    required: PathBuf,
    timeout: Duration,
}

impl PharmcatAnnotator {
    /// `java -jar <jar_path> ...`
    pub fn from_config(config: &AnnotatorConfig) -> Self {
        Self::with_command(
            config.java_path.clone(),
            vec![OsString::from("-jar"), config.jar_path.clone().into_os_string()],
            config.jar_path.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Arbitrary launcher; the tool counts as installed when `required` exists
    pub fn with_command(
        program: impl Into<PathBuf>,
        leading_args: Vec<OsString>,
        required: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            leading_args,
            required: required.into(),
            timeout,
        }
    }

    pub fn report_path(output_dir: &Path, label: &str) -> PathBuf {
        output_dir.join(format!("{}.report.json", label))
    }

    pub fn matcher_path(output_dir: &Path, label: &str) -> PathBuf {
        output_dir.join(format!("{}.match.json", label))
    }

    async fn run_tool(&self, vcf_path: &Path, output_dir: &Path, label: &str) -> Result<(), AnnotatorError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .arg("-vcf")
            .arg(vcf_path)
            .arg("-o")
            .arg(output_dir)
            .arg("-bf")
            .arg(label)
            .arg("-reporterJson")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(AnnotatorError::Unavailable {
                    reason: format!("{} not found", self.program.display()),
                });
            }
            Ok(Err(e)) => return Err(AnnotatorError::Io(e)),
            Err(_) => {
                return Err(AnnotatorError::TimedOut {
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
        };

        debug!(stdout = %String::from_utf8_lossy(&output.stdout), "PharmCAT stdout");

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.chars().take(STDERR_EXCERPT).collect();
            return Err(AnnotatorError::Failed {
                message: format!("{}: {}", output.status, excerpt.trim()),
            });
        }

        if !output.stderr.is_empty() {
            debug!(stderr = %String::from_utf8_lossy(&output.stderr), "PharmCAT stderr");
        }

        Ok(())
    }
}

#[async_trait]
impl VariantAnnotator for PharmcatAnnotator {
    #[instrument(skip(self), fields(annotator = "pharmcat"))]
    async fn annotate(
        &self,
        vcf_path: &Path,
        output_dir: &Path,
        label: &str,
    ) -> Result<Annotation, AnnotatorError> {
        if !self.is_available().await {
            return Err(AnnotatorError::Unavailable {
                reason: format!("{} not found", self.required.display()),
            });
        }

        info!("Running PharmCAT analysis");
        self.run_tool(vcf_path, output_dir, label).await?;

        Ok(read_artifacts(output_dir, label).await)
    }

    async fn is_available(&self) -> bool {
        tokio::fs::try_exists(&self.required).await.unwrap_or(false)
    }

    fn name(&self) -> &str {
        "pharmcat"
    }
}

/// Read both artifacts; each one degrades to empty on its own
pub async fn read_artifacts(output_dir: &Path, label: &str) -> Annotation {
    let recommendations = match read_optional(&PharmcatAnnotator::report_path(output_dir, label)).await {
        Some(text) => match parse_report(&text) {
            Ok(report) => recommendations_from_report(&report),
            Err(e) => {
                warn!(error = %e, "Error parsing PharmCAT report");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let variants = match read_optional(&PharmcatAnnotator::matcher_path(output_dir, label)).await {
        Some(text) => match parse_matcher(&text) {
            Ok(matcher) => variants_from_matcher(&matcher),
            Err(e) => {
                warn!(error = %e, "Error parsing PharmCAT matcher output");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    debug!(
        recommendations = recommendations.len(),
        variants = variants.len(),
        "PharmCAT artifacts read"
    );

    Annotation {
        recommendations,
        variants,
    }
}

async fn read_optional(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Some(text),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Artifact not produced");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read artifact");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{"genes":{"CPIC":{"CYP2C19":{"relatedDrugs":[{"name":"clopidogrel"}],"recommendationDiplotypes":[{"phenotypes":["Poor Metabolizer"]}]}}}}"#;
    const MATCH: &str = r#"{"results":[{"gene":"CYP2C19","chromosome":"chr10","variants":[{"position":94781859,"ref":"G","alt":"A"}]},{"gene":"TPMT"}]}"#;

    #[tokio::test]
    async fn test_read_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(PharmcatAnnotator::report_path(dir.path(), "p1"), REPORT).await.unwrap();
        tokio::fs::write(PharmcatAnnotator::matcher_path(dir.path(), "p1"), MATCH).await.unwrap();

        let annotation = read_artifacts(dir.path(), "p1").await;
        assert_eq!(annotation.recommendations.len(), 1);
        assert_eq!(annotation.recommendations[0].recommendation, "Phenotype: Poor Metabolizer");
        assert_eq!(annotation.variants.len(), 2);
        assert_eq!(annotation.variants[1].gene.as_deref(), Some("TPMT"));
    }

    #[tokio::test]
    async fn test_artifacts_degrade_independently() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(PharmcatAnnotator::report_path(dir.path(), "p1"), "{ truncated").await.unwrap();
        tokio::fs::write(PharmcatAnnotator::matcher_path(dir.path(), "p1"), MATCH).await.unwrap();

        let annotation = read_artifacts(dir.path(), "p1").await;
        assert!(annotation.recommendations.is_empty());
        assert_eq!(annotation.variants.len(), 2);

        let missing = read_artifacts(dir.path(), "nobody").await;
        assert_eq!(missing, Annotation::default());
    }

    #[tokio::test]
    async fn test_missing_jar_is_unavailable() {
        let config = AnnotatorConfig {
            jar_path: PathBuf::from("/nonexistent/pharmcat.jar"),
            ..AnnotatorConfig::default()
        };
        let annotator = PharmcatAnnotator::from_config(&config);
        assert!(!annotator.is_available().await);

        let err = annotator
            .annotate(Path::new("in.vcf"), Path::new("out"), "p1")
            .await
            .unwrap_err();
        assert!(matches!(err, AnnotatorError::Unavailable { .. }));
    }

    #[cfg(unix)]
    mod process {
        use super::*;

        fn script_annotator(dir: &Path, body: &str, timeout: Duration) -> PharmcatAnnotator {
            let script = dir.join("fake-pharmcat.sh");
            std::fs::write(&script, body).unwrap();
            PharmcatAnnotator::with_command(
                "/bin/sh",
                vec![script.clone().into_os_string()],
                script,
                timeout,
            )
        }

        #[tokio::test]
        async fn test_successful_run() {
            let dir = tempfile::tempdir().unwrap();
            let out = dir.path().join("output");
            std::fs::create_dir(&out).unwrap();

            // $4 is the output dir, $6 the label
            let body = format!(
                "printf '%s' '{}' > \"$4/$6.report.json\"\nprintf '%s' '{}' > \"$4/$6.match.json\"\n",
                REPORT, MATCH
            );
            let annotator = script_annotator(dir.path(), &body, Duration::from_secs(10));

            let annotation = annotator
                .annotate(&dir.path().join("in.vcf"), &out, "jane")
                .await
                .unwrap();
            assert_eq!(annotation.recommendations[0].drug, "clopidogrel");
            assert_eq!(annotation.variants.len(), 2);
        }

        #[tokio::test]
        async fn test_nonzero_exit_fails() {
            let dir = tempfile::tempdir().unwrap();
            let annotator = script_annotator(dir.path(), "echo boom >&2\nexit 3\n", Duration::from_secs(10));

            let err = annotator
                .annotate(&dir.path().join("in.vcf"), dir.path(), "p1")
                .await
                .unwrap_err();
            match err {
                AnnotatorError::Failed { message } => assert!(message.contains("boom")),
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_timeout() {
            let dir = tempfile::tempdir().unwrap();
            let annotator = script_annotator(dir.path(), "sleep 5\n", Duration::from_millis(100));

            let err = annotator
                .annotate(&dir.path().join("in.vcf"), dir.path(), "p1")
                .await
                .unwrap_err();
            assert!(matches!(err, AnnotatorError::TimedOut { timeout_ms: 100 }));
        }

        #[tokio::test]
        async fn test_missing_launcher_is_unavailable() {
            let dir = tempfile::tempdir().unwrap();
            let jar = dir.path().join("pharmcat.jar");
            std::fs::write(&jar, b"").unwrap();
            let annotator = PharmcatAnnotator::with_command(
                dir.path().join("no-such-java"),
                vec![OsString::from("-jar"), jar.clone().into_os_string()],
                jar,
                Duration::from_secs(1),
            );

            let err = annotator
                .annotate(&dir.path().join("in.vcf"), dir.path(), "p1")
                .await
                .unwrap_err();
            assert!(matches!(err, AnnotatorError::Unavailable { .. }));
        }
    }
}
