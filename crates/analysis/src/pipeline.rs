//! Analysis pipeline
//!
//! Composes intake, extraction, mapping and enrichment for one upload.
//! Every infrastructure failure takes its fallback branch exactly once;
//! only intake validation errors reach the caller.

use crate::agent::{HttpReportAgent, ReportAgent};
use crate::annotator::{create_annotator, Annotation, AnnotatorError, VariantAnnotator};
use crate::intake::{self, IntakeRoute, UploadLimits, UploadedFile};
use crate::mapping::{self, DrugMapping};
use crate::trials::{self, ClinicalTrialsGov, DisabledTrialRegistry, TrialRegistry};
use crate::vcf;
use omnyla_common::{
    errors::{AppError, Result},
    metrics::{record_analysis, record_annotator, record_trial_search},
    AnalysisResult, AppConfig, ClinicalTrial, VariantRecord,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

/// `numVariants` reported on the mock path and when no annotator is installed
pub const MOCK_VARIANT_COUNT: usize = 15;

/// Most genes handed to the trial search
pub const MAX_TRIAL_GENES: usize = 5;

/// Which branch produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPath {
    /// Size policy or staging failure; nothing was read from the file
    Mock,
    /// External annotator succeeded
    Annotator,
    /// Annotator unavailable, failed or timed out; fallback table only
    AnnotatorFailed,
    /// Annotator did not run and the raw lines were scanned (opt-in)
    FallbackScan,
}

impl AnalysisPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisPath::Mock => "mock",
            AnalysisPath::Annotator => "annotator",
            AnalysisPath::AnnotatorFailed => "fallback",
            AnalysisPath::FallbackScan => "scan",
        }
    }
}

struct Extraction {
    path: AnalysisPath,
    mapping: DrugMapping,
    variants: Vec<VariantRecord>,
    num_variants: usize,
    genes: Vec<String>,
}

impl Extraction {
    fn mock() -> Self {
        Self {
            path: AnalysisPath::Mock,
            mapping: mapping::fallback_mapping(),
            variants: Vec::new(),
            num_variants: MOCK_VARIANT_COUNT,
            genes: trials::mock_genes(),
        }
    }

    /// A missing tool keeps the mock sentinel count; a run that started and
    /// then failed or timed out reports zero variants.
    fn annotator_failed(err: &AnnotatorError) -> Self {
        let num_variants = match err {
            AnnotatorError::Unavailable { .. } => MOCK_VARIANT_COUNT,
            _ => 0,
        };

        Self {
            path: AnalysisPath::AnnotatorFailed,
            mapping: mapping::fallback_mapping(),
            variants: Vec::new(),
            num_variants,
            genes: trials::mock_genes(),
        }
    }

    fn degraded(&self) -> bool {
        match self.path {
            AnalysisPath::Mock | AnalysisPath::AnnotatorFailed | AnalysisPath::FallbackScan => true,
            AnalysisPath::Annotator => self.mapping.used_fallback,
        }
    }
}

/// Per-run scratch space, removed when dropped
struct Scratch {
    _dir: TempDir,
    vcf_path: PathBuf,
    output_dir: PathBuf,
}

/// Stateless across requests; share one instance behind an `Arc`
pub struct AnalysisPipeline {
    annotator: Arc<dyn VariantAnnotator>,
    trials: Arc<dyn TrialRegistry>,
    agent: Option<Arc<dyn ReportAgent>>,
    scratch_root: PathBuf,
    limits: UploadLimits,
    scan_on_failure: bool,
    scan_limit: usize,
}

impl AnalysisPipeline {
    pub fn new(
        annotator: Arc<dyn VariantAnnotator>,
        trials: Arc<dyn TrialRegistry>,
        scratch_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            annotator,
            trials,
            agent: None,
            scratch_root: scratch_root.into(),
            limits: UploadLimits::default(),
            scan_on_failure: false,
            scan_limit: vcf::DEFAULT_SCAN_LIMIT,
        }
    }

    pub fn with_agent(mut self, agent: Arc<dyn ReportAgent>) -> Self {
        self.agent = Some(agent);
        self
    }

    pub fn with_limits(mut self, limits: UploadLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Scan the raw upload instead of answering with the fallback table alone
    /// when the annotator does not produce a result
    pub fn with_fallback_scan(mut self, enabled: bool) -> Self {
        self.scan_on_failure = enabled;
        self
    }

    pub fn with_scan_limit(mut self, scan_limit: usize) -> Self {
        self.scan_limit = scan_limit;
        self
    }

    /// Wire the production collaborators from configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let annotator = create_annotator(&config.annotator);

        let trials: Arc<dyn TrialRegistry> = if config.trials.enabled {
            let registry = ClinicalTrialsGov::new(&config.trials).map_err(|e| AppError::Configuration {
                message: format!("trial registry client: {}", e),
            })?;
            Arc::new(registry)
        } else {
            Arc::new(DisabledTrialRegistry)
        };

        let mut pipeline = Self::new(annotator, trials, config.scratch_root())
            .with_limits(UploadLimits::from_config(&config.upload))
            .with_fallback_scan(config.upload.scan_on_annotator_failure)
            .with_scan_limit(config.upload.max_scan_lines);

        let agent = HttpReportAgent::from_config(&config.report_agent).map_err(|e| {
            AppError::Configuration {
                message: format!("report agent client: {}", e),
            }
        })?;
        if let Some(agent) = agent {
            pipeline = pipeline.with_agent(Arc::new(agent));
        }

        Ok(pipeline)
    }

    pub fn limits(&self) -> UploadLimits {
        self.limits
    }

    pub fn annotator_name(&self) -> &str {
        self.annotator.name()
    }

    /// Whether the external annotator can currently run
    pub async fn annotator_available(&self) -> bool {
        self.annotator.is_available().await
    }

    /// Run one upload through every stage. `started` is the request start,
    /// used for `processingTime`.
    #[instrument(skip(self, upload, started), fields(file_name = %upload.file_name, size = upload.size()))]
    pub async fn analyze(&self, upload: UploadedFile, label: &str, started: Instant) -> Result<AnalysisResult> {
        let route = intake::validate(&upload.file_name, upload.size(), &self.limits)?;

        let extraction = match route {
            IntakeRoute::MockOnly => {
                info!("Large file detected, returning mock data");
                Extraction::mock()
            }
            IntakeRoute::Full => self.extract(&upload, label).await,
        };

        let trials = self.search_trials(&extraction.genes).await;

        let report = match extraction.path {
            AnalysisPath::Annotator => self.request_report(label, &extraction).await,
            _ => None,
        };

        let degraded = extraction.degraded();
        let elapsed = started.elapsed();
        record_analysis(elapsed.as_secs_f64(), extraction.path.as_str(), extraction.num_variants);

        info!(
            path = extraction.path.as_str(),
            drugs = extraction.mapping.drugs.len(),
            trials = trials.len(),
            variants = extraction.num_variants,
            degraded,
            "Analysis complete"
        );

        Ok(AnalysisResult {
            drugs: extraction.mapping.drugs,
            trials,
            variants: extraction.variants,
            file_name: upload.file_name,
            num_variants: extraction.num_variants,
            processing_time: elapsed.as_millis() as u64,
            degraded,
            report,
        })
    }

    async fn extract(&self, upload: &UploadedFile, label: &str) -> Extraction {
        let scratch = match self.stage(upload).await {
            Ok(scratch) => scratch,
            Err(e) => {
                warn!(error = %e, "Failed to stage upload, returning mock data");
                return Extraction::mock();
            }
        };

        match self
            .annotator
            .annotate(&scratch.vcf_path, &scratch.output_dir, label)
            .await
        {
            Ok(annotation) => {
                record_annotator("success");
                from_annotation(annotation)
            }
            Err(e) if self.scan_on_failure => {
                record_annotator(e.outcome());
                warn!(annotator = self.annotator.name(), error = %e, "Annotator did not run, scanning file");
                self.scan(upload)
            }
            Err(e) => {
                record_annotator(e.outcome());
                warn!(annotator = self.annotator.name(), error = %e, "Annotator did not run, returning fallback data");
                Extraction::annotator_failed(&e)
            }
        }
    }

    async fn stage(&self, upload: &UploadedFile) -> std::io::Result<Scratch> {
        tokio::fs::create_dir_all(&self.scratch_root).await?;
        let dir = tempfile::Builder::new()
            .prefix("vcf_")
            .tempdir_in(&self.scratch_root)?;

        let vcf_path = dir.path().join(intake::staged_file_name(&upload.file_name));
        let output_dir = dir.path().join("output");

        tokio::fs::write(&vcf_path, &upload.bytes).await?;
        tokio::fs::create_dir(&output_dir).await?;

        debug!(dir = %dir.path().display(), "Upload staged");
        Ok(Scratch {
            _dir: dir,
            vcf_path,
            output_dir,
        })
    }

    fn scan(&self, upload: &UploadedFile) -> Extraction {
        let variants = vcf::scan_variants(&upload.text(), self.scan_limit);
        let genes = trial_genes(&variants);

        Extraction {
            path: AnalysisPath::FallbackScan,
            mapping: mapping::fallback_mapping(),
            num_variants: variants.len(),
            variants,
            genes,
        }
    }

    async fn search_trials(&self, genes: &[String]) -> Vec<ClinicalTrial> {
        match self.trials.search(genes).await {
            Ok(found) => {
                record_trial_search(true, found.len());
                found
            }
            Err(e) => {
                record_trial_search(false, 0);
                warn!(error = %e, "Clinical trials search failed, continuing without trials");
                Vec::new()
            }
        }
    }

    async fn request_report(&self, label: &str, extraction: &Extraction) -> Option<String> {
        let agent = self.agent.as_ref()?;
        match agent
            .generate(label, &extraction.variants, &extraction.mapping.drugs)
            .await
        {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "Report agent failed, continuing without report");
                None
            }
        }
    }
}

fn from_annotation(annotation: Annotation) -> Extraction {
    let mapping = mapping::finalize(annotation.recommendations);
    let genes = trial_genes(&annotation.variants);

    Extraction {
        path: AnalysisPath::Annotator,
        mapping,
        num_variants: annotation.variants.len(),
        variants: annotation.variants,
        genes,
    }
}

/// Extracted genes, or the common pharmacogenomic set when there are none
fn trial_genes(variants: &[VariantRecord]) -> Vec<String> {
    let genes = vcf::distinct_genes(variants, MAX_TRIAL_GENES);
    if genes.is_empty() {
        trials::default_genes()
    } else {
        genes
    }
}
