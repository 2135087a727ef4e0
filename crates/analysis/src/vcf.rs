//! Fallback variant scan
//!
//! A deliberately shallow read of raw VCF text: header lines are skipped and
//! the first data lines are split on tabs. No header, contig, or genotype
//! validation is attempted.

use omnyla_common::VariantRecord;
use std::collections::BTreeMap;

/// Data lines read by default
pub const DEFAULT_SCAN_LIMIT: usize = 100;

// Fixed VCF column positions
const CHROM: usize = 0;
const POS: usize = 1;
const REF: usize = 3;
const ALT: usize = 4;
const INFO: usize = 7;

/// Columns a line needs before it is considered a record
const MIN_COLUMNS: usize = 5;

/// Parsed INFO column: `KEY=value` pairs and bare flags
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InfoField<'a> {
    entries: BTreeMap<&'a str, Option<&'a str>>,
}

impl<'a> InfoField<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let entries = raw
            .split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty() && *entry != ".")
            .map(|entry| match entry.split_once('=') {
                Some((key, value)) => (key, Some(value)),
                None => (entry, None),
            })
            .collect();
        Self { entries }
    }

    /// Value of a `KEY=value` entry
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.entries.get(key).copied().flatten()
    }

    /// `GENE=` annotation
    pub fn gene(&self) -> Option<&'a str> {
        self.get("GENE").filter(|gene| !gene.is_empty())
    }

    /// Impact from the first `ANN=` entry (second `|`-separated field)
    pub fn impact(&self) -> Option<&'a str> {
        self.get("ANN")
            .and_then(|ann| ann.split('|').nth(1))
            .filter(|impact| !impact.is_empty())
    }
}

/// Scan at most `limit` data lines into variant records
pub fn scan_variants(content: &str, limit: usize) -> Vec<VariantRecord> {
    let records: Vec<VariantRecord> = content
        .lines()
        .filter(|line| !line.starts_with('#') && !line.trim().is_empty())
        .take(limit)
        .filter_map(parse_line)
        .collect();

    tracing::debug!(records = records.len(), limit, "Fallback scan complete");
    records
}

fn parse_line(line: &str) -> Option<VariantRecord> {
    let fields: Vec<&str> = line.trim_end_matches('\r').split('\t').collect();
    if fields.len() < MIN_COLUMNS {
        return None;
    }

    let info = InfoField::parse(fields.get(INFO).copied().unwrap_or_default());

    Some(VariantRecord {
        chromosome: fields[CHROM].to_string(),
        position: fields[POS].trim().parse().unwrap_or(0),
        reference: fields[REF].to_string(),
        alternate: fields[ALT].to_string(),
        gene: info.gene().map(str::to_string),
        impact: info.impact().map(str::to_string),
    })
}

/// Ordered, de-duplicated gene symbols, capped at `max`
pub fn distinct_genes(variants: &[VariantRecord], max: usize) -> Vec<String> {
    let mut genes: Vec<String> = Vec::new();
    for gene in variants.iter().filter_map(|v| v.gene.as_deref()) {
        if genes.len() == max {
            break;
        }
        if !gene.is_empty() && !genes.iter().any(|g| g == gene) {
            genes.push(gene.to_string());
        }
    }
    genes
}
