//! Static drug table and run parameters shared by both pipelines.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::FaersError;

pub const DEFAULT_SUMMARY_FILE: &str = "drug_risk_summary.csv";
pub const DEFAULT_DETAILS_FILE: &str = "fatal_report_details.csv";

pub const DEFAULT_CANDIDATE_LIMIT: usize = 50;
pub const DEFAULT_TARGET_EXAMPLES: usize = 10;
pub const DEFAULT_AGE_UPPER_BOUND: u32 = 140;

const DEFAULT_DRUG_PAUSE: Duration = Duration::from_secs(1);
const DEFAULT_CANDIDATE_PAUSE: Duration = Duration::from_millis(300);

// Canonical name first, then label-search synonyms in lookup order.
const PAINKILLERS: &[(&str, &[&str])] = &[
    ("PARACETAMOL", &["ACETAMINOPHEN", "PARACETAMOL"]),
    ("DIPYRONE", &["DIPYRONE", "METAMIZOLE"]),
    ("ASPIRIN", &["ASPIRIN"]),
    ("NAPROXEN", &["NAPROXEN"]),
    ("IBUPROFEN", &["IBUPROFEN"]),
    ("DICLOFENAC", &["DICLOFENAC"]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrugEntry {
    pub id: String,
    pub synonyms: Vec<String>,
}

impl DrugEntry {
    pub fn new(id: &str, synonyms: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Everything a run needs, built once and passed by reference into the
/// resolver and the harvester.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub drugs: Vec<DrugEntry>,
    pub summary_path: PathBuf,
    pub details_path: PathBuf,
    /// Maximum number of report ids requested from the term-count query.
    pub candidate_limit: usize,
    /// Complete examples to collect per drug before moving on.
    pub target_examples: usize,
    pub age_upper_bound: u32,
    pub drug_pause: Duration,
    pub candidate_pause: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            drugs: PAINKILLERS
                .iter()
                .map(|(id, synonyms)| DrugEntry::new(id, synonyms))
                .collect(),
            summary_path: PathBuf::from(DEFAULT_SUMMARY_FILE),
            details_path: PathBuf::from(DEFAULT_DETAILS_FILE),
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
            target_examples: DEFAULT_TARGET_EXAMPLES,
            age_upper_bound: DEFAULT_AGE_UPPER_BOUND,
            drug_pause: DEFAULT_DRUG_PAUSE,
            candidate_pause: DEFAULT_CANDIDATE_PAUSE,
        }
    }
}

impl PipelineConfig {
    /// Restricts the drug table to `names`, keeping the configured order.
    ///
    /// # Errors
    ///
    /// Returns an error when a name is not part of the configured table.
    pub fn only_drugs(mut self, names: &[String]) -> Result<Self, FaersError> {
        if names.is_empty() {
            return Ok(self);
        }

        let wanted = names
            .iter()
            .map(|n| n.trim().to_ascii_uppercase())
            .collect::<Vec<_>>();
        if let Some(unknown) = wanted
            .iter()
            .find(|n| !self.drugs.iter().any(|d| &d.id == *n))
        {
            let known = self
                .drugs
                .iter()
                .map(|d| d.id.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(FaersError::InvalidArgument(format!(
                "Unknown drug '{unknown}'. Available: {known}"
            )));
        }

        self.drugs.retain(|d| wanted.contains(&d.id));
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), FaersError> {
        if self.candidate_limit == 0 || self.candidate_limit > 1000 {
            return Err(FaersError::InvalidArgument(
                "--candidates must be between 1 and 1000".into(),
            ));
        }
        if self.target_examples == 0 {
            return Err(FaersError::InvalidArgument(
                "--examples must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_keeps_configured_order_and_synonyms() {
        let config = PipelineConfig::default();
        let ids = config.drugs.iter().map(|d| d.id.as_str()).collect::<Vec<_>>();
        assert_eq!(
            ids,
            vec![
                "PARACETAMOL",
                "DIPYRONE",
                "ASPIRIN",
                "NAPROXEN",
                "IBUPROFEN",
                "DICLOFENAC"
            ]
        );
        assert_eq!(config.drugs[0].synonyms, vec!["ACETAMINOPHEN", "PARACETAMOL"]);
        assert_eq!(config.candidate_limit, 50);
        assert_eq!(config.target_examples, 10);
        assert_eq!(config.age_upper_bound, 140);
    }

    #[test]
    fn only_drugs_keeps_table_order() {
        let config = PipelineConfig::default()
            .only_drugs(&["ibuprofen".into(), "PARACETAMOL".into()])
            .unwrap();
        let ids = config.drugs.iter().map(|d| d.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["PARACETAMOL", "IBUPROFEN"]);
    }

    #[test]
    fn only_drugs_rejects_unknown_name() {
        let err = PipelineConfig::default()
            .only_drugs(&["KETAMINE".into()])
            .unwrap_err();
        assert!(matches!(err, FaersError::InvalidArgument(_)));
        assert!(err.to_string().contains("KETAMINE"));
    }

    #[test]
    fn validate_rejects_zero_candidates() {
        let config = PipelineConfig {
            candidate_limit: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
