use std::path::Path;

use serde::Serialize;

use super::drug_summary::DrugSummary;
use super::fatal_report::{FatalHarvest, HarvestStats};

#[derive(Debug, Clone, Serialize)]
pub struct SummaryOutput {
    pub path: String,
    pub rows: Vec<DrugSummary>,
    /// `DRUG:count` entries written as 0 because their query failed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved_counts: Vec<String>,
}

impl SummaryOutput {
    pub fn new(path: &Path, rows: Vec<DrugSummary>) -> Self {
        let unresolved_counts = rows
            .iter()
            .flat_map(|row| {
                [
                    ("total", row.total_reports),
                    ("serious", row.serious_reports),
                    ("fatal", row.fatal_reports),
                ]
                .into_iter()
                .filter(|(_, count)| !count.is_resolved())
                .map(|(name, _)| format!("{}:{name}", row.painkiller_id))
            })
            .collect();
        Self {
            path: path.display().to_string(),
            rows,
            unresolved_counts,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FatalDetailsOutput {
    pub path: String,
    pub rows_written: usize,
    pub drugs: Vec<HarvestStats>,
}

impl FatalDetailsOutput {
    pub fn new(path: &Path, harvest: &FatalHarvest) -> Self {
        Self {
            path: path.display().to_string(),
            rows_written: harvest.rows.len(),
            drugs: harvest.stats.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal_details: Option<FatalDetailsOutput>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::drug_summary::{RegulatoryStatus, ReportCount};

    #[test]
    fn summary_output_lists_unresolved_counts() {
        let rows = vec![
            DrugSummary {
                painkiller_id: "ASPIRIN".into(),
                us_regulatory_status: RegulatoryStatus::Prescription,
                total_reports: ReportCount::Resolved(100),
                serious_reports: ReportCount::Resolved(20),
                fatal_reports: ReportCount::Resolved(5),
            },
            DrugSummary {
                painkiller_id: "NAPROXEN".into(),
                us_regulatory_status: RegulatoryStatus::OverTheCounter,
                total_reports: ReportCount::Resolved(42),
                serious_reports: ReportCount::Unresolved,
                fatal_reports: ReportCount::Unresolved,
            },
        ];
        let output = SummaryOutput::new(Path::new("out/summary.csv"), rows);
        assert_eq!(output.unresolved_counts, vec!["NAPROXEN:serious", "NAPROXEN:fatal"]);
        assert_eq!(output.path, "out/summary.csv");
    }
}
