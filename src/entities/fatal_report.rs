use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::FaersError;
use crate::sources::openfda::OpenFdaClient;
use crate::transform;

const REPORT_ID_COUNT_FIELD: &str = "safetyreportid.exact";

/// One reaction of a validated fatal report. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FatalReportDetail {
    pub painkiller_id: String,
    pub report_id: String,
    pub is_fatal: bool,
    pub report_date: String,
    pub side_effect: String,
    pub patient_age: String,
    pub patient_sex: String,
    pub report_country_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HarvestStats {
    pub painkiller_id: String,
    pub discovery_failed: bool,
    pub single_drug_candidates: usize,
    pub complete_examples: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FatalHarvest {
    pub rows: Vec<FatalReportDetail>,
    pub stats: Vec<HarvestStats>,
}

pub(crate) fn fatal_candidates_query(drug: &str) -> String {
    format!("{} AND seriousnessdeath:1", super::drug_mention_query(drug))
}

/// Fatal report ids for `drug` whose grouped mention count is exactly one.
///
/// # Errors
///
/// Returns an error when the term-count query fails or openFDA answers with a
/// non-success status other than 404.
pub async fn find_single_drug_candidates(
    client: &OpenFdaClient,
    drug: &str,
    limit: usize,
) -> Result<Vec<String>, FaersError> {
    let resp = client
        .faers_count(&fatal_candidates_query(drug), REPORT_ID_COUNT_FIELD, limit)
        .await?;
    Ok(resp
        .map(|r| transform::adverse_event::single_drug_report_ids(&r.results))
        .unwrap_or_default())
}

/// Fetches one candidate and returns its detail rows when the report is complete.
async fn fetch_complete_example(
    client: &OpenFdaClient,
    drug: &str,
    report_id: &str,
    age_upper_bound: u32,
) -> Option<Vec<FatalReportDetail>> {
    let report = match client.faers_report(report_id).await {
        Ok(Some(report)) => report,
        Ok(None) => {
            debug!(drug, report_id, "report not found");
            return None;
        }
        Err(err) => {
            debug!(drug, report_id, error = %err, "report fetch failed; skipping");
            return None;
        }
    };

    let Some(demographics) = transform::adverse_event::validate_report(&report, age_upper_bound)
    else {
        debug!(drug, report_id, "incomplete report; skipping");
        return None;
    };
    debug!(
        drug,
        report_id,
        age = demographics.age,
        sex = demographics.sex,
        "complete example"
    );
    Some(transform::adverse_event::fatal_detail_rows(
        drug,
        &report,
        &demographics,
    ))
}

pub async fn harvest_drug(
    client: &OpenFdaClient,
    drug: &str,
    config: &PipelineConfig,
) -> (Vec<FatalReportDetail>, HarvestStats) {
    info!(drug, limit = config.candidate_limit, "finding fatal report ids");
    let mut stats = HarvestStats {
        painkiller_id: drug.to_string(),
        ..HarvestStats::default()
    };

    let candidates =
        match find_single_drug_candidates(client, drug, config.candidate_limit).await {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(drug, error = %err, "could not find fatal report ids");
                stats.discovery_failed = true;
                return (Vec::new(), stats);
            }
        };
    stats.single_drug_candidates = candidates.len();
    info!(drug, found = candidates.len(), "single-drug fatal report ids");
    if candidates.is_empty() {
        return (Vec::new(), stats);
    }

    let mut rows = Vec::new();
    for report_id in &candidates {
        if stats.complete_examples >= config.target_examples {
            break;
        }
        if let Some(example) =
            fetch_complete_example(client, drug, report_id, config.age_upper_bound).await
        {
            stats.complete_examples += 1;
            rows.extend(example);
        }
        tokio::time::sleep(config.candidate_pause).await;
    }

    stats.rows = rows.len();
    info!(
        drug,
        examples = stats.complete_examples,
        rows = stats.rows,
        "collected complete examples"
    );
    (rows, stats)
}

/// Harvests fatal detail rows for every configured drug, in configured order.
pub async fn run_fatal_details(client: &OpenFdaClient, config: &PipelineConfig) -> FatalHarvest {
    let mut harvest = FatalHarvest::default();
    for drug in &config.drugs {
        let (rows, stats) = harvest_drug(client, &drug.id, config).await;
        harvest.rows.extend(rows);
        harvest.stats.push(stats);
    }
    harvest
}
