use std::fmt;

use futures::stream::{self, Stream, StreamExt};
use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::config::{DrugEntry, PipelineConfig};
use crate::sources::openfda::OpenFdaClient;
use crate::transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RegulatoryStatus {
    #[serde(rename = "Over-the-Counter")]
    OverTheCounter,
    #[serde(rename = "Prescription")]
    Prescription,
    #[serde(rename = "Other")]
    Other,
    #[default]
    #[serde(rename = "Not Approved in US")]
    NotApprovedInUs,
}

impl RegulatoryStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::OverTheCounter => "Over-the-Counter",
            Self::Prescription => "Prescription",
            Self::Other => "Other",
            Self::NotApprovedInUs => "Not Approved in US",
        }
    }
}

impl fmt::Display for RegulatoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A FAERS report count that either came back from openFDA or did not.
///
/// Unresolved counts are written out as `0`, matching an actual zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportCount {
    Resolved(usize),
    #[default]
    Unresolved,
}

impl ReportCount {
    pub fn value(self) -> usize {
        match self {
            Self::Resolved(n) => n,
            Self::Unresolved => 0,
        }
    }

    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

impl Serialize for ReportCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.value() as u64)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportCounts {
    pub total: ReportCount,
    pub serious: ReportCount,
    pub fatal: ReportCount,
}

/// One row of the per-drug summary table. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrugSummary {
    pub painkiller_id: String,
    pub us_regulatory_status: RegulatoryStatus,
    pub total_reports: ReportCount,
    pub serious_reports: ReportCount,
    pub fatal_reports: ReportCount,
}

/// Outcome of a single synonym label lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelLookup {
    Found(RegulatoryStatus),
    Empty,
    Failed,
}

impl LabelLookup {
    pub fn classification(self) -> Option<RegulatoryStatus> {
        match self {
            Self::Found(status) => Some(status),
            Self::Empty | Self::Failed => None,
        }
    }
}

/// Takes the first classified lookup, polling no further than needed.
pub async fn first_status<S>(lookups: S) -> RegulatoryStatus
where
    S: Stream<Item = LabelLookup>,
{
    let classified =
        lookups.filter_map(|lookup| futures::future::ready(lookup.classification()));
    let mut classified = std::pin::pin!(classified);
    classified.next().await.unwrap_or_default()
}

async fn lookup_label(client: &OpenFdaClient, term: &str) -> LabelLookup {
    match client.label_search_exact(term).await {
        Ok(Some(resp)) => match resp.results.first() {
            Some(label) => {
                let product_type = transform::drug::first_product_type(label);
                debug!(term, product_type, "label lookup matched");
                LabelLookup::Found(transform::drug::regulatory_status_from_product_type(
                    product_type,
                ))
            }
            None => LabelLookup::Empty,
        },
        Ok(None) => LabelLookup::Empty,
        Err(err) => {
            debug!(term, error = %err, "label lookup failed; trying next synonym");
            LabelLookup::Failed
        }
    }
}

pub async fn resolve_status(client: &OpenFdaClient, drug: &DrugEntry) -> RegulatoryStatus {
    let lookups = stream::iter(drug.synonyms.iter()).then(|term| lookup_label(client, term));
    first_status(lookups).await
}

/// Search expressions for total, serious, and fatal report counts.
pub(crate) fn count_queries(drug: &str) -> [String; 3] {
    let mention = super::drug_mention_query(drug);
    [
        mention.clone(),
        format!("{mention} AND serious:1"),
        format!("{mention} AND seriousnessdeath:1"),
    ]
}

/// Resolves the three counts in order; the first failure leaves it and every
/// later count unresolved.
pub async fn resolve_counts(client: &OpenFdaClient, drug: &str) -> ReportCounts {
    let mut resolved = Vec::with_capacity(3);
    for (name, query) in ["total", "serious", "fatal"].into_iter().zip(count_queries(drug)) {
        match client.faers_total(&query).await {
            Ok(n) => resolved.push(ReportCount::Resolved(n)),
            Err(err) => {
                warn!(drug, count = name, error = %err, "count query failed; remaining counts left at 0");
                break;
            }
        }
    }

    let mut resolved = resolved.into_iter();
    ReportCounts {
        total: resolved.next().unwrap_or_default(),
        serious: resolved.next().unwrap_or_default(),
        fatal: resolved.next().unwrap_or_default(),
    }
}

pub async fn summarize_drug(client: &OpenFdaClient, drug: &DrugEntry) -> DrugSummary {
    info!(drug = %drug.id, "processing summary");

    let status = resolve_status(client, drug).await;
    info!(drug = %drug.id, %status, "regulatory status");

    let counts = resolve_counts(client, &drug.id).await;
    info!(
        drug = %drug.id,
        total = counts.total.value(),
        serious = counts.serious.value(),
        fatal = counts.fatal.value(),
        "report counts"
    );

    DrugSummary {
        painkiller_id: drug.id.clone(),
        us_regulatory_status: status,
        total_reports: counts.total,
        serious_reports: counts.serious,
        fatal_reports: counts.fatal,
    }
}

/// Builds one summary row per configured drug, in configured order.
pub async fn run_summary(client: &OpenFdaClient, config: &PipelineConfig) -> Vec<DrugSummary> {
    let mut rows = Vec::with_capacity(config.drugs.len());
    for drug in &config.drugs {
        rows.push(summarize_drug(client, drug).await);
        tokio::time::sleep(config.drug_pause).await;
    }
    rows
}
