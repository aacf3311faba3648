use std::path::Path;

use serde::Serialize;

use crate::entities::drug_summary::DrugSummary;
use crate::entities::fatal_report::FatalReportDetail;
use crate::error::FaersError;

const DELIMITER: u8 = b';';

pub const SUMMARY_HEADERS: [&str; 5] = [
    "painkiller_id",
    "us_regulatory_status",
    "total_reports",
    "serious_reports",
    "fatal_reports",
];

pub const FATAL_DETAIL_HEADERS: [&str; 8] = [
    "painkiller_id",
    "report_id",
    "is_fatal",
    "report_date",
    "side_effect",
    "patient_age",
    "patient_sex",
    "report_country_code",
];

fn to_delimited<T: Serialize>(headers: &[&str], rows: &[T]) -> Result<Vec<u8>, FaersError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|err| FaersError::Io(err.into_error()))
}

/// Summary table bytes; the header row is always present.
pub fn summary_csv(rows: &[DrugSummary]) -> Result<Vec<u8>, FaersError> {
    to_delimited(&SUMMARY_HEADERS, rows)
}

/// Fatal detail table bytes; empty, without a header, when there are no rows.
pub fn fatal_details_csv(rows: &[FatalReportDetail]) -> Result<Vec<u8>, FaersError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    to_delimited(&FATAL_DETAIL_HEADERS, rows)
}

pub async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), FaersError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}
