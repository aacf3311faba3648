use crate::entities::fatal_report::FatalReportDetail;
use crate::sources::openfda::{FaersEventResult, OpenFdaCountBucket};

const MISSING_FIELD: &str = "N/A";

/// Report-level fields of a FAERS case that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDemographics {
    pub age: u32,
    pub age_raw: String,
    pub sex: &'static str,
    pub country: String,
}

/// Keeps report ids whose grouped mention count is exactly one.
pub fn single_drug_report_ids(buckets: &[OpenFdaCountBucket]) -> Vec<String> {
    buckets
        .iter()
        .filter(|b| b.count == 1)
        .map(|b| b.term.clone())
        .collect()
}

pub fn patient_sex_label(code: &str) -> &'static str {
    if code == "2" { "Female" } else { "Male" }
}

fn parse_onset_age(raw: &str, upper_bound: u32) -> Option<u32> {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u32>().ok().filter(|age| *age <= upper_bound)
}

/// Returns the demographics of a complete report: a digit-only onset age in
/// `[0, upper_bound]` plus `patientsex` and `occurcountry` keys. Those two keys
/// only need to be present; a null sex reads as Male and a null country as
/// an empty code.
pub fn validate_report(
    report: &FaersEventResult,
    upper_bound: u32,
) -> Option<ValidatedDemographics> {
    let patient = report.patient.as_ref()?;
    let age_raw = patient.patientonsetage.as_deref()?;
    let age = parse_onset_age(age_raw, upper_bound)?;
    let sex = patient.patientsex.as_ref()?;
    let country = report.occurcountry.as_ref()?;

    Some(ValidatedDemographics {
        age,
        age_raw: age_raw.to_string(),
        sex: patient_sex_label(sex.as_deref().unwrap_or_default()),
        country: country.clone().unwrap_or_default(),
    })
}

/// One detail row per listed reaction, all sharing the report-level fields.
pub fn fatal_detail_rows(
    drug: &str,
    report: &FaersEventResult,
    demographics: &ValidatedDemographics,
) -> Vec<FatalReportDetail> {
    let report_id = report.safetyreportid.as_deref().unwrap_or(MISSING_FIELD);
    let report_date = report.receiptdate.as_deref().unwrap_or(MISSING_FIELD);

    report
        .patient
        .iter()
        .flat_map(|p| p.reaction.iter())
        .map(|reaction| FatalReportDetail {
            painkiller_id: drug.to_string(),
            report_id: report_id.to_string(),
            is_fatal: true,
            report_date: report_date.to_string(),
            side_effect: reaction
                .reactionmeddrapt
                .clone()
                .unwrap_or_else(|| MISSING_FIELD.to_string()),
            patient_age: demographics.age_raw.clone(),
            patient_sex: demographics.sex.to_string(),
            report_country_code: demographics.country.clone(),
        })
        .collect()
}
