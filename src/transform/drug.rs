use crate::entities::drug_summary::RegulatoryStatus;
use crate::sources::openfda::LabelResult;

const UNKNOWN_PRODUCT_TYPE: &str = "Unknown";

/// First `openfda.product_type` entry of a label, or `"Unknown"` when the
/// label carries none.
pub fn first_product_type(label: &LabelResult) -> &str {
    label
        .openfda
        .as_ref()
        .and_then(|o| o.product_type.first())
        .unwrap_or(UNKNOWN_PRODUCT_TYPE)
}

pub fn regulatory_status_from_product_type(product_type: &str) -> RegulatoryStatus {
    if product_type.contains("OTC") {
        RegulatoryStatus::OverTheCounter
    } else if product_type.contains("PRESCRIPTION") {
        RegulatoryStatus::Prescription
    } else {
        RegulatoryStatus::Other
    }
}
