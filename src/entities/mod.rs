//! Pipeline workflows: drug summaries, fatal case harvesting, and the run report.

use crate::sources::openfda::OpenFdaClient;

pub(crate) mod drug_summary;
pub(crate) mod fatal_report;
pub(crate) mod run_report;

/// FAERS search clause matching reports that mention `drug` as a medicinal product.
pub(crate) fn drug_mention_query(drug: &str) -> String {
    format!(
        "patient.drug.medicinalproduct.exact:\"{}\"",
        OpenFdaClient::escape_query_value(drug)
    )
}

#[cfg(test)]
mod tests {
    use super::drug_mention_query;

    #[test]
    fn drug_mention_query_quotes_the_name() {
        assert_eq!(
            drug_mention_query("ACETYLSALICYLIC ACID"),
            "patient.drug.medicinalproduct.exact:\"ACETYLSALICYLIC ACID\""
        );
    }
}
