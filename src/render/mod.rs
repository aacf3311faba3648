//! Output renderers: delimited files for the pipelines, markdown and JSON for the run report.

pub(crate) mod csv;
pub(crate) mod json;
pub(crate) mod markdown;
