//! Transform adapters from openFDA response shapes into pipeline rows.

pub(crate) mod adverse_event;
pub(crate) mod drug;
