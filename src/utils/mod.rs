//! Internal helpers for query escaping and serde shapes.

pub(crate) mod query;
pub(crate) mod serde;
