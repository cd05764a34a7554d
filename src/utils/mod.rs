//! Internal utility helpers for date validation, query escaping, and serde helpers.

pub(crate) mod date;
pub(crate) mod query;
pub(crate) mod serde;
