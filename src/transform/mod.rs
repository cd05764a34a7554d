//! Response normalization from upstream openFDA records into tool output shapes.

pub(crate) mod adverse_event;
pub(crate) mod label;
pub(crate) mod recall;
