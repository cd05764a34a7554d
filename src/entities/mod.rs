//! Tool workflows: parameter records, validation, and the queries each tool issues.

use serde::Serialize;

use crate::error::FaersError;

pub(crate) mod adverse_event;
pub(crate) mod label;
pub(crate) mod population;
pub(crate) mod query;
pub(crate) mod recall;
pub(crate) mod summary;

pub const FAERS_DISCLAIMER: &str = "IMPORTANT: FAERS data are voluntary, unverified reports of adverse events. \
A report does NOT prove that the drug caused the event, and report counts do NOT prove \
relative risk or incidence. Reporting is influenced by media attention, litigation, \
time on market, and duplicate submissions. Always consult the official drug label and \
a healthcare professional before drawing clinical conclusions.";

pub const LABEL_SOURCE: &str = "FDA Structured Product Labeling via openFDA (drug/label endpoint)";
pub const RECALL_SOURCE: &str = "FDA Enforcement Reports via openFDA (drug/enforcement endpoint)";

/// Where a tool's attribution text comes from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Attribution {
    Faers,
    Label,
    Recall,
}

/// A successful "nothing matched" answer, distinct from a failure.
#[derive(Debug, Clone, Serialize)]
pub struct NoResults {
    pub no_results: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<&'static str>,
}

impl NoResults {
    pub(crate) fn new(message: impl Into<String>, attribution: Attribution) -> Self {
        let (disclaimer, source) = match attribution {
            Attribution::Faers => (Some(FAERS_DISCLAIMER), None),
            Attribution::Label => (None, Some(LABEL_SOURCE)),
            Attribution::Recall => (None, Some(RECALL_SOURCE)),
        };
        Self {
            no_results: true,
            message: message.into(),
            disclaimer,
            source,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Outcome<T> {
    Found(T),
    Empty(NoResults),
}

impl<T> Outcome<T> {
    pub(crate) fn empty(message: impl Into<String>, attribution: Attribution) -> Self {
        Self::Empty(NoResults::new(message, attribution))
    }

    #[cfg(test)]
    pub(crate) fn found(self) -> Option<T> {
        match self {
            Self::Found(v) => Some(v),
            Self::Empty(_) => None,
        }
    }
}

/// Rendering metadata a client may use to draw the numbers it accompanies.
#[derive(Debug, Clone, Serialize)]
pub struct ChartHint {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: String,
    pub x_field: &'static str,
    pub y_field: &'static str,
}

impl ChartHint {
    pub(crate) fn new(
        kind: &'static str,
        title: impl Into<String>,
        x_field: &'static str,
        y_field: &'static str,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            x_field,
            y_field,
        }
    }
}

/// Longest accepted free-text parameter, in characters.
pub(crate) const MAX_TEXT_LEN: usize = 200;

fn check_length(field: &str, value: &str) -> Result<(), FaersError> {
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(FaersError::InvalidArgument(format!(
            "{field} must be at most {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(())
}

/// Trims a required text parameter, rejecting blank or oversized values.
pub(crate) fn required_text(field: &str, value: &str) -> Result<String, FaersError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(FaersError::InvalidArgument(format!(
            "{field} must not be empty"
        )));
    }
    check_length(field, v)?;
    Ok(v.to_string())
}

/// Trims an optional text parameter; blank becomes `None`.
pub(crate) fn optional_text(field: &str, value: Option<&str>) -> Result<Option<String>, FaersError> {
    let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    check_length(field, v)?;
    Ok(Some(v.to_string()))
}

/// Applies the default and rejects `0` or anything above `max`.
pub(crate) fn check_limit(value: Option<u64>, default: usize, max: usize) -> Result<usize, FaersError> {
    let Some(raw) = value else {
        return Ok(default);
    };
    if raw == 0 || raw > max as u64 {
        return Err(FaersError::InvalidArgument(format!(
            "limit must be between 1 and {max}"
        )));
    }
    Ok(raw as usize)
}

pub(crate) fn check_skip(value: Option<u64>, max: usize) -> Result<usize, FaersError> {
    let raw = value.unwrap_or(0);
    if raw > max as u64 {
        return Err(FaersError::InvalidArgument(format!(
            "skip must be between 0 and {max}"
        )));
    }
    Ok(raw as usize)
}

pub(crate) fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `part / whole` as a percentage with one decimal; `0.0` when `whole` is zero.
pub(crate) fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_one_decimal(part as f64 * 100.0 / whole as f64)
}

/// Implements `TryFrom<String>` through the enum's `parse` so serde reports
/// the same field-naming message as direct validation.
macro_rules! param_enum_from_str {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = String;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    Self::parse(&value)
                }
            }
        )+
    };
}
pub(crate) use param_enum_from_str;
