use std::collections::BTreeMap;

use serde::Serialize;

use crate::sources::openfda::EnforcementResult;
use crate::utils::date::iso_from_yyyymmdd;

#[derive(Debug, Clone, Serialize)]
pub struct Recall {
    pub recall_number: Option<String>,
    pub classification: Option<String>,
    pub status: Option<String>,
    pub product_description: Option<String>,
    pub reason_for_recall: Option<String>,
    pub recalling_firm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voluntary_mandated: Option<String>,
    pub recall_initiation_date: Option<String>,
    pub report_date: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub brand_names: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub generic_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationCount {
    pub classification: String,
    pub count: u64,
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn from_openfda_enforcement_result(r: &EnforcementResult) -> Recall {
    Recall {
        recall_number: clean(&r.recall_number),
        classification: clean(&r.classification),
        status: clean(&r.status),
        product_description: clean(&r.product_description),
        reason_for_recall: clean(&r.reason_for_recall),
        recalling_firm: clean(&r.recalling_firm),
        distribution_pattern: clean(&r.distribution_pattern),
        voluntary_mandated: clean(&r.voluntary_mandated),
        recall_initiation_date: iso_from_yyyymmdd(r.recall_initiation_date.as_deref()),
        report_date: iso_from_yyyymmdd(r.report_date.as_deref()),
        brand_names: r.openfda.brand_name.clone(),
        generic_names: r.openfda.generic_name.clone(),
    }
}

/// Counts the returned recalls per classification, ordered by class name.
pub fn classification_breakdown(recalls: &[Recall]) -> Vec<ClassificationCount> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for r in recalls {
        let key = r
            .classification
            .clone()
            .unwrap_or_else(|| "Unclassified".to_string());
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(classification, count)| ClassificationCount {
            classification,
            count,
        })
        .collect()
}
