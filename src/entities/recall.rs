use serde::{Deserialize, Serialize};

use crate::entities::query::{RecallClassification, RecallQuery, RecallStatus};
use crate::entities::{Attribution, Outcome, RECALL_SOURCE, check_limit, optional_text, required_text};
use crate::error::FaersError;
use crate::sources::openfda::OpenFdaClient;
use crate::transform::recall::{
    ClassificationCount, Recall, classification_breakdown, from_openfda_enforcement_result,
};

const MAX_RECALL_LIMIT: usize = 100;

// get_drug_recalls

#[derive(Debug, Clone, Deserialize)]
pub struct DrugRecallsParams {
    pub drug_name: String,
    #[serde(default)]
    pub classification: Option<RecallClassification>,
    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DrugRecalls {
    pub drug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<&'static str>,
    pub total_found: u64,
    pub recalls: Vec<Recall>,
    pub source: &'static str,
}

pub async fn drug_recalls(
    client: &OpenFdaClient,
    params: DrugRecallsParams,
) -> Result<Outcome<DrugRecalls>, FaersError> {
    let drug = required_text("drug_name", &params.drug_name)?;
    let limit = check_limit(params.limit, 10, MAX_RECALL_LIMIT)?;
    let search = RecallQuery {
        drug: Some(&drug),
        classification: params.classification,
        ..RecallQuery::default()
    }
    .build()?;

    let resp = client.enforcement_search(&search, limit, 0).await?;
    let Some(resp) = resp.filter(|r| !r.results.is_empty()) else {
        return Ok(Outcome::empty(
            format!("No FDA enforcement (recall) records found for '{drug}'."),
            Attribution::Recall,
        ));
    };

    Ok(Outcome::Found(DrugRecalls {
        drug,
        classification: params.classification.map(RecallClassification::as_str),
        total_found: resp.meta.results.total,
        recalls: resp
            .results
            .iter()
            .map(from_openfda_enforcement_result)
            .collect(),
        source: RECALL_SOURCE,
    }))
}

// search_recalls

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRecallsParams {
    #[serde(default)]
    pub classification: Option<RecallClassification>,
    #[serde(default)]
    pub status: Option<RecallStatus>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RecallFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecallSearch {
    pub filters: RecallFilters,
    pub total_found: u64,
    pub recalls: Vec<Recall>,
    pub classification_breakdown: Vec<ClassificationCount>,
    pub source: &'static str,
}

pub async fn search_recalls(
    client: &OpenFdaClient,
    params: SearchRecallsParams,
) -> Result<Outcome<RecallSearch>, FaersError> {
    let limit = check_limit(params.limit, 10, MAX_RECALL_LIMIT)?;
    let filters = RecallFilters {
        classification: params.classification.map(RecallClassification::as_str),
        status: params.status.map(RecallStatus::as_str),
        reason: optional_text("reason", params.reason.as_deref())?,
        date_from: optional_text("date_from", params.date_from.as_deref())?,
        date_to: optional_text("date_to", params.date_to.as_deref())?,
    };
    let search = RecallQuery {
        classification: params.classification,
        status: params.status,
        reason: filters.reason.as_deref(),
        date_from: filters.date_from.as_deref(),
        date_to: filters.date_to.as_deref(),
        ..RecallQuery::default()
    }
    .build()?;

    let resp = client.enforcement_search(&search, limit, 0).await?;
    let Some(resp) = resp.filter(|r| !r.results.is_empty()) else {
        return Ok(Outcome::empty(
            "No FDA enforcement (recall) records match the given filters.",
            Attribution::Recall,
        ));
    };

    let recalls: Vec<Recall> = resp
        .results
        .iter()
        .map(from_openfda_enforcement_result)
        .collect();
    Ok(Outcome::Found(RecallSearch {
        classification_breakdown: classification_breakdown(&recalls),
        filters,
        total_found: resp.meta.results.total,
        recalls,
        source: RECALL_SOURCE,
    }))
}
