use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entities::adverse_event::{REACTION_COUNT_FIELD, ReactionCount, reaction_counts};
use crate::entities::query::{
    ClassType, drug_event_clause, drug_label_clause, pharm_class_label_clause,
};
use crate::entities::{
    Attribution, FAERS_DISCLAIMER, LABEL_SOURCE, Outcome, check_limit, required_text,
};
use crate::error::FaersError;
use crate::sources::openfda::OpenFdaClient;
use crate::transform::adverse_event::term_counts;
use crate::transform::label::{
    LabelSafetyText, LabelSection, brand_name, effective_date, generic_name, manufacturer,
    split_signals,
};

const LABEL_GENERIC_COUNT_FIELD: &str = "openfda.generic_name.exact";
const MAX_CLASS_LIMIT: usize = 100;
const MAX_SIGNAL_LIMIT: usize = 100;

const SIGNAL_NOTE: &str = "Signal detection here is a best-effort text match between reported \
reaction terms and the label's safety sections. A 'potential signal' only means the term was \
not found in the label text; it may be documented under a different wording.";

// get_drug_label_info

#[derive(Debug, Clone, Deserialize)]
pub struct DrugLabelParams {
    pub drug_name: String,
    #[serde(default)]
    pub sections: Option<Vec<LabelSection>>,
}

/// Flat label object: identity fields, then one key per section.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct DrugLabel(pub Map<String, Value>);

pub async fn drug_label(
    client: &OpenFdaClient,
    params: DrugLabelParams,
) -> Result<Outcome<DrugLabel>, FaersError> {
    let drug = required_text("drug_name", &params.drug_name)?;
    let requested = params.sections.filter(|s| !s.is_empty());

    let resp = client.label_search(&drug_label_clause(&drug), 1).await?;
    let Some(label) = resp.and_then(|r| r.results.into_iter().next()) else {
        return Ok(Outcome::empty(
            format!("No FDA drug label found for '{drug}'."),
            Attribution::Label,
        ));
    };

    let mut out = Map::new();
    out.insert(
        "brand_name".into(),
        brand_name(&label).map(Value::String).unwrap_or(Value::Null),
    );
    out.insert(
        "generic_name".into(),
        generic_name(&label).map(Value::String).unwrap_or(Value::Null),
    );
    out.insert(
        "manufacturer".into(),
        manufacturer(&label).map(Value::String).unwrap_or(Value::Null),
    );
    out.insert(
        "effective_date".into(),
        effective_date(&label).map(Value::String).unwrap_or(Value::Null),
    );
    match requested {
        Some(sections) => {
            for section in sections {
                if let Some(text) = section.text(&label) {
                    out.insert(section.as_str().into(), Value::String(text));
                }
            }
        }
        None => {
            for section in LabelSection::ALL {
                out.insert(
                    section.as_str().into(),
                    section.text(&label).map(Value::String).unwrap_or(Value::Null),
                );
            }
        }
    }
    out.insert("source".into(), Value::String(LABEL_SOURCE.into()));
    Ok(Outcome::Found(DrugLabel(out)))
}

// get_drugs_by_class

#[derive(Debug, Clone, Deserialize)]
pub struct DrugsByClassParams {
    pub pharm_class: String,
    #[serde(default)]
    pub class_type: ClassType,
    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClassMember {
    pub drug: String,
    pub label_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DrugsByClass {
    pub pharmacologic_class: String,
    pub class_type: &'static str,
    pub drugs: Vec<ClassMember>,
    pub source: &'static str,
}

pub async fn drugs_by_class(
    client: &OpenFdaClient,
    params: DrugsByClassParams,
) -> Result<Outcome<DrugsByClass>, FaersError> {
    let class = required_text("pharm_class", &params.pharm_class)?;
    let limit = check_limit(params.limit, 20, MAX_CLASS_LIMIT)?;
    let search = pharm_class_label_clause(params.class_type, &class);

    let resp = client
        .label_count(&search, LABEL_GENERIC_COUNT_FIELD, Some(limit))
        .await?;
    let drugs: Vec<ClassMember> = resp
        .map(|r| term_counts(&r.results))
        .unwrap_or_default()
        .into_iter()
        .map(|t| ClassMember {
            drug: t.term,
            label_count: t.count,
        })
        .collect();
    if drugs.is_empty() {
        return Ok(Outcome::empty(
            format!(
                "No labeled drugs found in pharmacologic class '{class}' ({}).",
                params.class_type.as_str()
            ),
            Attribution::Label,
        ));
    }

    Ok(Outcome::Found(DrugsByClass {
        pharmacologic_class: class,
        class_type: params.class_type.as_str(),
        drugs,
        source: LABEL_SOURCE,
    }))
}

// compare_label_to_reports

#[derive(Debug, Clone, Deserialize)]
pub struct LabelVsReportsParams {
    pub drug_name: String,
    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelVsReports {
    pub drug: String,
    pub reactions_checked: usize,
    pub documented_in_label: Vec<ReactionCount>,
    pub potential_signals: Vec<ReactionCount>,
    pub label_terms_extracted: usize,
    pub note: &'static str,
    pub disclaimer: &'static str,
}

pub async fn label_vs_reports(
    client: &OpenFdaClient,
    params: LabelVsReportsParams,
) -> Result<Outcome<LabelVsReports>, FaersError> {
    let drug = required_text("drug_name", &params.drug_name)?;
    let limit = check_limit(params.limit, 20, MAX_SIGNAL_LIMIT)?;

    let label_search = drug_label_clause(&drug);
    let event_search = drug_event_clause(&drug);
    let (label, counts) = tokio::try_join!(
        client.label_search(&label_search, 1),
        client.event_count(&event_search, REACTION_COUNT_FIELD, Some(limit)),
    )?;

    let Some(label) = label.and_then(|r| r.results.into_iter().next()) else {
        return Ok(Outcome::empty(
            format!("No FDA drug label found for '{drug}'; nothing to compare reports against."),
            Attribution::Faers,
        ));
    };
    let reported = counts.map(|c| term_counts(&c.results)).unwrap_or_default();
    if reported.is_empty() {
        return Ok(Outcome::empty(
            format!("No adverse event reports found for '{drug}'."),
            Attribution::Faers,
        ));
    }

    let safety_text = LabelSafetyText::from_label(&label);
    let reactions_checked = reported.len();
    let split = split_signals(&safety_text, reported);
    Ok(Outcome::Found(LabelVsReports {
        drug,
        reactions_checked,
        documented_in_label: reaction_counts(split.documented),
        potential_signals: reaction_counts(split.potential_signals),
        label_terms_extracted: safety_text.phrase_count(),
        note: SIGNAL_NOTE,
        disclaimer: FAERS_DISCLAIMER,
    }))
}
