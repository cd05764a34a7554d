use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entities::adverse_event::{REACTION_COUNT_FIELD, ReactionCount, reaction_counts};
use crate::entities::query::{SERIOUS_CLAUSE, drug_event_clause, drug_recall_clause};
use crate::entities::{
    Attribution, ChartHint, FAERS_DISCLAIMER, Outcome, percentage, required_text,
};
use crate::error::FaersError;
use crate::sources::openfda::OpenFdaClient;
use crate::transform::adverse_event::{CodedField, term_counts};

const OUTCOME_COUNT_FIELD: &str = "patient.reaction.reactionoutcome";
const SUMMARY_TOP_REACTIONS: usize = 10;

// get_safety_summary

#[derive(Debug, Clone, Deserialize)]
pub struct SafetySummaryParams {
    pub drug_name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutcomeCount {
    pub outcome: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SafetySummary {
    pub drug: String,
    pub total_reports: u64,
    pub serious_reports: u64,
    pub serious_percentage: f64,
    pub top_reactions: Vec<ReactionCount>,
    pub outcome_breakdown: Vec<OutcomeCount>,
    pub recall_count: u64,
    pub chart_hint: ChartHint,
    pub disclaimer: &'static str,
}

pub async fn safety_summary(
    client: &OpenFdaClient,
    params: SafetySummaryParams,
) -> Result<Outcome<SafetySummary>, FaersError> {
    let drug = required_text("drug_name", &params.drug_name)?;
    let drug_search = drug_event_clause(&drug);
    let serious_search = format!("{drug_search} AND {SERIOUS_CLAUSE}");
    let recall_search = drug_recall_clause(&drug);

    let (total_reports, serious_reports, reactions, outcomes, recall_count) = tokio::try_join!(
        client.event_total(&drug_search),
        client.event_total(&serious_search),
        client.event_count(&drug_search, REACTION_COUNT_FIELD, Some(SUMMARY_TOP_REACTIONS)),
        client.event_count(&drug_search, OUTCOME_COUNT_FIELD, None),
        client.enforcement_total(&recall_search),
    )?;

    if total_reports == 0 && recall_count == 0 {
        return Ok(Outcome::empty(
            format!("No adverse event reports or recalls found for '{drug}'."),
            Attribution::Faers,
        ));
    }

    let top_reactions = reactions
        .map(|r| reaction_counts(term_counts(&r.results)))
        .unwrap_or_default();
    let outcome_breakdown = outcomes
        .map(|o| term_counts(&o.results))
        .unwrap_or_default()
        .into_iter()
        .map(|t| OutcomeCount {
            outcome: CodedField::ReactionOutcome.decode(&t.term),
            count: t.count,
        })
        .collect();

    Ok(Outcome::Found(SafetySummary {
        chart_hint: ChartHint::new(
            "pie",
            format!("{drug}: reaction outcomes"),
            "outcome",
            "count",
        ),
        drug,
        total_reports,
        serious_reports,
        serious_percentage: percentage(serious_reports, total_reports),
        top_reactions,
        outcome_breakdown,
        recall_count,
        disclaimer: FAERS_DISCLAIMER,
    }))
}

// get_data_info

#[derive(Debug, Clone, Serialize)]
pub struct DataSource {
    pub name: &'static str,
    pub endpoint: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub data_sources: Vec<DataSource>,
    pub disclaimer: &'static str,
    pub limitations: Vec<&'static str>,
    pub coding_reference: Map<String, Value>,
}

const LIMITATIONS: &[&str] = &[
    "Reports are voluntary and unverified; a report does not establish causation.",
    "Report counts cannot be used to calculate incidence or compare risk between drugs.",
    "Duplicate and incomplete reports exist; the same case may be reported more than once.",
    "Reporting volume is influenced by media attention, litigation, and time on market.",
    "Reaction terms are coded in MedDRA preferred terms as submitted by the reporter.",
    "Label text matching for signal detection is approximate and may miss reworded terms.",
    "Upstream data are refreshed periodically and may lag recent submissions by months.",
];

fn code_table(field: CodedField, codes: &[&str]) -> Value {
    let mut table = Map::new();
    for code in codes {
        if let Some(label) = field.label(code) {
            table.insert((*code).to_string(), Value::String(label.to_string()));
        }
    }
    Value::Object(table)
}

pub fn data_info() -> DataInfo {
    let mut coding_reference = Map::new();
    coding_reference.insert("sex".into(), code_table(CodedField::Sex, &["0", "1", "2"]));
    coding_reference.insert(
        "outcome".into(),
        code_table(CodedField::ReactionOutcome, &["1", "2", "3", "4", "5", "6"]),
    );
    coding_reference.insert(
        "reporter_type".into(),
        code_table(CodedField::ReporterQualification, &["1", "2", "3", "4", "5"]),
    );
    coding_reference.insert(
        "seriousness".into(),
        code_table(CodedField::Seriousness, &["1", "2"]),
    );
    coding_reference.insert(
        "drug_role".into(),
        code_table(CodedField::DrugCharacterization, &["1", "2", "3"]),
    );
    coding_reference.insert(
        "age_unit".into(),
        code_table(
            CodedField::AgeUnit,
            &["800", "801", "802", "803", "804", "805"],
        ),
    );

    DataInfo {
        name: "faers-mcp",
        version: env!("CARGO_PKG_VERSION"),
        description: "Read-only access to FDA adverse event reports (FAERS), structured drug \
labels, and drug enforcement (recall) reports through the public openFDA API.",
        data_sources: vec![
            DataSource {
                name: "FDA Adverse Event Reporting System (FAERS)",
                endpoint: "drug/event.json",
                description: "Post-marketing adverse event and medication error reports.",
            },
            DataSource {
                name: "Structured Product Labeling",
                endpoint: "drug/label.json",
                description: "Prescribing information sections from FDA drug labels.",
            },
            DataSource {
                name: "FDA Enforcement Reports",
                endpoint: "drug/enforcement.json",
                description: "Drug recalls with classification, status, and reason.",
            },
        ],
        disclaimer: FAERS_DISCLAIMER,
        limitations: LIMITATIONS.to_vec(),
        coding_reference,
    }
}
