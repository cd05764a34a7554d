//! Translates RPC tool names into typed calls and runs them.

use std::time::Instant;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::entities::adverse_event::{
    ClassAdverseEventsParams, CompareDrugsParams, DrugsForReactionParams, EventCountsParams,
    EventTrendsParams, SearchAdverseEventsParams, SeriousEventsParams,
};
use crate::entities::label::{DrugLabelParams, DrugsByClassParams, LabelVsReportsParams};
use crate::entities::population::{
    CompareAgeGroupsParams, GeriatricEventsParams, PediatricEventsParams,
};
use crate::entities::recall::{DrugRecallsParams, SearchRecallsParams};
use crate::entities::summary::SafetySummaryParams;
use crate::entities::{adverse_event, label, population, recall, summary};
use crate::error::FaersError;
use crate::sources::openfda::OpenFdaClient;

/// One variant per catalog entry, each carrying its validated parameter record.
#[derive(Debug, Clone)]
pub(crate) enum ToolCall {
    SearchAdverseEvents(SearchAdverseEventsParams),
    SeriousEvents(SeriousEventsParams),
    EventCounts(EventCountsParams),
    EventTrends(EventTrendsParams),
    CompareDrugs(CompareDrugsParams),
    DrugsForReaction(DrugsForReactionParams),
    DrugLabel(DrugLabelParams),
    DrugsByClass(DrugsByClassParams),
    ClassAdverseEvents(ClassAdverseEventsParams),
    LabelVsReports(LabelVsReportsParams),
    PediatricEvents(PediatricEventsParams),
    GeriatricEvents(GeriatricEventsParams),
    CompareAgeGroups(CompareAgeGroupsParams),
    DrugRecalls(DrugRecallsParams),
    SearchRecalls(SearchRecallsParams),
    SafetySummary(SafetySummaryParams),
    DataInfo,
}

/// Decodes tool arguments, prefixing type errors with the offending field.
fn params<T: DeserializeOwned>(args: Option<Map<String, Value>>) -> Result<T, FaersError> {
    serde_path_to_error::deserialize(Value::Object(args.unwrap_or_default())).map_err(|err| {
        let path = err.path().to_string();
        let inner = err.into_inner();
        if path == "." {
            FaersError::InvalidArgument(inner.to_string())
        } else {
            FaersError::InvalidArgument(format!("{path}: {inner}"))
        }
    })
}

impl ToolCall {
    /// Resolves an RPC tool name and decodes its arguments.
    pub(crate) fn parse(name: &str, args: Option<Map<String, Value>>) -> Result<Self, FaersError> {
        let call = match name {
            "search_adverse_events" => Self::SearchAdverseEvents(params(args)?),
            "get_serious_events" => Self::SeriousEvents(params(args)?),
            "get_event_counts" => Self::EventCounts(params(args)?),
            "get_event_trends" => Self::EventTrends(params(args)?),
            "compare_drugs" => Self::CompareDrugs(params(args)?),
            "get_drugs_for_reaction" => Self::DrugsForReaction(params(args)?),
            "get_drug_label_info" => Self::DrugLabel(params(args)?),
            "get_drugs_by_class" => Self::DrugsByClass(params(args)?),
            "get_class_adverse_events" => Self::ClassAdverseEvents(params(args)?),
            "compare_label_to_reports" => Self::LabelVsReports(params(args)?),
            "get_pediatric_events" => Self::PediatricEvents(params(args)?),
            "get_geriatric_events" => Self::GeriatricEvents(params(args)?),
            "compare_age_groups" => Self::CompareAgeGroups(params(args)?),
            "get_drug_recalls" => Self::DrugRecalls(params(args)?),
            "search_recalls" => Self::SearchRecalls(params(args)?),
            "get_safety_summary" => Self::SafetySummary(params(args)?),
            "get_data_info" => Self::DataInfo,
            other => return Err(FaersError::UnknownTool(other.to_string())),
        };
        Ok(call)
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::SearchAdverseEvents(_) => "search_adverse_events",
            Self::SeriousEvents(_) => "get_serious_events",
            Self::EventCounts(_) => "get_event_counts",
            Self::EventTrends(_) => "get_event_trends",
            Self::CompareDrugs(_) => "compare_drugs",
            Self::DrugsForReaction(_) => "get_drugs_for_reaction",
            Self::DrugLabel(_) => "get_drug_label_info",
            Self::DrugsByClass(_) => "get_drugs_by_class",
            Self::ClassAdverseEvents(_) => "get_class_adverse_events",
            Self::LabelVsReports(_) => "compare_label_to_reports",
            Self::PediatricEvents(_) => "get_pediatric_events",
            Self::GeriatricEvents(_) => "get_geriatric_events",
            Self::CompareAgeGroups(_) => "compare_age_groups",
            Self::DrugRecalls(_) => "get_drug_recalls",
            Self::SearchRecalls(_) => "search_recalls",
            Self::SafetySummary(_) => "get_safety_summary",
            Self::DataInfo => "get_data_info",
        }
    }
}

fn to_json<T: Serialize>(value: T) -> Result<Value, FaersError> {
    Ok(serde_json::to_value(value)?)
}

async fn run(client: &OpenFdaClient, call: ToolCall) -> Result<Value, FaersError> {
    match call {
        ToolCall::SearchAdverseEvents(p) => to_json(adverse_event::search(client, p).await?),
        ToolCall::SeriousEvents(p) => to_json(adverse_event::serious_events(client, p).await?),
        ToolCall::EventCounts(p) => to_json(adverse_event::event_counts(client, p).await?),
        ToolCall::EventTrends(p) => to_json(adverse_event::event_trends(client, p).await?),
        ToolCall::CompareDrugs(p) => to_json(adverse_event::compare_drugs(client, p).await?),
        ToolCall::DrugsForReaction(p) => {
            to_json(adverse_event::drugs_for_reaction(client, p).await?)
        }
        ToolCall::DrugLabel(p) => to_json(label::drug_label(client, p).await?),
        ToolCall::DrugsByClass(p) => to_json(label::drugs_by_class(client, p).await?),
        ToolCall::ClassAdverseEvents(p) => {
            to_json(adverse_event::class_adverse_events(client, p).await?)
        }
        ToolCall::LabelVsReports(p) => to_json(label::label_vs_reports(client, p).await?),
        ToolCall::PediatricEvents(p) => to_json(population::pediatric_events(client, p).await?),
        ToolCall::GeriatricEvents(p) => to_json(population::geriatric_events(client, p).await?),
        ToolCall::CompareAgeGroups(p) => {
            to_json(population::compare_age_groups(client, p).await?)
        }
        ToolCall::DrugRecalls(p) => to_json(recall::drug_recalls(client, p).await?),
        ToolCall::SearchRecalls(p) => to_json(recall::search_recalls(client, p).await?),
        ToolCall::SafetySummary(p) => to_json(summary::safety_summary(client, p).await?),
        ToolCall::DataInfo => to_json(summary::data_info()),
    }
}

/// Runs one tool call and emits an audit event for it.
pub(crate) async fn dispatch(client: &OpenFdaClient, call: ToolCall) -> Result<Value, FaersError> {
    let tool = call.name();
    let started = Instant::now();
    let result = run(client, call).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match &result {
        Ok(value) => {
            let outcome = if value.get("no_results").and_then(Value::as_bool) == Some(true) {
                "no_results"
            } else {
                "ok"
            };
            tracing::info!(tool, elapsed_ms, outcome, "tool call");
        }
        Err(err) if err.is_client_fault() => {
            tracing::info!(tool, elapsed_ms, outcome = "rejected", error = %err, "tool call");
        }
        Err(err) => {
            tracing::info!(tool, elapsed_ms, outcome = "error", error = %err, "tool call");
        }
    }
    result
}
