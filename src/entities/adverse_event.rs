use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entities::query::{EventQuery, SeriousOutcome, drug_event_clause, reaction_clause};
use crate::entities::{
    Attribution, ChartHint, FAERS_DISCLAIMER, Outcome, check_limit, check_skip,
    optional_text, param_enum_from_str, percentage, required_text,
};
use crate::error::FaersError;
use crate::sources::openfda::OpenFdaClient;
use crate::transform::adverse_event::{
    CodedField, Report, TermCount, TrendInterval, TrendPoint, bucket_trends,
    report_from_openfda, term_counts,
};

pub(crate) const REACTION_COUNT_FIELD: &str = "patient.reaction.reactionmeddrapt.exact";
const GENERIC_NAME_COUNT_FIELD: &str = "patient.drug.openfda.generic_name.exact";
const RECEIVEDATE_FIELD: &str = "receivedate";

const MAX_LISTING_LIMIT: usize = 100;
const MAX_SKIP: usize = 25_000;
const MAX_COMPARE_LIMIT: usize = 50;
const MIN_COMPARE_DRUGS: usize = 2;
const MAX_COMPARE_DRUGS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReactionCount {
    pub reaction: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DrugCount {
    pub drug: String,
    pub count: u64,
}

pub(crate) fn reaction_counts(rows: Vec<TermCount>) -> Vec<ReactionCount> {
    rows.into_iter()
        .map(|r| ReactionCount {
            reaction: r.term,
            count: r.count,
        })
        .collect()
}

// search_adverse_events

#[derive(Debug, Clone, Deserialize)]
pub struct SearchAdverseEventsParams {
    pub drug_name: String,
    #[serde(default)]
    pub reaction: Option<String>,
    #[serde(default)]
    pub serious_only: bool,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub skip: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdverseEventListing {
    pub drug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_filter: Option<String>,
    pub total_found: u64,
    pub returned: usize,
    pub reports: Vec<Report>,
    pub disclaimer: &'static str,
}

pub async fn search(
    client: &OpenFdaClient,
    params: SearchAdverseEventsParams,
) -> Result<Outcome<AdverseEventListing>, FaersError> {
    let drug = required_text("drug_name", &params.drug_name)?;
    let limit = check_limit(params.limit, 10, MAX_LISTING_LIMIT)?;
    let skip = check_skip(params.skip, MAX_SKIP)?;
    let reaction = optional_text("reaction", params.reaction.as_deref())?;
    let search = EventQuery {
        drug: Some(&drug),
        reaction: reaction.as_deref(),
        serious_only: params.serious_only,
        date_from: params.date_from.as_deref(),
        date_to: params.date_to.as_deref(),
        ..EventQuery::default()
    }
    .build()?;

    let Some(resp) = client.event_search(&search, limit, skip).await? else {
        return Ok(no_reports(&drug));
    };
    if resp.results.is_empty() {
        return Ok(no_reports(&drug));
    }

    let reports: Vec<Report> = resp.results.into_iter().map(report_from_openfda).collect();
    Ok(Outcome::Found(AdverseEventListing {
        drug,
        outcome_filter: None,
        total_found: resp.meta.results.total,
        returned: reports.len(),
        reports,
        disclaimer: FAERS_DISCLAIMER,
    }))
}

fn no_reports<T>(drug: &str) -> Outcome<T> {
    Outcome::empty(
        format!("No adverse event reports found for '{drug}' with the given filters."),
        Attribution::Faers,
    )
}

// get_serious_events

#[derive(Debug, Clone, Deserialize)]
pub struct SeriousEventsParams {
    pub drug_name: String,
    #[serde(default)]
    pub outcome_type: Option<SeriousOutcome>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub limit: Option<u64>,
}

pub async fn serious_events(
    client: &OpenFdaClient,
    params: SeriousEventsParams,
) -> Result<Outcome<AdverseEventListing>, FaersError> {
    let drug = required_text("drug_name", &params.drug_name)?;
    let limit = check_limit(params.limit, 10, MAX_LISTING_LIMIT)?;
    let search = EventQuery {
        drug: Some(&drug),
        serious_only: true,
        outcome: params.outcome_type,
        date_from: params.date_from.as_deref(),
        date_to: params.date_to.as_deref(),
        ..EventQuery::default()
    }
    .build()?;

    let outcome_filter = params
        .outcome_type
        .map(|o| o.as_str().to_string())
        .unwrap_or_else(|| "any serious outcome".to_string());

    let Some(resp) = client.event_search(&search, limit, 0).await? else {
        return Ok(no_reports(&drug));
    };
    if resp.results.is_empty() {
        return Ok(no_reports(&drug));
    }

    let reports: Vec<Report> = resp.results.into_iter().map(report_from_openfda).collect();
    Ok(Outcome::Found(AdverseEventListing {
        drug,
        outcome_filter: Some(outcome_filter),
        total_found: resp.meta.results.total,
        returned: reports.len(),
        reports,
        disclaimer: FAERS_DISCLAIMER,
    }))
}

// get_event_counts

/// The report attribute `get_event_counts` aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum GroupBy {
    #[default]
    Reaction,
    Sex,
    Outcome,
    ReporterType,
    Country,
    Seriousness,
}

impl GroupBy {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "reaction" => Ok(Self::Reaction),
            "sex" => Ok(Self::Sex),
            "outcome" => Ok(Self::Outcome),
            "reporter_type" => Ok(Self::ReporterType),
            "country" => Ok(Self::Country),
            "seriousness" => Ok(Self::Seriousness),
            other => Err(format!(
                "group_by '{other}' is not recognized. Expected one of: reaction, sex, outcome, reporter_type, country, seriousness"
            )),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reaction => "reaction",
            Self::Sex => "sex",
            Self::Outcome => "outcome",
            Self::ReporterType => "reporter_type",
            Self::Country => "country",
            Self::Seriousness => "seriousness",
        }
    }

    fn count_field(self) -> &'static str {
        match self {
            Self::Reaction => REACTION_COUNT_FIELD,
            Self::Sex => "patient.patientsex",
            Self::Outcome => "patient.reaction.reactionoutcome",
            Self::ReporterType => "primarysource.qualification",
            Self::Country => "occurcountry.exact",
            Self::Seriousness => "serious",
        }
    }

    fn decoder(self) -> Option<CodedField> {
        match self {
            Self::Sex => Some(CodedField::Sex),
            Self::Outcome => Some(CodedField::ReactionOutcome),
            Self::ReporterType => Some(CodedField::ReporterQualification),
            Self::Seriousness => Some(CodedField::Seriousness),
            Self::Reaction | Self::Country => None,
        }
    }
}

param_enum_from_str!(GroupBy);

#[derive(Debug, Clone, Deserialize)]
pub struct EventCountsParams {
    pub drug_name: String,
    #[serde(default)]
    pub group_by: GroupBy,
    #[serde(default)]
    pub serious_only: bool,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventCounts {
    pub drug: String,
    pub grouped_by: &'static str,
    /// Each row is `{<grouped_by>: label, count}`.
    pub results: Vec<Map<String, Value>>,
    pub disclaimer: &'static str,
}

pub async fn event_counts(
    client: &OpenFdaClient,
    params: EventCountsParams,
) -> Result<Outcome<EventCounts>, FaersError> {
    let drug = required_text("drug_name", &params.drug_name)?;
    let limit = check_limit(params.limit, 10, MAX_LISTING_LIMIT)?;
    let group_by = params.group_by;
    let search = EventQuery {
        drug: Some(&drug),
        serious_only: params.serious_only,
        date_from: params.date_from.as_deref(),
        date_to: params.date_to.as_deref(),
        ..EventQuery::default()
    }
    .build()?;

    let resp = client
        .event_count(&search, group_by.count_field(), Some(limit))
        .await?;
    let Some(resp) = resp.filter(|r| !r.results.is_empty()) else {
        return Ok(no_reports(&drug));
    };

    let decoder = group_by.decoder();
    let results = resp
        .results
        .iter()
        .filter_map(|b| {
            let term = b.term.as_ref()?;
            let label = match decoder {
                Some(d) => d.decode_term(term),
                None => term.clone(),
            };
            let mut row = Map::new();
            row.insert(group_by.as_str().to_string(), label);
            row.insert("count".to_string(), Value::from(b.count));
            Some(row)
        })
        .take(limit)
        .collect();

    Ok(Outcome::Found(EventCounts {
        drug,
        grouped_by: group_by.as_str(),
        results,
        disclaimer: FAERS_DISCLAIMER,
    }))
}

// get_event_trends

#[derive(Debug, Clone, Deserialize)]
pub struct EventTrendsParams {
    pub drug_name: String,
    #[serde(default)]
    pub reaction: Option<String>,
    #[serde(default)]
    pub interval: TrendInterval,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventTrends {
    pub drug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reaction: Option<String>,
    pub interval: &'static str,
    pub total_reports: u64,
    pub trends: Vec<TrendPoint>,
    pub chart_hint: ChartHint,
    pub disclaimer: &'static str,
}

pub async fn event_trends(
    client: &OpenFdaClient,
    params: EventTrendsParams,
) -> Result<Outcome<EventTrends>, FaersError> {
    let drug = required_text("drug_name", &params.drug_name)?;
    let reaction = optional_text("reaction", params.reaction.as_deref())?;
    let search = EventQuery {
        drug: Some(&drug),
        reaction: reaction.as_deref(),
        date_from: params.date_from.as_deref(),
        date_to: params.date_to.as_deref(),
        ..EventQuery::default()
    }
    .build()?;

    let resp = client.event_count(&search, RECEIVEDATE_FIELD, None).await?;
    let Some(resp) = resp else {
        return Ok(no_reports(&drug));
    };
    let trends = bucket_trends(&resp.results, params.interval);
    if trends.is_empty() {
        return Ok(no_reports(&drug));
    }

    let total_reports = trends.iter().map(|t| t.count).sum();
    let title = match reaction.as_deref() {
        Some(r) => format!("{drug} reports mentioning {r} per {}", params.interval.as_str()),
        None => format!("{drug} adverse event reports per {}", params.interval.as_str()),
    };
    Ok(Outcome::Found(EventTrends {
        drug,
        reaction,
        interval: params.interval.as_str(),
        total_reports,
        trends,
        chart_hint: ChartHint::new("line", title, "period", "count"),
        disclaimer: FAERS_DISCLAIMER,
    }))
}

// compare_drugs

#[derive(Debug, Clone, Deserialize)]
pub struct CompareDrugsParams {
    pub drug_names: Vec<String>,
    #[serde(default)]
    pub reaction: Option<String>,
    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DrugProfile {
    pub drug: String,
    pub total_reports: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reaction_reports: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reaction_percentage: Option<f64>,
    pub top_reactions: Vec<ReactionCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DrugComparison {
    pub drugs: Vec<DrugProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reaction: Option<String>,
    pub shared_reactions: Vec<String>,
    pub chart_hint: ChartHint,
    pub disclaimer: &'static str,
}

fn validate_drug_names(raw: &[String]) -> Result<Vec<String>, FaersError> {
    if raw.len() < MIN_COMPARE_DRUGS || raw.len() > MAX_COMPARE_DRUGS {
        return Err(FaersError::InvalidArgument(format!(
            "drug_names must contain between {MIN_COMPARE_DRUGS} and {MAX_COMPARE_DRUGS} drug names"
        )));
    }
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());
    for name in raw {
        let name = required_text("drug_names", name)?;
        if !seen.insert(name.to_ascii_lowercase()) {
            return Err(FaersError::InvalidArgument(format!(
                "drug_names contains '{name}' more than once"
            )));
        }
        out.push(name);
    }
    Ok(out)
}

async fn drug_profile(
    client: &OpenFdaClient,
    drug: String,
    reaction: Option<&str>,
    limit: usize,
) -> Result<DrugProfile, FaersError> {
    let drug_search = drug_event_clause(&drug);
    let reaction_search = reaction.map(|r| format!("{drug_search} AND {}", reaction_clause(r)));

    let reaction_total = async {
        match reaction_search.as_deref() {
            Some(q) => client.event_total(q).await.map(Some),
            None => Ok(None),
        }
    };
    let (total_reports, counts, reaction_reports) = tokio::try_join!(
        client.event_total(&drug_search),
        client.event_count(&drug_search, REACTION_COUNT_FIELD, Some(limit)),
        reaction_total,
    )?;

    let top_reactions = counts
        .map(|c| reaction_counts(term_counts(&c.results)))
        .unwrap_or_default();
    Ok(DrugProfile {
        drug,
        total_reports,
        reaction_percentage: reaction_reports.map(|n| percentage(n, total_reports)),
        reaction_reports,
        top_reactions,
    })
}

pub async fn compare_drugs(
    client: &OpenFdaClient,
    params: CompareDrugsParams,
) -> Result<Outcome<DrugComparison>, FaersError> {
    let drugs = validate_drug_names(&params.drug_names)?;
    let limit = check_limit(params.limit, 10, MAX_COMPARE_LIMIT)?;
    let reaction = optional_text("reaction", params.reaction.as_deref())?;

    let profiles = futures::future::try_join_all(
        drugs
            .into_iter()
            .map(|drug| drug_profile(client, drug, reaction.as_deref(), limit)),
    )
    .await?;

    if profiles.iter().all(|p| p.total_reports == 0) {
        return Ok(Outcome::empty(
            "No adverse event reports found for any of the requested drugs.",
            Attribution::Faers,
        ));
    }

    let shared_reactions = match profiles.split_first() {
        Some((first, rest)) => first
            .top_reactions
            .iter()
            .map(|r| r.reaction.clone())
            .filter(|term| {
                rest.iter()
                    .all(|p| p.top_reactions.iter().any(|r| &r.reaction == term))
            })
            .collect(),
        None => Vec::new(),
    };

    let title = match reaction.as_deref() {
        Some(r) => format!("Share of reports mentioning {r}"),
        None => "Total adverse event reports by drug".to_string(),
    };
    let y_field = if reaction.is_some() {
        "reaction_percentage"
    } else {
        "total_reports"
    };
    Ok(Outcome::Found(DrugComparison {
        drugs: profiles,
        reaction,
        shared_reactions,
        chart_hint: ChartHint::new("bar", title, "drug", y_field),
        disclaimer: FAERS_DISCLAIMER,
    }))
}

// get_drugs_for_reaction

#[derive(Debug, Clone, Deserialize)]
pub struct DrugsForReactionParams {
    pub reaction: String,
    #[serde(default)]
    pub serious_only: bool,
    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DrugsForReaction {
    pub reaction: String,
    pub results: Vec<DrugCount>,
    pub disclaimer: &'static str,
}

pub async fn drugs_for_reaction(
    client: &OpenFdaClient,
    params: DrugsForReactionParams,
) -> Result<Outcome<DrugsForReaction>, FaersError> {
    let reaction = required_text("reaction", &params.reaction)?;
    let limit = check_limit(params.limit, 10, MAX_LISTING_LIMIT)?;
    let search = EventQuery {
        reaction: Some(&reaction),
        serious_only: params.serious_only,
        ..EventQuery::default()
    }
    .build()?;

    let resp = client
        .event_count(&search, GENERIC_NAME_COUNT_FIELD, Some(limit))
        .await?;
    let results: Vec<DrugCount> = resp
        .map(|r| term_counts(&r.results))
        .unwrap_or_default()
        .into_iter()
        .map(|t| DrugCount {
            drug: t.term,
            count: t.count,
        })
        .collect();
    if results.is_empty() {
        return Ok(Outcome::empty(
            format!("No drugs found with reports of '{reaction}'."),
            Attribution::Faers,
        ));
    }

    Ok(Outcome::Found(DrugsForReaction {
        reaction,
        results,
        disclaimer: FAERS_DISCLAIMER,
    }))
}

// get_class_adverse_events

#[derive(Debug, Clone, Deserialize)]
pub struct ClassAdverseEventsParams {
    pub pharm_class: String,
    #[serde(default)]
    pub serious_only: bool,
    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassAdverseEvents {
    pub pharmacologic_class: String,
    pub results: Vec<ReactionCount>,
    pub disclaimer: &'static str,
}

pub async fn class_adverse_events(
    client: &OpenFdaClient,
    params: ClassAdverseEventsParams,
) -> Result<Outcome<ClassAdverseEvents>, FaersError> {
    let class = required_text("pharm_class", &params.pharm_class)?;
    let limit = check_limit(params.limit, 10, MAX_LISTING_LIMIT)?;
    let search = EventQuery {
        pharm_class: Some(&class),
        serious_only: params.serious_only,
        ..EventQuery::default()
    }
    .build()?;

    let resp = client
        .event_count(&search, REACTION_COUNT_FIELD, Some(limit))
        .await?;
    let results = resp
        .map(|r| reaction_counts(term_counts(&r.results)))
        .unwrap_or_default();
    if results.is_empty() {
        return Ok(Outcome::empty(
            format!("No adverse event reports found for pharmacologic class '{class}'."),
            Attribution::Faers,
        ));
    }

    Ok(Outcome::Found(ClassAdverseEvents {
        pharmacologic_class: class,
        results,
        disclaimer: FAERS_DISCLAIMER,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::api_key::ApiKeyProvider;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenFdaClient {
        OpenFdaClient::with_base(server.uri(), ApiKeyProvider::fixed(None)).unwrap()
    }

    fn parse<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn event_counts_decodes_sex_codes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/event.json"))
            .and(query_param("count", "patient.patientsex"))
            .and(query_param("limit", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"term": 1, "count": 10}, {"term": 2, "count": 8}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let out = event_counts(
            &client(&server),
            parse(serde_json::json!({"drug_name": "ibuprofen", "group_by": "sex", "limit": 3})),
        )
        .await
        .unwrap();
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["drug"], "ibuprofen");
        assert_eq!(json["grouped_by"], "sex");
        assert_eq!(
            json["results"],
            serde_json::json!([{"sex": "Male", "count": 10}, {"sex": "Female", "count": 8}])
        );
        assert!(!json["disclaimer"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn event_counts_passes_unmapped_outcome_codes_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/event.json"))
            .and(query_param("count", "patient.reaction.reactionoutcome"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"term": 5, "count": 4}, {"term": 9, "count": 1}]
            })))
            .mount(&server)
            .await;

        let out = event_counts(
            &client(&server),
            parse(serde_json::json!({"drug_name": "warfarin", "group_by": "outcome"})),
        )
        .await
        .unwrap();
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["results"][0]["outcome"], "Fatal");
        assert_eq!(json["results"][1]["outcome"], 9);
    }

    #[tokio::test]
    async fn search_maps_reports_and_total() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/event.json"))
            .and(query_param("limit", "2"))
            .and(query_param("skip", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meta": {"results": {"skip": 0, "limit": 2, "total": 812}},
                "results": [
                    {"safetyreportid": "1", "serious": "1", "receivedate": "20230102",
                     "patient": {"reaction": [{"reactionmeddrapt": "Rash"}]}},
                    {"safetyreportid": "2", "serious": "2", "receivedate": "20230103"}
                ]
            })))
            .mount(&server)
            .await;

        let out = search(
            &client(&server),
            parse(serde_json::json!({"drug_name": "aspirin", "limit": 2})),
        )
        .await
        .unwrap()
        .found()
        .expect("reports");
        assert_eq!(out.total_found, 812);
        assert_eq!(out.returned, 2);
        assert_eq!(out.reports[0].receive_date.as_deref(), Some("2023-01-02"));
        assert_eq!(out.reports[0].reactions, vec!["Rash"]);
        assert!(!out.reports[1].serious);
    }

    #[tokio::test]
    async fn search_not_found_is_structured_no_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {"code": "NOT_FOUND", "message": "No matches found!"}
            })))
            .mount(&server)
            .await;

        let out = search(
            &client(&server),
            parse(serde_json::json!({"drug_name": "notadrug"})),
        )
        .await
        .unwrap();
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["no_results"], true);
        assert!(json["message"].as_str().unwrap().contains("notadrug"));
        assert!(json["disclaimer"].as_str().unwrap().contains("IMPORTANT"));
    }

    #[tokio::test]
    async fn validation_runs_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let client = client(&server);

        let err = search(&client, parse(serde_json::json!({"drug_name": "  "})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("empty"));

        let err = search(
            &client,
            parse(serde_json::json!({"drug_name": "aspirin", "limit": 200})),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("limit"));

        let err = search(
            &client,
            parse(serde_json::json!({"drug_name": "aspirin", "date_from": "2020"})),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("date_from"));

        let err = compare_drugs(&client, parse(serde_json::json!({"drug_names": ["aspirin"]})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("drug_names"));
    }

    #[tokio::test]
    async fn serious_events_adds_category_clause() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/event.json"))
            .and(query_param(
                "search",
                "(patient.drug.openfda.brand_name:\"warfarin\" OR patient.drug.openfda.generic_name:\"warfarin\" OR patient.drug.medicinalproduct:\"warfarin\") AND serious:1 AND seriousnessdeath:1",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meta": {"results": {"total": 1}},
                "results": [{"safetyreportid": "9", "serious": 1, "seriousnessdeath": 1}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let out = serious_events(
            &client(&server),
            parse(serde_json::json!({"drug_name": "warfarin", "outcome_type": "death"})),
        )
        .await
        .unwrap()
        .found()
        .expect("reports");
        assert_eq!(out.outcome_filter.as_deref(), Some("death"));
        assert!(out.reports[0].seriousness.death);
    }

    #[tokio::test]
    async fn trends_bucket_daily_counts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/event.json"))
            .and(query_param("count", "receivedate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"time": "20190110", "count": 2},
                    {"time": "20190220", "count": 3},
                    {"time": "20200101", "count": 7}
                ]
            })))
            .mount(&server)
            .await;

        let out = event_trends(
            &client(&server),
            parse(serde_json::json!({"drug_name": "metformin", "interval": "year"})),
        )
        .await
        .unwrap()
        .found()
        .expect("trends");
        assert_eq!(out.total_reports, 12);
        assert_eq!(out.trends.len(), 2);
        assert_eq!(out.trends[0].period, "2019");
        assert_eq!(out.trends[0].count, 5);
        assert_eq!(out.chart_hint.kind, "line");
    }

    #[tokio::test]
    async fn compare_drugs_reports_shared_reactions() {
        let server = MockServer::start().await;
        for (drug, total, terms) in [
            ("aspirin", 100, vec!["NAUSEA", "RASH"]),
            ("ibuprofen", 50, vec!["NAUSEA", "DIZZINESS"]),
        ] {
            let clause = drug_event_clause(drug);
            Mock::given(method("GET"))
                .and(path("/drug/event.json"))
                .and(query_param("search", clause.as_str()))
                .and(query_param("limit", "1"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "meta": {"results": {"total": total}},
                    "results": [{}]
                })))
                .mount(&server)
                .await;
            let rows: Vec<_> = terms
                .iter()
                .map(|t| serde_json::json!({"term": t, "count": 5}))
                .collect();
            Mock::given(method("GET"))
                .and(path("/drug/event.json"))
                .and(query_param("search", clause.as_str()))
                .and(query_param("count", REACTION_COUNT_FIELD))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(serde_json::json!({ "results": rows })),
                )
                .mount(&server)
                .await;
        }

        let out = compare_drugs(
            &client(&server),
            parse(serde_json::json!({"drug_names": ["aspirin", "ibuprofen"]})),
        )
        .await
        .unwrap()
        .found()
        .expect("comparison");
        assert_eq!(out.drugs.len(), 2);
        assert_eq!(out.drugs[0].total_reports, 100);
        assert_eq!(out.drugs[1].total_reports, 50);
        assert_eq!(out.shared_reactions, vec!["NAUSEA"]);
    }

    #[tokio::test]
    async fn compare_drugs_with_reaction_reports_its_share() {
        let server = MockServer::start().await;
        for (drug, total, with_rash) in [("aspirin", 100, 20), ("ibuprofen", 50, 5)] {
            let clause = drug_event_clause(drug);
            let rash = format!("{clause} AND {}", reaction_clause("rash"));
            for (search, n) in [(clause.clone(), total), (rash, with_rash)] {
                Mock::given(method("GET"))
                    .and(path("/drug/event.json"))
                    .and(query_param("search", search.as_str()))
                    .and(query_param("limit", "1"))
                    .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                        "meta": {"results": {"total": n}},
                        "results": [{}]
                    })))
                    .expect(1)
                    .mount(&server)
                    .await;
            }
            Mock::given(method("GET"))
                .and(path("/drug/event.json"))
                .and(query_param("search", clause.as_str()))
                .and(query_param("count", REACTION_COUNT_FIELD))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "results": [{"term": "RASH", "count": with_rash}]
                })))
                .mount(&server)
                .await;
        }

        let out = compare_drugs(
            &client(&server),
            parse(serde_json::json!({"drug_names": ["aspirin", "ibuprofen"], "reaction": " rash "})),
        )
        .await
        .unwrap()
        .found()
        .expect("comparison");
        assert_eq!(out.reaction.as_deref(), Some("rash"));
        assert_eq!(out.drugs[0].reaction_reports, Some(20));
        assert_eq!(out.drugs[0].reaction_percentage, Some(20.0));
        assert_eq!(out.drugs[1].reaction_reports, Some(5));
        assert_eq!(out.drugs[1].reaction_percentage, Some(10.0));
        assert_eq!(out.chart_hint.y_field, "reaction_percentage");
        assert!(out.chart_hint.title.contains("rash"));
    }

    #[tokio::test]
    async fn drugs_for_reaction_counts_generic_names() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/event.json"))
            .and(query_param("count", GENERIC_NAME_COUNT_FIELD))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"term": "ADALIMUMAB", "count": 300}]
            })))
            .mount(&server)
            .await;

        let out = drugs_for_reaction(
            &client(&server),
            parse(serde_json::json!({"reaction": "injection site pain"})),
        )
        .await
        .unwrap()
        .found()
        .expect("drugs");
        assert_eq!(
            out.results,
            vec![DrugCount {
                drug: "ADALIMUMAB".into(),
                count: 300
            }]
        );
    }

    #[test]
    fn unknown_group_by_names_the_field() {
        let err = serde_json::from_value::<EventCountsParams>(
            serde_json::json!({"drug_name": "x", "group_by": "zodiac"}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("group_by"));
    }

    #[test]
    fn missing_drug_name_names_the_field() {
        let err =
            serde_json::from_value::<SearchAdverseEventsParams>(serde_json::json!({})).unwrap_err();
        assert!(err.to_string().contains("drug_name"));
    }
}
