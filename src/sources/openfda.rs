use std::borrow::Cow;
use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::FaersError;
use crate::sources::api_key::ApiKeyProvider;
use crate::utils::serde::{StringOrVec, opt_lenient_string};

const OPENFDA_BASE: &str = "https://api.fda.gov";
const OPENFDA_API: &str = "openfda";
const OPENFDA_BASE_ENV: &str = "FAERS_MCP_OPENFDA_BASE";
const MAX_QUERY_LEN: usize = 2048;

/// The three fixed upstream search endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Event,
    Label,
    Enforcement,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::Event => "drug/event.json",
            Self::Label => "drug/label.json",
            Self::Enforcement => "drug/enforcement.json",
        }
    }
}

/// The parameter set accepted by every openFDA search endpoint.
#[derive(Debug, Clone, Default)]
pub struct FdaQuery<'a> {
    pub search: &'a str,
    pub count: Option<&'a str>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

/// Base URL in effect, honoring the environment override.
pub(crate) fn openfda_base() -> Cow<'static, str> {
    crate::sources::env_base(OPENFDA_BASE, OPENFDA_BASE_ENV)
}

pub struct OpenFdaClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
    api_key: Arc<ApiKeyProvider>,
}

impl OpenFdaClient {
    pub fn new() -> Result<Self, FaersError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: openfda_base(),
            api_key: Arc::new(ApiKeyProvider::from_env()),
        })
    }

    pub fn with_base(base: impl Into<String>, api_key: ApiKeyProvider) -> Result<Self, FaersError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base.into()),
            api_key: Arc::new(api_key),
        })
    }

    fn endpoint(&self, endpoint: Endpoint) -> String {
        format!(
            "{}/{}",
            self.base.as_ref().trim_end_matches('/'),
            endpoint.path()
        )
    }

    /// Issues exactly one GET and decodes the envelope.
    ///
    /// `Ok(None)` means the upstream reported no matching records.
    pub(crate) async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        query: &FdaQuery<'_>,
    ) -> Result<Option<T>, FaersError> {
        let search = query.search.trim();
        if search.is_empty() {
            return Err(FaersError::InvalidArgument(
                "search expression must not be empty".into(),
            ));
        }
        if search.len() > MAX_QUERY_LEN {
            return Err(FaersError::InvalidArgument(
                "search expression is too long".into(),
            ));
        }

        let mut params: Vec<(&str, String)> = vec![("search", search.to_string())];
        if let Some(count) = query.count {
            params.push(("count", count.to_string()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(skip) = query.skip {
            params.push(("skip", skip.to_string()));
        }
        let api_key = self.api_key.resolve().await;
        if !api_key.is_empty() {
            params.push(("api_key", api_key.to_string()));
        }

        debug!(endpoint = endpoint.path(), search, count = ?query.count, "openFDA query");

        let resp = self
            .client
            .get(self.endpoint(endpoint))
            .query(&params)
            .send()
            .await
            .map_err(crate::sources::send_error)?;
        let status = resp.status();
        let content_type = resp.headers().get(CONTENT_TYPE).cloned();
        let bytes = crate::sources::read_limited_body(resp, OPENFDA_API).await?;
        crate::sources::ensure_json_content_type(OPENFDA_API, content_type.as_ref(), &bytes)?;

        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|source| FaersError::UpstreamJson {
                api: OPENFDA_API.to_string(),
                source,
            })?;

        if let Some(error) = value.get("error").and_then(serde_json::Value::as_object) {
            let code = error
                .get("code")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default();
            if code.eq_ignore_ascii_case("NOT_FOUND") {
                return Ok(None);
            }
            let message = error
                .get("message")
                .and_then(serde_json::Value::as_str)
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {status}: {code}"));
            return Err(FaersError::Upstream {
                api: OPENFDA_API.to_string(),
                message,
            });
        }

        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FaersError::Upstream {
                api: OPENFDA_API.to_string(),
                message: format!("HTTP {status}: {}", crate::sources::body_excerpt(&bytes)),
            });
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|source| FaersError::UpstreamJson {
                api: OPENFDA_API.to_string(),
                source,
            })
    }

    pub async fn event_search(
        &self,
        search: &str,
        limit: usize,
        skip: usize,
    ) -> Result<Option<OpenFdaResponse<FaersEventResult>>, FaersError> {
        let query = FdaQuery {
            search,
            limit: Some(limit),
            skip: Some(skip),
            ..FdaQuery::default()
        };
        self.fetch(Endpoint::Event, &query).await
    }

    /// Total matching reports, read from the envelope meta of a one-record search.
    pub async fn event_total(&self, search: &str) -> Result<u64, FaersError> {
        let query = FdaQuery {
            search,
            limit: Some(1),
            ..FdaQuery::default()
        };
        let resp: Option<OpenFdaResponse<serde_json::Value>> =
            self.fetch(Endpoint::Event, &query).await?;
        Ok(resp.map(|r| r.meta.results.total).unwrap_or(0))
    }

    pub async fn event_count(
        &self,
        search: &str,
        count_field: &str,
        limit: Option<usize>,
    ) -> Result<Option<OpenFdaCountResponse>, FaersError> {
        let query = FdaQuery {
            search,
            count: Some(count_field),
            limit,
            ..FdaQuery::default()
        };
        self.fetch(Endpoint::Event, &query).await
    }

    pub async fn label_search(
        &self,
        search: &str,
        limit: usize,
    ) -> Result<Option<OpenFdaResponse<LabelResult>>, FaersError> {
        let query = FdaQuery {
            search,
            limit: Some(limit),
            ..FdaQuery::default()
        };
        self.fetch(Endpoint::Label, &query).await
    }

    pub async fn label_count(
        &self,
        search: &str,
        count_field: &str,
        limit: Option<usize>,
    ) -> Result<Option<OpenFdaCountResponse>, FaersError> {
        let query = FdaQuery {
            search,
            count: Some(count_field),
            limit,
            ..FdaQuery::default()
        };
        self.fetch(Endpoint::Label, &query).await
    }

    pub async fn enforcement_search(
        &self,
        search: &str,
        limit: usize,
        skip: usize,
    ) -> Result<Option<OpenFdaResponse<EnforcementResult>>, FaersError> {
        let query = FdaQuery {
            search,
            limit: Some(limit),
            skip: Some(skip),
            ..FdaQuery::default()
        };
        self.fetch(Endpoint::Enforcement, &query).await
    }

    pub async fn enforcement_total(&self, search: &str) -> Result<u64, FaersError> {
        let query = FdaQuery {
            search,
            limit: Some(1),
            ..FdaQuery::default()
        };
        let resp: Option<OpenFdaResponse<serde_json::Value>> =
            self.fetch(Endpoint::Enforcement, &query).await?;
        Ok(resp.map(|r| r.meta.results.total).unwrap_or(0))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenFdaResponse<T> {
    #[serde(default)]
    pub meta: OpenFdaMeta,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenFdaMeta {
    #[serde(default)]
    pub results: OpenFdaMetaResults,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenFdaMetaResults {
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenFdaCountResponse {
    #[serde(default)]
    pub results: Vec<OpenFdaCountBucket>,
}

/// One `count=` aggregation row; term fields yield `term`, date fields yield `time`.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenFdaCountBucket {
    #[serde(default)]
    pub term: Option<serde_json::Value>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub count: u64,
}

impl OpenFdaCountBucket {
    pub fn term_text(&self) -> Option<String> {
        match self.term.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaersEventResult {
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub safetyreportid: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub serious: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub receivedate: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub seriousnessdeath: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub seriousnesslifethreatening: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub seriousnesshospitalization: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub seriousnessdisabling: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub seriousnesscongenitalanomali: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub seriousnessother: Option<String>,
    #[serde(default)]
    pub occurcountry: Option<String>,
    #[serde(default)]
    pub patient: Option<FaersPatient>,
    #[serde(default)]
    pub primarysource: Option<FaersPrimarySource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaersPatient {
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub patientonsetage: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub patientonsetageunit: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub patientsex: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub patientweight: Option<String>,
    #[serde(default)]
    pub reaction: Vec<FaersReaction>,
    #[serde(default)]
    pub drug: Vec<FaersDrug>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaersReaction {
    #[serde(default)]
    pub reactionmeddrapt: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaersDrug {
    #[serde(default)]
    pub medicinalproduct: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub drugcharacterization: Option<String>,
    #[serde(default)]
    pub drugindication: Option<String>,
    #[serde(default)]
    pub openfda: Option<FaersOpenFdaDrug>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaersOpenFdaDrug {
    #[serde(default)]
    pub brand_name: Vec<String>,
    #[serde(default)]
    pub generic_name: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaersPrimarySource {
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub qualification: Option<String>,
    #[serde(default)]
    pub reportercountry: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelOpenFda {
    #[serde(default)]
    pub brand_name: Vec<String>,
    #[serde(default)]
    pub generic_name: Vec<String>,
    #[serde(default)]
    pub manufacturer_name: Vec<String>,
}

/// A structured product label record; each narrative section is a list of paragraphs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelResult {
    #[serde(default)]
    pub effective_time: Option<String>,
    #[serde(default)]
    pub openfda: LabelOpenFda,
    #[serde(default)]
    pub indications_and_usage: StringOrVec,
    #[serde(default)]
    pub dosage_and_administration: StringOrVec,
    #[serde(default)]
    pub contraindications: StringOrVec,
    #[serde(default)]
    pub boxed_warning: StringOrVec,
    #[serde(default)]
    pub warnings_and_cautions: StringOrVec,
    #[serde(default)]
    pub warnings: StringOrVec,
    #[serde(default)]
    pub precautions: StringOrVec,
    #[serde(default)]
    pub adverse_reactions: StringOrVec,
    #[serde(default)]
    pub drug_interactions: StringOrVec,
    #[serde(default)]
    pub use_in_specific_populations: StringOrVec,
    #[serde(default)]
    pub pregnancy: StringOrVec,
    #[serde(default)]
    pub pediatric_use: StringOrVec,
    #[serde(default)]
    pub geriatric_use: StringOrVec,
    #[serde(default)]
    pub overdosage: StringOrVec,
    #[serde(default)]
    pub mechanism_of_action: StringOrVec,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnforcementOpenFda {
    #[serde(default)]
    pub brand_name: Vec<String>,
    #[serde(default)]
    pub generic_name: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnforcementResult {
    #[serde(default)]
    pub recall_number: Option<String>,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub product_description: Option<String>,
    #[serde(default)]
    pub reason_for_recall: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub recalling_firm: Option<String>,
    #[serde(default)]
    pub distribution_pattern: Option<String>,
    #[serde(default)]
    pub voluntary_mandated: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub recall_initiation_date: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_string")]
    pub report_date: Option<String>,
    #[serde(default)]
    pub openfda: EnforcementOpenFda,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base: String, key: Option<&str>) -> OpenFdaClient {
        OpenFdaClient::with_base(base, ApiKeyProvider::fixed(key.map(str::to_string))).unwrap()
    }

    #[tokio::test]
    async fn event_search_includes_api_key_when_configured() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/drug/event.json"))
            .and(query_param("search", "serious:1"))
            .and(query_param("limit", "5"))
            .and(query_param("skip", "0"))
            .and(query_param("api_key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meta": {"last_updated": "2024-10-01", "results": {"skip": 0, "limit": 5, "total": 42}},
                "results": [{"safetyreportid": "1001"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = client(server.uri(), Some("test-key"))
            .event_search("serious:1", 5, 0)
            .await
            .unwrap()
            .expect("results");
        assert_eq!(resp.meta.results.total, 42);
        assert_eq!(resp.results[0].safetyreportid.as_deref(), Some("1001"));
    }

    #[tokio::test]
    async fn api_key_is_omitted_when_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .and(query_param_is_missing("api_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"openfda": {"brand_name": ["Advil"]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = client(server.uri(), None)
            .label_search("openfda.brand_name:\"Advil\"", 1)
            .await
            .unwrap()
            .expect("label");
        assert_eq!(resp.results[0].openfda.brand_name, vec!["Advil"]);
    }

    #[tokio::test]
    async fn not_found_envelope_means_no_results() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/drug/event.json"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {"code": "NOT_FOUND", "message": "No matches found!"}
            })))
            .mount(&server)
            .await;

        let resp = client(server.uri(), None)
            .event_count("patient.drug.medicinalproduct:\"zzz\"", "patient.patientsex", Some(5))
            .await
            .unwrap();
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn error_envelope_surfaces_upstream_message() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/drug/event.json"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": "BAD_REQUEST", "message": "Invalid limit parameter"}
            })))
            .mount(&server)
            .await;

        let err = client(server.uri(), None)
            .event_search("serious:1", 5, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, FaersError::Upstream { .. }));
        assert!(err.to_string().contains("Invalid limit parameter"));
    }

    #[tokio::test]
    async fn error_envelope_on_success_status_is_still_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/drug/enforcement.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": {"code": "SERVER_ERROR", "message": "Check your request and try again"}
            })))
            .mount(&server)
            .await;

        let err = client(server.uri(), None)
            .enforcement_search("classification:\"Class I\"", 5, 0)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Check your request and try again"));
    }

    #[tokio::test]
    async fn non_json_body_is_fetch_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/drug/event.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("upstream maintenance"))
            .mount(&server)
            .await;

        let err = client(server.uri(), None)
            .event_search("serious:1", 5, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, FaersError::UpstreamJson { .. }));
        assert!(err.to_string().starts_with("Fetch failed"));
    }

    #[tokio::test]
    async fn transport_failure_is_fetch_failure() {
        // Port 9 (discard) is closed on test hosts, so the connect fails.
        let err = client("http://127.0.0.1:9".into(), None)
            .event_search("serious:1", 5, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, FaersError::FetchFailed(_)));
        assert!(!err.is_client_fault());
    }

    #[tokio::test]
    async fn count_accepts_numeric_terms_and_time_rows() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/drug/event.json"))
            .and(query_param("count", "patient.patientsex"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"term": 1, "count": 10}, {"time": "20200105", "count": 3}]
            })))
            .mount(&server)
            .await;

        let resp = client(server.uri(), None)
            .event_count("serious:1", "patient.patientsex", None)
            .await
            .unwrap()
            .expect("counts");
        assert_eq!(resp.results[0].term_text().as_deref(), Some("1"));
        assert_eq!(resp.results[0].count, 10);
        assert_eq!(resp.results[1].time.as_deref(), Some("20200105"));
        assert_eq!(resp.results[1].term_text(), None);
    }

    #[tokio::test]
    async fn event_total_reads_meta_and_defaults_to_zero() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/drug/event.json"))
            .and(query_param("search", "serious:1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meta": {"results": {"skip": 0, "limit": 1, "total": 1234}},
                "results": [{}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drug/event.json"))
            .and(query_param("search", "serious:2"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {"code": "NOT_FOUND", "message": "No matches found!"}
            })))
            .mount(&server)
            .await;

        let client = client(server.uri(), None);
        assert_eq!(client.event_total("serious:1").await.unwrap(), 1234);
        assert_eq!(client.event_total("serious:2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn blank_search_is_rejected_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(server.uri(), None)
            .event_search("   ", 5, 0)
            .await
            .unwrap_err();
        assert!(err.is_client_fault());
    }
}
