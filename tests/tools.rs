use faers_mcp::error::FaersError;
use faers_mcp::mcp::FaersServer;
use faers_mcp::mcp::catalog::{TOOLS, catalog_json, rmcp_tools};
use regex::Regex;
use serde_json::{Map, Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn args(value: Value) -> Option<Map<String, Value>> {
    value.as_object().cloned()
}

fn server_for(mock: &MockServer) -> FaersServer {
    FaersServer::with_openfda_base(mock.uri(), None).expect("server")
}

#[test]
fn catalog_has_seventeen_well_formed_tools() {
    let tools = rmcp_tools();
    assert_eq!(tools.len(), 17);

    let name_re = Regex::new(r"^[a-z][a-z0-9_]*$").unwrap();
    for tool in &tools {
        assert!(name_re.is_match(&tool.name), "bad name {}", tool.name);
        assert!(tool.name.len() < 64);
        let description = tool.description.as_deref().unwrap_or_default();
        assert!(description.len() > 10, "{} description too short", tool.name);

        let annotations = tool.annotations.as_ref().expect("annotations");
        assert_eq!(annotations.read_only_hint, Some(true));
        assert_eq!(annotations.destructive_hint, Some(false));
        assert_eq!(annotations.open_world_hint, Some(true));
    }
}

#[test]
fn catalog_leaks_no_key_material() {
    let serialized = serde_json::to_string(&catalog_json()).unwrap();
    assert!(!serialized.contains("api_key"));
    assert!(!serialized.contains("apiKey"));

    let token_re = Regex::new(r"[A-Za-z0-9]{32,}").unwrap();
    for tool in TOOLS {
        assert!(
            !token_re.is_match(tool.description),
            "{} description embeds a long token",
            tool.name
        );
    }
}

#[tokio::test]
async fn unknown_tool_makes_no_upstream_call() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock)
        .await;

    let err = server_for(&mock)
        .invoke("get_weather", args(json!({"city": "Paris"})))
        .await
        .unwrap_err();
    assert!(matches!(err, FaersError::UnknownTool(_)));
    assert!(err.to_string().to_ascii_lowercase().contains("unknown tool"));
}

#[tokio::test]
async fn parameter_errors_name_the_problem() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock)
        .await;
    let server = server_for(&mock);

    let missing = server
        .invoke("search_adverse_events", args(json!({})))
        .await
        .unwrap_err();
    assert!(missing.to_string().contains("drug_name"));

    let empty = server
        .invoke("search_adverse_events", args(json!({"drug_name": ""})))
        .await
        .unwrap_err();
    assert!(empty.to_string().contains("empty"));

    for limit in [0, 200] {
        let err = server
            .invoke(
                "search_adverse_events",
                args(json!({"drug_name": "aspirin", "limit": limit})),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("limit"), "limit {limit}: {err}");
        assert!(err.is_client_fault());
    }
}

#[tokio::test]
async fn event_counts_by_sex_are_decoded() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drug/event.json"))
        .and(query_param("count", "patient.patientsex"))
        .and(query_param("limit", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"term": 1, "count": 10}, {"term": 2, "count": 8}]
        })))
        .expect(1)
        .mount(&mock)
        .await;

    let value = server_for(&mock)
        .invoke(
            "get_event_counts",
            args(json!({"drug_name": "ibuprofen", "group_by": "sex", "limit": 3})),
        )
        .await
        .unwrap();

    assert_eq!(value["drug"], "ibuprofen");
    assert_eq!(value["grouped_by"], "sex");
    assert_eq!(
        value["results"],
        json!([{"sex": "Male", "count": 10}, {"sex": "Female", "count": 8}])
    );
    assert!(!value["disclaimer"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn empty_upstream_is_a_successful_no_results_answer() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "NOT_FOUND", "message": "No matches found!"}
        })))
        .mount(&mock)
        .await;

    let value = server_for(&mock)
        .invoke("get_drug_recalls", args(json!({"drug_name": "unobtainium"})))
        .await
        .unwrap();
    assert_eq!(value["no_results"], true);
    assert!(value["source"].is_string());
}

#[tokio::test]
async fn upstream_error_object_is_surfaced_verbatim() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": "BAD_REQUEST", "message": "Invalid search syntax"}
        })))
        .mount(&mock)
        .await;

    let err = server_for(&mock)
        .invoke("get_safety_summary", args(json!({"drug_name": "aspirin"})))
        .await
        .unwrap_err();
    assert!(!err.is_client_fault());
    assert!(err.to_string().contains("Invalid search syntax"));
}

#[tokio::test]
async fn data_info_works_without_arguments() {
    let mock = MockServer::start().await;
    let value = server_for(&mock).invoke("get_data_info", None).await.unwrap();
    let disclaimer = value["disclaimer"].as_str().unwrap();
    assert!(disclaimer.contains("IMPORTANT"));
    assert!(disclaimer.contains("NOT prove"));
    assert!(!value["limitations"].as_array().unwrap().is_empty());
}
