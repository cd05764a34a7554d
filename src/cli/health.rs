use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::error::FaersError;
use crate::sources::openfda::{Endpoint, openfda_base};

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthRow {
    pub api: String,
    pub status: String,
    pub latency: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthReport {
    pub healthy: usize,
    pub total: usize,
    pub rows: Vec<HealthRow>,
}

impl HealthReport {
    pub fn all_healthy(&self) -> bool {
        self.healthy == self.total
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# openFDA Health Check\n\n");
        out.push_str("| API | Status | Latency |\n");
        out.push_str("|-----|--------|---------|\n");
        for row in &self.rows {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                row.api, row.status, row.latency
            ));
        }
        out.push_str(&format!(
            "\nStatus: {}/{} endpoints healthy\n",
            self.healthy, self.total
        ));
        out
    }
}

async fn check_one(client: reqwest::Client, api: &str, url: String) -> HealthRow {
    let start = Instant::now();
    let resp = client
        .get(&url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await;

    match resp {
        Ok(resp) => {
            let status = resp.status();
            let elapsed = start.elapsed().as_millis();
            if status.is_success() {
                HealthRow {
                    api: api.to_string(),
                    status: "ok".into(),
                    latency: format!("{elapsed}ms"),
                }
            } else {
                HealthRow {
                    api: api.to_string(),
                    status: "error".into(),
                    latency: format!("{elapsed}ms (HTTP {})", status.as_u16()),
                }
            }
        }
        Err(err) => {
            let reason = if err.is_timeout() {
                "timeout"
            } else if err.is_connect() {
                "connect"
            } else {
                "error"
            };
            HealthRow {
                api: api.to_string(),
                status: "error".into(),
                latency: reason.into(),
            }
        }
    }
}

fn health_http_client() -> Result<reqwest::Client, FaersError> {
    static HEALTH_HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

    if let Some(client) = HEALTH_HTTP_CLIENT.get() {
        return Ok(client.clone());
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .connect_timeout(Duration::from_secs(5))
        .user_agent(concat!("faers-mcp/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(FaersError::HttpClientInit)?;

    Ok(HEALTH_HTTP_CLIENT.get_or_init(|| client).clone())
}

fn probe_url(base: &str, endpoint: Endpoint) -> String {
    format!("{}/{}?limit=1", base.trim_end_matches('/'), endpoint.path())
}

/// Probes the three openFDA endpoints the tools depend on.
///
/// # Errors
///
/// Returns an error when the HTTP client cannot be created.
pub async fn check(base: &str) -> Result<HealthReport, FaersError> {
    let client = health_http_client()?;

    let (event, label, enforcement) = tokio::join!(
        check_one(
            client.clone(),
            "Adverse events (drug/event)",
            probe_url(base, Endpoint::Event)
        ),
        check_one(
            client.clone(),
            "Drug labels (drug/label)",
            probe_url(base, Endpoint::Label)
        ),
        check_one(
            client.clone(),
            "Recalls (drug/enforcement)",
            probe_url(base, Endpoint::Enforcement)
        ),
    );

    let rows = vec![event, label, enforcement];
    let healthy = rows.iter().filter(|r| r.status == "ok").count();
    Ok(HealthReport {
        healthy,
        total: rows.len(),
        rows,
    })
}

/// [`check`] against the configured openFDA base URL.
pub async fn check_default() -> Result<HealthReport, FaersError> {
    check(&openfda_base()).await
}
