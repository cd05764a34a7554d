use std::path::PathBuf;

use tokio::sync::OnceCell;
use tracing::{debug, warn};

const API_KEY_ENV: &str = "OPENFDA_API_KEY";
const API_KEY_FILE_ENV: &str = "OPENFDA_API_KEY_FILE";

/// Resolves the openFDA API key once per process.
///
/// Resolution order: an inline key (usually `OPENFDA_API_KEY`), then a
/// mounted secret file (`OPENFDA_API_KEY_FILE`) read lazily on first use.
/// When neither yields a key the resolved value is the empty string and
/// requests go out unauthenticated with the lower upstream rate limit.
#[derive(Default)]
pub struct ApiKeyProvider {
    inline: Option<String>,
    secret_file: Option<PathBuf>,
    resolved: OnceCell<String>,
}

impl std::fmt::Debug for ApiKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyProvider")
            .field("inline", &self.inline.as_ref().map(|_| "<redacted>"))
            .field("secret_file", &self.secret_file)
            .finish_non_exhaustive()
    }
}

impl ApiKeyProvider {
    pub fn from_env() -> Self {
        Self {
            inline: non_empty(std::env::var(API_KEY_ENV).ok()),
            secret_file: non_empty(std::env::var(API_KEY_FILE_ENV).ok()).map(PathBuf::from),
            resolved: OnceCell::new(),
        }
    }

    pub fn fixed(key: Option<String>) -> Self {
        Self {
            inline: non_empty(key),
            secret_file: None,
            resolved: OnceCell::new(),
        }
    }

    pub fn from_secret_file(path: impl Into<PathBuf>) -> Self {
        Self {
            inline: None,
            secret_file: Some(path.into()),
            resolved: OnceCell::new(),
        }
    }

    pub async fn resolve(&self) -> &str {
        self.resolved
            .get_or_init(|| async {
                if let Some(key) = self.inline.clone() {
                    debug!("openFDA API key taken from environment");
                    return key;
                }
                if let Some(path) = self.secret_file.as_ref() {
                    match tokio::fs::read_to_string(path).await {
                        Ok(contents) => {
                            if let Some(key) = non_empty(Some(contents)) {
                                debug!(path = %path.display(), "openFDA API key loaded from secret file");
                                return key;
                            }
                            warn!(path = %path.display(), "openFDA API key secret file is empty");
                        }
                        Err(err) => {
                            warn!(
                                path = %path.display(),
                                error = %err,
                                "openFDA API key secret file could not be read"
                            );
                        }
                    }
                }
                warn!("No openFDA API key configured; upstream rate limits will be lower");
                String::new()
            })
            .await
            .as_str()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
