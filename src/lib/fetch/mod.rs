use std::time::Duration;

use async_trait::async_trait;
use url::Url;

pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Target unreachable: {0}")]
    Unreachable(String),

    #[error("Malformed response body: {0}")]
    MalformedBody(#[from] serde_json::Error),
}

/// Outbound HTTP capability used by all probes. Success is defined at the
/// transport level: a completed round trip counts even when the status code
/// is not 2xx, since probe targets are third-party endpoints we do not
/// control.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Lightweight reachability request (HEAD), bypassing caches.
    async fn head(&self, url: &Url, timeout: Duration) -> Result<()>;

    /// Full download of the response body (GET), bypassing caches.
    async fn download(&self, url: &Url, timeout: Duration) -> Result<Vec<u8>>;
}

#[derive(Debug)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn try_new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn head(&self, url: &Url, timeout: Duration) -> Result<()> {
        self.client
            .head(url.clone())
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .timeout(timeout)
            .send()
            .await?;

        Ok(())
    }

    async fn download(&self, url: &Url, timeout: Duration) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .timeout(timeout)
            .send()
            .await?;

        let body = response.bytes().await?;

        Ok(body.to_vec())
    }
}

#[cfg(test)]
pub mod testing {
    use std::{collections::HashMap, sync::Mutex};

    use super::*;

    /// Scripted outcome for a single URL.
    #[derive(Debug, Clone)]
    pub enum FakeOutcome {
        /// Round trip completes after `delay`; `download` returns an empty body.
        Reachable { delay: Duration },
        /// Round trip completes after `delay`; `download` returns `body`.
        Body { delay: Duration, body: Vec<u8> },
        /// Transport-level failure.
        Unreachable,
    }

    /// Scriptable [`HttpFetcher`] for deterministic tests. Unscripted URLs are
    /// unreachable. Every request is appended to a call log so tests can
    /// assert exactly which targets a given cycle touched.
    #[derive(Debug, Default)]
    pub struct FakeFetcher {
        outcomes: Mutex<HashMap<String, FakeOutcome>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        pub fn script(&self, url: &str, outcome: FakeOutcome) {
            self.outcomes
                .lock()
                .unwrap()
                .insert(url.to_string(), outcome);
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        async fn resolve(&self, url: &Url) -> Result<Vec<u8>> {
            self.calls.lock().unwrap().push(url.to_string());

            let outcome = self.outcomes.lock().unwrap().get(url.as_str()).cloned();
            match outcome {
                Some(FakeOutcome::Reachable { delay }) => {
                    tokio::time::sleep(delay).await;
                    Ok(vec![])
                }
                Some(FakeOutcome::Body { delay, body }) => {
                    tokio::time::sleep(delay).await;
                    Ok(body)
                }
                Some(FakeOutcome::Unreachable) | None => {
                    Err(FetchError::Unreachable(url.to_string()))
                }
            }
        }
    }

    #[async_trait]
    impl HttpFetcher for FakeFetcher {
        async fn head(&self, url: &Url, _timeout: Duration) -> Result<()> {
            self.resolve(url).await.map(|_| ())
        }

        async fn download(&self, url: &Url, _timeout: Duration) -> Result<Vec<u8>> {
            self.resolve(url).await
        }
    }
}
