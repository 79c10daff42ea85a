use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::{fetch::HttpFetcher, health::PublicAddress};

#[derive(Debug, Deserialize)]
struct AddressLookupResponse {
    ip: String,
}

/// Resolve the public address via the external lookup service. Any failure,
/// transport or parse, is reported as an explicit `Unavailable` placeholder
/// rather than an error.
pub async fn lookup(fetcher: &dyn HttpFetcher, url: &Url, timeout: Duration) -> PublicAddress {
    let resolved = super::first_success(std::slice::from_ref(url), |url| async move {
        let body = fetcher.download(url, timeout).await?;
        let response: AddressLookupResponse = serde_json::from_slice(&body)?;

        Ok(response.ip)
    })
    .await;

    match resolved {
        Some(address) => PublicAddress::Resolved(address),
        None => PublicAddress::Unavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{FakeFetcher, FakeOutcome};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn lookup_url() -> Url {
        Url::parse("http://lookup.test/?format=json").unwrap()
    }

    #[tokio::test]
    async fn parses_lookup_response() {
        let fetcher = FakeFetcher::default();
        fetcher.script(
            "http://lookup.test/?format=json",
            FakeOutcome::Body {
                delay: Duration::ZERO,
                body: br#"{"ip":"203.0.113.7"}"#.to_vec(),
            },
        );

        assert_eq!(
            lookup(&fetcher, &lookup_url(), TIMEOUT).await,
            PublicAddress::Resolved("203.0.113.7".to_string())
        );
    }

    #[tokio::test]
    async fn transport_failure_is_unavailable() {
        let fetcher = FakeFetcher::default();

        assert_eq!(
            lookup(&fetcher, &lookup_url(), TIMEOUT).await,
            PublicAddress::Unavailable
        );
    }

    #[tokio::test]
    async fn malformed_body_is_unavailable() {
        let fetcher = FakeFetcher::default();
        fetcher.script(
            "http://lookup.test/?format=json",
            FakeOutcome::Body {
                delay: Duration::ZERO,
                body: b"<html>definitely not json</html>".to_vec(),
            },
        );

        assert_eq!(
            lookup(&fetcher, &lookup_url(), TIMEOUT).await,
            PublicAddress::Unavailable
        );
    }
}
