use std::future::Future;

use tracing::*;
use url::Url;

use crate::fetch;

pub mod address;
pub mod bandwidth;
pub mod latency;

/// Try `targets` in order and stop at the first attempt that succeeds.
///
/// The ordered list is the whole retry policy: there is no per-target retry,
/// and failures are logged and swallowed. An empty or fully failing list
/// yields `None`, so callers see unavailability as a value, never an error.
pub(crate) async fn first_success<'a, T, F, Fut>(targets: &'a [Url], mut attempt: F) -> Option<T>
where
    F: FnMut(&'a Url) -> Fut,
    Fut: Future<Output = fetch::Result<T>>,
{
    for url in targets {
        match attempt(url).await {
            Ok(value) => return Some(value),
            Err(error) => debug!("Probe target {url} failed: {error}"),
        }
    }

    None
}
