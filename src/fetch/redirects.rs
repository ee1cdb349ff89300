//! Policy-checked redirect following.
//!
//! Redirects are followed manually, one hop at a time, so that every `Location`
//! target is checked against the domain policy before it is requested.

use log::{debug, warn};
use url::Url;

use super::transport::{HttpTransport, RawResponse, TransportRequest};
use crate::error_handling::{FetchError, NetworkErrorKind, TransportError};
use crate::sanitize::sanitize;
use crate::security::DomainPolicy;

/// Response at the end of a redirect chain.
#[derive(Debug)]
pub(crate) struct Followed {
    pub response: RawResponse,
    pub final_url: Url,
}

/// Why a hop failed.
#[derive(Debug)]
pub(crate) enum HopError {
    /// Retriable: the request itself failed.
    Transport(TransportError),
    /// Fatal: a hop was rejected or the chain was too long.
    Rejected(FetchError),
}

/// Sends `request`, following up to `max_hops` redirects when `follow` is set.
///
/// A redirect status without a `Location` header ends the chain and is
/// returned as-is.
pub(crate) async fn send_following_redirects(
    transport: &dyn HttpTransport,
    policy: &dyn DomainPolicy,
    mut request: TransportRequest,
    follow: bool,
    max_hops: usize,
) -> Result<Followed, HopError> {
    let start = request.url.to_string();
    let mut hops = 0usize;

    loop {
        let response = transport
            .send(&request)
            .await
            .map_err(HopError::Transport)?;

        let location = match response.redirect_location() {
            Some(location) if follow => location.to_string(),
            _ => {
                if follow && matches!(response.status, 301 | 302 | 303 | 307 | 308) {
                    warn!(
                        "Redirect status {} for {} but no Location header",
                        response.status,
                        sanitize(request.url.as_str())
                    );
                }
                return Ok(Followed {
                    response,
                    final_url: request.url,
                });
            }
        };

        hops += 1;
        if hops > max_hops {
            return Err(HopError::Rejected(FetchError::network(
                NetworkErrorKind::TooManyRedirects,
                &start,
            )));
        }

        let next = request.url.join(&location).map_err(|_| {
            HopError::Rejected(FetchError::network(NetworkErrorKind::InvalidUrl, &location))
        })?;
        let next = policy
            .assert_allowed(next.as_str())
            .await
            .map_err(HopError::Rejected)?;

        debug!(
            "Following redirect {} -> {}",
            sanitize(request.url.as_str()),
            sanitize(next.as_str())
        );
        request.url = next;
    }
}
