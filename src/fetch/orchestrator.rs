//! The retry/backoff state machine around a single fetch.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info, warn};
use url::Url;

use super::redirects::{send_following_redirects, Followed, HopError};
use super::retry::{parse_retry_after, transient_backoff};
use super::transport::{HttpTransport, RawResponse, TransportRequest};
use super::{FetchRequest, FetchResult};
use crate::alerts::AlertDispatcher;
use crate::block_detection::{BlockDetector, BlockReason, SoftBlockDetector};
use crate::cache::ResponseCache;
use crate::config::{
    FetchConfig, DEFAULT_CONTENT_TYPE, HTTP_STATUS_FORBIDDEN, HTTP_STATUS_TOO_MANY_REQUESTS,
    HTTP_STATUS_UNAUTHORIZED,
};
use crate::error_handling::{
    categorize_fetch_result, BlockCause, FetchError, FetchOutcome, FetchStats, NetworkErrorKind,
    RateLimitStoreError, TransportError,
};
use crate::rate_limiter::RateLimiter;
use crate::sanitize::sanitize;
use crate::security::DomainPolicy;
use crate::user_agent::{RandomUserAgentProvider, UserAgentProvider};

/// Fetches allowlisted URLs while honouring per-domain pacing and blocks.
///
/// One orchestrator is shared (behind `Arc`) by every worker of a collection
/// run. Each `fetch()` call:
///
/// 1. checks the URL against the domain policy;
/// 2. fails fast with `RateLimited` while the domain is blocked;
/// 3. makes up to `max_attempts` paced attempts, retrying 5xx and
///    connection failures with exponential backoff;
/// 4. turns 429 into a `RateLimited` window, and 401/403 or a blocking soft
///    block into an escalating `Blocked` window with an operator alert.
pub struct FetchOrchestrator {
    transport: Arc<dyn HttpTransport>,
    rate_limiter: Arc<dyn RateLimiter>,
    policy: Arc<dyn DomainPolicy>,
    detector: Arc<dyn SoftBlockDetector>,
    user_agents: Arc<dyn UserAgentProvider>,
    alerts: AlertDispatcher,
    cache: Option<Arc<ResponseCache>>,
    config: FetchConfig,
    stats: FetchStats,
}

/// Builder for `FetchOrchestrator`.
pub struct FetchOrchestratorBuilder {
    transport: Arc<dyn HttpTransport>,
    rate_limiter: Arc<dyn RateLimiter>,
    policy: Arc<dyn DomainPolicy>,
    detector: Arc<dyn SoftBlockDetector>,
    user_agents: Arc<dyn UserAgentProvider>,
    alerts: AlertDispatcher,
    cache: Option<Arc<ResponseCache>>,
    config: FetchConfig,
}

impl FetchOrchestratorBuilder {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        rate_limiter: Arc<dyn RateLimiter>,
        policy: Arc<dyn DomainPolicy>,
    ) -> Self {
        Self {
            transport,
            rate_limiter,
            policy,
            detector: Arc::new(BlockDetector),
            user_agents: Arc::new(RandomUserAgentProvider::default()),
            alerts: AlertDispatcher::default(),
            cache: None,
            config: FetchConfig::default(),
        }
    }

    pub fn config(mut self, config: FetchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn detector(mut self, detector: Arc<dyn SoftBlockDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn user_agents(mut self, user_agents: Arc<dyn UserAgentProvider>) -> Self {
        self.user_agents = user_agents;
        self
    }

    pub fn alerts(mut self, alerts: AlertDispatcher) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn response_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> FetchOrchestrator {
        FetchOrchestrator {
            transport: self.transport,
            rate_limiter: self.rate_limiter,
            policy: self.policy,
            detector: self.detector,
            user_agents: self.user_agents,
            alerts: self.alerts,
            cache: self.cache,
            config: self.config,
            stats: FetchStats::new(),
        }
    }
}

struct Fetched {
    result: FetchResult,
    from_cache: bool,
}

impl FetchOrchestrator {
    pub fn builder(
        transport: Arc<dyn HttpTransport>,
        rate_limiter: Arc<dyn RateLimiter>,
        policy: Arc<dyn DomainPolicy>,
    ) -> FetchOrchestratorBuilder {
        FetchOrchestratorBuilder::new(transport, rate_limiter, policy)
    }

    /// Fetches `request.url`. See the type-level docs for the state machine.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, FetchError> {
        let fetched = self.try_fetch(request).await;
        let outcome = match &fetched {
            Ok(Fetched {
                from_cache: true, ..
            }) => FetchOutcome::CacheHit,
            other => categorize_fetch_result(other),
        };
        self.stats.increment(outcome);
        fetched.map(|f| f.result)
    }

    /// Whether `domain` is inside a block window, without attempting a fetch.
    pub async fn is_rate_limited(&self, domain: &str) -> Result<bool, RateLimitStoreError> {
        self.rate_limiter
            .is_rate_limited(&domain.to_ascii_lowercase())
            .await
    }

    pub fn stats(&self) -> &FetchStats {
        &self.stats
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn try_fetch(&self, request: &FetchRequest) -> Result<Fetched, FetchError> {
        let url = self.policy.assert_allowed(&request.url).await?;
        let domain = url
            .host_str()
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| FetchError::network(NetworkErrorKind::MissingHost, &request.url))?;

        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(&request.url)) {
            debug!("Cache hit for {}", sanitize(&request.url));
            return Ok(Fetched {
                result: (*hit).clone(),
                from_cache: true,
            });
        }

        if self.rate_limiter.is_rate_limited(&domain).await? {
            let retry_at = self.rate_limiter.retry_time(&domain).await?;
            debug!("Skipping {}: {} is rate limited", sanitize(&request.url), domain);
            return Err(FetchError::RateLimited { domain, retry_at });
        }

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            let retries_left = attempt + 1 < max_attempts;
            self.rate_limiter.wait(&domain).await;
            self.stats.increment_attempts();
            debug!(
                "Fetching {} (attempt {}/{})",
                sanitize(&request.url),
                attempt + 1,
                max_attempts
            );

            let followed = match self.send(request, url.clone()).await {
                Ok(followed) => followed,
                Err(HopError::Rejected(e)) => return Err(e),
                Err(HopError::Transport(e)) if retries_left => {
                    self.backoff(attempt, &request.url, &e.to_string()).await;
                    attempt += 1;
                    continue;
                }
                Err(HopError::Transport(e)) => return Err(FetchError::transport(&request.url, e)),
            };

            self.rate_limiter.record_attempt(&domain).await;

            match followed.response.status {
                HTTP_STATUS_TOO_MANY_REQUESTS => {
                    return Err(self.rate_limited(&domain, &followed.response).await)
                }
                status @ (HTTP_STATUS_UNAUTHORIZED | HTTP_STATUS_FORBIDDEN) => {
                    return Err(self
                        .block(
                            &domain,
                            followed.final_url.as_str(),
                            BlockCause::HttpStatus(status),
                        )
                        .await)
                }
                status @ 500..=599 if retries_left => {
                    self.backoff(attempt, &request.url, &format!("HTTP {}", status))
                        .await;
                    attempt += 1;
                    continue;
                }
                _ => {}
            }

            let result = self.complete(request, &domain, followed).await?;
            return Ok(Fetched {
                result,
                from_cache: false,
            });
        }
    }

    async fn send(&self, request: &FetchRequest, url: Url) -> Result<Followed, HopError> {
        let user_agent = request
            .user_agent
            .clone()
            .unwrap_or_else(|| self.user_agents.random_user_agent());
        let transport_request = TransportRequest {
            url,
            user_agent,
            headers: request.headers.clone(),
            timeout: request.timeout,
        };
        send_following_redirects(
            self.transport.as_ref(),
            self.policy.as_ref(),
            transport_request,
            request.follow_redirects,
            self.config.max_redirect_hops,
        )
        .await
    }

    async fn backoff(&self, attempt: u32, url: &str, reason: &str) {
        let delay = transient_backoff(attempt);
        info!(
            "Transient failure for {} ({}), retrying in {:.1}s",
            sanitize(url),
            reason,
            delay.as_secs_f64()
        );
        tokio::time::sleep(delay).await;
    }

    /// 429: open a window from `Retry-After` without escalating the backoff.
    async fn rate_limited(&self, domain: &str, response: &RawResponse) -> FetchError {
        let now = Utc::now();
        let retry_until = response
            .header("retry-after")
            .and_then(|value| parse_retry_after(value, now))
            .unwrap_or_else(|| after(now, self.config.default_rate_limit_window))
            .max(now + TimeDelta::seconds(1));

        let cause = BlockCause::HttpStatus(HTTP_STATUS_TOO_MANY_REQUESTS);
        if let Err(e) = self.rate_limiter.block(domain, retry_until, &cause).await {
            return e.into();
        }
        warn!(
            "Rate limited by {} until {}",
            domain,
            retry_until.to_rfc3339()
        );
        FetchError::RateLimited {
            domain: domain.to_string(),
            retry_at: Some(retry_until),
        }
    }

    /// Hard block or blocking soft block: escalate through the backoff table and alert.
    ///
    /// `url` is the page that blocked, after redirects.
    async fn block(&self, domain: &str, url: &str, cause: BlockCause) -> FetchError {
        let count = match self.rate_limiter.consecutive_block_count(domain).await {
            Ok(count) => count,
            Err(e) => return e.into(),
        };
        let backoff = self.config.block_backoff(count);
        let retry_until = after(Utc::now(), backoff);
        if let Err(e) = self.rate_limiter.record_block(domain, retry_until, &cause).await {
            return e.into();
        }

        let url = sanitize(url);
        warn!(
            "Blocked by {} ({}) at {} (block {}, cooldown {}s)",
            domain,
            cause,
            url,
            count + 1,
            backoff.as_secs()
        );
        self.alerts.alert_blocked(domain, &url, Some(retry_until)).await;

        FetchError::Blocked {
            domain: domain.to_string(),
            url,
            retry_until: Some(retry_until),
            cause,
        }
    }

    /// Final response: re-check the landing URL, classify the body, and
    /// either record success or fail.
    async fn complete(
        &self,
        request: &FetchRequest,
        domain: &str,
        followed: Followed,
    ) -> Result<FetchResult, FetchError> {
        self.policy
            .assert_allowed(followed.final_url.as_str())
            .await?;

        let response = followed.response;
        let content_type = response
            .header("content-type")
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let result = FetchResult {
            content: response.body,
            content_type,
            status_code: response.status,
            url: sanitize(&request.url),
            final_url: sanitize(followed.final_url.as_str()),
            retrieved_at: Utc::now(),
            headers: response.headers,
        };

        let reason = self.detector.detect(&result);
        if reason.requires_backoff() {
            return Err(self
                .block(domain, &result.final_url, BlockCause::SoftBlock(reason))
                .await);
        }
        if reason != BlockReason::None && !self.detector.is_recoverable(reason) {
            warn!(
                "Soft block ({}) from {} at {}; not retrying",
                reason.as_ref(),
                domain,
                result.final_url
            );
            self.alerts.alert_blocked(domain, &result.final_url, None).await;
            return Err(FetchError::Blocked {
                domain: domain.to_string(),
                url: result.final_url,
                retry_until: None,
                cause: BlockCause::SoftBlock(reason),
            });
        }

        if (500..=599).contains(&result.status_code) {
            if reason == BlockReason::ServiceUnavailable {
                warn!("{} is unavailable (HTTP 503) at {}", domain, result.url);
            }
            return Err(FetchError::transport(
                &request.url,
                TransportError::ServerStatus {
                    status: result.status_code,
                },
            ));
        }

        self.rate_limiter.record_success(domain).await?;

        if let Some(cache) = &self.cache {
            if (200..300).contains(&result.status_code) {
                cache.set(&request.url, Arc::new(result.clone()));
            }
        }

        debug!(
            "Fetched {} ({}, {} bytes)",
            result.final_url,
            result.status_code,
            result.content.len()
        );
        Ok(result)
    }
}

impl std::fmt::Debug for FetchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("config", &self.config)
            .field("cache", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

fn after(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(delay)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
