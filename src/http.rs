//! HTTP client for the trajectory REST endpoints.
//!
//! This module lets the walk app (or a batch job) drive simplification on the
//! backend:
//! - Upload recorded samples in batches
//! - Trigger simplification of a session with an optional tolerance
//! - Read back the stored simplified polyline
//! - Simplify many sessions concurrently with dispatch rate limiting
//! - Automatic retry with exponential backoff on 429 and transport errors

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::{GpsPoint, SampleId, SessionId, SimplifiedPolyline, TrajectorySample};

const DISPATCH_INTERVAL_MS: u64 = 50;
const MAX_CONCURRENCY: usize = 16;
const MAX_RETRIES: u32 = 3;

/// Errors from talking to the trajectory endpoints.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Failed to create HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("Request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Max retries exceeded ({0})")]
    RetriesExhausted(String),
}

impl ClientError {
    /// Whether the backend rejected the request itself (HTTP 4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self, ClientError::Status { status, .. } if (400..500).contains(status))
    }
}

/// Error body returned by the simplify endpoint.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// Response body of the simplify and simplified endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolylineResponse {
    pub session_id: SessionId,
    pub points: Vec<GpsPoint>,
    #[serde(default)]
    pub num_points: Option<usize>,
    #[serde(default)]
    pub wkt: Option<String>,
}

impl From<PolylineResponse> for SimplifiedPolyline {
    fn from(response: PolylineResponse) -> Self {
        SimplifiedPolyline::new(response.session_id, response.points)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedSample {
    id: SampleId,
}

/// Outcome of one session in a concurrent batch.
#[derive(Debug)]
pub struct RemoteOutcome {
    pub session_id: SessionId,
    pub result: Result<SimplifiedPolyline, ClientError>,
}

/// Progress callback type
pub type ProgressCallback = Arc<dyn Fn(u32, u32) + Send + Sync>;

/// Dispatch rate limiter - spaces out when requests START, so a batch never
/// opens more than one request per DISPATCH_INTERVAL_MS.
struct DispatchRateLimiter {
    next_dispatch: Mutex<Instant>,
    dispatched_count: AtomicU32,
    consecutive_429s: AtomicU32,
}

impl DispatchRateLimiter {
    fn new() -> Self {
        Self {
            next_dispatch: Mutex::new(Instant::now()),
            dispatched_count: AtomicU32::new(0),
            consecutive_429s: AtomicU32::new(0),
        }
    }

    /// Wait for our dispatch slot. Each caller gets a unique slot
    /// spaced DISPATCH_INTERVAL_MS apart.
    async fn wait_for_dispatch_slot(&self) -> u32 {
        let (wait_duration, dispatch_num) = {
            let mut next = self.next_dispatch.lock().await;
            let now = Instant::now();

            let dispatch_at = if *next > now { *next } else { now };

            // Reserve the next slot for the next caller
            *next = dispatch_at + Duration::from_millis(DISPATCH_INTERVAL_MS);

            let num = self.dispatched_count.fetch_add(1, Ordering::Relaxed) + 1;

            let wait = if dispatch_at > now {
                dispatch_at - now
            } else {
                Duration::ZERO
            };

            (wait, num)
        };

        // Wait outside the lock
        if wait_duration > Duration::from_millis(5) {
            debug!("[Dispatch #{}] Waiting {:?} for slot", dispatch_num, wait_duration);
            tokio::time::sleep(wait_duration).await;
        }

        dispatch_num
    }

    fn record_success(&self) {
        self.consecutive_429s.store(0, Ordering::Relaxed);
    }

    fn record_429(&self) -> Duration {
        let count = self.consecutive_429s.fetch_add(1, Ordering::Relaxed) + 1;
        // Exponential backoff: 1s, 2s, 4s max
        let backoff = Duration::from_millis(500 * (1 << count.min(3)));
        warn!("[DispatchRateLimiter] Got 429! Consecutive: {}, backing off {:?}", count, backoff);
        backoff
    }
}

/// Client for the trajectory endpoints of the walk backend.
pub struct TrajectoryClient {
    client: Client,
    base_url: String,
    auth_header: Option<String>,
    rate_limiter: Arc<DispatchRateLimiter>,
}

impl TrajectoryClient {
    /// Create a client for `base_url` (e.g. `https://api.example.com`),
    /// optionally sending `token` as a bearer credential.
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .pool_max_idle_per_host(MAX_CONCURRENCY * 2)
            .pool_idle_timeout(Duration::from_secs(60))
            .tcp_keepalive(Duration::from_secs(30))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header: token.map(|t| format!("Bearer {}", t)),
            rate_limiter: Arc::new(DispatchRateLimiter::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn batch_url(&self) -> String {
        format!("{}/trajectories/batch", self.base_url)
    }

    fn simplify_url(&self, session_id: SessionId) -> String {
        format!("{}/trajectories/simplify/{}", self.base_url, session_id)
    }

    fn simplified_url(&self, session_id: SessionId) -> String {
        format!("{}/trajectories/simplified/{}", self.base_url, session_id)
    }

    /// Upload samples in one batch; returns the ids the backend assigned.
    pub async fn upload_samples(&self, samples: &[TrajectorySample]) -> Result<Vec<SampleId>, ClientError> {
        let url = self.batch_url();
        let body = serde_json::to_vec(samples)?;
        let uploaded: Vec<UploadedSample> = self
            .send_json(&url, || {
                self.client
                    .post(&url)
                    .header("Content-Type", "application/json")
                    .body(body.clone())
            })
            .await?
            .ok_or_else(|| ClientError::Status {
                status: StatusCode::NOT_FOUND.as_u16(),
                message: format!("{} not found", url),
            })?;

        info!("[TrajectoryClient] uploaded {} samples", uploaded.len());
        Ok(uploaded.into_iter().map(|s| s.id).collect())
    }

    /// Simplify a session on the backend. `None` uses the server's default tolerance.
    pub async fn simplify_session(
        &self,
        session_id: SessionId,
        epsilon_meters: Option<f64>,
    ) -> Result<SimplifiedPolyline, ClientError> {
        let url = self.simplify_url(session_id);
        let response: Option<PolylineResponse> = self
            .send_json(&url, || {
                let request = self.client.post(&url);
                match epsilon_meters {
                    Some(epsilon) => request.query(&[("epsilonMeters", epsilon)]),
                    None => request,
                }
            })
            .await?;

        response.map(SimplifiedPolyline::from).ok_or_else(|| ClientError::Status {
            status: StatusCode::NOT_FOUND.as_u16(),
            message: format!("session {} not found", session_id),
        })
    }

    /// Fetch a session's stored polyline; `Ok(None)` when it was never simplified.
    pub async fn fetch_simplified(&self, session_id: SessionId) -> Result<Option<SimplifiedPolyline>, ClientError> {
        let url = self.simplified_url(session_id);
        let response: Option<PolylineResponse> = self.send_json(&url, || self.client.get(&url)).await?;
        Ok(response.map(SimplifiedPolyline::from))
    }

    /// Simplify many sessions concurrently, rate-limited, in completion order.
    pub async fn simplify_sessions(
        &self,
        session_ids: Vec<SessionId>,
        epsilon_meters: Option<f64>,
        on_progress: Option<ProgressCallback>,
    ) -> Vec<RemoteOutcome> {
        let total = session_ids.len() as u32;
        let completed = Arc::new(AtomicU32::new(0));

        info!(
            "[TrajectoryClient] Simplifying {} sessions (dispatch interval: {}ms, max concurrent: {})",
            total, DISPATCH_INTERVAL_MS, MAX_CONCURRENCY
        );

        let start = Instant::now();

        let results: Vec<RemoteOutcome> = stream::iter(session_ids)
            .map(|session_id| {
                let completed = Arc::clone(&completed);
                let callback = on_progress.clone();

                async move {
                    self.rate_limiter.wait_for_dispatch_slot().await;
                    let result = self.simplify_session(session_id, epsilon_meters).await;

                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!("[Progress] {}/{} (session {})", done, total, session_id);
                    if let Some(ref cb) = callback {
                        cb(done, total);
                    }

                    RemoteOutcome { session_id, result }
                }
            })
            .buffer_unordered(MAX_CONCURRENCY)
            .collect()
            .await;

        let success_count = results.iter().filter(|r| r.result.is_ok()).count();
        info!(
            "[TrajectoryClient] DONE: {}/{} sessions in {:.2}s",
            success_count,
            total,
            start.elapsed().as_secs_f64()
        );

        results
    }

    /// Send a request with retries; `Ok(None)` on 404.
    async fn send_json<T, F>(&self, url: &str, build: F) -> Result<Option<T>, ClientError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;

        loop {
            let mut request = build();
            if let Some(auth) = &self.auth_header {
                request = request.header("Authorization", auth);
            }

            match request.send().await {
                Ok(resp) => {
                    let status = resp.status();

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        retries += 1;
                        if retries > MAX_RETRIES {
                            return Err(ClientError::RetriesExhausted("429".to_string()));
                        }
                        let wait = self.rate_limiter.record_429();
                        warn!("[Request {}] 429 Too Many Requests, retry {} with {:?} backoff", url, retries, wait);
                        tokio::time::sleep(wait).await;
                        continue;
                    }

                    self.rate_limiter.record_success();

                    if status == StatusCode::NOT_FOUND {
                        return Ok(None);
                    }

                    let bytes = resp.bytes().await?;

                    if !status.is_success() {
                        let message = serde_json::from_slice::<ApiErrorBody>(&bytes)
                            .ok()
                            .and_then(|b| b.message)
                            .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());
                        return Err(ClientError::Status { status: status.as_u16(), message });
                    }

                    return Ok(Some(serde_json::from_slice(&bytes)?));
                }
                Err(e) => {
                    retries += 1;
                    if retries > MAX_RETRIES {
                        return Err(ClientError::Transport(e));
                    }

                    let wait = Duration::from_millis(200 * (1 << retries));
                    warn!("[Request {}] Error: {}, retry {} after {:?}", url, e, retries, wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

/// Synchronous wrapper for FFI - runs the async batch on a tokio runtime
#[cfg(feature = "ffi")]
pub fn simplify_sessions_sync(
    base_url: String,
    token: Option<String>,
    session_ids: Vec<SessionId>,
    epsilon_meters: Option<f64>,
    on_progress: Option<ProgressCallback>,
) -> Vec<RemoteOutcome> {
    use tokio::runtime::Builder;

    info!("[FFI] simplify_sessions_sync called for {} sessions", session_ids.len());

    let rt = match Builder::new_multi_thread().worker_threads(4).enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            warn!("Failed to create tokio runtime: {}", e);
            return session_ids
                .into_iter()
                .map(|session_id| RemoteOutcome {
                    session_id,
                    result: Err(ClientError::RetriesExhausted(format!("runtime error: {}", e))),
                })
                .collect();
        }
    };

    let client = match TrajectoryClient::new(&base_url, token.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to create client: {}", e);
            let message = e.to_string();
            return session_ids
                .into_iter()
                .map(|session_id| RemoteOutcome {
                    session_id,
                    result: Err(ClientError::RetriesExhausted(message.clone())),
                })
                .collect();
        }
    };

    rt.block_on(client.simplify_sessions(session_ids, epsilon_meters, on_progress))
}
