//! Per-request response interception.
//!
//! Each intercepted response runs its own pipeline: chunks are decoded and
//! buffered in arrival order, the complete body is filtered once, and the
//! result goes out in a single write followed by close. Any failure along the
//! way emits the body exactly as it was received.

mod buffer;
mod decoder;
mod process;
mod routes;

use std::{
    collections::HashSet,
    fmt,
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
    task::{JoinError, JoinHandle},
};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::envelope::{EnvelopeError, Rewrite};
use crate::notify::Notifier;
use crate::settings::SettingsStore;

pub use buffer::{BufferedBody, InterceptPhase, ResponseBuffer};
pub use decoder::Utf8StreamDecoder;
pub use process::{process_body, FilterCounts, ProcessedBody};
pub use routes::UrlPattern;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct RequestDetails {
    pub request_id: RequestId,
    pub url: String,
}

impl RequestDetails {
    pub fn new(request_id: impl Into<RequestId>, url: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PassthroughReason {
    DecodeError,
    MalformedEnvelope,
    SettingsUnavailable,
    EncodeError,
    ProcessingFailed,
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum EmitOutcome {
    /// URL is not the catalog data endpoint; bytes were copied as they came.
    NotIntercepted,
    Filtered { kept: usize, total: usize },
    NoCourseData,
    PassedThrough { reason: PassthroughReason },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmitReport {
    pub request_id: RequestId,
    pub outcome: EmitOutcome,
    pub bytes_in: usize,
    pub bytes_out: usize,
}

#[derive(Clone)]
pub struct Interceptor {
    config: Arc<EngineConfig>,
    course_data: Arc<UrlPattern>,
    page_shell: Arc<UrlPattern>,
    settings: SettingsStore,
    notifier: Notifier,
    in_flight: Arc<Mutex<HashSet<RequestId>>>,
}

impl Interceptor {
    pub fn new(config: EngineConfig, settings: SettingsStore, notifier: Notifier) -> Self {
        Self {
            course_data: Arc::new(UrlPattern::new(&config.course_data_url)),
            page_shell: Arc::new(UrlPattern::new(&config.page_shell_url)),
            config: Arc::new(config),
            settings,
            notifier,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn should_intercept(&self, url: &str) -> bool {
        self.course_data.matches(url)
    }

    /// Route one response body from `chunks` to `out`. Bodies of the catalog
    /// endpoint are filtered; everything else is copied untouched. `out` is
    /// shut down once the body has been written.
    pub async fn handle<W>(
        &self,
        request: RequestDetails,
        chunks: mpsc::Receiver<Vec<u8>>,
        out: &mut W,
    ) -> Result<EmitReport>
    where
        W: AsyncWrite + Unpin,
    {
        if !self.should_intercept(&request.url) {
            log_debug!("not intercepting {}: outside {}", request.url, self.course_data);
            return pipe(request.request_id, chunks, out, EmitOutcome::NotIntercepted).await;
        }

        let Some(_claim) = InFlightClaim::acquire(&self.in_flight, &request.request_id) else {
            log_warn!(
                "request {} is already being intercepted; passing through",
                request.request_id
            );
            let outcome = EmitOutcome::PassedThrough {
                reason: PassthroughReason::Duplicate,
            };
            return pipe(request.request_id, chunks, out, outcome).await;
        };

        self.intercept(request, chunks, out).await
    }

    async fn intercept<W>(
        &self,
        request: RequestDetails,
        mut chunks: mpsc::Receiver<Vec<u8>>,
        out: &mut W,
    ) -> Result<EmitReport>
    where
        W: AsyncWrite + Unpin,
    {
        let request_id = request.request_id;
        log_info!("intercepting request {request_id} ({})", request.url);

        let mut buffer = ResponseBuffer::new(request_id.clone());
        while let Some(chunk) = chunks.recv().await {
            buffer.push_chunk(&chunk);
        }
        let body = buffer.finalize();
        let bytes_in = body.raw.len();

        let (bytes, processed) = self.rewrite(&request_id, body).await;

        out.write_all(&bytes)
            .await
            .with_context(|| format!("failed to emit body for request {request_id}"))?;
        out.shutdown()
            .await
            .with_context(|| format!("failed to close stream for request {request_id}"))?;
        buffer.mark_emitted();

        let outcome = match processed {
            Ok(processed) => {
                let outcome = match processed.counts {
                    Some(FilterCounts { kept, total }) => EmitOutcome::Filtered { kept, total },
                    None => EmitOutcome::NoCourseData,
                };
                self.record_course_periods(&request_id, processed).await;
                outcome
            }
            Err(reason) => EmitOutcome::PassedThrough { reason },
        };

        if let Err(err) = self.settings.set_courses_loaded(true).await {
            log_error!("request {request_id}: failed to set coursesLoaded: {err:#}");
        }

        log_info!(
            "request {request_id} emitted: {outcome:?} ({bytes_in} bytes in, {} out)",
            bytes.len()
        );

        Ok(EmitReport {
            request_id,
            outcome,
            bytes_in,
            bytes_out: bytes.len(),
        })
    }

    /// Bytes to emit, plus either the filter result or why the original body
    /// goes out instead.
    async fn rewrite(
        &self,
        request_id: &RequestId,
        body: BufferedBody,
    ) -> (Vec<u8>, Result<ProcessedBody, PassthroughReason>) {
        if body.decode_failed {
            log_warn!("request {request_id}: body is not valid UTF-8; emitting as received");
            return (body.raw, Err(PassthroughReason::DecodeError));
        }

        let selection = match self.settings.filter_selection().await {
            Ok(selection) => selection,
            Err(err) => {
                log_error!("request {request_id}: failed to load filter selection: {err:#}");
                return (body.raw, Err(PassthroughReason::SettingsUnavailable));
            }
        };

        let config = Arc::clone(&self.config);
        let text = body.text;
        let result = tokio::task::spawn_blocking(move || {
            let calendar = config.calendar();
            process_body(
                &text,
                &selection,
                &calendar,
                &config.filter_config(),
                config.period_field.as_deref(),
            )
        })
        .await;

        settle(request_id, result, body.raw)
    }

    async fn record_course_periods(&self, request_id: &RequestId, processed: ProcessedBody) {
        if processed.course_periods.is_empty() {
            return;
        }
        match self
            .settings
            .merge_course_periods(processed.course_periods)
            .await
        {
            Ok(size) => log_debug!("request {request_id}: coursePeriods now holds {size} entries"),
            Err(err) => log_error!("request {request_id}: failed to store coursePeriods: {err:#}"),
        }
    }

    /// Completion of the page-shell request means the page is about to be able
    /// to listen; start the load-complete notification.
    pub fn on_request_completed(&self, url: &str) -> Option<JoinHandle<bool>> {
        if !self.page_shell.matches(url) {
            return None;
        }
        log_debug!("page shell loaded ({url}); notifying page");
        Some(self.notifier.notify_load_complete())
    }
}

/// Read `reader` to EOF in pieces of at most `chunk_size` bytes, sending each
/// piece as one chunk. Stops early if the receiving side has gone away.
pub async fn read_chunks<R>(
    mut reader: R,
    chunk_size: usize,
    chunks: mpsc::Sender<Vec<u8>>,
) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut total = 0;
    loop {
        let read = reader
            .read(&mut buf)
            .await
            .context("failed to read response body")?;
        if read == 0 {
            break;
        }
        total += read;
        if chunks.send(buf[..read].to_vec()).await.is_err() {
            log_warn!("body consumer went away after {total} bytes");
            break;
        }
    }
    Ok(total)
}

/// Copy chunks to `out` as they arrive.
async fn pipe<W>(
    request_id: RequestId,
    mut chunks: mpsc::Receiver<Vec<u8>>,
    out: &mut W,
    outcome: EmitOutcome,
) -> Result<EmitReport>
where
    W: AsyncWrite + Unpin,
{
    let mut bytes = 0;
    while let Some(chunk) = chunks.recv().await {
        out.write_all(&chunk)
            .await
            .with_context(|| format!("failed to forward body for request {request_id}"))?;
        bytes += chunk.len();
    }
    out.shutdown()
        .await
        .with_context(|| format!("failed to close stream for request {request_id}"))?;

    Ok(EmitReport {
        request_id,
        outcome,
        bytes_in: bytes,
        bytes_out: bytes,
    })
}

/// Marks a request id as in flight until dropped.
struct InFlightClaim {
    set: Arc<Mutex<HashSet<RequestId>>>,
    request_id: RequestId,
}

impl InFlightClaim {
    fn acquire(set: &Arc<Mutex<HashSet<RequestId>>>, request_id: &RequestId) -> Option<Self> {
        let mut guard = match set.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !guard.insert(request_id.clone()) {
            return None;
        }
        Some(Self {
            set: Arc::clone(set),
            request_id: request_id.clone(),
        })
    }
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        let mut guard = match self.set.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.remove(&self.request_id);
    }
}

/// Maps the outcome of the blocking filter task to the bytes to emit. A task
/// that failed or panicked leaves `raw` untouched.
fn settle(
    request_id: &RequestId,
    result: std::result::Result<std::result::Result<ProcessedBody, EnvelopeError>, JoinError>,
    raw: Vec<u8>,
) -> (Vec<u8>, Result<ProcessedBody, PassthroughReason>) {
    match result {
        Ok(Ok(mut processed)) => {
            let rewrite = std::mem::replace(&mut processed.rewrite, Rewrite::Passthrough);
            (rewrite.into_bytes(raw), Ok(processed))
        }
        Ok(Err(err)) => {
            log_warn!("request {request_id}: {err}; emitting original body");
            let reason = match err {
                EnvelopeError::Encode(_) => PassthroughReason::EncodeError,
                EnvelopeError::Malformed(_) | EnvelopeError::MissingCourseData => {
                    PassthroughReason::MalformedEnvelope
                }
            };
            (raw, Err(reason))
        }
        Err(join_err) => {
            log_error!("request {request_id}: filter task failed: {join_err}");
            (raw, Err(PassthroughReason::ProcessingFailed))
        }
    }
}
