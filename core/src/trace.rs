//! Per-call diagnostic records.

use std::fmt::Debug;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::Bytes;
use log::{error, info, warn};

use crate::utils::RedactHeader;
use crate::{ApiDescriptor, ContentType, Context, Error, Header, Input, Method, RemoteAddr};

/// How a traced call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceOutcome {
    /// The transport returned a response, whatever its status.
    Success {
        /// HTTP status code.
        status: u16,
        /// Body, lossily decoded as UTF-8.
        body: String,
    },
    /// The call failed before a response was received.
    Failure {
        /// Rendered error.
        error: String,
    },
    /// The call was dropped or cancelled before finishing.
    Cancelled,
}

/// TraceRecord describes one call, from signing to response.
#[derive(Debug, Clone)]
pub struct TraceRecord {
    /// Descriptor host.
    pub host: String,
    /// Descriptor path.
    pub path: String,
    /// Descriptor method.
    pub method: Method,
    /// Descriptor content type.
    pub content_type: ContentType,
    /// Final headers, after signing and merging.
    pub header: Header,
    /// Final input, after signing.
    pub input: Input,
    /// Peer address, when the transport reported it.
    pub remote_addr: Option<SocketAddr>,
    /// Time from the start of the call until the record was emitted.
    pub latency: Duration,
    /// How the call ended.
    pub outcome: TraceOutcome,
}

/// RecordTrace receives one record per call.
pub trait RecordTrace: Debug + Send + Sync + 'static {
    /// Whether records should be built at all.
    ///
    /// Building a record clones the call's headers and input, sinks that drop
    /// everything return `false` to skip that work.
    fn enabled(&self) -> bool {
        true
    }

    /// Consume a finished record.
    fn record(&self, record: &TraceRecord);
}

/// NoopRecordTrace drops every record.
///
/// This is used when no trace sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecordTrace;

impl RecordTrace for NoopRecordTrace {
    fn enabled(&self) -> bool {
        false
    }

    fn record(&self, _record: &TraceRecord) {}
}

/// LogRecordTrace writes records through the `log` facade under the
/// `reqcall::trace` target.
///
/// Successful calls are logged at `info`, failures at `error` and cancelled
/// calls at `warn`. Credentials in well-known headers are redacted.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRecordTrace;

impl RecordTrace for LogRecordTrace {
    fn record(&self, r: &TraceRecord) {
        let remote_addr = r
            .remote_addr
            .map(|addr| addr.to_string())
            .unwrap_or_default();
        let cost = r.latency.as_millis();
        let input = serde_json::Value::Object(r.input.clone());

        match &r.outcome {
            TraceOutcome::Success { status, body } => info!(
                target: "reqcall::trace",
                "host={} path={} method={} content_type={} header={:?} input={} remote_addr={} cost={}ms status={} response={}",
                r.host, r.path, r.method, r.content_type, RedactHeader(&r.header), input, remote_addr, cost, status, body
            ),
            TraceOutcome::Failure { error } => error!(
                target: "reqcall::trace",
                "host={} path={} method={} content_type={} header={:?} input={} remote_addr={} cost={}ms error={}",
                r.host, r.path, r.method, r.content_type, RedactHeader(&r.header), input, remote_addr, cost, error
            ),
            TraceOutcome::Cancelled => warn!(
                target: "reqcall::trace",
                "host={} path={} method={} content_type={} header={:?} input={} cost={}ms cancelled",
                r.host, r.path, r.method, r.content_type, RedactHeader(&r.header), input, cost
            ),
        }
    }
}

/// TraceScope emits a record when dropped, so every exit path of a call is
/// traced exactly once.
///
/// A scope dropped without an outcome records [`TraceOutcome::Cancelled`].
pub(crate) struct TraceScope<'a> {
    ctx: &'a Context,
    start: Instant,
    record: Option<TraceRecord>,
}

impl<'a> TraceScope<'a> {
    pub(crate) fn new(ctx: &'a Context, api: &ApiDescriptor, input: &Input, header: &Header) -> Self {
        let record = ctx.trace_enabled().then(|| TraceRecord {
            host: api.host.clone(),
            path: api.path.clone(),
            method: api.method,
            content_type: api.content_type,
            header: header.clone(),
            input: input.clone(),
            remote_addr: None,
            latency: Duration::ZERO,
            outcome: TraceOutcome::Cancelled,
        });

        Self {
            ctx,
            start: Instant::now(),
            record,
        }
    }

    /// Replace the recorded payload with the values that are actually sent.
    pub(crate) fn set_payload(&mut self, input: &Input, header: &Header) {
        if let Some(r) = self.record.as_mut() {
            r.input = input.clone();
            r.header = header.clone();
        }
    }

    pub(crate) fn success(&mut self, resp: &http::Response<Bytes>) {
        if let Some(r) = self.record.as_mut() {
            r.remote_addr = resp.extensions().get::<RemoteAddr>().map(|addr| addr.0);
            r.outcome = TraceOutcome::Success {
                status: resp.status().as_u16(),
                body: String::from_utf8_lossy(resp.body()).into_owned(),
            };
        }
    }

    pub(crate) fn failure(&mut self, err: &Error) {
        if let Some(r) = self.record.as_mut() {
            r.outcome = TraceOutcome::Failure {
                error: err.to_string(),
            };
        }
    }
}

impl Drop for TraceScope<'_> {
    fn drop(&mut self) {
        if let Some(mut record) = self.record.take() {
            record.latency = self.start.elapsed();
            self.ctx.record_trace(&record);
        }
    }
}
