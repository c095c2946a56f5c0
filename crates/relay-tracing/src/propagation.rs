//! Trace context and correlation propagation over HTTP headers.
//!
//! W3C `traceparent` carries the span parent, W3C `baggage` carries
//! correlation entries. The trace parent comes from the active `tracing`
//! span; correlation entries live in a per-request [`Context`] owned by the
//! handler.

use std::sync::Arc;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::baggage::BaggageExt;
use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use tracing_opentelemetry::OpenTelemetrySpanExt;

struct TracerInner {
    service_name: String,
    trace_context: TraceContextPropagator,
    baggage: BaggagePropagator,
}

/// Handle to the tracing collaborator. Built once at startup and passed to
/// handlers explicitly. Cheap to clone (Arc).
#[derive(Clone)]
pub struct Tracer {
    inner: Arc<TracerInner>,
}

impl Tracer {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TracerInner {
                service_name: service_name.into(),
                trace_context: TraceContextPropagator::new(),
                baggage: BaggagePropagator::new(),
            }),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.inner.service_name
    }

    /// Read the caller's trace parent and baggage from inbound headers.
    pub fn extract(&self, headers: &HeaderMap) -> Context {
        let extractor = HeaderExtractor(headers);
        let cx = self.inner.trace_context.extract(&extractor);
        self.inner.baggage.extract_with_context(&cx, &extractor)
    }

    /// Make `cx` the remote parent of `span`.
    pub fn attach(&self, span: &tracing::Span, cx: &Context) {
        let _ = span.set_parent(cx.clone());
    }

    /// Return a copy of `cx` with one more correlation entry.
    pub fn with_correlation(&self, cx: &Context, key: &str, value: &str) -> Context {
        cx.with_baggage([KeyValue::new(key.to_string(), value.to_string())])
    }

    /// Look up a correlation entry.
    pub fn correlation(&self, cx: &Context, key: &str) -> Option<String> {
        cx.baggage().get(key).map(|v| v.to_string())
    }

    /// Write `span`'s trace parent and `cx`'s correlation entries into
    /// outbound headers.
    pub fn inject(&self, span: &tracing::Span, cx: &Context, headers: &mut HeaderMap) {
        let mut injector = HeaderInjector(headers);
        self.inner
            .trace_context
            .inject_context(&span.context(), &mut injector);
        self.inner.baggage.inject_context(cx, &mut injector);
    }
}

struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

struct HeaderInjector<'a>(&'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        // Propagators only emit ASCII names and values; skip anything else
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            self.0.insert(name, value);
        }
    }
}
