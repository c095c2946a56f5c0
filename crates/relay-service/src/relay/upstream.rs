//! Outbound calls to upstream peers.
//!
//! Each call runs inside its own exit span. The span is bound to the call
//! future with `Instrument`, so it closes exactly once when the call finishes,
//! fails, or is dropped mid-flight.

use std::time::Instant;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use opentelemetry::Context;
use relay_tracing::Tracer;
use tracing::Instrument;
use url::Url;

use super::error::RelayError;
use super::request_id::REQUEST_ID_HEADER;

/// One outbound request.
#[derive(Debug, Clone)]
pub struct Outbound<'a> {
    /// Operation name recorded on the exit span.
    pub operation: &'a str,
    pub method: Method,
    pub url: Url,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
    pub request_id: &'a str,
}

/// Upstream answer, fully read.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl IntoResponse for UpstreamResponse {
    /// Relay status and body verbatim.
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        match self.content_type {
            Some(content_type) => {
                response.headers_mut().insert(CONTENT_TYPE, content_type);
            }
            None => {
                response.headers_mut().remove(CONTENT_TYPE);
            }
        }
        response
    }
}

/// HTTP client plus tracer handle. Cheap to clone.
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    tracer: Tracer,
}

impl UpstreamClient {
    pub fn new(client: reqwest::Client, tracer: Tracer) -> Self {
        Self { client, tracer }
    }

    /// Send `outbound` with trace parent and `cx`'s correlation entries
    /// attached, and read the whole response body.
    pub async fn call(
        &self,
        outbound: Outbound<'_>,
        cx: &Context,
    ) -> Result<UpstreamResponse, RelayError> {
        let span = relay_tracing::exit_span!(outbound.operation, outbound.url);
        let start = Instant::now();

        async {
            let result = self.send(outbound, cx).await;

            let latency = start.elapsed().as_millis() as u64;
            let span = tracing::Span::current();
            span.record("latency_ms", latency);

            match &result {
                Ok(resp) => {
                    span.record("status", resp.status.as_u16());
                    tracing::info!(
                        status = resp.status.as_u16(),
                        latency_ms = latency,
                        "Upstream call complete"
                    );
                }
                Err(e) => {
                    span.record("status", 500_u16);
                    span.record("error", tracing::field::display(e));
                    tracing::error!(error = %e, latency_ms = latency, "Upstream call failed");
                }
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn send(
        &self,
        outbound: Outbound<'_>,
        cx: &Context,
    ) -> Result<UpstreamResponse, RelayError> {
        let mut headers = HeaderMap::new();
        self.tracer
            .inject(&tracing::Span::current(), cx, &mut headers);
        if let Ok(value) = HeaderValue::from_str(outbound.request_id) {
            headers.insert(REQUEST_ID_HEADER, value);
        }
        if let Some(content_type) = outbound.content_type {
            headers.insert(CONTENT_TYPE, content_type);
        }

        let resp = self
            .client
            .request(outbound.method, outbound.url)
            .headers(headers)
            .body(outbound.body)
            .send()
            .await
            .map_err(RelayError::from_send)?;

        let status = resp.status();
        let content_type = resp.headers().get(CONTENT_TYPE).cloned();
        let body = resp.bytes().await.map_err(RelayError::ReadBody)?;

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}
