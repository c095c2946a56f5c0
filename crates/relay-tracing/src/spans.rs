//! Span builder helpers for relay instrumentation.

/// Create a server span for an inbound request.
///
/// Usage: `let span = entry_span!("/correlation", method, request_id);`
///
/// Recorded later by the handler:
/// - `status`: status code returned to the caller
#[macro_export]
macro_rules! entry_span {
    ($operation:expr, $method:expr, $request_id:expr) => {
        tracing::info_span!(
            "entry",
            otel.name = %$operation,
            otel.kind = "server",
            http.method = %$method,
            request_id = %$request_id,
            status = tracing::field::Empty,
        )
    };
}

/// Create a client span for one outbound call, keyed by operation and peer.
///
/// Closed when the instrumented call future completes, whichever way it ends.
/// Fields recorded by the relay:
/// - `status`: upstream status code, or 500 on a local failure
/// - `latency_ms`: time from dispatch to full body (or failure)
/// - `error`: display form of the local failure, if any
#[macro_export]
macro_rules! exit_span {
    ($operation:expr, $target:expr) => {
        tracing::info_span!(
            "exit",
            otel.name = %$operation,
            otel.kind = "client",
            peer = %$target,
            status = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
            error = tracing::field::Empty,
        )
    };
}
