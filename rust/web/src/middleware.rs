use std::time::Instant;
use warp::filters::BoxedFilter;
use warp::http::{Method, StatusCode};
use warp::path::FullPath;
use warp::reply::Response;
use warp::Filter;

/// Wrap `routes` so every request is logged once with its status and
/// latency.
pub fn with_request_logging(routes: BoxedFilter<(Response,)>) -> BoxedFilter<(Response,)> {
    warp::path::full()
        .and(warp::method())
        .map(|path: FullPath, method: Method| (path, method, Instant::now()))
        .and(routes)
        .map(
            |(path, method, start): (FullPath, Method, Instant), response: Response| {
                log_response(
                    response.status(),
                    path.as_str(),
                    method.as_str(),
                    start.elapsed().as_millis(),
                );
                response
            },
        )
        .boxed()
}

/// Log level follows the status class.
pub fn log_response(status: StatusCode, path: &str, method: &str, duration_ms: u128) {
    let status = status.as_u16();
    if status >= 500 {
        tracing::error!(status, path, method, duration_ms, "server error");
    } else if status >= 400 {
        tracing::warn!(status, path, method, duration_ms, "client error");
    } else {
        tracing::debug!(status, path, method, duration_ms, "response sent");
    }
}
