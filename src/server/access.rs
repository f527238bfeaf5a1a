//! Request logging with device classification.

use axum::extract::{ConnectInfo, Request};
use axum::http::header::USER_AGENT;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{FixedOffset, Offset, Utc};
use std::fmt;
use std::net::SocketAddr;

/// Request log timestamps are rendered at UTC+05:30.
const LOG_UTC_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Coarse device class derived from a `User-Agent` header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceClass {
    Mobile,
    Tablet,
    Desktop,
    Unknown,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeviceClass::Mobile => "Mobile Device",
            DeviceClass::Tablet => "Tablet Device",
            DeviceClass::Desktop => "Desktop Device",
            DeviceClass::Unknown => "Unknown Device",
        };
        f.write_str(label)
    }
}

/// Classify a user agent. `Mobile` wins over `Tablet`.
pub fn classify_device(user_agent: Option<&str>) -> DeviceClass {
    match user_agent {
        None => DeviceClass::Unknown,
        Some(ua) if ua.contains("Mobile") => DeviceClass::Mobile,
        Some(ua) if ua.contains("Tablet") => DeviceClass::Tablet,
        Some(_) => DeviceClass::Desktop,
    }
}

fn log_offset() -> FixedOffset {
    FixedOffset::east_opt(LOG_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

pub(super) async fn log_request(request: Request, next: Next) -> Response {
    let user_agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "-".to_string());
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let at = Utc::now().with_timezone(&log_offset());
    tracing::info!(
        target: "driftboard::access",
        "[{}] {} {} from {} - Device: {} - User-Agent: {}",
        at.format("%d/%b/%Y:%H:%M:%S %z"),
        method,
        path,
        peer,
        classify_device(user_agent.as_deref()),
        user_agent.as_deref().unwrap_or("-"),
    );

    next.run(request).await
}
