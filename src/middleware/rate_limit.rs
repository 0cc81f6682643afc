use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::{to_bytes, Body, Bytes};
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;

const WINDOW: Duration = Duration::from_secs(1);
/// Stale windows are swept once this many callers are tracked.
const SWEEP_AT: usize = 1024;
const MAX_LIMITED_BODY: usize = 64 * 1024;
const ANONYMOUS: &str = "anonymous";

#[derive(Debug, Clone, Copy)]
struct Window {
    opened: Instant,
    used: u32,
}

/// Fixed one-second windows kept separately for every caller, so one busy
/// user cannot starve the others.
#[derive(Clone, Debug)]
pub struct UserRateLimiter {
    per_second: u32,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl UserRateLimiter {
    pub fn new(per_second: u32) -> Self {
        Self {
            per_second: per_second.max(1),
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn check_at(&self, caller: &str, now: Instant) -> bool {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if windows.len() >= SWEEP_AT {
            windows.retain(|_, w| now.duration_since(w.opened) < WINDOW);
        }

        let window = windows.entry(caller.to_string()).or_insert(Window {
            opened: now,
            used: 0,
        });
        if now.duration_since(window.opened) >= WINDOW {
            *window = Window {
                opened: now,
                used: 0,
            };
        }
        if window.used >= self.per_second {
            return false;
        }
        window.used += 1;
        true
    }

    pub fn check(&self, caller: &str) -> bool {
        self.check_at(caller, Instant::now())
    }

    fn tracked(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[derive(Deserialize)]
struct Caller {
    #[serde(default)]
    user_id: String,
}

/// The `user_id` of a JSON body, or a shared bucket when there is none.
fn caller_of(body: &Bytes) -> String {
    serde_json::from_slice::<Caller>(body)
        .ok()
        .map(|c| c.user_id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| ANONYMOUS.to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "status": "error", "message": message }))).into_response()
}

/// Buffers the JSON body to find the caller, charges their window, then
/// hands the untouched request on.
pub async fn per_user_limit(
    State(limiter): State<UserRateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let (parts, body) = req.into_parts();
    let bytes = match to_bytes(body, MAX_LIMITED_BODY).await {
        Ok(bytes) => bytes,
        Err(_) => return error_response(StatusCode::PAYLOAD_TOO_LARGE, "request body too large"),
    };

    let caller = caller_of(&bytes);
    if !limiter.check(&caller) {
        tracing::warn!(
            path = %parts.uri.path(),
            caller = %caller,
            per_second = limiter.per_second,
            tracked = limiter.tracked(),
            "Rate limit exceeded"
        );
        return error_response(StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded");
    }
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
