use std::{num::NonZeroU32, sync::Arc};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

use crate::error::AppError;

/// RateLimitState
///
/// One token bucket shared by every request and every client. The bucket
/// refills at `rps` tokens per second and holds at most `rps` tokens.
pub type RateLimitState = Arc<DefaultDirectRateLimiter>;

pub fn new_limiter(rps: u32) -> RateLimitState {
    // A zero budget would reject everything; treat it as the minimum instead.
    let per_second = NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_second(per_second)))
}

/// rate_limit_middleware
///
/// Admits the request when a token is available, otherwise answers 429 without
/// running the rest of the stack.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    if limiter.check().is_err() {
        tracing::warn!(uri = %request.uri(), "rate limit exceeded");
        return AppError::TooManyRequests.into_response();
    }
    next.run(request).await
}
