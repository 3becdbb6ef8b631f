use std::collections::HashMap;

use ingestor_core::FixedWindowLimiter;
use ingestor_proto::ratelimiter::rate_limiter_server::RateLimiter as RateLimiterRpc;
use ingestor_proto::ratelimiter::{ConsumeTokenRequest, ConsumeTokenResponse};
use tokio::sync::Mutex;
use tonic::{Request, Response, Status};

/// Single in-memory map behind one global mutex (§4.5, §5 "state is
/// protected by a single mutex").
pub struct RateLimiterService {
    limiters: Mutex<HashMap<String, FixedWindowLimiter>>,
    limit: u32,
    window_seconds: i64,
}

impl RateLimiterService {
    pub fn new(limit: u32, window_seconds: i64) -> Self {
        Self {
            limiters: Mutex::new(HashMap::new()),
            limit,
            window_seconds,
        }
    }
}

#[tonic::async_trait]
impl RateLimiterRpc for RateLimiterService {
    /// Denial is an expected result (`success: false`), not an RPC error
    /// (§4.5, §7 "Rate-limiter denial").
    async fn consume_token(
        &self,
        request: Request<ConsumeTokenRequest>,
    ) -> Result<Response<ConsumeTokenResponse>, Status> {
        let req = request.into_inner();
        let mut limiters = self.limiters.lock().await;
        let limiter = limiters
            .entry(req.id)
            .or_insert_with(|| FixedWindowLimiter::new(self.limit, self.window_seconds));
        let success = limiter.consume_token(req.timestamp_s);

        Ok(Response::new(ConsumeTokenResponse { success }))
    }
}
