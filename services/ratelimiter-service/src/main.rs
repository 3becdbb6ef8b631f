//! Sliding-window rate limiter service, exposed over gRPC (§4.5).

mod service;

use ingestor_config::{GrpcSettings, RateLimiterSettings};
use ingestor_proto::ratelimiter::rate_limiter_server::RateLimiterServer;
use tonic::transport::Server;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::service::RateLimiterService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ratelimiter_service=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let grpc = GrpcSettings::from_env()?;
    let rate_limiter = RateLimiterSettings::from_env()?;

    let service = RateLimiterService::new(rate_limiter.limit, rate_limiter.window_seconds);

    let addr = format!("0.0.0.0:{}", grpc.ratelimiter_grpc_port).parse()?;
    info!(%addr, "rate limiter service listening");

    Server::builder()
        .add_service(RateLimiterServer::new(service))
        .serve_with_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
