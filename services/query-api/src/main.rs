//! HTTP query API: paginated chat and clip history over the chat-DB facade
//! RPC (§4.9).

mod error;
mod handlers;
mod routes;
mod state;

use clap::Parser;
use ingestor_config::{GrpcSettings, QueryApiSettings};
use ingestor_proto::chatdb::chat_database_client::ChatDatabaseClient;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "query-api")]
#[command(about = "Paginated chat/clip history HTTP API")]
struct Args {
    /// Host:port the chat-DB facade's gRPC endpoint listens on.
    #[arg(long, env = "DATABASE_GRPC_SERVER")]
    database_grpc_server: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "query_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut grpc = GrpcSettings::from_env()?;
    if let Some(server) = args.database_grpc_server {
        grpc.database_grpc_server = server;
    }
    let settings = QueryApiSettings::from_env()?;

    let chatdb_addr = format!("http://{}", grpc.database_grpc_addr());
    info!(chatdb_addr, "connecting to chat-DB facade");
    let chatdb = ChatDatabaseClient::connect(chatdb_addr).await?;

    let state = AppState {
        chatdb,
        settings: settings.clone(),
    };
    let router = routes::build_router(state);

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    info!(addr = %settings.bind_addr, "query API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
