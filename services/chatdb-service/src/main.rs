//! Chat-DB facade: exposes the storage adapter over gRPC (§4.7).

mod service;

use ingestor_config::{GrpcSettings, StorageSettings};
use ingestor_proto::chatdb::chat_database_server::ChatDatabaseServer;
use ingestor_storage::ChatStore;
use tonic::transport::Server;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::service::ChatDatabaseService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatdb_service=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let grpc = GrpcSettings::from_env()?;
    let storage = StorageSettings::from_env()?;

    let store = ChatStore::connect(&storage.scylla_node_list(), &storage.keyspace).await?;
    let service = ChatDatabaseService::new(store);

    let addr = format!("0.0.0.0:{}", grpc.database_grpc_port).parse()?;
    info!(%addr, "chat-DB facade listening");

    Server::builder()
        .add_service(ChatDatabaseServer::new(service))
        .serve_with_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
