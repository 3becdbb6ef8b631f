use ingestor_config::QueryApiSettings;
use ingestor_proto::chatdb::chat_database_client::ChatDatabaseClient;
use tonic::transport::Channel;

/// Shared application state: one RPC client per process, reused across
/// requests (§5 "no shared mutable state other than the RPC client, thread
/// safe by contract of the RPC runtime").
#[derive(Clone)]
pub struct AppState {
    pub chatdb: ChatDatabaseClient<Channel>,
    pub settings: QueryApiSettings,
}
