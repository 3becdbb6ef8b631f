use ingestor_proto::chatdb::chat_database_server::ChatDatabase;
use ingestor_proto::chatdb::{
    ChatMessageProto, ClipProto, GetChatsRequest, GetChatsResponse, GetClipsRequest,
    GetClipsResponse,
};
use ingestor_storage::ChatStore;
use tonic::{Request, Response, Status};

/// Thin translator over the storage adapter (§4.7): reshapes wide-column
/// rows into RPC response messages, mapping storage errors onto tonic
/// status codes and human-readable details.
pub struct ChatDatabaseService {
    store: ChatStore,
}

impl ChatDatabaseService {
    pub fn new(store: ChatStore) -> Self {
        Self { store }
    }
}

#[tonic::async_trait]
impl ChatDatabase for ChatDatabaseService {
    async fn get_chats(
        &self,
        request: Request<GetChatsRequest>,
    ) -> Result<Response<GetChatsResponse>, Status> {
        let req = request.into_inner();
        let rows = self
            .store
            .query_range(req.broadcaster_id, req.start_ms, req.end_ms, req.limit)
            .await
            .map_err(|e| Status::internal(e.to_string()))?;

        let chats = rows
            .into_iter()
            .map(|m| ChatMessageProto {
                broadcaster_id: m.broadcaster_id,
                timestamp: m.timestamp,
                message_id: m.message_id.to_string(),
                message_json: m.message.to_string(),
            })
            .collect();

        Ok(Response::new(GetChatsResponse { chats }))
    }

    async fn get_clips(
        &self,
        request: Request<GetClipsRequest>,
    ) -> Result<Response<GetClipsResponse>, Status> {
        let req = request.into_inner();
        let rows = self
            .store
            .clips()
            .query_range(req.start_s, req.end_s)
            .await
            .map_err(|e| Status::internal(e.to_string()))?;

        let clips = rows
            .into_iter()
            .map(|c| ClipProto {
                clip_id: c.clip_id,
                timestamp: c.timestamp,
                embed_url: c.embed_url,
                thumbnail_url: c.thumbnail_url,
            })
            .collect();

        Ok(Response::new(GetClipsResponse { clips }))
    }
}
