//! Generated gRPC client/server stubs for the `ChatDatabase` and
//! `RateLimiter` RPC surfaces (§6). The `.proto` sources live under
//! `proto/`; `build.rs` compiles them with `tonic-build`.

pub mod chatdb {
    tonic::include_proto!("ingestor.chatdb");
}

pub mod ratelimiter {
    tonic::include_proto!("ingestor.ratelimiter");
}
