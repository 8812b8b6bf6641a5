//! Listener and serve-loop tests over a real ephemeral TCP port.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use facereg_core::config::{ServerSettings, StorageMode};
use facereg_core::matching::MatchEngine;
use facereg_core::ops::RegistryOps;
use facereg_server::{AppState, ServerError, bind, serve};
use facereg_store::{BlobTransport, EmbeddingStore, MemoryBlobTransport};
use tokio::sync::oneshot;

fn loopback(port: u16) -> ServerSettings {
    ServerSettings {
        host: String::from("127.0.0.1"),
        port,
    }
}

fn state() -> Arc<AppState> {
    let ops = RegistryOps::new(
        EmbeddingStore::new(BlobTransport::Memory(MemoryBlobTransport::new())),
        MatchEngine::default(),
    );
    Arc::new(AppState::new(ops, StorageMode::Memory))
}

#[tokio::test]
async fn serves_configured_settings_until_shutdown() {
    let listener = bind(&loopback(0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(serve(listener, state(), async move {
        let _ = stopped.await;
    }));

    let body: serde_json::Value = reqwest::get(format!("http://{addr}/"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["storage"], "memory");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn occupied_port_is_a_bind_error() {
    let first = bind(&loopback(0)).await.unwrap();
    let port = first.local_addr().unwrap().port();

    let err = bind(&loopback(port)).await.unwrap_err();
    assert!(matches!(err, ServerError::Bind { .. }));
    assert!(err.to_string().starts_with(&format!("cannot listen on 127.0.0.1:{port}")));
}

#[tokio::test]
async fn unresolvable_host_is_a_bind_error() {
    let settings = ServerSettings {
        host: String::from("not a host"),
        port: 0,
    };
    assert!(matches!(
        bind(&settings).await,
        Err(ServerError::Bind { .. })
    ));
}
