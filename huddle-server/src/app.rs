use crate::config::ServerConfig;
use crate::signaling::{SignalingService, ws_handler};
use axum::{Router, routing::get};
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub fn router(service: SignalingService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(service)
}

/// A running relay bound to [`ServerHandle::addr`].
pub struct ServerHandle {
    pub addr: SocketAddr,
    pub service: SignalingService,
    shutdown_tx: oneshot::Sender<()>,
    join_handle: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.join_handle.await;
    }

    /// Runs until the server stops on its own. Dropping the shutdown sender
    /// would stop it, so it is kept alive for the whole wait.
    pub async fn wait(self) -> anyhow::Result<()> {
        let ServerHandle {
            shutdown_tx,
            join_handle,
            ..
        } = self;
        join_handle.await??;
        drop(shutdown_tx);
        Ok(())
    }
}

pub async fn start(listen: SocketAddr, service: SignalingService) -> anyhow::Result<ServerHandle> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    let addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let app = router(service.clone());
    let join_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    info!("Signaling relay listening on ws://{}/ws", addr);

    Ok(ServerHandle {
        addr,
        service,
        shutdown_tx,
        join_handle,
    })
}

pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let service = SignalingService::new(config.ice_servers());
    start(config.listen, service).await?.wait().await
}
