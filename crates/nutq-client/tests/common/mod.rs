#![allow(dead_code)]

use axum::Router;
use nutq_client::ClientConfig;
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral local port and return a client config for it.
pub async fn spawn_backend(router: Router) -> ClientConfig {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Test backend failed");
    });

    ClientConfig::new(format!("http://{addr}"))
}
