//! TCP accept loop with WebSocket upgrade.

use std::sync::Arc;

use lanbeam_config::RelayServerConfig;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;

use crate::connection::handle_connection;
use crate::room::RoomStore;

/// Accept connections on `listener` forever, one task per connection.
pub async fn serve(listener: TcpListener, store: RoomStore, config: RelayServerConfig) {
    let config = Arc::new(config);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let store = store.clone();
                let config = Arc::clone(&config);
                tokio::spawn(async move {
                    match accept_async(stream).await {
                        Ok(ws) => handle_connection(ws, addr, store, config).await,
                        Err(e) => {
                            tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
                        }
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "TCP accept error");
            }
        }
    }
}
