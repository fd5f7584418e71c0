//! Server lifecycle.

use crate::{routes::create_router, shutdown::shutdown_signal, state::AppState};
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

/// HTTP front-end bound to the configured address.
#[derive(Debug)]
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a server over `state`.
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Address from the server configuration.
    pub fn bind_address(&self) -> String {
        let server = &self.state.config.server;
        format!("{}:{}", server.host, server.port)
    }

    /// Bind and serve until a shutdown signal arrives.
    ///
    /// # Errors
    /// Returns error if the address cannot be bound or serving fails
    pub async fn run(self) -> io::Result<()> {
        let listener = TcpListener::bind(self.bind_address()).await?;
        self.run_with_listener(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// # Errors
    /// Returns error if serving fails
    pub async fn run_with_listener<F>(self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let local_addr: SocketAddr = listener.local_addr()?;
        let static_dir = self.state.config.server.static_dir.clone();
        info!(
            address = %local_addr,
            static_dir = ?static_dir,
            "Server listening"
        );

        axum::serve(listener, create_router(self.state))
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server stopped");
        Ok(())
    }
}
