//! Connection dispatcher: accepts TCP connections and gives each one an
//! isolated task running the session state machine against the shared
//! registry and topic catalog.

use crate::quiz::TopicCatalog;
use crate::registry::SharedRegistry;
use crate::session::Session;
use log::{info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// The listening endpoint plus the shared state handed to every session.
pub struct Server {
    listener: TcpListener,
    registry: SharedRegistry,
    catalog: Arc<TopicCatalog>,
}

impl Server {
    pub async fn bind(
        addr: &str,
        registry: SharedRegistry,
        catalog: Arc<TopicCatalog>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            registry,
            catalog,
        })
    }

    /// The bound address; useful when binding to port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop. Each connection runs in its own task, so one session's
    /// disconnect or protocol error never affects the listener or the other
    /// sessions. Ctrl-C stops accepting and marks the registry stopped;
    /// in-flight sessions are left to finish on their own.
    pub async fn run(&self) -> io::Result<()> {
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            info!("New connection from {}", peer);
                            let session = Session::new(
                                stream,
                                peer,
                                self.registry.clone(),
                                Arc::clone(&self.catalog),
                            );
                            tokio::spawn(async move {
                                if let Err(err) = session.run().await {
                                    warn!("Session {} ended with error: {}", peer, err);
                                }
                            });
                        }
                        Err(err) => {
                            // A failed accept does not mean the listener is
                            // unusable; keep going.
                            warn!("accept failed: {}", err);
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    self.registry.shutdown().await;
                    return Ok(());
                }
            }
        }
    }
}
