//! Server lifecycle: awaitable startup, idempotent close, and shutdown on
//! termination signals or uncaught faults.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::api::{self, AppState};
use crate::auth::{TokenVerifier, UserStore};
use crate::config::ServerConfig;
use crate::db::{create_connection, ensure_schema};

/// What ended the serving phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// SIGUSR1.
    UserSignal1,
    /// SIGUSR2.
    UserSignal2,
    /// A panic somewhere in the process.
    Fault,
}

impl ShutdownReason {
    fn exit_code(self) -> i32 {
        match self {
            Self::Fault => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Interrupt => "interrupt",
            Self::Terminate => "terminate",
            Self::UserSignal1 => "user signal 1",
            Self::UserSignal2 => "user signal 2",
            Self::Fault => "uncaught fault",
        };
        write!(f, "{}", name)
    }
}

/// Handle to a running server.
///
/// Owns the channels controlling the bound listener. There is no way back to
/// serving after [`Server::close`]: a closed server is gone, start a new one.
pub struct Server {
    addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,
    fault_rx: watch::Receiver<bool>,
}

impl Server {
    /// Connect the data store, bind the listener, and start serving.
    ///
    /// Resolves once the listener is bound. A store connection failure aborts
    /// startup before any socket is opened; a bind failure surfaces the same
    /// way. The bound port is logged and available via [`Server::port`].
    pub async fn start(config: ServerConfig) -> Result<Server> {
        config.validate()?;

        let db = create_connection(config.database.clone())
            .await
            .context("connecting to the data store")?;
        ensure_schema(&db)
            .await
            .context("preparing the data store schema")?;

        let state = AppState {
            users: Arc::new(UserStore::new(db)),
            verifier: Arc::new(TokenVerifier::new(&config.auth)),
            environment: config.environment,
        };
        let app = api::create_router(state);

        let listener = TcpListener::bind(("0.0.0.0", config.port))
            .await
            .context("binding the listener")?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(false);
        let (fault_tx, fault_rx) = watch::channel(false);
        install_fault_hook(fault_tx);

        tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.changed().await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("server error: {}", e);
            }
            let _ = done_tx.send(true);
        });

        info!("Listening on port {}", addr.port());

        Ok(Server {
            addr,
            shutdown_tx,
            done_rx,
            fault_rx,
        })
    }

    /// The bound socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The actual bound port (useful when the config asked for port 0).
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Stop accepting connections and wait for the listener to shut down.
    ///
    /// Idempotent: every call, sequential or concurrent, waits on the same
    /// completion and resolves without error.
    pub async fn close(&self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);

        let mut done = self.done_rx.clone();
        done.wait_for(|finished| *finished)
            .await
            .context("server task dropped before signalling completion")?;
        Ok(())
    }

    /// Serve until a termination signal or an uncaught fault, then close the
    /// listener and exit the process.
    pub async fn run_until_shutdown(self) -> ! {
        let reason = shutdown_trigger(self.fault_rx.clone()).await;
        info!("Shutting down ({})", reason);

        match self.close().await {
            Ok(()) => info!("Server successfully closed"),
            Err(e) => warn!("Something went wrong closing the server: {:#}", e),
        }

        std::process::exit(reason.exit_code())
    }
}

/// Route process panics into the lifecycle fault channel, keeping whatever
/// hook was installed before.
fn install_fault_hook(fault_tx: watch::Sender<bool>) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        previous(info);
        let _ = fault_tx.send(true);
    }));
}

async fn shutdown_trigger(mut fault_rx: watch::Receiver<bool>) -> ShutdownReason {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };
    #[cfg(unix)]
    let user1 = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::user_defined1())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };
    #[cfg(unix)]
    let user2 = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::user_defined2())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    #[cfg(not(unix))]
    let user1 = std::future::pending::<()>();
    #[cfg(not(unix))]
    let user2 = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => ShutdownReason::Interrupt,
        _ = terminate => ShutdownReason::Terminate,
        _ = user1 => ShutdownReason::UserSignal1,
        _ = user2 => ShutdownReason::UserSignal2,
        _ = fault_rx.wait_for(|faulted| *faulted) => ShutdownReason::Fault,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthConfig;
    use crate::config::Environment;
    use crate::db::DatabaseConfig;

    fn test_config(port: u16) -> ServerConfig {
        ServerConfig {
            port,
            database: DatabaseConfig {
                url: "memory".to_string(),
                ..Default::default()
            },
            auth: AuthConfig::new(
                "https://issuer.example.com/",
                "my-api",
                "https://issuer.example.com/.well-known/jwks.json",
            ),
            environment: Environment::Development,
        }
    }

    #[tokio::test]
    async fn test_start_binds_ephemeral_port() {
        let server = Server::start(test_config(0)).await.unwrap();
        assert!(server.port() > 0);
        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_health_served_until_close() {
        let server = Server::start(test_config(0)).await.unwrap();
        let url = format!("http://127.0.0.1:{}/health", server.port());

        let response = reqwest::get(&url).await.unwrap();
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"], "healthy");

        server.close().await.unwrap();

        // The listener is gone after close.
        assert!(reqwest::get(&url).await.is_err());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let server = Server::start(test_config(0)).await.unwrap();
        server.close().await.unwrap();
        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_close() {
        let server = Server::start(test_config(0)).await.unwrap();
        let (a, b) = tokio::join!(server.close(), server.close());
        a.unwrap();
        b.unwrap();
    }

    #[tokio::test]
    async fn test_store_failure_aborts_startup() {
        let mut config = test_config(0);
        config.database.url = "nonsense://nowhere".to_string();
        assert!(Server::start(config).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_auth_config_aborts_startup() {
        let mut config = test_config(0);
        config.auth.jwks_url = "not a url".to_string();
        assert!(Server::start(config).await.is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ShutdownReason::Fault.exit_code(), 1);
        assert_eq!(ShutdownReason::Interrupt.exit_code(), 0);
        assert_eq!(ShutdownReason::Terminate.to_string(), "terminate");
    }
}
