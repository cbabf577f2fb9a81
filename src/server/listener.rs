//! Relay server
//!
//! Binds the HTTP listener, connects to the simulator and runs the router
//! and dispatcher timelines until shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::airports::AirportLookup;
use crate::error::Result;
use crate::server::config::HubConfig;
use crate::server::context::HubContext;
use crate::server::dispatcher::BroadcastDispatcher;
use crate::server::http;
use crate::server::router::MessageRouter;
use crate::sim::{connect_with_retry, SimEvent, SimSource};
use crate::transport::{ChannelTransport, TransportEvent};

/// Websocket relay for a simulation source
pub struct HubServer<S: SimSource> {
    ctx: Arc<HubContext<S, ChannelTransport>>,
    transport_events: mpsc::Receiver<TransportEvent>,
    sim_events: mpsc::Receiver<SimEvent>,
    shutdown: CancellationToken,
}

impl<S: SimSource> HubServer<S> {
    /// Create a server for `sim`, reading its events from `sim_events`
    pub fn new(config: HubConfig, sim: Arc<S>, sim_events: mpsc::Receiver<SimEvent>) -> Self {
        Self::build(config, sim, sim_events, None)
    }

    /// Create a server that also answers `airports` requests
    pub fn with_airports(
        config: HubConfig,
        sim: Arc<S>,
        sim_events: mpsc::Receiver<SimEvent>,
        airports: Arc<dyn AirportLookup>,
    ) -> Self {
        Self::build(config, sim, sim_events, Some(airports))
    }

    fn build(
        config: HubConfig,
        sim: Arc<S>,
        sim_events: mpsc::Receiver<SimEvent>,
        airports: Option<Arc<dyn AirportLookup>>,
    ) -> Self {
        let (transport, transport_events) = ChannelTransport::new(config.client_buffer);
        let mut ctx = HubContext::new(config, sim, Arc::new(transport));
        if let Some(airports) = airports {
            ctx = ctx.with_airports(airports);
        }

        Self {
            ctx: Arc::new(ctx),
            transport_events,
            sim_events,
            shutdown: CancellationToken::new(),
        }
    }

    /// Get a reference to the shared context
    pub fn context(&self) -> &Arc<HubContext<S, ChannelTransport>> {
        &self.ctx
    }

    /// Token that stops the server when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Get a reference to the client transport
    pub fn transport(&self) -> &Arc<ChannelTransport> {
        &self.ctx.transport
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.ctx.config.bind_addr
    }

    /// Run the server until the simulator quits or the shutdown token fires
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.ctx.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Run on an already bound listener
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let Self {
            ctx,
            transport_events,
            sim_events,
            shutdown: token,
        } = self;
        let sessions = TaskTracker::new();

        match listener.local_addr() {
            Ok(addr) => tracing::info!(addr = %addr, "Relay listening"),
            Err(e) => tracing::warn!(error = %e, "Relay listening on unknown address"),
        }

        let router = MessageRouter::new(Arc::clone(&ctx));
        let dispatcher = BroadcastDispatcher::new(Arc::clone(&ctx));

        let mut tasks: Vec<JoinHandle<()>> = vec![
            tokio::spawn(http::serve(
                listener,
                Arc::clone(&ctx),
                token.clone(),
                sessions.clone(),
            )),
            tokio::spawn(router.run(transport_events, token.clone())),
            tokio::spawn(dispatcher.clone().run_status(token.clone())),
        ];

        tokio::pin!(shutdown);

        let config = &ctx.config;
        let connected = tokio::select! {
            result = connect_with_retry(
                &*ctx.sim,
                &config.connection_name,
                config.connect_retry_interval,
                config.connect_timeout,
            ) => Some(result),
            _ = &mut shutdown => None,
            _ = token.cancelled() => None,
        };

        match connected {
            Some(Ok(())) => {
                tasks.push(tokio::spawn(
                    dispatcher.run_sim_events(sim_events, token.clone()),
                ));

                tokio::select! {
                    _ = &mut shutdown => tracing::info!("Shutdown signal received"),
                    _ = token.cancelled() => tracing::info!("Simulator session ended"),
                }
            }
            Some(Err(e)) => {
                token.cancel();
                drain(tasks, &sessions, config.shutdown_grace).await;
                return Err(e);
            }
            None => tracing::info!("Shutdown requested before the simulator connected"),
        }

        token.cancel();
        drain(tasks, &sessions, config.shutdown_grace).await;

        ctx.sim.close()?;
        tracing::info!("Relay stopped");
        Ok(())
    }
}

/// Wait for tasks and websocket sessions to finish, aborting the tasks still
/// running after `grace`
///
/// Sessions flush their outbound queues and stop themselves within the same
/// grace period.
async fn drain(
    tasks: Vec<JoinHandle<()>>,
    sessions: &TaskTracker,
    grace: std::time::Duration,
) {
    sessions.close();
    let aborts: Vec<_> = tasks.iter().map(|t| t.abort_handle()).collect();

    let finished = tokio::time::timeout(grace, async {
        futures::future::join_all(tasks).await;
        sessions.wait().await;
    })
    .await;

    if finished.is_err() {
        tracing::warn!(grace = ?grace, "Tasks still running after grace period, aborting");
        for handle in aborts {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::Error;
    use crate::sim::{ConnectInfo, MemorySimSource};

    fn config() -> HubConfig {
        HubConfig::with_addr("127.0.0.1:0".parse().unwrap())
            .connect_retry_interval(Duration::from_millis(10))
            .connect_timeout(Duration::from_secs(5))
            .shutdown_grace(Duration::from_millis(500))
    }

    async fn listener() -> TcpListener {
        TcpListener::bind("127.0.0.1:0").await.unwrap()
    }

    #[tokio::test]
    async fn test_sim_quit_stops_server() {
        let (sim, sim_events) = MemorySimSource::new(ConnectInfo::default());
        let sim = Arc::new(sim);
        let server = HubServer::new(config(), Arc::clone(&sim), sim_events);

        let task = tokio::spawn(server.serve(listener().await, std::future::pending()));

        while !sim.is_connected() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        sim.quit().await;

        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        tokio_test::assert_ok!(result);
        assert!(!sim.is_connected());
    }

    #[tokio::test]
    async fn test_connect_timeout_returns_error() {
        let (sim, sim_events) = MemorySimSource::new(ConnectInfo::default());
        sim.refuse_opens(u32::MAX);
        let config = config().connect_timeout(Duration::from_millis(50));
        let server = HubServer::new(config, Arc::new(sim), sim_events);

        let result = server.serve(listener().await, std::future::pending()).await;

        assert!(matches!(result, Err(Error::ConnectTimeout(_))));
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_server() {
        let (sim, sim_events) = MemorySimSource::new(ConnectInfo::default());
        let sim = Arc::new(sim);
        let server = HubServer::new(config(), Arc::clone(&sim), sim_events);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let task = tokio::spawn(server.serve(listener().await, async {
            let _ = rx.await;
        }));

        while !sim.is_connected() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tx.send(()).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        tokio_test::assert_ok!(result);
    }

    #[tokio::test]
    async fn test_shutdown_token_before_connect() {
        let (sim, sim_events) = MemorySimSource::new(ConnectInfo::default());
        sim.refuse_opens(u32::MAX);
        let server = HubServer::new(config(), Arc::new(sim), sim_events);
        let token = server.shutdown_token();

        let task = tokio::spawn(server.serve(listener().await, std::future::pending()));
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        tokio_test::assert_ok!(result);
    }

    #[tokio::test]
    async fn test_serves_debug_page() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (sim, sim_events) = MemorySimSource::new(ConnectInfo::default());
        let server = HubServer::new(config(), Arc::new(sim), sim_events);
        let token = server.shutdown_token();
        let listener = listener().await;
        let addr = listener.local_addr().unwrap();

        let task = tokio::spawn(server.serve(listener, std::future::pending()));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /debug HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("SimVar Relay"));

        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
