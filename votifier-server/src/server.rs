//! TCP vote listener.

use crate::config::Config;
use crate::context::ServerContext;
use crate::dispatch::{CommandSender, RconCommandSender};
use crate::error::ServerError;
use crate::event::{ConnectionInfo, Event, Listener, ListenerRegistry, Notifier};
use crate::handler::ConnectionHandler;
use crate::logging::LoggingListener;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use votifier_protocol::{RsaPrivateKey, VoteCipher};

/// State that exists only while the server is running.
struct Lifecycle {
    shutdown: broadcast::Sender<()>,
    accept_task: JoinHandle<()>,
}

/// Votifier listener.
///
/// One task accepts connections; every accepted connection gets its own task
/// running a [`ConnectionHandler`]. Stopping ends the accept loop but leaves
/// in-flight connections to finish on their own. Dropping a running server
/// signals the accept loop to exit without waiting for it.
pub struct Server {
    context: ServerContext,
    listeners: Arc<ListenerRegistry>,
    sender: Arc<dyn CommandSender>,
    running: Arc<AtomicBool>,
    lifecycle: Mutex<Option<Lifecycle>>,
    local_addr: parking_lot::Mutex<Option<SocketAddr>>,
}

impl Server {
    /// Creates a server that forwards votes over RCON and logs every event.
    pub fn new(config: Config) -> Self {
        Self::with_sender(config, Arc::new(RconCommandSender::default()))
    }

    /// Creates a server with a custom command sender and the logging listener.
    pub fn with_sender(config: Config, sender: Arc<dyn CommandSender>) -> Self {
        let server = Self::without_default_listeners(config, sender);
        server.register_listener(Arc::new(LoggingListener));
        server
    }

    /// Creates a server with no listeners registered.
    pub fn without_default_listeners(config: Config, sender: Arc<dyn CommandSender>) -> Self {
        Self {
            context: ServerContext::new(config),
            listeners: Arc::new(ListenerRegistry::new()),
            sender,
            running: Arc::new(AtomicBool::new(false)),
            lifecycle: Mutex::new(None),
            local_addr: parking_lot::Mutex::new(None),
        }
    }

    /// Binds `bind_addr` and starts accepting votes encrypted for
    /// `private_key`. Returns the bound address.
    pub async fn start(
        &self,
        bind_addr: SocketAddr,
        private_key: RsaPrivateKey,
    ) -> Result<SocketAddr, ServerError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        let listener = TcpListener::bind(bind_addr).await?;
        let local_addr = listener.local_addr()?;
        let cipher = Arc::new(VoteCipher::new(private_key));
        let notifier = self.notifier();

        notifier.emit(Event::ServerStarting);
        self.running.store(true, Ordering::SeqCst);
        *self.local_addr.lock() = Some(local_addr);
        notifier.emit(Event::ServerStarted { local_addr });

        let (shutdown, shutdown_rx) = broadcast::channel(1);
        let accept_task = tokio::spawn(Self::accept_loop(
            listener,
            cipher,
            self.sender.clone(),
            notifier,
            self.running.clone(),
            shutdown_rx,
        ));

        *lifecycle = Some(Lifecycle {
            shutdown,
            accept_task,
        });
        Ok(local_addr)
    }

    /// Stops accepting connections and waits for the accept loop to exit.
    pub async fn stop(&self) -> Result<(), ServerError> {
        let mut lifecycle = self.lifecycle.lock().await;
        let Some(Lifecycle {
            shutdown,
            accept_task,
        }) = lifecycle.take()
        else {
            return Err(ServerError::NotRunning);
        };

        self.notify(&Event::ServerStopping);
        self.running.store(false, Ordering::SeqCst);
        let _ = shutdown.send(());

        let result = accept_task.await;
        *self.local_addr.lock() = None;
        result?;
        Ok(())
    }

    async fn accept_loop(
        listener: TcpListener,
        cipher: Arc<VoteCipher>,
        sender: Arc<dyn CommandSender>,
        notifier: Notifier,
        running: Arc<AtomicBool>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        while running.load(Ordering::SeqCst) {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => break,

                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            let handler = ConnectionHandler::new(
                                ConnectionInfo::new(peer),
                                cipher.clone(),
                                sender.clone(),
                                notifier.clone(),
                            );
                            tokio::spawn(handler.run(stream));
                        }
                        // Failures during a deliberate stop are expected
                        Err(error) if running.load(Ordering::SeqCst) => {
                            notifier.emit(Event::ConnectionEstablishException { error });
                        }
                        Err(_) => {}
                    }
                }
            }
        }

        drop(listener);
        notifier.emit(Event::ServerStopped);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns the bound address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    pub fn register_listener(&self, listener: Arc<dyn Listener>) {
        self.listeners.register(listener);
    }

    /// Returns a snapshot of the registered listeners.
    pub fn listeners(&self) -> Vec<Arc<dyn Listener>> {
        self.listeners.snapshot()
    }

    /// Delivers an event to every listener on the calling task.
    pub fn notify(&self, event: &Event) {
        self.listeners.notify(event, &self.context);
    }

    pub fn context(&self) -> &ServerContext {
        &self.context
    }

    fn notifier(&self) -> Notifier {
        Notifier::new(self.listeners.clone(), self.context.clone())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(lifecycle) = self.lifecycle.get_mut().take() {
            self.running.store(false, Ordering::SeqCst);
            let _ = lifecycle.shutdown.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RconTarget;
    use crate::event::EventKind;
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use std::sync::OnceLock;
    use votifier_protocol::KeyPair;
    use votifier_rcon::RconError;

    struct NoopSender;

    #[async_trait]
    impl CommandSender for NoopSender {
        async fn send_command(&self, _: &RconTarget, _: &str) -> Result<String, RconError> {
            Ok(String::new())
        }
    }

    fn test_key() -> RsaPrivateKey {
        static KEY: OnceLock<KeyPair> = OnceLock::new();
        KEY.get_or_init(|| KeyPair::generate(1024).unwrap())
            .private()
            .clone()
    }

    fn server_with_recorder() -> (Server, Arc<SyncMutex<Vec<EventKind>>>) {
        let server = Server::without_default_listeners(Config::default(), Arc::new(NoopSender));
        let kinds = Arc::new(SyncMutex::new(Vec::new()));
        let sink = kinds.clone();
        server.register_listener(Arc::new(move |event: &Event, _: &ServerContext| {
            sink.lock().push(event.kind());
        }));
        (server, kinds)
    }

    fn localhost() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[tokio::test]
    async fn test_start_stop_events() {
        let (server, kinds) = server_with_recorder();
        assert!(!server.is_running());

        let addr = server.start(localhost(), test_key()).await.unwrap();
        assert!(server.is_running());
        assert_eq!(server.local_addr(), Some(addr));
        assert_ne!(addr.port(), 0);

        server.stop().await.unwrap();
        assert!(!server.is_running());
        assert_eq!(server.local_addr(), None);

        assert_eq!(
            *kinds.lock(),
            vec![
                EventKind::ServerStarting,
                EventKind::ServerStarted,
                EventKind::ServerStopping,
                EventKind::ServerStopped,
            ]
        );
    }

    #[tokio::test]
    async fn test_double_start_fails() {
        let (server, kinds) = server_with_recorder();
        let addr = server.start(localhost(), test_key()).await.unwrap();

        let second = server.start(localhost(), test_key()).await;
        assert!(matches!(second, Err(ServerError::AlreadyRunning)));
        assert!(server.is_running());
        assert_eq!(server.local_addr(), Some(addr));
        assert_eq!(kinds.lock().len(), 2);

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_when_not_running_fails() {
        let (server, kinds) = server_with_recorder();
        assert!(matches!(server.stop().await, Err(ServerError::NotRunning)));
        assert!(kinds.lock().is_empty());
    }

    #[tokio::test]
    async fn test_restart() {
        let (server, _) = server_with_recorder();
        server.start(localhost(), test_key()).await.unwrap();
        server.stop().await.unwrap();
        server.start(localhost(), test_key()).await.unwrap();
        assert!(server.is_running());
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let (server, kinds) = server_with_recorder();
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();

        let result = server.start(taken.local_addr().unwrap(), test_key()).await;
        assert!(matches!(result, Err(ServerError::Io(_))));
        assert!(!server.is_running());
        assert!(kinds.lock().is_empty());
    }

    #[tokio::test]
    async fn test_drop_stops_accept_loop() {
        let (server, kinds) = server_with_recorder();
        let addr = server.start(localhost(), test_key()).await.unwrap();
        drop(server);

        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
        while !kinds.lock().contains(&EventKind::ServerStopped) {
            assert!(tokio::time::Instant::now() < deadline, "accept loop still running");
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(!kinds.lock().contains(&EventKind::ServerStopping));
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[test]
    fn test_default_listener_registered() {
        let server = Server::new(Config::default());
        assert_eq!(server.listeners().len(), 1);
        assert_eq!(server.context().rcon_targets().len(), 1);
    }
}
