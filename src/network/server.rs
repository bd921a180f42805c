//! TCP + UDP Server
//!
//! Accepts TCP connections and dispatches them to a worker thread pool;
//! answers UDP datagrams from a dedicated thread. One command per line
//! (TCP) or per datagram (UDP).
//!
//! ## Architecture
//! - Main thread accepts TCP connections (non-blocking, shutdown-aware)
//! - Worker thread pool handles client sessions
//! - One thread runs the UDP receive loop
//! - Shared Engine reference for all workers

use std::net::{SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, Sender};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Result, StoreError};
use crate::protocol::{Command, Response};

use super::Connection;

/// Queue depth for handing connections to the worker pool
const WORK_QUEUE_DEPTH: usize = 1024;

/// Message sent to worker threads
enum WorkerMessage {
    /// New client connection to handle
    NewConnection(TcpStream),
    /// Signal to shut down
    Shutdown,
}

/// Network front-end for the engine
pub struct Server {
    config: Config,
    engine: Arc<Engine>,

    /// TCP listener (bound on `bind`)
    listener: Option<TcpListener>,

    /// UDP socket (bound on `bind`)
    udp_socket: Option<UdpSocket>,

    /// Channel feeding the worker pool
    work_sender: Option<Sender<WorkerMessage>>,

    /// Worker thread handles
    workers: Vec<JoinHandle<()>>,

    /// UDP loop thread handle
    udp_handle: Option<JoinHandle<()>>,

    /// Shutdown flag shared with workers and signal handlers
    shutdown: Arc<AtomicBool>,

    /// Active connection count
    active_connections: Arc<AtomicUsize>,
}

impl Server {
    /// Create a server over an already-opened engine.
    pub fn new(config: Config, engine: Arc<Engine>) -> Self {
        Self {
            config,
            engine,
            listener: None,
            udp_socket: None,
            work_sender: None,
            workers: Vec::new(),
            udp_handle: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Bind the TCP and UDP sockets without serving yet. Returns the bound
    /// TCP address (useful when the configured port is 0).
    pub fn bind(&mut self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(self.config.listen_addr()).map_err(|e| {
            StoreError::Network(format!(
                "failed to bind TCP {}: {}",
                self.config.listen_addr(),
                e
            ))
        })?;
        // Non-blocking so the accept loop can check the shutdown flag.
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let udp_socket = UdpSocket::bind(self.config.udp_listen_addr()).map_err(|e| {
            StoreError::Network(format!(
                "failed to bind UDP {}: {}",
                self.config.udp_listen_addr(),
                e
            ))
        })?;
        udp_socket.set_read_timeout(Some(Duration::from_millis(100)))?;

        self.listener = Some(listener);
        self.udp_socket = Some(udp_socket);
        Ok(addr)
    }

    /// Serve until shutdown is signaled (blocking).
    pub fn run(&mut self) -> Result<()> {
        if self.listener.is_none() {
            self.bind()?;
        }

        tracing::info!("listening on tcp {}", self.local_addr().unwrap());
        tracing::info!("listening on udp {}", self.udp_local_addr().unwrap());

        // Worker pool for TCP sessions
        let num_workers = num_cpus();
        let (sender, receiver) = bounded::<WorkerMessage>(WORK_QUEUE_DEPTH);
        self.work_sender = Some(sender);

        tracing::info!("starting {} worker threads", num_workers);

        for worker_id in 0..num_workers {
            let worker = Worker {
                id: worker_id,
                receiver: receiver.clone(),
                engine: Arc::clone(&self.engine),
                active_connections: Arc::clone(&self.active_connections),
                shutdown: Arc::clone(&self.shutdown),
            };
            let handle = thread::Builder::new()
                .name(format!("logkv-worker-{worker_id}"))
                .spawn(move || worker.run())
                .map_err(|e| StoreError::Network(format!("failed to spawn worker: {e}")))?;
            self.workers.push(handle);
        }

        // UDP loop
        let udp_socket = self.udp_socket.take().expect("bound above");
        let udp_loop = UdpLoop {
            socket: udp_socket,
            engine: Arc::clone(&self.engine),
            shutdown: Arc::clone(&self.shutdown),
            buffer_size: self.config.udp_buffer_size,
        };
        let handle = thread::Builder::new()
            .name("logkv-udp".to_string())
            .spawn(move || udp_loop.run())
            .map_err(|e| StoreError::Network(format!("failed to spawn UDP loop: {e}")))?;
        self.udp_handle = Some(handle);

        self.accept_loop()?;
        self.cleanup();
        Ok(())
    }

    /// Main TCP accept loop
    fn accept_loop(&mut self) -> Result<()> {
        let listener = self.listener.as_ref().expect("bound in run");
        let sender = self.work_sender.as_ref().expect("created in run");

        while !self.shutdown.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, addr)) => {
                    tracing::debug!("accepted connection from {}", addr);
                    if let Err(e) = sender.send(WorkerMessage::NewConnection(stream)) {
                        tracing::error!("failed to dispatch connection: {}", e);
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    // No pending connections, sleep briefly
                    thread::sleep(Duration::from_millis(10));
                }
                Err(e) => {
                    if !self.shutdown.load(Ordering::Relaxed) {
                        tracing::error!("accept error: {}", e);
                    }
                }
            }
        }

        Ok(())
    }

    /// Drain workers and the UDP loop, then shut the engine down.
    fn cleanup(&mut self) {
        tracing::info!("shutting down server...");

        if let Some(sender) = &self.work_sender {
            for _ in 0..self.workers.len() {
                let _ = sender.send(WorkerMessage::Shutdown);
            }
        }

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }

        if let Some(handle) = self.udp_handle.take() {
            if handle.join().is_err() {
                tracing::error!("UDP thread panicked");
            }
        }

        // In-flight mutations drain to WAL persistence here.
        self.engine.shutdown();

        tracing::info!("server shutdown complete");
    }

    /// Signal the server to shut down gracefully.
    pub fn shutdown(&self) {
        tracing::info!("shutdown signal received");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Shared shutdown flag, for signal handlers.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Whether the server is still accepting work
    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::Relaxed)
    }

    /// Number of active TCP connections
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Bound TCP address (once bound)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Bound UDP address (once bound, until `run` takes the socket)
    pub fn udp_local_addr(&self) -> Option<SocketAddr> {
        self.udp_socket.as_ref().and_then(|s| s.local_addr().ok())
    }
}

/// Worker thread that handles TCP sessions
struct Worker {
    id: usize,
    receiver: Receiver<WorkerMessage>,
    engine: Arc<Engine>,
    active_connections: Arc<AtomicUsize>,
    shutdown: Arc<AtomicBool>,
}

impl Worker {
    fn run(self) {
        tracing::debug!("worker {} started", self.id);

        loop {
            match self.receiver.recv() {
                Ok(WorkerMessage::NewConnection(stream)) => self.handle_connection(stream),
                Ok(WorkerMessage::Shutdown) => break,
                // Channel closed
                Err(_) => break,
            }
        }

        tracing::debug!("worker {} stopped", self.id);
    }

    fn handle_connection(&self, stream: TcpStream) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);

        let conn = Connection::new(
            stream,
            Arc::clone(&self.engine),
            Arc::clone(&self.shutdown),
        );

        match conn {
            Ok(mut conn) => {
                if let Err(e) = conn.handle() {
                    tracing::debug!("connection {} ended with error: {}", conn.peer_addr(), e);
                }
            }
            Err(e) => tracing::error!("failed to set up connection: {}", e),
        }

        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }
}

/// UDP receive loop: one datagram in, one datagram out
struct UdpLoop {
    socket: UdpSocket,
    engine: Arc<Engine>,
    shutdown: Arc<AtomicBool>,
    buffer_size: usize,
}

impl UdpLoop {
    fn run(self) {
        let mut buf = vec![0u8; self.buffer_size];

        while !self.shutdown.load(Ordering::Relaxed) {
            match self.socket.recv_from(&mut buf) {
                Ok((len, addr)) => {
                    let request = String::from_utf8_lossy(&buf[..len]);
                    let response = match Command::parse(&request) {
                        Some(command) => self.engine.execute(command),
                        None => Response::Invalid,
                    };

                    // Response text only, no newline framing on UDP.
                    if let Err(e) = self.socket.send_to(response.to_string().as_bytes(), addr) {
                        tracing::error!("failed to send UDP response to {}: {}", addr, e);
                    }
                }
                Err(ref e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) => {}
                Err(e) => tracing::error!("UDP receive error: {}", e),
            }
        }

        tracing::debug!("UDP loop stopped");
    }
}

/// Number of worker threads for the TCP pool
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}
