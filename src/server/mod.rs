//! TCP control server: bind, accept, dispatch.
//!
//! One background thread runs the accept loop over a non-blocking
//! listener, waking via poll() so stop() is observed promptly; each
//! accepted connection is served on its own thread, so a slow client
//! never delays new accepts. At most one listener is active per Server;
//! start() on a running server tears the previous listener down first.

mod connection;
mod response;
mod router;

use std::net::TcpListener;
use std::os::fd::{AsRawFd, BorrowedFd, OwnedFd};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::socket::sockopt::ReuseAddr;
use nix::sys::socket::{
    AddressFamily, Backlog, SockFlag, SockType, SockaddrIn, bind, listen, setsockopt, socket,
};

use crate::actions::Dispatcher;
use crate::capability::Capability;
use crate::config::Config;
use crate::lifecycle::LifecycleController;
use crate::log::{log_error, log_info, log_warn};
use crate::registry::AppRegistry;

/// How long the accept loop sleeps in poll() before re-checking the
/// running flag. Bounds stop() latency.
const ACCEPT_POLL_MS: u16 = 250;

/// Server startup failures
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The port could not be bound; fatal to startup, state stays
    /// not-listening.
    #[error("failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        source: std::io::Error,
    },
}

/// Live listener bookkeeping, present only while listening.
struct ListenerState {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
    bound_port: u16,
    advertised_url: String,
}

/// The control server. Owns the listener lifecycle; start/stop are
/// expected to be invoked serially from one control path.
pub struct Server {
    dispatcher: Arc<Dispatcher>,
    listener: Option<ListenerState>,
}

impl Server {
    /// Server over the given capability backend and app registry, with
    /// production lifecycle timing.
    pub fn new(cap: Arc<dyn Capability>, registry: Arc<AppRegistry>) -> Self {
        let dispatcher = Dispatcher::new(cap, registry, LifecycleController::default());
        Self::with_dispatcher(Arc::new(dispatcher))
    }

    pub fn with_dispatcher(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            listener: None,
        }
    }

    /// Bind `port` (0 for an OS-assigned port) and begin accepting on a
    /// background thread. Stops any previous listener first. On bind
    /// failure the server is left not-listening.
    pub fn start(&mut self, port: u16) -> Result<(), ServerError> {
        self.stop();

        let listener = bind_reuse(port).map_err(|source| ServerError::Bind { port, source })?;
        listener
            .set_nonblocking(true)
            .map_err(|source| ServerError::Bind { port, source })?;
        let bound_port = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { port, source })?
            .port();

        let advertised_url = format!("http://{}:{}", Config::get().advertise_host, bound_port);
        let running = Arc::new(AtomicBool::new(true));

        let loop_running = running.clone();
        let loop_dispatcher = self.dispatcher.clone();
        let handle = std::thread::spawn(move || {
            accept_loop(listener, loop_running, loop_dispatcher);
        });

        log_info(
            "server",
            "start",
            &format!("port={bound_port} url={advertised_url}"),
        );
        self.listener = Some(ListenerState {
            running,
            handle,
            bound_port,
            advertised_url,
        });
        Ok(())
    }

    /// Stop accepting and join the accept loop. Safe to call repeatedly;
    /// a stopped server is a no-op.
    pub fn stop(&mut self) {
        if let Some(state) = self.listener.take() {
            state.running.store(false, Ordering::Release);
            // Accept loop re-checks the flag within ACCEPT_POLL_MS
            let _ = state.handle.join();
            log_info("server", "stop", &format!("port={}", state.bound_port));
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    pub fn bound_port(&self) -> Option<u16> {
        self.listener.as_ref().map(|s| s.bound_port)
    }

    pub fn advertised_url(&self) -> Option<&str> {
        self.listener.as_ref().map(|s| s.advertised_url.as_str())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Bind a TCP listener with address reuse enabled.
///
/// std's TcpListener::bind offers no pre-bind socket options, so the
/// socket is assembled through nix and handed over.
fn bind_reuse(port: u16) -> std::io::Result<TcpListener> {
    let fd: OwnedFd = socket(
        AddressFamily::Inet,
        SockType::Stream,
        SockFlag::empty(),
        None,
    )
    .map_err(io_err)?;
    setsockopt(&fd, ReuseAddr, &true).map_err(io_err)?;

    let addr = SockaddrIn::new(0, 0, 0, 0, port);
    bind(fd.as_raw_fd(), &addr).map_err(io_err)?;
    listen(&fd, Backlog::MAXCONN).map_err(io_err)?;

    Ok(TcpListener::from(fd))
}

fn io_err(e: nix::errno::Errno) -> std::io::Error {
    std::io::Error::from_raw_os_error(e as i32)
}

/// Accept until the running flag clears. poll() wakes on pending
/// connections; each one is served on its own thread.
fn accept_loop(listener: TcpListener, running: Arc<AtomicBool>, dispatcher: Arc<Dispatcher>) {
    while running.load(Ordering::Acquire) {
        let fd = unsafe { BorrowedFd::borrow_raw(listener.as_raw_fd()) };
        let mut poll_fds = [PollFd::new(fd, PollFlags::POLLIN)];
        let ready = matches!(poll(&mut poll_fds, PollTimeout::from(ACCEPT_POLL_MS)), Ok(n) if n > 0);
        if !ready {
            continue;
        }

        // Drain every pending connection before polling again
        loop {
            match listener.accept() {
                Ok((stream, peer)) => {
                    log_info("server", "accept", &peer.to_string());
                    let conn_dispatcher = dispatcher.clone();
                    std::thread::spawn(move || {
                        connection::handle(stream, &conn_dispatcher);
                    });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    log_error("server", "accept.failed", &e.to_string());
                    break;
                }
            }
        }
    }
    log_warn("server", "accept_loop.exit", "running flag cleared");
}
