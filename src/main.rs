//! deskremote: local desktop control server
//!
//! Modes:
//!   deskremote serve [port]   - Run the control server (default port 8888)
//!   deskremote                - Same as `serve` on the configured port
//!
//! On startup the server prints the advertised control URL:
//!   LISTEN_URL=http://<host>:<port>

mod actions;
mod capability;
mod config;
mod keys;
mod lifecycle;
mod lock;
mod log;
mod paths;
mod registry;
mod server;

use std::env;
use std::panic;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

use crate::capability::{Capability, HostCapability};
use crate::registry::AppRegistry;
use crate::server::Server;

// Signal flags (set by signal handlers, checked in the serve loop)
static SIGINT_RECEIVED: AtomicBool = AtomicBool::new(false);
static SIGTERM_RECEIVED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigint(_: libc::c_int) {
    SIGINT_RECEIVED.store(true, Ordering::Release);
}

extern "C" fn handle_sigterm(_: libc::c_int) {
    SIGTERM_RECEIVED.store(true, Ordering::Release);
}

/// Action to take based on command-line arguments
#[derive(Debug, PartialEq)]
enum MainAction {
    /// Run the control server, optionally on an explicit port
    Serve(Option<String>),
    /// Print usage
    Help,
    /// Unrecognized subcommand
    Unknown(String),
}

/// Determine what action to take based on command-line arguments
fn determine_action(args: &[String]) -> MainAction {
    if args.len() < 2 {
        return MainAction::Serve(None);
    }

    match args[1].as_str() {
        "serve" => MainAction::Serve(args.get(2).cloned()),
        "--help" | "-h" | "help" => MainAction::Help,
        other => MainAction::Unknown(other.to_string()),
    }
}

fn print_usage() {
    eprintln!("deskremote - local desktop control server");
    eprintln!();
    eprintln!("Usage: deskremote [serve [port]]");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  DESKREMOTE_PORT            Listen port (default 8888)");
    eprintln!("  DESKREMOTE_ADVERTISE_HOST  Host in the printed control URL");
    eprintln!("  DESKREMOTE_DIR             Custom state directory");
    eprintln!("  DESKREMOTE_WEB_ROOT        Directory served at / and /assets");
    eprintln!("  DESKREMOTE_LAUNCHER        App launcher binary (default `open`)");
}

fn main() -> Result<()> {
    // Initialize global config from environment variables
    config::Config::init();

    // Log panics to file; a daemon's stderr is usually nowhere useful
    panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        log::log_error("main", "panic", &format!("{} at {}", message, location));
    }));

    let args: Vec<String> = env::args().collect();

    match determine_action(&args) {
        MainAction::Serve(port_arg) => {
            let port = match port_arg {
                Some(raw) => raw
                    .parse::<u16>()
                    .with_context(|| format!("invalid port: {raw}"))?,
                None => config::Config::get().port,
            };
            serve(port)
        }
        MainAction::Help => {
            print_usage();
            Ok(())
        }
        MainAction::Unknown(cmd) => {
            print_usage();
            bail!("unknown command: {cmd}");
        }
    }
}

fn serve(port: u16) -> Result<()> {
    setup_signal_handlers().context("failed to install signal handlers")?;

    let cap = Arc::new(HostCapability::new());
    if !cap.check_permission() {
        log::log_warn("main", "permission.missing", "requesting accessibility access");
        cap.request_permission();
    }

    let mut server = Server::new(cap, Arc::new(AppRegistry::defaults()));
    server
        .start(port)
        .with_context(|| format!("failed to start control server on port {port}"))?;

    if let Some(url) = server.advertised_url() {
        println!("LISTEN_URL={url}");
    }

    while !SIGINT_RECEIVED.load(Ordering::Acquire) && !SIGTERM_RECEIVED.load(Ordering::Acquire) {
        std::thread::sleep(Duration::from_millis(250));
    }

    log::log_info("main", "shutdown", "signal received");
    server.stop();
    Ok(())
}

/// Setup signal handler for a specific signal
fn setup_signal_handler(signal: Signal, handler: extern "C" fn(libc::c_int)) -> Result<()> {
    let action = SigAction::new(SigHandler::Handler(handler), SaFlags::empty(), SigSet::empty());
    unsafe { sigaction(signal, &action) }.context(format!("sigaction {:?} failed", signal))?;
    Ok(())
}

fn setup_signal_handlers() -> Result<()> {
    // SIGPIPE: ignore so a client that hangs up mid-response surfaces as
    // EPIPE on the write instead of killing the process
    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
    unsafe { sigaction(Signal::SIGPIPE, &ignore) }.context("sigaction SIGPIPE failed")?;

    setup_signal_handler(Signal::SIGINT, handle_sigint)?;
    setup_signal_handler(Signal::SIGTERM, handle_sigterm)?;
    Ok(())
}
