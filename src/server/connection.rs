//! Per-connection request handling.
//!
//! One bounded read, one parsed request line, one response, close. The
//! protocol's requests are tiny, so the whole request line is assumed to
//! arrive in the first chunk; anything after the first CRLF is ignored.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::actions::Dispatcher;
use crate::log::{log_info, log_warn};
use crate::server::{response, router};

/// Upper bound on a single receive.
const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Stalled-client guard; a request either arrives promptly or not at all.
const READ_TIMEOUT: Duration = Duration::from_secs(5);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Extract the request path from the raw request bytes.
///
/// The first CRLF-terminated line must hold at least two
/// whitespace-separated tokens; the second is the path. Anything else is
/// a protocol error.
pub fn parse_request_path(buf: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(buf);
    let line = match text.split_once("\r\n") {
        Some((line, _)) => line,
        None => return None, // no line terminator
    };
    line.split_whitespace().nth(1).map(|s| s.to_string())
}

/// Serve a single accepted connection: receive, parse, route, respond,
/// close. Never panics outward; every failure degrades to a 4xx or a
/// silent close.
pub fn handle(mut stream: TcpStream, dispatcher: &Dispatcher) {
    stream.set_read_timeout(Some(READ_TIMEOUT)).ok();
    stream.set_write_timeout(Some(WRITE_TIMEOUT)).ok();

    let mut buf = vec![0u8; MAX_REQUEST_BYTES];
    let n = match stream.read(&mut buf) {
        Ok(0) => return, // client closed without sending anything
        Ok(n) => n,
        Err(e) => {
            log_warn("server", "connection.read_failed", &e.to_string());
            return;
        }
    };

    let reply = match parse_request_path(&buf[..n]) {
        Some(path) => {
            log_info("server", "connection.request", &path);
            router::respond(dispatcher, &path)
        }
        None => {
            log_warn("server", "connection.bad_request", &format!("{n} bytes"));
            response::text(400, "Bad Request")
        }
    };

    if let Err(e) = stream.write_all(&reply).and_then(|()| stream.flush()) {
        log_warn("server", "connection.write_failed", &e.to_string());
    }
    // stream dropped here: exactly one response per connection
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_path_from_request_line() {
        let buf = b"GET /api/lock_status HTTP/1.1\r\nHost: x\r\n\r\n";
        assert_eq!(
            parse_request_path(buf),
            Some("/api/lock_status".to_string())
        );
    }

    #[test]
    fn ignores_everything_after_first_line() {
        let buf = b"GET / HTTP/1.1\r\nX-Junk: GET /other\r\n\r\n";
        assert_eq!(parse_request_path(buf), Some("/".to_string()));
    }

    #[test]
    fn missing_crlf_is_a_protocol_error() {
        assert_eq!(parse_request_path(b"GET / HTTP/1.1"), None);
        assert_eq!(parse_request_path(b"GET / HTTP/1.1\n"), None);
    }

    #[test]
    fn fewer_than_two_tokens_is_a_protocol_error() {
        assert_eq!(parse_request_path(b"GET\r\n\r\n"), None);
        assert_eq!(parse_request_path(b"\r\n\r\n"), None);
    }

    #[test]
    fn tolerates_non_utf8_noise_after_the_line() {
        let mut buf = b"GET /index.html HTTP/1.1\r\n".to_vec();
        buf.extend_from_slice(&[0xff, 0xfe, 0x00]);
        assert_eq!(parse_request_path(&buf), Some("/index.html".to_string()));
    }
}
