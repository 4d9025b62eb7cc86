//! Wire response construction.
//!
//! Three shapes: text/HTML, JSON, and binary. Every response carries a
//! status line, Content-Type (with UTF-8 charset for textual bodies),
//! an exact Content-Length, and `Connection: close` - the protocol has
//! no persistent connections.

/// Reason phrase for the handful of codes this protocol emits.
fn status_text(code: u16) -> &'static str {
    match code {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        _ => "Error",
    }
}

fn textual(code: u16, body: &str, content_type: &str) -> Vec<u8> {
    let header = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}; charset=UTF-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        code,
        status_text(code),
        content_type,
        body.len()
    );
    let mut response = header.into_bytes();
    response.extend_from_slice(body.as_bytes());
    response
}

/// Plain-text response (protocol errors, 404s)
pub fn text(code: u16, body: &str) -> Vec<u8> {
    textual(code, body, "text/plain")
}

/// 200 HTML response (control-panel page)
pub fn html(body: &str) -> Vec<u8> {
    textual(200, body, "text/html")
}

/// 200 JSON response (API envelopes)
pub fn json(body: &str) -> Vec<u8> {
    textual(200, body, "application/json")
}

/// Binary response (assets). No charset on the content type.
pub fn binary(code: u16, content_type: &str, data: &[u8]) -> Vec<u8> {
    let header = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        code,
        status_text(code),
        content_type,
        data.len()
    );
    let mut response = header.into_bytes();
    response.extend_from_slice(data);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_str(bytes: &[u8]) -> &str {
        std::str::from_utf8(bytes).expect("header bytes are utf8")
    }

    #[test]
    fn text_response_has_exact_headers() {
        let response = text(400, "Bad Request");
        let s = as_str(&response);
        assert!(s.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(s.contains("Content-Type: text/plain; charset=UTF-8\r\n"));
        assert!(s.contains("Content-Length: 11\r\n"));
        assert!(s.contains("Connection: close\r\n"));
        assert!(s.ends_with("\r\n\r\nBad Request"));
    }

    #[test]
    fn json_is_200_with_charset() {
        let response = json("{\"status\":\"success\"}");
        let s = as_str(&response);
        assert!(s.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(s.contains("Content-Type: application/json; charset=UTF-8\r\n"));
    }

    #[test]
    fn binary_omits_charset_and_keeps_bytes_exact() {
        let data = [0u8, 159, 146, 150];
        let response = binary(200, "image/png", &data);
        let header_end = response
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("header terminator")
            + 4;
        let header = std::str::from_utf8(&response[..header_end]).unwrap();
        assert!(header.contains("Content-Type: image/png\r\n"));
        assert!(header.contains("Content-Length: 4\r\n"));
        assert!(!header.contains("charset"));
        assert_eq!(&response[header_end..], &data);
    }

    #[test]
    fn content_length_counts_utf8_bytes() {
        // Multibyte body: length is bytes, not chars
        let response = html("抖音");
        let s = as_str(&response);
        assert!(s.contains("Content-Length: 6\r\n"));
    }

    #[test]
    fn unlisted_code_gets_generic_phrase() {
        let response = text(500, "boom");
        assert!(as_str(&response).starts_with("HTTP/1.1 500 Error\r\n"));
    }
}
