//! Request routing: path -> handling strategy.
//!
//! Ordered matching: the control-panel page, then `/api/` actions, then
//! bundled assets, then 404. Assets resolve under the web root's assets
//! directory first, falling back to the web root itself by base name.

use std::path::Path;

use crate::actions::Dispatcher;
use crate::log::{log_info, log_warn};
use crate::paths;
use crate::server::response;

/// Handling strategy for one request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Control-panel page
    Index,
    /// API action name (prefix stripped)
    Api(String),
    /// Asset filename (prefix stripped)
    Asset(String),
    NotFound,
}

/// Match a request path to its handling strategy.
pub fn route(path: &str) -> Route {
    if path == "/" || path == "/index.html" {
        Route::Index
    } else if let Some(action) = path.strip_prefix("/api/") {
        Route::Api(action.to_string())
    } else if let Some(file) = path.strip_prefix("/assets/") {
        Route::Asset(file.to_string())
    } else {
        Route::NotFound
    }
}

/// Produce the full response bytes for a request path.
pub fn respond(dispatcher: &Dispatcher, path: &str) -> Vec<u8> {
    match route(path) {
        Route::Index => response::html(&index_page()),
        Route::Api(action) => response::json(&dispatcher.dispatch(&action).to_json()),
        Route::Asset(file) => serve_asset(&file),
        Route::NotFound => {
            log_warn("server", "route.not_found", path);
            response::text(404, "Not Found")
        }
    }
}

/// Fallback page when the bundled index.html is missing.
const FALLBACK_INDEX: &str = "<!DOCTYPE html>\n<html>\n<head><title>Error</title></head>\n<body>\n    <h1>Error Loading Interface</h1>\n    <p>Could not load index.html from the web root.</p>\n</body>\n</html>";

fn index_page() -> String {
    match std::fs::read_to_string(paths::index_path()) {
        Ok(html) => html,
        Err(e) => {
            log_warn("server", "index.missing", &e.to_string());
            FALLBACK_INDEX.to_string()
        }
    }
}

/// Content type from the filename extension.
fn content_type_for(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

fn serve_asset(filename: &str) -> Vec<u8> {
    // Any parent component escapes the web root; treat it as missing.
    if Path::new(filename)
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        log_warn("server", "asset.rejected", filename);
        return response::text(404, "Asset Not Found");
    }

    let mut candidate = paths::assets_dir().join(filename);
    if !candidate.exists() {
        // Fallback: base name directly under the web root
        match Path::new(filename).file_name() {
            Some(base) => candidate = paths::web_root().join(base),
            None => return response::text(404, "Asset Not Found"),
        }
    }

    match std::fs::read(&candidate) {
        Ok(data) => {
            log_info("server", "asset.served", filename);
            response::binary(200, content_type_for(filename), &data)
        }
        Err(_) => {
            log_warn("server", "asset.missing", filename);
            response::text(404, "Asset Not Found")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serial_test::serial;

    /// Point the web root at a fresh temp directory for one test.
    fn with_web_root<F: FnOnce(&Path)>(tag: &str, f: F) {
        let root = std::env::temp_dir().join(format!("deskremote-web-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(root.join("assets")).expect("create web root");

        // SAFETY: serial_test keeps env-mutating tests single-threaded.
        unsafe {
            std::env::set_var("DESKREMOTE_WEB_ROOT", &root);
        }
        Config::reset();
        f(&root);
        unsafe {
            std::env::remove_var("DESKREMOTE_WEB_ROOT");
        }
        Config::reset();
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    #[serial]
    fn existing_asset_round_trips_bytes() {
        with_web_root("asset", |root| {
            let payload: &[u8] = &[0x89, b'P', b'N', b'G', 0x00, 0x7f, 0xff];
            std::fs::write(root.join("assets").join("icon.png"), payload).expect("write asset");

            let response = serve_asset("icon.png");
            let header_end = response
                .windows(4)
                .position(|w| w == b"\r\n\r\n")
                .expect("header terminator")
                + 4;
            let header = String::from_utf8_lossy(&response[..header_end]);
            assert!(header.starts_with("HTTP/1.1 200 OK\r\n"));
            assert!(header.contains("Content-Type: image/png\r\n"));
            assert_eq!(&response[header_end..], payload);
        });
    }

    #[test]
    #[serial]
    fn missing_asset_falls_back_to_web_root_then_404() {
        with_web_root("fallback", |root| {
            // Base-name fallback: file lives at the web root, not assets/
            std::fs::write(root.join("logo.svg"), b"<svg/>").expect("write fallback asset");
            let response = serve_asset("logo.svg");
            assert!(String::from_utf8_lossy(&response).starts_with("HTTP/1.1 200 OK"));

            let response = serve_asset("absent.png");
            let s = String::from_utf8_lossy(&response);
            assert!(s.starts_with("HTTP/1.1 404"));
            assert!(s.ends_with("Asset Not Found"));
        });
    }

    #[test]
    #[serial]
    fn missing_index_serves_fallback_page() {
        with_web_root("index", |_| {
            let page = index_page();
            assert!(page.contains("Error Loading Interface"));
        });
    }

    #[test]
    fn index_routes() {
        assert_eq!(route("/"), Route::Index);
        assert_eq!(route("/index.html"), Route::Index);
    }

    #[test]
    fn api_prefix_is_stripped() {
        assert_eq!(route("/api/playpause"), Route::Api("playpause".to_string()));
        assert_eq!(
            route("/api/toggle_douyin"),
            Route::Api("toggle_douyin".to_string())
        );
    }

    #[test]
    fn asset_prefix_is_stripped() {
        assert_eq!(route("/assets/icon.png"), Route::Asset("icon.png".to_string()));
    }

    #[test]
    fn everything_else_is_not_found() {
        for path in ["/favicon.ico", "/api", "/assets", "/index", "", "/other/x"] {
            assert_eq!(route(path), Route::NotFound, "{path}");
        }
    }

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("logo.svg"), "image/svg+xml");
        assert_eq!(content_type_for("a.bin"), "application/octet-stream");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[test]
    fn parent_components_are_rejected() {
        let response = serve_asset("../secret.txt");
        let s = String::from_utf8_lossy(&response);
        assert!(s.starts_with("HTTP/1.1 404"));
    }
}
