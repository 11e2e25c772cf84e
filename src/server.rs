//! Dashboard API collaborator.
//!
//! Serves the seed snapshot as JSON, a health check, and static files, one
//! connection at a time over a plain `TcpListener`.

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::ServerConfig;
use crate::logging::{debug, error, info, obj, v_num, v_str, warn, Domain};

/// How long a connection may take to send its request head.
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

const NOT_FOUND_HTML: &str = "<html><body style=\"font-family:system-ui;padding:24px\">\
<h1>404</h1><p>Route not found</p></body></html>";

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub accept: Option<String>,
}

impl Request {
    pub fn get(path: &str) -> Self {
        Self {
            method: "GET".to_string(),
            path: path.to_string(),
            accept: None,
        }
    }

    pub fn with_accept(mut self, accept: &str) -> Self {
        self.accept = Some(accept.to_string());
        self
    }

    /// Parse the request line and headers up to the blank line.
    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<Self> {
        let mut line = String::new();
        reader.read_line(&mut line)?;
        let mut parts = line.split_whitespace();
        let method = parts.next().ok_or_else(|| anyhow!("empty request line"))?.to_string();
        let target = parts.next().ok_or_else(|| anyhow!("missing request target"))?;
        let path = target.split(['?', '#']).next().unwrap_or("/").to_string();

        let mut accept = None;
        loop {
            let mut header = String::new();
            if reader.read_line(&mut header)? == 0 {
                break;
            }
            let header = header.trim_end();
            if header.is_empty() {
                break;
            }
            if let Some((name, value)) = header.split_once(':') {
                if name.trim().eq_ignore_ascii_case("accept") {
                    accept = Some(value.trim().to_string());
                }
            }
        }
        Ok(Self { method, path, accept })
    }

    /// Mirrors content negotiation for HTML: no header or a wildcard counts.
    pub fn accepts_html(&self) -> bool {
        match self.accept.as_deref() {
            None => true,
            Some(accept) => accept.contains("text/html") || accept.contains("*/*"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string().into_bytes(),
        }
    }

    fn html(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/html; charset=utf-8",
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            404 => "Not Found",
            500 => "Internal Server Error",
            _ => "Unknown",
        }
    }

    /// Status line, headers, and the body unless `head_only` (a `HEAD` reply).
    pub fn write_to<W: Write>(&self, out: &mut W, head_only: bool) -> std::io::Result<()> {
        write!(
            out,
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n",
            self.status,
            self.reason(),
            self.content_type,
            self.body.len()
        )?;
        if !head_only {
            out.write_all(&self.body)?;
        }
        out.flush()
    }
}

pub struct ApiServer {
    seed_path: PathBuf,
    static_dir: PathBuf,
    read_timeout: Duration,
    started: Instant,
}

impl ApiServer {
    pub fn new(seed_path: impl Into<PathBuf>, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            seed_path: seed_path.into(),
            static_dir: static_dir.into(),
            read_timeout: READ_TIMEOUT,
            started: Instant::now(),
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn from_config(cfg: &ServerConfig) -> Self {
        Self::new(cfg.seed_path.clone(), cfg.static_dir.clone())
    }

    pub fn route(&self, req: &Request) -> Response {
        if req.method != "GET" && req.method != "HEAD" {
            return not_found(req);
        }
        match req.path.as_str() {
            "/health" => Response::json(
                200,
                &json!({"ok": true, "uptime": self.started.elapsed().as_secs_f64()}),
            ),
            "/dashboard" => match self.read_seed() {
                Ok(body) => Response::json(200, &body),
                Err(err) => {
                    error(
                        Domain::Server,
                        "unhandled",
                        obj(&[("path", v_str(&req.path)), ("error", v_str(&format!("{:#}", err)))]),
                    );
                    Response::json(500, &json!({"error": "Internal server error"}))
                }
            },
            "/" => self.static_file(req, "index.html"),
            other => self.static_file(req, other.trim_start_matches('/')),
        }
    }

    /// Seed file with `metrics`/`transactions` forced to arrays.
    fn read_seed(&self) -> Result<Value> {
        let raw = std::fs::read_to_string(&self.seed_path)
            .with_context(|| format!("reading {}", self.seed_path.display()))?;
        let mut data: Value = serde_json::from_str(&raw).context("parsing seed")?;
        let fields = data
            .as_object_mut()
            .ok_or_else(|| anyhow!("seed is not a JSON object"))?;
        for key in ["metrics", "transactions"] {
            if !fields.get(key).map(Value::is_array).unwrap_or(false) {
                fields.insert(key.to_string(), Value::Array(Vec::new()));
            }
        }
        debug(Domain::Server, "seed", obj(&[("sha256", v_str(&seed_digest(raw.as_bytes())))]));
        Ok(data)
    }

    fn static_file(&self, req: &Request, relative: &str) -> Response {
        let Some(path) = safe_join(&self.static_dir, relative) else {
            return not_found(req);
        };
        match std::fs::read(&path) {
            Ok(body) => Response {
                status: 200,
                content_type: content_type(&path),
                body,
            },
            Err(_) => not_found(req),
        }
    }

    pub fn handle(&self, mut stream: TcpStream) -> Result<()> {
        // A silent client must not hold up the next connection.
        stream.set_read_timeout(Some(self.read_timeout))?;
        let req = {
            let mut reader = BufReader::new(&stream);
            Request::read_from(&mut reader)?
        };
        let resp = self.route(&req);
        info(
            Domain::Server,
            "request",
            obj(&[
                ("method", v_str(&req.method)),
                ("path", v_str(&req.path)),
                ("status", v_num(resp.status as f64)),
            ]),
        );
        resp.write_to(&mut stream, req.method == "HEAD")?;
        Ok(())
    }

    /// Accept connections until the listener fails.
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr()?;
        info(
            Domain::Server,
            "listening",
            obj(&[
                ("addr", v_str(&addr.to_string())),
                ("seed", v_str(&self.seed_path.display().to_string())),
                ("static_dir", v_str(&self.static_dir.display().to_string())),
            ]),
        );
        for stream in listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(_) => continue,
            };
            if let Err(err) = self.handle(stream) {
                warn(Domain::Server, "connection_failed", obj(&[("error", v_str(&err.to_string()))]));
            }
        }
        Ok(())
    }
}

fn not_found(req: &Request) -> Response {
    if req.accepts_html() {
        Response::html(404, NOT_FOUND_HTML)
    } else {
        Response::json(404, &json!({"error": "Route not found"}))
    }
}

/// Join without allowing the request to escape `root`.
fn safe_join(root: &Path, relative: &str) -> Option<PathBuf> {
    let rel = Path::new(relative);
    if rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }
    Some(root.join(rel))
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

fn seed_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;

    fn server_with_seed(seed: &str) -> (tempfile::TempDir, ApiServer) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("seed.json"), seed).unwrap();
        fs::create_dir(dir.path().join("public")).unwrap();
        fs::write(dir.path().join("public/data.json"), r#"{"metrics":[],"transactions":[]}"#).unwrap();
        let server = ApiServer::new(dir.path().join("seed.json"), dir.path().join("public"));
        (dir, server)
    }

    #[test]
    fn test_dashboard_normalizes_missing_arrays() {
        let (_dir, server) = server_with_seed(r#"{"metrics": null, "title": "ops"}"#);
        let resp = server.route(&Request::get("/dashboard"));
        assert_eq!(resp.status, 200);
        let body = resp.body_json().unwrap();
        assert_eq!(body["metrics"], json!([]));
        assert_eq!(body["transactions"], json!([]));
        assert_eq!(body["title"], "ops");
    }

    #[test]
    fn test_unreadable_seed_is_generic_500() {
        let (_dir, server) = server_with_seed("{ broken");
        let resp = server.route(&Request::get("/dashboard"));
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body_json().unwrap(), json!({"error": "Internal server error"}));
    }

    #[test]
    fn test_health_reports_uptime() {
        let (_dir, server) = server_with_seed("{}");
        let body = server.route(&Request::get("/health")).body_json().unwrap();
        assert_eq!(body["ok"], true);
        assert!(body["uptime"].as_f64().unwrap() >= 0.0);
    }

    #[test]
    fn test_not_found_negotiates_body() {
        let (_dir, server) = server_with_seed("{}");
        let html = server.route(&Request::get("/nope"));
        assert_eq!(html.status, 404);
        assert!(html.content_type.starts_with("text/html"));

        let json = server.route(&Request::get("/nope").with_accept("application/json"));
        assert_eq!(json.status, 404);
        assert_eq!(json.body_json().unwrap(), json!({"error": "Route not found"}));
    }

    #[test]
    fn test_static_files_and_traversal() {
        let (_dir, server) = server_with_seed("{}");
        let resp = server.route(&Request::get("/data.json"));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.content_type, "application/json");

        let escaped = server.route(&Request::get("/../seed.json").with_accept("application/json"));
        assert_eq!(escaped.status, 404);
    }

    #[test]
    fn test_request_parsing() {
        let raw = "GET /dashboard?x=1 HTTP/1.1\r\nHost: localhost\r\nAccept: application/json\r\n\r\n";
        let req = Request::read_from(&mut Cursor::new(raw)).unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/dashboard");
        assert!(!req.accepts_html());
        assert!(Request::read_from(&mut Cursor::new("")).is_err());
    }

    #[test]
    fn test_response_wire_format() {
        let mut out = Vec::new();
        Response::json(200, &json!({"ok": true})).write_to(&mut out, false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Access-Control-Allow-Origin: *\r\n"));
        assert!(text.ends_with("\r\n\r\n{\"ok\":true}"));
    }

    #[test]
    fn test_head_reply_has_no_body() {
        let mut out = Vec::new();
        Response::json(200, &json!({"ok": true})).write_to(&mut out, true).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Content-Length: 11\r\n"));
        assert!(text.ends_with("Connection: close\r\n\r\n"));
    }
}
