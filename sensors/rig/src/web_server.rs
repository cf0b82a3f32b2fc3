//! HTTP configuration and telemetry server
//!
//! `tiny_http` accepts connections and parses requests; one background
//! thread reads each request body, dispatches it through [`route`] and
//! sends the reply. Requests are tiny (query strings and short form
//! bodies), so bodies over [`MAX_BODY`] are refused before any parameter
//! is touched.
//!
//! | Route | Method | Purpose |
//! |---|---|---|
//! | `/` | GET | Tuning page with the current parameters |
//! | `/api/settings` | GET | Parameters as JSON |
//! | `/api/settings/set?k=v&..` | GET | Partial update, persisted |
//! | `/save` | POST | Same as above, form-encoded body |
//! | `/imu` | GET | Latest telemetry snapshot |
//! | `/api/status` | GET | Health check |

use std::error::Error as StdError;
use std::io::{Cursor, Read};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};
use serde_json::json;
use suspension_core::{ConfigChannel, ParameterStore, SuspensionParams, MAX_DT};
use thiserror::Error;
use tiny_http::{Header, Server};

/// Largest request body accepted (form posts are a few hundred bytes)
pub const MAX_BODY: usize = 4096;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("failed to spawn server thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Request as seen by [`route`]
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: String,
    pub body: String,
}

impl Request {
    /// Split `url` into path and query string
    pub fn new(method: impl Into<String>, url: &str, body: String) -> Self {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        Self {
            method: method.into(),
            path: path.to_string(),
            query: query.to_string(),
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    fn json(status: u16, value: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: value.to_string(),
        }
    }

    fn html(body: String) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body,
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Self::json(status, json!({ "status": "error", "error": message }))
    }

    fn into_http(self) -> tiny_http::Response<Cursor<Vec<u8>>> {
        let headers = [
            Header::from_bytes("Content-Type", self.content_type),
            Header::from_bytes("Access-Control-Allow-Origin", "*"),
        ];

        headers.into_iter().flatten().fold(
            tiny_http::Response::from_data(self.body.into_bytes()).with_status_code(self.status),
            |response, header| response.with_header(header),
        )
    }
}

/// Read a request body of at most [`MAX_BODY`] bytes
///
/// `declared` is the Content-Length, if the client sent one. Oversized
/// bodies are refused whole (413) rather than cut short, and so are
/// bodies that are not UTF-8 (400).
pub fn read_body<R: Read>(reader: R, declared: Option<usize>) -> Result<String, Response> {
    let too_large = || Response::error(413, "request body too large");

    if declared.is_some_and(|len| len > MAX_BODY) {
        return Err(too_large());
    }

    let mut body = Vec::new();
    reader
        .take(MAX_BODY as u64 + 1)
        .read_to_end(&mut body)
        .map_err(|e| Response::error(400, &format!("failed to read body: {}", e)))?;
    if body.len() > MAX_BODY {
        return Err(too_large());
    }

    String::from_utf8(body).map_err(|_| Response::error(400, "body is not valid UTF-8"))
}

fn params_json(p: &SuspensionParams) -> serde_json::Value {
    json!({
        "offset": p.rest_offset,
        "share": p.travel_share,
        "totalRange": p.total_range,
        "suspensionRange": p.suspension_range(),
        "kFront": p.front_stiffness,
        "cFront": p.front_damping,
        "kRear": p.rear_stiffness,
        "cRear": p.rear_damping,
        "frontBalance": p.front_balance,
        "rearBalance": p.rear_balance,
    })
}

/// Apply a form/query update and persist it
fn update_and_save<S: ParameterStore>(channel: &ConfigChannel<S>, form: &str) -> Response {
    let params = match channel.submit_form(form) {
        Ok(params) => params,
        Err(e) => {
            warn!("Rejected parameter update {:?}: {}", form, e);
            return Response::error(400, &e.to_string());
        }
    };

    if let Err(e) = channel.save() {
        warn!("Parameters applied but not saved: {}", e);
        return Response::json(
            500,
            json!({ "status": "error", "error": e.to_string(), "params": params_json(&params) }),
        );
    }

    Response::json(200, json!({ "status": "ok", "params": params_json(&params) }))
}

/// Dispatch one request
pub fn route<S: ParameterStore>(channel: &ConfigChannel<S>, request: &Request) -> Response {
    let method = request.method.as_str();
    match (method, request.path.as_str()) {
        ("GET", "/") => Response::html(settings_page(&channel.current())),
        ("GET", "/api/settings") => Response::json(200, params_json(&channel.current())),
        ("GET", "/api/settings/set") => update_and_save(channel, &request.query),
        ("POST", "/save") => update_and_save(channel, &request.body),
        ("GET", "/imu") => {
            let telemetry = channel.telemetry();
            Response {
                status: 200,
                content_type: "application/json",
                body: telemetry.to_json(),
            }
        }
        ("GET", "/api/status") => {
            let telemetry = channel.telemetry();
            Response::json(
                200,
                json!({
                    "status": "ok",
                    "ticks": telemetry.tick,
                    "updates": channel.state().update_count(),
                    "max_dt": MAX_DT,
                }),
            )
        }
        (_, "/" | "/api/settings" | "/api/settings/set" | "/save" | "/imu" | "/api/status") => {
            Response::error(405, "method not allowed")
        }
        _ => Response::error(404, "not found"),
    }
}

fn settings_page(p: &SuspensionParams) -> String {
    let field = |label: &str, name: &str, value: f32, min: f32, max: f32, step: f32| {
        format!(
            r#"<label>{label}<input type="number" name="{name}" value="{value}" min="{min}" max="{max}" step="{step}"></label>"#
        )
    };

    let fields = [
        field("Rest offset (°)", "offset", p.rest_offset, 0.0, p.total_range, 1.0),
        field("Travel share", "share", p.travel_share, 0.01, 1.0, 0.01),
        field("Front stiffness", "kFront", p.front_stiffness, 0.0, 50.0, 0.1),
        field("Front damping", "cFront", p.front_damping, 0.0, 20.0, 0.1),
        field("Rear stiffness", "kRear", p.rear_stiffness, 0.0, 50.0, 0.1),
        field("Rear damping", "cRear", p.rear_damping, 0.0, 20.0, 0.1),
        field("Front balance", "frontBalance", p.front_balance, 0.0, 1.5, 0.05),
        field("Rear balance", "rearBalance", p.rear_balance, 0.0, 1.5, 0.05),
    ]
    .join("\n");

    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>Suspension Rig</title>
<style>body{{font-family:sans-serif;max-width:28em;margin:2em auto}}label{{display:flex;justify-content:space-between;margin:.4em 0}}</style>
</head><body>
<h1>Suspension Rig</h1>
<p>Travel: ±{half:.1}° around {rest:.1}° (range {range:.0}°)</p>
<form id="f">
{fields}
<button type="submit">Save</button>
</form>
<pre id="imu"></pre>
<script>
document.getElementById('f').onsubmit=e=>{{e.preventDefault();
fetch('/save',{{method:'POST',body:new URLSearchParams(new FormData(e.target))}}).then(()=>location.reload());}};
setInterval(()=>fetch('/imu').then(r=>r.json()).then(d=>{{
document.getElementById('imu').textContent=`roll ${{d.roll.toFixed(1)}}  pitch ${{d.pitch.toFixed(1)}}\n`+JSON.stringify(d.positions);}}),250);
</script>
</body></html>"#,
        half = p.suspension_half_range(),
        rest = p.rest_offset,
        range = p.total_range,
        fields = fields,
    )
}

/// Read, dispatch and answer one request
fn handle<S: ParameterStore>(mut http: tiny_http::Request, channel: &ConfigChannel<S>) {
    let method = http.method().to_string();
    let url = http.url().to_string();
    let declared = http.body_length();

    let response = match read_body(http.as_reader(), declared) {
        Ok(body) => route(channel, &Request::new(method.as_str(), &url, body)),
        Err(rejected) => {
            warn!("Refused {} {}: {}", method, url, rejected.body);
            rejected
        }
    };
    debug!("{} {} -> {}", method, url, response.status);

    if let Err(e) = http.respond(response.into_http()) {
        debug!("Failed to send response: {}", e);
    }
}

/// Background HTTP server bound to the configuration channel
///
/// Dropping it stops the server thread.
pub struct ConfigServer {
    server: Arc<Server>,
    addr: SocketAddr,
    _handle: JoinHandle<()>,
}

impl ConfigServer {
    /// Bind `addr` and start serving on a named thread
    pub fn start<S>(addr: &str, channel: Arc<ConfigChannel<S>>) -> Result<Self, ServerError>
    where
        S: ParameterStore + Send + 'static,
    {
        info!("Starting configuration server on {}", addr);

        let bind_error = |source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        };
        let server = Arc::new(Server::http(addr).map_err(bind_error)?);
        let local = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| bind_error("not an IP listener".into()))?;

        let worker = Arc::clone(&server);
        let handle = thread::Builder::new()
            .name("config-http".into())
            .spawn(move || {
                for request in worker.incoming_requests() {
                    handle(request, &channel);
                }
                debug!("Configuration server stopped");
            })
            .map_err(ServerError::Spawn)?;

        Ok(Self {
            server,
            addr: local,
            _handle: handle,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for ConfigServer {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::net::TcpStream;
    use suspension_core::{ConfigState, MemoryStore, StoreError, TelemetrySnapshot};

    struct ReadOnlyStore;

    impl ParameterStore for ReadOnlyStore {
        fn load(&self) -> Result<SuspensionParams, StoreError> {
            Ok(SuspensionParams::default())
        }

        fn save(&mut self, _params: &SuspensionParams) -> Result<(), StoreError> {
            Err(StoreError::Io(io::Error::other("read-only filesystem")))
        }
    }

    fn channel() -> ConfigChannel<MemoryStore> {
        ConfigChannel::new(Arc::new(ConfigState::default()), MemoryStore::new())
    }

    fn get(url: &str) -> Request {
        Request::new("GET", url, String::new())
    }

    fn body(response: &Response) -> serde_json::Value {
        serde_json::from_str(&response.body).unwrap()
    }

    /// Send raw request bytes to a live server and return the raw reply
    fn exchange(addr: SocketAddr, raw: &[u8]) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(raw).unwrap();
        let mut reply = String::new();
        stream.read_to_string(&mut reply).unwrap();
        reply
    }

    #[test]
    fn test_request_splits_query() {
        let request = get("/api/settings/set?share=0.3&kFront=6");
        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/api/settings/set");
        assert_eq!(request.query, "share=0.3&kFront=6");
        assert!(request.body.is_empty());

        assert_eq!(get("/imu").query, "");
    }

    #[test]
    fn test_body_within_limit() {
        let form = "offset=95&rearBalance=0.7";
        assert_eq!(read_body(form.as_bytes(), Some(form.len())).unwrap(), form);
        assert_eq!(read_body(form.as_bytes(), None).unwrap(), form);

        let full = "y".repeat(MAX_BODY);
        assert_eq!(read_body(full.as_bytes(), Some(MAX_BODY)).unwrap().len(), MAX_BODY);
    }

    #[test]
    fn test_oversized_body_is_refused_whole() {
        let form = format!("{}&offset=123", "y".repeat(MAX_BODY - 9));
        assert!(form.len() > MAX_BODY);

        let declared = read_body(form.as_bytes(), Some(form.len())).unwrap_err();
        assert_eq!(declared.status, 413);

        // No Content-Length (chunked upload): caught after reading
        let undeclared = read_body(form.as_bytes(), None).unwrap_err();
        assert_eq!(undeclared.status, 413);
    }

    #[test]
    fn test_non_utf8_body() {
        let rejected = read_body(&[0x6f, 0xff, 0xfe][..], Some(3)).unwrap_err();
        assert_eq!(rejected.status, 400);
    }

    #[test]
    fn test_settings_json() {
        let response = route(&channel(), &get("/api/settings"));
        assert_eq!(response.status, 200);
        let value = body(&response);
        assert_eq!(value["offset"], 90.0);
        assert_eq!(value["share"], 0.25);
        assert_eq!(value["totalRange"], 180.0);
        assert_eq!(value["rearBalance"].as_f64().map(|v| (v - 0.8).abs() < 1e-6), Some(true));
    }

    #[test]
    fn test_set_applies_and_saves() {
        let channel = channel();
        let response = route(&channel, &get("/api/settings/set?share=2&kRear=4"));
        assert_eq!(response.status, 200);

        let value = body(&response);
        assert_eq!(value["status"], "ok");
        assert_eq!(value["params"]["share"], 1.0, "share clamps to 1");
        assert_eq!(channel.current().rear_stiffness, 4.0);
        assert!(channel.state().take_pending_update().is_some());
    }

    #[test]
    fn test_post_save_and_errors() {
        let channel = channel();
        let post = Request::new("POST", "/save", "offset=100&cFront=2".into());
        assert_eq!(route(&channel, &post).status, 200);
        assert_eq!(channel.current().rest_offset, 100.0);

        let bad = Request {
            body: "offset=abc".into(),
            ..post.clone()
        };
        let response = route(&channel, &bad);
        assert_eq!(response.status, 400);
        assert_eq!(channel.current().rest_offset, 100.0);

        let read_only = ConfigChannel::new(Arc::new(ConfigState::default()), ReadOnlyStore);
        let response = route(&read_only, &post);
        assert_eq!(response.status, 500);
        assert_eq!(body(&response)["status"], "error");
    }

    #[test]
    fn test_imu_and_status() {
        let channel = channel();
        channel.state().publish_telemetry(TelemetrySnapshot {
            tick: 12,
            ..Default::default()
        });

        let imu = body(&route(&channel, &get("/imu")));
        for key in ["roll", "pitch", "ax", "ay", "az", "positions"] {
            assert!(imu.get(key).is_some(), "missing {}", key);
        }

        let status = body(&route(&channel, &get("/api/status")));
        assert_eq!(status["status"], "ok");
        assert_eq!(status["ticks"], 12);
    }

    #[test]
    fn test_page_and_unknown_routes() {
        let channel = channel();
        let page = route(&channel, &get("/"));
        assert_eq!(page.status, 200);
        assert!(page.content_type.starts_with("text/html"));
        assert!(page.body.contains(r#"name="frontBalance""#));
        assert!(page.body.contains(r#"value="90""#));

        assert_eq!(route(&channel, &get("/nope")).status, 404);
        let delete = Request::new("DELETE", "/api/settings", String::new());
        assert_eq!(route(&channel, &delete).status, 405);
    }

    #[test]
    fn test_server_round_trip() {
        let channel = Arc::new(channel());
        let server = ConfigServer::start("127.0.0.1:0", channel.clone()).unwrap();

        let reply = exchange(
            server.local_addr(),
            b"GET /api/settings/set?offset=80 HTTP/1.1\r\nHost: rig\r\nConnection: close\r\n\r\n",
        );

        assert!(reply.starts_with("HTTP/1.1 200"), "{}", reply);
        assert!(reply.contains("application/json"), "{}", reply);
        assert_eq!(channel.current().rest_offset, 80.0);
    }

    #[test]
    fn test_server_refuses_oversized_post() {
        let channel = Arc::new(channel());
        let server = ConfigServer::start("127.0.0.1:0", channel.clone()).unwrap();

        let form = format!("{}&offset=123", "y".repeat(MAX_BODY - 9));
        let raw = format!(
            "POST /save HTTP/1.1\r\nHost: rig\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            form.len(),
            form
        );
        let reply = exchange(server.local_addr(), raw.as_bytes());

        assert!(reply.starts_with("HTTP/1.1 413"), "{}", reply);
        assert_eq!(channel.current().rest_offset, 90.0);
        assert!(channel.state().take_pending_update().is_none());
        assert_eq!(channel.state().update_count(), 0);
    }
}
