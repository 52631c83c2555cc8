//! A minimal CKAN action API served from a background thread.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value};

/// One request as the stub received it.
#[derive(Clone, Debug)]
pub struct Received {
    pub method: String,
    pub path: String,
    /// Header names are lowercased.
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl Received {
    /// The action name from `/api/3/action/{name}`.
    pub fn action(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

pub struct StubCatalog {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<Received>>>,
}

impl StubCatalog {
    /// Serve every request with `handler(action, body) -> (status, reply)`.
    pub fn start<F>(mut handler: F) -> Self
    where
        F: FnMut(&str, &Value) -> (u16, Value) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub");
        let addr = listener.local_addr().expect("stub address");
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&received);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let Some(request) = read_request(&mut stream) else {
                    continue;
                };
                let (status, reply) = handler(request.action(), &request.body);
                log.lock().expect("stub log").push(request);
                let _ = write_response(&mut stream, status, &reply);
            }
        });

        Self { addr, received }
    }

    /// A catalog that keeps datasets in memory, knows `groups`, and lets the
    /// key create datasets in `organization` only.
    pub fn ckan(groups: &[&str], organization: &str) -> Self {
        let groups: BTreeSet<String> = groups.iter().map(|g| g.to_string()).collect();
        let organization = organization.to_string();
        let mut datasets: BTreeMap<String, Value> = BTreeMap::new();

        Self::start(move |action, body| {
            let id = body.get("id").and_then(Value::as_str).unwrap_or_default();
            let name = body.get("name").and_then(Value::as_str).unwrap_or_default();
            match action {
                "status_show" => ok(json!({"ckan_version": "2.10.4"})),
                "organization_list_for_user" => ok(json!([{"name": organization, "id": "org-1"}])),
                "group_show" if groups.contains(id) => ok(json!({"name": id})),
                "package_show" => match datasets.get(id) {
                    Some(dataset) => ok(dataset.clone()),
                    None => not_found(),
                },
                "package_create" if datasets.contains_key(name) => (
                    409,
                    json!({
                        "success": false,
                        "error": {"__type": "Validation Error", "name": ["That URL is already in use."]}
                    }),
                ),
                "package_create" | "package_update" => {
                    datasets.insert(name.to_string(), body.clone());
                    ok(body.clone())
                }
                _ => not_found(),
            }
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().expect("stub log").clone()
    }

    pub fn actions(&self) -> Vec<String> {
        self.received()
            .iter()
            .map(|r| r.action().to_string())
            .collect()
    }
}

pub fn ok(result: Value) -> (u16, Value) {
    (200, json!({"success": true, "result": result}))
}

pub fn not_found() -> (u16, Value) {
    (
        404,
        json!({"success": false, "error": {"__type": "Not Found Error", "message": "Not found"}}),
    )
}

fn read_request(stream: &mut TcpStream) -> Option<Received> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = BTreeMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let chunked = headers
        .get("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"));
    let body = if chunked {
        read_chunked(&mut reader)?
    } else {
        let length: usize = headers
            .get("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let mut body = vec![0_u8; length];
        reader.read_exact(&mut body).ok()?;
        body
    };
    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);

    Some(Received {
        method,
        path,
        headers,
        body,
    })
}

fn read_chunked(reader: &mut impl BufRead) -> Option<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        let mut size_line = String::new();
        reader.read_line(&mut size_line).ok()?;
        let size_hex = size_line.trim().split(';').next()?;
        let size = usize::from_str_radix(size_hex, 16).ok()?;
        let mut chunk = vec![0_u8; size + 2];
        reader.read_exact(&mut chunk).ok()?;
        if size == 0 {
            return Some(body);
        }
        body.extend_from_slice(&chunk[..size]);
    }
}

fn write_response(stream: &mut TcpStream, status: u16, reply: &Value) -> std::io::Result<()> {
    let body = reply.to_string();
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        409 => "Conflict",
        _ => "Error",
    };
    write!(
        stream,
        "HTTP/1.1 {status} {reason}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{body}",
        body.len()
    )?;
    stream.flush()
}
