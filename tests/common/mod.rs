//! In-process HTTP forward proxy for integration tests
//!
//! Every request the client sends through the proxy is recorded by its
//! request line, so tests can assert which URLs were fetched via which proxy.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const TARGET_URL: &str = "http://probe.test/ip";
pub const GEO_URL: &str = "http://geo.test/json/{ip}";

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
}

impl MockResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: "{}".to_string(),
        }
    }
}

type Handler = dyn Fn(&str) -> MockResponse + Send + Sync;

struct State {
    handler: Box<Handler>,
    delay: Duration,
    stall: bool,
    requests: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

pub struct MockProxy {
    pub addr: SocketAddr,
    state: Arc<State>,
    task: JoinHandle<()>,
}

impl MockProxy {
    /// Start a proxy answering every request with `handler(request_target)`
    pub async fn start<F>(delay: Duration, handler: F) -> Self
    where
        F: Fn(&str) -> MockResponse + Send + Sync + 'static,
    {
        Self::spawn(delay, false, Box::new(handler)).await
    }

    /// Start a proxy that accepts and reads requests but never answers
    pub async fn stalled() -> Self {
        Self::spawn(Duration::ZERO, true, Box::new(|_: &str| MockResponse::status(500))).await
    }

    /// A proxy reporting `ip` as the exit address and locating it in `city`
    pub async fn exit_ip(ip: &'static str, city: &'static str) -> Self {
        Self::start(Duration::ZERO, move |target| standard_response(target, ip, city)).await
    }

    async fn spawn(delay: Duration, stall: bool, handler: Box<Handler>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(State {
            handler,
            delay,
            stall,
            requests: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });

        let accept_state = Arc::clone(&state);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, Arc::clone(&accept_state)));
            }
        });

        Self { addr, state, task }
    }

    /// Proxy address in HOST:PORT form
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Recorded request lines, e.g. `GET http://probe.test/ip HTTP/1.1`
    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requested(&self, url: &str) -> bool {
        self.requests()
            .iter()
            .any(|line| line.split_whitespace().nth(1) == Some(url))
    }

    /// Highest number of requests served at the same time
    pub fn peak(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }
}

impl Drop for MockProxy {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Probe target answers with `ip`, geolocation service with a success payload
pub fn standard_response(target: &str, ip: &str, city: &str) -> MockResponse {
    if target == TARGET_URL {
        MockResponse::ok(format!(r#"{{"ip":"{}"}}"#, ip))
    } else if let Some(queried) = target.strip_prefix("http://geo.test/json/") {
        MockResponse::ok(format!(
            r#"{{"status":"success","country":"Japan","countryCode":"JP","city":"{}","query":"{}"}}"#,
            city, queried
        ))
    } else {
        MockResponse::status(404)
    }
}

/// Address of a local port with nothing listening on it
pub async fn closed_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

/// Address of a listener that answers every connection with plain HTTP,
/// so a TLS client talking to it fails its handshake
pub async fn plaintext_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let _ = stream
                .write_all(b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n")
                .await;
        }
    });
    addr.to_string()
}

async fn serve(mut stream: TcpStream, state: Arc<State>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&buf).to_string();
    let request_line = head.lines().next().unwrap_or_default().to_string();
    let target = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_string();
    state.requests.lock().unwrap().push(request_line);

    if state.stall {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        return;
    }

    // Released before the reply goes out
    let current = state.active.fetch_add(1, Ordering::SeqCst) + 1;
    state.peak.fetch_max(current, Ordering::SeqCst);
    tokio::time::sleep(state.delay).await;
    state.active.fetch_sub(1, Ordering::SeqCst);

    let response = (state.handler)(&target);
    let reply = format!(
        "HTTP/1.1 {} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        response.body.len(),
        response.body
    );
    let _ = stream.write_all(reply.as_bytes()).await;
    let _ = stream.shutdown().await;
}
