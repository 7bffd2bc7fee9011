//! Shared utilities for integration testing: an in-memory key-value
//! store with TTL semantics and a hit-counting mock backend.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use junction::error::JunctionError;
use junction::store::KvStore;

/// In-memory [`KvStore`] honoring TTLs, for tests that exercise the
/// cache and rate limiter without a redis instance.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
        })
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub fn contains(&self, key: &str) -> bool {
        let entries = self.entries.lock().unwrap();
        entries
            .get(key)
            .is_some_and(|e| e.expires_at > Instant::now())
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, JunctionError> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<(), JunctionError> {
        self.entries.lock().unwrap().insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
            },
        );
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, JunctionError> {
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();
        match entries.get_mut(key) {
            Some(entry) if entry.expires_at > now => {
                let current: i64 = std::str::from_utf8(&entry.value)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0);
                let next = current + 1;
                entry.value = next.to_string().into_bytes();
                Ok(next)
            }
            _ => {
                // Fresh counters get no TTL, matching INCR on an absent key
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: b"1".to_vec(),
                        expires_at: now + Duration::from_secs(86_400),
                    },
                );
                Ok(1)
            }
        }
    }
}

/// A minimal HTTP/1.1 backend that counts hits and records the head of
/// the last request it saw.
pub struct MockBackend {
    pub addr: SocketAddr,
    pub hits: Arc<AtomicUsize>,
    pub last_request_head: Arc<Mutex<String>>,
}

impl MockBackend {
    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_head(&self) -> String {
        self.last_request_head.lock().unwrap().clone()
    }
}

/// Spawn a backend answering every request with a fixed status,
/// headers, and body.
pub async fn spawn_backend(
    status: u16,
    extra_headers: &[(&str, &str)],
    body: &str,
) -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let last_request_head = Arc::new(Mutex::new(String::new()));

    let reason = match status {
        200 => "OK",
        301 => "Moved Permanently",
        302 => "Found",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "OK",
    };
    let mut header_block = String::new();
    for (name, value) in extra_headers {
        header_block.push_str(&format!("{name}: {value}\r\n"));
    }
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n{header_block}\r\n{body}",
        body.len()
    );

    let hits_clone = Arc::clone(&hits);
    let head_clone = Arc::clone(&last_request_head);
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let response = response.clone();
            let hits = Arc::clone(&hits_clone);
            let head = Arc::clone(&head_clone);
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                loop {
                    match socket.read(&mut chunk).await {
                        Ok(0) => break,
                        Ok(n) => {
                            buf.extend_from_slice(&chunk[..n]);
                            if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                        }
                        Err(_) => return,
                    }
                }
                hits.fetch_add(1, Ordering::SeqCst);
                *head.lock().unwrap() = String::from_utf8_lossy(&buf).to_string();
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    MockBackend {
        addr,
        hits,
        last_request_head,
    }
}

/// An address with no listener behind it, for dead-backend scenarios.
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
