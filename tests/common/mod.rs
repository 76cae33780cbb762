//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use sukl_gateway::http::server::AppState;
use sukl_gateway::{GatewayConfig, HttpServer, Shutdown};

/// A gateway instance bound to a loopback port for one test.
pub struct GatewayUnderTest {
    pub addr: SocketAddr,
    pub shutdown: Arc<Shutdown>,
    pub state: AppState,
    pub task: JoinHandle<Result<(), std::io::Error>>,
}

impl GatewayUnderTest {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a gateway on an ephemeral port.
pub async fn spawn_gateway(config: GatewayConfig) -> GatewayUnderTest {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Arc::new(Shutdown::new());
    let server = HttpServer::new(config).unwrap();
    let state = server.state();
    let task = tokio::spawn(server.run(listener, shutdown.clone()));
    GatewayUnderTest {
        addr,
        shutdown,
        state,
        task,
    }
}

/// Config pointing at the given upstream, everything else default.
#[allow(dead_code)]
pub fn test_config(endpoint: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.upstream.endpoint = endpoint.to_string();
    config
}

/// HTTP client that closes connections between requests, so graceful
/// shutdown is not held up by idle keep-alives.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Start a programmable mock search upstream.
///
/// The responder receives (method, path, body) and returns (status, JSON).
#[allow(dead_code)]
pub async fn start_mock_search<F>(responder: F) -> SocketAddr
where
    F: Fn(&str, &str, &str) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let responder = Arc::new(responder);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let responder = responder.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut tmp = [0u8; 4096];

                let header_end = loop {
                    match socket.read(&mut tmp).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => {
                            buf.extend_from_slice(&tmp[..n]);
                            if let Some(pos) = find_subsequence(&buf, b"\r\n\r\n") {
                                break pos + 4;
                            }
                        }
                    }
                };

                let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
                let request_line = head.lines().next().unwrap_or_default();
                let mut parts = request_line.split_whitespace();
                let method = parts.next().unwrap_or_default().to_string();
                let path = parts.next().unwrap_or_default().to_string();

                let content_length = head
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);

                while buf.len() < header_end + content_length {
                    match socket.read(&mut tmp).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&tmp[..n]),
                    }
                }
                let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

                let (status, response_body) = responder(&method, &path, &body);
                let reason = match status {
                    200 => "OK",
                    400 => "Bad Request",
                    404 => "Not Found",
                    429 => "Too Many Requests",
                    500 => "Internal Server Error",
                    503 => "Service Unavailable",
                    _ => "OK",
                };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    response_body.len(),
                    response_body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Mock search upstream that stalls before answering, for deadline tests.
#[allow(dead_code)]
pub async fn start_slow_search(delay: std::time::Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut tmp = [0u8; 4096];
                loop {
                    match socket.read(&mut tmp).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => {
                            buf.extend_from_slice(&tmp[..n]);
                            if find_subsequence(&buf, b"\r\n\r\n").is_some() {
                                break;
                            }
                        }
                    }
                }
                tokio::time::sleep(delay).await;
                let body = r#"{"@odata.count":0,"value":[]}"#;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
