//! In-process HTTP fakes for provider tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// A canned HTTP server on an ephemeral loopback port.
pub(crate) struct FakeServer {
    /// `http://127.0.0.1:<port>`
    pub base_url: String,
    /// Number of connections served.
    pub hits: Arc<AtomicUsize>,
    /// Raw requests, in arrival order.
    pub requests: mpsc::UnboundedReceiver<String>,
}

impl FakeServer {
    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Serves every request with `handler(raw_request) -> (status line, json body)`.
pub(crate) async fn serve<F>(handler: F) -> FakeServer
where
    F: Fn(&str) -> (&'static str, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let hits = Arc::new(AtomicUsize::new(0));
    let (tx, requests) = mpsc::unbounded_channel();

    let counter = hits.clone();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let request = read_request(&mut stream).await;
            let (status, body) = handler(&request);
            let _ = tx.send(request);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    FakeServer {
        base_url,
        hits,
        requests,
    }
}

/// Serves the same response to every request.
pub(crate) async fn serve_fixed(status: &'static str, body: &'static str) -> FakeServer {
    serve(move |_| (status, body.to_string())).await
}

/// Returns the request target (`/path?query`) of a raw request.
pub(crate) fn request_target(request: &str) -> &str {
    request.split_whitespace().nth(1).unwrap_or_default()
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
