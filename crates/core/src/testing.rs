//! HTTP fixtures for provider tests.
//!
//! Enabled with the `test-util` feature; dependent crates turn it on in
//! their dev-dependencies.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A server that answers exactly one request.
pub struct OneShotServer {
    /// Base URL, e.g. `http://127.0.0.1:40123`
    pub url: String,
    /// Resolves to the raw request (headers and body) once it was answered
    pub request: JoinHandle<String>,
}

/// Serve one HTTP response with a JSON body on a random local port.
pub async fn serve_once(status: &'static str, body: &'static str) -> OneShotServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("test listener address");

    let request = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept test connection");
        let raw = read_request(&mut socket).await;

        let reply = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(reply.as_bytes()).await.expect("write test reply");
        let _ = socket.shutdown().await;
        String::from_utf8_lossy(&raw).to_string()
    });

    OneShotServer {
        url: format!("http://{}", addr),
        request,
    }
}

/// URL of a local port with nothing listening on it.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("test listener address");
    drop(listener);
    format!("http://{}", addr)
}

/// Read headers until the blank line, then exactly `Content-Length` body bytes.
async fn read_request(socket: &mut tokio::net::TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.expect("read test request");
        if n == 0 {
            return buf;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let content_length = String::from_utf8_lossy(&buf[..header_end])
        .to_lowercase()
        .lines()
        .find_map(|l| l.strip_prefix("content-length:").map(|v| v.trim().to_string()))
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);

    let missing = (header_end + content_length).saturating_sub(buf.len());
    if missing > 0 {
        let mut rest = vec![0u8; missing];
        socket.read_exact(&mut rest).await.expect("read test request body");
        buf.extend_from_slice(&rest);
    }
    buf
}
