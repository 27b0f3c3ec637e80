//! Admin panel: aggregate connection indicator, pairing QR, health JSON.
//! Zero new dependencies — raw TCP + tokio.

use crate::status::StatusBoard;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub async fn run_gateway(host: &str, port: u16, board: Arc<StatusBoard>) -> Result<()> {
    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    let actual_port = listener.local_addr()?.port();
    let addr = format!("{host}:{actual_port}");

    tracing::info!("🚀 Panel listening on http://{addr}");
    tracing::info!("  GET  /        — connection overview");
    tracing::info!("  GET  /qr      — pairing QR");
    tracing::info!("  GET  /health  — health check");

    loop {
        let (mut stream, peer) = listener.accept().await?;
        let board = board.clone();

        tokio::spawn(async move {
            // Read with a timeout so a stalled client cannot pin the task
            let mut buf = vec![0u8; 8192];
            let n = match tokio::time::timeout(Duration::from_secs(30), stream.read(&mut buf))
                .await
            {
                Ok(Ok(n)) if n > 0 => n,
                _ => return,
            };

            let request = String::from_utf8_lossy(&buf[..n]);
            let first_line = request.lines().next().unwrap_or("");
            let parts: Vec<&str> = first_line.split_whitespace().collect();

            if let [method, path, ..] = parts.as_slice() {
                tracing::debug!("{peer} → {method} {path}");
                handle_request(&mut stream, method, path, &board).await;
            } else {
                let _ = send_response(&mut stream, 400, "text/plain", "Bad Request").await;
            }
        });
    }
}

async fn handle_request(stream: &mut TcpStream, method: &str, path: &str, board: &StatusBoard) {
    match (method, path) {
        ("GET", "/") => {
            let _ = send_response(stream, 200, "text/html; charset=utf-8", &index_page(board))
                .await;
        }

        ("GET", "/qr") => {
            let _ = send_response(stream, 200, "text/html; charset=utf-8", &qr_page(board))
                .await;
        }

        ("GET", "/health") => {
            let body = board.snapshot_json().to_string();
            let _ = send_response(stream, 200, "application/json", &body).await;
        }

        _ => {
            let _ = send_response(stream, 404, "text/plain", "Not Found").await;
        }
    }
}

fn index_page(board: &StatusBoard) -> String {
    let aggregate = if board.any_online() {
        "🟢 Connected"
    } else {
        "🔴 Waiting for QR"
    };
    let sessions = board
        .status_lines()
        .iter()
        .map(|line| format!("<li>{line}</li>"))
        .collect::<Vec<_>>()
        .join("\n        ");

    format!(
        "<h2>WhatsApp Bot Panel</h2>\n\
         <p>Status: {aggregate}</p>\n\
         <ul>\n        {sessions}\n        </ul>\n\
         <a href=\"/qr\"><button>Lihat QR Code</button></a>"
    )
}

fn qr_page(board: &StatusBoard) -> String {
    let Some(pairing) = board.latest_pairing() else {
        return "<h3>Bot sudah login ✔</h3><br><a href=\"/\">Kembali</a>".to_string();
    };

    match render_challenge_svg(&pairing.payload) {
        Ok(svg) => format!(
            "<h2>Scan QR WhatsApp untuk Login</h2>\n\
             <p>Session: <b>{}</b></p>\n\
             {svg}\n\
             <br><br>\n\
             <a href=\"/\">Kembali</a>",
            pairing.session
        ),
        Err(e) => {
            tracing::warn!("failed to render pairing QR: {e}");
            "<h3>QR tidak dapat dirender</h3><br><a href=\"/\">Kembali</a>".to_string()
        }
    }
}

fn render_challenge_svg(payload: &str) -> Result<String> {
    use qrcode::render::svg;

    let qr = qrcode::QrCode::new(payload.as_bytes())?;
    Ok(qr
        .render()
        .min_dimensions(240, 240)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

async fn send_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &str,
) -> Result<()> {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        _ => "Error",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}
