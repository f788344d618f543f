//! Relay of the harvested CSV to a spreadsheet web app
//!
//! The web app answers a POST with a redirect to the page holding its JSON
//! reply, so the POST is sent with redirects disabled and the `Location` is
//! then fetched separately.

use crate::error::{HarvestError, Result};
use reqwest::{StatusCode, header, redirect};
use serde::Deserialize;

/// What the web app reported about an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The sheet was updated with `rows` rows
    Updated { rows: u64 },
    /// The web app refused the upload
    Rejected { error: String },
    /// The request succeeded but the reply was not JSON
    AcceptedWithoutReport,
    /// Non-success status with a non-JSON reply
    Failed { status: u16 },
}

#[derive(Debug, Deserialize)]
struct RelayReply {
    success: bool,
    #[serde(default)]
    rows: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

/// Interpret the final reply of the web app
pub fn interpret_reply(status: StatusCode, body: &str) -> RelayOutcome {
    match serde_json::from_str::<RelayReply>(body) {
        Ok(reply) if reply.success => RelayOutcome::Updated { rows: reply.rows.unwrap_or_default() },
        Ok(reply) => RelayOutcome::Rejected { error: reply.error.unwrap_or_else(|| "unknown error".to_string()) },
        Err(_) if status.is_success() => RelayOutcome::AcceptedWithoutReport,
        Err(_) => RelayOutcome::Failed { status: status.as_u16() },
    }
}

/// Client for the spreadsheet web app
pub struct SheetRelay {
    url: String,
    post_client: reqwest::Client,
    follow_client: reqwest::Client,
}

impl SheetRelay {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let post_client = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| HarvestError::RelayFailed(format!("Failed to build client: {}", e)))?;
        let follow_client = reqwest::Client::builder()
            .build()
            .map_err(|e| HarvestError::RelayFailed(format!("Failed to build client: {}", e)))?;

        Ok(Self { url: url.into(), post_client, follow_client })
    }

    /// POST the CSV body and report what the web app said
    pub async fn push(&self, csv: &str) -> Result<RelayOutcome> {
        log::info!("Pushing CSV to Google Sheet...");

        let response = self
            .post_client
            .post(&self.url)
            .header(header::CONTENT_TYPE, "text/csv")
            .body(csv.to_string())
            .send()
            .await
            .map_err(|e| HarvestError::RelayFailed(e.to_string()))?;

        let location = response
            .status()
            .is_redirection()
            .then(|| response.headers().get(header::LOCATION))
            .flatten()
            .and_then(|value| value.to_str().ok())
            .map(|value| response.url().join(value))
            .transpose()
            .map_err(|e| HarvestError::RelayFailed(format!("Invalid redirect location: {}", e)))?;

        let response = match location {
            Some(location) => {
                log::debug!("Following relay redirect to {}", location);
                self.follow_client
                    .get(location)
                    .send()
                    .await
                    .map_err(|e| HarvestError::RelayFailed(e.to_string()))?
            }
            None => response,
        };

        let status = response.status();
        let body = response.text().await.map_err(|e| HarvestError::RelayFailed(e.to_string()))?;
        Ok(interpret_reply(status, &body))
    }
}

/// Log an outcome the way the CLI reports it
pub fn log_outcome(outcome: &RelayOutcome) {
    match outcome {
        RelayOutcome::Updated { rows } => log::info!("Google Sheet updated ({} rows).", rows),
        RelayOutcome::Rejected { error } => log::error!("Google Sheet error: {}", error),
        RelayOutcome::AcceptedWithoutReport => {
            log::info!("Google Sheet updated (response was not JSON, but request succeeded).")
        }
        RelayOutcome::Failed { status } => log::error!("Google Sheet error: unexpected response (HTTP {}).", status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Read one HTTP/1.1 request, headers plus `Content-Length` body
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let length = head
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim() == "content-length")
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Answers the POST with a redirect and the redirected GET with a JSON report
    async fn sheet_web_app(listener: TcpListener) -> (String, String) {
        let (mut stream, _) = listener.accept().await.unwrap();
        let post = read_request(&mut stream).await;
        stream
            .write_all(b"HTTP/1.1 302 Found\r\nLocation: /reply\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        drop(stream);

        let (mut stream, _) = listener.accept().await.unwrap();
        let get = read_request(&mut stream).await;
        let body = r#"{"success":true,"rows":3}"#;
        let reply = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(reply.as_bytes()).await.unwrap();

        (post, get)
    }

    #[tokio::test]
    async fn test_push_follows_redirect_hop() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/exec", listener.local_addr().unwrap());
        let server = tokio::spawn(sheet_web_app(listener));

        let csv = "Level 1,Level 2\nTitle I,Sec. 101";
        let outcome = SheetRelay::new(url).unwrap().push(csv).await.unwrap();
        assert_eq!(outcome, RelayOutcome::Updated { rows: 3 });

        let (post, get) = server.await.unwrap();
        assert!(post.starts_with("POST /exec "));
        assert!(post.to_ascii_lowercase().contains("content-type: text/csv"));
        assert!(post.ends_with(csv));
        assert!(get.starts_with("GET /reply "));
    }

    #[test]
    fn test_success_reply() {
        let outcome = interpret_reply(StatusCode::OK, r#"{"success": true, "rows": 42}"#);
        assert_eq!(outcome, RelayOutcome::Updated { rows: 42 });
    }

    #[test]
    fn test_error_reply() {
        let outcome = interpret_reply(StatusCode::OK, r#"{"success": false, "error": "sheet locked"}"#);
        assert_eq!(outcome, RelayOutcome::Rejected { error: "sheet locked".to_string() });
    }

    #[test]
    fn test_non_json_reply() {
        assert_eq!(interpret_reply(StatusCode::OK, "<html>ok</html>"), RelayOutcome::AcceptedWithoutReport);
        assert_eq!(
            interpret_reply(StatusCode::INTERNAL_SERVER_ERROR, "<html>boom</html>"),
            RelayOutcome::Failed { status: 500 }
        );
    }

    #[test]
    fn test_json_error_with_failing_status() {
        let outcome = interpret_reply(StatusCode::BAD_REQUEST, r#"{"success": false}"#);
        assert_eq!(outcome, RelayOutcome::Rejected { error: "unknown error".to_string() });
    }

    #[test]
    fn test_relay_builds() {
        assert!(SheetRelay::new("https://script.google.com/macros/s/abc/exec").is_ok());
    }
}
