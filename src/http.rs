use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;

pub(crate) const CACHE_BUST_PARAM: &str = "_";

static CACHE_TOKEN_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error)]
pub(crate) enum HttpError {
    #[error("HTTP status {status}{}", body_suffix(.body))]
    Status { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("response decode failed: {0}")]
    Decode(String),
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(" ({body})")
    }
}

// Millisecond clock plus a process-wide sequence so two requests issued in
// the same millisecond still get distinct tokens.
pub(crate) fn cache_token() -> String {
    let millis = Utc::now().timestamp_millis();
    let seq = CACHE_TOKEN_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{millis}-{seq}")
}

pub(crate) fn get_text_uncached(url: &str, timeout: Duration) -> Result<String, HttpError> {
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(timeout)
        .timeout_read(timeout)
        .timeout_write(timeout)
        .build();

    let request = agent.get(url).query(CACHE_BUST_PARAM, &cache_token());

    match request.call() {
        Ok(response) => response
            .into_string()
            .map_err(|err| HttpError::Decode(err.to_string())),
        Err(ureq::Error::Status(status, response)) => {
            let response_body = response.into_string().ok().unwrap_or_default();
            let body = response_body.trim().chars().take(240).collect::<String>();
            Err(HttpError::Status { status, body })
        }
        Err(ureq::Error::Transport(err)) => Err(HttpError::Transport(err.to_string())),
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    use std::collections::VecDeque;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Clone)]
    pub(crate) enum Behavior {
        Respond(u16, String),
        DelayRespond(Duration, u16, String),
    }

    #[derive(Debug)]
    pub(crate) struct TestServer {
        pub(crate) base_url: String,
        request_lines: Arc<Mutex<Vec<String>>>,
        shutdown_tx: mpsc::Sender<()>,
        join_handle: Option<std::thread::JoinHandle<()>>,
    }

    impl TestServer {
        pub(crate) fn spawn(behaviors: Vec<Behavior>) -> Self {
            let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind test server");
            listener.set_nonblocking(true).expect("set nonblocking");
            let addr = listener.local_addr().expect("local addr");

            let request_lines = Arc::new(Mutex::new(Vec::new()));
            let lines_clone = Arc::clone(&request_lines);
            let shared_behaviors = Arc::new(Mutex::new(VecDeque::from(behaviors)));
            let behaviors_clone = Arc::clone(&shared_behaviors);
            let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

            let join_handle = std::thread::spawn(move || {
                loop {
                    if shutdown_rx.try_recv().is_ok() {
                        break;
                    }

                    match listener.accept() {
                        Ok((mut stream, _)) => {
                            let behavior = {
                                let mut queue = behaviors_clone.lock().expect("lock behaviors");
                                queue.pop_front().unwrap_or_else(|| {
                                    Behavior::Respond(404, "not-found".to_string())
                                })
                            };
                            let line = read_request_line(&mut stream).unwrap_or_default();
                            lines_clone.lock().expect("lock request lines").push(line);
                            std::thread::spawn(move || serve_behavior(&mut stream, behavior));
                        }
                        Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                            std::thread::sleep(Duration::from_millis(5));
                        }
                        Err(_) => break,
                    }
                }
            });

            Self {
                base_url: format!("http://{addr}"),
                request_lines,
                shutdown_tx,
                join_handle: Some(join_handle),
            }
        }

        pub(crate) fn request_lines(&self) -> Vec<String> {
            self.request_lines.lock().expect("lock request lines").clone()
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            let _ = self.shutdown_tx.send(());
            if let Some(handle) = self.join_handle.take() {
                let _ = handle.join();
            }
        }
    }

    fn read_request_line(stream: &mut TcpStream) -> std::io::Result<String> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(Duration::from_millis(200)))?;
        let mut buf = [0_u8; 1024];
        let mut data = Vec::new();
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(read) => {
                    data.extend_from_slice(&buf[..read]);
                    if data.windows(4).any(|window| window == b"\r\n\r\n") {
                        break;
                    }
                }
                Err(err)
                    if err.kind() == std::io::ErrorKind::WouldBlock
                        || err.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break;
                }
                Err(err) => return Err(err),
            }
        }
        let text = String::from_utf8_lossy(&data);
        Ok(text.lines().next().unwrap_or_default().to_string())
    }

    fn reason_phrase(status: u16) -> &'static str {
        match status {
            200 => "OK",
            404 => "Not Found",
            500 => "Internal Server Error",
            503 => "Service Unavailable",
            _ => "Status",
        }
    }

    fn serve_behavior(stream: &mut TcpStream, behavior: Behavior) {
        match behavior {
            Behavior::Respond(status, body) => {
                let _ = write_response(stream, status, &body);
            }
            Behavior::DelayRespond(delay, status, body) => {
                std::thread::sleep(delay);
                let _ = write_response(stream, status, &body);
            }
        }
    }

    fn write_response(stream: &mut TcpStream, status: u16, body: &str) -> std::io::Result<()> {
        let reason = reason_phrase(status);
        let payload = body.as_bytes();
        write!(
            stream,
            "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            payload.len()
        )?;
        stream.write_all(payload)?;
        stream.flush()
    }
}
