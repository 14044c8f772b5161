#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// 服务端收到的一次请求。
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body_contains(&self, needle: &[u8]) -> bool {
        self.body.windows(needle.len()).any(|window| window == needle)
    }
}

/// 预设响应。
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
}

impl MockResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json_upload(id: &str, base_url: &str) -> Self {
        Self::new(
            200,
            format!(
                r#"{{"id":"{id}","url":"{base_url}/i/{id}.jpg","deleteUrl":"{base_url}/delete/{id}"}}"#
            ),
        )
    }
}

pub struct MockServer {
    listener: TcpListener,
    pub base_url: String,
}

impl MockServer {
    pub fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server failed");
        let addr = listener.local_addr().expect("read local addr failed");
        Self {
            listener,
            base_url: format!("http://127.0.0.1:{}", addr.port()),
        }
    }

    /// 依次为每个连接返回一个预设响应，全部处理完后线程结束。
    pub fn serve(self, responses: Vec<MockResponse>) -> JoinHandle<Vec<CapturedRequest>> {
        let listener = self.listener;
        thread::spawn(move || {
            let mut captured = Vec::new();
            for response in responses {
                let (mut stream, _) = listener.accept().expect("accept failed");
                let request = read_request(&mut stream).expect("read request failed");
                write_response(&mut stream, &response);
                captured.push(request);
            }
            captured
        })
    }

    /// 只读请求头，之后挂起不响应，用于取消测试。
    pub fn stall(self, hold: Duration) -> JoinHandle<()> {
        let listener = self.listener;
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let _ = read_head(&mut stream);
                thread::sleep(hold);
            }
        })
    }

    /// 非阻塞监听，检查是否有客户端连上。
    pub fn into_idle_listener(self) -> TcpListener {
        self.listener
            .set_nonblocking(true)
            .expect("set nonblocking failed");
        self.listener
    }
}

fn read_head(stream: &mut TcpStream) -> std::io::Result<(Vec<u8>, Vec<u8>)> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        if let Some(end) = find(&buffer, b"\r\n\r\n") {
            let rest = buffer.split_off(end + 4);
            return Ok((buffer, rest));
        }
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            return Ok((buffer, Vec::new()));
        }
        buffer.extend_from_slice(&chunk[..read]);
    }
}

fn read_request(stream: &mut TcpStream) -> std::io::Result<CapturedRequest> {
    let (head, mut body) = read_head(stream)?;
    let head = String::from_utf8_lossy(&head).to_string();
    let mut lines = head.split("\r\n").filter(|line| !line.is_empty());

    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse::<usize>().ok());
    let chunked = headers.iter().any(|(key, value)| {
        key.eq_ignore_ascii_case("transfer-encoding") && value.eq_ignore_ascii_case("chunked")
    });

    let mut chunk = [0u8; 65536];
    if let Some(length) = content_length {
        while body.len() < length {
            let read = stream.read(&mut chunk)?;
            if read == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..read]);
        }
    } else if chunked {
        while !body.ends_with(b"0\r\n\r\n") {
            let read = stream.read(&mut chunk)?;
            if read == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..read]);
        }
    }

    Ok(CapturedRequest {
        method,
        path,
        headers,
        body,
    })
}

fn write_response(stream: &mut TcpStream, response: &MockResponse) {
    let reason = match response.status {
        200 => "OK",
        204 => "No Content",
        404 => "Not Found",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Status",
    };

    let head = if response.status == 204 {
        format!("HTTP/1.1 204 {}\r\nConnection: close\r\n\r\n", reason)
    } else {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            response.status,
            reason,
            response.body.len()
        )
    };

    stream.write_all(head.as_bytes()).expect("write headers failed");
    if response.status != 204 {
        stream
            .write_all(response.body.as_bytes())
            .expect("write body failed");
    }
    stream.flush().expect("flush failed");
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
