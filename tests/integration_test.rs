// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::{collections::HashMap, fs, sync::Arc, time::Duration};

use fast_httpd::{server, Config};
use tempfile::TempDir;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

/// 在临时文档根目录上启动一组工作线程，返回端口
struct TestServer {
    port: u16,
    _root: TempDir,
}

fn start_server(workers: usize) -> TestServer {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("index.html"), b"0123456789").unwrap();
    fs::write(root.path().join("app.js"), b"console.log(1);").unwrap();
    fs::write(root.path().join("logo.png"), [0x89, b'P', b'N', b'G']).unwrap();
    fs::write(root.path().join("my file.html"), b"<p>space</p>").unwrap();
    fs::create_dir(root.path().join("assets")).unwrap();
    fs::write(root.path().join("assets/index.html"), b"<p>assets</p>").unwrap();

    let listener = server::bind(0).unwrap();
    let port = listener.local_addr().unwrap().port();
    let config = Config::new()
        .with_document_root(root.path().to_str().unwrap())
        .with_cpu_limit(workers);
    server::spawn_workers(listener, Arc::new(config)).unwrap();
    TestServer { port, _root: root }
}

/// 发送请求并一直读到连接关闭
async fn send_request(request: &str, port: u16) -> Vec<u8> {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("服务器没有关闭连接")
        .unwrap();
    response
}

fn parse_response(response: &[u8]) -> (String, HashMap<String, String>, Vec<u8>) {
    let text = String::from_utf8_lossy(response);
    let head_end = text.find("\r\n\r\n").expect("响应头不完整");
    let mut lines = text[..head_end].split("\r\n");
    let status_line = lines.next().unwrap().to_string();
    let headers = lines
        .filter_map(|l| l.split_once(": "))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    (status_line, headers, response[head_end + 4..].to_vec())
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_index() {
        let server = start_server(1);
        let response = send_request("GET /index.html HTTP/1.0\r\n\r\n", server.port).await;
        let (status, headers, body) = parse_response(&response);

        assert_eq!(status, "HTTP/1.0 200 OK");
        assert_eq!(headers["Connection"], "close");
        assert_eq!(headers["Content-Length"], "10");
        assert_eq!(headers["Content-Type"], "text/html");
        assert!(headers["Server"].starts_with("FastHttpServer/"));
        assert!(headers["Date"].ends_with(" GMT"));
        assert_eq!(body, b"0123456789");
    }

    #[tokio::test]
    async fn test_head_request() {
        let server = start_server(1);
        let response = send_request("HEAD /app.js HTTP/1.0\r\n\r\n", server.port).await;
        let (status, headers, body) = parse_response(&response);

        assert_eq!(status, "HTTP/1.0 200 OK");
        assert_eq!(headers["Content-Length"], "15");
        assert_eq!(headers["Content-Type"], "application/javascript");
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_binary_file() {
        let server = start_server(1);
        let response = send_request("GET /logo.png HTTP/1.0\r\n\r\n", server.port).await;
        let (_, headers, body) = parse_response(&response);
        assert_eq!(headers["Content-Type"], "image/png");
        assert_eq!(body, [0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_directory_index() {
        let server = start_server(1);
        for uri in ["/", "/assets/", "/assets"] {
            let request = format!("GET {} HTTP/1.0\r\n\r\n", uri);
            let (status, _, _) = parse_response(&send_request(&request, server.port).await);
            assert_eq!(status, "HTTP/1.0 200 OK", "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_percent_encoded_and_query() {
        let server = start_server(1);
        let response =
            send_request("GET /my%20file.html?v=2 HTTP/1.0\r\n\r\n", server.port).await;
        let (status, _, body) = parse_response(&response);
        assert_eq!(status, "HTTP/1.0 200 OK");
        assert_eq!(body, b"<p>space</p>");
    }

    #[tokio::test]
    async fn test_404_not_found() {
        let server = start_server(1);
        let response =
            send_request("GET /nonexistent-file-12345.html HTTP/1.0\r\n\r\n", server.port).await;
        let (status, headers, body) = parse_response(&response);
        assert_eq!(status, "HTTP/1.0 404 Not Found");
        assert_eq!(headers["Connection"], "close");
        assert_eq!(headers["Content-Length"], "0");
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_405_method_not_allowed() {
        let server = start_server(1);
        for method in ["POST", "PUT", "DELETE", "OPTIONS"] {
            let request = format!("{} / HTTP/1.1\r\n\r\n", method);
            let (status, _, _) = parse_response(&send_request(&request, server.port).await);
            assert_eq!(status, "HTTP/1.0 405 Method Not Allowed", "{}", method);
        }
    }

    #[tokio::test]
    async fn test_keep_alive_reuses_connection() {
        let server = start_server(1);
        let mut stream = TcpStream::connect(("127.0.0.1", server.port)).await.unwrap();

        for _ in 0..3 {
            stream
                .write_all(b"GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n")
                .await
                .unwrap();
            let mut response = Vec::new();
            while !response.ends_with(b"0123456789") {
                let mut chunk = [0u8; 512];
                let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut chunk))
                    .await
                    .unwrap()
                    .unwrap();
                assert!(n > 0, "keep-alive连接被提前关闭");
                response.extend_from_slice(&chunk[..n]);
            }
            let (status, headers, _) = parse_response(&response);
            assert_eq!(status, "HTTP/1.1 200 OK");
            assert_eq!(headers["Connection"], "keep-alive");
        }
    }

    #[tokio::test]
    async fn test_concurrent_clients_across_workers() {
        let server = start_server(4);
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let port = server.port;
            tasks.push(tokio::spawn(async move {
                send_request("GET /index.html HTTP/1.0\r\n\r\n", port).await
            }));
        }
        for task in tasks {
            let (status, _, body) = parse_response(&task.await.unwrap());
            assert_eq!(status, "HTTP/1.0 200 OK");
            assert_eq!(body, b"0123456789");
        }
    }
}
