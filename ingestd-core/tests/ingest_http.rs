//! End-to-end tests of the HTTP surface against a real bound server.

mod common;

use common::{raw_request, read_lines, TestServer};
use ingestd_core::config::IngestdConfig;
use ingestd_core::http::handle_connection;
use ingestd_core::ingest::{bounded, WriteCommand};
use ingestd_core::server::ServerContext;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[tokio::test]
async fn post_log_acknowledges_and_persists_payload() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let body = r#"{"hostname":"PC-0042","checks":[{"id":"CHK-1","result":"pass"}],"score":97.5}"#;
    let resp = client
        .post(server.url("/log"))
        .header("Content-Type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({"status": "success"}));

    server.drain().await;
    let lines = read_lines(&server.source_log());
    let last = lines.last().expect("one line written");
    assert!(last.starts_with('['));
    assert!(last.ends_with(&format!("] {}", body)), "{}", last);

    server.stop().await;
}

#[tokio::test]
async fn sequential_reports_keep_their_order() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    for seq in 0..25 {
        let resp = client.post(server.url("/log")).json(&json!({ "seq": seq })).send().await.unwrap();
        assert_eq!(resp.status(), 200);
    }

    server.drain().await;
    let seqs: Vec<u64> = read_lines(&server.source_log())
        .iter()
        .map(|line| {
            let json = line.split_once("] ").unwrap().1;
            serde_json::from_str::<Value>(json).unwrap()["seq"].as_u64().unwrap()
        })
        .collect();
    assert_eq!(seqs, (0..25).collect::<Vec<u64>>());

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_burst_produces_whole_lines() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();
    let filler = "x".repeat(4096);

    let mut tasks = Vec::new();
    for n in 0..40 {
        let client = client.clone();
        let url = server.url("/log");
        let filler = filler.clone();
        tasks.push(tokio::spawn(async move {
            client.post(url).json(&json!({ "n": n, "filler": filler })).send().await.unwrap().status()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), 200);
    }

    server.drain().await;
    let lines = read_lines(&server.source_log());
    assert_eq!(lines.len(), 40);
    let mut seen: Vec<u64> = lines
        .iter()
        .map(|line| {
            let json = line.split_once("] ").unwrap().1;
            let value: Value = serde_json::from_str(json).expect("complete JSON line");
            assert_eq!(value["filler"].as_str().unwrap().len(), 4096);
            value["n"].as_u64().unwrap()
        })
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..40).collect::<Vec<u64>>());

    server.stop().await;
}

#[tokio::test]
async fn malformed_json_is_400_without_file_growth() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let resp = client.post(server.url("/log")).body("{\"broken\": ").send().await.unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "invalid_json");

    server.drain().await;
    assert!(!server.source_log().exists());
    assert_eq!(server.ctx.stats.snapshot().rejected_client, 1);

    server.stop().await;
}

#[tokio::test]
async fn non_utf8_body_is_decoded_before_parsing() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    // Windows-1252 "café" inside an otherwise ASCII document
    let mut body = b"{\"note\":\"caf".to_vec();
    body.push(0xE9);
    body.extend_from_slice(b"\"}");
    let resp = client.post(server.url("/log")).body(body).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    server.drain().await;
    let lines = read_lines(&server.source_log());
    let json = lines[0].split_once("] ").unwrap().1;
    let value: Value = serde_json::from_str(json).unwrap();
    assert!(value["note"].as_str().unwrap().starts_with("caf"));

    server.stop().await;
}

#[tokio::test]
async fn oversized_declared_length_is_413_before_body_is_sent() {
    let server = TestServer::start().await;

    // Headers only; the declared body never arrives
    let response = raw_request(
        server.addr,
        b"POST /log HTTP/1.1\r\nHost: test\r\nContent-Type: application/json\r\nContent-Length: 2097153\r\n\r\n",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 413"), "{}", response);

    server.drain().await;
    assert!(!server.source_log().exists());
    server.stop().await;
}

#[tokio::test]
async fn missing_or_zero_length_is_413() {
    let server = TestServer::start().await;

    let response = raw_request(server.addr, b"POST /log HTTP/1.1\r\nHost: test\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 413"), "{}", response);

    let response =
        raw_request(server.addr, b"POST /log HTTP/1.1\r\nHost: test\r\nContent-Length: 0\r\n\r\n")
            .await;
    assert!(response.starts_with("HTTP/1.1 413"), "{}", response);

    server.stop().await;
}

#[tokio::test]
async fn full_queue_answers_503_and_drops_the_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path());

    // No writer: the queue only fills up
    let (queue, mut rx) = bounded(2);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let ctx = Arc::new(ServerContext::new(config, queue, addr));
    let accept_ctx = Arc::clone(&ctx);
    tokio::spawn(async move {
        loop {
            let (stream, remote) = listener.accept().await.unwrap();
            tokio::spawn(handle_connection(stream, remote, Arc::clone(&accept_ctx)));
        }
    });

    let client = reqwest::Client::new();
    let url = format!("http://{}/log", addr);
    for n in 0..2 {
        let resp = client.post(&url).json(&json!({ "n": n })).send().await.unwrap();
        assert_eq!(resp.status(), 200);
    }
    let resp = client.post(&url).json(&json!({ "n": 2 })).send().await.unwrap();
    assert_eq!(resp.status(), 503);
    assert_eq!(resp.json::<Value>().await.unwrap()["error"], "busy");

    let stats = ctx.stats.snapshot();
    assert_eq!(stats.accepted, 2);
    assert_eq!(stats.rejected_full, 1);

    // Only the two accepted records were queued
    for n in 0..2 {
        match rx.recv().await {
            Some(WriteCommand::Append(record)) => assert_eq!(record.payload, json!({ "n": n })),
            other => panic!("unexpected command: {:?}", other),
        }
    }
    assert!(ctx.queue.is_empty());
}

#[tokio::test]
async fn unknown_routes_are_404() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    assert_eq!(client.get(server.url("/nope")).send().await.unwrap().status(), 404);
    assert_eq!(client.get(server.url("/log")).send().await.unwrap().status(), 404);
    assert_eq!(client.post(server.url("/health")).body("{}").send().await.unwrap().status(), 404);
    assert_eq!(client.get(server.url("/server.pid")).send().await.unwrap().status(), 404);
    assert_eq!(client.put(server.url("/log")).body("{}").send().await.unwrap().status(), 501);

    server.stop().await;
}

#[tokio::test]
async fn health_uptime_never_decreases() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let mut previous = 0.0;
    for _ in 0..3 {
        let resp = client.get(server.url("/health")).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], ingestd_core::VERSION);
        let uptime = body["uptime"].as_f64().unwrap();
        assert!(uptime >= previous);
        previous = uptime;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    server.stop().await;
}

#[tokio::test]
async fn status_reports_bind_and_storage_details() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    client.post(server.url("/log")).json(&json!({"a": 1})).send().await.unwrap();
    server.drain().await;

    let text = client.get(server.url("/status")).send().await.unwrap().text().await.unwrap();
    assert!(text.contains('\n'), "status is pretty-printed");
    let body: Value = serde_json::from_str(&text).unwrap();

    assert_eq!(body["server_info"]["host"], "127.0.0.1");
    assert_eq!(body["server_info"]["port"], server.addr.port());
    assert!(body["server_info"]["uptime"].as_f64().unwrap() >= 0.0);
    assert!(body["file_info"]["monitor_dir"].as_str().unwrap().ends_with("Monitor"));
    assert_eq!(body["ingest"]["accepted"], 1);
    assert_eq!(body["ingest"]["written"], 1);
    assert_eq!(body["connections"]["max"], 200);
    assert!(body["connections"]["active"].as_u64().unwrap() >= 1);

    server.stop().await;
}

#[tokio::test]
async fn rotation_through_the_server() {
    let server = TestServer::start_with(|config| config.storage.rotate_bytes = 64).await;
    let client = reqwest::Client::new();

    let big = json!({ "fill": "y".repeat(100) });
    client.post(server.url("/log")).json(&big).send().await.unwrap();
    client.post(server.url("/log")).json(&json!({"after": true})).send().await.unwrap();
    server.drain().await;

    let backup = server.source_log().with_extension("txt.1");
    assert!(read_lines(&backup)[0].contains(&"y".repeat(100)));
    let current = read_lines(&server.source_log());
    assert_eq!(current.len(), 1);
    assert!(current[0].ends_with("] {\"after\":true}"));
    assert_eq!(server.ctx.stats.snapshot().rotations, 1);

    server.stop().await;
}

#[tokio::test]
async fn downloads_are_streamed_from_the_allow_list() {
    let server = TestServer::start().await;
    let content: Vec<u8> = (0..50_000u32).map(|i| (i % 256) as u8).collect();
    std::fs::write(server.base_dir().join("msu.zip"), &content).unwrap();
    std::fs::write(server.base_dir().join("index.html"), "<html>ingestd</html>").unwrap();

    let client = reqwest::Client::new();

    let resp = client.get(server.url("/msu.zip")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "application/zip");
    assert_eq!(resp.headers()["content-disposition"], "attachment; filename=\"msu.zip\"");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), &content[..]);

    let resp = client.get(server.url("/")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.headers().get("content-disposition").is_none());
    assert_eq!(resp.text().await.unwrap(), "<html>ingestd</html>");

    // Allow-listed but absent on disk
    assert_eq!(client.get(server.url("/server.zip")).send().await.unwrap().status(), 404);

    server.stop().await;
}

#[tokio::test]
async fn custom_allow_list_replaces_defaults() {
    let server = TestServer::start_with(|config: &mut IngestdConfig| {
        config.downloads.entries = vec![ingestd_core::config::DownloadEntry::archive(
            "/agent.zip",
            "dist/agent.zip",
        )];
    })
    .await;
    std::fs::create_dir_all(server.base_dir().join("dist")).unwrap();
    std::fs::write(server.base_dir().join("dist/agent.zip"), b"PK").unwrap();

    let client = reqwest::Client::new();
    let resp = client.get(server.url("/agent.zip")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-disposition"], "attachment; filename=\"agent.zip\"");
    assert_eq!(client.get(server.url("/msu.zip")).send().await.unwrap().status(), 404);

    server.stop().await;
}

#[tokio::test]
async fn slow_steady_download_outlives_the_socket_timeout() {
    let server = TestServer::start_with(|config| config.server.socket_timeout_secs = 1).await;
    let size = 24 * 1024 * 1024;
    std::fs::write(server.base_dir().join("msu.zip"), vec![0x5a; size]).unwrap();

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(b"GET /msu.zip HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    // Keep pulling data well past the timeout, a little at a time
    let start = Instant::now();
    let mut received = Vec::with_capacity(size + 512);
    let mut buf = vec![0u8; 64 * 1024];
    let read_all = async {
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(60), read_all).await.expect("download finished");

    let head_end = received.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
    assert!(String::from_utf8_lossy(&received[..head_end]).starts_with("HTTP/1.1 200"));
    assert_eq!(received.len() - head_end, size, "download cut off after {:?}", start.elapsed());
    assert!(start.elapsed() > Duration::from_secs(1));

    server.stop().await;
}

#[tokio::test]
async fn client_disconnect_mid_download_frees_the_connection() {
    let server = TestServer::start().await;
    std::fs::write(server.base_dir().join("msu.zip"), vec![1u8; 24 * 1024 * 1024]).unwrap();

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.write_all(b"GET /msu.zip HTTP/1.1\r\nHost: test\r\n\r\n").await.unwrap();
    let mut buf = [0u8; 8192];
    let n = stream.read(&mut buf).await.unwrap();
    assert!(String::from_utf8_lossy(&buf[..n]).starts_with("HTTP/1.1 200"));
    assert_eq!(server.ctx.limiter.snapshot().active, 1);

    drop(stream);

    let deadline = Instant::now() + Duration::from_secs(5);
    while server.ctx.limiter.snapshot().active > 0 {
        assert!(Instant::now() < deadline, "aborted download still holds its slot");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let resp = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(resp.status(), 200);

    server.stop().await;
}
