//! Black-box-ish integration tests for the `check` command, driven
//! in-process against a hand-rolled minimal HTTP responder (avoiding a
//! heavyweight mock-server dependency, per the project's test tooling
//! conventions).

use healthwatch_cli::cli::{CommonArgs, OutputFormat, ProbeArgs};
use healthwatch_cli::commands::check;
use std::io::Write;
use std::net::TcpListener as StdTcpListener;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Binds an ephemeral port and serves exactly one HTTP request with a
/// 200 response carrying `body`, with `Content-Length` computed from it
/// so callers can't get the framing wrong, then closes the connection.
async fn serve_once(body: &'static str) -> String {
    let std_listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    std_listener.set_nonblocking(true).unwrap();
    let addr = std_listener.local_addr().unwrap();
    let listener = TcpListener::from_std(std_listener).unwrap();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{addr}/health")
}

/// Serves a response that writes a partial JSON body, then closes the
/// socket mid-body so the client sees an unexpected EOF.
async fn serve_dropped_connection() -> String {
    let std_listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    std_listener.set_nonblocking(true).unwrap();
    let addr = std_listener.local_addr().unwrap();
    let listener = TcpListener::from_std(std_listener).unwrap();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            // Claim more bytes than are actually sent, then close: the
            // client should observe an unexpected EOF reading the body.
            let body = "{\"status\":\"ok\"";
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len() + 32,
                body
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{addr}/health")
}

fn write_config(dir: &tempfile::TempDir, url: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.json");
    let contents = format!(
        "{{\"interval\":\"1s\",\"timeout\":\"1s\",\"retries\":0,\"services\":[{{\"name\":\"api\",\"url\":\"{url}\"}}]}}"
    );
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

fn probe_args(config_path: std::path::PathBuf) -> ProbeArgs {
    ProbeArgs {
        common: CommonArgs {
            config: config_path,
            interval: None,
            timeout: None,
            retries: None,
            concurrency: None,
            proxy: None,
            headers: Vec::new(),
            missing_status: None,
            insecure: false,
            debug: false,
        },
        out: OutputFormat::Json,
    }
}

#[tokio::test]
async fn healthy_single_service_reports_ok_and_reported_latency() {
    let url = serve_once("{\"status\":\"ok\",\"timings\":{\"total_ms\":12},\"version\":\"1.0.0\"}").await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, &url);

    let exit_code = check::run(probe_args(config)).await.unwrap();
    assert_eq!(exit_code, 0);
}

#[tokio::test]
async fn missing_status_field_falls_back_to_configured_policy() {
    let url = serve_once("{\"version\":\"2.0.0\"}").await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let contents = format!(
        "{{\"interval\":\"1s\",\"timeout\":\"1s\",\"retries\":0,\"missing_status\":\"degraded\",\"services\":[{{\"name\":\"api\",\"url\":\"{url}\"}}]}}"
    );
    std::fs::write(&path, contents).unwrap();

    let exit_code = check::run(probe_args(path)).await.unwrap();
    assert_eq!(exit_code, 1);
}

#[tokio::test]
async fn dropped_connection_is_reported_as_down() {
    let url = serve_dropped_connection().await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, &url);

    let exit_code = check::run(probe_args(config)).await.unwrap();
    assert_eq!(exit_code, 2);
}

#[tokio::test]
async fn unreachable_service_is_down_and_exits_2() {
    // Nothing is listening on this port.
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, "http://127.0.0.1:1");

    let exit_code = check::run(probe_args(config)).await.unwrap();
    assert_eq!(exit_code, 2);
}

/// Serves a response after an artificial delay, with a payload-reported
/// `total_ms` that differs from the actual wall-clock delay, so the test
/// can confirm the payload's self-report wins over the measured latency.
async fn serve_after_delay(delay: std::time::Duration, body: &'static str) -> String {
    let std_listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    std_listener.set_nonblocking(true).unwrap();
    let addr = std_listener.local_addr().unwrap();
    let listener = TcpListener::from_std(std_listener).unwrap();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            tokio::time::sleep(delay).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{addr}/health")
}

#[tokio::test]
async fn slow_service_prefers_payload_reported_latency_over_measured(
) {
    let url = serve_after_delay(
        std::time::Duration::from_millis(110),
        "{\"status\":\"ok\",\"timings\":{\"total_ms\":110}}",
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let contents = format!(
        "{{\"interval\":\"1s\",\"timeout\":\"1000ms\",\"retries\":0,\"services\":[{{\"name\":\"api\",\"url\":\"{url}\"}}]}}"
    );
    std::fs::write(&path, contents).unwrap();

    let exit_code = check::run(probe_args(path)).await.unwrap();
    assert_eq!(exit_code, 0);
}

#[tokio::test]
async fn fleet_with_mixed_statuses_aggregates_to_the_worst_one() {
    let ok_url = serve_once("{\"status\":\"ok\",\"timings\":{\"total_ms\":5}}").await;
    let degraded_url = serve_once("{\"status\":\"degraded\",\"timings\":{\"total_ms\":20}}").await;
    let down_url = serve_once("{\"status\":\"down\"}").await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let contents = format!(
        "{{\"interval\":\"1s\",\"timeout\":\"1s\",\"retries\":0,\"services\":[\
         {{\"name\":\"api\",\"url\":\"{ok_url}\"}},\
         {{\"name\":\"auth\",\"url\":\"{degraded_url}\"}},\
         {{\"name\":\"search\",\"url\":\"{down_url}\"}}\
         ]}}"
    );
    std::fs::write(&path, contents).unwrap();

    let exit_code = check::run(probe_args(path)).await.unwrap();
    assert_eq!(exit_code, 2);
}
