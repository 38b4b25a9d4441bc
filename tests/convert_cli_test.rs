use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::thread;
use tempfile::tempdir;

const PROXY_VARS: [&str; 6] = [
    "HTTP_PROXY",
    "http_proxy",
    "HTTPS_PROXY",
    "https_proxy",
    "ALL_PROXY",
    "all_proxy",
];

fn read_request(stream: &mut TcpStream) -> String {
    let mut reader = BufReader::new(stream);
    let mut request = String::new();
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).expect("read line") == 0 {
            break;
        }
        if let Some((name, value)) = line.split_once(':')
            && name.eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse().expect("content length");
        }
        let end = line == "\r\n";
        request.push_str(&line);
        if end {
            break;
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).expect("read body");
    request.push_str(&String::from_utf8_lossy(&body));
    request
}

/// Serve a single chat-completion response and hand back the raw request.
fn fake_model(status_line: &'static str, body: String) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let request = read_request(&mut stream);
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).expect("write");
        request
    });
    (format!("http://{addr}/v1/chat/completions"), handle)
}

fn completion(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-test",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    })
    .to_string()
}

fn sql2es(home: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("sql2es");
    cmd.current_dir(home)
        .env("HOME", home)
        .env("SQL2ES_HOME", home.join("sql2es-home"))
        .env("NO_PROXY", "127.0.0.1,localhost")
        .env_remove("SQL2ES_API_KEY")
        .env_remove("SQL2ES_CONFIG_PATH")
        .env_remove("SQL2ES_HISTORY_FILE");
    for var in PROXY_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn history_file(home: &Path) -> std::path::PathBuf {
    home.join("sql2es-home/history/conversion_history.json")
}

#[test]
fn convert_prints_formatted_dsl_and_saves_history() {
    let tmp = tempdir().expect("tempdir");
    let (endpoint, server) = fake_model(
        "200 OK",
        completion("GET /t/_search\n{\"query\":{\"match_all\":{}}}"),
    );

    let assert = sql2es(tmp.path())
        .env("SQL2ES_API_KEY", "sk-test")
        .env("SQL2ES_API_ENDPOINT", &endpoint)
        .env("SQL2ES_MODEL", "gpt-test")
        .env("SQL2ES_ES_VERSION", "8.x")
        .args(["convert", "SELECT * FROM t"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.starts_with("GET /t/_search\n{\n  \"query\": {\n    \"match_all\": {}\n  }\n}"));

    let request = server.join().expect("server");
    assert!(request.to_ascii_lowercase().contains("authorization: bearer sk-test"));
    assert!(request.contains("\"model\":\"gpt-test\""));
    assert!(request.contains("Elasticsearch 8.x query DSL"));
    assert!(request.contains("SELECT * FROM t"));

    let raw = fs::read_to_string(history_file(tmp.path())).expect("history written");
    let records: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(records.as_array().map(Vec::len), Some(1));
    assert_eq!(records[0]["sqlQuery"], "SELECT * FROM t");
    assert_eq!(records[0]["type"], "dsl");
    assert_eq!(records[0]["apiPath"], "GET /t/_search");
    assert!(records[0].get("curlCommand").is_none());
}

#[test]
fn curl_command_uses_es_endpoint_and_basic_auth() {
    let tmp = tempdir().expect("tempdir");
    let (endpoint, server) = fake_model(
        "200 OK",
        completion("POST /orders/_search\n{\"query\":{\"term\":{\"status\":\"paid\"}}}"),
    );

    sql2es(tmp.path())
        .env("SQL2ES_API_KEY", "sk-test")
        .env("SQL2ES_API_ENDPOINT", &endpoint)
        .env("SQL2ES_ES_ENDPOINT", "http://es:9200")
        .env("SQL2ES_ES_USERNAME", "elastic")
        .env("SQL2ES_ES_PASSWORD", "changeme")
        .args(["curl", "SELECT * FROM orders WHERE status = 'paid'"])
        .assert()
        .success()
        .stdout(predicates::str::starts_with(
            "curl -X POST -H \"Content-Type: application/json\" -u \"elastic:changeme\" \"http://es:9200/orders/_search\" -d '{",
        ));
    server.join().expect("server");

    let raw = fs::read_to_string(history_file(tmp.path())).expect("history written");
    let records: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(records[0]["type"], "curl");
    assert!(
        records[0]["curlCommand"]
            .as_str()
            .is_some_and(|cmd| cmd.contains("http://es:9200/orders/_search"))
    );
}

#[test]
fn convert_reads_sql_from_stdin_and_can_skip_history() {
    let tmp = tempdir().expect("tempdir");
    let (endpoint, server) = fake_model("200 OK", completion("GET /logs/_count"));

    sql2es(tmp.path())
        .env("SQL2ES_API_KEY", "sk-test")
        .env("SQL2ES_API_ENDPOINT", &endpoint)
        .args(["convert", "--no-history"])
        .write_stdin("SELECT COUNT(*) FROM logs\n")
        .assert()
        .success()
        .stdout(predicates::str::contains("GET /logs/_count"));
    server.join().expect("server");

    assert!(!history_file(tmp.path()).exists());
}

#[test]
fn blank_sql_fails_without_contacting_the_model() {
    let tmp = tempdir().expect("tempdir");

    sql2es(tmp.path())
        .env("SQL2ES_API_KEY", "sk-test")
        .env("SQL2ES_API_ENDPOINT", "http://127.0.0.1:9/v1/chat/completions")
        .args(["convert", "   "])
        .assert()
        .failure()
        .stderr(predicates::str::contains("E001_EMPTY_INPUT"));

    assert!(!history_file(tmp.path()).exists());
}

#[test]
fn missing_api_key_is_a_configuration_error() {
    let tmp = tempdir().expect("tempdir");

    sql2es(tmp.path())
        .env("SQL2ES_API_ENDPOINT", "http://127.0.0.1:9/v1/chat/completions")
        .args(["curl", "SELECT 1"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("E002_CONFIG_MISSING"));
}

#[test]
fn remote_error_status_is_reported_and_nothing_is_saved() {
    let tmp = tempdir().expect("tempdir");
    let (endpoint, server) = fake_model(
        "500 Internal Server Error",
        "{\"error\":{\"message\":\"upstream exploded\"}}".to_string(),
    );

    sql2es(tmp.path())
        .env("SQL2ES_API_KEY", "sk-test")
        .env("SQL2ES_API_ENDPOINT", &endpoint)
        .args(["convert", "SELECT * FROM t"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("E003_REMOTE_STATUS"))
        .stderr(predicates::str::contains("500"));
    server.join().expect("server");

    assert!(!history_file(tmp.path()).exists());
}

#[test]
fn prose_reply_is_reported_as_malformed_directive() {
    let tmp = tempdir().expect("tempdir");
    let (endpoint, server) = fake_model(
        "200 OK",
        completion("I cannot convert this query.\n{}"),
    );

    sql2es(tmp.path())
        .env("SQL2ES_API_KEY", "sk-test")
        .env("SQL2ES_API_ENDPOINT", &endpoint)
        .args(["convert", "SELECT * FROM t"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("E008_MALFORMED_DIRECTIVE"))
        .stderr(predicates::str::contains("I cannot convert this query."));
    server.join().expect("server");
}

#[test]
fn json_report_uses_history_field_names() {
    let tmp = tempdir().expect("tempdir");
    let (endpoint, server) = fake_model("200 OK", completion("GET /t/_search\n{\"size\":1}"));

    let assert = sql2es(tmp.path())
        .env("SQL2ES_API_KEY", "sk-test")
        .env("SQL2ES_API_ENDPOINT", &endpoint)
        .args(["--json", "convert", "--no-history", "SELECT * FROM t LIMIT 1"])
        .assert()
        .success();
    server.join().expect("server");

    let report: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("json report");
    assert_eq!(report["data"]["type"], "dsl");
    assert_eq!(report["data"]["apiPath"], "GET /t/_search");
    assert_eq!(report["data"]["esQuery"], "{\n  \"size\": 1\n}");
    assert!(report["data"].get("api_path").is_none());
}
