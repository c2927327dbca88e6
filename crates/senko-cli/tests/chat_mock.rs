use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::tempdir;
use wiremock::matchers::{bearer_token, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

#[tokio::test]
async fn test_chat_against_compatible_server() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(bearer_token("test-key"))
        .respond_with(|req: &Request| {
            let body: Value = serde_json::from_slice(&req.body).unwrap();
            assert_eq!(body["model"], "mock-model");
            assert_eq!(body["messages"][0]["role"], "system");
            let last = body["messages"].as_array().unwrap().last().unwrap().clone();
            assert_eq!(last["role"], "user");
            ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": format!("*nods* got {}", last["content"].as_str().unwrap())
                    }
                }]
            }))
        })
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    cargo_bin_cmd!("senko")
        .env("SENKO_HOME", dir.path())
        .env("SENKO_API_KEY", "test-key")
        .env("SENKO_BASE_URL", format!("{}/v1", server.uri()))
        .args(["chat", "--model", "mock-model"])
        .write_stdin("hello there\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[2] you: hello there"))
        .stdout(predicate::str::contains("[3] senko: nods got hello there"));
}

#[tokio::test]
async fn test_rejected_key_shows_apology() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    cargo_bin_cmd!("senko")
        .env("SENKO_HOME", dir.path())
        .env("SENKO_API_KEY", "bad-key")
        .arg("--base-url")
        .arg(server.uri())
        .write_stdin("hello\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[3] senko: looks confused My connection key isn't working",
        ))
        .stderr(predicate::str::contains("status: Invalid API Key"));
}

#[tokio::test]
async fn test_rate_limit_shows_apology() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    cargo_bin_cmd!("senko")
        .env("SENKO_HOME", dir.path())
        .env("SENKO_API_KEY", "test-key")
        .env("SENKO_BASE_URL", server.uri())
        .write_stdin("hello\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("I need to rest for a moment"))
        .stderr(predicate::str::contains("status: Rate Limited"));
}
