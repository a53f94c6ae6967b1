//! Integration tests for rlm-context.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use rlm_context::config::Config;
use rlm_context::tools::ToolService;
use serde_json::{Value, json};
use std::time::Duration;

/// Helper to create a service with default limits.
fn create_service() -> ToolService {
    ToolService::new(Config::default()).expect("valid default config")
}

async fn call(service: &ToolService, tool: &str, arguments: Value) -> Value {
    service.dispatch(tool, arguments).await
}

#[tokio::test]
async fn test_load_decompose_and_fetch_chunks() {
    let service = create_service();
    let text = (1..=12)
        .map(|i| format!("line {i}"))
        .collect::<Vec<_>>()
        .join("\n");

    let loaded = call(
        &service,
        "load_context",
        json!({ "context": text, "context_id": "log" }),
    )
    .await;
    assert_eq!(loaded["metadata"]["lineCount"], 12);

    let decomposed = call(
        &service,
        "decompose_context",
        json!({ "context_id": "log", "strategy": "by_lines", "lines_per_chunk": 5, "overlap": 1 }),
    )
    .await;
    assert_eq!(decomposed["total_chunks"], 3);
    assert_eq!(decomposed["chunks"][1]["metadata"]["startLine"], 5);
    assert_eq!(decomposed["chunks"][1]["metadata"]["endLine"], 9);

    let fetched = call(
        &service,
        "get_chunks",
        json!({
            "context_id": "log",
            "strategy": "by_lines",
            "lines_per_chunk": 5,
            "overlap": 1,
            "chunk_indices": [2, 7]
        }),
    )
    .await;
    assert_eq!(fetched["requested"], 2);
    assert_eq!(fetched["returned"], 1);
    assert_eq!(fetched["chunks"][0]["content"], "line 9\nline 10\nline 11\nline 12");
    service.shutdown();
}

#[tokio::test]
async fn test_offsets_are_chars_not_bytes() {
    let service = create_service();
    call(
        &service,
        "load_context",
        json!({ "context": "héllo wörld, héllo", "context_id": "u" }),
    )
    .await;

    let found = call(
        &service,
        "find_all",
        json!({ "context_id": "u", "substring": "héllo" }),
    )
    .await;
    assert_eq!(found["offsets"], json!([0, 13]));

    let read = call(
        &service,
        "read_context",
        json!({ "context_id": "u", "start": 6, "end": 11 }),
    )
    .await;
    assert_eq!(read["content"], "wörld");

    let searched = call(
        &service,
        "search_context",
        json!({ "context_id": "u", "pattern": "w.rld", "context_chars": 2 }),
    )
    .await;
    assert_eq!(searched["matches"][0]["index"], 6);
    assert_eq!(searched["matches"][0]["context"], "o wörld, ");
}

#[tokio::test]
async fn test_script_sees_session_state() {
    let service = create_service();
    call(
        &service,
        "load_context",
        json!({ "context": "ERROR a\nINFO b\nERROR c\n", "context_id": "log" }),
    )
    .await;
    call(
        &service,
        "set_variable",
        json!({ "name": "level", "value": "ERROR" }),
    )
    .await;

    let result = call(
        &service,
        "execute_code",
        json!({ "code": r#"
            let level = get_var("level");
            let hits = lines(get_context("log")).filter(|l| l.starts_with(level));
            set_var("hits", hits);
            set_answer(`found ${hits.len()}`, true);
            print(hits.len());
        "# }),
    )
    .await;
    assert_eq!(result["success"], true, "{result}");
    assert_eq!(result["output"], "2\n");

    let hits = call(&service, "get_variable", json!({ "name": "hits" })).await;
    assert_eq!(hits["value"], json!(["ERROR a", "ERROR c"]));

    let answer = call(&service, "get_answer", json!({})).await;
    assert_eq!(answer["answer"], json!({ "content": "found 2", "ready": true }));

    let info = call(&service, "get_session_info", json!({})).await;
    assert_eq!(info["session"]["answerReady"], true);
    assert_eq!(info["session"]["historyLength"], 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_script_timeout_keeps_output_and_session() {
    let mut config = Config::default();
    config.sandbox.timeout = Duration::from_millis(200);
    let service = ToolService::new(config).unwrap();

    let timed_out = call(
        &service,
        "execute_code",
        json!({ "code": r#"print("before"); set_var("stage", 1); loop { }"# }),
    )
    .await;
    assert_eq!(timed_out["success"], false);
    assert_eq!(timed_out["error_code"], "ExecutionTimeout");
    assert_eq!(timed_out["output"], "before\n");

    let stage = call(&service, "get_variable", json!({ "name": "stage" })).await;
    assert_eq!(stage["value"], 1);

    let after = call(&service, "execute_code", json!({ "code": "40 + 2" })).await;
    assert_eq!(after["success"], true);
    assert_eq!(after["output"], "=> 42\n");
    service.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_session_executions_serialize() {
    let service = create_service();
    call(&service, "set_variable", json!({ "name": "n", "value": 0 })).await;

    let bump = json!({ "code": r#"let n = get_var("n"); set_var("n", n + 1);"# });
    let (a, b, c) = tokio::join!(
        call(&service, "execute_code", bump.clone()),
        call(&service, "execute_code", bump.clone()),
        call(&service, "execute_code", bump),
    );
    for result in [a, b, c] {
        assert_eq!(result["success"], true);
    }

    let n = call(&service, "get_variable", json!({ "name": "n" })).await;
    assert_eq!(n["value"], 3);
}

#[tokio::test(start_paused = true)]
async fn test_inactive_sessions_are_evicted() {
    let mut config = Config::default();
    config.registry.session_timeout = Duration::from_secs(60);
    config.registry.sweep_interval = Duration::from_secs(10);
    let service = ToolService::new(config).unwrap();

    call(&service, "create_session", json!({ "session_id": "idle" })).await;
    call(&service, "create_session", json!({ "session_id": "busy" })).await;

    for _ in 0..4 {
        tokio::time::advance(Duration::from_secs(20)).await;
        let info = call(&service, "get_session_info", json!({ "session_id": "busy" })).await;
        assert_eq!(info["success"], true);
    }

    let idle = call(&service, "get_session_info", json!({ "session_id": "idle" })).await;
    assert_eq!(idle["error"]["code"], "SessionNotFound");
    assert!(service.registry().get("busy").is_ok());
    service.shutdown();
    assert!(service.registry().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_capacity_evicts_least_recently_active() {
    let mut config = Config::default();
    config.registry.max_sessions = 2;
    let service = ToolService::new(config).unwrap();

    call(&service, "create_session", json!({ "session_id": "a" })).await;
    tokio::time::advance(Duration::from_secs(1)).await;
    call(&service, "create_session", json!({ "session_id": "b" })).await;
    tokio::time::advance(Duration::from_secs(1)).await;
    call(&service, "get_session_info", json!({ "session_id": "a" })).await;
    tokio::time::advance(Duration::from_secs(1)).await;

    let created = call(&service, "create_session", json!({ "session_id": "c" })).await;
    assert_eq!(created["success"], true);

    let mut live = service.registry().list();
    live.sort();
    assert_eq!(live, vec!["a".to_string(), "c".to_string()]);
}

mod property_tests {
    use proptest::prelude::*;
    use rlm_context::chunking::{DecomposeOptions, Strategy, decompose};

    fn char_slice(text: &str, start: usize, end: usize) -> String {
        text.chars().skip(start).take(end - start).collect()
    }

    proptest! {
        #[test]
        fn fixed_size_without_overlap_reassembles(text in "\\PC{0,400}", size in 1usize..64) {
            let chunks = decompose(text.as_str(), Strategy::FixedSize, &DecomposeOptions::with_size(size)).unwrap();
            let joined: String = chunks.iter().map(|c| c.content.as_str()).collect();
            prop_assert_eq!(joined, text);
            for pair in chunks.windows(2) {
                prop_assert_eq!(pair[0].end_offset, pair[1].start_offset);
            }
        }

        #[test]
        fn fixed_size_overlap_steps(text in "[a-zé ]{1,300}", size in 2usize..40, overlap in 0usize..40) {
            let overlap = overlap % size;
            let options = DecomposeOptions::with_size_and_overlap(size, overlap);
            let chunks = decompose(text.as_str(), Strategy::FixedSize, &options).unwrap();
            for pair in chunks.windows(2) {
                prop_assert_eq!(pair[1].start_offset, pair[0].start_offset + size - overlap);
            }
            let last = chunks.last().unwrap();
            prop_assert_eq!(last.end_offset, text.chars().count());
        }

        #[test]
        fn offsets_address_content(text in "[a-zA-Zé.!?,#\\n ]{0,300}") {
            let len = text.chars().count();
            let mut regex_options = DecomposeOptions::default();
            regex_options.pattern = Some(",".to_string());
            let runs = [
                (Strategy::FixedSize, DecomposeOptions::with_size_and_overlap(17, 5)),
                (Strategy::ByLines, DecomposeOptions::with_lines(3, 1)),
                (Strategy::ByParagraphs, DecomposeOptions::default()),
                (Strategy::BySections, DecomposeOptions::default()),
                (Strategy::ByRegex, regex_options),
                (Strategy::BySentences, DecomposeOptions::default()),
            ];
            for (strategy, options) in runs {
                let chunks = decompose(text.as_str(), strategy, &options).unwrap();
                for (i, chunk) in chunks.iter().enumerate() {
                    prop_assert_eq!(chunk.index, i);
                    prop_assert!(chunk.start_offset <= chunk.end_offset);
                    prop_assert!(chunk.end_offset <= len);
                    prop_assert_eq!(
                        char_slice(&text, chunk.start_offset, chunk.end_offset),
                        chunk.content.clone()
                    );
                }
            }
        }
    }
}

/// Binary-level tests over stdio.
mod cli_tests {
    use assert_cmd::Command;
    use predicates::prelude::*;

    fn bin() -> Command {
        Command::cargo_bin("rlm-context").expect("binary is built")
    }

    #[test]
    fn test_tools_lists_names() {
        bin()
            .arg("tools")
            .assert()
            .success()
            .stdout(predicate::str::contains("\"load_context\""))
            .stdout(predicate::str::contains("\"execute_code\""))
            .stdout(predicate::str::contains("\"by_paragraphs\""));
    }

    #[test]
    fn test_tools_text_format() {
        bin()
            .args(["--format", "text", "tools"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("Tools ("));
    }

    #[test]
    fn test_call_reports_structured_failure() {
        bin()
            .args(["call", "get_context_info", r#"{"context_id": "missing"}"#])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"success\":false"))
            .stdout(predicate::str::contains("ContextNotFound"));
    }

    #[test]
    fn test_call_reads_arguments_from_stdin() {
        bin()
            .args(["call", "execute_code", "-"])
            .write_stdin(r#"{"code": "print(upper(\"hi\"))"}"#)
            .assert()
            .success()
            .stdout(predicate::str::contains("\"output\":\"HI\\n\""));
    }

    #[test]
    fn test_call_rejects_malformed_arguments() {
        bin()
            .args(["call", "list_tools", "{not json"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("InvalidArgument"));
    }

    #[test]
    fn test_serve_round_trip() {
        let input = concat!(
            r#"{"id": 1, "tool": "load_context", "arguments": {"context": "alpha beta alpha", "context_id": "doc"}}"#,
            "\n",
            r#"{"id": 2, "tool": "find_all", "arguments": {"context_id": "doc", "substring": "alpha"}}"#,
            "\n",
        );
        let output = bin().arg("serve").write_stdin(input).output().expect("runs");
        assert!(output.status.success());

        let stdout = String::from_utf8(output.stdout).expect("utf-8 output");
        let responses: Vec<serde_json::Value> = stdout
            .lines()
            .map(|line| serde_json::from_str(line).expect("one JSON object per line"))
            .collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[1]["offsets"], serde_json::json!([0, 11]));
    }

    #[test]
    fn test_env_limits_are_validated() {
        bin()
            .env("RLM_CONTEXT_MAX_SESSIONS", "0")
            .args(["call", "list_tools"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("ConfigError"));
    }
}
