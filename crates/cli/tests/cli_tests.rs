//! CLI integration tests
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("snipnote");
    cmd.env_remove("SNIPNOTE_RULES")
        .env_remove("SNIPNOTE_COOKIES")
        .env_remove("RUST_LOG")
        .env("XDG_CONFIG_HOME", "/nonexistent/snipnote-test-config");
    cmd
}

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

#[test]
fn test_cli_file_input() {
    cmd()
        .arg(get_fixture_path("plain_article.html"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# Understanding Ownership\n"))
        .stdout(predicate::str::contains("Ownership is a set of rules"));
}

#[test]
fn test_cli_stdin_input() {
    let html = std::fs::read_to_string(get_fixture_path("plain_article.html")).unwrap();
    cmd()
        .args(["--url", "https://blog.example/post", "-"])
        .write_stdin(html)
        .assert()
        .success()
        .stdout(predicate::str::contains("Source: <https://blog.example/post>"))
        .stdout(predicate::str::contains("![](https://blog.example/images/diagram.png)"));
}

#[test]
fn test_cli_json_format() {
    let output = cmd()
        .args(["-f", "json", "--url", "https://blog.example/post", &get_fixture_path("plain_article.html")])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["title"], "Understanding Ownership");
    assert_eq!(json["source_url"], "https://blog.example/post");
    assert!(json["markdown"].as_str().unwrap().contains("Borrowing"));
}

#[test]
fn test_cli_rules_file() {
    cmd()
        .args([
            "--rules",
            &get_fixture_path("rules.json"),
            "--url",
            "https://forum.test/t/42",
            &get_fixture_path("forum.html"),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("#### alice"));
}

#[test]
fn test_cli_rules_from_env() {
    cmd()
        .env("SNIPNOTE_RULES", get_fixture_path("rules.json"))
        .args(["--url", "https://text-only.test/post", &get_fixture_path("plain_article.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("![]").not());
}

#[test]
fn test_cli_code_lang() {
    cmd()
        .args(["--code-lang", "kotlin", &get_fixture_path("code_sample.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("```kotlin\nMap<String, Integer>"))
        .stdout(predicate::str::contains("```python"));
}

#[test]
fn test_cli_output_file() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("output.md");

    cmd()
        .args(["-o", output.to_str().unwrap()])
        .arg(get_fixture_path("plain_article.html"))
        .assert()
        .success();

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("Understanding Ownership"));
}

#[test]
fn test_cli_invalid_file() {
    cmd()
        .arg("nonexistent.html")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[FetchError]"));
}

#[test]
fn test_cli_selection_failure() {
    cmd()
        .args([
            "--rules",
            &get_fixture_path("rules.json"),
            "--url",
            "https://ledger.test/story",
            "-",
        ])
        .write_stdin("<html><body><div>no article here</div></body></html>")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[SelectionError]"))
        .stderr(predicate::str::contains("daily-ledger"));
}

#[test]
fn test_cli_validation_failure_message() {
    cmd()
        .args(["--rules", &get_fixture_path("rules.json"), "--url", "https://forum.test/t/1", "-"])
        .write_stdin(r#"<div class="post"><p>Anyone?</p></div>"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[ValidationError]"))
        .stderr(predicate::str::contains("thread has no replies"));
}

#[test]
fn test_cli_invalid_rules_file() {
    let tmp = TempDir::new().unwrap();
    let rules = tmp.path().join("rules.json");
    std::fs::write(&rules, r#"[{"name": "broken", "stop_patterns": ["[unclosed"]}]"#).unwrap();

    cmd()
        .args(["--rules", rules.to_str().unwrap(), &get_fixture_path("plain_article.html")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[ConfigError]"))
        .stderr(predicate::str::contains("broken"));
}

#[test]
fn test_cli_invalid_format() {
    cmd()
        .args(["-f", "html", &get_fixture_path("plain_article.html")])
        .assert()
        .failure();
}

#[test]
fn test_cli_verbose() {
    cmd()
        .args(["-v", &get_fixture_path("plain_article.html")])
        .assert()
        .success()
        .stderr(predicate::str::contains("SnipNote"));
}
