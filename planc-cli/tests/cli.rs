use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;
use tempfile::TempDir;

const N225: &str = include_str!("../../planc-core/tests/fixtures/chart_n225_6mo.json");
const GSPC: &str = include_str!("../../planc-core/tests/fixtures/chart_gspc_6mo.json");
const VIX: &str = include_str!("../../planc-core/tests/fixtures/chart_vix_5d.json");

fn planc(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("planc");
    cmd.current_dir(dir.path())
        .env_remove("PLANC_CONFIG")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    for proxy in ["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"] {
        cmd.env_remove(proxy);
    }
    cmd
}

/// Chart endpoint answering from the recorded fixtures. Returns a base URL.
fn quote_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let mut header = String::new();
            while reader.read_line(&mut header).unwrap_or(0) > 2 {
                header.clear();
            }
            let body = if line.contains("VIX") {
                VIX
            } else if line.contains("N225") {
                N225
            } else {
                GSPC
            };
            let _ = write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
        }
    });
    format!("http://{addr}/v8/finance/chart")
}

fn json_data(output: &[u8]) -> Value {
    let v: Value = serde_json::from_slice(output).expect("valid JSON on stdout");
    assert_eq!(v["ok"], true);
    v["data"].clone()
}

#[test]
fn judge_json_japan_only() {
    let dir = TempDir::new().unwrap();
    let out = planc(&dir)
        .args([
            "judge", "--vix", "35", "--buffett-jp", "70", "--buffett-us", "150",
            "--nikkei-change", "-25", "--sp500-change", "1", "--date", "2026-10-14", "--json",
        ])
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let data = json_data(&out.stdout);
    assert_eq!(data["date"], "2026年10月14日");
    assert_eq!(data["judgment"]["pattern"], "japan_only");
    assert_eq!(data["judgment"]["japan"]["crash"], true);
    assert_eq!(data["judgment"]["united_states"]["crash"], false);
    assert_eq!(data["plan"]["regular"]["jp_stock"], 45_000);
    assert_eq!(data["extra_total"], 90_000);
    assert!(data["message"].as_str().unwrap().contains("合計: 390,000円"));
}

#[test]
fn judge_text_uses_config_base_amount() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("planc.toml"), "[plan]\nbase_amount = 100000\n").unwrap();
    let out = planc(&dir)
        .args([
            "judge", "--vix", "20", "--buffett-jp", "120", "--buffett-us", "180", "--offline",
        ])
        .output()
        .unwrap();
    assert!(out.status.success());

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("[日本市場] ✅ 通常"), "Got: {}", stdout);
    assert!(stdout.contains("15日の自動買付: 100,000円"), "Got: {}", stdout);
}

#[test]
fn judge_rejects_out_of_range_base() {
    let dir = TempDir::new().unwrap();
    let out = planc(&dir)
        .args([
            "judge", "--buffett-jp", "120", "--buffett-us", "180", "--base", "5000", "--offline",
        ])
        .output()
        .unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("base_amount must be between"), "Got: {}", stderr);
}

#[test]
fn judge_fetches_missing_values() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("planc.toml"),
        format!("[market]\nbase_url = \"{}\"\n", quote_server()),
    )
    .unwrap();
    let out = planc(&dir)
        .args(["judge", "--buffett-jp", "70", "--buffett-us", "150", "--json"])
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let data = json_data(&out.stdout);
    assert_eq!(data["judgment"]["vix"], 32.45);
    assert_eq!(data["judgment"]["pattern"], "japan_only");
    let us = &data["judgment"]["united_states"]["conditions"][2];
    assert!((us["value"].as_f64().unwrap() - 5.0).abs() < 1e-9);
}

#[test]
fn judge_flags_override_fetched_values() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("planc.toml"),
        format!("[market]\nbase_url = \"{}\"\n", quote_server()),
    )
    .unwrap();
    let out = planc(&dir)
        .args([
            "judge", "--vix", "18", "--buffett-jp", "70", "--buffett-us", "150",
            "--nikkei-change", "-3", "--json",
        ])
        .output()
        .unwrap();
    assert!(out.status.success());

    let data = json_data(&out.stdout);
    assert_eq!(data["judgment"]["vix"], 18.0);
    assert_eq!(data["judgment"]["japan"]["conditions"][2]["value"], -3.0);
    assert_eq!(data["judgment"]["pattern"], "both_normal");
}

#[test]
fn judge_unreachable_quote_service_counts_as_unknown() {
    let dir = TempDir::new().unwrap();
    let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    fs::write(
        dir.path().join("planc.toml"),
        format!("[market]\nbase_url = \"http://127.0.0.1:{port}/chart\"\ntimeout_secs = 2\n"),
    )
    .unwrap();
    let out = planc(&dir)
        .args(["judge", "--buffett-jp", "70", "--buffett-us", "70", "--json"])
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let data = json_data(&out.stdout);
    assert!(data["judgment"]["vix"].is_null());
    assert_eq!(data["judgment"]["pattern"], "both_normal");
    assert!(String::from_utf8_lossy(&out.stderr).contains("Could not fetch"));
}

#[test]
fn rebalance_reports_overseas_shortage() {
    let dir = TempDir::new().unwrap();
    let out = planc(&dir)
        .args(["rebalance", "--jp-stock", "1000000"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("海外資産が不足 - 700,000円"), "Got: {}", stdout);
    assert!(stdout.contains("次回投資プラン:"), "Got: {}", stdout);
}

#[test]
fn rebalance_extra_mode_json_total() {
    let dir = TempDir::new().unwrap();
    let out = planc(&dir)
        .args([
            "rebalance", "--jp-stock", "1000000", "--mode", "extra", "--additional", "50000",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(out.status.success());
    let data = json_data(&out.stdout);
    assert_eq!(data["next_purchase"]["total"], 350_000);
    assert_eq!(data["next_purchase"]["mode"]["mode"], "extra_funds");
}

#[test]
fn rebalance_without_holdings_fails() {
    let dir = TempDir::new().unwrap();
    let out = planc(&dir).arg("rebalance").output().unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("at least one holding"));
}

#[test]
fn launch_without_venv_fails_after_banner() {
    let dir = TempDir::new().unwrap();
    let out = planc(&dir).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Plan C 暴落判定アプリ"));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Failed to launch the app"));
}

#[cfg(unix)]
mod unix {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::process::Stdio;
    use std::time::{Duration, Instant};

    /// Project with `env/bin/streamlit` running `body` after logging its argv.
    fn project_with_runner(body: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        let bin = dir.path().join("env").join("bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(dir.path().join("app.py"), "print('hi')\n").unwrap();

        let log = dir.path().join("calls.log");
        let exe = bin.join("streamlit");
        fs::write(
            &exe,
            format!("#!/bin/sh\necho \"$@\" >> '{}'\n{}\n", log.display(), body),
        )
        .unwrap();
        fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
        dir
    }

    fn fake_project(exit_code: i32) -> TempDir {
        project_with_runner(&format!(
            "echo 'You can now view your Streamlit app'\nexit {exit_code}"
        ))
    }

    #[test]
    fn launch_propagates_runner_exit_code() {
        let dir = fake_project(3);
        let out = planc(&dir)
            .args(["launch", "--venv", "env", "--script", "app.py"])
            .output()
            .unwrap();
        assert_eq!(out.status.code(), Some(3));

        let calls = fs::read_to_string(dir.path().join("calls.log")).unwrap();
        assert_eq!(calls.lines().count(), 1);
        assert!(calls.starts_with("run "), "Got: {}", calls);
        assert!(calls.trim_end().ends_with("app.py"), "Got: {}", calls);
    }

    #[test]
    fn launch_json_reports_exit() {
        let dir = fake_project(0);
        fs::write(
            dir.path().join("planc.toml"),
            "[launcher]\nvenv = \"env\"\nscript = \"app.py\"\n",
        )
        .unwrap();
        let out = planc(&dir).args(["launch", "--json"]).output().unwrap();
        assert!(out.status.success());
        let stdout = String::from_utf8_lossy(&out.stdout);
        assert!(!stdout.contains("Plan C 暴落判定アプリ"));
        // The runner's own output goes to stderr, stdout holds only the JSON
        let data = json_data(&out.stdout);
        assert_eq!(data["exit_code"], 0);
        assert_eq!(data["interrupted"], false);
        assert!(String::from_utf8_lossy(&out.stderr).contains("You can now view"));
    }

    fn send_sigint(pid: u32) {
        let status = std::process::Command::new("kill")
            .args(["-INT", &pid.to_string()])
            .status()
            .unwrap();
        assert!(status.success());
    }

    #[test]
    fn launch_second_interrupt_kills_runner_and_deactivates() {
        let dir = project_with_runner("trap '' INT\nexec sleep 30");
        let started = dir.path().join("calls.log");

        let mut child = std::process::Command::new(env!("CARGO_BIN_EXE_planc"))
            .args(["launch", "--json", "--venv", "env", "--script", "app.py"])
            .current_dir(dir.path())
            .env_remove("PLANC_CONFIG")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while !started.exists() {
            assert!(Instant::now() < deadline, "runner never started");
            thread::sleep(Duration::from_millis(50));
        }
        // Let the launcher reach its wait loop
        thread::sleep(Duration::from_millis(500));

        send_sigint(child.id());
        thread::sleep(Duration::from_millis(300));
        send_sigint(child.id());

        let out = child.wait_with_output().unwrap();
        assert_eq!(out.status.code(), Some(130));
        let data = json_data(&out.stdout);
        assert_eq!(data["exit_code"], 130);
        assert_eq!(data["interrupted"], true);

        let stderr = String::from_utf8_lossy(&out.stderr);
        let killed = stderr.find("Second interrupt").expect("kill logged");
        let released = stderr.find("Deactivated").expect("release logged");
        assert!(killed < released, "Got: {}", stderr);
    }
}
