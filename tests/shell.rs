use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn spawn_shell() -> Child {
    Command::new(env!("CARGO_BIN_EXE_jobsh"))
        .arg("-p")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start jobsh")
}

fn run_shell_in(dir: &Path, input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_jobsh"))
        .arg("-p")
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start jobsh");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn run_shell(input: &str) -> Output {
    run_shell_in(&std::env::temp_dir(), input)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_echo_joins_words() {
    let output = run_shell("echo hello world\n");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "hello world \n");
}

#[test]
fn test_eof_exits_successfully() {
    let output = run_shell("");
    assert!(output.status.success());
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_prompt_is_printed_without_p_flag() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_jobsh"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b"echo hi\n").unwrap();
    let output = child.wait_with_output().unwrap();
    assert_eq!(stdout(&output), "$ hi \n$ ");
}

#[test]
fn test_fg_with_empty_table() {
    let output = run_shell("fg 1\njobs\n");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "Invalid job ID.\n");
    assert!(stderr(&output).is_empty());
}

#[test]
fn test_exit_stops_reading() {
    let output = run_shell("exit\necho unreachable\n");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "Exiting shell...\n");
}

#[test]
fn test_unknown_command_reports_and_continues() {
    let output = run_shell("nonexistent123\necho still here\n");
    assert!(output.status.success());
    assert!(stderr(&output).contains("nonexistent123: No such file or directory"));
    assert_eq!(stdout(&output), "still here \n");
}

#[test]
fn test_cd_failure_keeps_directory() {
    let dir = std::env::temp_dir().canonicalize().unwrap();
    let output = run_shell_in(&dir, "cd /nonexistent/jobsh/dir\npwd\n");
    assert_eq!(stderr(&output), "cd: No such file or directory\n");
    assert_eq!(stdout(&output), format!("{}\n", dir.display()));
}

#[test]
fn test_cd_changes_directory_for_children() {
    let output = run_shell("cd /\npwd\n/bin/pwd\n");
    assert_eq!(stdout(&output), "/\n/\n");
}

#[test]
fn test_export_reaches_children() {
    let output = run_shell("export JOBSH_IT_VAR=visible\nprintenv JOBSH_IT_VAR\nunset JOBSH_IT_VAR\nprintenv JOBSH_IT_VAR\n");
    assert_eq!(stdout(&output), "visible\n");
}

#[test]
fn test_alias_validation() {
    let output = run_shell("alias ll=ls\nalias novalue\nalias =x\nunalias ll\nalias\n");
    assert_eq!(stdout(&output), "Alias: ll=ls\nUnalias: ll\n");
    assert_eq!(
        stderr(&output),
        "alias: invalid syntax\nalias: invalid syntax\nalias: missing arguments\n"
    );
}

#[test]
fn test_background_job_then_fg() {
    let output = run_shell("sleep 1 &\njobs\nfg 1\njobs\n");
    assert!(output.status.success());
    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 3, "unexpected output: {out:?}");

    let pid = lines[0].strip_prefix("[1] ").unwrap();
    assert_eq!(lines[1], format!("[1] ({}) Running sleep 1 &", pid));
    assert_eq!(lines[2], format!("Foreground job {} (sleep 1 &) terminated.", pid));
}

#[test]
fn test_fg_reports_the_removed_job() {
    let output = run_shell("sleep 1 &\nsleep 3 &\nfg 1\njobs\nfg 1\n");
    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 5, "unexpected output: {out:?}");

    let second = lines[1].strip_prefix("[2] ").unwrap();
    assert!(lines[2].ends_with("(sleep 1 &) terminated."));
    assert_eq!(lines[3], format!("[1] ({}) Running sleep 3 &", second));
    assert!(lines[4].ends_with("(sleep 3 &) terminated."));
}

#[test]
fn test_bg_keeps_job_in_table() {
    let output = run_shell("sleep 1 &\nbg 1\njobs\nfg %1\n");
    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 4, "unexpected output: {out:?}");

    let pid = lines[0].strip_prefix("[1] ").unwrap();
    assert_eq!(lines[1], format!("Background job {} (sleep 1 &).", pid));
    assert_eq!(lines[2], format!("[1] ({}) Running sleep 1 &", pid));
}

#[test]
fn test_bg_usage_and_invalid_slot() {
    let output = run_shell("bg\nbg 0\nbg x\nfg\n");
    assert_eq!(
        stdout(&output),
        "Usage: bg <job_id>\nInvalid job ID.\nInvalid job ID.\nUsage: fg <job_id>\n"
    );
    assert!(stderr(&output).is_empty());
}

#[test]
fn test_finished_background_job_is_reported() {
    let output = run_shell("true &\nsleep 1\njobs\n");
    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2, "unexpected output: {out:?}");
    assert_eq!(lines[1], "[1] Done true &");
}

#[test]
fn test_long_line_is_truncated() {
    let line = format!("echo {}\n", "a".repeat(400));
    let output = run_shell(&line);
    assert_eq!(stdout(&output), format!("{} \n", "a".repeat(250)));
    assert!(stderr(&output).contains("truncated"));
}

#[test]
fn test_too_many_arguments_warns() {
    let words: Vec<String> = (0..70).map(|i| (i % 10).to_string()).collect();
    let output = run_shell(&format!("echo {}\n", words.join(" ")));
    // echo plus 62 words fit in the argument vector.
    assert_eq!(stdout(&output).split_whitespace().count(), 62);
    assert!(stderr(&output).contains("too many arguments, 8 ignored"));
}

#[test]
fn test_invalid_utf8_line_does_not_end_shell() {
    let mut child = spawn_shell();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"echo caf\xe9\necho after\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert_eq!(stdout(&output), "caf\u{FFFD} \nafter \n");
}

#[test]
fn test_shell_survives_interrupt_and_stop() {
    let mut child = spawn_shell();
    let mut input = child.stdin.take().unwrap();
    thread::sleep(Duration::from_millis(300));

    let pid = Pid::from_raw(child.id() as i32);
    kill(pid, Signal::SIGINT).unwrap();
    kill(pid, Signal::SIGTSTP).unwrap();
    thread::sleep(Duration::from_millis(200));

    input.write_all(b"echo alive\n").unwrap();
    drop(input);
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert_eq!(stdout(&output), "\nalive \n");
}

#[test]
fn test_interrupt_reaches_job_brought_to_foreground() {
    let mut child = spawn_shell();
    let mut input = child.stdin.take().unwrap();
    let start = Instant::now();
    input.write_all(b"sleep 5 &\nfg 1\n").unwrap();
    thread::sleep(Duration::from_millis(500));

    kill(Pid::from_raw(child.id() as i32), Signal::SIGINT).unwrap();
    input.write_all(b"echo after\n").unwrap();
    drop(input);
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert!(start.elapsed() < Duration::from_secs(4));

    let out = stdout(&output);
    assert!(out.contains("(sleep 5 &) terminated."), "unexpected output: {out:?}");
    assert!(out.ends_with("after \n"), "unexpected output: {out:?}");
}
