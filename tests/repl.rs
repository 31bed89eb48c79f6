use std::io::Write;
use std::process::{Command, Stdio};

fn session(input: &str) -> (String, String, Option<i32>) {
	let mut child = Command::new(env!("CARGO_BIN_EXE_miell"))
		.arg("--prompt")
		.arg("test> ")
		.stdin(Stdio::piped())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.spawn()
		.unwrap();
	child.stdin.take().unwrap().write_all(input.as_bytes()).unwrap();
	let output = child.wait_with_output().unwrap();
	(
		String::from_utf8(output.stdout).unwrap(),
		String::from_utf8(output.stderr).unwrap(),
		output.status.code(),
	)
}

#[test]
fn prompt_and_output() {
	let (out, _, code) = session("echo hello\nexit\n");
	assert_eq!(out, "test> hello\ntest> ");
	assert_eq!(code, Some(0));
}

#[test]
fn end_of_input_ends_session() {
	let (out, _, code) = session("false\n");
	assert_eq!(out, "test> test> ");
	assert_eq!(code, Some(1));
}

#[test]
fn writer_dies_quietly_when_reader_exits() {
	let (out, err, code) = session("yes | head -n 1\nseq 1 200000 | head -n 1\n");
	assert_eq!(out, "test> y\ntest> 1\ntest> ");
	assert_eq!(err, "");
	assert_eq!(code, Some(0));
}
