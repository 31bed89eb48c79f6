use std::io;
use io::{BufRead, Write};

use clap::Parser;
use tracing::Level;

use miell::{eval_line, EvalResult, State};

#[derive(Debug, Parser)]
#[command(name = "miell", version, about = "A small pipeline shell")]
struct Options {
	/// Prompt printed before each line.
	#[arg(long, default_value = "miell> ")]
	prompt: String,

	/// Log more to standard error (-v info, -vv debug, -vvv trace).
	#[arg(short, long, action = clap::ArgAction::Count)]
	verbose: u8,
}

fn log_level(verbose: u8) -> Level {
	match verbose {
		0 => Level::WARN,
		1 => Level::INFO,
		2 => Level::DEBUG,
		_ => Level::TRACE,
	}
}

fn main() {
	let options = Options::parse();
	tracing_subscriber::fmt()
		.with_writer(io::stderr)
		.with_max_level(log_level(options.verbose))
		.init();

	let mut state = State::new();
	let mut stdout = io::stdout();
	let mut stderr = io::stderr();
	let stdin = io::stdin();
	let mut stdin_locked = stdin.lock();
	let mut last = 0;
	loop {
		let _ = stdout.write_all(options.prompt.as_bytes());
		let _ = stdout.flush();
		let mut line = String::new();
		match stdin_locked.read_line(&mut line) {
			Ok(0) => break,
			Ok(_) => {},
			Err(e) => {
				tracing::error!(error = %e, "reading input failed");
				break;
			},
		}
		if line.trim() == "exit" {
			break;
		}
		match eval_line(&mut state, &line, &mut stdout, &mut stderr) {
			EvalResult::Done(s) => last = s,
			EvalResult::Running { .. } => last = 0,
		}
	}
	for (id, job) in state.jobs().iter() {
		tracing::warn!(job = id, command = %job.command, "leaving background job running");
	}
	std::process::exit(last as i32);
}
