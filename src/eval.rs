use std::ffi::CString;
use std::io::Write;
use std::os::unix::io::{AsRawFd, BorrowedFd};

use libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::errno::Errno;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::unistd::{self, ForkResult, Pid};

use crate::error::{Error, Result};
use crate::pipe::{Plumbing, StageIo};
use crate::redirect::{self, Redirections};
use crate::types::*;
use crate::{builtin, expand, global, job, parser};

const NAME: &str = "miell";

/// Everything a child needs to exec, built before forking so the child
/// never allocates.
struct Exec {
	argv: Vec<CString>,
	prefix: Vec<u8>,
}

impl Exec {
	fn new(words: &[String]) -> Result<Exec> {
		let argv = words.iter()
			.map(|w| CString::new(w.as_bytes()).map_err(|_| Error::InvalidArgument(w.clone())))
			.collect::<Result<Vec<CString>>>()?;
		if argv.is_empty() {
			return Err(Error::MalformedPipeline("missing command name".to_string()));
		}
		let prefix = format!("{}: {}: ", NAME, words[0]).into_bytes();
		Ok(Exec { argv, prefix })
	}

	fn exit(status: i32) -> ! {
		unsafe { libc::_exit(status) }
	}

	fn report(&self, e: Errno) {
		let stderr = unsafe { BorrowedFd::borrow_raw(STDERR_FILENO) };
		let reason = if e == Errno::ENOENT { "command not found" } else { e.desc() };
		let _ = unistd::write(stderr, &self.prefix);
		let _ = unistd::write(stderr, reason.as_bytes());
		let _ = unistd::write(stderr, b"\n");
	}

	/// Runs in the forked child: rewires stdio, closes every pipe and
	/// redirection descriptor, then execs.
	fn run(&self, io: StageIo, plumbing: &Plumbing, redirections: &Redirections) -> ! {
		if io.stdin != STDIN_FILENO {
			if let Err(e) = unistd::dup2(io.stdin, STDIN_FILENO) {
				self.report(e);
				Exec::exit(126);
			}
		}
		if io.stdout != STDOUT_FILENO {
			if let Err(e) = unistd::dup2(io.stdout, STDOUT_FILENO) {
				self.report(e);
				Exec::exit(126);
			}
		}
		plumbing.close_in_child();
		for file in redirections.input.iter().chain(redirections.output.iter()) {
			let _ = unistd::close(file.as_raw_fd());
		}
		// The Rust runtime ignores SIGPIPE and exec keeps ignored signals.
		let _ = unsafe { signal::signal(Signal::SIGPIPE, SigHandler::SigDfl) };

		let e = match unistd::execvp(&self.argv[0], &self.argv) {
			Ok(never) => match never {},
			Err(e) => e,
		};
		self.report(e);
		Exec::exit(if e == Errno::ENOENT { 127 } else { 126 })
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum EvalResult {
	Done(u8),
	Running { job_id: usize, pid: Pid },
}

fn report(err: &mut dyn Write, e: &Error) {
	let _ = writeln!(err, "{}: {}", NAME, e);
	let _ = err.flush();
}

/// Text a background job is listed under.
pub fn describe(pipeline: &Pipeline) -> String {
	pipeline.commands.iter()
		.map(|c| c.words.join(" "))
		.collect::<Vec<String>>()
		.join(" | ")
}

/// Rejects, before anything is forked, a later stage that has no command
/// name or a redirection operator without a file name.
fn check_commands(pipeline: &Pipeline) -> Result<()> {
	for command in &pipeline.commands {
		let (arguments, _) = redirect::split_redirects(command.words.clone())?;
		if arguments.is_empty() {
			return Err(Error::MalformedPipeline("missing command name".to_string()));
		}
	}
	Ok(())
}

/// Launches every stage. `Ok(Some(status))` means the line was a builtin
/// and nothing was forked. On error the stages already forked keep running
/// and stay recorded in `job_builder`.
fn spawn_commands(state: &mut global::State, pipeline: &Pipeline, out: &mut dyn Write,
                  job_builder: &mut job::JobBuilder) -> Result<Option<u8>> {
	let count = pipeline.commands.len();
	// A single stage fails on its own before forking, and may be a builtin.
	if count > 1 {
		check_commands(pipeline)?;
	}
	let mut plumbing = Plumbing::new(count)?;
	for (i, command) in pipeline.commands.iter().enumerate() {
		let words = expand::expand_words(command.words.clone());

		if count == 1 {
			if let Some(func) = words.first().and_then(|name| builtin::match_builtin(name)) {
				tracing::debug!(name = %words[0], "running builtin");
				return func(state, &words[1..], out).map(Some);
			}
		}

		let (words, redirections) = redirect::resolve(words)?;
		let io = plumbing.stage_io(i, &redirections);
		let exec = Exec::new(&words)?;
		tracing::debug!(stage = i, argv = ?words, stdin = io.stdin, stdout = io.stdout, "launching stage");

		let _ = out.flush();
		// The child only dups, closes, execs, writes and exits.
		match unsafe { job_builder.push_fork()? } {
			ForkResult::Parent { .. } => {
				plumbing.release_before(i);
			},
			ForkResult::Child => {
				exec.run(io, &plumbing, &redirections);
			},
		}
	}
	Ok(None)
}

/// Runs one parsed pipeline. Foreground pipelines are waited for; a
/// background one is added to the state's job set and reported on `out`.
pub fn eval(state: &mut global::State, pipeline: &Pipeline, out: &mut dyn Write, err: &mut dyn Write) -> EvalResult {
	assert!(!pipeline.commands.is_empty());

	let mut job_builder = job::JobBuilder::new(&describe(pipeline), pipeline.commands.len());
	let failed = match spawn_commands(state, pipeline, out, &mut job_builder) {
		Ok(Some(s)) => return EvalResult::Done(s),
		Ok(None) => None,
		Err(e) => {
			report(err, &e);
			Some(e.status())
		},
	};

	let mut job = job_builder.build();
	let pid = match job.pid() {
		Some(pid) => pid,
		None => return EvalResult::Done(failed.unwrap_or(1)),
	};

	if pipeline.is_background {
		let job_id = state.job_set.push(job);
		let _ = writeln!(out, "[{}] {}", job_id, pid);
		let _ = out.flush();
		tracing::info!(job_id, %pid, "started background job");
		return EvalResult::Running { job_id, pid };
	}

	match job.wait() {
		Ok(code) => {
			tracing::debug!(code, "pipeline finished");
			EvalResult::Done(failed.unwrap_or(code))
		},
		Err(e) => {
			report(err, &e);
			EvalResult::Done(e.status())
		},
	}
}

/// Reports background jobs that have finished since the last call.
pub fn report_finished_jobs(state: &mut global::State, out: &mut dyn Write) {
	for (id, job) in state.job_set.reap() {
		let code = job.code();
		let _ = if code == 0 {
			writeln!(out, "[{}]+ Done\t{}", id, job.command)
		} else {
			writeln!(out, "[{}]+ Exit {}\t{}", id, code, job.command)
		};
	}
	let _ = out.flush();
}

/// Runs one input line.
pub fn eval_line(state: &mut global::State, line: &str, out: &mut dyn Write, err: &mut dyn Write) -> EvalResult {
	report_finished_jobs(state, out);
	match parser::parse(line) {
		Ok(Some(pipeline)) => eval(state, &pipeline, out, err),
		Ok(None) => EvalResult::Done(0),
		Err(e) => {
			report(err, &e);
			EvalResult::Done(e.status())
		},
	}
}
