use std::os::unix::io::{AsRawFd, OwnedFd, RawFd};

use libc::{STDIN_FILENO, STDOUT_FILENO};
use nix::fcntl::OFlag;
use nix::unistd;

use crate::error::{Error, Result};
use crate::redirect::Redirections;

#[derive(Debug)]
pub struct Pipe {
	pub read: OwnedFd,
	pub write: OwnedFd,
}

/// The descriptors a stage's child dups onto its standard input and output.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct StageIo {
	pub stdin: RawFd,
	pub stdout: RawFd,
}

/// All the pipes connecting the stages of one pipeline. Pipe `i` joins
/// stage `i` to stage `i + 1`. Every end is closed when the plumbing is
/// dropped, so an aborted pipeline leaks nothing.
#[derive(Debug)]
pub struct Plumbing {
	pipes: Vec<Option<Pipe>>,
}

impl Plumbing {
	/// Allocates the `stages - 1` pipes up front.
	pub fn new(stages: usize) -> Result<Plumbing> {
		let count = stages.saturating_sub(1);
		let mut pipes = Vec::with_capacity(count);
		for _ in 0 .. count {
			let (read, write) = unistd::pipe2(OFlag::O_CLOEXEC).map_err(Error::resource("pipe"))?;
			tracing::trace!(read = read.as_raw_fd(), write = write.as_raw_fd(), "created pipe");
			pipes.push(Some(Pipe { read, write }));
		}
		Ok(Plumbing { pipes })
	}

	fn stages(&self) -> usize {
		self.pipes.len() + 1
	}

	fn read_end(&self, pipe: usize) -> Option<RawFd> {
		self.pipes[pipe].as_ref().map(|p| p.read.as_raw_fd())
	}

	fn write_end(&self, pipe: usize) -> Option<RawFd> {
		self.pipes[pipe].as_ref().map(|p| p.write.as_raw_fd())
	}

	/// Effective descriptors of stage `i`. An explicit redirection always
	/// wins over the adjacent pipe.
	pub fn stage_io(&self, i: usize, redirections: &Redirections) -> StageIo {
		assert!(i < self.stages());
		let piped_in = if i > 0 { self.read_end(i - 1) } else { None };
		let piped_out = if i + 1 < self.stages() { self.write_end(i) } else { None };
		StageIo {
			stdin: redirections.input_fd().or(piped_in).unwrap_or(STDIN_FILENO),
			stdout: redirections.output_fd().or(piped_out).unwrap_or(STDOUT_FILENO),
		}
	}

	/// Closes the pipe feeding stage `i`; call once stage `i` is launched,
	/// when both of its neighbours own their copies.
	pub fn release_before(&mut self, i: usize) {
		if i > 0 {
			if let Some(pipe) = self.pipes[i - 1].take() {
				tracing::trace!(pipe = i - 1, "closed pipe in parent");
				drop(pipe);
			}
		}
	}

	/// Closes every end still open without freeing anything. Used in a
	/// forked child, after the ends it needs have been dup'd.
	pub fn close_in_child(&self) {
		for pipe in self.pipes.iter().flatten() {
			let _ = unistd::close(pipe.read.as_raw_fd());
			let _ = unistd::close(pipe.write.as_raw_fd());
		}
	}
}
