use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::job;

/// Engine process state. The working directory is process-wide; this
/// handle is the only thing that changes it, and every child forked
/// afterwards inherits a copy.
#[derive(Debug)]
pub struct State {
	pub job_set: job::JobSet,
	cwd: PathBuf,
}

impl State {
	pub fn new() -> State {
		let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
		State { job_set: job::JobSet::new(), cwd }
	}

	pub fn cwd(&self) -> &Path {
		&self.cwd
	}

	pub fn jobs(&self) -> &job::JobSet {
		&self.job_set
	}

	pub fn change_dir(&mut self, path: &str) -> Result<()> {
		env::set_current_dir(path).map_err(|e| Error::Builtin { name: "cd", message: format!("{}: {}", path, e) })?;
		self.cwd = env::current_dir().map_err(|e| Error::Builtin { name: "cd", message: e.to_string() })?;
		tracing::debug!(cwd = %self.cwd.display(), "changed directory");
		Ok(())
	}
}

impl Default for State {
	fn default() -> State {
		State::new()
	}
}
