use nix::errno::Errno;
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};

use crate::error::{Error, Result};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum State { Active, Terminated }

pub trait WaitStatusExt {
	fn state(self) -> State;
	fn code(self) -> u8;
}

impl WaitStatusExt for WaitStatus {
	fn state(self) -> State {
		match self {
			WaitStatus::Exited(..) | WaitStatus::Signaled(..) => State::Terminated,
			_ => State::Active,
		}
	}

	fn code(self) -> u8 {
		match self {
			WaitStatus::Exited(_, code) => code as u8,
			WaitStatus::Signaled(_, sig, _) => 128u8.wrapping_add(sig as i32 as u8),
			_ => 0,
		}
	}
}

/// Reported for a child whose status was collected by someone else.
pub const LOST_STATUS: i32 = 255;

fn waitpid_retrying(pid: Pid, flags: Option<WaitPidFlag>) -> nix::Result<WaitStatus> {
	loop {
		match wait::waitpid(pid, flags) {
			Err(Errno::EINTR) => continue,
			Err(Errno::ECHILD) => {
				tracing::warn!(%pid, "process was reaped elsewhere, its status is lost");
				return Ok(WaitStatus::Exited(pid, LOST_STATUS));
			},
			r => return r,
		}
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Process {
	pub pid: Pid,
	pub status: WaitStatus,
}

impl Process {
	fn update(&mut self, flags: Option<WaitPidFlag>) -> nix::Result<()> {
		if self.status.state() == State::Terminated {
			return Ok(());
		}
		let status = waitpid_retrying(self.pid, flags)?;
		if status != WaitStatus::StillAlive {
			tracing::debug!(pid = %self.pid, ?status, "reaped process");
			self.status = status;
		}
		Ok(())
	}
}

/// The processes spawned for one pipeline, in stage order.
#[derive(Debug)]
pub struct Job {
	pub command: String,
	pub processes: Vec<Process>,
}

impl Job {
	pub fn state(&self) -> State {
		self.processes.iter().map(|pr| pr.status.state()).min().unwrap_or(State::Terminated)
	}

	/// The process reported for the job: its last stage.
	pub fn pid(&self) -> Option<Pid> {
		self.processes.last().map(|pr| pr.pid)
	}

	/// Status of the last stage; the others are only reaped.
	pub fn code(&self) -> u8 {
		self.processes.last().map_or(0, |pr| pr.status.code())
	}

	/// Blocks until every process of the job has terminated.
	pub fn wait(&mut self) -> Result<u8> {
		for pr in &mut self.processes {
			pr.update(None).map_err(Error::resource("waitpid"))?;
		}
		Ok(self.code())
	}

	/// Collects whatever has terminated without blocking.
	pub fn poll(&mut self) -> Result<State> {
		for pr in &mut self.processes {
			pr.update(Some(WaitPidFlag::WNOHANG)).map_err(Error::resource("waitpid"))?;
		}
		Ok(self.state())
	}
}

#[derive(Debug)]
pub struct JobBuilder {
	imp: Job,
}

impl JobBuilder {
	pub fn new(command: &str, size_hint: usize) -> JobBuilder {
		JobBuilder {
			imp: Job { command: command.to_string(), processes: Vec::with_capacity(size_hint) }
		}
	}

	/// Forks, recording the child in the parent.
	///
	/// # Safety
	///
	/// The caller must make the child call only async-signal-safe functions
	/// before it execs or exits, since the engine may be multithreaded
	/// (the test harness is).
	pub unsafe fn push_fork(&mut self) -> Result<ForkResult> {
		let r = unistd::fork().map_err(Error::resource("fork"))?;
		if let ForkResult::Parent { child } = r {
			tracing::debug!(pid = %child, "forked");
			self.imp.processes.push(Process { pid: child, status: WaitStatus::StillAlive });
		}
		Ok(r)
	}

	pub fn build(self) -> Job {
		self.imp
	}
}

/// Background jobs, addressed by ids starting at 1. Freed ids are reused.
#[derive(Debug, Default)]
pub struct JobSet {
	jobs: Vec<Option<Job>>,
}

impl JobSet {
	pub fn new() -> JobSet {
		JobSet { jobs: vec![] }
	}

	pub fn push(&mut self, job: Job) -> usize {
		let idx = if let Some((i, space)) = self.jobs.iter_mut().enumerate().find(|(_, o)| o.is_none()) {
			*space = Some(job);
			i
		} else {
			self.jobs.push(Some(job));
			self.jobs.len() - 1
		};
		idx + 1
	}

	pub fn get(&self, id: usize) -> Option<&Job> {
		id.checked_sub(1).and_then(|i| self.jobs.get(i)).and_then(|o| o.as_ref())
	}

	pub fn len(&self) -> usize {
		self.jobs.iter().filter(|o| o.is_some()).count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn iter(&self) -> impl Iterator<Item = (usize, &Job)> {
		self.jobs.iter().enumerate().filter_map(|(i, o)| o.as_ref().map(|job| (i + 1, job)))
	}

	/// Removes and returns the jobs whose processes have all terminated.
	pub fn reap(&mut self) -> Vec<(usize, Job)> {
		let mut done = vec![];
		for (i, slot) in self.jobs.iter_mut().enumerate() {
			let finished = match slot {
				Some(job) => match job.poll() {
					Ok(state) => state == State::Terminated,
					Err(e) => {
						tracing::warn!(job = i + 1, error = %e, "polling background job failed");
						false
					},
				},
				None => false,
			};
			if finished {
				if let Some(job) = slot.take() {
					done.push((i + 1, job));
				}
			}
		}
		let len = self.jobs.iter().rposition(|o| o.is_some()).map_or(0, |i| i + 1);
		self.jobs.truncate(len);
		done
	}
}
