use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	#[error("syntax error: {0}")]
	MalformedPipeline(String),

	#[error("{op}: {source}")]
	ResourceExhaustion {
		op: &'static str,
		#[source]
		source: nix::Error,
	},

	#[error("{}: {source}", .path.display())]
	Redirection {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("missing file name after '{0}'")]
	MissingRedirectTarget(&'static str),

	#[error("argument contains a nul byte: {0:?}")]
	InvalidArgument(String),

	#[error("{name}: {message}")]
	Builtin {
		name: &'static str,
		message: String,
	},
}

impl Error {
	pub fn resource(op: &'static str) -> impl FnOnce(nix::Error) -> Error {
		move |source| Error::ResourceExhaustion { op, source }
	}

	/// Status the engine reports for a line that failed with this error.
	pub fn status(&self) -> u8 {
		match *self {
			Error::MalformedPipeline(..) => 2,
			_ => 1,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn messages() {
		let e = Error::MissingRedirectTarget(">>");
		assert_eq!(e.to_string(), "missing file name after '>>'");
		let e = Error::Builtin { name: "cd", message: "expected argument".to_string() };
		assert_eq!(e.to_string(), "cd: expected argument");
		let e = Error::resource("pipe")(nix::Error::EMFILE);
		assert!(e.to_string().starts_with("pipe: "));
		assert_eq!(e.status(), 1);
		assert_eq!(Error::MalformedPipeline("x".to_string()).status(), 2);
	}
}
