use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};

use crate::error::{Error, Result};
use crate::types::*;

const CREATE_MODE: u32 = 0o644;

/// Files that replace a stage's standard input and output.
#[derive(Debug, Default)]
pub struct Redirections {
	pub input: Option<File>,
	pub output: Option<File>,
}

impl Redirections {
	pub fn input_fd(&self) -> Option<RawFd> {
		self.input.as_ref().map(|f| f.as_raw_fd())
	}

	pub fn output_fd(&self) -> Option<RawFd> {
		self.output.as_ref().map(|f| f.as_raw_fd())
	}
}

/// Removes every operator and its file name from `words`, returning the
/// remaining arguments and the redirects in the order they appeared.
pub fn split_redirects(words: Vec<String>) -> Result<(Vec<String>, Vec<Redirect>)> {
	let mut arguments = Vec::with_capacity(words.len());
	let mut redirects = vec![];
	let mut iter = words.into_iter();
	while let Some(word) = iter.next() {
		let typ = match RedirectType::from_operator(&word) {
			Some(typ) => typ,
			None => {
				arguments.push(word);
				continue;
			},
		};
		let target = match iter.next() {
			Some(t) if RedirectType::from_operator(&t).is_none() => t,
			_ => return Err(Error::MissingRedirectTarget(typ.operator())),
		};
		redirects.push(Redirect { typ, target });
	}
	Ok((arguments, redirects))
}

fn open(redirect: &Redirect) -> Result<File> {
	let mut oopt = OpenOptions::new();
	match redirect.typ {
		RedirectType::Input => oopt.read(true),
		RedirectType::Output => oopt.write(true).create(true).truncate(true).mode(CREATE_MODE),
		RedirectType::Append => oopt.append(true).create(true).mode(CREATE_MODE),
	};
	oopt.open(&redirect.target).map_err(|source| Error::Redirection {
		path: redirect.target.clone().into(),
		source,
	})
}

/// Opens the redirects in order; a later one of the same direction
/// replaces an earlier one.
pub fn open_redirects(redirects: &[Redirect]) -> Result<Redirections> {
	let mut resolved = Redirections::default();
	for redirect in redirects {
		let file = open(redirect)?;
		tracing::debug!(op = redirect.typ.operator(), target = %redirect.target, fd = file.as_raw_fd(), "opened redirect");
		match redirect.typ {
			RedirectType::Input => resolved.input = Some(file),
			RedirectType::Output | RedirectType::Append => resolved.output = Some(file),
		}
	}
	Ok(resolved)
}

pub fn resolve(words: Vec<String>) -> Result<(Vec<String>, Redirections)> {
	let (arguments, redirects) = split_redirects(words)?;
	let resolved = open_redirects(&redirects)?;
	Ok((arguments, resolved))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use std::io::{Read, Write};
	use std::os::unix::fs::PermissionsExt;

	fn strings(v: &[&str]) -> Vec<String> {
		v.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn operators_are_removed() {
		let (args, redirects) = split_redirects(strings(&["sort", "<", "in", "-r", ">>", "out"])).unwrap();
		assert_eq!(args, strings(&["sort", "-r"]));
		assert_eq!(redirects, vec![
			Redirect { typ: RedirectType::Input, target: "in".to_string() },
			Redirect { typ: RedirectType::Append, target: "out".to_string() },
		]);
	}

	#[test]
	fn missing_target() {
		match split_redirects(strings(&["cat", ">"])) {
			Err(Error::MissingRedirectTarget(">")) => {},
			other => panic!("{:?}", other),
		}
		match split_redirects(strings(&["cat", "<", ">", "x"])) {
			Err(Error::MissingRedirectTarget("<")) => {},
			other => panic!("{:?}", other),
		}
	}

	#[test]
	fn truncate_and_append() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("f");
		let target = path.display().to_string();
		fs::write(&path, "old contents").unwrap();

		let r = open_redirects(&[Redirect { typ: RedirectType::Output, target: target.clone() }]).unwrap();
		r.output.unwrap().write_all(b"a").unwrap();
		assert_eq!(fs::read_to_string(&path).unwrap(), "a");

		let r = open_redirects(&[Redirect { typ: RedirectType::Append, target: target.clone() }]).unwrap();
		r.output.unwrap().write_all(b"b").unwrap();
		assert_eq!(fs::read_to_string(&path).unwrap(), "ab");
	}

	#[test]
	fn created_with_mode_0644() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("new");
		let (_, r) = resolve(strings(&["true", ">", &path.display().to_string()])).unwrap();
		assert!(r.output.is_some());
		let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
		// The process umask can only clear bits.
		assert_eq!(mode & !0o644, 0);
	}

	#[test]
	fn last_redirect_wins() {
		let dir = tempfile::tempdir().unwrap();
		let first = dir.path().join("first");
		let second = dir.path().join("second");
		fs::write(&first, "1").unwrap();
		fs::write(&second, "2").unwrap();
		let (args, r) = resolve(strings(&[
			"cat",
			"<", &first.display().to_string(),
			"<", &second.display().to_string(),
		])).unwrap();
		assert_eq!(args, strings(&["cat"]));
		let mut s = String::new();
		r.input.unwrap().read_to_string(&mut s).unwrap();
		assert_eq!(s, "2");
	}

	#[test]
	fn missing_input_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("absent");
		match resolve(strings(&["cat", "<", &path.display().to_string()])) {
			Err(Error::Redirection { path: p, .. }) => assert_eq!(p, path),
			other => panic!("{:?}", other),
		}
	}
}
