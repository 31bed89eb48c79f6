use std::io::Write;

use crate::error::{Error, Result};
use crate::global;

pub type Builtin = fn(&mut global::State, &[String], &mut dyn Write) -> Result<u8>;

pub fn builtin_cd(state: &mut global::State, args: &[String], _: &mut dyn Write) -> Result<u8> {
	let path = args.first().ok_or_else(|| Error::Builtin {
		name: "cd",
		message: "expected argument".to_string(),
	})?;
	state.change_dir(path)?;
	Ok(0)
}

pub fn builtin_pwd(state: &mut global::State, _: &[String], out: &mut dyn Write) -> Result<u8> {
	writeln!(out, "{}", state.cwd().display())
		.and_then(|_| out.flush())
		.map_err(|e| Error::Builtin { name: "pwd", message: e.to_string() })?;
	Ok(0)
}

pub fn match_builtin(name: &str) -> Option<Builtin> {
	match name {
		"cd" => Some(builtin_cd),
		"pwd" => Some(builtin_pwd),
		_ => None,
	}
}
