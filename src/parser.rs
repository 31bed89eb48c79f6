use crate::error::{Error, Result};
use crate::types::*;

struct Parser<'a> {
	line: &'a str,
	i: usize,
}

impl<'a> Parser<'a> {
	fn proceed_while<F>(&mut self, f: F) where F: Fn(u8) -> bool {
		while let Some(c) = self.line.as_bytes().get(self.i) {
			if !f(*c) { break; }
			self.i += 1;
		}
	}

	fn is_whitespace(c: u8) -> bool {
		matches!(c, b' ' | b'\t' | b'\n' | b'\r')
	}

	fn is_letter(c: u8) -> bool {
		!Parser::is_whitespace(c)
	}

	fn skip_whitespaces(&mut self) {
		self.proceed_while(Parser::is_whitespace);
	}

	fn read_word(&mut self) -> &'a str {
		let orig = self.i;
		self.proceed_while(Parser::is_letter);
		&self.line[orig .. self.i]
	}

	fn parse_command(&mut self) -> Command {
		let mut words = vec![];
		loop {
			self.skip_whitespaces();
			let word = self.read_word();
			if word.is_empty() {
				break;
			}
			words.push(unquote(word).to_string());
		}
		Command { words }
	}
}

/// Strips one pair of enclosing double quotes. No escapes, no nesting.
/// A lone `"` opens and closes itself, leaving an empty word.
fn unquote(word: &str) -> &str {
	if word == "\"" {
		""
	} else if word.len() >= 2 && word.starts_with('"') && word.ends_with('"') {
		&word[1 .. word.len() - 1]
	} else {
		word
	}
}

fn empty_stage(index: usize, count: usize) -> Error {
	let msg = if count == 1 {
		"empty command"
	} else if index == 0 {
		"missing command before '|'"
	} else if index == count - 1 {
		"missing command after '|'"
	} else {
		"empty command between '|'"
	};
	Error::MalformedPipeline(msg.to_string())
}

/// Splits a line into its stages. A blank line gives `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Pipeline>> {
	let line = line.trim();
	if line.is_empty() {
		return Ok(None);
	}

	let mut stages: Vec<&str> = line.split('|').collect();
	let mut is_background = false;
	if let Some(last) = stages.last_mut() {
		let trimmed = last.trim_end();
		if let Some(rest) = trimmed.strip_suffix('&') {
			*last = rest;
			is_background = true;
		}
	}

	let count = stages.len();
	let mut commands = Vec::with_capacity(count);
	for (i, stage) in stages.into_iter().enumerate() {
		let mut parser = Parser { line: stage, i: 0 };
		let command = parser.parse_command();
		if command.words.is_empty() {
			return Err(empty_stage(i, count));
		}
		commands.push(command);
	}
	tracing::debug!(stages = commands.len(), is_background, "parsed pipeline");

	Ok(Some(Pipeline { commands, is_background }))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn words(p: &Pipeline, i: usize) -> Vec<&str> {
		p.commands[i].words.iter().map(|s| s.as_str()).collect()
	}

	#[test]
	fn single_command() {
		let p = parse("  ls   -l\t/tmp  ").unwrap().unwrap();
		assert_eq!(p.commands.len(), 1);
		assert_eq!(words(&p, 0), ["ls", "-l", "/tmp"]);
		assert!(!p.is_background);
	}

	#[test]
	fn pipeline_stages() {
		let p = parse("cat f | grep x | wc -l").unwrap().unwrap();
		assert_eq!(p.commands.len(), 3);
		assert_eq!(words(&p, 1), ["grep", "x"]);
		assert_eq!(words(&p, 2), ["wc", "-l"]);
	}

	#[test]
	fn background_marker() {
		let p = parse("sleep 1 &").unwrap().unwrap();
		assert!(p.is_background);
		assert_eq!(words(&p, 0), ["sleep", "1"]);

		let p = parse("yes | head -n1&").unwrap().unwrap();
		assert!(p.is_background);
		assert_eq!(words(&p, 1), ["head", "-n1"]);
	}

	#[test]
	fn quotes_are_stripped() {
		let p = parse("echo \"hello\" \"\" \"a").unwrap().unwrap();
		assert_eq!(words(&p, 0), ["echo", "hello", "", "\"a"]);

		let p = parse("echo \" x").unwrap().unwrap();
		assert_eq!(words(&p, 0), ["echo", "", "x"]);
	}

	#[test]
	fn redirection_tokens_are_kept() {
		let p = parse("sort < in >> out").unwrap().unwrap();
		assert_eq!(words(&p, 0), ["sort", "<", "in", ">>", "out"]);
	}

	#[test]
	fn blank_line() {
		assert_eq!(parse("   \t").unwrap(), None);
	}

	#[test]
	fn empty_stages_are_rejected() {
		for line in &["ls |", "| ls", "ls || wc", "ls |  | wc", "&", "ls | &"] {
			match parse(line) {
				Err(Error::MalformedPipeline(_)) => {},
				other => panic!("{:?} parsed as {:?}", line, other),
			}
		}
	}
}
