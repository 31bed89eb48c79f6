use glob::MatchOptions;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
	case_sensitive: true,
	require_literal_separator: true,
	require_literal_leading_dot: true,
};

pub fn is_pattern(word: &str) -> bool {
	word.contains(&['*', '?'][..])
}

/// Expands one word. A pattern that matches nothing, or does not parse,
/// stays as the literal word.
fn expand_word(word: &str, expanded: &mut Vec<String>) {
	let paths = match glob::glob_with(word, MATCH_OPTIONS) {
		Ok(paths) => paths,
		Err(e) => {
			tracing::debug!(word, error = %e, "invalid pattern kept literally");
			expanded.push(word.to_string());
			return;
		},
	};
	let before = expanded.len();
	for path in paths.flatten() {
		expanded.push(path.to_string_lossy().into_owned());
	}
	if expanded.len() == before {
		expanded.push(word.to_string());
	}
	tracing::trace!(word, matches = expanded.len() - before, "expanded pattern");
}

pub fn expand_words(words: Vec<String>) -> Vec<String> {
	let mut expanded = Vec::with_capacity(words.len());
	for word in words {
		if is_pattern(&word) {
			expand_word(&word, &mut expanded);
		} else {
			expanded.push(word);
		}
	}
	expanded
}
