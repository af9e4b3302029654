use unicode_segmentation::UnicodeSegmentation;

/// Tokens at or below this many characters never act as search terms.
pub const MIN_TERM_CHARS: usize = 3;

const STOP_WORDS: &[&str] = &[
	"about", "above", "after", "again", "against", "also", "among", "around", "because", "been",
	"before", "being", "below", "best", "between", "both", "cheap", "could", "does", "doing",
	"down", "during", "each", "find", "from", "further", "good", "great", "have", "having", "here",
	"into", "just", "like", "looking", "more", "most", "much", "need", "nice", "only", "other",
	"over", "please", "recommend", "same", "should", "show", "some", "something", "such", "than",
	"that", "their", "them", "then", "there", "these", "they", "this", "those", "through", "under",
	"until", "very", "want", "what", "when", "where", "which", "while", "with", "would", "your",
];

/// Words of a raw query longer than [`MIN_TERM_CHARS`], split on whitespace and kept verbatim.
pub fn query_keywords(raw_query: &str) -> Vec<String> {
	raw_query
		.split_whitespace()
		.filter(|word| word.chars().count() > MIN_TERM_CHARS)
		.map(str::to_string)
		.collect()
}

/// Lowercased significant tokens across all phrases, first occurrence order.
pub fn category_terms<S>(phrases: &[S]) -> Vec<String>
where
	S: AsRef<str>,
{
	let mut out: Vec<String> = Vec::new();

	for phrase in phrases {
		for word in phrase.as_ref().unicode_words() {
			let token = word.to_lowercase();

			if token.chars().count() <= MIN_TERM_CHARS || is_stop_word(&token) {
				continue;
			}
			if !out.contains(&token) {
				out.push(token);
			}
		}
	}

	out
}

pub fn is_stop_word(token: &str) -> bool {
	STOP_WORDS.binary_search(&token).is_ok()
}
