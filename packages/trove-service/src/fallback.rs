use trove_domain::{QueryIntent, terms};
use trove_storage::catalog::ProductFilter;

use crate::{cascade::Stage, retrieve::push_distinct};

pub(crate) const FALLBACK: &str = "fallback";

pub(crate) const KEYWORD_TEXT: &str = "keyword_text";
pub(crate) const CATEGORY_TERMS: &str = "category_terms";
pub(crate) const SAMPLE: &str = "sample";

/// The permissive cascade. Always ends in an unconditional sample.
pub(crate) fn fallback_stages(intent: &QueryIntent) -> Vec<Stage> {
	let mut stages = Vec::with_capacity(3);
	let keywords = &intent.filter_criteria.keywords;

	if !keywords.is_empty() {
		push_distinct(
			&mut stages,
			Stage::filtered(
				KEYWORD_TEXT,
				ProductFilter { text_keywords: keywords.clone(), ..Default::default() },
			),
		);
	}

	let category_terms = terms::category_terms(&intent.descriptive_phrases);

	if !category_terms.is_empty() {
		push_distinct(
			&mut stages,
			Stage::filtered(CATEGORY_TERMS, ProductFilter { category_terms, ..Default::default() }),
		);
	}

	stages.push(Stage::sample(SAMPLE));

	stages
}
