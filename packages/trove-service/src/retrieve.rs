use std::collections::BTreeSet;

use trove_domain::FilterCriteria;
use trove_storage::catalog::ProductFilter;

use crate::cascade::Stage;

pub(crate) const PRIMARY: &str = "primary";

pub(crate) const FULL_QUERY: &str = "full_query";
pub(crate) const WITHOUT_TEXT: &str = "without_text";
pub(crate) const CATEGORY_ONLY: &str = "category_only";

/// Progressive relaxation of the structured query built from categories and filter criteria.
///
/// A stage is only planned while it still constrains the catalog and differs from the stage
/// before it, so an unconstrained intent plans no stages at all.
pub(crate) fn primary_stages(
	matched_categories: &BTreeSet<String>,
	criteria: &FilterCriteria,
) -> Vec<Stage> {
	let categories = matched_categories.iter().cloned().collect::<Vec<_>>();
	let full = ProductFilter {
		categories: categories.clone(),
		price_min: criteria.price_min,
		price_max: criteria.price_max,
		brands: criteria.brands(),
		text_keywords: criteria.keywords.clone(),
		..Default::default()
	};
	let mut stages = Vec::with_capacity(3);

	if full.is_unconstrained() {
		return stages;
	}

	push_distinct(&mut stages, Stage::filtered(FULL_QUERY, full.clone()));

	if full.has_text() {
		let without_text = ProductFilter { text_keywords: Vec::new(), ..full };

		if !without_text.is_unconstrained() {
			push_distinct(&mut stages, Stage::filtered(WITHOUT_TEXT, without_text));
		}
	}
	if !categories.is_empty() {
		push_distinct(
			&mut stages,
			Stage::filtered(CATEGORY_ONLY, ProductFilter { categories, ..Default::default() }),
		);
	}

	stages
}

pub(crate) fn push_distinct(stages: &mut Vec<Stage>, stage: Stage) {
	if stages.last().is_some_and(|last| last.query == stage.query) {
		return;
	}

	stages.push(stage);
}

#[cfg(test)]
mod tests {
	use trove_domain::BrandFilter;

	use super::*;
	use crate::cascade::StageQuery;

	fn names(stages: &[Stage]) -> Vec<&'static str> {
		stages.iter().map(|stage| stage.name).collect()
	}

	fn categories(names: &[&str]) -> BTreeSet<String> {
		names.iter().map(|name| name.to_string()).collect()
	}

	#[test]
	fn plans_all_three_stages_when_every_constraint_is_present() {
		let criteria = FilterCriteria {
			price_max: Some(100.0),
			brand: Some(BrandFilter::One("Stride".to_string())),
			keywords: vec!["trail".to_string()],
			..Default::default()
		};
		let stages = primary_stages(&categories(&["mens-shoes"]), &criteria);

		assert_eq!(names(&stages), vec![FULL_QUERY, WITHOUT_TEXT, CATEGORY_ONLY]);

		let StageQuery::Filtered(without_text) = &stages[1].query else {
			panic!("Expected a filtered stage.");
		};

		assert!(without_text.text_keywords.is_empty());
		assert_eq!(without_text.brands, vec!["Stride"]);
	}

	#[test]
	fn unconstrained_intent_plans_nothing() {
		assert!(primary_stages(&BTreeSet::new(), &FilterCriteria::default()).is_empty());
	}

	#[test]
	fn text_only_intent_cannot_relax_further() {
		let criteria = FilterCriteria { keywords: vec!["xyzxyz".to_string()], ..Default::default() };

		assert_eq!(names(&primary_stages(&BTreeSet::new(), &criteria)), vec![FULL_QUERY]);
	}

	#[test]
	fn identical_relaxations_are_not_repeated() {
		let stages = primary_stages(&categories(&["laptops"]), &FilterCriteria::default());

		assert_eq!(names(&stages), vec![FULL_QUERY]);
	}
}
