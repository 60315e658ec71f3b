//! Variant matrix synchronization.
//!
//! The combination list of a form is always the cartesian product of its
//! option values. Whenever the options change the list is rebuilt from scratch
//! and every row that already existed, matched by [`AttributeKey`], keeps the
//! economics the operator entered for it.
//!
//! Renames and removals must be applied to the previous rows with
//! [`rename_attribute`] / [`remove_attribute`] *before* the rebuild, otherwise
//! a renamed axis looks like a brand new one and every price resets.

use std::collections::{HashMap, HashSet};

use crate::domain::aggregates::variant::{Economics, ProductOption, VariantCombination};
use crate::domain::value_objects::{AttributeKey, Attributes};

/// Rebuild the combination list for `options`, carrying economics over from
/// `previous`.
///
/// - no options: a single row with empty attributes, reusing `previous[0]`;
/// - any option without values: an empty list (callers block save);
/// - otherwise one row per tuple of the product, first option outermost.
///
/// Rows of `previous` that no longer match any tuple are dropped. When
/// `previous` holds the same signature twice the first row wins.
pub fn synchronize(options: &[ProductOption], previous: &[VariantCombination]) -> Vec<VariantCombination> {
    if options.is_empty() {
        let economics = previous.first().map(|c| c.economics.clone()).unwrap_or_default();
        return vec![VariantCombination::new(Attributes::new(), economics)];
    }
    if options.iter().any(|o| o.values.is_empty()) {
        tracing::debug!("option without values, variant matrix is empty");
        return Vec::new();
    }

    let mut index: HashMap<AttributeKey, &Economics> = HashMap::with_capacity(previous.len());
    for combo in previous {
        index.entry(combo.key()).or_insert(&combo.economics);
    }

    let combinations: Vec<VariantCombination> = cartesian_product(options)
        .into_iter()
        .map(|attributes| {
            let economics = index
                .get(&AttributeKey::from_attributes(&attributes))
                .map(|e| (*e).clone())
                .unwrap_or_default();
            VariantCombination::new(attributes, economics)
        })
        .collect();

    tracing::debug!(options = options.len(), combinations = combinations.len(), "variant matrix synchronized");
    combinations
}

/// Every attribute tuple of `options`, first option in the outer loop.
/// Repeated values inside one option are only expanded once.
fn cartesian_product(options: &[ProductOption]) -> Vec<Attributes> {
    options.iter().fold(vec![Attributes::new()], |partials, option| {
        let mut seen = HashSet::new();
        let values: Vec<&String> = option.values.iter().filter(|v| seen.insert(v.as_str())).collect();
        partials
            .iter()
            .flat_map(|partial| {
                values.iter().map(move |value| {
                    let mut next = partial.clone();
                    next.insert(option.name.clone(), (*value).clone());
                    next
                })
            })
            .collect()
    })
}

/// Rename attribute `from` to `to` in every row, keeping its value.
pub fn rename_attribute(combinations: &mut [VariantCombination], from: &str, to: &str) {
    if from == to {
        return;
    }
    for combo in combinations.iter_mut() {
        if let Some(value) = combo.attributes.remove(from) {
            combo.attributes.insert(to.to_string(), value);
        }
    }
}

/// Apply every `old -> new` key rename of `renames` to one row in a single
/// step, so names swapped between options do not collide.
pub fn rekey(attributes: &Attributes, renames: &HashMap<&str, &str>) -> Attributes {
    attributes
        .iter()
        .map(|(k, v)| (renames.get(k.as_str()).map_or_else(|| k.clone(), |to| to.to_string()), v.clone()))
        .collect()
}

/// Drop attribute `name` from every row, then collapse rows that became
/// identical. The first row of each collapsed group keeps its economics.
pub fn remove_attribute(combinations: Vec<VariantCombination>, name: &str) -> Vec<VariantCombination> {
    let mut seen = HashSet::with_capacity(combinations.len());
    combinations
        .into_iter()
        .filter_map(|mut combo| {
            combo.attributes.remove(name);
            seen.insert(combo.key()).then_some(combo)
        })
        .collect()
}

/// The row whose attributes are exactly `selection`.
pub fn find_combination<'a>(combinations: &'a [VariantCombination], selection: &Attributes) -> Option<&'a VariantCombination> {
    let key = AttributeKey::from_attributes(selection);
    combinations.iter().find(|c| c.key() == key)
}
