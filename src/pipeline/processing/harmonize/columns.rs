use std::collections::{BTreeMap, HashSet};

use super::mappings::{CanonicalField, SchemaMapping};
use crate::pipeline::utils::StringUtils;

/// A source header bound to a canonical field.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMatch {
    pub index: usize,
    pub header: String,
    /// Edit distance to the matched variant, 0 for exact matches
    pub distance: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ColumnResolution {
    pub matches: BTreeMap<CanonicalField, ColumnMatch>,
    pub unmapped_headers: Vec<String>,
    pub missing_required: Vec<CanonicalField>,
    pub missing_optional: Vec<CanonicalField>,
}

impl ColumnResolution {
    pub fn index(&self, field: CanonicalField) -> Option<usize> {
        self.matches.get(&field).map(|m| m.index)
    }

    /// `canonical field -> source header`, as recorded in the quality report.
    pub fn applied_mapping(&self) -> BTreeMap<String, String> {
        self.matches
            .iter()
            .map(|(field, m)| (field.as_str().to_string(), m.header.clone()))
            .collect()
    }
}

/// Allowed edit distance for a fuzzy match against a variant of `len` characters.
pub fn fuzzy_budget(len: usize) -> usize {
    match len {
        0..=3 => 0,
        4..=7 => 1,
        _ => 2,
    }
}

/// Normalize headers to snake_case identifiers, suffixing repeats (`valor`, `valor_1`).
pub fn normalize_headers(headers: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let mut name = StringUtils::normalize_identifier(header);
            if name.is_empty() {
                name = format!("unnamed_column_{}", idx);
            }
            if seen.contains(&name) {
                let mut counter = 1;
                while seen.contains(&format!("{}_{}", name, counter)) {
                    counter += 1;
                }
                name = format!("{}_{}", name, counter);
            }
            seen.insert(name.clone());
            name
        })
        .collect()
}

/// Bind headers to the mapping's canonical fields: exact matches on normalized names
/// first, then Levenshtein matches within the length budget for whatever is left.
/// Each header binds at most once.
pub fn resolve_columns(headers: &[String], mapping: &SchemaMapping) -> ColumnResolution {
    let normalized = normalize_headers(headers);
    let mut taken = vec![false; headers.len()];
    let mut resolution = ColumnResolution::default();

    for spec in &mapping.columns {
        let exact = spec
            .variants
            .iter()
            .find_map(|variant| (0..normalized.len()).find(|&i| !taken[i] && normalized[i] == *variant));
        if let Some(index) = exact {
            taken[index] = true;
            resolution.matches.insert(
                spec.field,
                ColumnMatch {
                    index,
                    header: headers[index].clone(),
                    distance: 0,
                },
            );
        }
    }

    for spec in &mapping.columns {
        if resolution.matches.contains_key(&spec.field) {
            continue;
        }

        let mut best: Option<(usize, usize)> = None;
        for (index, name) in normalized.iter().enumerate() {
            if taken[index] {
                continue;
            }
            for variant in spec.variants {
                let budget = fuzzy_budget(variant.chars().count());
                if budget == 0 {
                    continue;
                }
                let distance = StringUtils::levenshtein_distance(name, variant);
                if distance <= budget && best.map_or(true, |(d, _)| distance < d) {
                    best = Some((distance, index));
                }
            }
        }

        match best {
            Some((distance, index)) => {
                taken[index] = true;
                resolution.matches.insert(
                    spec.field,
                    ColumnMatch {
                        index,
                        header: headers[index].clone(),
                        distance,
                    },
                );
            }
            None if spec.required => resolution.missing_required.push(spec.field),
            None => resolution.missing_optional.push(spec.field),
        }
    }

    resolution.unmapped_headers = headers
        .iter()
        .zip(taken.iter())
        .filter(|(_, taken)| !**taken)
        .map(|(header, _)| header.clone())
        .collect();

    resolution
}
