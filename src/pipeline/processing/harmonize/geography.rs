use std::collections::HashMap;

use crate::pipeline::utils::StringUtils;

/// Known municipality spellings, keyed by lookup key (lower-case, accents folded).
const MUNICIPALITY_SPELLINGS: &[(&str, &str)] = &[
    ("joinville", "Joinville"),
    ("joinvile", "Joinville"),
    ("joinvilla", "Joinville"),
    ("florianopolis", "Florianópolis"),
    ("floripa", "Florianópolis"),
    ("blumenau", "Blumenau"),
    ("itajai", "Itajaí"),
    ("chapeco", "Chapecó"),
    ("criciuma", "Criciúma"),
    ("lages", "Lages"),
    ("sao jose", "São José"),
    ("balneario camboriu", "Balneário Camboriú"),
    ("palhoca", "Palhoça"),
];

/// IBGE municipality codes (7-digit, plus the 6-digit form without check digit).
const IBGE_CODES: &[(&str, &str)] = &[
    ("4209102", "Joinville"),
    ("4205407", "Florianópolis"),
    ("4202404", "Blumenau"),
    ("4216602", "São José"),
    ("4204608", "Criciúma"),
    ("4204202", "Chapecó"),
    ("4208203", "Itajaí"),
    ("4209300", "Lages"),
    ("4201406", "Balneário Camboriú"),
    ("4211900", "Palhoça"),
];

/// State and country references that appear as national/aggregate rows.
const STATE_SPELLINGS: &[(&str, &str)] = &[
    ("sc", "Santa Catarina"),
    ("santa catarina", "Santa Catarina"),
    ("pr", "Paraná"),
    ("parana", "Paraná"),
    ("rs", "Rio Grande do Sul"),
    ("rio grande do sul", "Rio Grande do Sul"),
    ("sp", "São Paulo"),
    ("sao paulo", "São Paulo"),
    ("br", "Brasil"),
    ("brasil", "Brasil"),
    ("brazil", "Brasil"),
];

/// Maps raw region cells onto canonical region names.
///
/// Lookup order: configured aliases, IBGE codes, known spellings, registered target
/// regions, then a title-cased fallback so unknown municipalities still compare consistently.
#[derive(Debug, Clone, Default)]
pub struct RegionNormalizer {
    aliases: HashMap<String, String>,
    registered: HashMap<String, String>,
}

impl RegionNormalizer {
    pub fn new(aliases: &HashMap<String, String>) -> Self {
        Self {
            aliases: aliases
                .iter()
                .map(|(alias, canonical)| (StringUtils::lookup_key(alias), canonical.trim().to_string()))
                .collect(),
            registered: HashMap::new(),
        }
    }

    /// Accept any accent or case variant of `canonical` as that exact name.
    pub fn register(&mut self, canonical: &str) {
        self.registered
            .insert(StringUtils::lookup_key(canonical), canonical.to_string());
    }

    /// Canonical region name, or `None` for an empty cell.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim().trim_matches('"').trim();
        if trimmed.is_empty() {
            return None;
        }

        let key = StringUtils::lookup_key(trimmed);
        if let Some(canonical) = self.aliases.get(&key) {
            return Some(canonical.clone());
        }

        if trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Some(Self::lookup_code(trimmed).unwrap_or(trimmed).to_string());
        }

        let known = MUNICIPALITY_SPELLINGS
            .iter()
            .chain(STATE_SPELLINGS.iter())
            .find(|(spelling, _)| *spelling == key)
            .map(|(_, canonical)| canonical.to_string())
            .or_else(|| self.registered.get(&key).cloned());

        Some(known.unwrap_or_else(|| StringUtils::title_case(trimmed)))
    }

    fn lookup_code(code: &str) -> Option<&'static str> {
        IBGE_CODES
            .iter()
            .find(|(ibge, _)| *ibge == code || (code.len() == 6 && ibge.starts_with(code)))
            .map(|(_, name)| *name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_spellings_and_codes_resolve() {
        let normalizer = RegionNormalizer::default();
        assert_eq!(normalizer.normalize("joinvile").as_deref(), Some("Joinville"));
        assert_eq!(normalizer.normalize(" JOINVILLE ").as_deref(), Some("Joinville"));
        assert_eq!(normalizer.normalize("4209102").as_deref(), Some("Joinville"));
        assert_eq!(normalizer.normalize("420910").as_deref(), Some("Joinville"));
        assert_eq!(normalizer.normalize("florianopolis").as_deref(), Some("Florianópolis"));
        assert_eq!(normalizer.normalize("SC").as_deref(), Some("Santa Catarina"));
    }

    #[test]
    fn unknown_names_are_title_cased_and_empty_is_none() {
        let normalizer = RegionNormalizer::default();
        assert_eq!(normalizer.normalize("são bento do sul").as_deref(), Some("São Bento Do Sul"));
        assert_eq!(normalizer.normalize("9999999").as_deref(), Some("9999999"));
        assert_eq!(normalizer.normalize("   "), None);
    }

    #[test]
    fn registered_regions_match_without_accents() {
        let mut normalizer = RegionNormalizer::default();
        assert_eq!(normalizer.normalize("SAO BENTO DO SUL").as_deref(), Some("Sao Bento Do Sul"));

        normalizer.register("São Bento do Sul");
        assert_eq!(normalizer.normalize("SAO BENTO DO SUL").as_deref(), Some("São Bento do Sul"));
        assert_eq!(normalizer.normalize("são bento do sul").as_deref(), Some("São Bento do Sul"));
        assert_eq!(normalizer.normalize("joinvile").as_deref(), Some("Joinville"));
    }

    #[test]
    fn configured_aliases_take_precedence() {
        let mut aliases = HashMap::new();
        aliases.insert("Jlle".to_string(), "Joinville".to_string());
        let normalizer = RegionNormalizer::new(&aliases);
        assert_eq!(normalizer.normalize("JLLE").as_deref(), Some("Joinville"));
    }
}
