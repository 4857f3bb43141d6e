/// String utilities shared by header matching, region normalization and period parsing
pub struct StringUtils;

impl StringUtils {
    /// Calculate string similarity using Levenshtein distance
    pub fn calculate_similarity(s1: &str, s2: &str) -> f64 {
        if s1 == s2 {
            return 1.0;
        }

        let len1 = s1.chars().count();
        let len2 = s2.chars().count();

        if len1 == 0 || len2 == 0 {
            return 0.0;
        }

        let max_len = len1.max(len2);
        let distance = Self::levenshtein_distance(s1, s2);

        1.0 - (distance as f64 / max_len as f64)
    }

    /// Calculate Levenshtein distance between two strings
    pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
        let chars1: Vec<char> = s1.chars().collect();
        let chars2: Vec<char> = s2.chars().collect();
        let len1 = chars1.len();
        let len2 = chars2.len();

        let mut matrix = vec![vec![0; len2 + 1]; len1 + 1];

        for (i, row) in matrix.iter_mut().enumerate() {
            row[0] = i;
        }
        for j in 0..=len2 {
            matrix[0][j] = j;
        }

        for i in 1..=len1 {
            for j in 1..=len2 {
                let cost = if chars1[i - 1] == chars2[j - 1] { 0 } else { 1 };
                matrix[i][j] = (matrix[i - 1][j] + 1)
                    .min(matrix[i][j - 1] + 1)
                    .min(matrix[i - 1][j - 1] + cost);
            }
        }

        matrix[len1][len2]
    }

    /// Replace Portuguese/Spanish accented letters with their plain ASCII base letter
    pub fn fold_accents(text: &str) -> String {
        text.chars()
            .map(|c| match c {
                'á' | 'à' | 'ã' | 'â' | 'ä' => 'a',
                'Á' | 'À' | 'Ã' | 'Â' | 'Ä' => 'A',
                'é' | 'è' | 'ê' | 'ë' => 'e',
                'É' | 'È' | 'Ê' | 'Ë' => 'E',
                'í' | 'ì' | 'î' | 'ï' => 'i',
                'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
                'ó' | 'ò' | 'õ' | 'ô' | 'ö' => 'o',
                'Ó' | 'Ò' | 'Õ' | 'Ô' | 'Ö' => 'O',
                'ú' | 'ù' | 'û' | 'ü' => 'u',
                'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
                'ç' => 'c',
                'Ç' => 'C',
                'ñ' => 'n',
                'Ñ' => 'N',
                other => other,
            })
            .collect()
    }

    /// Normalize a column header into a snake_case identifier:
    /// accents folded, lower-cased, runs of non-alphanumerics collapsed into `_`.
    pub fn normalize_identifier(raw: &str) -> String {
        let folded = Self::fold_accents(raw.trim().trim_start_matches('\u{feff}'));
        let mut out = String::with_capacity(folded.len());
        let mut pending_sep = false;

        for c in folded.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_sep && !out.is_empty() {
                    out.push('_');
                }
                pending_sep = false;
                out.push(c.to_ascii_lowercase());
            } else {
                pending_sep = true;
            }
        }

        out
    }

    /// Lower-cased, accent-folded, whitespace-collapsed key used for lookups
    pub fn lookup_key(raw: &str) -> String {
        Self::fold_accents(raw)
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Capitalize the first letter of each word, lower-case the rest
    pub fn title_case(raw: &str) -> String {
        raw.split_whitespace()
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }
}
