const CANDIDATES: &[u8] = &[b',', b';', b'\t', b'|'];
const SAMPLE_RECORDS: usize = 10;
const MAX_VARIANCE: f64 = 0.5;

/// Pick the field delimiter of a delimited text file.
///
/// Each candidate parses the header plus up to ten records (quote-aware). It is viable
/// when the header has more than one field and the variance of the field counts stays
/// within 0.5. Lowest variance wins; ties go to the candidate producing more header
/// fields. Returns `None` when nothing is viable.
pub fn detect_delimiter(text: &str) -> Option<u8> {
    let mut best: Option<(u8, f64, usize)> = None;

    for &delimiter in CANDIDATES {
        let counts = match field_counts(text, delimiter) {
            Some(counts) => counts,
            None => continue,
        };
        let header_fields = counts[0];
        if header_fields <= 1 {
            continue;
        }
        let var = variance(&counts);
        if var > MAX_VARIANCE {
            continue;
        }

        let better = match best {
            None => true,
            Some((_, best_var, best_fields)) => {
                var < best_var || (var == best_var && header_fields > best_fields)
            }
        };
        if better {
            best = Some((delimiter, var, header_fields));
        }
    }

    best.map(|(delimiter, _, _)| delimiter)
}

pub fn display_delimiter(delimiter: u8) -> &'static str {
    match delimiter {
        b',' => ",",
        b';' => ";",
        b'\t' => "\\t",
        b'|' => "|",
        _ => "?",
    }
}

fn field_counts(text: &str, delimiter: u8) -> Option<Vec<usize>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let counts: Vec<usize> = reader
        .records()
        .take(SAMPLE_RECORDS + 1)
        .map(|r| r.ok().map(|record| record.len()))
        .collect::<Option<Vec<_>>>()?;

    if counts.is_empty() {
        None
    } else {
        Some(counts)
    }
}

fn variance(counts: &[usize]) -> f64 {
    let n = counts.len() as f64;
    let mean = counts.iter().sum::<usize>() as f64 / n;
    counts.iter().map(|c| (*c as f64 - mean).powi(2)).sum::<f64>() / n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semicolon_files_with_decimal_commas() {
        let text = "municipio;setor;empregos\nJoinville;C;1.234,5\nBlumenau;G;987,0\n";
        assert_eq!(detect_delimiter(text), Some(b';'));
    }

    #[test]
    fn quoted_commas_do_not_confuse_detection() {
        let text = "region,sector,value\n\"Joinville, SC\",C,10\n\"Blumenau, SC\",G,20\n";
        assert_eq!(detect_delimiter(text), Some(b','));
    }

    #[test]
    fn tabs_and_pipes() {
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3\n"), Some(b'\t'));
        assert_eq!(detect_delimiter("a|b\n1|2\n"), Some(b'|'));
    }

    #[test]
    fn single_column_or_ragged_input_is_rejected() {
        assert_eq!(detect_delimiter("just one column\nvalue\n"), None);
        assert_eq!(detect_delimiter(""), None);
        assert_eq!(detect_delimiter("a,b\n1,2,3,4,5\n1\n1,2,3,4,5,6\n"), None);
    }
}
