use crate::core::models::sequence::{ChainKind, SequenceMap};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FastaError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Chain '{chain}' appears more than once")]
    Duplicate { chain: char },
}

fn chain_from_header(header: &str) -> Option<ChainKind> {
    let token = header.split_whitespace().next()?;
    match token.to_ascii_lowercase().as_str() {
        "h" | "heavy" => Some(ChainKind::Heavy),
        "l" | "light" => Some(ChainKind::Light),
        _ => None,
    }
}

/// Reads heavy and light chain sequences from FASTA text.
///
/// A record belongs to a chain when the first token of its header is `H`/`heavy` or
/// `L`/`light` (case-insensitive). Other records are skipped. Whether both chains are
/// present is checked later, by [`crate::core::models::sequence::ChainSequences::from_map`].
pub fn read_chain_sequences(reader: impl BufRead) -> Result<SequenceMap, FastaError> {
    let mut sequences = SequenceMap::new();
    let mut current: Option<char> = None;
    let mut seen_header = false;

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') {
            continue;
        }

        if let Some(header) = trimmed.strip_prefix('>') {
            seen_header = true;
            current = match chain_from_header(header) {
                Some(chain) => {
                    let id = chain.id();
                    if sequences.contains_key(&id) {
                        return Err(FastaError::Duplicate { chain: id });
                    }
                    sequences.insert(id, String::new());
                    Some(id)
                }
                None => {
                    debug!(header = header.trim(), "Skipping non-antibody FASTA record.");
                    None
                }
            };
            continue;
        }

        match current {
            Some(id) => {
                if let Some(sequence) = sequences.get_mut(&id) {
                    sequence.push_str(trimmed);
                }
            }
            None if !seen_header => {
                return Err(FastaError::Parse {
                    line: line_num + 1,
                    message: "sequence data before the first header".to_string(),
                });
            }
            None => {}
        }
    }

    Ok(sequences)
}

pub fn read_chain_sequences_from_path(path: &Path) -> Result<SequenceMap, FastaError> {
    let file = File::open(path)?;
    read_chain_sequences(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(text: &str) -> Result<SequenceMap, FastaError> {
        read_chain_sequences(Cursor::new(text))
    }

    #[test]
    fn reads_heavy_and_light_records() {
        let map = parse(">H\nEVQLVESGG\n>L\nDIQMTQSPS\n").unwrap();
        assert_eq!(map.get(&'H').map(String::as_str), Some("EVQLVESGG"));
        assert_eq!(map.get(&'L').map(String::as_str), Some("DIQMTQSPS"));
    }

    #[test]
    fn joins_multi_line_sequences() {
        let map = parse(">H heavy chain of 1abc\nEVQL\nVESGG\n\n>L\nDIQM\nTQ\n").unwrap();
        assert_eq!(map[&'H'], "EVQLVESGG");
        assert_eq!(map[&'L'], "DIQMTQ");
    }

    #[test]
    fn accepts_long_chain_names_case_insensitively() {
        let map = parse(">Heavy\nEVQL\n>LIGHT\nDIQM\n").unwrap();
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn ignores_unrelated_records() {
        let map = parse(">antigen\nMKTAYIAK\n>H\nEVQL\n>L\nDIQM\n").unwrap();
        assert_eq!(map.len(), 2);
        assert!(!map.values().any(|s| s.contains("MKTA")));
    }

    #[test]
    fn rejects_duplicate_chains() {
        let result = parse(">H\nEVQL\n>H\nQVQL\n");
        assert!(matches!(result, Err(FastaError::Duplicate { chain: 'H' })));
    }

    #[test]
    fn rejects_sequence_before_any_header() {
        let result = parse("EVQL\n>H\nEVQL\n");
        assert!(matches!(result, Err(FastaError::Parse { line: 1, .. })));
    }

    #[test]
    fn reads_from_a_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, ">H\nEVQL\n>L\nDIQM").unwrap();
        let map = read_chain_sequences_from_path(file.path()).unwrap();
        assert_eq!(map[&'L'], "DIQM");
    }
}
