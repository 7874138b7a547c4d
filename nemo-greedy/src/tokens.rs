//! Symbol table for transducer output tokens

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{DecodeError, Result};

/// Word-boundary marker used by SentencePiece vocabularies
const WORD_BOUNDARY: char = '\u{2581}';

/// Token vocabulary loaded from `tokens.txt`
pub struct SymbolTable {
    /// Token ID to symbol mapping
    symbols: Vec<String>,
    /// Symbol to token ID mapping
    symbol_to_id: HashMap<String, i32>,
}

impl SymbolTable {
    /// Load tokens from a tokens.txt file
    ///
    /// Format: "<symbol> <id>" per line, e.g. "<blk> 1024". A line holding only
    /// an id maps that id to a single space.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| {
            DecodeError::model_load(format!(
                "Failed to read tokens file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let table = Self::parse(&contents)?;
        info!(
            "Loaded {} tokens (blank_id={})",
            table.vocab_size(),
            table.blank_id()
        );
        Ok(table)
    }

    /// Parse tokens.txt contents
    pub fn parse(contents: &str) -> Result<Self> {
        let mut entries = Vec::new();

        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let (symbol, id) = match line.trim_end().rsplit_once(char::is_whitespace) {
                Some((symbol, id)) if !symbol.trim().is_empty() => (symbol.trim().to_string(), id),
                _ => (" ".to_string(), line.trim()),
            };

            let id: usize = id.parse().map_err(|_| {
                DecodeError::model_load(format!(
                    "Invalid token id '{}' on line {}",
                    id,
                    line_no + 1
                ))
            })?;
            entries.push((id, symbol));
        }

        if entries.is_empty() {
            return Err(DecodeError::model_load("Token file is empty"));
        }

        entries.sort_by_key(|(id, _)| *id);
        for (expected, (id, symbol)) in entries.iter().enumerate() {
            if *id != expected {
                return Err(DecodeError::model_load(format!(
                    "Token ids must be contiguous from 0: expected {}, found {} ('{}')",
                    expected, id, symbol
                )));
            }
        }

        let symbols: Vec<String> = entries.into_iter().map(|(_, symbol)| symbol).collect();
        let symbol_to_id = symbols
            .iter()
            .enumerate()
            .map(|(id, symbol)| (symbol.clone(), id as i32))
            .collect();

        Ok(Self {
            symbols,
            symbol_to_id,
        })
    }

    /// Vocabulary size, blank included
    pub fn vocab_size(&self) -> usize {
        self.symbols.len()
    }

    /// Blank is always the last id for NeMo transducers
    pub fn blank_id(&self) -> i32 {
        self.symbols.len() as i32 - 1
    }

    /// Get symbol by ID
    pub fn symbol(&self, id: i32) -> Option<&str> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.symbols.get(i))
            .map(|s| s.as_str())
    }

    /// Get ID for a symbol
    pub fn id(&self, symbol: &str) -> Option<i32> {
        self.symbol_to_id.get(symbol).copied()
    }

    /// Render decoded token IDs as text
    ///
    /// Blank is skipped; word-boundary markers become spaces.
    pub fn decode(&self, tokens: &[i32]) -> Result<String> {
        let blank_id = self.blank_id();
        let mut text = String::new();

        for &id in tokens {
            if id == blank_id {
                continue;
            }
            let symbol = self
                .symbol(id)
                .ok_or_else(|| DecodeError::invalid_input(format!("Invalid token ID: {}", id)))?;
            text.push_str(symbol);
        }

        Ok(text.replace(WORD_BOUNDARY, " ").trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKENS: &str = "<unk> 0\n\u{2581}he 1\nllo 2\n\u{2581}world 3\n 4\n<blk> 5\n";

    #[test]
    fn test_parse_basic() {
        let table = SymbolTable::parse(TOKENS).unwrap();
        assert_eq!(table.vocab_size(), 6);
        assert_eq!(table.blank_id(), 5);
        assert_eq!(table.symbol(5), Some("<blk>"));
        assert_eq!(table.symbol(4), Some(" "));
        assert_eq!(table.id("llo"), Some(2));
        assert_eq!(table.symbol(-1), None);
        assert_eq!(table.symbol(6), None);
    }

    #[test]
    fn test_decode_joins_word_pieces() {
        let table = SymbolTable::parse(TOKENS).unwrap();
        let text = table.decode(&[1, 2, 5, 3]).unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn test_decode_keeps_repeats() {
        // Transducers emit repeated tokens on purpose, unlike CTC
        let table = SymbolTable::parse(TOKENS).unwrap();
        assert_eq!(table.decode(&[1, 2, 2]).unwrap(), "hellollo");
    }

    #[test]
    fn test_decode_invalid_id() {
        let table = SymbolTable::parse(TOKENS).unwrap();
        assert!(table.decode(&[1, 42]).is_err());
    }

    #[test]
    fn test_unordered_ids() {
        let table = SymbolTable::parse("b 1\na 0\n<blk> 2\n").unwrap();
        assert_eq!(table.symbol(0), Some("a"));
        assert_eq!(table.blank_id(), 2);
    }

    #[test]
    fn test_gap_in_ids_rejected() {
        assert!(SymbolTable::parse("a 0\n<blk> 2\n").is_err());
        assert!(SymbolTable::parse("").is_err());
        assert!(SymbolTable::parse("a zero\n").is_err());
    }
}
