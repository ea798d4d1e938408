//! Nucleotide alphabet encoding

use crate::{Error, Result};

/// Number of symbols in the alphabet
pub const ALPHABET_SIZE: usize = 4;

/// Encode a nucleotide string (`ACGT`, case-insensitive) into symbol codes `0..4`
pub fn encode(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .enumerate()
        .map(|(index, character)| match character.to_ascii_uppercase() {
            'A' => Ok(0),
            'C' => Ok(1),
            'G' => Ok(2),
            'T' => Ok(3),
            _ => Err(Error::InvalidCharacter { index, character }),
        })
        .collect()
}

/// Decode symbol codes back into nucleotides
pub fn decode(symbols: &[u8]) -> Result<String> {
    symbols
        .iter()
        .enumerate()
        .map(|(index, &symbol)| match symbol {
            0 => Ok('A'),
            1 => Ok('C'),
            2 => Ok('G'),
            3 => Ok('T'),
            _ => Err(Error::InvalidSymbol { index, symbol }),
        })
        .collect()
}

/// Reject any symbol outside `0..4`
pub fn validate(symbols: &[u8]) -> Result<()> {
    validate_from(symbols, 0)
}

/// Like [`validate`] for a slice that starts at `offset` in a longer sequence;
/// errors report the index in that sequence
pub fn validate_from(symbols: &[u8], offset: usize) -> Result<()> {
    match symbols
        .iter()
        .position(|&s| s as usize >= ALPHABET_SIZE)
    {
        Some(index) => Err(Error::InvalidSymbol {
            index: index + offset,
            symbol: symbols[index],
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_mixed_case() {
        assert_eq!(encode("AcgT").unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_encode_rejects_unknown() {
        let err = encode("ACNT").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidCharacter {
                index: 2,
                character: 'N'
            }
        ));
    }

    #[test]
    fn test_decode_inverts_encode() {
        assert_eq!(decode(&encode("GATTACA").unwrap()).unwrap(), "GATTACA");
    }

    #[test]
    fn test_validate_reports_first_bad_symbol() {
        let err = validate(&[0, 3, 4, 7]).unwrap_err();
        assert!(matches!(err, Error::InvalidSymbol { index: 2, symbol: 4 }));

        let err = validate_from(&[1, 5], 10).unwrap_err();
        assert!(matches!(err, Error::InvalidSymbol { index: 11, symbol: 5 }));
    }
}
