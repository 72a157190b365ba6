use crate::errors::{MutkitError, Result};

pub const STANDARD_AMINO_ACIDS: &str = "ACDEFGHIKLMNPQRSTVWY";

/// One-letter code used for anything outside the 20 standard residues
pub const UNKNOWN_RESIDUE: char = 'X';

const THREE_TO_ONE: [(&str, char); 20] = [
    ("ALA", 'A'),
    ("CYS", 'C'),
    ("ASP", 'D'),
    ("GLU", 'E'),
    ("PHE", 'F'),
    ("GLY", 'G'),
    ("HIS", 'H'),
    ("ILE", 'I'),
    ("LYS", 'K'),
    ("LEU", 'L'),
    ("MET", 'M'),
    ("ASN", 'N'),
    ("PRO", 'P'),
    ("GLN", 'Q'),
    ("ARG", 'R'),
    ("SER", 'S'),
    ("THR", 'T'),
    ("VAL", 'V'),
    ("TRP", 'W'),
    ("TYR", 'Y'),
];

/// Map a three-letter residue name (any case) to its one-letter code.
pub fn three_to_one(name: &str) -> Option<char> {
    let name = name.trim().to_ascii_uppercase();
    THREE_TO_ONE
        .iter()
        .find(|(three, _)| *three == name)
        .map(|(_, one)| *one)
}

/// Accepts either a one-letter or a three-letter code; everything unknown is 'X'.
pub fn one_letter_or_x(code: &str) -> char {
    let code = code.trim();
    match code.chars().count() {
        1 => code
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or(UNKNOWN_RESIDUE),
        3 => three_to_one(code).unwrap_or(UNKNOWN_RESIDUE),
        _ => UNKNOWN_RESIDUE,
    }
}

pub fn is_standard(code: char) -> bool {
    STANDARD_AMINO_ACIDS.contains(code.to_ascii_uppercase())
}

/// Uppercase a query motif and reject anything but standard amino acids.
pub fn validate_query(query: &str) -> Result<String> {
    let query = query.trim().to_ascii_uppercase();
    if query.is_empty() || !query.chars().all(|c| STANDARD_AMINO_ACIDS.contains(c)) {
        return Err(MutkitError::InvalidQuery(query));
    }
    Ok(query)
}
