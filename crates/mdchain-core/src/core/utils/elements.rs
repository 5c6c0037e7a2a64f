use phf::{Map, phf_map};

// Force-field atom types whose element symbol has two letters.
static TWO_LETTER_TYPE_PREFIXES: Map<&'static str, &'static str> = phf_map! {
    "cl" => "Cl",
    "br" => "Br",
    "na" => "Na",
    "mg" => "Mg",
    "fe" => "Fe",
};

// Atom-name prefixes that denote a two-letter element rather than carbon or boron.
static TWO_LETTER_NAME_PREFIXES: Map<&'static str, &'static str> = phf_map! {
    "CL" => "Cl",
    "BR" => "Br",
};

/// Guesses the element symbol from a GAFF-style atom type (`cc`, `ss`, `h4`, `cl`).
pub fn element_from_atom_type(atom_type: &str) -> Option<String> {
    let lower = atom_type.trim().to_ascii_lowercase();
    if let Some(symbol) = lower.get(..2).and_then(|p| TWO_LETTER_TYPE_PREFIXES.get(p)) {
        return Some((*symbol).to_string());
    }
    lower
        .chars()
        .next()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase().to_string())
}

/// Guesses the element symbol from a PDB atom name when the element column is blank.
///
/// Digits and punctuation are dropped; `CL`/`BR` prefixes map to the halogens and anything
/// else is taken as its first letter.
pub fn element_from_atom_name(name: &str) -> Option<String> {
    let letters: String = name
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if let Some(symbol) = letters.get(..2).and_then(|p| TWO_LETTER_NAME_PREFIXES.get(p)) {
        return Some((*symbol).to_string());
    }
    letters.chars().next().map(|c| c.to_string())
}

/// Normalizes an element column value to symbol case (`CL` → `Cl`).
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let mut chars = raw.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    let mut symbol = first.to_ascii_uppercase().to_string();
    symbol.extend(chars.map(|c| c.to_ascii_lowercase()));
    Some(symbol)
}
