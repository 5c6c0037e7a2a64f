use super::CdftError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// Footer CP2K prints only after a run terminates normally.
pub const COMPLETION_MARKER: &str = "PROGRAM ENDED AT";

static STRENGTH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Strength of constraint\s*:\s*([-+]?[0-9]*\.[0-9]+)")
        .expect("Invalid strength pattern")
});

/// A converged Becke constraint strength, kept verbatim for re-injection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintStrength {
    raw: String,
    value: f64,
}

impl ConstraintStrength {
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl fmt::Display for ConstraintStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// How a CP2K text file was decoded.
///
/// Files that are not valid UTF-8 (GB18030 comments are common in shared templates) are read
/// as Latin-1, one char per byte. Encoding with the same variant restores those bytes
/// exactly, so rendered inputs carry foreign-encoded comments through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Latin1,
}

impl TextEncoding {
    pub fn decode(bytes: Vec<u8>) -> (String, Self) {
        match String::from_utf8(bytes) {
            Ok(text) => (text, TextEncoding::Utf8),
            Err(e) => (
                e.into_bytes().into_iter().map(char::from).collect(),
                TextEncoding::Latin1,
            ),
        }
    }

    /// Chars above U+00FF can only come from inserted values and are written as UTF-8.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => text.as_bytes().to_vec(),
            TextEncoding::Latin1 => {
                let mut bytes = Vec::with_capacity(text.len());
                for c in text.chars() {
                    match u8::try_from(c) {
                        Ok(byte) => bytes.push(byte),
                        Err(_) => bytes.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes()),
                    }
                }
                bytes
            }
        }
    }
}

/// Decodes as UTF-8, falling back to Latin-1 so stray bytes never abort a scrape.
pub fn decode_text(bytes: Vec<u8>) -> String {
    TextEncoding::decode(bytes).0
}

pub fn read_text(path: &Path) -> Result<String, CdftError> {
    fs::read(path)
        .map(decode_text)
        .map_err(|source| CdftError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Returns the last constraint strength reported in a CP2K output.
pub fn extract_strength(content: &str) -> Option<ConstraintStrength> {
    STRENGTH_PATTERN
        .captures_iter(content)
        .filter_map(|caps| {
            let raw = caps.get(1)?.as_str();
            let value = raw.parse().ok()?;
            Some(ConstraintStrength {
                raw: raw.to_string(),
                value,
            })
        })
        .last()
}

pub fn is_finished(content: &str) -> bool {
    content.contains(COMPLETION_MARKER)
}

/// Whether `path` holds a completed CP2K output. A missing file is simply unfinished.
pub fn output_is_finished(path: &Path) -> Result<bool, CdftError> {
    match fs::read(path) {
        Ok(bytes) => Ok(is_finished(&decode_text(bytes))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(CdftError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
