use super::CdftError;
use super::output::{ConstraintStrength, TextEncoding};
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex, RegexBuilder};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

const FORCE_EVAL: &str = "&FORCE_EVAL";

static PROJECT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bPROJECT[ \t]+[^\r\n]*").expect("Invalid PROJECT pattern"));
static COORD_FILE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bCOORD_FILE_NAME[ \t]+[^\r\n]*").expect("Invalid COORD_FILE_NAME pattern")
});
static STRENGTH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bSTRENGTH[ \t]+[-+0-9.]+").expect("Invalid STRENGTH pattern"));
static INTEGER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[0-9]+\b").expect("Invalid integer pattern"));

/// The wavefunction restart file a diabatic state produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRestart {
    /// Label used in the coupling template to tell the two states apart (e.g. `GACA`).
    pub label: String,
    pub wfn_file: String,
}

/// Everything that varies between jobs rendered from the same template.
#[derive(Debug, Clone, Default)]
pub struct CdftInputParams<'a> {
    pub project: &'a str,
    pub coord_file: Option<&'a str>,
    /// Added to every `MM_INDEX` entry; negative for molecules before the base molecule.
    pub atom_offset: i64,
    pub restarts: &'a [StateRestart],
    /// Strengths for the second and third `&FORCE_EVAL` sections, in that order.
    pub strengths: Option<(&'a ConstraintStrength, &'a ConstraintStrength)>,
}

/// A job template together with the encoding it was read in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdftTemplate {
    text: String,
    encoding: TextEncoding,
}

impl CdftTemplate {
    /// Renders an input and encodes it the way the template file was encoded.
    pub fn render(&self, params: &CdftInputParams<'_>) -> Result<Vec<u8>, CdftError> {
        render_input(&self.text, params).map(|content| self.encoding.encode(&content))
    }
}

pub fn load_template(path: &Path) -> Result<CdftTemplate, CdftError> {
    let bytes = fs::read(path).map_err(|source| CdftError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (text, encoding) = TextEncoding::decode(bytes);
    if encoding != TextEncoding::Utf8 {
        warn!(path = %path.display(), "Template is not UTF-8; preserving its bytes verbatim.");
    }
    Ok(CdftTemplate { text, encoding })
}

/// Renders a job input from a template.
///
/// # Errors
///
/// Fails when the template lacks a keyword the parameters need to rewrite, when an
/// `MM_INDEX` entry would drop below 1, or when a coupling template does not have the
/// expected `&FORCE_EVAL` layout.
pub fn render_input(template: &str, params: &CdftInputParams<'_>) -> Result<String, CdftError> {
    if !PROJECT_PATTERN.is_match(template) {
        return Err(CdftError::MissingKeyword("PROJECT"));
    }
    let mut content = PROJECT_PATTERN
        .replace_all(template, NoExpand(&format!("PROJECT {}", params.project)))
        .into_owned();

    if let Some(coord_file) = params.coord_file {
        if COORD_FILE_PATTERN.is_match(&content) {
            content = COORD_FILE_PATTERN
                .replace_all(&content, NoExpand(&format!("COORD_FILE_NAME {}", coord_file)))
                .into_owned();
        } else {
            debug!(project = params.project, "Template has no COORD_FILE_NAME; keeping as is.");
        }
    }

    content = shift_mm_indices(&content, params.atom_offset)?;

    for restart in params.restarts {
        content = replace_wfn_restart(&content, restart)?;
    }

    if let Some((state_a, state_b)) = params.strengths {
        content = inject_strengths(&content, state_a, state_b)?;
    }

    Ok(content)
}

/// Shifts every integer on lines mentioning `MM_INDEX` by `offset`.
pub fn shift_mm_indices(content: &str, offset: i64) -> Result<String, CdftError> {
    if offset == 0 {
        return Ok(content.to_string());
    }

    let mut shifted = String::with_capacity(content.len() + 64);
    for (line_idx, line) in content.split_inclusive('\n').enumerate() {
        if !line.contains("MM_INDEX") {
            shifted.push_str(line);
            continue;
        }
        let mut cursor = 0;
        for found in INTEGER_PATTERN.find_iter(line) {
            let invalid = || CdftError::InvalidAtomIndex {
                line: line_idx + 1,
                index: found.as_str().parse().unwrap_or(u64::MAX),
                offset,
            };
            let index: i64 = found.as_str().parse().map_err(|_| invalid())?;
            let moved = index.checked_add(offset).filter(|&v| v >= 1).ok_or_else(invalid)?;
            shifted.push_str(&line[cursor..found.start()]);
            shifted.push_str(&moved.to_string());
            cursor = found.end();
        }
        shifted.push_str(&line[cursor..]);
    }
    Ok(shifted)
}

/// Points every `WFN_RESTART_FILE_NAME` line that mentions the state label at its file.
pub fn replace_wfn_restart(content: &str, restart: &StateRestart) -> Result<String, CdftError> {
    let pattern = RegexBuilder::new(&format!(
        r"\bWFN_RESTART_FILE_NAME[ \t]+[^\r\n]*{}[^\r\n]*",
        regex::escape(&restart.label)
    ))
    .case_insensitive(true)
    .build()?;

    if !pattern.is_match(content) {
        return Err(CdftError::MissingRestart {
            label: restart.label.clone(),
        });
    }
    Ok(pattern
        .replace_all(
            content,
            NoExpand(&format!("WFN_RESTART_FILE_NAME {}", restart.wfn_file)),
        )
        .into_owned())
}

/// Writes the state strengths into the second and third `&FORCE_EVAL` sections.
///
/// The first section is the mixed (coupling) force environment; the next two are the
/// diabatic states in label order.
pub fn inject_strengths(
    content: &str,
    state_a: &ConstraintStrength,
    state_b: &ConstraintStrength,
) -> Result<String, CdftError> {
    let mut parts: Vec<String> = content.split(FORCE_EVAL).map(str::to_string).collect();
    if parts.len() < 4 {
        return Err(CdftError::ForceEvalLayout {
            sections: parts.len() - 1,
        });
    }
    if parts.len() > 4 {
        warn!(
            sections = parts.len() - 1,
            "Coupling template has more than three &FORCE_EVAL sections; only the second and third receive strengths."
        );
    }

    for (part, strength) in parts[2..4].iter_mut().zip([state_a, state_b]) {
        if !STRENGTH_PATTERN.is_match(part) {
            return Err(CdftError::MissingKeyword("STRENGTH"));
        }
        *part = STRENGTH_PATTERN
            .replace_all(part, NoExpand(&format!("STRENGTH {}", strength.raw())))
            .into_owned();
    }
    Ok(parts.join(FORCE_EVAL))
}
