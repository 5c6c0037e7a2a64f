use once_cell::sync::Lazy;
use phf::{Map, phf_map};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// `${name}` is an engine-side variable reference and is never treated as a placeholder.
static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\$?)\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Invalid placeholder pattern")
});

static PLACEHOLDERS: Map<&'static str, Placeholder> = phf_map! {
    "READ" => Placeholder::Read,
    "WRITE" => Placeholder::Write,
    "LOG" => Placeholder::Log,
    "DUMP" => Placeholder::Dump,
    "ITERATION" => Placeholder::Iteration,
};

/// The fixed set of tokens a template may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Placeholder {
    /// State artifact the segment starts from.
    Read,
    /// State artifact the segment must produce.
    Write,
    /// Per-iteration thermodynamic log.
    Log,
    /// Per-iteration trajectory dump.
    Dump,
    /// Zero-based iteration index.
    Iteration,
}

impl Placeholder {
    pub const REQUIRED: [Placeholder; 2] = [Placeholder::Read, Placeholder::Write];

    pub fn token(self) -> &'static str {
        match self {
            Placeholder::Read => "READ",
            Placeholder::Write => "WRITE",
            Placeholder::Log => "LOG",
            Placeholder::Dump => "DUMP",
            Placeholder::Iteration => "ITERATION",
        }
    }

    pub fn from_token(name: &str) -> Option<Self> {
        PLACEHOLDERS.get(name).copied()
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.token())
    }
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to read template '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Template is missing required placeholder {0}")]
    MissingPlaceholder(Placeholder),
    #[error("Unknown placeholder '{{{token}}}' on line {line}")]
    UnknownPlaceholder { token: String, line: usize },
    #[error("Placeholder {0} appears in the template but no value was bound to it")]
    Unbound(Placeholder),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot(Placeholder),
}

/// A validated, immutable input skeleton.
///
/// Parsing splits the source into literal text and placeholder slots once; rendering only
/// concatenates, so the same template renders byte-identical output for identical bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parses and validates a template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::UnknownPlaceholder`] for any `{IDENT}` outside the recognized
    /// set and [`TemplateError::MissingPlaceholder`] when `{READ}` or `{WRITE}` is absent.
    pub fn parse(source: impl Into<String>) -> Result<Self, TemplateError> {
        let source = source.into();
        let mut segments = Vec::new();
        let mut cursor = 0;

        for caps in TOKEN_PATTERN.captures_iter(&source) {
            let Some(whole) = caps.get(0) else { continue };
            if !caps[1].is_empty() {
                continue;
            }
            let name = &caps[2];
            let placeholder =
                Placeholder::from_token(name).ok_or_else(|| TemplateError::UnknownPlaceholder {
                    token: name.to_string(),
                    line: line_of(&source, whole.start()),
                })?;

            if whole.start() > cursor {
                segments.push(Segment::Text(source[cursor..whole.start()].to_string()));
            }
            segments.push(Segment::Slot(placeholder));
            cursor = whole.end();
        }
        if cursor < source.len() {
            segments.push(Segment::Text(source[cursor..].to_string()));
        }

        let template = Self { source, segments };
        for required in Placeholder::REQUIRED {
            if !template.contains(required) {
                return Err(TemplateError::MissingPlaceholder(required));
            }
        }
        Ok(template)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(source)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn contains(&self, placeholder: Placeholder) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Slot(p) if *p == placeholder))
    }

    pub fn placeholders(&self) -> BTreeSet<Placeholder> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Slot(p) => Some(*p),
                Segment::Text(_) => None,
            })
            .collect()
    }

    /// Substitutes every slot with its bound value.
    ///
    /// Bindings for placeholders the template does not use are ignored.
    pub fn render(&self, bindings: &Bindings) -> Result<String, TemplateError> {
        let mut rendered = String::with_capacity(self.source.len() + 64);
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => rendered.push_str(text),
                Segment::Slot(p) => {
                    rendered.push_str(bindings.get(*p).ok_or(TemplateError::Unbound(*p))?)
                }
            }
        }
        Ok(rendered)
    }
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

/// Values substituted into a [`Template`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    values: BTreeMap<Placeholder, String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, placeholder: Placeholder, value: impl Into<String>) -> Self {
        self.values.insert(placeholder, value.into());
        self
    }

    pub fn bind_path(self, placeholder: Placeholder, path: &Path) -> Self {
        self.bind(placeholder, path.display().to_string())
    }

    pub fn get(&self, placeholder: Placeholder) -> Option<&str> {
        self.values.get(&placeholder).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEGMENT_TEMPLATE: &str = "\
units real
variable T equal 300.0
read_data {READ}
log {LOG}
velocity all create ${T} 4928459
run 10000
write_data {WRITE}
";

    fn bindings() -> Bindings {
        Bindings::new()
            .bind(Placeholder::Read, "state_000.data")
            .bind(Placeholder::Write, "state_001.data")
            .bind(Placeholder::Log, "log_000.lammps")
    }

    #[test]
    fn parse_collects_placeholders_and_skips_engine_variables() {
        let template = Template::parse(SEGMENT_TEMPLATE).unwrap();
        let found: Vec<_> = template.placeholders().into_iter().collect();
        assert_eq!(
            found,
            vec![Placeholder::Read, Placeholder::Write, Placeholder::Log]
        );
        assert_eq!(template.source(), SEGMENT_TEMPLATE);
    }

    #[test]
    fn render_substitutes_every_slot_and_keeps_literal_text() {
        let template = Template::parse(SEGMENT_TEMPLATE).unwrap();
        let rendered = template.render(&bindings()).unwrap();
        assert!(rendered.contains("read_data state_000.data\n"));
        assert!(rendered.contains("write_data state_001.data\n"));
        assert!(rendered.contains("log log_000.lammps\n"));
        assert!(rendered.contains("velocity all create ${T} 4928459"));
        assert!(!rendered.contains("{READ}"));
    }

    #[test]
    fn rendering_twice_with_same_bindings_is_byte_identical() {
        let template = Template::parse(SEGMENT_TEMPLATE).unwrap();
        let first = template.render(&bindings()).unwrap();
        let second = template.render(&bindings()).unwrap();
        assert_eq!(first, second);
        assert_eq!(template.source(), SEGMENT_TEMPLATE);
    }

    #[test]
    fn missing_write_placeholder_is_rejected() {
        let result = Template::parse("read_data {READ}\nrun 100\n");
        assert!(matches!(
            result,
            Err(TemplateError::MissingPlaceholder(Placeholder::Write))
        ));
    }

    #[test]
    fn unknown_placeholder_reports_its_line() {
        let result = Template::parse("read_data {READ}\nwrite_data {WRITE}\nfix 1 all {THERMOSTAT}\n");
        match result {
            Err(TemplateError::UnknownPlaceholder { token, line }) => {
                assert_eq!(token, "THERMOSTAT");
                assert_eq!(line, 3);
            }
            other => panic!("Expected UnknownPlaceholder, got {:?}", other),
        }
    }

    #[test]
    fn unbound_optional_placeholder_fails_render() {
        let template = Template::parse("read_data {READ}\ndump 1 all atom 500 {DUMP}\nwrite_data {WRITE}\n").unwrap();
        let result = template.render(&bindings());
        assert!(matches!(
            result,
            Err(TemplateError::Unbound(Placeholder::Dump))
        ));
    }

    #[test]
    fn load_reports_missing_file_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.in");
        match Template::load(&path) {
            Err(TemplateError::Io { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("Expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn placeholder_display_uses_brace_syntax() {
        assert_eq!(Placeholder::Read.to_string(), "{READ}");
        assert_eq!(Placeholder::from_token("ITERATION"), Some(Placeholder::Iteration));
        assert_eq!(Placeholder::from_token("read"), None);
    }
}
