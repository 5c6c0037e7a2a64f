//! Turns an ordinary LAMMPS input script into a placeholder template.
//!
//! Existing segment scripts name their data, log and dump files literally. The file argument
//! of `read_data`, `write_data`, `log` and (selected) `dump` commands is swapped for the
//! matching token; every other byte of the script is kept.

use super::placeholder::{Placeholder, Template, TemplateError};

// dump ID group-ID style N file [args]
const DUMP_FILE_ARG: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenizeSummary {
    pub read_data: usize,
    pub write_data: usize,
    pub log: usize,
    pub dump: usize,
}

/// Replaces file arguments of state-handling commands with placeholders.
///
/// Only `dump` commands whose file argument contains `dump_tag` are rewritten; with no tag
/// every `dump` is. Comment lines are left untouched.
///
/// # Errors
///
/// Fails with [`TemplateError::MissingPlaceholder`] when the script has no `read_data` or
/// no `write_data` command, since the result could not be chained.
pub fn tokenize_script(
    script: &str,
    dump_tag: Option<&str>,
) -> Result<(Template, TokenizeSummary), TemplateError> {
    let mut summary = TokenizeSummary::default();
    let mut output = String::with_capacity(script.len());

    for raw_line in script.split_inclusive('\n') {
        let (body, ending) = split_line_ending(raw_line);
        match rewrite_command(body, dump_tag, &mut summary) {
            Some(rewritten) => output.push_str(&rewritten),
            None => output.push_str(body),
        }
        output.push_str(ending);
    }

    let template = Template::parse(output)?;
    Ok((template, summary))
}

fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

fn rewrite_command(
    body: &str,
    dump_tag: Option<&str>,
    summary: &mut TokenizeSummary,
) -> Option<String> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('#') {
        return None;
    }
    let indent = &body[..body.len() - trimmed.len()];
    let words: Vec<&str> = trimmed.split_whitespace().collect();

    let (position, placeholder) = match words.first().copied()? {
        "read_data" if words.len() >= 2 => {
            summary.read_data += 1;
            (1, Placeholder::Read)
        }
        "write_data" if words.len() >= 2 => {
            summary.write_data += 1;
            (1, Placeholder::Write)
        }
        "log" if words.len() >= 2 => {
            summary.log += 1;
            (1, Placeholder::Log)
        }
        "dump" if words.len() > DUMP_FILE_ARG => {
            if let Some(tag) = dump_tag {
                if !words[DUMP_FILE_ARG].contains(tag) {
                    return None;
                }
            }
            summary.dump += 1;
            (DUMP_FILE_ARG, Placeholder::Dump)
        }
        _ => return None,
    };

    let token = placeholder.to_string();
    let rewritten: Vec<&str> = words
        .iter()
        .enumerate()
        .map(|(i, word)| if i == position { token.as_str() } else { *word })
        .collect();
    Some(format!("{}{}", indent, rewritten.join(" ")))
}
