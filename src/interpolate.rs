use crate::vars::VariableSource;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum InterpolateError {
    #[error("malformed variable reference at byte {offset}")]
    #[diagnostic(
        code(synterp::interpolate::malformed_reference),
        help("A reference is the prefix, a name of [A-Za-z0-9_]+, then the closing token")
    )]
    MalformedReference { offset: usize },

    #[error("unknown variable '{name}'")]
    #[diagnostic(
        code(synterp::interpolate::unknown_variable),
        help("Define the variable in the environment or remove the reference")
    )]
    UnknownVariable { name: String },
}

/// Outcome of interpolating one file's content.
#[derive(Debug)]
pub struct InterpolationResult {
    pub content: Vec<u8>,
    pub replacement_count: usize,
}

/// Replaces variable references in a byte buffer with values resolved from a
/// [`VariableSource`].
///
/// A reference opens with the configured prefix, names a variable with ASCII
/// identifier characters, and closes with a token mirrored from the prefix:
/// `${` closes with `}`, `{{` closes with `}}`. A prefix without bracket
/// characters has no closing token; the name then ends at the first
/// non-identifier byte.
pub struct Interpolator<V: VariableSource> {
    vars: V,
    prefix: Vec<u8>,
    closing: Vec<u8>,
}

impl<V: VariableSource> Interpolator<V> {
    pub fn new(vars: V, prefix: &str) -> Self {
        Self {
            vars,
            prefix: prefix.as_bytes().to_vec(),
            closing: closing_token(prefix).into_bytes(),
        }
    }

    /// Scans `content` once left to right and substitutes every reference.
    ///
    /// An unknown variable or a malformed reference fails the whole buffer;
    /// the caller decides what that means (the sync walk demotes it to a
    /// verbatim copy of the file).
    pub fn interpolate(&self, content: &[u8]) -> Result<InterpolationResult, InterpolateError> {
        let mut out = Vec::with_capacity(content.len());
        let mut replacement_count = 0;
        let mut pos = 0;

        while pos < content.len() {
            if !content[pos..].starts_with(&self.prefix) {
                out.push(content[pos]);
                pos += 1;
                continue;
            }

            let reference_start = pos;
            let name_start = pos + self.prefix.len();

            let mut name_end = name_start;
            while name_end < content.len() && is_identifier_byte(content[name_end]) {
                name_end += 1;
            }

            if name_end == name_start || !content[name_end..].starts_with(&self.closing) {
                return Err(InterpolateError::MalformedReference {
                    offset: reference_start,
                });
            }

            // the name is identifier bytes only, so this is pure ASCII
            let name = String::from_utf8_lossy(&content[name_start..name_end]);

            let value =
                self.vars
                    .lookup(&name)
                    .ok_or_else(|| InterpolateError::UnknownVariable {
                        name: name.to_string(),
                    })?;

            out.extend_from_slice(value.as_bytes());
            replacement_count += 1;
            pos = name_end + self.closing.len();
        }

        Ok(InterpolationResult {
            content: out,
            replacement_count,
        })
    }
}

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Derives the closing token from a prefix: reversed, with each opening
/// bracket mapped to its closing counterpart and non-bracket characters
/// dropped.
fn closing_token(prefix: &str) -> String {
    prefix
        .chars()
        .rev()
        .filter_map(|c| match c {
            '{' => Some('}'),
            '(' => Some(')'),
            '[' => Some(']'),
            '<' => Some('>'),
            _ => None,
        })
        .collect()
}
