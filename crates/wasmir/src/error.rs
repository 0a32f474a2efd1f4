//! Diagnostics produced while reading and validating a module.
//!
//! Every error carries the byte offset into the binary where it was
//! detected. The reader decides whether to keep going after an error based
//! on its [`ErrorKind`] and the active read options.

use std::fmt;
use thiserror::Error;

/// Error classes, from always-fatal to downgradable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Structural damage: truncated input, bad framing, LEB128 overflow.
    Malformed,
    /// Semantic errors: type mismatches, bad indices, duplicates.
    Invalid,
    /// A configured ceiling (nesting depth, locals, params, results) was hit.
    ResourceLimit,
    /// Failure inside an optional custom section.
    CustomSection,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Malformed => "malformed",
            ErrorKind::Invalid => "invalid",
            ErrorKind::ResourceLimit => "resource limit",
            ErrorKind::CustomSection => "custom section",
        };
        f.write_str(name)
    }
}

/// A single diagnostic anchored at a byte offset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{offset:07x}: error: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub offset: usize,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, offset: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            offset,
            message: message.into(),
        }
    }

    pub fn malformed(offset: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Malformed, offset, message)
    }

    pub fn invalid(offset: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invalid, offset, message)
    }

    pub fn resource_limit(offset: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceLimit, offset, message)
    }

    /// Whether the walk must stop after this error.
    ///
    /// Malformed input always stops the walk. Semantic and resource errors
    /// stop it only under `stop_on_first_error`; custom section errors only
    /// under `fail_on_custom_section_error`.
    pub fn is_fatal(&self, stop_on_first_error: bool, fail_on_custom_section_error: bool) -> bool {
        match self.kind {
            ErrorKind::Malformed => true,
            ErrorKind::Invalid | ErrorKind::ResourceLimit => stop_on_first_error,
            ErrorKind::CustomSection => fail_on_custom_section_error,
        }
    }
}

/// An ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Errors {
    errors: Vec<Error>,
}

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: Error) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, other: Errors) {
        self.errors.extend(other.errors);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.errors.iter()
    }

    pub fn first(&self) -> Option<&Error> {
        self.errors.first()
    }

    /// Sorts by offset, keeping report order for errors at the same offset.
    pub fn sort(&mut self) {
        self.errors.sort_by_key(|e| e.offset);
    }

    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }

    pub fn into_vec(self) -> Vec<Error> {
        self.errors
    }

    /// Renders every error as `file:offset: error: message`, one per line.
    pub fn with_file<'a>(&'a self, file: &'a str) -> WithFile<'a> {
        WithFile { errors: self, file }
    }
}

impl From<Error> for Errors {
    fn from(error: Error) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl IntoIterator for Errors {
    type Item = Error;
    type IntoIter = std::vec::IntoIter<Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a Errors {
    type Item = &'a Error;
    type IntoIter = std::slice::Iter<'a, Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Errors {}

/// Display adapter prefixing each error with a file name.
pub struct WithFile<'a> {
    errors: &'a Errors,
    file: &'a str,
}

impl fmt::Display for WithFile<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in self.errors {
            writeln!(f, "{}:{error}", self.file)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_uses_hex_offset() {
        let error = Error::invalid(0x1a, "type mismatch");
        assert_eq!(error.to_string(), "000001a: error: type mismatch");
    }

    #[test]
    fn fatality_follows_kind_and_options() {
        let malformed = Error::malformed(0, "bad magic value");
        assert!(malformed.is_fatal(false, false));

        let invalid = Error::invalid(0, "duplicate export");
        assert!(invalid.is_fatal(true, false));
        assert!(!invalid.is_fatal(false, true));

        let custom = Error::new(ErrorKind::CustomSection, 0, "bad name");
        assert!(custom.is_fatal(false, true));
        assert!(!custom.is_fatal(true, false));
    }

    #[test]
    fn sort_is_stable_by_offset() {
        let mut errors = Errors::new();
        errors.push(Error::invalid(20, "b"));
        errors.push(Error::invalid(4, "a"));
        errors.push(Error::invalid(20, "c"));
        errors.sort();
        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["a", "b", "c"]);
    }

    #[test]
    fn with_file_prefixes_every_line() {
        let mut errors = Errors::new();
        errors.push(Error::invalid(1, "first"));
        errors.push(Error::malformed(2, "second"));
        let text = errors.with_file("a.wasm").to_string();
        assert_eq!(
            text,
            "a.wasm:0000001: error: first\na.wasm:0000002: error: second\n"
        );
    }
}
