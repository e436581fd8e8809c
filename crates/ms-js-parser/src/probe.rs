//! Fallback tolerance probe for files the wrapped parse rejects.
//!
//! The probe only records which more permissive reading would have accepted
//! the file. Its verdict is logged; the file is skipped either way.

use tree_sitter::{Language, Parser};

use crate::error::ParseError;
use crate::parser::JsParser;

/// Outcome of the fallback probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeVerdict {
    /// The unwrapped text parses as a standalone module or script.
    AcceptedAsModule,
    /// The text parses only under the TypeScript (TSX) grammar.
    AcceptedAsTypeScript,
    /// No fallback grammar accepts the text.
    Rejected,
    /// The probe was not run (invalid assignment targets skip it).
    NotAttempted,
}

impl ProbeVerdict {
    /// Returns a short label for logging.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AcceptedAsModule => "module",
            Self::AcceptedAsTypeScript => "typescript",
            Self::Rejected => "rejected",
            Self::NotAttempted => "not-attempted",
        }
    }
}

impl std::fmt::Display for ProbeVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Parsers used by the fallback probe.
pub struct FallbackProbe {
    tsx: Parser,
}

impl FallbackProbe {
    /// Creates the probe's TSX parser.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::LanguageInit`] if the grammar cannot be loaded.
    pub fn new() -> Result<Self, ParseError> {
        let mut tsx = Parser::new();
        let language: Language = tree_sitter_typescript::LANGUAGE_TSX.into();
        tsx.set_language(&language)
            .map_err(|_| ParseError::LanguageInit("TSX"))?;
        Ok(Self { tsx })
    }

    /// Runs the probe on unwrapped file text.
    ///
    /// `js` is reused to parse the text as a standalone program first.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Parse`] if a parser produced no tree.
    pub fn probe(&mut self, js: &mut JsParser, text: &str) -> Result<ProbeVerdict, ParseError> {
        if js.accepts_program(text)? {
            return Ok(ProbeVerdict::AcceptedAsModule);
        }
        let tree = self.tsx.parse(text, None).ok_or(ParseError::Parse)?;
        if tree.root_node().has_error() {
            Ok(ProbeVerdict::Rejected)
        } else {
            Ok(ProbeVerdict::AcceptedAsTypeScript)
        }
    }
}

impl std::fmt::Debug for FallbackProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackProbe").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(text: &str) -> ProbeVerdict {
        let mut js = JsParser::new().expect("parser");
        let mut probe = FallbackProbe::new().expect("probe");
        probe.probe(&mut js, text).expect("probe")
    }

    #[test]
    fn test_module_syntax_accepted() {
        let text = "import fs from 'fs';\nexport default fs;";
        assert_eq!(verdict(text), ProbeVerdict::AcceptedAsModule);
    }

    #[test]
    fn test_typescript_accepted() {
        assert_eq!(
            verdict("const a: number = 1;\ninterface Foo { bar: string }"),
            ProbeVerdict::AcceptedAsTypeScript
        );
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(verdict("var = = ;"), ProbeVerdict::Rejected);
    }

    #[test]
    fn test_label() {
        assert_eq!(ProbeVerdict::NotAttempted.to_string(), "not-attempted");
    }
}
