use std::fmt;

/// What kind of construct was degraded during transpilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    UnsupportedBlock,
    UnsupportedWith,
    UnsupportedCondition,
    UnsupportedIconArgument,
    UnsupportedPartial,
    PartialContext,
    IgnoredArguments,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::UnsupportedBlock => "unsupported-block",
            DiagnosticKind::UnsupportedWith => "unsupported-with",
            DiagnosticKind::UnsupportedCondition => "unsupported-condition",
            DiagnosticKind::UnsupportedIconArgument => "unsupported-icon-argument",
            DiagnosticKind::UnsupportedPartial => "unsupported-partial",
            DiagnosticKind::PartialContext => "partial-context",
            DiagnosticKind::IgnoredArguments => "ignored-arguments",
        }
    }
}

/// A non-fatal note about output that may not match the source semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes_kind() {
        let diagnostic = Diagnostic::new(DiagnosticKind::UnsupportedWith, "`with person` kept as is");
        assert_eq!(diagnostic.to_string(), "[unsupported-with] `with person` kept as is");
    }
}
