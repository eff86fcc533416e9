//! Diagnostic collection and reporting

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Range};

const SOURCE: &str = "koreo-ls";

/// Collects diagnostics during indexing and validation
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    /// Create a new empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic with an explicit severity
    pub fn add(&mut self, range: Range, severity: DiagnosticSeverity, message: String) {
        self.diagnostics.push(Diagnostic {
            range,
            severity: Some(severity),
            code: None,
            code_description: None,
            source: Some(SOURCE.to_string()),
            message,
            related_information: None,
            tags: None,
            data: None,
        });
    }

    /// Convert into the final list of diagnostics
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp::lsp_types::Position;

    fn range() -> Range {
        Range {
            start: Position {
                line: 2,
                character: 4,
            },
            end: Position {
                line: 2,
                character: 9,
            },
        }
    }

    #[test]
    fn test_collector_tags_source_and_severity() {
        let mut collector = DiagnosticCollector::new();
        collector.add(range(), DiagnosticSeverity::ERROR, "bad".to_string());
        collector.add(range(), DiagnosticSeverity::INFORMATION, "note".to_string());

        let diagnostics = collector.into_diagnostics();
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].source.as_deref(), Some("koreo-ls"));
        assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(diagnostics[1].severity, Some(DiagnosticSeverity::INFORMATION));
    }
}
