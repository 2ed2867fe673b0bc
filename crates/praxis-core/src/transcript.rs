//! Append-only transcript of classified output lines.

use serde::{Deserialize, Serialize};

/// Classification of a transcript line, derived from lightweight textual
/// markers rather than structured metadata from the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Progress,
    Package,
    Success,
    Error,
    Warning,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub text: String,
    pub kind: LineKind,
}

impl OutputLine {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let kind = classify(&text);
        Self { text, kind }
    }
}

fn classify(text: &str) -> LineKind {
    let t = text.trim_start();
    if t.starts_with('✗') || t.starts_with("Error") {
        LineKind::Error
    } else if t.starts_with('⚠') || t.starts_with("Warning") {
        LineKind::Warning
    } else if t.starts_with('✓') {
        LineKind::Success
    } else if t.starts_with('📦') {
        LineKind::Package
    } else if t.trim_end().ends_with("...") || t.trim_end().ends_with('…') {
        LineKind::Progress
    } else {
        LineKind::Plain
    }
}

/// Ordered, append-only buffer of output lines for one editor session.
///
/// Lines are never mutated or removed; any display cap is a presentation
/// concern of the UI layer, not of this buffer.
#[derive(Debug, Default)]
pub struct Transcript {
    lines: Vec<OutputLine>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, text: impl Into<String>) -> &OutputLine {
        self.lines.push(OutputLine::new(text));
        // just pushed, so the tail exists
        &self.lines[self.lines.len() - 1]
    }

    pub fn lines(&self) -> &[OutputLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_markers() {
        assert_eq!(OutputLine::new("✗ Execution timed out").kind, LineKind::Error);
        assert_eq!(OutputLine::new("Error: bad input").kind, LineKind::Error);
        assert_eq!(OutputLine::new("⚠ deprecated call").kind, LineKind::Warning);
        assert_eq!(OutputLine::new("Warning: shadowed name").kind, LineKind::Warning);
        assert_eq!(OutputLine::new("✓ Sandbox ready").kind, LineKind::Success);
        assert_eq!(OutputLine::new("📦 Loading packages: numpy").kind, LineKind::Package);
        assert_eq!(OutputLine::new("Running code...").kind, LineKind::Progress);
        assert_eq!(OutputLine::new("42").kind, LineKind::Plain);
        assert_eq!(OutputLine::new("(no output)").kind, LineKind::Plain);
    }

    #[test]
    fn test_error_marker_beats_progress_suffix() {
        assert_eq!(OutputLine::new("Error: still loading...").kind, LineKind::Error);
    }

    #[test]
    fn test_append_preserves_order_and_never_drops() {
        let mut transcript = Transcript::new();
        transcript.append("Running code...");
        transcript.append("42");
        transcript.append("42");
        transcript.append("✓ Done");
        let texts: Vec<_> = transcript.lines().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["Running code...", "42", "42", "✓ Done"]);
        assert_eq!(transcript.len(), 4);
    }
}
