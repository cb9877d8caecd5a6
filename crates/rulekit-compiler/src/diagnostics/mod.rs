//! Compiler diagnostics: the accumulating, non-fatal error channel.
//!
//! Diagnostics are how every pass reports problems without failing fast
//! (spec §7, "Propagation policy"): each pass takes `&mut Diagnostics` and
//! keeps walking, collecting as many findings as it can. Compilation fails
//! overall ("Failure") iff the accumulated bag contains any error-severity
//! diagnostic once every pass has run; warnings never fail it.

mod message;
mod printer;

#[cfg(test)]
mod tests;

pub use message::{DiagnosticKind, DiagnosticMessage, RelatedInfo, Severity, Span};
pub use printer::DiagnosticsPrinter;

/// An accumulating bag of diagnostics produced across the analyzer, type
/// resolver, and expander passes.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Vec<DiagnosticMessage>,
}

/// Builder for one diagnostic; nothing is recorded until `.emit()` is
/// called (mirrors the teacher's `DiagnosticBuilder` — a message built
/// piecemeal with optional related-info/hints then flushed once).
#[must_use = "diagnostic not recorded until .emit() is called"]
pub struct DiagnosticBuilder<'a> {
    diagnostics: &'a mut Diagnostics,
    message: DiagnosticMessage,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, kind: DiagnosticKind, span: Option<Span>) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            diagnostics: self,
            message: DiagnosticMessage {
                severity: kind.default_severity(),
                kind,
                span,
                message: String::new(),
                related: Vec::new(),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(DiagnosticMessage::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.messages.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.messages.iter().filter(|d| d.is_warning()).count()
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticMessage> {
        self.messages.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticMessage> {
        self.messages.iter().filter(|d| d.is_warning())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiagnosticMessage> {
        self.messages.iter()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.messages.extend(other.messages);
    }

    pub fn printer<'a>(&'a self, source: Option<&'a str>) -> DiagnosticsPrinter<'a> {
        DiagnosticsPrinter::new(&self.messages, source)
    }

    /// Render every message as a line-oriented string (spec §6, `Failure`'s
    /// `errors: ordered list of diagnostic strings`).
    pub fn to_error_strings(&self) -> Vec<String> {
        self.errors().map(DiagnosticMessage::render_line).collect()
    }
}

impl<'a> DiagnosticBuilder<'a> {
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message.message = msg.into();
        self
    }

    pub fn related_to(mut self, span: Option<Span>, msg: impl Into<String>) -> Self {
        self.message.related.push(RelatedInfo {
            span,
            message: msg.into(),
        });
        self
    }

    /// Override the kind's default severity (used for analyzer checks that
    /// can be escalated/downgraded by policy; spec §7 notes most kinds are
    /// fixed-severity, but `generate_null_checks`/setter-chain nullability
    /// warnings need this).
    pub fn severity(mut self, severity: Severity) -> Self {
        self.message.severity = severity;
        self
    }

    pub fn emit(self) {
        self.diagnostics.messages.push(self.message);
    }
}
