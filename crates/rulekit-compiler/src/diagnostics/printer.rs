//! Rendering of accumulated diagnostics for callers to display.

use annotate_snippets::{Level, Renderer, Snippet};

use super::message::{DiagnosticMessage, Severity};

/// Renders a `Diagnostics` bag against an optional source string, using
/// `annotate-snippets` when a span and source text are both available and
/// falling back to a line-oriented message otherwise (spec §7,
/// "callers render them").
pub struct DiagnosticsPrinter<'a> {
    messages: &'a [DiagnosticMessage],
    source: Option<&'a str>,
}

impl<'a> DiagnosticsPrinter<'a> {
    pub fn new(messages: &'a [DiagnosticMessage], source: Option<&'a str>) -> Self {
        Self { messages, source }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, msg) in self.messages.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&self.render_one(msg));
        }
        out
    }

    fn render_one(&self, msg: &DiagnosticMessage) -> String {
        let Some(source) = self.source else {
            return msg.render_line();
        };
        let Some(span) = msg.span else {
            return msg.render_line();
        };
        if span.end > source.len() || span.start > span.end {
            return msg.render_line();
        }

        let level = match msg.severity {
            Severity::Error => Level::Error,
            Severity::Warning => Level::Warning,
        };
        let snippet = Snippet::source(source).annotation(level.span(span.start..span.end));
        let message = level.title(&msg.message).snippet(snippet);
        Renderer::plain().render(message).to_string()
    }
}
