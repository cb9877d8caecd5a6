//! Diagnostic message payloads.

use serde::{Deserialize, Serialize};

/// Severity of a diagnostic (spec §7).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// The kind of problem a diagnostic reports (spec §7 taxonomy, plus the
/// per-check kinds named throughout §4.5's semantic analyzer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    DuplicateImportAlias,
    DuplicateFact,
    DuplicateGlobal,
    DuplicateOutput,
    DuplicateDataTable,
    DuplicateRule,
    DuplicateDecisionRow,
    NameCollision,
    UnresolvedIdentifier,
    UnresolvedGlobal,
    IllegalAssignmentTarget,
    WhenClauseMultipleBareExpressions,
    WhenClauseNotBoolean,
    MissingAlias,
    UnparseableAliasBody,
    TemplateColumnMismatch,
    TemplateColumnNotInScope,
    MergeConflict,
    UnusedOutput,
    UnreachableElse,
    /// A null-safe navigation chain (spec §4.6) feeds an assignment target:
    /// the final setter call would NPE if an intermediate hop is absent.
    NullSafeSetterChain,
}

impl DiagnosticKind {
    /// Default severity for this kind absent an explicit override
    /// (spec §7: duplicate detection, unresolved identifiers, etc. are all
    /// errors; unused-output/unreachable-else are warnings).
    pub fn default_severity(self) -> Severity {
        match self {
            DiagnosticKind::UnusedOutput
            | DiagnosticKind::UnreachableElse
            | DiagnosticKind::NullSafeSetterChain => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// Optional source location. The front-end, not this crate, owns real
/// positions; when absent (unit/synthetic construction, or expansion-
/// generated rules with no original span) a diagnostic simply prints
/// without a location (spec §3 "Lifecycle": "the front-end is expected to
/// carry positions in a side channel").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelatedInfo {
    pub span: Option<Span>,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiagnosticMessage {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub span: Option<Span>,
    pub message: String,
    pub related: Vec<RelatedInfo>,
}

impl DiagnosticMessage {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// Render as a single line-oriented message (spec §7, "user-visible
    /// behavior"): `error[Kind]: message (at 12..20)`.
    pub fn render_line(&self) -> String {
        let sev = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        let mut line = format!("{sev}[{:?}]: {}", self.kind, self.message);
        if let Some(span) = self.span {
            line.push_str(&format!(" (at {}..{})", span.start, span.end));
        }
        for related in &self.related {
            line.push_str(&format!("\n  related: {}", related.message));
        }
        line
    }
}
