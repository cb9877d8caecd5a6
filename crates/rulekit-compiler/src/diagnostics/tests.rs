use super::*;

#[test]
fn empty_bag_has_no_errors() {
    let diagnostics = Diagnostics::new();
    assert!(diagnostics.is_empty());
    assert!(!diagnostics.has_errors());
    assert_eq!(diagnostics.error_count(), 0);
}

#[test]
fn report_defaults_to_kind_severity() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::DuplicateFact, None)
        .message("fact `item` declared twice")
        .emit();
    assert!(diagnostics.has_errors());
    assert_eq!(diagnostics.error_count(), 1);
    assert_eq!(diagnostics.warning_count(), 0);
}

#[test]
fn severity_override_takes_precedence() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::DuplicateFact, None)
        .message("downgraded for policy reasons")
        .severity(Severity::Warning)
        .emit();
    assert_eq!(diagnostics.error_count(), 0);
    assert_eq!(diagnostics.warning_count(), 1);
}

#[test]
fn warning_kinds_default_to_warning_severity() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::UnusedOutput, None)
        .message("output `total` is never assigned")
        .emit();
    diagnostics
        .report(DiagnosticKind::NullSafeSetterChain, None)
        .message("setter chain may NPE")
        .emit();
    assert_eq!(diagnostics.warning_count(), 2);
    assert!(!diagnostics.has_errors());
}

#[test]
fn related_info_is_carried_but_does_not_affect_severity() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::MergeConflict, Some(Span { start: 10, end: 20 }))
        .message("conflicting assignment to `total`")
        .related_to(Some(Span { start: 0, end: 5 }), "first assignment here")
        .emit();
    let msg = diagnostics.iter().next().unwrap();
    assert_eq!(msg.related.len(), 1);
    assert!(msg.is_error());
}

#[test]
fn extend_merges_two_bags() {
    let mut a = Diagnostics::new();
    a.report(DiagnosticKind::DuplicateFact, None).message("a").emit();
    let mut b = Diagnostics::new();
    b.report(DiagnosticKind::DuplicateGlobal, None).message("b").emit();
    a.extend(b);
    assert_eq!(a.len(), 2);
}

#[test]
fn to_error_strings_only_includes_errors() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::DuplicateFact, None)
        .message("duplicate fact")
        .emit();
    diagnostics
        .report(DiagnosticKind::UnusedOutput, None)
        .message("unused output")
        .emit();
    let errors = diagnostics.to_error_strings();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("duplicate fact"));
}

#[test]
fn diagnostic_message_round_trips_through_json() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::MergeConflict, Some(Span { start: 10, end: 20 }))
        .message("conflicting assignment to `total`")
        .related_to(Some(Span { start: 0, end: 5 }), "first assignment here")
        .emit();
    let original = diagnostics.iter().next().unwrap();
    let json = serde_json::to_string(original).unwrap();
    let restored: DiagnosticMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.kind, DiagnosticKind::MergeConflict);
    assert_eq!(restored.related.len(), 1);
    assert_eq!(restored.render_line(), original.render_line());
}

#[test]
fn printer_falls_back_to_line_rendering_without_source() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .report(DiagnosticKind::UnresolvedIdentifier, None)
        .message("`foo` is not in scope")
        .emit();
    let rendered = diagnostics.printer(None).render();
    assert!(rendered.contains("foo"));
}
