use indoc::indoc;

use super::*;

#[test]
fn report_uses_fallback_message() {
    let mut diag = Diagnostics::new();
    diag.report(DiagnosticKind::EmptyEnum, "pkg.Color").emit();

    assert_eq!(diag.len(), 1);
    assert!(diag.has_errors());
    assert_eq!(
        diag.render(),
        "error[pkg.Color]: enums must contain at least one value\n"
    );
}

#[test]
fn custom_message_fills_template() {
    let mut diag = Diagnostics::new();
    diag.report(DiagnosticKind::UnresolvedType, "pkg.M.f")
        .message(".nope.Foo")
        .emit();
    diag.report(DiagnosticKind::InvalidFieldNumber, "pkg.M.g")
        .message("19500")
        .emit();

    insta::assert_snapshot!(diag.render(), @r"
    error[pkg.M.g]: invalid field number: 19500
      hint: field numbers range from 1 to 536870911, excluding 19000 to 19999
    error[pkg.M.f]: `.nope.Foo` is not defined
    ");
}

#[test]
fn extra_hints_follow_default_hint() {
    let mut diag = Diagnostics::new();
    diag.report(DiagnosticKind::DuplicateEnumNumber, "pkg.E.B")
        .message("1")
        .hint("`pkg.E.A` already uses 1")
        .emit();

    assert_eq!(
        diag.render(),
        indoc! {"
            error[pkg.E.B]: duplicate enum value number: 1
              hint: set `option allow_alias = true;` to permit aliases
              hint: `pkg.E.A` already uses 1
        "}
    );
}

#[test]
fn warnings_are_counted_separately() {
    let mut diag = Diagnostics::new();
    diag.report(DiagnosticKind::UnusedDependency, "a.proto")
        .message("b.proto")
        .emit();
    diag.report(DiagnosticKind::MissingName, "a.proto").emit();

    assert_eq!(diag.error_count(), 1);
    assert_eq!(diag.warning_count(), 1);
    assert!(diag.contains(DiagnosticKind::MissingName));

    let warnings = diag.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings.render(),
        "warning[a.proto]: import `b.proto` is not used\n"
    );
    assert!(!diag.has_warnings());
}

#[test]
fn kinds_are_ordered_by_priority() {
    assert!(DiagnosticKind::MalformedDescriptor < DiagnosticKind::DuplicateSymbol);
    assert!(DiagnosticKind::DuplicateSymbol < DiagnosticKind::UnresolvedType);
    assert!(DiagnosticKind::UnresolvedType < DiagnosticKind::UnusedDependency);
}
