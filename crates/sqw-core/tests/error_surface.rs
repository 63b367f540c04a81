use sqw_core::errors::{ErrorInfo, SqwError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("axis", 2)
        .with_context("reason", "example")
}

#[test]
fn config_error_surface() {
    let err = SqwError::Config(sample_info("nyquist-violation", "ωmax too large"));
    assert_eq!(err.code(), "nyquist-violation");
    assert_eq!(err.info().context_value("axis"), Some("2"));
}

#[test]
fn query_error_surface() {
    let err = SqwError::Query(sample_info("too-few-points", "path needs two points"));
    assert_eq!(err.info().code, "too-few-points");
    assert!(err.info().context.contains_key("reason"));
}

#[test]
fn display_includes_context_and_hint() {
    let info = sample_info("empty-lattice", "lattice extent must be positive")
        .with_hint("use at least one cell per axis");
    let err = SqwError::Lattice(info);
    let rendered = err.to_string();
    assert_eq!(
        rendered,
        "lattice: [empty-lattice] lattice extent must be positive \
         (axis=2, reason=example); hint: use at least one cell per axis"
    );
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = SqwError::Dynamics(ErrorInfo::new("non-finite-state", "spins diverged"));
    let json = serde_json::to_string(&err).unwrap();
    assert!(json.contains(&format!("\"family\":\"{}\"", err.family())));
    let back: SqwError = serde_json::from_str(&json).unwrap();
    assert_eq!(back, err);
}
