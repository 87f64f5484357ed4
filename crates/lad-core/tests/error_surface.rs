use lad_core::errors::{ErrorInfo, LadderError};
use lad_core::ObservableKind;

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("path", "data_extracted/density_L32.txt")
        .with_hint("delete the file to recompute")
}

#[test]
fn store_error_surface() {
    let err = LadderError::Store(sample_info("malformed-cache", "no header"));
    assert_eq!(err.info().code, "malformed-cache");
    assert!(err.info().context.contains_key("path"));
    let rendered = err.to_string();
    assert_eq!(
        rendered,
        "cache store: [malformed-cache] no header (path=data_extracted/density_L32.txt); \
         hint: delete the file to recompute"
    );
}

#[test]
fn structure_error_surface() {
    let err = LadderError::structure("grid-mismatch", "coordinate grids differ");
    assert_eq!(err.info().code, "grid-mismatch");
    assert!(err.info().hint.is_none());
}

#[test]
fn errors_serialise_with_family_tag() {
    let err = LadderError::Fit(ErrorInfo::new("singular", "matrix is singular"));
    let json = serde_json::to_value(&err).expect("serialize");
    assert_eq!(json["family"], "Fit");
    assert_eq!(json["detail"]["code"], "singular");
    let back: LadderError = serde_json::from_value(json).expect("deserialize");
    assert_eq!(back, err);
}

#[test]
fn unknown_observable_is_structural() {
    let err = "magnetization".parse::<ObservableKind>().unwrap_err();
    assert!(matches!(err, LadderError::Structure(_)));
    assert_eq!(err.info().context["kind"], "magnetization");
}

#[test]
fn observable_names_parse_back() {
    for kind in ObservableKind::ALL {
        assert_eq!(kind.name().parse::<ObservableKind>().unwrap(), kind);
    }
}
