use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        FlipbookError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(FlipbookError::decode("x").to_string().contains("decode error:"));
    assert!(
        FlipbookError::storage_full("x")
            .to_string()
            .contains("storage full:")
    );
    assert!(
        FlipbookError::unsupported("x")
            .to_string()
            .contains("unsupported:")
    );
    assert!(FlipbookError::export("x").to_string().contains("export error:"));
    assert!(
        FlipbookError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = FlipbookError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn serde_json_errors_convert() {
    let err: FlipbookError = serde_json::from_str::<u32>("nope").unwrap_err().into();
    assert!(matches!(err, FlipbookError::Serde(_)));
}
