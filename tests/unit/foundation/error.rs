use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        StickerError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(StickerError::config("x").to_string().contains("config error:"));
    assert!(StickerError::probe("x").to_string().contains("probe error:"));
    assert!(
        StickerError::rasterize("x")
            .to_string()
            .contains("rasterize error:")
    );
    assert!(
        StickerError::transcode("x")
            .to_string()
            .contains("transcode error:")
    );
    assert!(
        StickerError::from(BridgeError::SaveLinkNotFound)
            .to_string()
            .contains("bridge error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = StickerError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn only_config_errors_are_fatal() {
    assert!(StickerError::config("no dirs").is_fatal());
    assert!(!StickerError::probe("x").is_fatal());
    assert!(!StickerError::from(BridgeError::UploadRejected { status: 500 }).is_fatal());
}
