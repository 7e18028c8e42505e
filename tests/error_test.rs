use std::time::Duration;

use huginn::HuginnError;

#[test]
fn test_error_display() {
    assert_eq!(
        HuginnError::NotFound("Atlantis".into()).to_string(),
        "not found: Atlantis"
    );
    assert_eq!(HuginnError::Timeout.to_string(), "operation timed out");
    assert_eq!(
        HuginnError::InvalidArgument("limit must not be negative, got -1".into()).to_string(),
        "invalid argument: limit must not be negative, got -1"
    );
    assert_eq!(
        HuginnError::Api {
            status: 403,
            message: "Forbidden".into()
        }
        .to_string(),
        "upstream API error (403): Forbidden"
    );
}

#[test]
fn test_json_error_conversion() {
    let err: HuginnError = serde_json::from_str::<u32>("nope").unwrap_err().into();
    assert!(matches!(err, HuginnError::Json(_)));
    assert!(!err.is_transient());
}

#[test]
fn test_rate_limit_hint() {
    let err = HuginnError::RateLimited {
        retry_after: Some(Duration::from_secs(3)),
    };
    assert!(err.is_transient());
    assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
}

#[test]
fn test_error_is_send_sync() {
    fn assert_send_sync<T: Send + Sync + 'static>() {}
    assert_send_sync::<HuginnError>();
}
