use memescan_core::{ConfigError, CoreError, ErrorExt, ErrorReporter, RedditApiError};

#[test]
fn test_error_codes() {
    let reddit_error = CoreError::RedditApi(RedditApiError::InvalidToken);
    assert_eq!(reddit_error.error_code(), "REDDIT_API");

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "reddit.user_agent".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG");

    let input_error = CoreError::InvalidInput {
        message: "bad ticker".to_string(),
    };
    assert_eq!(input_error.error_code(), "INVALID_INPUT");

    assert_eq!(
        RedditApiError::SubredditNotFound {
            subreddit: "nope".to_string()
        }
        .error_code(),
        "REDDIT_SUBREDDIT_NOT_FOUND"
    );
}

#[test]
fn test_user_friendly_messages() {
    let reddit_error = CoreError::RedditApi(RedditApiError::InvalidToken);
    let message = reddit_error.user_friendly_message();
    assert!(message.contains("authentication token is invalid"));

    let rate_limited = CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 42 });
    assert!(rate_limited.user_friendly_message().contains("42 seconds"));

    let config_error = CoreError::Config(ConfigError::ValidationFailed {
        reason: "at least one subreddit must be configured".to_string(),
    });
    let message = config_error.user_friendly_message();
    assert!(message.contains("at least one subreddit"));
}

#[test]
fn test_config_errors_convert_into_core_error() {
    fn validate() -> Result<(), CoreError> {
        Err(ConfigError::MissingField {
            field: "scan.subreddits".to_string(),
        })?;
        Ok(())
    }

    let error = validate().unwrap_err();
    assert!(error.to_string().contains("scan.subreddits"));
}

#[test]
fn test_io_and_serialization_convert_into_core_error() {
    fn open_missing() -> Result<(), CoreError> {
        std::fs::File::open("/nonexistent/memescan/report.json")?;
        Ok(())
    }
    let io_error = open_missing().unwrap_err();
    assert_eq!(io_error.error_code(), "IO");
    assert!(io_error.user_friendly_message().contains("File access failed"));

    let serialization_error: CoreError = serde_json::from_str::<u32>("nope").unwrap_err().into();
    assert_eq!(serialization_error.error_code(), "SERIALIZATION");
}

#[test]
fn test_error_reporter() {
    let reporter = ErrorReporter::new();
    let error = CoreError::RedditApi(RedditApiError::InvalidToken);

    // This test just ensures the methods don't panic
    reporter.report_error(&error);
}
