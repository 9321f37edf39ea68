//! Error message quality tests
//!
//! Tests that verify error messages are helpful and distinguishable.

use kopia_exporter::error::ExporterError;

#[test]
fn test_tool_not_found_names_the_program() {
    // Given: kopia is not installed
    let error = ExporterError::ToolNotFound {
        program: "kopia".to_string(),
    };

    // When: Converting to string
    let message = format!("{}", error);

    // Then: Message should name the program and hint at PATH
    assert!(message.contains("Backup tool not found"));
    assert!(message.contains("'kopia'"));
    assert!(message.contains("PATH"));
}

#[test]
fn test_tool_failure_carries_command_exit_code_and_stderr() {
    // Given: kopia exited with status 1
    let error = ExporterError::ToolExecutionFailed {
        command: "kopia snapshot list -n 1 --json".to_string(),
        code: "1".to_string(),
        stderr: "repository not connected".to_string(),
    };

    // When: Converting to string
    let message = format!("{}", error);

    // Then: All three are visible to the operator
    assert!(message.contains("Backup tool failed"));
    assert!(message.contains("`kopia snapshot list -n 1 --json`"));
    assert!(message.contains("exited with 1"));
    assert!(message.contains("repository not connected"));
}

#[test]
fn test_timeout_message_names_the_limit() {
    let error = ExporterError::Timeout {
        command: "kopia snapshot create --json /data".to_string(),
        limit: std::time::Duration::from_secs(3600),
    };

    let message = format!("{}", error);

    assert!(message.contains("timed out"));
    assert!(message.contains("within 3600s"));
}

#[test]
fn test_malformed_output_message_clarity() {
    let error = ExporterError::MalformedOutput("snapshot abc has no source host".to_string());

    let message = format!("{}", error);

    assert!(message.contains("Malformed backup tool output"));
    assert!(message.contains("no source host"));
}

#[test]
fn test_push_rejected_message_includes_status_and_body() {
    // Given: The push gateway answered 400
    let error = ExporterError::PushRejected {
        status: 400,
        body: "pushed metrics are invalid".to_string(),
    };

    // When: Converting to string
    let message = format!("{}", error);

    // Then: Status and gateway explanation are both shown
    assert!(message.contains("HTTP 400"));
    assert!(message.contains("pushed metrics are invalid"));
}

#[test]
fn test_config_error_message_clarity() {
    // Given: A configuration error
    let error = ExporterError::Config("job name must not be empty".to_string());

    // When: Converting to string
    let message = format!("{}", error);

    // Then: Message should clearly indicate configuration issue
    assert!(message.contains("Configuration error"));
    assert!(message.contains("job name"));
}

#[test]
fn test_json_error_conversion() {
    // Given: A serde_json parse failure
    let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();

    // When: Converting into ExporterError
    let error: ExporterError = json_err.into();

    // Then: It is the Json variant with a JSON prefix
    assert!(matches!(error, ExporterError::Json(_)));
    assert!(error.to_string().starts_with("JSON error"));
}

#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");

    let error: ExporterError = io_err.into();

    assert!(matches!(error, ExporterError::Io(_)));
    assert!(error.to_string().contains("IO error"));
}

#[test]
fn test_error_variants_are_distinguishable() {
    // Given: One error of each operator-facing kind
    let messages: Vec<String> = vec![
        ExporterError::ToolNotFound {
            program: "kopia".into(),
        },
        ExporterError::ToolExecutionFailed {
            command: "kopia".into(),
            code: "1".into(),
            stderr: String::new(),
        },
        ExporterError::Timeout {
            command: "kopia".into(),
            limit: std::time::Duration::from_secs(1),
        },
        ExporterError::MalformedOutput("x".into()),
        ExporterError::PushRejected {
            status: 500,
            body: String::new(),
        },
        ExporterError::Config("x".into()),
    ]
    .into_iter()
    .map(|e| e.to_string())
    .collect();

    // Then: No two messages share the same leading phrase
    let prefixes: std::collections::HashSet<&str> = messages
        .iter()
        .map(|m| m.split(':').next().unwrap_or_default())
        .collect();
    assert_eq!(prefixes.len(), messages.len());
}
