use nova_config::{ConfigError, ConfigValidationError, ConfigWarning, NovaConfig};
use tempfile::NamedTempFile;

#[test]
fn reports_unknown_top_level_tables() {
    let text = r#"
typo = 1

[watch]
size_limit = 10

[tracing]
level = "debug"
"#;

    let (config, diagnostics) =
        NovaConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert_eq!(config.watch.size_limit, 10);
    assert_eq!(diagnostics.unknown_keys, vec!["tracing", "typo"]);
    assert!(diagnostics.is_ok());
}

#[test]
fn invalid_watch_values_surface_as_errors() {
    let text = r#"
[watch]
invocation_limit = 0
"#;

    let (_config, diagnostics) =
        NovaConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert!(!diagnostics.is_ok());
    assert_eq!(
        diagnostics.errors,
        vec![ConfigValidationError::InvalidValue {
            toml_path: "watch.invocation_limit".to_string(),
            message: "must be >= 1".to_string(),
        }]
    );
}

#[test]
fn bogus_logging_level_is_a_warning() {
    let text = r#"
[logging]
level = "nova.watch=notalevel"
"#;

    let (_config, diagnostics) =
        NovaConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert!(
        diagnostics
            .warnings
            .iter()
            .any(|w| matches!(w, ConfigWarning::LoggingLevelInvalid { .. })),
        "expected logging warning, got {:?}",
        diagnostics.warnings
    );
}

#[test]
fn load_from_path_reports_missing_file() {
    let file = NamedTempFile::new().expect("tempfile");
    let path = file.path().to_path_buf();
    drop(file);

    let err = NovaConfig::load_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }), "{err:?}");
}

#[test]
fn load_from_path_reads_toml() {
    let file = NamedTempFile::new().expect("tempfile");
    std::fs::write(file.path(), "[watch]\nexpand = 4\n").expect("write config");

    let config = NovaConfig::load_from_path(file.path()).expect("load");
    assert_eq!(config.watch.expand, Some(4));
}
