use crate::diagnostics::{ConfigValidationError, ConfigWarning, ValidationDiagnostics};
use crate::{LoggingConfig, NovaConfig};

/// Deepest `watch.expand` the renderer accepts.
const MAX_WATCH_EXPAND: u32 = 4;

impl NovaConfig {
    /// Validate semantic invariants for a configuration.
    ///
    /// Validation is best-effort: it attempts to report as many problems as possible in one pass.
    #[must_use]
    pub fn validate(&self) -> ValidationDiagnostics {
        let mut out = ValidationDiagnostics::default();

        validate_logging(self, &mut out);
        validate_watch(self, &mut out);

        out
    }
}

fn validate_logging(config: &NovaConfig, out: &mut ValidationDiagnostics) {
    let normalized = LoggingConfig::normalize_level_directives(&config.logging.level);
    if !config.logging.level.trim().is_empty()
        && tracing_subscriber::EnvFilter::try_new(normalized.clone()).is_err()
    {
        out.warnings.push(ConfigWarning::LoggingLevelInvalid {
            value: config.logging.level.clone(),
            normalized,
        });
    }

    if config.logging.buffer_lines == 0 {
        out.errors.push(ConfigValidationError::InvalidValue {
            toml_path: "logging.buffer_lines".to_owned(),
            message: "must be >= 1".to_owned(),
        });
    }
}

fn validate_watch(config: &NovaConfig, out: &mut ValidationDiagnostics) {
    let watch = &config.watch;

    if watch.size_limit == 0 {
        out.errors.push(ConfigValidationError::InvalidValue {
            toml_path: "watch.size_limit".to_owned(),
            message: "must be >= 1".to_owned(),
        });
    }

    if watch.invocation_limit == 0 {
        out.errors.push(ConfigValidationError::InvalidValue {
            toml_path: "watch.invocation_limit".to_owned(),
            message: "must be >= 1".to_owned(),
        });
    }

    if watch.max_render_bytes == 0 {
        out.errors.push(ConfigValidationError::InvalidValue {
            toml_path: "watch.max_render_bytes".to_owned(),
            message: "must be >= 1".to_owned(),
        });
    }

    if let Some(expand) = watch.expand {
        if expand > MAX_WATCH_EXPAND {
            out.errors.push(ConfigValidationError::InvalidValue {
                toml_path: "watch.expand".to_owned(),
                message: format!("must be <= {MAX_WATCH_EXPAND}, got {expand}"),
            });
        }
    }
}
