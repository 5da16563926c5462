use nova_config::WatchDefaults;
use serde::{Deserialize, Serialize};

use crate::error::WatchConfigError;
use crate::line_range::LineRange;
use crate::render::MAX_EXPAND;

pub const DEFAULT_CONDITION: &str = "true";
pub const DEFAULT_EXPRESS: &str = "{params, target, returnObj}";

/// Configuration of one watch session. Read-only once the session is created.
///
/// ```toml
/// success = true
/// express = "returnObj"
/// condition = "params[0] > 10"
/// lines = ["12-20", "40"]
/// invocation_limit = 5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Emit at method entry.
    pub before: bool,
    /// Emit on normal return.
    pub success: bool,
    /// Emit on exceptional return.
    pub exception: bool,
    /// Emit once when the call finishes, either way.
    pub finish: bool,
    /// Lines to emit at; ranges OR together.
    pub lines: Vec<LineRange>,
    /// Blank means always.
    pub condition: String,
    pub express: String,
    /// `None` renders values with a shallow text conversion. At most [`MAX_EXPAND`].
    pub expand: Option<u32>,
    pub size_limit: usize,
    pub invocation_limit: u64,
    /// Byte budget for one rendered value.
    pub max_render_bytes: usize,
    /// Echo each condition result.
    pub verbose: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::from_defaults(&WatchDefaults::default())
    }
}

impl WatchConfig {
    pub fn new(express: impl Into<String>) -> Self {
        Self {
            express: express.into(),
            ..Self::default()
        }
    }

    pub fn from_defaults(defaults: &WatchDefaults) -> Self {
        Self {
            before: false,
            success: false,
            exception: false,
            finish: false,
            lines: Vec::new(),
            condition: DEFAULT_CONDITION.to_owned(),
            express: DEFAULT_EXPRESS.to_owned(),
            expand: defaults.expand,
            size_limit: defaults.size_limit,
            invocation_limit: defaults.invocation_limit,
            max_render_bytes: defaults.max_render_bytes,
            verbose: false,
        }
    }

    pub fn load_from_str(text: &str) -> Result<Self, WatchConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn on_entry(mut self) -> Self {
        self.before = true;
        self
    }

    pub fn on_success(mut self) -> Self {
        self.success = true;
        self
    }

    pub fn on_exception(mut self) -> Self {
        self.exception = true;
        self
    }

    pub fn on_finish(mut self) -> Self {
        self.finish = true;
        self
    }

    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    pub fn lines(mut self, lines: impl IntoIterator<Item = LineRange>) -> Self {
        self.lines.extend(lines);
        self
    }

    pub fn expand(mut self, expand: Option<u32>) -> Self {
        self.expand = expand;
        self
    }

    pub fn size_limit(mut self, size_limit: usize) -> Self {
        self.size_limit = size_limit;
        self
    }

    pub fn invocation_limit(mut self, limit: u64) -> Self {
        self.invocation_limit = limit;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn validate(&self) -> Result<(), WatchConfigError> {
        if self.size_limit == 0 {
            return Err(WatchConfigError::ZeroLimit {
                field: "size_limit",
            });
        }
        if self.invocation_limit == 0 {
            return Err(WatchConfigError::ZeroLimit {
                field: "invocation_limit",
            });
        }
        if self.max_render_bytes == 0 {
            return Err(WatchConfigError::ZeroLimit {
                field: "max_render_bytes",
            });
        }
        if let Some(expand) = self.expand.filter(|&expand| expand > MAX_EXPAND) {
            return Err(WatchConfigError::ExpandTooDeep {
                expand,
                max: MAX_EXPAND,
            });
        }
        Ok(())
    }

    /// Whether terminal events emit regardless of their own trigger flag.
    ///
    /// Explicit `finish`, or nothing else selected at all.
    pub fn is_finish(&self) -> bool {
        self.finish || (!self.before && !self.success && !self.exception && self.lines.is_empty())
    }

    pub fn in_line_range(&self, line: u32) -> bool {
        self.lines.iter().any(|range| range.contains(line))
    }
}
