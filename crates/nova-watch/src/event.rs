use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Identity and arguments of one call of the watched method.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub class_name: String,
    pub method_name: String,
    /// `None` for static methods.
    pub target: Option<Value>,
    pub args: Vec<Value>,
}

impl Invocation {
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            target: None,
            args: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: Value) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }
}

/// Callback delivered by the instrumentation layer.
///
/// Per call frame: one `Entry`, zero or more `LineReached`, then exactly one of
/// `NormalReturn` / `ExceptionalReturn`.
#[derive(Debug, Clone)]
pub enum InvocationEvent {
    Entry {
        invocation: Invocation,
    },
    NormalReturn {
        invocation: Invocation,
        return_value: Value,
    },
    ExceptionalReturn {
        invocation: Invocation,
        thrown: Value,
    },
    LineReached {
        invocation: Invocation,
        line: u32,
        /// Local variables in declaration order.
        locals: Vec<(String, Value)>,
    },
}

impl InvocationEvent {
    pub fn invocation(&self) -> &Invocation {
        match self {
            Self::Entry { invocation }
            | Self::NormalReturn { invocation, .. }
            | Self::ExceptionalReturn { invocation, .. }
            | Self::LineReached { invocation, .. } => invocation,
        }
    }
}

/// Where in the call a record was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessPoint {
    #[serde(rename = "AtEnter")]
    Entry,
    #[serde(rename = "AtExit")]
    Success,
    #[serde(rename = "AtExceptionExit")]
    Exception,
    #[serde(rename = "AtLine")]
    Line,
    /// Sentinel emitted once when the invocation limit is exceeded.
    #[serde(rename = "watchEnd")]
    End,
}

impl AccessPoint {
    pub fn key(self) -> &'static str {
        match self {
            Self::Entry => "AtEnter",
            Self::Success => "AtExit",
            Self::Exception => "AtExceptionExit",
            Self::Line => "AtLine",
            Self::End => "watchEnd",
        }
    }
}
