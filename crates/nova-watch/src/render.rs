//! Value rendering.
//!
//! Two forms exist: [`shallow_text`], a direct `toString`-style conversion used when no
//! expansion depth is configured, and [`ObjectView`], a bounded tree renderer that never
//! descends more than `expand` levels, never lists more than `size_limit` elements of a
//! container, and marks references back to an ancestor instead of following them.

use std::fmt::Write as _;

use crate::error::RenderError;
use crate::value::{simple_type_name, ObjectBody, ObjectId, ObjectRef, Value};

/// Default upper bound for one rendered value.
pub const DEFAULT_MAX_RENDER_BYTES: usize = 10 * 1024 * 1024;

/// Deepest expansion [`ObjectView`] will draw. Drawing recurses once per level.
pub const MAX_EXPAND: u32 = 4;

const INDENT: &str = "    ";

pub trait ObjectRenderer: Send + Sync {
    fn render(&self, value: &Value, expand: u32, size_limit: usize) -> Result<String, RenderError>;
}

/// Direct text conversion of a value, in the target runtime's `toString` style.
///
/// Containers are rendered one level deep; nested objects appear as `Type@id`.
pub fn shallow_text(value: &Value) -> String {
    match value {
        Value::Object(obj) => match obj.snapshot() {
            ObjectBody::Plain { .. } => object_identity(obj),
            ObjectBody::Array { elements, .. } | ObjectBody::List { elements } => {
                let items: Vec<_> = elements.iter().map(inline_text).collect();
                format!("[{}]", items.join(", "))
            }
            ObjectBody::Map { entries } => {
                let items: Vec<_> = entries
                    .iter()
                    .map(|(k, v)| format!("{}={}", inline_text(k), inline_text(v)))
                    .collect();
                format!("{{{}}}", items.join(", "))
            }
            ObjectBody::Throwable { message, .. } => match message {
                Some(message) => format!("{}: {message}", obj.runtime_type()),
                None => obj.runtime_type().to_owned(),
            },
        },
        scalar => scalar_text(scalar),
    }
}

fn inline_text(value: &Value) -> String {
    match value {
        Value::Object(obj) => object_identity(obj),
        scalar => scalar_text(scalar),
    }
}

fn object_identity(obj: &ObjectRef) -> String {
    format!("{}@{:x}", obj.simple_type_name(), obj.id())
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_owned(),
        Value::Boolean(v) => v.to_string(),
        Value::Byte(v) => v.to_string(),
        Value::Short(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::Long(v) => v.to_string(),
        Value::Float(v) => float_text(f64::from(*v)),
        Value::Double(v) => float_text(*v),
        Value::Char(c) => c.to_string(),
        Value::String(s) => s.to_string(),
        Value::Object(obj) => object_identity(obj),
    }
}

fn float_text(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Bounded, cycle-safe tree renderer.
///
/// ```text
/// @ArrayList[
///     @Integer[1],
///     @String[two],
///     ...
/// ]
/// ```
#[derive(Debug, Clone)]
pub struct ObjectView {
    max_bytes: usize,
}

impl Default for ObjectView {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_RENDER_BYTES,
        }
    }
}

impl ObjectView {
    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self {
            max_bytes: max_bytes.max(1),
        }
    }

    pub fn draw(&self, value: &Value, expand: u32, size_limit: usize) -> Result<String, RenderError> {
        if expand > MAX_EXPAND {
            return Err(RenderError::TooDeep {
                expand,
                max: MAX_EXPAND,
            });
        }
        let mut drawer = Drawer {
            out: String::new(),
            path: Vec::new(),
            expand,
            size_limit,
            max_bytes: self.max_bytes,
        };
        drawer.value(value, 0, 0)?;
        Ok(drawer.out)
    }
}

impl ObjectRenderer for ObjectView {
    fn render(&self, value: &Value, expand: u32, size_limit: usize) -> Result<String, RenderError> {
        self.draw(value, expand, size_limit)
    }
}

struct Drawer {
    out: String,
    /// Ids of the objects currently being expanded, outermost first.
    path: Vec<ObjectId>,
    expand: u32,
    size_limit: usize,
    max_bytes: usize,
}

impl Drawer {
    fn push(&mut self, text: &str) -> Result<(), RenderError> {
        self.out.push_str(text);
        if self.out.len() > self.max_bytes {
            return Err(RenderError::TooLarge {
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    fn newline(&mut self, indent: usize) -> Result<(), RenderError> {
        self.push("\n")?;
        for _ in 0..indent {
            self.push(INDENT)?;
        }
        Ok(())
    }

    fn value(&mut self, value: &Value, depth: u32, indent: usize) -> Result<(), RenderError> {
        match value {
            Value::Null => self.push("null"),
            Value::Object(obj) => self.object(obj, depth, indent),
            scalar => {
                let text = format!(
                    "@{}[{}]",
                    simple_type_name(scalar.type_name()),
                    scalar_text(scalar)
                );
                self.push(&text)
            }
        }
    }

    fn object(&mut self, obj: &ObjectRef, depth: u32, indent: usize) -> Result<(), RenderError> {
        let name = obj.simple_type_name().to_owned();
        if self.path.contains(&obj.id()) {
            return self.push(&format!("@{name}[<cycle>]"));
        }

        let body = obj.snapshot();
        if depth >= self.expand {
            let summary = collapsed_summary(&body);
            return self.push(&format!("@{name}[{summary}]"));
        }

        self.path.push(obj.id());
        let result = self.expanded(&name, &body, depth, indent);
        self.path.pop();
        result
    }

    fn expanded(
        &mut self,
        name: &str,
        body: &ObjectBody,
        depth: u32,
        indent: usize,
    ) -> Result<(), RenderError> {
        let is_empty = match body {
            ObjectBody::Plain { fields } => fields.is_empty(),
            ObjectBody::Array { elements, .. } | ObjectBody::List { elements } => {
                elements.is_empty()
            }
            ObjectBody::Map { entries } => entries.is_empty(),
            ObjectBody::Throwable { .. } => false,
        };
        if is_empty {
            return self.push(&format!("@{name}[]"));
        }

        self.push(&format!("@{name}["))?;
        match body {
            ObjectBody::Plain { fields } => {
                for (field, value) in fields {
                    self.newline(indent + 1)?;
                    self.push(&format!("{field}="))?;
                    self.value(value, depth + 1, indent + 1)?;
                    self.push(",")?;
                }
            }
            ObjectBody::Array { elements, .. } | ObjectBody::List { elements } => {
                for element in elements.iter().take(self.size_limit) {
                    self.newline(indent + 1)?;
                    self.value(element, depth + 1, indent + 1)?;
                    self.push(",")?;
                }
                if elements.len() > self.size_limit {
                    self.newline(indent + 1)?;
                    self.push("...")?;
                }
            }
            ObjectBody::Map { entries } => {
                for (key, value) in entries.iter().take(self.size_limit) {
                    self.newline(indent + 1)?;
                    self.value(key, depth + 1, indent + 1)?;
                    self.push(":")?;
                    self.value(value, depth + 1, indent + 1)?;
                    self.push(",")?;
                }
                if entries.len() > self.size_limit {
                    self.newline(indent + 1)?;
                    self.push("...")?;
                }
            }
            ObjectBody::Throwable { message, cause } => {
                self.newline(indent + 1)?;
                self.push("message=")?;
                match message {
                    Some(message) => self.push(&format!("@String[{message}]"))?,
                    None => self.push("null")?,
                }
                self.push(",")?;
                self.newline(indent + 1)?;
                self.push("cause=")?;
                match cause {
                    Some(cause) => self.value(cause, depth + 1, indent + 1)?,
                    None => self.push("null")?,
                }
                self.push(",")?;
            }
        }
        self.newline(indent)?;
        self.push("]")
    }
}

fn collapsed_summary(body: &ObjectBody) -> String {
    let mut out = String::new();
    let _ = match body {
        ObjectBody::Plain { .. } => write!(out, "..."),
        ObjectBody::Array { elements, .. } => write!(out, "length={}", elements.len()),
        ObjectBody::List { elements } => write!(out, "size={}", elements.len()),
        ObjectBody::Map { entries } => write!(out, "size={}", entries.len()),
        ObjectBody::Throwable { message, .. } => write!(out, "{}", message.as_deref().unwrap_or("")),
    };
    out
}
