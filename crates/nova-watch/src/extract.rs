//! Shapes an evaluated value expression into named channels.
//!
//! A value expression like `{params, returnObj}` evaluates to a positional list. Each
//! sub-expression is matched to a channel by name containment (`params[0]` claims the
//! `params` channel), and the list element at the same position becomes the channel value.
//! Matching is textual and deliberately loose; existing watch commands depend on it.
//!
//! A sub-expression naming an earlier channel of the access point never feeds a later one.
//! Entry and line events take the first eligible sub-expression; return events take the
//! last.

use indexmap::IndexMap;
use nova_config::WATCH_TARGET;
use serde::Serialize;

use crate::error::ShapeError;
use crate::event::AccessPoint;
use crate::render::{shallow_text, ObjectRenderer};
use crate::value::{ObjectBody, Value};

/// Rendered payload of a watch record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WatchValue {
    /// The whole evaluated value, unshaped.
    Text(String),
    /// Entry: one entry per parameter.
    Params(Vec<String>),
    /// Normal or exceptional return.
    Channels {
        #[serde(skip_serializing_if = "Option::is_none")]
        params: Option<Vec<String>>,
        #[serde(rename = "returnObj", skip_serializing_if = "Option::is_none")]
        return_obj: Option<String>,
        #[serde(rename = "throwExp", skip_serializing_if = "Option::is_none")]
        throw_exp: Option<String>,
    },
    /// Line: local variables by name, in declaration order.
    Locals(IndexMap<String, String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Channel {
    Params,
    ReturnObj,
    ThrowExp,
    VarMap,
}

impl Channel {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Params => "params",
            Self::ReturnObj => "returnObj",
            Self::ThrowExp => "throwExp",
            Self::VarMap => "varMap",
        }
    }

    /// Channels a record of the given kind carries, in matching order.
    pub(crate) fn for_access_point(access_point: AccessPoint) -> &'static [Channel] {
        match access_point {
            AccessPoint::Entry => &[Self::Params],
            AccessPoint::Success => &[Self::Params, Self::ReturnObj],
            AccessPoint::Exception => &[Self::Params, Self::ThrowExp],
            AccessPoint::Line => &[Self::VarMap],
            AccessPoint::End => &[],
        }
    }
}

/// Name of the local that is never copied into a line snapshot.
const RECEIVER_LOCAL: &str = "this";

pub struct ResultExtractor<'a> {
    renderer: &'a dyn ObjectRenderer,
    expand: Option<u32>,
    size_limit: usize,
}

impl<'a> ResultExtractor<'a> {
    pub fn new(renderer: &'a dyn ObjectRenderer, expand: Option<u32>, size_limit: usize) -> Self {
        Self {
            renderer,
            expand,
            size_limit,
        }
    }

    /// Render one value, replacing it with a placeholder if rendering fails.
    pub fn render_leaf(&self, value: &Value) -> String {
        let Some(expand) = self.expand else {
            return shallow_text(value);
        };
        match self.renderer.render(value, expand, self.size_limit) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(
                    target: WATCH_TARGET,
                    error = %err,
                    type_name = value.type_name(),
                    "failed to render watched value"
                );
                format!("<render failed: {err}>")
            }
        }
    }

    pub fn extract(&self, kind: AccessPoint, expression: &str, value: &Value) -> WatchValue {
        let raw = || WatchValue::Text(self.render_leaf(value));

        let expression = expression.trim();
        if expression.is_empty() {
            return raw();
        }

        let sub_expressions = split_sub_expressions(expression);
        let list_expression = is_list_expression(expression, &sub_expressions);
        let positional = if list_expression {
            list_elements(value)
        } else {
            None
        };

        let channels = Channel::for_access_point(kind);
        let mut matched: Vec<(Channel, Value)> = Vec::new();
        for (pos, &channel) in channels.iter().enumerate() {
            let Some(idx) = channel_position(kind, channel, &channels[..pos], &sub_expressions)
            else {
                continue;
            };
            let channel_value = match &positional {
                Some(elements) => match elements.get(idx) {
                    Some(element) => element.clone(),
                    None => continue,
                },
                None if !list_expression => value.clone(),
                // A list expression whose result is not a list has no positions to map.
                None => return raw(),
            };
            matched.push((channel, channel_value));
        }

        if matched.is_empty() {
            return raw();
        }

        match self.shape(kind, &matched) {
            Ok(shaped) => shaped,
            Err(err) => {
                tracing::warn!(
                    target: WATCH_TARGET,
                    error = %err,
                    expression,
                    "watch value has an unexpected shape; storing it unshaped"
                );
                raw()
            }
        }
    }

    fn shape(&self, kind: AccessPoint, matched: &[(Channel, Value)]) -> Result<WatchValue, ShapeError> {
        match kind {
            AccessPoint::Entry => {
                let params = matched
                    .iter()
                    .find(|(channel, _)| *channel == Channel::Params)
                    .map(|(_, value)| self.render_params(value))
                    .transpose()?
                    .unwrap_or_default();
                Ok(WatchValue::Params(params))
            }
            AccessPoint::Line => {
                let mut locals = IndexMap::new();
                if let Some((_, value)) = matched.iter().find(|(c, _)| *c == Channel::VarMap) {
                    let entries = value.map_entries().ok_or_else(|| ShapeError::UnexpectedShape {
                        channel: Channel::VarMap.name(),
                        expected: "a map",
                        found: value.type_name().to_owned(),
                    })?;
                    for (key, local) in entries {
                        let name = shallow_text(&key);
                        if name == RECEIVER_LOCAL {
                            continue;
                        }
                        locals.insert(name, self.render_leaf(&local));
                    }
                }
                Ok(WatchValue::Locals(locals))
            }
            AccessPoint::Success | AccessPoint::Exception | AccessPoint::End => {
                let mut params = None;
                let mut return_obj = None;
                let mut throw_exp = None;
                for (channel, value) in matched {
                    match channel {
                        Channel::Params => params = Some(self.render_params(value)?),
                        Channel::ReturnObj => return_obj = Some(self.render_leaf(value)),
                        Channel::ThrowExp => throw_exp = Some(self.render_leaf(value)),
                        Channel::VarMap => {}
                    }
                }
                Ok(WatchValue::Channels {
                    params,
                    return_obj,
                    throw_exp,
                })
            }
        }
    }

    fn render_params(&self, value: &Value) -> Result<Vec<String>, ShapeError> {
        let elements = value
            .sequence_elements()
            .ok_or_else(|| ShapeError::UnexpectedShape {
                channel: Channel::Params.name(),
                expected: "an array",
                found: value.type_name().to_owned(),
            })?;
        Ok(elements.iter().map(|param| self.render_leaf(param)).collect())
    }
}

/// `{a, b}` -> `["a", "b"]`. Commas inside calls or literals are not special-cased.
fn channel_position(
    kind: AccessPoint,
    channel: Channel,
    earlier: &[Channel],
    sub_expressions: &[&str],
) -> Option<usize> {
    let eligible = |idx: &usize| {
        let sub = sub_expressions[*idx];
        sub.contains(channel.name()) && !earlier.iter().any(|c| sub.contains(c.name()))
    };
    let mut positions = 0..sub_expressions.len();
    match kind {
        AccessPoint::Success | AccessPoint::Exception => positions.rev().find(eligible),
        _ => positions.find(eligible),
    }
}

fn split_sub_expressions(expression: &str) -> Vec<&str> {
    let inner = expression
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or(expression);
    inner.split(',').map(str::trim).collect()
}

fn is_list_expression(expression: &str, sub_expressions: &[&str]) -> bool {
    (expression.starts_with('{') && expression.ends_with('}')) || sub_expressions.len() > 1
}

fn list_elements(value: &Value) -> Option<Vec<Value>> {
    value.as_object()?.with_body(|body| match body {
        ObjectBody::List { elements } => Some(elements.clone()),
        _ => None,
    })
}
