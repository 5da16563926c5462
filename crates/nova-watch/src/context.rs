use crate::event::{AccessPoint, Invocation};
use crate::value::Value;

/// Names the evaluation context binds, in lookup order.
pub const CONTEXT_NAMES: &[&str] = &[
    "params", "target", "returnObj", "throwExp", "varMap", "cost", "clazz", "method", "line",
    "isBefore", "isReturn", "isThrow", "isLine",
];

/// Event-shaped view handed to the expression evaluator.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    access_point: AccessPoint,
    invocation: &'a Invocation,
    return_value: Option<&'a Value>,
    thrown: Option<&'a Value>,
    line: Option<u32>,
    locals: Option<&'a [(String, Value)]>,
    cost: f64,
}

impl<'a> EvaluationContext<'a> {
    pub fn entry(invocation: &'a Invocation, cost: f64) -> Self {
        Self::base(AccessPoint::Entry, invocation, cost)
    }

    pub fn success(invocation: &'a Invocation, return_value: &'a Value, cost: f64) -> Self {
        Self {
            return_value: Some(return_value),
            ..Self::base(AccessPoint::Success, invocation, cost)
        }
    }

    pub fn exception(invocation: &'a Invocation, thrown: &'a Value, cost: f64) -> Self {
        Self {
            thrown: Some(thrown),
            ..Self::base(AccessPoint::Exception, invocation, cost)
        }
    }

    pub fn line(
        invocation: &'a Invocation,
        line: u32,
        locals: &'a [(String, Value)],
        cost: f64,
    ) -> Self {
        Self {
            line: Some(line),
            locals: Some(locals),
            ..Self::base(AccessPoint::Line, invocation, cost)
        }
    }

    fn base(access_point: AccessPoint, invocation: &'a Invocation, cost: f64) -> Self {
        Self {
            access_point,
            invocation,
            return_value: None,
            thrown: None,
            line: None,
            locals: None,
            cost,
        }
    }

    pub fn access_point(&self) -> AccessPoint {
        self.access_point
    }

    pub fn invocation(&self) -> &'a Invocation {
        self.invocation
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Resolve a context name. Returns `None` for names the context does not bind.
    ///
    /// Channels that do not apply to the current event (e.g. `returnObj` at entry) resolve to
    /// `null` rather than `None`, so conditions can test them.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let value = match name {
            "params" => Value::array(self.invocation.args.clone()),
            "target" => self.invocation.target.clone().unwrap_or(Value::Null),
            "returnObj" => self.return_value.cloned().unwrap_or(Value::Null),
            "throwExp" => self.thrown.cloned().unwrap_or(Value::Null),
            "varMap" => match self.locals {
                Some(locals) => Value::map(
                    locals
                        .iter()
                        .map(|(name, value)| (Value::string(name.as_str()), value.clone()))
                        .collect(),
                ),
                None => Value::Null,
            },
            "cost" => Value::Double(self.cost),
            "clazz" => Value::string(self.invocation.class_name.as_str()),
            "method" => Value::string(self.invocation.method_name.as_str()),
            "line" => self
                .line
                .map(|line| Value::Long(i64::from(line)))
                .unwrap_or(Value::Null),
            "isBefore" => Value::Boolean(self.access_point == AccessPoint::Entry),
            "isReturn" => Value::Boolean(self.access_point == AccessPoint::Success),
            "isThrow" => Value::Boolean(self.access_point == AccessPoint::Exception),
            "isLine" => Value::Boolean(self.access_point == AccessPoint::Line),
            _ => return None,
        };
        Some(value)
    }
}
