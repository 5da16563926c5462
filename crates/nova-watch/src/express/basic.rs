use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::ExpressionEvaluator;
use crate::context::EvaluationContext;
use crate::error::ExpressionError;
use crate::value::{ObjectBody, Value};

/// Small OGNL-flavoured expression language over an [`EvaluationContext`].
///
/// Supported forms:
///
/// - literals: `null`, `true`, `false`, `42`, `42L`, `1.5`, `"text"`, `'text'`
/// - context names: `params`, `returnObj`, `throwExp`, `varMap`, `cost`, ...
/// - member access: `params.length`, `returnObj.size()`, `throwExp.message`, `target.name`,
///   `varMap.count`
/// - indexing: `params[0]`, `varMap["count"]`
/// - list literals `{a, b}` and top level comma lists `a, b`
/// - `!`, unary `-`, `== != < <= > >=`, `&&`, `||`, parentheses
///
/// Parsed expressions are cached by source text.
#[derive(Debug, Default)]
pub struct BasicEvaluator {
    cache: Mutex<HashMap<String, Arc<Expr>>>,
}

impl BasicEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    fn parsed(&self, source: &str) -> Result<Arc<Expr>, ExpressionError> {
        if let Some(expr) = self.cache.lock().get(source) {
            return Ok(Arc::clone(expr));
        }
        let expr = Arc::new(Parser::new(source).parse()?);
        self.cache
            .lock()
            .insert(source.to_owned(), Arc::clone(&expr));
        Ok(expr)
    }
}

impl ExpressionEvaluator for BasicEvaluator {
    fn evaluate(&self, expr: &str, ctx: &EvaluationContext<'_>) -> Result<Value, ExpressionError> {
        if expr.trim().is_empty() {
            return Ok(Value::Null);
        }
        let parsed = self.parsed(expr)?;
        eval(&parsed, ctx)
    }
}

#[derive(Debug, Clone)]
enum Expr {
    Literal(Value),
    Ident(String),
    Member {
        base: Box<Expr>,
        name: String,
        call: bool,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    List(Vec<Expr>),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

// --- parsing -----------------------------------------------------------------

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn parse(mut self) -> Result<Expr, ExpressionError> {
        let expr = self.parse_sequence()?;
        self.skip_ws();
        match self.peek_char() {
            None => Ok(expr),
            Some(ch) => Err(self.error(format!("unexpected `{ch}`"))),
        }
    }

    fn error(&self, message: impl Into<String>) -> ExpressionError {
        ExpressionError::Syntax {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn rest(&self) -> &str {
        self.text.get(self.pos..).unwrap_or("")
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.bump_char();
        }
    }

    fn consume_char(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek_char() == Some(expected) {
            self.bump_char();
            true
        } else {
            false
        }
    }

    fn consume_str(&mut self, s: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ExpressionError> {
        if self.consume_char(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{expected}`")))
        }
    }

    /// `a, b, c` at the top level evaluates to a list.
    fn parse_sequence(&mut self) -> Result<Expr, ExpressionError> {
        let first = self.parse_or()?;
        if !self.consume_char(',') {
            return Ok(first);
        }
        let mut items = vec![first];
        loop {
            items.push(self.parse_or()?);
            if !self.consume_char(',') {
                break;
            }
        }
        Ok(Expr::List(items))
    }

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.parse_and()?;
        while self.consume_str("||") {
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.parse_comparison()?;
        while self.consume_str("&&") {
            let rhs = self.parse_comparison()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = self.consume_compare_op() {
            let rhs = self.parse_unary()?;
            lhs = Expr::Compare {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn consume_compare_op(&mut self) -> Option<CompareOp> {
        // Two-character operators first so `<=` is not read as `<`.
        [
            CompareOp::Eq,
            CompareOp::Ne,
            CompareOp::Le,
            CompareOp::Ge,
            CompareOp::Lt,
            CompareOp::Gt,
        ]
        .into_iter()
        .find(|op| self.consume_str(op.symbol()))
    }

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        self.skip_ws();
        if self.rest().starts_with('!') && !self.rest().starts_with("!=") {
            self.bump_char();
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        if self.consume_char('-') {
            return Ok(Expr::Neg(Box::new(self.parse_unary()?)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ExpressionError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.consume_char('.') {
                let name = self
                    .parse_ident()
                    .ok_or_else(|| self.error("expected member name after `.`"))?;
                let call = if self.consume_char('(') {
                    self.expect_char(')')?;
                    true
                } else {
                    false
                };
                expr = Expr::Member {
                    base: Box::new(expr),
                    name,
                    call,
                };
            } else if self.consume_char('[') {
                let index = self.parse_or()?;
                self.expect_char(']')?;
                expr = Expr::Index {
                    base: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        self.skip_ws();
        let Some(ch) = self.peek_char() else {
            return Err(self.error("unexpected end of expression"));
        };
        match ch {
            '(' => {
                self.bump_char();
                let inner = self.parse_or()?;
                self.expect_char(')')?;
                Ok(inner)
            }
            '{' => {
                self.bump_char();
                let mut items = Vec::new();
                if !self.consume_char('}') {
                    loop {
                        items.push(self.parse_or()?);
                        if self.consume_char('}') {
                            break;
                        }
                        self.expect_char(',')?;
                    }
                }
                Ok(Expr::List(items))
            }
            '"' | '\'' => self.parse_string(),
            c if c.is_ascii_digit() => self.parse_number(),
            c if is_ident_start(c) => {
                let ident = self
                    .parse_ident()
                    .ok_or_else(|| self.error("expected identifier"))?;
                Ok(match ident.as_str() {
                    "null" => Expr::Literal(Value::Null),
                    "true" => Expr::Literal(Value::Boolean(true)),
                    "false" => Expr::Literal(Value::Boolean(false)),
                    _ => Expr::Ident(ident),
                })
            }
            other => Err(self.error(format!("unexpected `{other}`"))),
        }
    }

    fn parse_ident(&mut self) -> Option<String> {
        self.skip_ws();
        let rest = self.rest();
        let first = rest.chars().next()?;
        if !is_ident_start(first) {
            return None;
        }
        let len = rest
            .char_indices()
            .find(|&(_, ch)| !is_ident_part(ch))
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        let ident = rest[..len].to_owned();
        self.pos += len;
        Some(ident)
    }

    fn parse_number(&mut self) -> Result<Expr, ExpressionError> {
        let start = self.pos;
        let digits = |p: &mut Self| {
            while p.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                p.bump_char();
            }
        };
        digits(self);

        let mut is_decimal = false;
        let after_dot = self.rest().chars().nth(1);
        if self.peek_char() == Some('.') && after_dot.is_some_and(|c| c.is_ascii_digit()) {
            is_decimal = true;
            self.bump_char();
            digits(self);
        }
        let source: &'a str = self.text;
        let text = &source[start..self.pos];

        if is_decimal {
            let value = text
                .parse::<f64>()
                .map_err(|_| self.error(format!("invalid number `{text}`")))?;
            if matches!(self.peek_char(), Some('d' | 'D')) {
                self.bump_char();
            }
            return Ok(Expr::Literal(Value::Double(value)));
        }

        let value = text
            .parse::<i64>()
            .map_err(|_| self.error(format!("integer literal `{text}` is out of range")))?;
        if matches!(self.peek_char(), Some('l' | 'L')) {
            self.bump_char();
            return Ok(Expr::Literal(Value::Long(value)));
        }
        Ok(Expr::Literal(match i32::try_from(value) {
            Ok(v) => Value::Int(v),
            Err(_) => Value::Long(value),
        }))
    }

    fn parse_string(&mut self) -> Result<Expr, ExpressionError> {
        let start = self.pos;
        let Some(quote) = self.bump_char() else {
            return Err(self.error("expected string"));
        };
        let mut out = String::new();
        loop {
            match self.bump_char() {
                None => {
                    self.pos = start;
                    return Err(self.error("unterminated string literal"));
                }
                Some(ch) if ch == quote => break,
                Some('\\') => {
                    let escaped = match self.bump_char() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some(other) => other,
                        None => return Err(self.error("unterminated escape")),
                    };
                    out.push(escaped);
                }
                Some(ch) => out.push(ch),
            }
        }
        Ok(Expr::Literal(Value::string(out)))
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_part(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

// --- evaluation --------------------------------------------------------------

fn eval(expr: &Expr, ctx: &EvaluationContext<'_>) -> Result<Value, ExpressionError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Ident(name) => ctx
            .lookup(name)
            .ok_or_else(|| ExpressionError::UnknownIdentifier(name.clone())),
        Expr::Member { base, name, call } => member(&eval(base, ctx)?, name, *call),
        Expr::Index { base, index } => index_into(&eval(base, ctx)?, &eval(index, ctx)?),
        Expr::List(items) => {
            let values = items
                .iter()
                .map(|item| eval(item, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::list(values))
        }
        Expr::Not(inner) => Ok(Value::Boolean(!expect_bool(&eval(inner, ctx)?, "!")?)),
        Expr::Neg(inner) => negate(&eval(inner, ctx)?),
        Expr::Compare { op, lhs, rhs } => compare(*op, &eval(lhs, ctx)?, &eval(rhs, ctx)?),
        Expr::And(lhs, rhs) => {
            if !expect_bool(&eval(lhs, ctx)?, "&&")? {
                return Ok(Value::Boolean(false));
            }
            Ok(Value::Boolean(expect_bool(&eval(rhs, ctx)?, "&&")?))
        }
        Expr::Or(lhs, rhs) => {
            if expect_bool(&eval(lhs, ctx)?, "||")? {
                return Ok(Value::Boolean(true));
            }
            Ok(Value::Boolean(expect_bool(&eval(rhs, ctx)?, "||")?))
        }
    }
}

fn expect_bool(value: &Value, op: &str) -> Result<bool, ExpressionError> {
    value.as_bool().ok_or_else(|| {
        ExpressionError::Type(format!(
            "operator `{op}` expects a boolean, found {}",
            value.type_name()
        ))
    })
}

fn member(base: &Value, name: &str, call: bool) -> Result<Value, ExpressionError> {
    let no_such_member = || ExpressionError::NoSuchMember {
        type_name: base.type_name().to_owned(),
        member: name.to_owned(),
    };

    match base {
        Value::Null => Err(ExpressionError::NullReference {
            member: name.to_owned(),
        }),
        Value::String(s) => match name {
            "length" => Ok(len_value(s.chars().count())),
            "isEmpty" => Ok(Value::Boolean(s.is_empty())),
            _ => Err(no_such_member()),
        },
        Value::Object(obj) => {
            let body = obj.snapshot();
            match (&body, name) {
                (
                    ObjectBody::Array { elements, .. } | ObjectBody::List { elements },
                    "length" | "size",
                ) => Ok(len_value(elements.len())),
                (ObjectBody::Array { elements, .. } | ObjectBody::List { elements }, "isEmpty") => {
                    Ok(Value::Boolean(elements.is_empty()))
                }
                (ObjectBody::Map { entries }, "size") => Ok(len_value(entries.len())),
                (ObjectBody::Map { entries }, "isEmpty") => Ok(Value::Boolean(entries.is_empty())),
                (ObjectBody::Map { entries }, key) if !call => Ok(entries
                    .iter()
                    .find(|(k, _)| matches!(k, Value::String(s) if &**s == key))
                    .map(|(_, v)| v.clone())
                    .unwrap_or(Value::Null)),
                (ObjectBody::Throwable { message, .. }, "message" | "getMessage") => Ok(message
                    .as_deref()
                    .map(|message| Value::string(message))
                    .unwrap_or(Value::Null)),
                (ObjectBody::Throwable { cause, .. }, "cause" | "getCause") => {
                    Ok(cause.clone().unwrap_or(Value::Null))
                }
                (ObjectBody::Plain { fields }, _) => {
                    let field = if call {
                        getter_field(name)
                    } else {
                        Some(name.to_owned())
                    };
                    field
                        .and_then(|field| fields.iter().find(|(f, _)| *f == field))
                        .map(|(_, v)| v.clone())
                        .ok_or_else(no_such_member)
                }
                _ => Err(no_such_member()),
            }
        }
        _ => Err(no_such_member()),
    }
}

/// `getName` -> `name`, `isReady` -> `ready`.
fn getter_field(method: &str) -> Option<String> {
    let rest = method
        .strip_prefix("get")
        .or_else(|| method.strip_prefix("is"))?;
    let mut chars = rest.chars();
    let first = chars.next()?;
    if !first.is_uppercase() {
        return None;
    }
    Some(first.to_lowercase().chain(chars).collect())
}

fn len_value(len: usize) -> Value {
    i32::try_from(len)
        .map(Value::Int)
        .unwrap_or(Value::Long(len as i64))
}

fn index_into(base: &Value, index: &Value) -> Result<Value, ExpressionError> {
    let Value::Object(obj) = base else {
        return match base {
            Value::Null => Err(ExpressionError::NullReference {
                member: "[]".to_owned(),
            }),
            Value::String(s) => {
                let idx = integral(index)?;
                let len = s.chars().count();
                usize::try_from(idx)
                    .ok()
                    .and_then(|i| s.chars().nth(i))
                    .map(Value::Char)
                    .ok_or(ExpressionError::IndexOutOfBounds { index: idx, len })
            }
            other => Err(ExpressionError::Type(format!(
                "{} cannot be indexed",
                other.type_name()
            ))),
        };
    };

    obj.with_body(|body| match body {
        ObjectBody::Array { elements, .. } | ObjectBody::List { elements } => {
            let idx = integral(index)?;
            usize::try_from(idx)
                .ok()
                .and_then(|i| elements.get(i))
                .cloned()
                .ok_or(ExpressionError::IndexOutOfBounds {
                    index: idx,
                    len: elements.len(),
                })
        }
        ObjectBody::Map { entries } => Ok(entries
            .iter()
            .find(|(k, _)| values_equal(k, index))
            .map(|(_, v)| v.clone())
            .unwrap_or(Value::Null)),
        _ => Err(ExpressionError::Type(format!(
            "{} cannot be indexed",
            obj.runtime_type()
        ))),
    })
}

fn integral(value: &Value) -> Result<i64, ExpressionError> {
    match number(value) {
        Some(Number::Integral(i)) => Ok(i),
        _ => Err(ExpressionError::Type(format!(
            "index must be an integer, found {}",
            value.type_name()
        ))),
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Integral(i64),
    Floating(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Self::Integral(i) => i as f64,
            Self::Floating(f) => f,
        }
    }
}

fn number(value: &Value) -> Option<Number> {
    Some(match value {
        Value::Byte(v) => Number::Integral(i64::from(*v)),
        Value::Short(v) => Number::Integral(i64::from(*v)),
        Value::Int(v) => Number::Integral(i64::from(*v)),
        Value::Long(v) => Number::Integral(*v),
        Value::Char(c) => Number::Integral(i64::from(u32::from(*c))),
        Value::Float(v) => Number::Floating(f64::from(*v)),
        Value::Double(v) => Number::Floating(*v),
        _ => return None,
    })
}

fn negate(value: &Value) -> Result<Value, ExpressionError> {
    Ok(match value {
        Value::Byte(v) => Value::Int(-i32::from(*v)),
        Value::Short(v) => Value::Int(-i32::from(*v)),
        Value::Int(v) => v
            .checked_neg()
            .map(Value::Int)
            .unwrap_or(Value::Long(-i64::from(*v))),
        Value::Long(v) => Value::Long(v.wrapping_neg()),
        Value::Float(v) => Value::Float(-v),
        Value::Double(v) => Value::Double(-v),
        other => {
            return Err(ExpressionError::Type(format!(
                "cannot negate {}",
                other.type_name()
            )))
        }
    })
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (number(lhs), number(rhs)) {
        (Some(Number::Integral(a)), Some(Number::Integral(b))) => a == b,
        (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
        _ => lhs == rhs,
    }
}

fn ordering(lhs: &Value, rhs: &Value, op: CompareOp) -> Result<Ordering, ExpressionError> {
    let ordering = match (number(lhs), number(rhs)) {
        (Some(Number::Integral(a)), Some(Number::Integral(b))) => Some(a.cmp(&b)),
        (Some(a), Some(b)) => a.as_f64().partial_cmp(&b.as_f64()),
        _ => match (lhs, rhs) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        },
    };
    ordering.ok_or_else(|| {
        ExpressionError::Type(format!(
            "cannot compare {} {} {}",
            lhs.type_name(),
            op.symbol(),
            rhs.type_name()
        ))
    })
}

fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> Result<Value, ExpressionError> {
    let result = match op {
        CompareOp::Eq => values_equal(lhs, rhs),
        CompareOp::Ne => !values_equal(lhs, rhs),
        CompareOp::Lt => ordering(lhs, rhs, op)?.is_lt(),
        CompareOp::Le => ordering(lhs, rhs, op)?.is_le(),
        CompareOp::Gt => ordering(lhs, rhs, op)?.is_gt(),
        CompareOp::Ge => ordering(lhs, rhs, op)?.is_ge(),
    };
    Ok(Value::Boolean(result))
}
