use serde::Serialize;
use time::OffsetDateTime;

use crate::event::{AccessPoint, Invocation};
use crate::extract::WatchValue;

/// One emitted observation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchRecord {
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    cost: f64,
    access_point: AccessPoint,
    class_name: String,
    method_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<WatchValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expand: Option<u32>,
    size_limit: usize,
}

impl WatchRecord {
    pub fn new(
        access_point: AccessPoint,
        invocation: &Invocation,
        cost: f64,
        value: WatchValue,
        expand: Option<u32>,
        size_limit: usize,
    ) -> Self {
        Self {
            timestamp: OffsetDateTime::now_utc(),
            cost: cost.max(0.0),
            access_point,
            class_name: invocation.class_name.clone(),
            method_name: invocation.method_name.clone(),
            value: Some(value),
            expand,
            size_limit,
        }
    }

    /// Sentinel marking that the session hit its invocation limit.
    pub fn end(invocation: &Invocation, cost: f64, expand: Option<u32>, size_limit: usize) -> Self {
        Self {
            timestamp: OffsetDateTime::now_utc(),
            cost: cost.max(0.0),
            access_point: AccessPoint::End,
            class_name: invocation.class_name.clone(),
            method_name: invocation.method_name.clone(),
            value: None,
            expand,
            size_limit,
        }
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn access_point(&self) -> AccessPoint {
        self.access_point
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn value(&self) -> Option<&WatchValue> {
        self.value.as_ref()
    }

    pub fn expand(&self) -> Option<u32> {
        self.expand
    }

    pub fn size_limit(&self) -> usize {
        self.size_limit
    }

    pub fn is_end(&self) -> bool {
        self.access_point == AccessPoint::End
    }
}
