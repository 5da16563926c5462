//! Runtime watchpoint engine.
//!
//! An instrumented call site reports [`InvocationEvent`]s (entry, normal return, exceptional
//! return, line reached). A [`WatchpointDispatcher`] turns them into [`WatchRecord`]s for one
//! watch session:
//!
//! 1. the per-frame [`InvocationTimer`] measures the call's cost,
//! 2. the session's condition is evaluated against an [`EvaluationContext`],
//! 3. the value expression is evaluated and shaped into channels by the [`ResultExtractor`],
//!    each leaf rendered by an [`ObjectRenderer`],
//! 4. the [`LimitGovernor`] admits the record or ends the session with a `watchEnd` sentinel.
//!
//! ```
//! use std::sync::Arc;
//! use nova_watch::{CollectingSink, Invocation, Value, WatchConfig, WatchpointDispatcher};
//!
//! let sink = Arc::new(CollectingSink::collecting());
//! let config = WatchConfig::new("returnObj").on_success().expand(None);
//! let dispatcher = WatchpointDispatcher::new(config, sink.clone()).unwrap();
//!
//! let call = Invocation::new("com.example.Pricing", "quote");
//! dispatcher.on_entry(&call);
//! dispatcher.on_normal_return(&call, &Value::Int(42));
//!
//! assert_eq!(sink.records().len(), 1);
//! ```

mod config;
mod context;
mod dispatcher;
mod error;
mod event;
mod express;
mod extract;
mod limit;
mod line_range;
mod record;
mod render;
mod sink;
mod timer;
mod value;

pub use config::{WatchConfig, DEFAULT_CONDITION, DEFAULT_EXPRESS};
pub use context::{EvaluationContext, CONTEXT_NAMES};
pub use dispatcher::{WatchSession, WatchpointDispatcher, FAILURE_EXIT_STATUS, LIMIT_EXIT_STATUS};
pub use error::{ExpressionError, RenderError, WatchConfigError};
pub use event::{AccessPoint, Invocation, InvocationEvent};
pub use express::{BasicEvaluator, ExpressionEvaluator};
pub use extract::{ResultExtractor, WatchValue};
pub use limit::{Admission, LimitGovernor};
pub use line_range::LineRange;
pub use record::WatchRecord;
pub use render::{shallow_text, ObjectRenderer, ObjectView, DEFAULT_MAX_RENDER_BYTES, MAX_EXPAND};
pub use sink::{
    ChannelSink, CollectingSink, JsonLinesWriter, OutputSink, RecordWriter, SerializedSink,
    SinkEvent,
};
pub use timer::InvocationTimer;
pub use value::{ObjectBody, ObjectId, ObjectRef, Value};
