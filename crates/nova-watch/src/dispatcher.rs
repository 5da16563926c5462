use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use nova_config::{active_log_location, WATCH_TARGET};
use parking_lot::Mutex;

use crate::config::WatchConfig;
use crate::context::EvaluationContext;
use crate::error::{ExpressionError, WatchConfigError};
use crate::event::{Invocation, InvocationEvent};
use crate::express::{BasicEvaluator, ExpressionEvaluator};
use crate::extract::ResultExtractor;
use crate::limit::{Admission, LimitGovernor};
use crate::record::WatchRecord;
use crate::render::{ObjectRenderer, ObjectView};
use crate::sink::OutputSink;
use crate::timer::InvocationTimer;
use crate::value::Value;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Exit status reported when the invocation limit ends a session.
pub const LIMIT_EXIT_STATUS: i32 = 0;
/// Exit status reported when an expression fails.
pub const FAILURE_EXIT_STATUS: i32 = -1;

/// State owned by one watch command.
#[derive(Debug)]
pub struct WatchSession {
    id: u64,
    config: WatchConfig,
    governor: LimitGovernor,
    closed: AtomicBool,
    /// Orders records, the end sentinel and aborts across threads.
    emit_lock: Mutex<()>,
    log_location: String,
}

impl WatchSession {
    fn new(config: WatchConfig) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            governor: LimitGovernor::new(config.invocation_limit),
            config,
            closed: AtomicBool::new(false),
            emit_lock: Mutex::new(()),
            log_location: active_log_location(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn emitted_count(&self) -> u64 {
        self.governor.emitted()
    }
}

/// Turns instrumentation callbacks into watch records for one session.
///
/// Shared across application threads behind an `Arc`; every callback runs inline on the
/// thread that triggered it.
pub struct WatchpointDispatcher {
    session: WatchSession,
    timer: InvocationTimer,
    evaluator: Arc<dyn ExpressionEvaluator>,
    renderer: Arc<dyn ObjectRenderer>,
    sink: Arc<dyn OutputSink>,
}

impl std::fmt::Debug for WatchpointDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchpointDispatcher")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl WatchpointDispatcher {
    pub fn new(config: WatchConfig, sink: Arc<dyn OutputSink>) -> Result<Self, WatchConfigError> {
        config.validate()?;
        let renderer = Arc::new(ObjectView::with_max_bytes(config.max_render_bytes));
        let session = WatchSession::new(config);
        let timer = InvocationTimer::new(session.id);
        tracing::debug!(
            target: WATCH_TARGET,
            session = session.id,
            condition = %session.config.condition,
            express = %session.config.express,
            "watch session started"
        );
        Ok(Self {
            session,
            timer,
            evaluator: Arc::new(BasicEvaluator::new()),
            renderer,
            sink,
        })
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ObjectRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Where detailed logs can be found; quoted in failure messages. Defaults to wherever
    /// `nova_config::init_tracing` sent them.
    pub fn with_log_location(mut self, location: impl Into<String>) -> Self {
        self.session.log_location = location.into();
        self
    }

    pub fn session(&self) -> &WatchSession {
        &self.session
    }

    pub fn emitted_count(&self) -> u64 {
        self.session.emitted_count()
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_closed()
    }

    pub fn dispatch(&self, event: &InvocationEvent) {
        match event {
            InvocationEvent::Entry { invocation } => self.on_entry(invocation),
            InvocationEvent::NormalReturn {
                invocation,
                return_value,
            } => self.on_normal_return(invocation, return_value),
            InvocationEvent::ExceptionalReturn { invocation, thrown } => {
                self.on_exceptional_return(invocation, thrown)
            }
            InvocationEvent::LineReached {
                invocation,
                line,
                locals,
            } => self.on_line_reached(invocation, *line, locals),
        }
    }

    pub fn on_entry(&self, invocation: &Invocation) {
        self.timer.start();
        if !self.session.config.before {
            return;
        }
        let cost = self.timer.peek_cost_ms();
        self.run(&EvaluationContext::entry(invocation, cost));
    }

    pub fn on_normal_return(&self, invocation: &Invocation, return_value: &Value) {
        let cost = self.timer.stop_cost_ms();
        let config = &self.session.config;
        if config.success || config.is_finish() {
            self.run(&EvaluationContext::success(invocation, return_value, cost));
        }
    }

    pub fn on_exceptional_return(&self, invocation: &Invocation, thrown: &Value) {
        let cost = self.timer.stop_cost_ms();
        let config = &self.session.config;
        if config.exception || config.is_finish() {
            self.run(&EvaluationContext::exception(invocation, thrown, cost));
        }
    }

    pub fn on_line_reached(&self, invocation: &Invocation, line: u32, locals: &[(String, Value)]) {
        if !self.session.config.in_line_range(line) {
            return;
        }
        let cost = self.timer.peek_cost_ms();
        self.run(&EvaluationContext::line(invocation, line, locals, cost));
    }

    fn run(&self, ctx: &EvaluationContext<'_>) {
        if self.session.is_closed() {
            return;
        }
        let config = &self.session.config;

        let condition_met = match self.evaluator.is_condition_met(&config.condition, ctx) {
            Ok(met) => met,
            Err(err) => return self.fail(&err),
        };
        if config.verbose {
            let _guard = self.session.emit_lock.lock();
            if self.session.is_closed() {
                return;
            }
            self.sink.echo(&format!(
                "Condition express: {} , result: {condition_met}",
                config.condition
            ));
        }
        if !condition_met {
            return;
        }

        let value = match self.evaluator.evaluate(&config.express, ctx) {
            Ok(value) => value,
            Err(err) => return self.fail(&err),
        };
        let extractor = ResultExtractor::new(&*self.renderer, config.expand, config.size_limit);
        let shaped = extractor.extract(ctx.access_point(), &config.express, &value);

        let _guard = self.session.emit_lock.lock();
        if self.session.is_closed() {
            return;
        }
        match self.session.governor.admit() {
            Admission::Emit => self.sink.record(WatchRecord::new(
                ctx.access_point(),
                ctx.invocation(),
                ctx.cost(),
                shaped,
                config.expand,
                config.size_limit,
            )),
            Admission::Trip => {
                self.session.closed.store(true, Ordering::Release);
                self.sink.record(WatchRecord::end(
                    ctx.invocation(),
                    ctx.cost(),
                    config.expand,
                    config.size_limit,
                ));
                let limit = self.session.governor.limit();
                tracing::info!(
                    target: WATCH_TARGET,
                    session = self.session.id,
                    limit,
                    "watch invocation limit reached"
                );
                self.sink.abort(
                    LIMIT_EXIT_STATUS,
                    &format!(
                        "Command execution times exceed limit: {limit}, so command will exit. You can set it with -n option."
                    ),
                );
            }
            Admission::Refuse => {}
        }
    }

    /// Expression failures end the session; the first one wins.
    fn fail(&self, err: &ExpressionError) {
        let _guard = self.session.emit_lock.lock();
        if self.session.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let config = &self.session.config;
        tracing::warn!(
            target: WATCH_TARGET,
            session = self.session.id,
            error = %err,
            condition = %config.condition,
            express = %config.express,
            "watch expression failed"
        );
        self.sink.abort(
            FAILURE_EXIT_STATUS,
            &format!(
                "watch failed, condition is: {}, express is: {}, {err}, visit {} for more details.",
                config.condition, config.express, self.session.log_location
            ),
        );
    }
}
