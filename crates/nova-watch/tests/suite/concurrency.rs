use std::sync::{Arc, Barrier};
use std::thread;

use nova_watch::{
    AccessPoint, BasicEvaluator, EvaluationContext, ExpressionError, ExpressionEvaluator,
    SinkEvent, Value, WatchConfig,
};
use pretty_assertions::assert_eq;

use super::{call, collecting};

#[test]
fn limit_holds_across_threads() {
    const THREADS: usize = 8;
    const CALLS: usize = 25;

    let (sink, dispatcher) = collecting(
        WatchConfig::new("returnObj")
            .on_success()
            .invocation_limit(50)
            .expand(None),
    );
    let dispatcher = Arc::new(dispatcher);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let dispatcher = Arc::clone(&dispatcher);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let invocation = call("parallel");
                barrier.wait();
                for i in 0..CALLS {
                    dispatcher.on_entry(&invocation);
                    dispatcher.on_normal_return(&invocation, &Value::Long((t * CALLS + i) as i64));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("watch thread panicked");
    }

    let events = sink.events();
    let records = sink.records();
    assert_eq!(records.iter().filter(|r| !r.is_end()).count(), 50);
    assert_eq!(records.iter().filter(|r| r.is_end()).count(), 1);
    assert_eq!(dispatcher.emitted_count(), 50);

    // The sentinel and the abort come after every admitted record.
    assert_eq!(events.len(), 52);
    assert!(events[50].as_record().is_some_and(|r| r.is_end()));
    assert!(matches!(events[51], SinkEvent::Abort { status: 0, .. }));
}

#[test]
fn nested_calls_on_one_thread_time_their_own_frames() {
    let (sink, dispatcher) = collecting(WatchConfig::new("returnObj").on_success());
    let outer = call("outer");
    let inner = call("inner");

    dispatcher.on_entry(&outer);
    thread::sleep(std::time::Duration::from_millis(20));
    dispatcher.on_entry(&inner);
    dispatcher.on_normal_return(&inner, &Value::Null);
    dispatcher.on_normal_return(&outer, &Value::Null);

    let records = sink.records();
    assert_eq!(records[0].method_name(), "inner");
    assert_eq!(records[1].method_name(), "outer");
    assert!(records[0].cost() < 20.0, "inner: {}", records[0].cost());
    assert!(records[1].cost() >= 20.0, "outer: {}", records[1].cost());
}

#[test]
fn independent_sessions_watch_the_same_call() {
    let (sink_a, a) = collecting(WatchConfig::new("returnObj").on_success().invocation_limit(1));
    let (sink_b, b) = collecting(WatchConfig::new("returnObj").on_success());
    let invocation = call("shared");

    for _ in 0..2 {
        a.on_entry(&invocation);
        b.on_entry(&invocation);
        b.on_normal_return(&invocation, &Value::Null);
        a.on_normal_return(&invocation, &Value::Null);
    }

    assert!(a.is_closed());
    assert!(!b.is_closed());
    assert_eq!(sink_a.records().len(), 2);
    assert_eq!(sink_b.records().len(), 2);
}

/// Parks calls to `held` inside condition evaluation until released.
struct GatedEvaluator {
    inner: BasicEvaluator,
    entered: Barrier,
    release: Barrier,
}

impl ExpressionEvaluator for GatedEvaluator {
    fn evaluate(&self, expr: &str, ctx: &EvaluationContext<'_>) -> Result<Value, ExpressionError> {
        self.inner.evaluate(expr, ctx)
    }

    fn is_condition_met(
        &self,
        expr: &str,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool, ExpressionError> {
        if ctx.invocation().method_name == "held" {
            self.entered.wait();
            self.release.wait();
        }
        self.inner.is_condition_met(expr, ctx)
    }
}

#[test]
fn nothing_is_echoed_after_the_session_closes() {
    let evaluator = Arc::new(GatedEvaluator {
        inner: BasicEvaluator::new(),
        entered: Barrier::new(2),
        release: Barrier::new(2),
    });
    let (sink, dispatcher) = collecting(
        WatchConfig::new("returnObj")
            .on_success()
            .invocation_limit(1)
            .verbose(true)
            .expand(None),
    );
    let dispatcher = Arc::new(dispatcher.with_evaluator(evaluator.clone()));

    let parked = {
        let dispatcher = Arc::clone(&dispatcher);
        thread::spawn(move || {
            let invocation = call("held");
            dispatcher.on_entry(&invocation);
            dispatcher.on_normal_return(&invocation, &Value::Int(0));
        })
    };

    evaluator.entered.wait();
    let fast = call("fast");
    for i in 1..=2 {
        dispatcher.on_entry(&fast);
        dispatcher.on_normal_return(&fast, &Value::Int(i));
    }
    assert!(dispatcher.is_closed());
    evaluator.release.wait();
    parked.join().expect("parked thread panicked");

    let events = sink.events();
    assert_eq!(events.len(), 5, "{events:#?}");
    assert!(matches!(events[0], SinkEvent::Echo { .. }));
    assert_eq!(
        events[1].as_record().map(|r| r.access_point()),
        Some(AccessPoint::Success)
    );
    assert!(matches!(events[2], SinkEvent::Echo { .. }));
    assert_eq!(
        events[3].as_record().map(|r| r.access_point()),
        Some(AccessPoint::End)
    );
    assert!(matches!(events[4], SinkEvent::Abort { status: 0, .. }));
}
