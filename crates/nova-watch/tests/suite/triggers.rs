use nova_watch::{
    AccessPoint, InvocationEvent, LineRange, SinkEvent, Value, WatchConfig, WatchValue,
};
use pretty_assertions::assert_eq;

use super::{call, collecting};

fn return_obj(text: &str) -> WatchValue {
    WatchValue::Channels {
        params: None,
        return_obj: Some(text.to_owned()),
        throw_exp: None,
    }
}

#[test]
fn success_only_stops_after_the_limit() {
    let (sink, dispatcher) =
        collecting(WatchConfig::new("returnObj").on_success().invocation_limit(3));
    let invocation = call("total");

    for i in 1..=5 {
        dispatcher.on_entry(&invocation);
        dispatcher.on_normal_return(&invocation, &Value::Int(i));
    }

    let events = sink.events();
    assert_eq!(events.len(), 5, "{events:#?}");

    let records = sink.records();
    let values: Vec<_> = records[..3].iter().map(|r| r.value().cloned()).collect();
    assert_eq!(
        values,
        vec![
            Some(return_obj("@Integer[1]")),
            Some(return_obj("@Integer[2]")),
            Some(return_obj("@Integer[3]")),
        ]
    );
    assert!(records[..3]
        .iter()
        .all(|r| r.access_point() == AccessPoint::Success));

    let end = &records[3];
    assert!(end.is_end());
    assert_eq!(end.value(), None);

    assert_eq!(
        events[4],
        SinkEvent::Abort {
            status: 0,
            message: "Command execution times exceed limit: 3, so command will exit. You can set it with -n option.".into(),
        }
    );
    assert_eq!(dispatcher.emitted_count(), 3);
    assert!(dispatcher.is_closed());
}

#[test]
fn exception_only_ignores_normal_returns() {
    let (sink, dispatcher) = collecting(
        WatchConfig::new("{params, throwExp}")
            .on_exception()
            .expand(None),
    );
    let invocation = call("charge").with_args(vec![Value::Long(7)]);
    let thrown = Value::throwable("java.lang.IllegalStateException", Some("card declined"));

    dispatcher.on_entry(&invocation);
    dispatcher.on_exceptional_return(&invocation, &thrown);
    dispatcher.on_entry(&invocation);
    dispatcher.on_normal_return(&invocation, &Value::Boolean(true));

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].access_point(), AccessPoint::Exception);
    assert_eq!(records[0].class_name(), "com.example.OrderService");
    assert_eq!(records[0].method_name(), "charge");
    assert_eq!(
        records[0].value(),
        Some(&WatchValue::Channels {
            params: Some(vec!["7".into()]),
            return_obj: None,
            throw_exp: Some("java.lang.IllegalStateException: card declined".into()),
        })
    );
}

#[test]
fn shallow_rendering_without_expand() {
    let (sink, dispatcher) = collecting(WatchConfig::new("returnObj").on_success().expand(None));
    let invocation = call("count");

    dispatcher.on_entry(&invocation);
    dispatcher.on_normal_return(&invocation, &Value::Int(42));

    let records = sink.records();
    assert_eq!(records[0].value(), Some(&return_obj("42")));
    assert_eq!(records[0].expand(), None);
}

#[test]
fn entry_records_render_each_parameter() {
    let (sink, dispatcher) = collecting(WatchConfig::default().on_entry().expand(None));
    let invocation = call("place").with_args(vec![Value::string("sku-1"), Value::Int(2)]);

    dispatcher.on_entry(&invocation);
    dispatcher.on_normal_return(&invocation, &Value::Null);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].access_point(), AccessPoint::Entry);
    assert_eq!(
        records[0].value(),
        Some(&WatchValue::Params(vec!["sku-1".into(), "2".into()]))
    );
}

#[test]
fn unset_trigger_emits_nothing() {
    let (sink, dispatcher) = collecting(WatchConfig::new("throwExp").on_success());
    let invocation = call("noop");

    dispatcher.on_entry(&invocation);
    dispatcher.on_exceptional_return(&invocation, &Value::throwable("java.lang.Error", None));

    assert!(sink.events().is_empty());
    assert_eq!(dispatcher.emitted_count(), 0);
}

#[test]
fn no_trigger_at_all_watches_the_finish() {
    let (sink, dispatcher) = collecting(WatchConfig::new("{returnObj, throwExp}").expand(None));
    let invocation = call("finish");

    dispatcher.on_entry(&invocation);
    dispatcher.on_normal_return(&invocation, &Value::Int(5));
    dispatcher.on_entry(&invocation);
    dispatcher.on_exceptional_return(
        &invocation,
        &Value::throwable("java.io.IOException", Some("eof")),
    );

    let records = sink.records();
    let kinds: Vec<_> = records.iter().map(|r| r.access_point()).collect();
    assert_eq!(kinds, vec![AccessPoint::Success, AccessPoint::Exception]);
    assert_eq!(records[0].value(), Some(&return_obj("5")));
    assert_eq!(
        records[1].value(),
        Some(&WatchValue::Channels {
            params: None,
            return_obj: None,
            throw_exp: Some("java.io.IOException: eof".into()),
        })
    );
}

#[test]
fn finish_and_success_emit_once_per_return() {
    let (sink, dispatcher) = collecting(
        WatchConfig::new("returnObj")
            .on_success()
            .on_finish()
            .expand(None),
    );
    let invocation = call("both");

    dispatcher.on_entry(&invocation);
    dispatcher.on_normal_return(&invocation, &Value::Int(1));

    assert_eq!(sink.records().len(), 1);
    assert_eq!(dispatcher.emitted_count(), 1);
}

#[test]
fn condition_filters_records() {
    let (sink, dispatcher) = collecting(
        WatchConfig::new("returnObj")
            .on_success()
            .condition("params[0] > 10 && returnObj != null")
            .expand(None),
    );

    for arg in [5, 15] {
        let invocation = call("filter").with_args(vec![Value::Int(arg)]);
        dispatcher.on_entry(&invocation);
        dispatcher.on_normal_return(&invocation, &Value::Int(arg * 2));
    }

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].value(), Some(&return_obj("30")));
}

#[test]
fn cost_covers_the_whole_call() {
    let (sink, dispatcher) = collecting(WatchConfig::new("returnObj").on_success());
    let invocation = call("slow");

    dispatcher.on_entry(&invocation);
    std::thread::sleep(std::time::Duration::from_millis(15));
    dispatcher.on_normal_return(&invocation, &Value::Null);

    let cost = sink.records()[0].cost();
    assert!(cost >= 15.0, "cost should include the sleep: {cost}");
}

#[test]
fn return_without_entry_has_zero_cost() {
    let (sink, dispatcher) = collecting(WatchConfig::new("returnObj").on_success());
    dispatcher.on_normal_return(&call("attached"), &Value::Null);

    assert_eq!(sink.records()[0].cost(), 0.0);
}

#[test]
fn dispatch_routes_every_event_kind() {
    let (sink, dispatcher) = collecting(
        WatchConfig::new("method")
            .on_entry()
            .on_success()
            .on_exception()
            .lines([LineRange::new(10, 12).expect("valid range")])
            .expand(None),
    );
    let settle = call("settle");
    let refund = call("refund");
    let events = [
        InvocationEvent::Entry {
            invocation: settle.clone(),
        },
        InvocationEvent::LineReached {
            invocation: settle.clone(),
            line: 11,
            locals: vec![("n".to_owned(), Value::Int(1))],
        },
        InvocationEvent::LineReached {
            invocation: settle.clone(),
            line: 30,
            locals: Vec::new(),
        },
        InvocationEvent::NormalReturn {
            invocation: settle,
            return_value: Value::Null,
        },
        InvocationEvent::Entry {
            invocation: refund.clone(),
        },
        InvocationEvent::ExceptionalReturn {
            invocation: refund,
            thrown: Value::throwable("java.lang.IllegalStateException", Some("closed")),
        },
    ];

    for event in &events {
        dispatcher.dispatch(event);
    }

    let emitted: Vec<_> = sink
        .records()
        .iter()
        .map(|r| (r.access_point(), r.value().cloned()))
        .collect();
    let text = |s: &str| Some(WatchValue::Text(s.to_owned()));
    assert_eq!(
        emitted,
        vec![
            (AccessPoint::Entry, text("settle")),
            (AccessPoint::Line, text("settle")),
            (AccessPoint::Success, text("settle")),
            (AccessPoint::Entry, text("refund")),
            (AccessPoint::Exception, text("refund")),
        ]
    );
}
