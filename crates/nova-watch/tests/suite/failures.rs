use std::sync::Arc;

use nova_watch::{
    CollectingSink, ObjectView, SinkEvent, Value, WatchConfig, WatchValue, WatchpointDispatcher,
    FAILURE_EXIT_STATUS,
};
use pretty_assertions::assert_eq;

use super::{call, collecting};

#[test]
fn condition_error_aborts_the_session() {
    let sink = Arc::new(CollectingSink::collecting());
    let dispatcher = WatchpointDispatcher::new(
        WatchConfig::new("returnObj")
            .on_success()
            .condition("params[3] > 0"),
        sink.clone(),
    )
    .expect("valid config")
    .with_log_location("/var/log/nova/nova.log");
    let invocation = call("oops").with_args(vec![Value::Int(1)]);

    for _ in 0..3 {
        dispatcher.on_entry(&invocation);
        dispatcher.on_normal_return(&invocation, &Value::Int(1));
    }

    assert_eq!(
        sink.events(),
        vec![SinkEvent::Abort {
            status: FAILURE_EXIT_STATUS,
            message: "watch failed, condition is: params[3] > 0, express is: returnObj, \
                      index 3 out of bounds for length 1, visit /var/log/nova/nova.log for more details."
                .into(),
        }]
    );
    assert!(dispatcher.is_closed());
    assert_eq!(dispatcher.emitted_count(), 0);
}

#[test]
fn value_expression_error_aborts_after_condition_echo() {
    let sink = Arc::new(CollectingSink::collecting());
    let dispatcher = WatchpointDispatcher::new(
        WatchConfig::new("returnObj.size()")
            .on_success()
            .verbose(true),
        sink.clone(),
    )
    .expect("valid config")
    .with_log_location("stderr");
    let invocation = call("nulls");

    dispatcher.on_entry(&invocation);
    dispatcher.on_normal_return(&invocation, &Value::Null);
    dispatcher.on_entry(&invocation);
    dispatcher.on_normal_return(&invocation, &Value::Null);

    assert_eq!(
        sink.events(),
        vec![
            SinkEvent::Echo {
                text: "Condition express: true , result: true".into(),
            },
            SinkEvent::Abort {
                status: -1,
                message: "watch failed, condition is: true, express is: returnObj.size(), \
                          cannot read `size` of null, visit stderr for more details."
                    .into(),
            },
        ]
    );
}

#[test]
fn render_failure_still_emits_the_record() {
    let sink = Arc::new(CollectingSink::collecting());
    let dispatcher = WatchpointDispatcher::new(
        WatchConfig::new("returnObj").on_success(),
        sink.clone(),
    )
    .expect("valid config")
    .with_renderer(Arc::new(ObjectView::with_max_bytes(16)));
    let invocation = call("huge");
    let big = Value::list((0..100).map(Value::Int).collect());

    dispatcher.on_entry(&invocation);
    dispatcher.on_normal_return(&invocation, &big);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].value(),
        Some(&WatchValue::Channels {
            params: None,
            return_obj: Some("<render failed: rendered output exceeds 16 bytes>".into()),
            throw_exp: None,
        })
    );
    assert!(!dispatcher.is_closed());
}

#[test]
fn verbose_echoes_false_conditions() {
    let (sink, dispatcher) = collecting(
        WatchConfig::new("returnObj")
            .on_success()
            .condition("returnObj > 100")
            .verbose(true),
    );
    let invocation = call("small");

    dispatcher.on_entry(&invocation);
    dispatcher.on_normal_return(&invocation, &Value::Int(5));

    assert_eq!(
        sink.events(),
        vec![SinkEvent::Echo {
            text: "Condition express: returnObj > 100 , result: false".into(),
        }]
    );
}

#[test]
fn blank_condition_always_holds() {
    let (sink, dispatcher) = collecting(
        WatchConfig::new("")
            .on_success()
            .condition("   ")
            .expand(None),
    );
    let invocation = call("blank");

    dispatcher.on_entry(&invocation);
    dispatcher.on_normal_return(&invocation, &Value::Int(5));

    let records = sink.records();
    assert_eq!(records[0].value(), Some(&WatchValue::Text("null".into())));
}

#[test]
fn non_boolean_condition_is_false() {
    let (sink, dispatcher) = collecting(WatchConfig::new("returnObj").on_success().condition("returnObj"));
    let invocation = call("truthy");

    dispatcher.on_entry(&invocation);
    dispatcher.on_normal_return(&invocation, &Value::Int(1));

    assert!(sink.events().is_empty());
    assert!(!dispatcher.is_closed());
}

#[test]
fn failure_message_names_the_configured_log_file() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let log_file = dir.path().join("watch.log");
    nova_config::init_tracing(&nova_config::LoggingConfig {
        stderr: false,
        file: Some(log_file.clone()),
        ..nova_config::LoggingConfig::default()
    });

    let (sink, dispatcher) = collecting(WatchConfig::new("returnObj.size()").on_success());
    let invocation = call("logged");
    dispatcher.on_entry(&invocation);
    dispatcher.on_normal_return(&invocation, &Value::Null);

    let expected = format!(
        "watch failed, condition is: true, express is: returnObj.size(), \
         cannot read `size` of null, visit {} for more details.",
        log_file.display()
    );
    assert_eq!(
        sink.events(),
        vec![SinkEvent::Abort {
            status: FAILURE_EXIT_STATUS,
            message: expected,
        }]
    );
}
