use std::sync::Arc;

use nova_watch::{JsonLinesWriter, SerializedSink, Value, WatchConfig, WatchpointDispatcher};
use pretty_assertions::assert_eq;
use serde_json::json;

use super::call;

#[test]
fn json_lines_carry_the_record_shape() {
    let sink = Arc::new(SerializedSink::new(JsonLinesWriter::new(Vec::<u8>::new())));
    let dispatcher = WatchpointDispatcher::new(
        WatchConfig::default().on_success().invocation_limit(1),
        sink.clone(),
    )
    .expect("valid config");
    let invocation = call("json").with_args(vec![Value::string("a")]);

    for _ in 0..2 {
        dispatcher.on_entry(&invocation);
        dispatcher.on_normal_return(&invocation, &Value::Boolean(true));
    }

    let text = sink.with_writer(|w| String::from_utf8(w.get_ref().clone()).expect("utf-8"));
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid json line"))
        .collect();
    assert_eq!(lines.len(), 3);

    let mut first = lines[0].clone();
    let obj = first.as_object_mut().expect("record is an object");
    let timestamp = obj.remove("timestamp").expect("timestamp present");
    assert!(timestamp.as_str().is_some_and(|ts| ts.contains('T')));
    assert!(obj.remove("cost").is_some_and(|cost| cost.as_f64() >= Some(0.0)));
    assert_eq!(
        first,
        json!({
            "type": "record",
            "accessPoint": "AtExit",
            "className": "com.example.OrderService",
            "methodName": "json",
            "value": {
                "params": ["@String[a]"],
                "returnObj": "@Boolean[true]",
            },
            "expand": 1,
            "sizeLimit": 100,
        })
    );

    assert_eq!(lines[1]["accessPoint"], "watchEnd");
    assert!(lines[1].get("value").is_none());
    assert_eq!(lines[2]["type"], "abort");
    assert_eq!(lines[2]["status"], 0);
}
