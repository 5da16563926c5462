use std::sync::Arc;

use nova_watch::{CollectingSink, Invocation, WatchConfig, WatchpointDispatcher};

mod concurrency;
mod failures;
mod output;
mod triggers;

pub(crate) fn collecting(config: WatchConfig) -> (Arc<CollectingSink>, WatchpointDispatcher) {
    let sink = Arc::new(CollectingSink::collecting());
    let dispatcher =
        WatchpointDispatcher::new(config, sink.clone()).expect("watch config should be valid");
    (sink, dispatcher)
}

pub(crate) fn call(method: &str) -> Invocation {
    Invocation::new("com.example.OrderService", method)
}
