use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("gemshell.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("gemshell.client.request_errors");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("gemshell.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("gemshell.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("gemshell.stream.bytes");

pub(crate) static LOADER_PROBES: Counter = Counter::new("gemshell.loader.probes");
pub(crate) static LOADER_PROBE_FAILURES: Counter =
    Counter::new("gemshell.loader.probe_failures");
pub(crate) static LOADER_ACCEPTED: Counter = Counter::new("gemshell.loader.accepted");
pub(crate) static LOADER_REJECTED: Counter = Counter::new("gemshell.loader.rejected");
pub(crate) static LOADER_BYTES: Moments = Moments::new("gemshell.loader.bytes");

pub(crate) static DISPATCH_TURNS: Counter = Counter::new("gemshell.dispatch.turns");
pub(crate) static QUERY_FRAGMENTS: Moments = Moments::new("gemshell.query.fragments");
pub(crate) static QUERY_FAILURES: Counter = Counter::new("gemshell.query.failures");
pub(crate) static EXTRACT_MALFORMED: Counter = Counter::new("gemshell.extract.malformed");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);

    collector.register_counter(&LOADER_PROBES);
    collector.register_counter(&LOADER_PROBE_FAILURES);
    collector.register_counter(&LOADER_ACCEPTED);
    collector.register_counter(&LOADER_REJECTED);
    collector.register_moments(&LOADER_BYTES);

    collector.register_counter(&DISPATCH_TURNS);
    collector.register_moments(&QUERY_FRAGMENTS);
    collector.register_counter(&QUERY_FAILURES);
    collector.register_counter(&EXTRACT_MALFORMED);
}
