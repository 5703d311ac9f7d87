//! Request dispatch by method pattern.

use tether_core::LogicalEndpoint;
use tracing::{debug, warn};

use super::{RequestHandler, count_unroutable};
use crate::pattern::MethodPattern;
use crate::types::JsonRpcRequest;

/// Fans an inbound request out to every handler whose pattern matches.
#[derive(Default)]
pub struct RequestDispatcher {
    handlers: Vec<(MethodPattern, Box<dyn RequestHandler>)>,
}

impl RequestDispatcher {
    /// Create a dispatcher with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `pattern` (exact name, or prefix ending in `*`).
    pub fn register(&mut self, pattern: &str, handler: impl RequestHandler + 'static) {
        let pattern = MethodPattern::parse(pattern);
        debug!(%pattern, "request handler registered");
        self.handlers.push((pattern, Box::new(handler)));
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Parse `payload` and invoke every matching handler, in registration
    /// order. Returns how many ran.
    pub fn dispatch(&mut self, endpoint: &LogicalEndpoint, payload: &str) -> usize {
        let request: JsonRpcRequest = match serde_json::from_str(payload) {
            Ok(request) => request,
            Err(error) => {
                count_unroutable("malformed_request");
                warn!(%endpoint, %error, "malformed request payload dropped");
                return 0;
            }
        };

        let mut invoked = 0;
        for (pattern, handler) in &mut self.handlers {
            if pattern.matches(&request.method) {
                handler.handle(endpoint, &request);
                invoked += 1;
            }
        }

        if invoked == 0 {
            count_unroutable("no_request_handler");
            warn!(%endpoint, method = %request.method, "no handler for request method");
        }
        invoked
    }
}

impl std::fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let patterns: Vec<String> = self.handlers.iter().map(|(p, _)| p.to_string()).collect();
        f.debug_struct("RequestDispatcher")
            .field("patterns", &patterns)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tether_core::logging::capture_logs;
    use tracing::Level;

    fn payload(method: &str) -> String {
        serde_json::to_string(&JsonRpcRequest::new(1, method, None)).unwrap()
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> impl RequestHandler + 'static {
        let log = Arc::clone(log);
        move |_: &LogicalEndpoint, req: &JsonRpcRequest| {
            log.lock().push(format!("{tag}:{}", req.method));
        }
    }

    #[test]
    fn wildcard_fires_for_prefix_only() {
        let mut dispatcher = RequestDispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        dispatcher.register("build-*", recorder(&log, "build"));
        let endpoint = LogicalEndpoint::from("E");

        assert_eq!(dispatcher.dispatch(&endpoint, &payload("build-start")), 1);
        assert_eq!(dispatcher.dispatch(&endpoint, &payload("build-stop")), 1);
        assert_eq!(dispatcher.dispatch(&endpoint, &payload("deploy")), 0);

        assert_eq!(*log.lock(), vec!["build:build-start", "build:build-stop"]);
    }

    #[test]
    fn every_matching_pattern_fires() {
        let mut dispatcher = RequestDispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        dispatcher.register("build-*", recorder(&log, "wide"));
        dispatcher.register("build-st*", recorder(&log, "narrow"));
        dispatcher.register("build-start", recorder(&log, "exact"));
        dispatcher.register("deploy", recorder(&log, "other"));

        let invoked = dispatcher.dispatch(&LogicalEndpoint::from("E"), &payload("build-start"));
        assert_eq!(invoked, 3);
        assert_eq!(
            *log.lock(),
            vec!["wide:build-start", "narrow:build-start", "exact:build-start"]
        );
    }

    #[test]
    fn handler_receives_endpoint_and_notification() {
        let mut dispatcher = RequestDispatcher::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        dispatcher.register("log", move |ep: &LogicalEndpoint, req: &JsonRpcRequest| {
            *sink.lock() = Some((ep.clone(), req.is_notification()));
        });
        let note = serde_json::to_string(&JsonRpcRequest::notification("log", None)).unwrap();
        let _ = dispatcher.dispatch(&LogicalEndpoint::from("agent"), &note);
        assert_eq!(*seen.lock(), Some((LogicalEndpoint::from("agent"), true)));
    }

    #[test]
    fn unmatched_and_malformed_are_logged() {
        let mut dispatcher = RequestDispatcher::new();
        let (logs, _guard) = capture_logs();
        let endpoint = LogicalEndpoint::from("E");

        assert_eq!(dispatcher.dispatch(&endpoint, &payload("deploy")), 0);
        assert_eq!(dispatcher.dispatch(&endpoint, "{not json"), 0);
        assert!(logs.has_event(Level::WARN, "no handler for request method"));
        assert!(logs.has_event(Level::WARN, "malformed request payload dropped"));
    }
}
