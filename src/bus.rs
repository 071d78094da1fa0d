//! Topic-based publish/subscribe registry.
//!
//! Subscriptions are delivered in registration order. A pattern ending in
//! `*` matches every topic sharing its prefix, so `*` alone sees everything
//! and `message#*` sees every channel message.

use std::fmt;

use tracing::trace;

use crate::event::Event;

/// Returned by handlers to stay subscribed or detach.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Unsubscribe,
}

/// Handle for removing a subscription with [`EventBus::off`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Boxed subscriber callback.
pub type Handler = Box<dyn FnMut(&Event) -> Flow + Send>;

enum Pattern {
    Exact(String),
    Prefix(String),
}

impl Pattern {
    fn new(pattern: &str) -> Self {
        match pattern.strip_suffix('*') {
            Some(prefix) => Pattern::Prefix(prefix.to_string()),
            None => Pattern::Exact(pattern.to_string()),
        }
    }

    fn matches(&self, topic: &str) -> bool {
        match self {
            Pattern::Exact(t) => t == topic,
            Pattern::Prefix(p) => topic.starts_with(p.as_str()),
        }
    }
}

struct Subscription {
    id: SubscriptionId,
    pattern: Pattern,
    once: bool,
    handler: Handler,
}

/// Ordered subscriber registry.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, pattern: &str, once: bool, handler: Handler) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscriptions.push(Subscription {
            id,
            pattern: Pattern::new(pattern),
            once,
            handler,
        });
        id
    }

    /// Subscribe for every matching event.
    pub fn on<F>(&mut self, pattern: &str, mut handler: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.insert(
            pattern,
            false,
            Box::new(move |event| {
                handler(event);
                Flow::Continue
            }),
        )
    }

    /// Subscribe for the first matching event only.
    pub fn once<F>(&mut self, pattern: &str, handler: F) -> SubscriptionId
    where
        F: FnOnce(&Event) + Send + 'static,
    {
        let mut handler = Some(handler);
        self.insert(
            pattern,
            true,
            Box::new(move |event| {
                if let Some(handler) = handler.take() {
                    handler(event);
                }
                Flow::Unsubscribe
            }),
        )
    }

    /// Subscribe until the handler returns [`Flow::Unsubscribe`].
    pub fn on_until<F>(&mut self, pattern: &str, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event) -> Flow + Send + 'static,
    {
        self.insert(pattern, false, Box::new(handler))
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        before != self.subscriptions.len()
    }

    /// Deliver `event` to every subscription matching `topic`.
    ///
    /// Returns the number of handlers invoked.
    pub fn publish(&mut self, topic: &str, event: &Event) -> usize {
        self.publish_all(&[topic], event)
    }

    /// Deliver `event` once to every subscription matching any of `topics`.
    ///
    /// A subscription matching several topics (a wildcard over a channel
    /// topic and its lowercase form, say) still sees the event once.
    pub fn publish_all<S: AsRef<str>>(&mut self, topics: &[S], event: &Event) -> usize {
        let mut delivered = 0;
        self.subscriptions.retain_mut(|sub| {
            if !topics.iter().any(|t| sub.pattern.matches(t.as_ref())) {
                return true;
            }
            delivered += 1;
            let flow = (sub.handler)(event);
            !(sub.once || flow == Flow::Unsubscribe)
        });
        trace!(topic = event.topic(), variants = topics.len(), delivered, "published");
        delivered
    }

    /// Publish under the event's base topic.
    pub fn emit(&mut self, event: &Event) -> usize {
        self.publish(event.topic(), event)
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn FnMut(&Event) + Send>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let make = move |tag: &str| {
            let sink = sink.clone();
            let tag = tag.to_string();
            Box::new(move |_: &Event| sink.lock().unwrap().push(tag.clone()))
                as Box<dyn FnMut(&Event) + Send>
        };
        (log, make)
    }

    #[test]
    fn test_exact_and_wildcard_in_order() {
        let (log, make) = recorder();
        let mut bus = EventBus::new();
        bus.on("*", make("all"));
        bus.on("message#rust", make("exact"));
        bus.on("message#*", make("any-channel"));
        bus.on("join", make("join"));

        let event = Event::Opered;
        assert_eq!(bus.publish("message#rust", &event), 3);
        assert_eq!(*log.lock().unwrap(), vec!["all", "exact", "any-channel"]);
    }

    #[test]
    fn test_once_and_off() {
        let (log, make) = recorder();
        let mut bus = EventBus::new();
        let mut once_handler = make("once");
        bus.once("opered", move |e| once_handler(e));
        let id = bus.on("opered", make("persistent"));

        bus.emit(&Event::Opered);
        bus.emit(&Event::Opered);
        assert!(bus.off(id));
        assert!(!bus.off(id));
        bus.emit(&Event::Opered);

        assert_eq!(*log.lock().unwrap(), vec!["once", "persistent", "persistent"]);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_publish_all_delivers_once_per_subscription() {
        let (log, make) = recorder();
        let mut bus = EventBus::new();
        bus.on("message#*", make("any-channel"));
        bus.on("message#Rust", make("exact"));
        bus.on("message#rust", make("lower"));
        bus.on("join", make("join"));

        let topics = ["message", "message#", "message#Rust", "message#rust"];
        assert_eq!(bus.publish_all(&topics, &Event::Opered), 3);
        assert_eq!(*log.lock().unwrap(), vec!["any-channel", "exact", "lower"]);
    }

    #[test]
    fn test_on_until_detaches() {
        let mut bus = EventBus::new();
        let mut seen = 0;
        bus.on_until("ping", move |_| {
            seen += 1;
            if seen == 2 {
                Flow::Unsubscribe
            } else {
                Flow::Continue
            }
        });
        let ping = Event::Ping("x".into());
        assert_eq!(bus.emit(&ping), 1);
        assert_eq!(bus.emit(&ping), 1);
        assert_eq!(bus.emit(&ping), 0);
    }
}
