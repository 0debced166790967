//! Typed publish/subscribe bus for raw event payloads.
//!
//! The listener receives every payload the dispatch helpers build, whether or
//! not the event is written to the log. External tooling subscribes either by
//! event name ([`DiagnosticObserver::is_enabled`]) or by payload type
//! ([`DiagnosticListener::subscribe_to`]).

use crate::event_data::EventData;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Receives payloads published on a [`DiagnosticListener`].
pub trait DiagnosticObserver: Send + Sync {
    /// Whether this observer wants events named `name`.
    fn is_enabled(&self, name: &str) -> bool {
        let _ = name;
        true
    }

    fn on_event(&self, name: &str, payload: &dyn EventData);
}

/// Handle returned by [`DiagnosticListener::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Observer that only sees payloads of type `P`.
struct TypedObserver<P, F> {
    callback: F,
    _payload: PhantomData<fn(&P)>,
}

impl<P, F> DiagnosticObserver for TypedObserver<P, F>
where
    P: EventData,
    F: Fn(&str, &P) + Send + Sync,
{
    fn on_event(&self, name: &str, payload: &dyn EventData) {
        if let Some(payload) = payload.downcast_ref::<P>() {
            (self.callback)(name, payload);
        }
    }
}

/// A named diagnostics bus.
pub struct DiagnosticListener {
    name: String,
    observers: RwLock<Vec<(SubscriptionId, Arc<dyn DiagnosticObserver>)>>,
    observer_count: AtomicUsize,
    next_id: AtomicU64,
}

impl DiagnosticListener {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            observers: RwLock::new(Vec::new()),
            observer_count: AtomicUsize::new(0),
            next_id: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscribe(&self, observer: Arc<dyn DiagnosticObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut observers = self.observers.write().unwrap_or_else(PoisonError::into_inner);
        observers.push((id, observer));
        self.observer_count.store(observers.len(), Ordering::Release);
        tracing::debug!(listener = %self.name, subscription = id.0, "Observer subscribed");
        id
    }

    /// Subscribe to every payload of type `P`, regardless of event name.
    pub fn subscribe_to<P, F>(&self, callback: F) -> SubscriptionId
    where
        P: EventData,
        F: Fn(&str, &P) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(TypedObserver {
            callback,
            _payload: PhantomData,
        }))
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(sid, _)| *sid != id);
        self.observer_count.store(observers.len(), Ordering::Release);
        observers.len() != before
    }

    /// Whether any observer wants events named `name`.
    ///
    /// Answers without locking when nobody is subscribed.
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        if self.observer_count.load(Ordering::Acquire) == 0 {
            return false;
        }
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(_, observer)| observer.is_enabled(name))
    }

    /// Deliver `payload` to every observer enabled for `name`.
    pub fn publish<P: EventData>(&self, name: &str, payload: &P) {
        if self.observer_count.load(Ordering::Acquire) == 0 {
            return;
        }
        let observers: Vec<Arc<dyn DiagnosticObserver>> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in observers {
            if observer.is_enabled(name) {
                observer.on_event(name, payload);
            }
        }
    }
}

impl Default for DiagnosticListener {
    fn default() -> Self {
        Self::new("sqlmodel")
    }
}

impl std::fmt::Debug for DiagnosticListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticListener")
            .field("name", &self.name)
            .field("observers", &self.observer_count.load(Ordering::Relaxed))
            .finish()
    }
}
