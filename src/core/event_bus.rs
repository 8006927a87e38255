//! Pub/Sub Event Bus for decoupled component communication.
//!
//! Architecture:
//! - Components subscribe to event types with callbacks (immediate invocation)
//! - emit() invokes callbacks immediately AND queues for deferred processing
//! - poll() returns queued events for batch processing in main loop
//!
//! Callback order: FIFO (first-subscribed, first-called) within same event type.
//! Cross-type order undefined - don't rely on ordering between different event types.
//!
//! Subscriptions made with `subscribe_scoped()` return a [`ListenerGuard`];
//! dropping the guard unsubscribes. Views that own keyboard listeners hold the
//! guard for as long as they are mounted, so every teardown path (including
//! unwinding) releases the binding exactly once.

use log::{trace, warn};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

/// Maximum events in queue before oldest are evicted
const MAX_QUEUE_SIZE: usize = 1000;

/// Marker trait for events. Events must be Send + Sync + 'static.
pub trait Event: Any + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

// Blanket impl for all qualifying types
impl<T: Any + Send + Sync + 'static> Event for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Type-erased callback
type Callback = Arc<dyn Fn(&dyn Any) + Send + Sync>;

/// Boxed event for queue storage
pub type BoxedEvent = Box<dyn Event>;

/// Handle identifying one subscription
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscribers = RwLock<HashMap<TypeId, Vec<(SubscriptionId, Callback)>>>;

/// Pub/Sub Event Bus with deferred processing support.
///
/// Two modes of operation:
/// 1. Immediate: subscribe() + emit() triggers callbacks instantly
/// 2. Deferred: emit() also queues events for poll() in main loop
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Subscribers>,
    queue: Arc<Mutex<Vec<BoxedEvent>>>,
    next_id: Arc<AtomicU64>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            queue: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    // ========== Pub/Sub (immediate) ==========

    /// Subscribe to events of type E.
    ///
    /// Callback is invoked immediately when emit() is called. The subscription
    /// lives until `unsubscribe()`; prefer `subscribe_scoped()` for listeners
    /// tied to a view's lifetime.
    pub fn subscribe<E, F>(&self, callback: F) -> SubscriptionId
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let wrapped: Callback = Arc::new(move |any: &dyn Any| {
            if let Some(event) = any.downcast_ref::<E>() {
                callback(event);
            }
        });
        self.subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(TypeId::of::<E>())
            .or_default()
            .push((id, wrapped));
        trace!("EventBus: subscribed {:?} to {}", id, std::any::type_name::<E>());
        id
    }

    /// Subscribe for as long as the returned guard lives.
    #[must_use = "dropping the guard unsubscribes immediately"]
    pub fn subscribe_scoped<E, F>(&self, callback: F) -> ListenerGuard
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.subscribe::<E, F>(callback);
        ListenerGuard {
            subscribers: Arc::downgrade(&self.subscribers),
            id,
        }
    }

    /// Remove one subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        remove_subscription(&self.subscribers, id)
    }

    /// Emit event: invoke callbacks immediately AND queue for deferred processing.
    pub fn emit<E: Event + Clone>(&self, event: E) {
        dispatch(&self.subscribers, &self.queue, event);
    }

    // ========== Deferred Processing ==========

    /// Poll all queued events for batch processing.
    ///
    /// Returns all events emitted since last poll. Use in main loop:
    /// ```ignore
    /// for event in event_bus.poll() {
    ///     // Process event...
    /// }
    /// ```
    pub fn poll(&self) -> Vec<BoxedEvent> {
        std::mem::take(&mut *self.queue.lock().unwrap_or_else(|e| e.into_inner()))
    }

    // ========== Handle & Utilities ==========

    /// Get an emitter handle for passing to UI components.
    pub fn emitter(&self) -> EventEmitter {
        EventEmitter {
            subscribers: Arc::clone(&self.subscribers),
            queue: Arc::clone(&self.queue),
        }
    }

    /// Check if there are subscribers for event type E
    pub fn has_subscribers<E: Event>(&self) -> bool {
        self.subscriber_count::<E>() > 0
    }

    /// Number of live subscriptions for event type E
    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&TypeId::of::<E>())
            .map(|v| v.len())
            .unwrap_or(0)
    }

    /// Check queue length
    pub fn queue_len(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Lightweight emitter handle for UI components and listener callbacks.
#[derive(Clone)]
pub struct EventEmitter {
    subscribers: Arc<Subscribers>,
    queue: Arc<Mutex<Vec<BoxedEvent>>>,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("subscriber_types", &self.subscribers.read().map(|s| s.len()).unwrap_or(0))
            .field("queue_len", &self.queue.lock().map(|q| q.len()).unwrap_or(0))
            .finish()
    }
}

impl EventEmitter {
    /// Emit event: invoke callbacks and queue for deferred processing
    pub fn emit<E: Event + Clone>(&self, event: E) {
        dispatch(&self.subscribers, &self.queue, event);
    }
}

/// Scoped subscription; unsubscribes on drop.
///
/// Holds only a weak reference, so a guard outliving its bus is harmless.
#[derive(Debug)]
pub struct ListenerGuard {
    subscribers: Weak<Subscribers>,
    id: SubscriptionId,
}

impl ListenerGuard {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(subs) = self.subscribers.upgrade() {
            remove_subscription(&subs, self.id);
            trace!("EventBus: released listener {:?}", self.id);
        }
    }
}

fn remove_subscription(subscribers: &Subscribers, id: SubscriptionId) -> bool {
    let mut subs = subscribers.write().unwrap_or_else(|e| e.into_inner());
    let mut removed = false;
    subs.retain(|_, list| {
        let before = list.len();
        list.retain(|(sid, _)| *sid != id);
        removed |= list.len() != before;
        !list.is_empty()
    });
    removed
}

fn dispatch<E: Event + Clone>(
    subscribers: &Subscribers,
    queue: &Mutex<Vec<BoxedEvent>>,
    event: E,
) {
    // Snapshot callbacks so a callback may emit or drop guards without
    // re-entering the lock.
    let callbacks: Vec<Callback> = subscribers
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(&TypeId::of::<E>())
        .map(|list| list.iter().map(|(_, cb)| Arc::clone(cb)).collect())
        .unwrap_or_default();
    for cb in &callbacks {
        cb(&event);
    }

    // Queue for deferred processing with eviction
    let mut queue = queue.lock().unwrap_or_else(|e| e.into_inner());
    if queue.len() >= MAX_QUEUE_SIZE {
        let evict_count = queue.len() / 2;
        warn!("EventBus queue full ({} events), evicting oldest {}", queue.len(), evict_count);
        queue.drain(0..evict_count);
    }
    queue.push(Box::new(event));
}

/// Helper: downcast BoxedEvent to concrete type
///
/// IMPORTANT: Must explicitly deref to `dyn Event` before calling `as_any()`.
/// Without explicit deref, the blanket impl `Event for Box<dyn Event>` intercepts
/// the call and returns `&dyn Any` containing `Box<dyn Event>` instead of the
/// original type, causing downcast to always fail.
#[inline]
pub fn downcast_event<E: Event>(event: &BoxedEvent) -> Option<&E> {
    (**event).as_any().downcast_ref::<E>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[derive(Clone, Debug)]
    struct TestEvent {
        value: i32,
    }

    #[derive(Clone, Debug)]
    struct OtherEvent {
        msg: String,
    }

    #[test]
    fn test_subscribe_emit_immediate() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicI32::new(0));
        let c = Arc::clone(&counter);

        bus.subscribe::<TestEvent, _>(move |e| {
            c.fetch_add(e.value, Ordering::SeqCst);
        });

        bus.emit(TestEvent { value: 10 });
        assert_eq!(counter.load(Ordering::SeqCst), 10);

        bus.emit(TestEvent { value: 5 });
        assert_eq!(counter.load(Ordering::SeqCst), 15);
    }

    #[test]
    fn test_emit_queues_for_poll() {
        let bus = EventBus::new();

        bus.emit(TestEvent { value: 1 });
        bus.emit(OtherEvent { msg: "hello".into() });

        let events = bus.poll();
        assert_eq!(events.len(), 2);
        assert_eq!(downcast_event::<OtherEvent>(&events[1]).map(|e| e.msg.as_str()), Some("hello"));
        assert!(downcast_event::<TestEvent>(&events[1]).is_none());
        assert_eq!(bus.poll().len(), 0);
    }

    #[test]
    fn test_emitter_handle() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicI32::new(0));
        let c = Arc::clone(&counter);

        bus.subscribe::<TestEvent, _>(move |e| {
            c.fetch_add(e.value, Ordering::SeqCst);
        });

        bus.emitter().emit(TestEvent { value: 42 });
        assert_eq!(counter.load(Ordering::SeqCst), 42);
        assert_eq!(bus.poll().len(), 1);
    }

    #[test]
    fn test_scoped_listener_released_on_drop() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicI32::new(0));
        let c = Arc::clone(&counter);

        let guard = bus.subscribe_scoped::<TestEvent, _>(move |e| {
            c.fetch_add(e.value, Ordering::SeqCst);
        });
        assert_eq!(bus.subscriber_count::<TestEvent>(), 1);
        bus.emit(TestEvent { value: 1 });

        drop(guard);
        assert!(!bus.has_subscribers::<TestEvent>());
        bus.emit(TestEvent { value: 1 });
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scoped_listener_released_on_unwind() {
        let bus = EventBus::new();
        let b = bus.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = b.subscribe_scoped::<TestEvent, _>(|_| {});
            panic!("setup failed");
        }));
        assert!(result.is_err());
        assert_eq!(bus.subscriber_count::<TestEvent>(), 0);
    }

    #[test]
    fn test_unsubscribe_one_keeps_others() {
        let bus = EventBus::new();
        let a = bus.subscribe::<TestEvent, _>(|_| {});
        let _b = bus.subscribe::<TestEvent, _>(|_| {});
        assert!(bus.unsubscribe(a));
        assert!(!bus.unsubscribe(a));
        assert_eq!(bus.subscriber_count::<TestEvent>(), 1);
    }

    #[test]
    fn test_callback_may_emit() {
        let bus = EventBus::new();
        let emitter = bus.emitter();
        bus.subscribe::<TestEvent, _>(move |e| {
            emitter.emit(OtherEvent { msg: format!("got {}", e.value) });
        });
        bus.emit(TestEvent { value: 3 });

        let events = bus.poll();
        // Nested emit is queued before the outer event
        assert_eq!(events.len(), 2);
        assert_eq!(downcast_event::<OtherEvent>(&events[0]).map(|e| e.msg.as_str()), Some("got 3"));
    }

    #[test]
    fn test_guard_outlives_bus() {
        let guard = {
            let bus = EventBus::new();
            bus.subscribe_scoped::<TestEvent, _>(|_| {})
        };
        drop(guard);
    }
}
