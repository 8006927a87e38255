//! Hotkey system - scoped keyboard bindings.
//!
//! Two consumers read the same global key stream:
//! - `KeyScope::Frame` (single-capture view): ArrowLeft/ArrowRight step in time
//! - `KeyScope::CaptureList` (list view): ArrowUp/ArrowDown step in list order
//!
//! Each mounted view installs its own listener with [`install_scope`] and
//! keeps the returned guard; both may be mounted at once and neither sees the
//! other's bindings.

use log::trace;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::event_bus::{EventBus, ListenerGuard};
use crate::core::nav_events::{KeyPressedEvent, ListStepEvent, NavIntentEvent};
use crate::core::navigator::NavIntent;

/// Which view a binding belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyScope {
    Frame,
    CaptureList,
}

/// What a bound key does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Temporal previous (prev/next controls)
    Prev,
    /// Temporal next
    Next,
    /// Adjacent row in list order
    ListStep(isize),
}

/// Hotkey handler for scope-aware keyboard shortcuts
#[derive(Debug, Clone, Default)]
pub struct HotkeyHandler {
    bindings: HashMap<(KeyScope, String), KeyAction>,
}

impl HotkeyHandler {
    /// Empty handler (no bindings)
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler with the standard arrow-key bindings
    pub fn with_defaults() -> Self {
        let mut h = Self::new();
        h.setup_default_bindings();
        h
    }

    /// Look up a key combo in one scope
    pub fn handle_key(&self, scope: KeyScope, combo: &str) -> Option<KeyAction> {
        self.bindings.get(&(scope, combo.to_string())).copied()
    }

    /// Build "Ctrl+Shift+Alt+Key" combo string
    pub fn combo(key: &str, ctrl: bool, shift: bool, alt: bool) -> String {
        let mut key_combo = String::new();
        if ctrl {
            key_combo.push_str("Ctrl+");
        }
        if shift {
            key_combo.push_str("Shift+");
        }
        if alt {
            key_combo.push_str("Alt+");
        }
        key_combo.push_str(key);
        key_combo
    }

    /// Add hotkey binding
    pub fn add_binding(&mut self, scope: KeyScope, key: &str, action: KeyAction) {
        self.bindings.insert((scope, key.to_string()), action);
    }

    /// Remove hotkey binding
    pub fn remove_binding(&mut self, scope: KeyScope, key: &str) {
        self.bindings.remove(&(scope, key.to_string()));
    }

    /// Setup default hotkey bindings
    pub fn setup_default_bindings(&mut self) {
        use KeyAction::*;
        use KeyScope::*;

        self.add_binding(Frame, "ArrowLeft", Prev);
        self.add_binding(Frame, "ArrowRight", Next);

        self.add_binding(CaptureList, "ArrowUp", ListStep(-1));
        self.add_binding(CaptureList, "ArrowDown", ListStep(1));
    }
}

/// Subscribe `scope`'s bindings to the global key stream.
///
/// Matching keys are re-emitted as `NavIntentEvent` (temporal) or
/// `ListStepEvent` (list order). The listener lives as long as the guard.
#[must_use = "the listener is removed when the guard is dropped"]
pub fn install_scope(bus: &EventBus, handler: Arc<HotkeyHandler>, scope: KeyScope) -> ListenerGuard {
    let emitter = bus.emitter();
    let guard = bus.subscribe_scoped::<KeyPressedEvent, _>(move |e| {
        match handler.handle_key(scope, &e.combo) {
            Some(KeyAction::Prev) => emitter.emit(NavIntentEvent(NavIntent::Prev)),
            Some(KeyAction::Next) => emitter.emit(NavIntentEvent(NavIntent::Next)),
            Some(KeyAction::ListStep(delta)) => emitter.emit(ListStepEvent(delta)),
            None => {}
        }
    });
    trace!("Installed {:?} key listener ({:?})", scope, guard.id());
    guard
}
