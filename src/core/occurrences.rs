//! Active-occurrence tracker.
//!
//! The selection lives only in shareable navigation state under the repeated
//! `occurrence` key; this type is a view over it, so a reloaded or shared link
//! restores the same set. Membership is the only observable property.

use log::debug;
use std::collections::HashSet;

use crate::core::nav_params::ParamStore;
use crate::entities::keys::P_OCCURRENCE;
use crate::entities::OccurrenceId;

/// Toggle/query the active occurrence set stored in `S`.
pub struct ActiveOccurrences<'a, S: ParamStore + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: ParamStore + ?Sized> ActiveOccurrences<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Add when absent, remove when present. Returns the new membership.
    pub fn toggle(&mut self, id: &OccurrenceId) -> bool {
        if self.contains(id) {
            self.store.remove_value(P_OCCURRENCE, id.as_str());
            debug!("Occurrence {} deactivated", id);
            false
        } else {
            self.store.append(P_OCCURRENCE, id.as_str());
            debug!("Occurrence {} activated", id);
            true
        }
    }

    pub fn contains(&self, id: &OccurrenceId) -> bool {
        self.store
            .get_all(P_OCCURRENCE)
            .into_iter()
            .any(|v| v == id.as_str())
    }

    pub fn ids(&self) -> HashSet<OccurrenceId> {
        active_occurrence_ids(&*self.store)
    }
}

/// Read-only snapshot of the active set.
pub fn active_occurrence_ids<S: ParamStore + ?Sized>(store: &S) -> HashSet<OccurrenceId> {
    store
        .get_all(P_OCCURRENCE)
        .into_iter()
        .map(OccurrenceId::from)
        .collect()
}
