// ── In-flight suppression ──
//
// Characteristic types with an unacknowledged local write. While a type is
// suppressed, polled values for it are not applied, so a stale read cannot
// snap a control back to its pre-edit position. Every entry carries a
// ticket: a write only releases the entries it created, and every entry
// expires after a bounded timeout in case no response ever arrives.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::trace;

use crate::model::{DeviceId, FieldMap};

/// Ticket issued per suppressed field.
pub type Ticket = u64;

/// Tickets for the fields of one pending write.
pub type Tickets = BTreeMap<String, Ticket>;

#[derive(Debug, Clone, Copy)]
struct Entry {
    ticket: Ticket,
    expires_at: Instant,
}

/// Suppression set of a single device.
#[derive(Debug, Default)]
pub struct SuppressionSet {
    entries: HashMap<String, Entry>,
}

impl SuppressionSet {
    /// Suppress `field` under `ticket` until `expires_at`, replacing any
    /// earlier entry.
    pub fn mark(&mut self, field: &str, ticket: Ticket, expires_at: Instant) {
        self.entries
            .insert(field.to_owned(), Entry { ticket, expires_at });
    }

    /// Release `field` if it is still held by `ticket`.
    pub fn release(&mut self, field: &str, ticket: Ticket) -> bool {
        match self.entries.get(field) {
            Some(entry) if entry.ticket == ticket => {
                self.entries.remove(field);
                true
            }
            _ => false,
        }
    }

    pub fn is_suppressed(&mut self, field: &str, now: Instant) -> bool {
        self.prune(now);
        self.entries.contains_key(field)
    }

    /// Suppressed field names, sorted.
    pub fn active(&mut self, now: Instant) -> Vec<String> {
        self.prune(now);
        let mut fields: Vec<String> = self.entries.keys().cloned().collect();
        fields.sort();
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn prune(&mut self, now: Instant) {
        self.entries.retain(|_, e| e.expires_at > now);
    }
}

/// Split of a snapshot into values to apply and values held back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub applied: FieldMap,
    pub suppressed: Vec<String>,
}

/// Per-device suppression sets, shared by the write coalescer (which marks
/// and releases) and the reconciler (which reads).
///
/// Tickets are unique across devices and remounts, so a late response can
/// never release an entry it did not create.
#[derive(Debug)]
pub struct InFlightRegistry {
    sets: DashMap<DeviceId, SuppressionSet>,
    ttl: Duration,
    next_ticket: AtomicU64,
}

impl InFlightRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sets: DashMap::new(),
            ttl,
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Suppress every field in `fields` for `device`.
    pub fn mark<'a>(
        &self,
        device: &DeviceId,
        fields: impl IntoIterator<Item = &'a String>,
    ) -> Tickets {
        let expires_at = Instant::now() + self.ttl;
        let mut set = self.sets.entry(device.clone()).or_default();
        fields
            .into_iter()
            .map(|field| {
                let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
                set.mark(field, ticket, expires_at);
                trace!(device = %device, field = %field, ticket, "suppressing field");
                (field.clone(), ticket)
            })
            .collect()
    }

    /// Release the entries created by one write.
    pub fn release(&self, device: &DeviceId, tickets: &Tickets) {
        let Some(mut set) = self.sets.get_mut(device) else {
            return;
        };
        for (field, ticket) in tickets {
            if set.release(field, *ticket) {
                trace!(device = %device, field = %field, "released suppression");
            }
        }
    }

    pub fn is_suppressed(&self, device: &DeviceId, field: &str) -> bool {
        self.sets
            .get_mut(device)
            .is_some_and(|mut set| set.is_suppressed(field, Instant::now()))
    }

    pub fn active(&self, device: &DeviceId) -> Vec<String> {
        self.sets
            .get_mut(device)
            .map(|mut set| set.active(Instant::now()))
            .unwrap_or_default()
    }

    /// Split `snapshot` into fields that may be applied and fields that are
    /// currently suppressed.
    pub fn partition(&self, device: &DeviceId, snapshot: &FieldMap) -> Partition {
        let now = Instant::now();
        let mut out = Partition::default();
        let mut set = self.sets.get_mut(device);
        for (field, value) in snapshot {
            let held = set
                .as_mut()
                .is_some_and(|set| set.is_suppressed(field, now));
            if held {
                out.suppressed.push(field.clone());
            } else {
                out.applied.insert(field.clone(), *value);
            }
        }
        out
    }

    /// Forget a device entirely (on unmount).
    pub fn remove(&self, device: &DeviceId) {
        self.sets.remove(device);
    }

    #[cfg(test)]
    pub(crate) fn is_tracked(&self, device: &DeviceId) -> bool {
        self.sets.contains_key(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id() -> DeviceId {
        DeviceId::from("d1")
    }

    fn snapshot() -> FieldMap {
        let mut f = FieldMap::new();
        f.insert("On".into(), 0.into());
        f.insert("Brightness".into(), 40.into());
        f
    }

    #[tokio::test(start_paused = true)]
    async fn suppressed_fields_are_held_back() {
        let reg = InFlightRegistry::new(Duration::from_secs(10));
        let brightness = "Brightness".to_string();
        reg.mark(&id(), [&brightness]);

        let part = reg.partition(&id(), &snapshot());
        assert_eq!(part.suppressed, vec!["Brightness".to_string()]);
        assert_eq!(part.applied.len(), 1);
        assert!(part.applied.contains_key("On"));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_ticket_does_not_release_newer_mark() {
        let reg = InFlightRegistry::new(Duration::from_secs(10));
        let field = "Brightness".to_string();
        let first = reg.mark(&id(), [&field]);
        let _second = reg.mark(&id(), [&field]);

        reg.release(&id(), &first);
        assert!(reg.is_suppressed(&id(), "Brightness"));
    }

    #[tokio::test(start_paused = true)]
    async fn matching_ticket_releases() {
        let reg = InFlightRegistry::new(Duration::from_secs(10));
        let field = "On".to_string();
        let tickets = reg.mark(&id(), [&field]);
        reg.release(&id(), &tickets);
        assert!(!reg.is_suppressed(&id(), "On"));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire() {
        let reg = InFlightRegistry::new(Duration::from_secs(10));
        let field = "On".to_string();
        reg.mark(&id(), [&field]);

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(reg.is_suppressed(&id(), "On"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!reg.is_suppressed(&id(), "On"));
        assert!(reg.active(&id()).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn devices_do_not_share_sets() {
        let reg = InFlightRegistry::new(Duration::from_secs(10));
        let field = "On".to_string();
        reg.mark(&id(), [&field]);
        assert!(!reg.is_suppressed(&DeviceId::from("d2"), "On"));
    }

    #[tokio::test(start_paused = true)]
    async fn remove_forgets_device() {
        let reg = InFlightRegistry::new(Duration::from_secs(10));
        let field = "On".to_string();
        reg.mark(&id(), [&field]);

        reg.remove(&id());
        assert!(!reg.is_tracked(&id()));
        assert!(!reg.is_suppressed(&id(), "On"));
    }
}
