// ── Sync engine ──
//
// Write coalescing, periodic polling, in-flight suppression and snapshot
// reconciliation. Each piece is per-device; nothing orders work across
// devices.

pub mod coalescer;
pub mod poller;
pub mod reconciler;
pub mod suppression;

#[cfg(test)]
pub(crate) mod testing;

pub use coalescer::{WriteCoalescer, WriteHandlers, WriteState};
pub use poller::{PollScheduler, SnapshotCallback};
pub use reconciler::{ReconcileReport, Reconciler};
pub use suppression::{InFlightRegistry, SuppressionSet};
