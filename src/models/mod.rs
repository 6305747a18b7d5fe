pub mod purchase;
pub mod snapshot;
pub mod unit;

pub use purchase::{AnchorContext, Baseline, DeltaKind, PurchaseEvent, UnitDiff};
pub use snapshot::{GroupedSnapshot, PendingEdit, SnapshotGroup, UnitGroup};
pub use unit::{PurchaseEntry, Unit, UnitAttribute, UnitKey};
