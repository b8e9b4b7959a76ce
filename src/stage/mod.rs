//! Stage 3 of the node pipeline
//!
//! The coordinator drives one firing: it prunes assignments that have no
//! copy target, replicates recipes onto the rest, corrects semantic domains
//! according to the configured rules and writes the export list. Destructive
//! and action-submitting calls run inside the mutual-exclusion guard.

pub mod coordinator;
pub mod guard;
pub mod interrupt;
pub mod matcher;
pub mod report;

pub use coordinator::{StageCoordinator, STAGE_NUMBER};
pub use guard::MutualExclusionGuard;
pub use interrupt::InterruptSignal;
pub use report::{StageOutcome, StageReport};
