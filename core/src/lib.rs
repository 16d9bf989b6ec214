//! civicdesk-core — the complaint lifecycle engine of a municipal service
//! desk.
//!
//! The crate covers the subsystems with real invariants: the status state
//! machine, SLA deadline computation, the rule-based assignment matcher, and
//! the periodic escalation scan. HTTP, auth, uploads, and rendering live
//! elsewhere and talk to this core through `LifecycleEngine`.

pub mod clock;
pub mod complaint;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod matcher;
pub mod notify;
pub mod scheduler;
pub mod sla;
pub mod staff;
pub mod store;
pub mod types;
