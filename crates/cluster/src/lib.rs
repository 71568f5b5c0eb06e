//! Shared cluster lifecycle for parallel test classes.
//!
//! A [`ClusterCoordinator`] owns the one live cluster a test process shares.
//! Test classes obtain it through [`ClusterCoordinator::ensure_cluster`] (or a
//! [`ClassLease`]) and report completion through
//! [`ClusterCoordinator::on_class_finished`]. After `reuse_threshold` classes
//! the cluster is torn down and the next class gets a fresh one.
//!
//! ```text
//!   ensure_cluster           on_class_finished (count < T)
//! EMPTY ────────────▶ READY ◀──────────────────────┐
//!   ▲                   │ └────────────────────────┘
//!   │                   │ on_class_finished (count >= T)
//!   └───────────────────┘ / shutdown
//! ```
//!
//! The cluster itself comes from a [`ClusterProvider`]; the coordinator never
//! looks inside the handle.

pub mod coordinator;
pub mod lease;
pub mod provider;

pub use coordinator::{ClassOutcome, ClusterCoordinator, CoordinatorStats, LifecycleState};
pub use lease::{ClassLease, Isolation};
pub use provider::ClusterProvider;
