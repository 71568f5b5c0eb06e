use std::sync::Arc;

use fathom_error::Result;
use tracing::warn;

use crate::coordinator::{ClassOutcome, ClusterCoordinator};
use crate::provider::ClusterProvider;

/// How a test class shares the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Isolation {
    /// Reuse the shared cluster alongside other classes.
    #[default]
    Shared,
    /// Run alone on a fresh cluster that is destroyed when the class ends.
    /// Meant for classes that mutate cluster-wide state.
    Exclusive,
}

/// A running test class.
///
/// Holds the cluster handle for the class's duration and reports the class
/// as finished exactly once, either through [`ClassLease::finish`] or on drop.
pub struct ClassLease<'a, P: ClusterProvider> {
    coordinator: &'a ClusterCoordinator<P>,
    handle: Arc<P::Handle>,
    isolation: Isolation,
    finished: bool,
}

impl<'a, P: ClusterProvider> ClassLease<'a, P> {
    pub(crate) fn new(
        coordinator: &'a ClusterCoordinator<P>,
        handle: Arc<P::Handle>,
        isolation: Isolation,
    ) -> Self {
        Self {
            coordinator,
            handle,
            isolation,
            finished: false,
        }
    }

    pub fn handle(&self) -> &Arc<P::Handle> {
        &self.handle
    }

    pub fn isolation(&self) -> Isolation {
        self.isolation
    }

    /// Ends the class and returns the coordinator's reuse decision.
    pub fn finish(mut self) -> Result<ClassOutcome> {
        self.finished = true;
        self.coordinator.finish_class(self.isolation)
    }
}

impl<P: ClusterProvider> Drop for ClassLease<'_, P> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if let Err(e) = self.coordinator.finish_class(self.isolation) {
            warn!(error = %e, "Failed to finish test class on drop");
        }
    }
}
