//! Reference-counted, threshold-aware ownership of the shared cluster.
//!
//! All state lives behind one mutex: the create/teardown decision and the
//! reuse counter update are a single critical section, so two classes can
//! never both create or both tear down, and nobody can pick up a handle while
//! it is being destroyed. Cluster creation and teardown run while the lock is
//! held; other callers block on the condition variable until they finish.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use fathom_common::{HarnessConfig, ReuseThreshold};
use fathom_error::{ErrorCode, ErrorContext, FathomError, Result};
use tracing::{debug, error, info, warn};

use crate::lease::{ClassLease, Isolation};
use crate::provider::ClusterProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Empty,
    Ready,
}

/// What `on_class_finished` decided for the current cluster.
#[derive(Debug, Clone)]
pub enum ClassOutcome {
    /// The cluster stays up for the next class.
    Reused {
        classes_served: u32,
        /// Classes left before recreation; `None` when unbounded
        remaining: Option<u32>,
    },
    /// The cluster was destroyed; the next class gets a fresh one.
    TornDown {
        classes_served: u32,
        /// Set when the provider failed to stop it cleanly
        stop_error: Option<FathomError>,
    },
    /// The threshold was reached but other classes still hold leases; the
    /// last of them tears the cluster down.
    TeardownDeferred {
        classes_served: u32,
        active_classes: usize,
    },
    /// There was no cluster to account the class against.
    NoCluster,
}

impl ClassOutcome {
    pub fn is_torn_down(&self) -> bool {
        matches!(self, ClassOutcome::TornDown { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoordinatorStats {
    pub clusters_created: u64,
    pub clusters_destroyed: u64,
    pub stop_failures: u64,
    pub reuse_count: u32,
    pub active_classes: usize,
}

struct CoordinatorState<H> {
    current: Option<Arc<H>>,
    cluster_name: String,
    instance: Option<String>,
    reuse_count: u32,
    active_classes: usize,
    retiring: bool,
    exclusive_held: bool,
    start_failure: Option<FathomError>,
    shut_down: bool,
    clusters_created: u64,
    clusters_destroyed: u64,
    stop_failures: u64,
}

impl<H> CoordinatorState<H> {
    fn terminal(&self) -> bool {
        self.shut_down || self.start_failure.is_some()
    }

    fn blocks_shared(&self) -> bool {
        !self.terminal() && (self.retiring || self.exclusive_held)
    }

    fn blocks_exclusive(&self) -> bool {
        !self.terminal() && (self.retiring || self.exclusive_held || self.active_classes > 0)
    }

    fn cluster_context(&self) -> ErrorContext {
        ErrorContext::Cluster {
            cluster_name: self.cluster_name.clone(),
            instance: self.instance.clone(),
            classes_served: self.reuse_count,
        }
    }
}

/// Owns the shared cluster and decides, at every class boundary, whether it
/// is reused or recreated.
pub struct ClusterCoordinator<P: ClusterProvider> {
    provider: P,
    threshold: ReuseThreshold,
    state: Mutex<CoordinatorState<P::Handle>>,
    changed: Condvar,
}

impl<P: ClusterProvider> ClusterCoordinator<P> {
    pub fn new(provider: P, threshold: ReuseThreshold) -> Self {
        Self {
            provider,
            threshold,
            state: Mutex::new(CoordinatorState {
                current: None,
                cluster_name: String::new(),
                instance: None,
                reuse_count: 0,
                active_classes: 0,
                retiring: false,
                exclusive_held: false,
                start_failure: None,
                shut_down: false,
                clusters_created: 0,
                clusters_destroyed: 0,
                stop_failures: 0,
            }),
            changed: Condvar::new(),
        }
    }

    pub fn from_config(provider: P, config: &HarnessConfig) -> Self {
        Self::new(provider, config.reuse_threshold())
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn threshold(&self) -> ReuseThreshold {
        self.threshold
    }

    /// Returns the live cluster, creating it if none exists.
    ///
    /// An existing cluster is returned unchanged. A creation failure is
    /// remembered: this and every later call return it without retrying.
    /// Blocks while a retiring or exclusively held cluster is in use.
    pub fn ensure_cluster(&self, config: &HarnessConfig) -> Result<Arc<P::Handle>> {
        let state = self.lock()?;
        let mut state = self.wait_while(state, CoordinatorState::blocks_shared)?;
        self.ensure_locked(&mut state, config)
    }

    /// Counts one finished class against the current cluster and tears it
    /// down once the reuse threshold is reached.
    ///
    /// Stop failures are logged and returned inside the outcome; the handle is
    /// cleared regardless.
    pub fn on_class_finished(&self) -> Result<ClassOutcome> {
        let mut state = self.lock()?;
        Ok(self.finish_locked(&mut state, None))
    }

    /// Starts a test class and returns a lease that finishes it on drop.
    pub fn begin_class(
        &self,
        config: &HarnessConfig,
        isolation: Isolation,
    ) -> Result<ClassLease<'_, P>> {
        let state = self.lock()?;
        let handle = match isolation {
            Isolation::Shared => {
                let mut state = self.wait_while(state, CoordinatorState::blocks_shared)?;
                let handle = self.ensure_locked(&mut state, config)?;
                state.active_classes += 1;
                handle
            }
            Isolation::Exclusive => {
                let mut state = self.wait_while(state, CoordinatorState::blocks_exclusive)?;
                if state.current.is_some() && state.reuse_count > 0 {
                    info!(
                        cluster = %state.cluster_name,
                        classes_served = state.reuse_count,
                        "Recycling used cluster for an exclusive class"
                    );
                    self.teardown_locked(&mut state);
                }
                state.exclusive_held = true;
                match self.ensure_locked(&mut state, config) {
                    Ok(handle) => {
                        state.active_classes += 1;
                        handle
                    }
                    Err(e) => {
                        state.exclusive_held = false;
                        self.changed.notify_all();
                        return Err(e);
                    }
                }
            }
        };
        Ok(ClassLease::new(self, handle, isolation))
    }

    pub(crate) fn finish_class(&self, isolation: Isolation) -> Result<ClassOutcome> {
        let mut state = self.lock()?;
        Ok(self.finish_locked(&mut state, Some(isolation)))
    }

    /// Final teardown at process end. The coordinator is unusable afterwards.
    ///
    /// Returns the stop failure, if the provider reported one.
    pub fn shutdown(&self) -> Result<Option<FathomError>> {
        let mut state = self.lock()?;
        if state.shut_down {
            return Ok(None);
        }
        state.shut_down = true;
        if state.active_classes > 0 {
            warn!(
                cluster = %state.cluster_name,
                active_classes = state.active_classes,
                "Shutting down with classes still running"
            );
        }
        let (_, stop_error) = self.teardown_locked(&mut state);
        state.active_classes = 0;
        state.exclusive_held = false;
        self.changed.notify_all();
        info!("Cluster coordinator shut down");
        Ok(stop_error)
    }

    pub fn state(&self) -> LifecycleState {
        if self.snapshot().current.is_some() {
            LifecycleState::Ready
        } else {
            LifecycleState::Empty
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.snapshot().shut_down
    }

    pub fn reuse_count(&self) -> u32 {
        self.snapshot().reuse_count
    }

    pub fn stats(&self) -> CoordinatorStats {
        let state = self.snapshot();
        CoordinatorStats {
            clusters_created: state.clusters_created,
            clusters_destroyed: state.clusters_destroyed,
            stop_failures: state.stop_failures,
            reuse_count: state.reuse_count,
            active_classes: state.active_classes,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, CoordinatorState<P::Handle>>> {
        self.state.lock().map_err(|_| poisoned())
    }

    // Read-only accessors still report after a panic elsewhere.
    fn snapshot(&self) -> MutexGuard<'_, CoordinatorState<P::Handle>> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn wait_while<'a>(
        &self,
        guard: MutexGuard<'a, CoordinatorState<P::Handle>>,
        blocked: fn(&CoordinatorState<P::Handle>) -> bool,
    ) -> Result<MutexGuard<'a, CoordinatorState<P::Handle>>> {
        self.changed
            .wait_while(guard, |state| blocked(state))
            .map_err(|_| poisoned())
    }

    fn ensure_locked(
        &self,
        state: &mut CoordinatorState<P::Handle>,
        config: &HarnessConfig,
    ) -> Result<Arc<P::Handle>> {
        if state.shut_down {
            return Err(FathomError::new(
                ErrorCode::ClusterUnavailable,
                "Cluster coordinator has been shut down",
            )
            .with_context(state.cluster_context()));
        }
        if let Some(err) = &state.start_failure {
            return Err(err.clone());
        }
        if let Some(handle) = &state.current {
            debug!(
                cluster = %state.cluster_name,
                instance = state.instance.as_deref().unwrap_or_default(),
                classes_served = state.reuse_count,
                "Reusing cluster"
            );
            return Ok(Arc::clone(handle));
        }

        state.cluster_name = config.cluster.name.clone();
        info!(
            cluster = %state.cluster_name,
            nodes = config.cluster.nodes,
            threshold = %self.threshold,
            "Creating cluster"
        );
        match self.provider.create(config) {
            Ok(handle) => {
                let handle = Arc::new(handle);
                state.instance = Some(self.provider.instance_id(&handle));
                state.current = Some(Arc::clone(&handle));
                state.reuse_count = 0;
                state.clusters_created += 1;
                Ok(handle)
            }
            Err(cause) => {
                let err = if cause.code == ErrorCode::ClusterStartFailed {
                    cause
                } else {
                    FathomError::new(
                        ErrorCode::ClusterStartFailed,
                        format!(
                            "Failed to start cluster '{}': {}",
                            state.cluster_name, cause.message
                        ),
                    )
                };
                let err = err.with_context(state.cluster_context());
                error!(cluster = %state.cluster_name, error = %err, "Cluster start failed");
                state.start_failure = Some(err.clone());
                self.changed.notify_all();
                Err(err)
            }
        }
    }

    /// `lease` is `None` for the raw hook, which never took part in the
    /// active-class count.
    fn finish_locked(
        &self,
        state: &mut CoordinatorState<P::Handle>,
        lease: Option<Isolation>,
    ) -> ClassOutcome {
        if lease.is_some() {
            state.active_classes = state.active_classes.saturating_sub(1);
        }
        let exclusive = lease == Some(Isolation::Exclusive);

        if state.current.is_none() {
            if exclusive {
                state.exclusive_held = false;
            }
            self.changed.notify_all();
            debug!("Class finished without a live cluster");
            return ClassOutcome::NoCluster;
        }

        state.reuse_count = state.reuse_count.saturating_add(1);
        let classes_served = state.reuse_count;

        if exclusive {
            state.exclusive_held = false;
            state.retiring = true;
        } else if !state.retiring && self.threshold.is_reached(classes_served) {
            info!(
                cluster = %state.cluster_name,
                classes_served,
                threshold = %self.threshold,
                "Reuse threshold reached"
            );
            state.retiring = true;
        }

        let outcome = if !state.retiring {
            debug!(
                cluster = %state.cluster_name,
                classes_served,
                "Cluster kept for the next class"
            );
            ClassOutcome::Reused {
                classes_served,
                remaining: self
                    .threshold
                    .limit()
                    .map(|limit| limit.saturating_sub(classes_served)),
            }
        } else if state.active_classes == 0 {
            let (classes_served, stop_error) = self.teardown_locked(state);
            ClassOutcome::TornDown {
                classes_served,
                stop_error,
            }
        } else {
            debug!(
                cluster = %state.cluster_name,
                active_classes = state.active_classes,
                "Teardown deferred until running classes finish"
            );
            ClassOutcome::TeardownDeferred {
                classes_served,
                active_classes: state.active_classes,
            }
        };

        self.changed.notify_all();
        outcome
    }

    /// Destroys and clears the current cluster. Stop failures are logged,
    /// counted and returned; the slot is cleared either way.
    fn teardown_locked(
        &self,
        state: &mut CoordinatorState<P::Handle>,
    ) -> (u32, Option<FathomError>) {
        let classes_served = state.reuse_count;
        state.retiring = false;
        let Some(handle) = state.current.take() else {
            return (classes_served, None);
        };
        let context = state.cluster_context();
        let instance = state.instance.take().unwrap_or_default();
        state.reuse_count = 0;
        state.clusters_destroyed += 1;

        info!(
            cluster = %state.cluster_name,
            instance = %instance,
            classes_served,
            "Tearing down cluster"
        );
        let stop_error = match self.provider.destroy(&handle) {
            Ok(()) => None,
            Err(cause) => {
                state.stop_failures += 1;
                let err = FathomError::new(
                    ErrorCode::ClusterStopFailed,
                    format!("Failed to stop cluster instance '{}': {}", instance, cause.message),
                )
                .with_context(context)
                .with_hint("The handle was discarded; the next class starts a fresh cluster");
                warn!(cluster = %state.cluster_name, error = %err, "Cluster stop failed");
                Some(err)
            }
        };
        (classes_served, stop_error)
    }
}

fn poisoned() -> FathomError {
    FathomError::new(
        ErrorCode::InternalPanic,
        "Cluster coordinator lock poisoned by a panicking class",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct CountingProvider {
        next_id: AtomicU64,
    }

    impl ClusterProvider for CountingProvider {
        type Handle = u64;

        fn create(&self, _config: &HarnessConfig) -> Result<u64> {
            Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
        }

        fn destroy(&self, _handle: &u64) -> Result<()> {
            Ok(())
        }

        fn instance_id(&self, handle: &u64) -> String {
            format!("counting-{}", handle)
        }
    }

    fn coordinator(threshold: ReuseThreshold) -> ClusterCoordinator<CountingProvider> {
        ClusterCoordinator::new(CountingProvider::default(), threshold)
    }

    #[test]
    fn test_ensure_is_lazy_and_idempotent() {
        let coordinator = coordinator(ReuseThreshold::Bounded(2));
        let config = HarnessConfig::default();
        assert_eq!(coordinator.state(), LifecycleState::Empty);

        let first = coordinator.ensure_cluster(&config).unwrap();
        let second = coordinator.ensure_cluster(&config).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(coordinator.state(), LifecycleState::Ready);
        assert_eq!(coordinator.stats().clusters_created, 1);
    }

    #[test]
    fn test_teardown_after_threshold() {
        let coordinator = coordinator(ReuseThreshold::Bounded(2));
        let config = HarnessConfig::default();

        let first = coordinator.ensure_cluster(&config).unwrap();
        let outcome = coordinator.on_class_finished().unwrap();
        assert!(matches!(
            outcome,
            ClassOutcome::Reused {
                classes_served: 1,
                remaining: Some(1)
            }
        ));

        coordinator.ensure_cluster(&config).unwrap();
        assert!(coordinator.on_class_finished().unwrap().is_torn_down());
        assert_eq!(coordinator.state(), LifecycleState::Empty);
        assert_eq!(coordinator.reuse_count(), 0);

        let fresh = coordinator.ensure_cluster(&config).unwrap();
        assert_ne!(*first, *fresh);
    }

    #[test]
    fn test_finish_without_cluster() {
        let coordinator = coordinator(ReuseThreshold::Bounded(1));
        assert!(matches!(
            coordinator.on_class_finished().unwrap(),
            ClassOutcome::NoCluster
        ));
        assert_eq!(coordinator.reuse_count(), 0);
    }

    #[test]
    fn test_lease_finishes_on_drop() {
        let coordinator = coordinator(ReuseThreshold::Bounded(1));
        let config = HarnessConfig::default();
        {
            let _lease = coordinator.begin_class(&config, Isolation::Shared).unwrap();
            assert_eq!(coordinator.stats().active_classes, 1);
        }
        let stats = coordinator.stats();
        assert_eq!(stats.active_classes, 0);
        assert_eq!(stats.clusters_destroyed, 1);
    }

    #[test]
    fn test_shutdown_is_terminal() {
        let coordinator = coordinator(ReuseThreshold::Unbounded);
        let config = HarnessConfig::default();
        coordinator.ensure_cluster(&config).unwrap();

        assert!(coordinator.shutdown().unwrap().is_none());
        assert!(coordinator.is_shut_down());
        assert_eq!(coordinator.state(), LifecycleState::Empty);
        assert_eq!(coordinator.stats().clusters_destroyed, 1);

        let err = coordinator.ensure_cluster(&config).unwrap_err();
        assert_eq!(err.code, ErrorCode::ClusterUnavailable);
        assert!(coordinator.shutdown().unwrap().is_none());
    }
}
