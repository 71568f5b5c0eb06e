//! Test classes on the process-wide shared cluster.
//!
//! The shared coordinator is built on first use from `FATHOM__` environment
//! variables. Statics are never dropped, so the final teardown has to be
//! requested with [`shutdown_shared`].

use std::sync::Arc;

use fathom_cluster::{ClassLease, ClassOutcome, ClusterCoordinator, Isolation};
use fathom_common::telemetry::init_test_logging;
use fathom_common::{EngineKind, HarnessConfig};
use fathom_error::{ErrorCode, ErrorContext, FathomError, Result};
use once_cell::sync::Lazy;
use tracing::info;

use crate::cluster::{LocalCluster, LocalClusterProvider};
use crate::connection::{ConnectionOptions, LocalConnection};

/// How a test class uses the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuiteCategory {
    /// Shared cluster, statistics collection off.
    #[default]
    ParallelStatsDisabled,
    /// Shared cluster, statistics collection on.
    ParallelStatsEnabled,
    /// A fresh cluster of its own, torn down when the class finishes.
    NeedsOwnCluster,
}

impl SuiteCategory {
    pub fn isolation(&self) -> Isolation {
        match self {
            SuiteCategory::NeedsOwnCluster => Isolation::Exclusive,
            _ => Isolation::Shared,
        }
    }

    /// `None` defers to the cluster's `statistics.collect` setting.
    pub fn collect_statistics(&self) -> Option<bool> {
        match self {
            SuiteCategory::ParallelStatsDisabled => Some(false),
            SuiteCategory::ParallelStatsEnabled => Some(true),
            SuiteCategory::NeedsOwnCluster => None,
        }
    }
}

struct SharedCluster {
    coordinator: ClusterCoordinator<LocalClusterProvider>,
    config: HarnessConfig,
}

static SHARED: Lazy<Result<SharedCluster>> = Lazy::new(|| {
    let config = HarnessConfig::from_env()?;
    info!(
        cluster = %config.cluster.name,
        threshold = %config.reuse_threshold(),
        "Initializing shared cluster coordinator"
    );
    Ok(SharedCluster {
        coordinator: ClusterCoordinator::from_config(LocalClusterProvider::new(), &config),
        config,
    })
});

/// One running test class. Finishes the class on drop if
/// [`TestClass::finish`] was not called.
pub struct TestClass<'a> {
    lease: ClassLease<'a, LocalClusterProvider>,
    config: &'a HarnessConfig,
    category: SuiteCategory,
}

impl TestClass<'static> {
    /// Starts a class on the process-wide shared cluster.
    pub fn begin(category: SuiteCategory) -> Result<Self> {
        init_test_logging();
        let shared = match &*SHARED {
            Ok(shared) => shared,
            Err(e) => return Err(e.clone()),
        };
        TestClass::begin_on(&shared.coordinator, &shared.config, category)
    }
}

impl<'a> TestClass<'a> {
    /// Starts a class on an explicit coordinator.
    pub fn begin_on(
        coordinator: &'a ClusterCoordinator<LocalClusterProvider>,
        config: &'a HarnessConfig,
        category: SuiteCategory,
    ) -> Result<Self> {
        let lease = coordinator.begin_class(config, category.isolation())?;
        Ok(Self {
            lease,
            config,
            category,
        })
    }

    pub fn category(&self) -> SuiteCategory {
        self.category
    }

    pub fn cluster(&self) -> &Arc<LocalCluster> {
        self.lease.handle()
    }

    pub fn engines(&self) -> Vec<EngineKind> {
        self.config.enabled_engines()
    }

    /// Opens a connection to one engine. Each test derives its own.
    pub fn connect(&self, engine: EngineKind) -> Result<LocalConnection> {
        if !self.config.is_engine_enabled(engine) {
            return Err(FathomError::new(
                ErrorCode::InvalidConfig,
                format!("The {} engine is disabled", engine),
            )
            .with_context(ErrorContext::Config {
                file_path: None,
                field: Some(format!("engines.{}", engine)),
            }));
        }
        let cluster = self.cluster();
        let options = ConnectionOptions {
            collect_statistics: self
                .category
                .collect_statistics()
                .unwrap_or_else(|| cluster.collect_statistics()),
        };
        LocalConnection::open(cluster, engine, options)
    }

    pub fn finish(self) -> Result<ClassOutcome> {
        self.lease.finish()
    }
}

/// Tears down the shared cluster. Call once, after every class has finished.
///
/// Returns the stop failure, if any. Does nothing when no class ever ran.
pub fn shutdown_shared() -> Result<Option<FathomError>> {
    match Lazy::get(&SHARED) {
        Some(Ok(shared)) => shared.coordinator.shutdown(),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_mapping() {
        assert_eq!(
            SuiteCategory::NeedsOwnCluster.isolation(),
            Isolation::Exclusive
        );
        assert_eq!(
            SuiteCategory::ParallelStatsEnabled.isolation(),
            Isolation::Shared
        );
        assert_eq!(
            SuiteCategory::ParallelStatsDisabled.collect_statistics(),
            Some(false)
        );
        assert_eq!(SuiteCategory::NeedsOwnCluster.collect_statistics(), None);
    }

    #[test]
    fn test_disabled_engine_is_rejected() {
        let mut config = HarnessConfig::default();
        config.engines.distributed = false;
        let coordinator = ClusterCoordinator::from_config(LocalClusterProvider::new(), &config);

        let class =
            TestClass::begin_on(&coordinator, &config, SuiteCategory::ParallelStatsDisabled)
                .unwrap();
        assert_eq!(class.engines(), vec![EngineKind::Embedded]);
        let err = class.connect(EngineKind::Distributed).err().unwrap();
        assert_eq!(err.code, ErrorCode::InvalidConfig);
        assert!(class.connect(EngineKind::Embedded).is_ok());
        class.finish().unwrap();
    }
}
