use std::sync::Arc;

use async_trait::async_trait;
use datafusion::error::DataFusionError;
use datafusion::prelude::{SessionConfig, SessionContext};
use fathom_common::EngineKind;
use fathom_error::{ErrorCode, ErrorContext, FathomError, Result};
use tracing::debug;

use crate::cluster::{LocalCluster, CATALOG, SCHEMA};
use crate::outcome::RowSet;
use crate::plan::{extract_plan, LOGICAL_PLAN, PHYSICAL_PLAN};

/// A connection to one engine of the test cluster.
#[async_trait]
pub trait QueryConnection: Send + Sync {
    fn engine(&self) -> EngineKind;

    /// Executes a query and collects every row.
    async fn query(&self, sql: &str) -> Result<RowSet>;

    /// Returns the engine's plan for a query without executing it.
    async fn explain(&self, sql: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionOptions {
    pub collect_statistics: bool,
}

/// DataFusion session over a [`LocalCluster`].
///
/// The embedded engine plans on a single partition and reports the logical
/// plan and DataFusion's own error text. The distributed engine spreads work
/// over one partition per node, reports the physical plan and prefixes its
/// errors with a `FATHOM-XXXX` code, the way a remote server would.
pub struct LocalConnection {
    cluster: Arc<LocalCluster>,
    engine: EngineKind,
    ctx: SessionContext,
}

impl LocalConnection {
    pub fn open(
        cluster: &Arc<LocalCluster>,
        engine: EngineKind,
        options: ConnectionOptions,
    ) -> Result<Self> {
        cluster.check_running()?;

        let partitions = match engine {
            EngineKind::Embedded => 1,
            EngineKind::Distributed => cluster.nodes().max(1),
        };

        let mut config = SessionConfig::new()
            .with_default_catalog_and_schema(CATALOG, SCHEMA)
            .with_create_default_catalog_and_schema(false)
            .with_information_schema(true)
            .with_target_partitions(partitions)
            .with_repartition_joins(partitions > 1)
            .with_repartition_aggregations(partitions > 1);
        config.options_mut().execution.collect_statistics = options.collect_statistics;

        for (key, value) in cluster.datafusion_config() {
            config.options_mut().set(key, value).map_err(|e| {
                FathomError::new(
                    ErrorCode::InvalidConfig,
                    format!("Failed to set config option {}: {}", key, e.strip_backtrace()),
                )
                .with_context(ErrorContext::Config {
                    file_path: None,
                    field: Some(format!("datafusion_config.{}", key)),
                })
            })?;
        }

        let ctx = SessionContext::new_with_config(config);
        ctx.register_catalog(CATALOG, cluster.catalog());
        debug!(cluster = %cluster.id(), %engine, partitions, "Opened connection");

        Ok(Self {
            cluster: cluster.clone(),
            engine,
            ctx,
        })
    }

    pub fn cluster(&self) -> &Arc<LocalCluster> {
        &self.cluster
    }

    pub fn session(&self) -> &SessionContext {
        &self.ctx
    }

    async fn run(&self, sql: &str) -> Result<RowSet> {
        self.cluster.check_running()?;
        let df = self
            .ctx
            .sql(sql)
            .await
            .map_err(|e| self.engine_error(e, sql))?;
        let schema = df.schema().inner().clone();
        let batches = df.collect().await.map_err(|e| self.engine_error(e, sql))?;
        Ok(RowSet::new(schema, batches))
    }

    fn engine_error(&self, err: DataFusionError, sql: &str) -> FathomError {
        let error = FathomError::from(err);
        let message = match self.engine {
            EngineKind::Embedded => error.message.clone(),
            EngineKind::Distributed => format!("[{}] {}", error.code, error.message),
        };
        FathomError {
            message,
            ..error
        }
        .with_context(ErrorContext::Query {
            engine: self.engine.to_string(),
            sql: sql.to_string(),
        })
    }
}

#[async_trait]
impl QueryConnection for LocalConnection {
    fn engine(&self) -> EngineKind {
        self.engine
    }

    async fn query(&self, sql: &str) -> Result<RowSet> {
        debug!(engine = %self.engine, sql, "Executing query");
        self.run(sql).await
    }

    async fn explain(&self, sql: &str) -> Result<String> {
        let explain = self.run(&format!("EXPLAIN {}", sql)).await?;
        let plan_type = match self.engine {
            EngineKind::Embedded => LOGICAL_PLAN,
            EngineKind::Distributed => PHYSICAL_PLAN,
        };
        extract_plan(&explain, plan_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::LocalClusterProvider;
    use datafusion::arrow::array::{Int64Array, RecordBatch};
    use datafusion::arrow::datatypes::{DataType, Field, Schema};
    use fathom_cluster::ClusterProvider;
    use fathom_common::HarnessConfig;

    fn cluster() -> Arc<LocalCluster> {
        let cluster = LocalClusterProvider::new()
            .create(&HarnessConfig::default())
            .unwrap();
        let schema = Arc::new(Schema::new(vec![Field::new("n", DataType::Int64, false)]));
        let batch =
            RecordBatch::try_new(schema.clone(), vec![Arc::new(Int64Array::from(vec![1, 2, 3]))])
                .unwrap();
        cluster.register_batches("numbers", schema, vec![batch]).unwrap();
        Arc::new(cluster)
    }

    #[tokio::test]
    async fn test_both_engines_see_the_same_tables() {
        let cluster = cluster();
        for engine in EngineKind::ALL {
            let conn = LocalConnection::open(&cluster, engine, ConnectionOptions::default()).unwrap();
            let rows = conn.query("SELECT SUM(n) AS total FROM numbers").await.unwrap();
            assert_eq!(rows.column_values("total").unwrap(), vec!["6"]);
        }
    }

    #[tokio::test]
    async fn test_error_wording_differs_per_engine() {
        let cluster = cluster();
        let embedded =
            LocalConnection::open(&cluster, EngineKind::Embedded, ConnectionOptions::default())
                .unwrap();
        let distributed =
            LocalConnection::open(&cluster, EngineKind::Distributed, ConnectionOptions::default())
                .unwrap();

        let e = embedded.query("SELECT * FROM nope").await.unwrap_err();
        let d = distributed.query("SELECT * FROM nope").await.unwrap_err();
        assert_eq!(e.code, ErrorCode::TableNotFound);
        assert_eq!(d.code, ErrorCode::TableNotFound);
        assert!(!e.message.contains("FATHOM-"));
        assert!(d.message.starts_with("[FATHOM-2003]"));
    }

    #[tokio::test]
    async fn test_explain_plan_types() {
        let cluster = cluster();
        let embedded =
            LocalConnection::open(&cluster, EngineKind::Embedded, ConnectionOptions::default())
                .unwrap();
        let distributed =
            LocalConnection::open(&cluster, EngineKind::Distributed, ConnectionOptions::default())
                .unwrap();

        let logical = embedded.explain("SELECT n FROM numbers").await.unwrap();
        assert!(logical.contains("TableScan: numbers"));
        let physical = distributed.explain("SELECT n FROM numbers").await.unwrap();
        assert!(physical.contains("Exec"));
    }

    #[tokio::test]
    async fn test_stopped_cluster_is_unavailable() {
        let cluster = cluster();
        let conn =
            LocalConnection::open(&cluster, EngineKind::Embedded, ConnectionOptions::default())
                .unwrap();
        cluster.stop().unwrap();

        let err = conn.query("SELECT 1").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ClusterUnavailable);
        let err =
            LocalConnection::open(&cluster, EngineKind::Embedded, ConnectionOptions::default())
                .err()
                .unwrap();
        assert_eq!(err.code, ErrorCode::ClusterUnavailable);
    }

    #[test]
    fn test_bad_session_option() {
        let mut config = HarnessConfig::default();
        config
            .datafusion_config
            .insert("datafusion.execution.no_such_option".into(), "1".into());
        let cluster = Arc::new(LocalClusterProvider::new().create(&config).unwrap());
        let err = LocalConnection::open(&cluster, EngineKind::Embedded, ConnectionOptions::default())
            .err()
            .unwrap();
        assert_eq!(err.code, ErrorCode::InvalidConfig);
    }
}
