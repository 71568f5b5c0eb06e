//! In-process mini cluster backed by DataFusion.
//!
//! A [`LocalCluster`] owns one in-memory catalog. Every connection opened on
//! it registers that catalog, so tables created through one engine are
//! visible to the others.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use datafusion::arrow::array::RecordBatch;
use datafusion::arrow::datatypes::SchemaRef;
use datafusion::catalog::{CatalogProvider, MemoryCatalogProvider, MemorySchemaProvider, SchemaProvider};
use datafusion::datasource::MemTable;
use fathom_cluster::ClusterProvider;
use fathom_common::HarnessConfig;
use fathom_error::{ErrorCode, ErrorContext, FathomError, Result};
use tracing::{debug, info};

pub const CATALOG: &str = "fathom";
pub const SCHEMA: &str = "public";

pub struct LocalCluster {
    id: String,
    name: String,
    nodes: usize,
    catalog: Arc<MemoryCatalogProvider>,
    schema: Arc<MemorySchemaProvider>,
    stopped: AtomicBool,
    datafusion_config: HashMap<String, String>,
    collect_statistics: bool,
}

impl LocalCluster {
    fn start(id: String, config: &HarnessConfig) -> Result<Self> {
        let catalog = Arc::new(MemoryCatalogProvider::new());
        let schema = Arc::new(MemorySchemaProvider::new());
        catalog.register_schema(SCHEMA, schema.clone())?;

        Ok(Self {
            id,
            name: config.cluster.name.clone(),
            nodes: config.cluster.nodes,
            catalog,
            schema,
            stopped: AtomicBool::new(false),
            datafusion_config: config.datafusion_config.clone(),
            collect_statistics: config.statistics.collect,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn catalog(&self) -> Arc<dyn CatalogProvider> {
        self.catalog.clone()
    }

    pub fn datafusion_config(&self) -> &HashMap<String, String> {
        &self.datafusion_config
    }

    /// Cluster-wide default for statistics collection.
    pub fn collect_statistics(&self) -> bool {
        self.collect_statistics
    }

    /// Registers (or replaces) an in-memory table in `fathom.public`.
    pub fn register_batches(
        &self,
        table: &str,
        schema: SchemaRef,
        batches: Vec<RecordBatch>,
    ) -> Result<()> {
        self.check_running()?;
        let provider = MemTable::try_new(schema, vec![batches])?;
        self.schema.register_table(table.to_string(), Arc::new(provider))?;
        debug!(cluster = %self.id, table, "Registered table");
        Ok(())
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names = self.schema.table_names();
        names.sort();
        names
    }

    /// Drops every table and marks the cluster stopped. Stopping twice fails.
    pub fn stop(&self) -> Result<()> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Err(FathomError::new(
                ErrorCode::ClusterStopFailed,
                format!("Cluster '{}' is already stopped", self.id),
            )
            .with_context(self.context()));
        }
        for table in self.schema.table_names() {
            self.schema.deregister_table(&table)?;
        }
        Ok(())
    }

    pub(crate) fn check_running(&self) -> Result<()> {
        if self.is_stopped() {
            return Err(FathomError::new(
                ErrorCode::ClusterUnavailable,
                format!("Cluster '{}' has been stopped", self.id),
            )
            .with_context(self.context()));
        }
        Ok(())
    }

    fn context(&self) -> ErrorContext {
        ErrorContext::Cluster {
            cluster_name: self.name.clone(),
            instance: Some(self.id.clone()),
            classes_served: 0,
        }
    }
}

impl std::fmt::Debug for LocalCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCluster")
            .field("id", &self.id)
            .field("nodes", &self.nodes)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Starts [`LocalCluster`]s named `<cluster.name>-<n>`.
#[derive(Debug, Default)]
pub struct LocalClusterProvider {
    next_id: AtomicU64,
}

impl LocalClusterProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClusterProvider for LocalClusterProvider {
    type Handle = LocalCluster;

    fn create(&self, config: &HarnessConfig) -> Result<LocalCluster> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("{}-{}", config.cluster.name, n);
        let cluster = LocalCluster::start(id, config).map_err(|e| {
            FathomError::new(ErrorCode::ClusterStartFailed, e.message).with_context(
                ErrorContext::Cluster {
                    cluster_name: config.cluster.name.clone(),
                    instance: None,
                    classes_served: 0,
                },
            )
        })?;
        info!(cluster = %cluster.id, nodes = cluster.nodes, "Local cluster started");
        Ok(cluster)
    }

    fn destroy(&self, cluster: &LocalCluster) -> Result<()> {
        cluster.stop()?;
        info!(cluster = %cluster.id, "Local cluster stopped");
        Ok(())
    }

    fn instance_id(&self, cluster: &LocalCluster) -> String {
        cluster.id.clone()
    }
}
