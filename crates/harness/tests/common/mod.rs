#![allow(dead_code)]

use std::sync::Arc;

use datafusion::arrow::array::{Int64Array, RecordBatch, StringArray};
use datafusion::arrow::datatypes::{DataType, Field, Schema};
use fathom_cluster::ClusterCoordinator;
use fathom_common::{HarnessConfig, ReuseThreshold};
use fathom_harness::{LocalCluster, LocalClusterProvider};

pub type Coordinator = ClusterCoordinator<LocalClusterProvider>;

pub fn coordinator(threshold: ReuseThreshold) -> (Coordinator, HarnessConfig) {
    fathom_common::telemetry::init_test_logging();
    let config = HarnessConfig::default().with_reuse_threshold(threshold);
    let coordinator = ClusterCoordinator::from_config(LocalClusterProvider::new(), &config);
    (coordinator, config)
}

/// Registers `players(name, team, score)` with five rows.
pub fn seed_players(cluster: &LocalCluster) -> anyhow::Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("name", DataType::Utf8, false),
        Field::new("team", DataType::Utf8, false),
        Field::new("score", DataType::Int64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(vec!["ada", "grace", "edsger", "barbara", "ken"])),
            Arc::new(StringArray::from(vec!["red", "blue", "red", "blue", "green"])),
            Arc::new(Int64Array::from(vec![42, 17, 8, 23, 15])),
        ],
    )?;
    cluster.register_batches("players", schema, vec![batch])?;
    Ok(())
}
