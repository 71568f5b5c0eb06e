#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fathom_cluster::ClusterProvider;
use fathom_common::HarnessConfig;
use fathom_error::{ErrorCode, FathomError, Result};

/// A cluster stand-in that records how many instances are alive.
#[derive(Debug)]
pub struct FakeCluster {
    pub id: u64,
    pub alive: AtomicBool,
}

#[derive(Default)]
pub struct FakeProvider {
    next_id: AtomicU64,
    pub created: AtomicU64,
    pub destroyed: AtomicU64,
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
    pub fail_start: AtomicBool,
    pub fail_stop: AtomicBool,
    /// Simulated start latency, widens race windows in threaded tests
    pub start_delay_ms: u64,
}

impl FakeProvider {
    pub fn with_start_delay(ms: u64) -> Self {
        Self {
            start_delay_ms: ms,
            ..Default::default()
        }
    }

    pub fn created(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> u64 {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl ClusterProvider for FakeProvider {
    type Handle = FakeCluster;

    fn create(&self, _config: &HarnessConfig) -> Result<FakeCluster> {
        if self.start_delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.start_delay_ms));
        }
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(FathomError::new(ErrorCode::Unknown, "no free ports"));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);
        Ok(FakeCluster {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            alive: AtomicBool::new(true),
        })
    }

    fn destroy(&self, handle: &FakeCluster) -> Result<()> {
        handle.alive.store(false, Ordering::SeqCst);
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_sub(1, Ordering::SeqCst);
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(FathomError::new(ErrorCode::Unknown, "region server hung"));
        }
        Ok(())
    }

    fn instance_id(&self, handle: &FakeCluster) -> String {
        format!("fake-{}", handle.id)
    }
}

pub fn assert_alive(cluster: &Arc<FakeCluster>) {
    assert!(
        cluster.alive.load(Ordering::SeqCst),
        "cluster fake-{} used after teardown",
        cluster.id
    );
}
