//! In-process cluster transport
//!
//! Runs every rank as a task inside one process: barriers are a shared
//! `tokio::sync::Barrier`, gather is a slot table drained by rank 0 between
//! two barrier waits, and the collective open hands back a plain
//! [`ChunkReader`] since local filesystems already allow concurrent
//! positional reads.

use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

use mtsum::{ChunkReader, ReadAt};

use crate::transport::{Collective, TransportError};

struct Shared {
    barrier: Barrier,
    slots: Mutex<Vec<Option<Vec<u8>>>>,
    world: usize,
}

/// One rank's handle to an in-process cluster.
pub struct LocalCluster {
    rank: usize,
    shared: Arc<Shared>,
}

impl LocalCluster {
    /// Create handles for all `world` ranks of a fresh cluster.
    ///
    /// Every handle must end up on its own task; collectives wait for all
    /// of them.
    pub fn ranks(world: usize) -> Vec<LocalCluster> {
        assert!(world >= 1, "cluster needs at least one rank");
        let shared = Arc::new(Shared {
            barrier: Barrier::new(world),
            slots: Mutex::new(vec![None; world]),
            world,
        });
        (0..world)
            .map(|rank| LocalCluster {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

#[async_trait]
impl Collective for LocalCluster {
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.shared.world
    }

    async fn barrier(&self) -> Result<(), TransportError> {
        self.shared.barrier.wait().await;
        Ok(())
    }

    async fn gather(&self, payload: Vec<u8>) -> Result<Option<Vec<u8>>, TransportError> {
        self.shared.slots.lock().unwrap()[self.rank] = Some(payload);
        // First wait: all deposits visible. Second wait: rank 0 is done
        // draining, slots are reusable.
        self.shared.barrier.wait().await;

        let gathered = if self.rank == 0 {
            let mut slots = self.shared.slots.lock().unwrap();
            let mut out = Vec::new();
            for (rank, slot) in slots.iter_mut().enumerate() {
                let payload = slot
                    .take()
                    .ok_or_else(|| TransportError::Gather(format!("rank {rank} deposited nothing")))?;
                out.extend_from_slice(&payload);
            }
            Some(out)
        } else {
            None
        };

        self.shared.barrier.wait().await;
        Ok(gathered)
    }

    fn open(&self, path: &Path) -> Result<Arc<dyn ReadAt>, TransportError> {
        Ok(Arc::new(ChunkReader::open(path)?))
    }
}
