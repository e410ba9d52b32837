use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::cluster::{ClusterConfig, ClusterIndex, build_cluster_index};

struct ClusterRequest {
    generation: u64,
    config: ClusterConfig,
}

pub struct ClusterResult {
    pub generation: u64,
    pub index: Arc<ClusterIndex>,
    pub elapsed: Duration,
}

/// Rebuilds cluster indexes off the UI thread. Only the result of the most
/// recent `submit` is ever handed back.
pub struct ClusterWorker {
    requests: Option<Sender<ClusterRequest>>,
    results: Receiver<ClusterResult>,
    handle: Option<JoinHandle<()>>,
    generation: u64,
    delivered: u64,
}

impl ClusterWorker {
    pub fn spawn(catalog: Arc<Catalog>) -> anyhow::Result<Self> {
        let (request_tx, request_rx) = mpsc::channel();
        let (result_tx, result_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("soundmap-cluster".to_owned())
            .spawn(move || run(&catalog, &request_rx, &result_tx))
            .context("failed to spawn clustering worker thread")?;

        Ok(Self {
            requests: Some(request_tx),
            results: result_rx,
            handle: Some(handle),
            generation: 0,
            delivered: 0,
        })
    }

    /// Queues a rebuild and returns its generation. Earlier pending requests
    /// are superseded.
    pub fn submit(&mut self, config: ClusterConfig) -> u64 {
        self.generation += 1;
        let request = ClusterRequest {
            generation: self.generation,
            config,
        };
        let sent = self
            .requests
            .as_ref()
            .is_some_and(|requests| requests.send(request).is_ok());
        if !sent {
            warn!(generation = self.generation, "clustering worker is gone, request dropped");
        }
        self.generation
    }

    pub fn is_pending(&self) -> bool {
        self.delivered != self.generation
    }

    /// Non-blocking poll for the result of the latest request.
    pub fn try_recv(&mut self) -> anyhow::Result<Option<ClusterResult>> {
        loop {
            match self.results.try_recv() {
                Ok(result) if result.generation == self.generation => {
                    self.delivered = result.generation;
                    return Ok(Some(result));
                }
                Ok(stale) => {
                    debug!(
                        generation = stale.generation,
                        latest = self.generation,
                        "discarding stale cluster index"
                    );
                }
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => bail!("clustering worker disconnected"),
            }
        }
    }
}

impl Drop for ClusterWorker {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("clustering worker panicked");
        }
    }
}

fn run(catalog: &Catalog, requests: &Receiver<ClusterRequest>, results: &Sender<ClusterResult>) {
    while let Ok(mut request) = requests.recv() {
        // only the newest queued request matters
        while let Ok(newer) = requests.try_recv() {
            request = newer;
        }

        let started = Instant::now();
        let index = build_cluster_index(catalog, &request.config);
        let elapsed = started.elapsed();
        debug!(
            generation = request.generation,
            elapsed_ms = elapsed.as_millis() as u64,
            "cluster index rebuilt"
        );

        let result = ClusterResult {
            generation: request.generation,
            index: Arc::new(index),
            elapsed,
        };
        if results.send(result).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{GroupBy, sample_catalog};

    fn wait_for(worker: &mut ClusterWorker) -> ClusterResult {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(result) = worker.try_recv().unwrap() {
                return result;
            }
            assert!(Instant::now() < deadline, "worker did not answer in time");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn background_build_matches_synchronous_build() {
        let catalog = Arc::new(sample_catalog());
        let mut worker = ClusterWorker::spawn(Arc::clone(&catalog)).unwrap();
        let config = ClusterConfig::default();

        let generation = worker.submit(config);
        assert!(worker.is_pending());
        let result = wait_for(&mut worker);

        assert_eq!(result.generation, generation);
        assert_eq!(*result.index, build_cluster_index(&catalog, &config));
        assert!(!worker.is_pending());
    }

    #[test]
    fn only_latest_request_is_delivered() {
        let catalog = Arc::new(sample_catalog());
        let mut worker = ClusterWorker::spawn(Arc::clone(&catalog)).unwrap();

        worker.submit(ClusterConfig::default());
        worker.submit(ClusterConfig {
            min_cluster_size: 4,
            ..ClusterConfig::default()
        });
        let latest = ClusterConfig {
            group_by: GroupBy::Label,
            min_cluster_size: 2,
            ..ClusterConfig::default()
        };
        let generation = worker.submit(latest);

        let result = wait_for(&mut worker);
        assert_eq!(result.generation, generation);
        assert_eq!(*result.index, build_cluster_index(&catalog, &latest));

        thread::sleep(Duration::from_millis(20));
        assert!(worker.try_recv().unwrap().is_none());
    }
}
