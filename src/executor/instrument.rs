use std::time::{Duration, Instant};

use log::{trace, warn};

/// Start/stop accounting for one plan node.
#[derive(Debug, Clone, Default)]
pub struct Instrumentation {
    running_since: Option<Instant>,
    nloops: u64,
    total: Duration,
    ntuples: u64,
}

impl Instrumentation {
    pub fn start_node(&mut self) {
        if self.running_since.is_some() {
            warn!("[start_node] called twice without stop_node");
        }
        self.running_since = Some(Instant::now());
    }

    pub fn stop_node(&mut self, ntuples: u64) {
        let Some(started) = self.running_since.take() else {
            warn!("[stop_node] called without start_node");
            return;
        };
        let elapsed = started.elapsed();
        self.total += elapsed;
        self.nloops += 1;
        self.ntuples += ntuples;
        trace!("[stop_node] loop:{}, tuples:{}, elapsed:{:?}", self.nloops, ntuples, elapsed);
    }

    pub fn nloops(&self) -> u64 {
        self.nloops
    }

    pub fn ntuples(&self) -> u64 {
        self.ntuples
    }

    pub fn total_time(&self) -> Duration {
        self.total
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }
}
