use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, Instrument};

use crate::{
    customer::Customer,
    engine::{Simulation, SimulationReport},
    error::{SimError, SimResult},
    scheduler::Event,
};

/// A simulation running on a background task.
///
/// Departed customers are sent over a bounded channel as they complete, so a consumer can report
/// on them while the run is still going. The run does not depend on anyone receiving them.
///
/// Aborts the task when dropped.
#[derive(Debug)]
pub struct SimulationHandle {
    completions: mpsc::Receiver<Customer>,
    handle: Option<JoinHandle<SimResult<SimulationReport>>>,
}

impl Simulation {
    /// Run on a tokio task, buffering up to `buffer` completed customers.
    pub fn spawn(self, buffer: usize) -> SimulationHandle {
        let (tx, rx) = mpsc::channel(buffer);

        let span = self.span();
        let handle = tokio::spawn(drive(self, tx).instrument(span));

        SimulationHandle {
            completions: rx,
            handle: Some(handle),
        }
    }
}

/// Events processed between voluntary yields, so a run nobody is listening to does not hog a
/// runtime worker.
const YIELD_EVERY: usize = 256;

async fn drive(
    mut sim: Simulation,
    tx: mpsc::Sender<Customer>,
) -> SimResult<SimulationReport> {
    let mut tx = Some(tx);
    let mut processed = 0;

    while let Some(event) = sim.step()? {
        processed += 1;
        if processed % YIELD_EVERY == 0 {
            tokio::task::yield_now().await;
        }

        let Event::Departure { customer, .. } = event else {
            continue;
        };

        if let Some(sender) = &tx {
            let record = sim
                .customer(customer)
                .cloned()
                .expect("departed customer should exist");

            if sender.send(record).await.is_err() {
                debug!("Completion receiver closed, continuing without it");
                tx = None;
            }
        }
    }

    Ok(sim.into_report())
}

impl SimulationHandle {
    /// The next customer to depart, or `None` once the run has ended and every completion has
    /// been received.
    pub async fn next_completed(&mut self) -> Option<Customer> {
        self.completions.recv().await
    }

    /// Wait for the run to end and return its report.
    ///
    /// Completions that have not been received yet are still part of the report.
    pub async fn finish(mut self) -> SimResult<SimulationReport> {
        self.completions.close();

        let handle = self
            .handle
            .take()
            .expect("handle should only be taken by finish");

        handle.await.map_err(|_| SimError::Panicked)?
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
