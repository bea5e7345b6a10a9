//! Deterministic discrete-event simulation of customers served by a pool of sellers.
//!
//! Customers arrive according to an external feed, are assigned to a free server (or wait in a
//! FIFO queue until one frees up), are served for a duration supplied by the feed or by a
//! [`ServiceModel`], and depart. For each customer the engine records which server served it,
//! its response time (arrival to service start), its turnaround time (arrival to departure) and
//! a snapshot of system throughput at the moment it departed.
//!
//! Simulated time is an integer tick count. Events with the same timestamp are processed in the
//! order they were scheduled, so replaying the same inputs always gives the same results.
//!
//! ```
//! use queue_sim::{Simulation, SimulationConfig};
//!
//! // One server, two customers arriving at t=0 and t=1, each needing 5 ticks of service.
//! let report = Simulation::new(SimulationConfig::default(), [(0, 5), (1, 5)])?.run()?;
//!
//! let second = &report.completed[1];
//! assert_eq!(second.response_time(), Some(4));
//! assert_eq!(second.turnaround_time(), Some(9));
//! # Ok::<(), queue_sim::SimError>(())
//! ```
//!
//! Customers can also be bound to one seller, waiting in that seller's own queue, and sellers
//! can be grouped into labelled classes. See [`Arrival::for_seller`] and
//! [`SimulationConfig::with_server_classes`].
//!
//! See the README for a longer example.

#![deny(missing_docs)]

#[cfg(doctest)]
use doc_comment::doctest;
#[cfg(doctest)]
doctest!("../README.md");

mod arrival;
mod config;
mod customer;
mod engine;
pub mod error;
pub mod metrics;
mod pool;
mod runner;
mod scheduler;

pub use arrival::{Arrival, FixedService, ServiceModel};
pub use config::{RunLimit, SimulationConfig};
pub use customer::{Customer, CustomerId, CustomerState};
pub use engine::{ClassReport, ServerReport, Simulation, SimulationReport};
pub use error::{SimError, SimResult};
pub use metrics::{MetricsAggregator, Summary, TimeStats};
pub use pool::{AssignmentPolicy, Server, ServerId, ServerPool};
pub use runner::SimulationHandle;
pub use scheduler::{Event, EventKind, Scheduler};

/// Simulated time, in ticks.
pub type Time = u64;
