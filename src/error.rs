//! Errors raised while setting up or running a simulation.

use thiserror::Error;

use crate::{customer::CustomerId, pool::ServerId, Time};

/// An error that aborts a simulation run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SimError {
    /// The arrival feed went backwards in time.
    ///
    /// Unrecoverable. Reordering silently would break reproducibility.
    #[error("Customer {customer} arrives at {arrival_time}, before the previous arrival at {previous}")]
    OutOfOrderArrival {
        /// The offending customer.
        customer: CustomerId,
        /// When it claims to arrive.
        arrival_time: Time,
        /// The arrival time of the customer before it.
        previous: Time,
    },

    /// An event was scheduled earlier than the current simulated time.
    ///
    /// Unrecoverable. Indicates a logic error in the engine or a service model.
    #[error("Event for customer {customer} scheduled at {time}, but the current time is {now}")]
    InvalidTimestamp {
        /// The customer the event belongs to.
        customer: CustomerId,
        /// The requested event time.
        time: Time,
        /// The scheduler's current time.
        now: Time,
    },

    /// The customer has no explicit service time and no service model is configured.
    #[error("No service time available for customer {customer}")]
    MissingServiceTime {
        /// The customer about to start service.
        customer: CustomerId,
    },

    /// The configuration asks for a pool without any servers.
    #[error("A simulation needs at least one server")]
    NoServers,

    /// The configuration asks for more servers than can be told apart.
    #[error("Asked for {requested} servers, but a pool holds at most {max}")]
    TooManyServers {
        /// The configured pool size.
        requested: usize,
        /// The largest supported pool size.
        max: usize,
    },

    /// An arrival is bound to a seller that is not in the pool.
    #[error("Customer {customer} is bound to {seller}, which is not in the pool")]
    UnknownSeller {
        /// The offending customer.
        customer: CustomerId,
        /// The seller it asked for.
        seller: ServerId,
    },

    /// A service would end after the last representable tick.
    ///
    /// Unrecoverable. The departure time cannot be recorded faithfully.
    #[error("Service for customer {customer} overflows time: {start} + {service_time}")]
    TimeOverflow {
        /// The customer starting service.
        customer: CustomerId,
        /// When service starts.
        start: Time,
        /// How long it was asked to take.
        service_time: Time,
    },

    /// The task driving the simulation panicked.
    #[error("The simulation task panicked")]
    Panicked,
}

/// The scheduler has no more events.
///
/// This is how a run normally ends, so the engine never surfaces it as a failure.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("No more events are scheduled")]
pub struct EmptySchedule;

/// Every server is busy.
///
/// Recoverable: the customer should wait for the next release.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("No server available for customer {customer}")]
pub struct NoServerAvailable {
    /// The customer that could not be assigned.
    pub customer: CustomerId,
}

/// Result of a simulation operation.
pub type SimResult<T> = std::result::Result<T, SimError>;
