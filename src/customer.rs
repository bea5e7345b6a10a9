use std::fmt::{self, Display};

use crate::{pool::ServerId, Time};

/// Identifies a customer. Assigned in arrival order, starting at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CustomerId(u64);

impl CustomerId {
    /// Create an ID from its index in the arrival feed.
    pub fn new(index: u64) -> Self {
        Self(index)
    }

    /// The position of this customer in the arrival feed.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Where a customer is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerState {
    /// Entered the system, not yet placed.
    Arrived,
    /// Queued for the next free server.
    Waiting,
    /// Being served.
    InService,
    /// Service complete. Terminal.
    Departed,
}

/// One simulated arrival and the timings recorded for it.
///
/// Fields are filled in as the customer moves through the system: `seller` on assignment,
/// `response_time` at service start, `turnaround_time` and `throughput` at departure. Once the
/// customer has departed the record no longer changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    id: CustomerId,
    arrival_time: Time,
    /// Service duration requested by the arrival feed, if any.
    requested_service: Option<Time>,
    affinity: Option<ServerId>,

    state: CustomerState,
    seller: Option<ServerId>,
    service_start: Option<Time>,
    service_time: Option<Time>,
    departure_time: Option<Time>,
    throughput: Option<f64>,
}

impl Customer {
    pub(crate) fn new(
        id: CustomerId,
        arrival_time: Time,
        requested_service: Option<Time>,
        affinity: Option<ServerId>,
    ) -> Self {
        Self {
            id,
            arrival_time,
            requested_service,
            affinity,

            state: CustomerState::Arrived,
            seller: None,
            service_start: None,
            service_time: None,
            departure_time: None,
            throughput: None,
        }
    }

    /// This customer's ID.
    pub fn id(&self) -> CustomerId {
        self.id
    }

    /// When this customer entered the system.
    pub fn arrival_time(&self) -> Time {
        self.arrival_time
    }

    /// Where this customer is in its lifecycle.
    pub fn state(&self) -> CustomerState {
        self.state
    }

    /// The seller this customer is bound to, if it may not be served by any other.
    pub fn affinity(&self) -> Option<ServerId> {
        self.affinity
    }

    /// The server that serves (or served) this customer.
    pub fn seller(&self) -> Option<ServerId> {
        self.seller
    }

    /// When service began.
    pub fn service_start(&self) -> Option<Time> {
        self.service_start
    }

    /// The service duration used for this customer, known once service has started.
    pub fn service_time(&self) -> Option<Time> {
        self.service_time
    }

    /// When service completed.
    pub fn departure_time(&self) -> Option<Time> {
        self.departure_time
    }

    /// Time spent waiting before service began.
    pub fn response_time(&self) -> Option<Time> {
        self.service_start.map(|start| start - self.arrival_time)
    }

    /// Time from arrival until service completed.
    pub fn turnaround_time(&self) -> Option<Time> {
        self.departure_time.map(|departure| departure - self.arrival_time)
    }

    /// System throughput at the moment this customer departed.
    pub fn throughput(&self) -> Option<f64> {
        self.throughput
    }

    /// Whether service has completed.
    pub fn is_departed(&self) -> bool {
        self.state == CustomerState::Departed
    }

    pub(crate) fn requested_service(&self) -> Option<Time> {
        self.requested_service
    }

    pub(crate) fn set_seller(&mut self, server: ServerId) {
        debug_assert!(self.seller.is_none(), "{} already has a seller", self.id);
        self.seller = Some(server);
    }

    pub(crate) fn mark_waiting(&mut self) {
        debug_assert_eq!(self.state, CustomerState::Arrived);
        self.state = CustomerState::Waiting;
    }

    pub(crate) fn start_service(&mut self, at: Time, service_time: Time) {
        debug_assert!(self.seller.is_some(), "{} started without a seller", self.id);
        debug_assert!(at >= self.arrival_time);
        debug_assert!(matches!(
            self.state,
            CustomerState::Arrived | CustomerState::Waiting
        ));

        self.state = CustomerState::InService;
        self.service_start = Some(at);
        self.service_time = Some(service_time);
    }

    pub(crate) fn depart(&mut self, at: Time) {
        debug_assert_eq!(self.state, CustomerState::InService);
        debug_assert!(self.service_start.is_some_and(|start| start <= at));

        self.state = CustomerState::Departed;
        self.departure_time = Some(at);
    }

    pub(crate) fn stamp_throughput(&mut self, throughput: f64) {
        self.throughput = Some(throughput);
    }
}
