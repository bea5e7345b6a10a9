//! Inputs supplied from outside the engine: the arrival feed and the service-time model.

use crate::{customer::Customer, pool::ServerId, Time};

/// One entry in the arrival feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrival {
    /// When the customer enters the system.
    pub time: Time,
    /// How long serving this customer takes. When absent, the simulation's [`ServiceModel`]
    /// decides at service start.
    pub service: Option<Time>,
    /// The only seller allowed to serve this customer. When absent, any seller may.
    pub seller: Option<ServerId>,
}

impl Arrival {
    /// An arrival whose service time is left to the service model.
    pub fn at(time: Time) -> Self {
        Self {
            time,
            service: None,
            seller: None,
        }
    }

    /// An arrival with a known service time.
    pub fn with_service(time: Time, service: Time) -> Self {
        Self {
            time,
            service: Some(service),
            seller: None,
        }
    }

    /// Bind this customer to one seller. It waits in that seller's own queue until the seller is
    /// free, even when others are idle.
    pub fn for_seller(self, seller: ServerId) -> Self {
        Self {
            seller: Some(seller),
            ..self
        }
    }
}

impl From<(Time, Time)> for Arrival {
    fn from((time, service): (Time, Time)) -> Self {
        Self::with_service(time, service)
    }
}

/// Decides how long a customer's service takes.
///
/// Consulted once per customer, when service starts on `server`, and only for customers whose
/// arrival did not specify a service time. Implementations that sample from a distribution should
/// use a seeded generator if runs need to be reproducible.
pub trait ServiceModel: Send {
    /// How long `customer` takes to serve on `server`.
    fn service_time(&mut self, customer: &Customer, server: ServerId) -> Time;
}

/// Every customer takes the same time to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedService(pub Time);

impl ServiceModel for FixedService {
    fn service_time(&mut self, _customer: &Customer, _server: ServerId) -> Time {
        self.0
    }
}

impl<F> ServiceModel for F
where
    F: FnMut(&Customer, ServerId) -> Time + Send,
{
    fn service_time(&mut self, customer: &Customer, server: ServerId) -> Time {
        self(customer, server)
    }
}
