use tracing::{debug, info, info_span, trace, warn, Span};

use crate::{
    arrival::{Arrival, ServiceModel},
    config::{RunLimit, SimulationConfig},
    customer::{Customer, CustomerId, CustomerState},
    error::{EmptySchedule, SimError, SimResult},
    metrics::{MetricsAggregator, Summary},
    pool::{ServerId, ServerPool},
    scheduler::{Event, Scheduler},
    Time,
};

/// A discrete-event simulation of customers served by a pool of servers.
///
/// Owns every piece of state for the run: the event scheduler, the server pool, one record per
/// customer and the metrics aggregator. Events are processed one at a time, in timestamp order,
/// with ties resolved by scheduling order. Given the same arrivals, configuration and service
/// model, two runs produce identical results.
///
/// Drive it to completion with [`Simulation::run`], or one event at a time with
/// [`Simulation::step`].
pub struct Simulation {
    config: SimulationConfig,

    scheduler: Scheduler,
    pool: ServerPool,
    /// Indexed by customer ID.
    customers: Vec<Customer>,
    metrics: MetricsAggregator,

    /// Consulted for customers whose arrival did not specify a service time.
    service_model: Option<Box<dyn ServiceModel>>,

    /// Arrivals processed so far. Arrivals are processed in ID order.
    arrived: usize,
}

/// Everything a finished (or stopped) run hands to its consumer.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Departed customers, in completion order.
    pub completed: Vec<Customer>,
    /// Customers still waiting or in service when the run stopped, in arrival order.
    ///
    /// Not included in `summary`.
    pub open: Vec<Customer>,
    /// Customers in the arrival feed whose arrival was never reached.
    pub not_arrived: usize,
    /// Statistics over `completed`.
    pub summary: Summary,
    /// Totals for each server, by index.
    pub servers: Vec<ServerReport>,
    /// Simulated time of the last processed event.
    pub ended_at: Time,
}

/// Per-server totals for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerReport {
    /// The server these totals belong to.
    pub server: ServerId,
    /// The server's class label, if it was configured with one.
    pub class: Option<String>,
    /// Customers whose service on this server completed.
    pub served: u64,
    /// Time spent serving, including any service still in progress at the end.
    pub busy_time: Time,
    /// Fraction of the run this server was busy.
    pub utilisation: f64,
}

/// Totals for one class of servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassReport {
    /// The class label.
    pub class: String,
    /// Number of servers in the class.
    pub servers: usize,
    /// Customers served to completion by the class.
    pub served: u64,
    /// Open customers held by the class when the run stopped: in service on one of its servers,
    /// or bound to one and still waiting.
    pub unserved: usize,
}

impl SimulationReport {
    /// Served and unserved customers per server class, in the order the classes were configured.
    ///
    /// Unlabelled servers, and waiting customers not bound to a seller, are not counted.
    pub fn class_totals(&self) -> Vec<ClassReport> {
        let mut totals: Vec<ClassReport> = Vec::new();

        for server in &self.servers {
            let Some(class) = &server.class else {
                continue;
            };
            let index = class_slot(&mut totals, class);
            totals[index].servers += 1;
            totals[index].served += server.served;
        }

        for customer in &self.open {
            let class = customer
                .seller()
                .or(customer.affinity())
                .and_then(|server| self.servers.get(server.index()))
                .and_then(|server| server.class.as_deref());

            if let Some(class) = class {
                let index = class_slot(&mut totals, class);
                totals[index].unserved += 1;
            }
        }

        totals
    }
}

fn class_slot(totals: &mut Vec<ClassReport>, class: &str) -> usize {
    match totals.iter().position(|total| total.class == class) {
        Some(index) => index,
        None => {
            totals.push(ClassReport {
                class: class.to_string(),
                servers: 0,
                served: 0,
                unserved: 0,
            });
            totals.len() - 1
        }
    }
}

impl Simulation {
    /// Set up a run. Every arrival is scheduled straight away.
    ///
    /// Arrival times must never decrease, and any seller an arrival is bound to must be in the
    /// pool.
    pub fn new<A>(
        config: SimulationConfig,
        arrivals: impl IntoIterator<Item = A>,
    ) -> SimResult<Self>
    where
        A: Into<Arrival>,
    {
        if config.servers == 0 {
            return Err(SimError::NoServers);
        }

        let mut pool = ServerPool::new(config.servers, config.policy)?;
        pool.label(&config.classes);

        let mut scheduler = Scheduler::new();
        let mut customers = Vec::new();
        let mut previous: Time = 0;

        for (index, arrival) in arrivals.into_iter().enumerate() {
            let arrival: Arrival = arrival.into();
            let id = CustomerId::new(index as u64);

            if arrival.time < previous {
                return Err(SimError::OutOfOrderArrival {
                    customer: id,
                    arrival_time: arrival.time,
                    previous,
                });
            }
            previous = arrival.time;

            if let Some(seller) = arrival.seller {
                if pool.server(seller).is_none() {
                    return Err(SimError::UnknownSeller {
                        customer: id,
                        seller,
                    });
                }
            }

            scheduler.schedule(Event::Arrival {
                time: arrival.time,
                customer: id,
            })?;
            customers.push(Customer::new(id, arrival.time, arrival.service, arrival.seller));
        }

        Ok(Self {
            pool,
            config,
            scheduler,
            customers,
            metrics: MetricsAggregator::new(),
            service_model: None,
            arrived: 0,
        })
    }

    /// Use `model` for customers whose arrival has no service time.
    pub fn with_service_model(self, model: impl ServiceModel + 'static) -> Self {
        Self {
            service_model: Some(Box::new(model)),
            ..self
        }
    }

    /// The configuration this run was set up with.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The current simulated time.
    pub fn now(&self) -> Time {
        self.scheduler.now()
    }

    /// One customer's record.
    pub fn customer(&self, id: CustomerId) -> Option<&Customer> {
        self.customers.get(id.index())
    }

    /// All customer records, in arrival order.
    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    /// The servers and their queues.
    pub fn pool(&self) -> &ServerPool {
        &self.pool
    }

    /// Metrics over the customers departed so far.
    pub fn metrics(&self) -> &MetricsAggregator {
        &self.metrics
    }

    /// Whether [`Simulation::step`] has anything left to do.
    pub fn is_finished(&self) -> bool {
        self.scheduler.is_empty() || self.limit_reached()
    }

    /// Run until no events remain or the run limit is reached.
    pub fn run(mut self) -> SimResult<SimulationReport> {
        let span = self.span();
        let _enter = span.enter();

        info!(config = %self.config, "Starting simulation");

        while self.step()?.is_some() {}

        Ok(self.into_report())
    }

    /// Process the next event and return it.
    ///
    /// Returns `None` once the schedule is empty or the run limit has been reached.
    pub fn step(&mut self) -> SimResult<Option<Event>> {
        if self.limit_reached() {
            return Ok(None);
        }

        let event = match self.scheduler.pop_next() {
            Ok(event) => event,
            Err(EmptySchedule) => return Ok(None),
        };

        debug!(
            time = event.time(),
            customer = %event.customer(),
            kind = %event.kind(),
            "Processing event"
        );

        match event {
            Event::Arrival { time, customer } => self.on_arrival(customer, time)?,
            Event::ServiceStart {
                time,
                customer,
                server,
            } => self.on_service_start(customer, server, time)?,
            Event::Departure { time, customer } => self.on_departure(customer, time)?,
        }

        Ok(Some(event))
    }

    /// Stop here and collect the results.
    pub fn into_report(self) -> SimulationReport {
        let ended_at = self.now();

        let completed: Vec<Customer> = self
            .metrics
            .records()
            .iter()
            .map(|record| self.customers[record.customer.index()].clone())
            .collect();

        let open: Vec<Customer> = self.customers[..self.arrived]
            .iter()
            .filter(|customer| !customer.is_departed())
            .cloned()
            .collect();

        let servers = self
            .pool
            .servers()
            .iter()
            .map(|server| ServerReport {
                server: server.id(),
                class: server.class().map(str::to_string),
                served: server.served(),
                busy_time: server.busy_time(ended_at),
                utilisation: server.utilisation(ended_at),
            })
            .collect();

        let not_arrived = self.customers.len() - self.arrived;

        if !open.is_empty() || not_arrived > 0 {
            warn!(
                open = open.len(),
                not_arrived, "Simulation stopped with customers still in the system"
            );
        }

        info!(
            completed = completed.len(),
            ended_at, "Simulation finished"
        );

        SimulationReport {
            completed,
            open,
            not_arrived,
            summary: self.metrics.summary(),
            servers,
            ended_at,
        }
    }

    pub(crate) fn span(&self) -> Span {
        info_span!(
            "simulation run",
            servers = self.pool.len(),
            customers = self.customers.len()
        )
    }

    fn limit_reached(&self) -> bool {
        match self.config.limit {
            RunLimit::Unbounded => false,
            RunLimit::MaxTime(max) => self.scheduler.peek_time().is_some_and(|next| next > max),
            RunLimit::MaxCustomers(max) => self.metrics.completed() >= max,
        }
    }

    fn on_arrival(&mut self, id: CustomerId, time: Time) -> SimResult<()> {
        debug_assert_eq!(id.index(), self.arrived, "arrivals should be processed in order");
        self.arrived += 1;

        if !self.try_assign(id, time)? {
            let customer = &mut self.customers[id.index()];
            customer.mark_waiting();
            self.pool.enqueue(customer);

            debug!(
                customer = %id,
                seller = ?customer.affinity(),
                waiting = self.pool.waiting_count(),
                "Customer waiting"
            );
        }

        Ok(())
    }

    fn on_service_start(&mut self, id: CustomerId, server: ServerId, time: Time) -> SimResult<()> {
        let customer = &mut self.customers[id.index()];
        debug_assert_eq!(customer.seller(), Some(server));

        let service_time = match customer.requested_service() {
            Some(service_time) => service_time,
            None => self
                .service_model
                .as_mut()
                .ok_or(SimError::MissingServiceTime { customer: id })?
                .service_time(customer, server),
        };

        let departure = time.checked_add(service_time).ok_or(SimError::TimeOverflow {
            customer: id,
            start: time,
            service_time,
        })?;

        customer.start_service(time, service_time);

        trace!(customer = %id, server = %server, response_time = ?customer.response_time());

        self.scheduler.schedule(Event::Departure {
            time: departure,
            customer: id,
        })
    }

    fn on_departure(&mut self, id: CustomerId, time: Time) -> SimResult<()> {
        let customer = &mut self.customers[id.index()];
        let server = customer
            .seller()
            .expect("departing customer should have a seller");

        customer.depart(time);
        let throughput = self.metrics.record(customer);
        customer.stamp_throughput(throughput);

        if let Some(next) = self.pool.release(server, time) {
            if !self.try_assign(next, time)? {
                // Only possible if the released server was somehow taken already.
                self.pool.requeue_front(&self.customers[next.index()]);
            }
        }

        Ok(())
    }

    /// Try to put a customer on a free server, scheduling its service start for `time`.
    fn try_assign(&mut self, id: CustomerId, time: Time) -> SimResult<bool> {
        let customer = &mut self.customers[id.index()];
        debug_assert!(matches!(
            customer.state(),
            CustomerState::Arrived | CustomerState::Waiting
        ));

        match self.pool.assign(customer, time) {
            Ok(server) => {
                self.scheduler.schedule(Event::ServiceStart {
                    time,
                    customer: id,
                    server,
                })?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("config", &self.config)
            .field("now", &self.now())
            .field("pending_events", &self.scheduler.len())
            .field("customers", &self.customers.len())
            .field("completed", &self.metrics.completed())
            .finish_non_exhaustive()
    }
}
