use std::{
    collections::VecDeque,
    fmt::{self, Display},
};

use tracing::trace;

use crate::{
    customer::{Customer, CustomerId},
    error::{NoServerAvailable, SimError, SimResult},
    Time,
};

/// Identifies a server ("seller") within a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerId(u16);

impl ServerId {
    /// Create an ID from the server's index in the pool.
    pub fn new(index: u16) -> Self {
        Self(index)
    }

    /// The position of this server in the pool.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// How the pool picks among free servers.
///
/// Only applies to customers without a seller of their own. A customer bound to a seller is only
/// ever served by that seller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssignmentPolicy {
    /// The free server with the lowest index.
    #[default]
    LowestIndex,
    /// The first free server after the one assigned most recently, wrapping around.
    RoundRobin,
    /// The free server with the least accumulated busy time. Ties go to the lowest index.
    LeastBusy,
}

/// One server, the customers queued for it specifically, and its running totals.
#[derive(Debug, Clone)]
pub struct Server {
    id: ServerId,
    class: Option<String>,
    occupant: Option<CustomerId>,
    /// Customers bound to this server, waiting for it.
    queue: VecDeque<CustomerId>,
    busy_since: Time,
    busy_time: Time,
    served: u64,
}

impl Server {
    fn new(id: ServerId) -> Self {
        Self {
            id,
            class: None,
            occupant: None,
            queue: VecDeque::new(),
            busy_since: 0,
            busy_time: 0,
            served: 0,
        }
    }

    /// This server's ID.
    pub fn id(&self) -> ServerId {
        self.id
    }

    /// The class label this server was configured with, if any.
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// The customer currently being served, if any.
    pub fn occupant(&self) -> Option<CustomerId> {
        self.occupant
    }

    /// Whether nobody is being served.
    pub fn is_free(&self) -> bool {
        self.occupant.is_none()
    }

    /// Customers bound to this server and waiting for it, oldest first.
    pub fn waiting(&self) -> impl Iterator<Item = CustomerId> + '_ {
        self.queue.iter().copied()
    }

    /// Busy time accumulated up to `now`, including any service still in progress.
    pub fn busy_time(&self, now: Time) -> Time {
        match self.occupant {
            Some(_) => self.busy_time + now.saturating_sub(self.busy_since),
            None => self.busy_time,
        }
    }

    /// Number of customers whose service on this server has finished.
    pub fn served(&self) -> u64 {
        self.served
    }

    /// Fraction of `[0, now]` this server spent busy.
    pub fn utilisation(&self, now: Time) -> f64 {
        if now == 0 {
            0.0
        } else {
            self.busy_time(now) as f64 / now as f64
        }
    }
}

/// A fixed set of servers plus the customers waiting for them.
///
/// Customers without a seller of their own wait in one FIFO queue shared by the whole pool.
/// Customers bound to a seller wait in that seller's queue. A released server takes whichever
/// head of those two queues arrived first.
#[derive(Debug)]
pub struct ServerPool {
    servers: Vec<Server>,
    policy: AssignmentPolicy,
    /// Where `RoundRobin` starts looking next.
    cursor: usize,
    waiting: VecDeque<CustomerId>,
}

impl ServerPool {
    /// The largest pool that can be built. Every server needs a distinct [`ServerId`].
    pub const MAX_SERVERS: usize = u16::MAX as usize + 1;

    /// Create a pool of `size` idle servers, numbered from zero.
    ///
    /// Fails with [`SimError::TooManyServers`] above [`ServerPool::MAX_SERVERS`].
    pub fn new(size: usize, policy: AssignmentPolicy) -> SimResult<Self> {
        if size > Self::MAX_SERVERS {
            return Err(SimError::TooManyServers {
                requested: size,
                max: Self::MAX_SERVERS,
            });
        }

        let servers = (0..=u16::MAX)
            .take(size)
            .map(|index| Server::new(ServerId::new(index)))
            .collect();

        Ok(Self {
            servers,
            policy,
            cursor: 0,
            waiting: VecDeque::new(),
        })
    }

    /// Label servers with classes, in index order: `count` servers per class.
    ///
    /// Servers past the end of `classes` stay unlabelled.
    pub(crate) fn label(&mut self, classes: &[(String, usize)]) {
        let labels = classes
            .iter()
            .flat_map(|(class, count)| std::iter::repeat(class).take(*count));

        for (server, class) in self.servers.iter_mut().zip(labels) {
            server.class = Some(class.clone());
        }
    }

    /// Number of servers.
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Whether the pool has no servers at all.
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// All servers, by index.
    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    /// Look up one server.
    pub fn server(&self, id: ServerId) -> Option<&Server> {
        self.servers.get(id.index())
    }

    /// Number of servers without a customer.
    pub fn available(&self) -> usize {
        self.servers.iter().filter(|s| s.is_free()).count()
    }

    /// Number of servers with a customer.
    pub fn in_use(&self) -> usize {
        self.len() - self.available()
    }

    /// Customers without a seller of their own, waiting for any server, oldest first.
    pub fn waiting(&self) -> impl Iterator<Item = CustomerId> + '_ {
        self.waiting.iter().copied()
    }

    /// Every waiting customer, in the shared queue and in per-server queues.
    pub fn waiting_count(&self) -> usize {
        self.waiting.len() + self.servers.iter().map(|s| s.queue.len()).sum::<usize>()
    }

    /// Put a customer on a free server, recording the server as the customer's seller.
    ///
    /// A customer bound to a seller can only be put on that seller.
    pub fn assign(
        &mut self,
        customer: &mut Customer,
        at: Time,
    ) -> Result<ServerId, NoServerAvailable> {
        let unavailable = NoServerAvailable {
            customer: customer.id(),
        };

        let index = match customer.affinity() {
            Some(bound) => self
                .servers
                .get(bound.index())
                .filter(|server| server.is_free())
                .map(|_| bound.index())
                .ok_or(unavailable)?,
            None => self.pick(at).ok_or(unavailable)?,
        };

        self.cursor = (index + 1) % self.servers.len();

        let server = &mut self.servers[index];
        server.occupant = Some(customer.id());
        server.busy_since = at;
        let id = server.id;

        customer.set_seller(id);

        trace!(customer = %customer.id(), server = %id, at, "assigned");

        Ok(id)
    }

    /// Free a server and hand back the customer who should take it next, if any.
    ///
    /// That is the earlier arrival of the head of the shared queue and the head of this server's
    /// own queue. The returned customer is no longer queued. It is the caller's job to assign it.
    pub fn release(&mut self, id: ServerId, at: Time) -> Option<CustomerId> {
        let server = self.servers.get_mut(id.index())?;

        if server.occupant.take().is_some() {
            server.busy_time += at.saturating_sub(server.busy_since);
            server.served += 1;
        }

        trace!(server = %id, at, waiting = self.waiting.len(), "released");

        // Customer IDs follow arrival order.
        match (server.queue.front(), self.waiting.front()) {
            (Some(own), Some(shared)) if own < shared => server.queue.pop_front(),
            (Some(_), None) => server.queue.pop_front(),
            _ => self.waiting.pop_front(),
        }
    }

    /// Queue a customer for the next free server it may use.
    pub fn enqueue(&mut self, customer: &Customer) {
        match self.queue_for(customer) {
            Some(queue) => queue.push_back(customer.id()),
            None => self.waiting.push_back(customer.id()),
        }
    }

    /// Put a customer back at the head of its queue.
    pub(crate) fn requeue_front(&mut self, customer: &Customer) {
        match self.queue_for(customer) {
            Some(queue) => queue.push_front(customer.id()),
            None => self.waiting.push_front(customer.id()),
        }
    }

    fn queue_for(&mut self, customer: &Customer) -> Option<&mut VecDeque<CustomerId>> {
        let bound = customer.affinity()?;
        self.servers
            .get_mut(bound.index())
            .map(|server| &mut server.queue)
    }

    fn pick(&self, at: Time) -> Option<usize> {
        let free = |index: &usize| self.servers[*index].is_free();

        match self.policy {
            AssignmentPolicy::LowestIndex => (0..self.servers.len()).find(free),

            AssignmentPolicy::RoundRobin => {
                let n = self.servers.len();
                (0..n).map(|offset| (self.cursor + offset) % n).find(free)
            }

            AssignmentPolicy::LeastBusy => (0..self.servers.len())
                .filter(free)
                .min_by_key(|index| (self.servers[*index].busy_time(at), *index)),
        }
    }
}
