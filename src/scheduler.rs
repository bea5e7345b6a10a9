use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
    fmt::{self, Display},
};

use crate::{
    customer::CustomerId,
    error::{EmptySchedule, SimError, SimResult},
    pool::ServerId,
    Time,
};

/// A scheduled state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A customer enters the system.
    Arrival {
        /// When it happens.
        time: Time,
        /// Who arrives.
        customer: CustomerId,
    },
    /// A customer starts being served by `server`.
    ServiceStart {
        /// When it happens.
        time: Time,
        /// Who is served.
        customer: CustomerId,
        /// The server it was assigned to.
        server: ServerId,
    },
    /// A customer finishes service and leaves.
    Departure {
        /// When it happens.
        time: Time,
        /// Who leaves.
        customer: CustomerId,
    },
}

/// The kind of an [`Event`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// See [`Event::Arrival`].
    Arrival,
    /// See [`Event::ServiceStart`].
    ServiceStart,
    /// See [`Event::Departure`].
    Departure,
}

impl Event {
    /// When this event happens.
    pub fn time(&self) -> Time {
        match self {
            Event::Arrival { time, .. }
            | Event::ServiceStart { time, .. }
            | Event::Departure { time, .. } => *time,
        }
    }

    /// The customer this event moves along.
    pub fn customer(&self) -> CustomerId {
        match self {
            Event::Arrival { customer, .. }
            | Event::ServiceStart { customer, .. }
            | Event::Departure { customer, .. } => *customer,
        }
    }

    /// What kind of event this is.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Arrival { .. } => EventKind::Arrival,
            Event::ServiceStart { .. } => EventKind::ServiceStart,
            Event::Departure { .. } => EventKind::Departure,
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventKind::Arrival => "arrival",
            EventKind::ServiceStart => "service start",
            EventKind::Departure => "departure",
        })
    }
}

/// An event plus the insertion counter used to break timestamp ties.
#[derive(Debug)]
struct Entry {
    seq: u64,
    event: Event,
}

impl Entry {
    fn key(&self) -> (Time, u64) {
        (self.event.time(), self.seq)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Pending events, earliest first.
///
/// Events with equal timestamps come out in the order they were scheduled, so a run is fully
/// determined by its inputs.
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
    now: Time,
}

impl Scheduler {
    /// An empty schedule at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// The timestamp of the most recently popped event.
    pub fn now(&self) -> Time {
        self.now
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no events are pending.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// When the next event will happen, without removing it.
    pub fn peek_time(&self) -> Option<Time> {
        self.queue.peek().map(|Reverse(entry)| entry.event.time())
    }

    /// Add an event. It must not be earlier than [`Scheduler::now`].
    pub fn schedule(&mut self, event: Event) -> SimResult<()> {
        if event.time() < self.now {
            return Err(SimError::InvalidTimestamp {
                customer: event.customer(),
                time: event.time(),
                now: self.now,
            });
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Entry { seq, event }));

        Ok(())
    }

    /// Remove the earliest event and advance the current time to it.
    pub fn pop_next(&mut self) -> Result<Event, EmptySchedule> {
        let Reverse(entry) = self.queue.pop().ok_or(EmptySchedule)?;

        debug_assert!(entry.event.time() >= self.now);
        self.now = entry.event.time();

        Ok(entry.event)
    }
}
