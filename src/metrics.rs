//! Metrics derived from departed customers.

use crate::{
    customer::{Customer, CustomerId},
    Time,
};

/// The timings kept for one departed customer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionRecord {
    /// The departed customer.
    pub customer: CustomerId,
    /// Arrival to service start.
    pub response_time: Time,
    /// Arrival to departure.
    pub turnaround_time: Time,
    /// When the customer departed.
    pub completed_at: Time,
    /// Throughput snapshot taken when this customer departed.
    pub throughput: f64,
}

/// Mean, variance and range of a set of timings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeStats {
    /// Arithmetic mean.
    pub mean: f64,
    /// Population variance.
    pub variance: f64,
    /// Smallest sample.
    pub min: Time,
    /// Largest sample.
    pub max: Time,
}

impl TimeStats {
    fn from_samples(samples: impl Iterator<Item = Time> + Clone) -> Self {
        let count = samples.clone().count();
        if count == 0 {
            return Self::default();
        }

        let mean = samples.clone().map(|t| t as f64).sum::<f64>() / count as f64;
        let variance = samples
            .clone()
            .map(|t| {
                let d = t as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / count as f64;

        Self {
            mean,
            variance,
            min: samples.clone().min().unwrap_or_default(),
            max: samples.max().unwrap_or_default(),
        }
    }

    /// Population standard deviation.
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }
}

/// Aggregate statistics over all departed customers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Summary {
    /// Number of departed customers.
    pub completed: usize,
    /// Arrival to service start.
    pub response_time: TimeStats,
    /// Arrival to departure.
    pub turnaround_time: TimeStats,
    /// Throughput at the last departure.
    pub throughput: f64,
}

/// Accumulates departed customers in completion order.
///
/// Only departed customers are ever recorded, so customers left waiting or in service when a run
/// is cut short never contribute to the statistics.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    records: Vec<CompletionRecord>,
}

impl MetricsAggregator {
    /// An aggregator with nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a departed customer and return the throughput at its departure.
    ///
    /// Customers must be recorded in completion order.
    ///
    /// # Panics
    ///
    /// If the customer has not departed.
    pub fn record(&mut self, customer: &Customer) -> f64 {
        let (Some(response_time), Some(turnaround_time), Some(completed_at)) = (
            customer.response_time(),
            customer.turnaround_time(),
            customer.departure_time(),
        ) else {
            panic!("{} recorded before departing", customer.id());
        };

        debug_assert!(self
            .records
            .last()
            .is_none_or(|last| last.completed_at <= completed_at));

        let throughput = rate(self.records.len() + 1, completed_at);

        self.records.push(CompletionRecord {
            customer: customer.id(),
            response_time,
            turnaround_time,
            completed_at,
            throughput,
        });

        throughput
    }

    /// Customers completed at or before `at`, per unit of simulated time.
    ///
    /// Zero when `at` is zero.
    pub fn snapshot_throughput(&self, at: Time) -> f64 {
        rate(self.completed_by(at), at)
    }

    /// Number of customers that departed at or before `at`.
    pub fn completed_by(&self, at: Time) -> usize {
        self.records
            .partition_point(|record| record.completed_at <= at)
    }

    /// Number of customers recorded.
    pub fn completed(&self) -> usize {
        self.records.len()
    }

    /// Completion records, in completion order.
    pub fn records(&self) -> &[CompletionRecord] {
        &self.records
    }

    /// Statistics over everything recorded so far.
    pub fn summary(&self) -> Summary {
        let last = self.records.last().map(|r| r.completed_at).unwrap_or(0);

        Summary {
            completed: self.records.len(),
            response_time: TimeStats::from_samples(self.records.iter().map(|r| r.response_time)),
            turnaround_time: TimeStats::from_samples(
                self.records.iter().map(|r| r.turnaround_time),
            ),
            throughput: self.snapshot_throughput(last),
        }
    }
}

fn rate(count: usize, at: Time) -> f64 {
    if at == 0 {
        0.0
    } else {
        count as f64 / at as f64
    }
}
