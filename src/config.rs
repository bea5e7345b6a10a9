use std::fmt::{self, Display};

use crate::{pool::AssignmentPolicy, Time};

/// When a run stops, other than by running out of events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum RunLimit {
    /// Run until no events remain.
    #[default]
    Unbounded,
    /// Do not process any event later than this time.
    MaxTime(Time),
    /// Stop once this many customers have departed.
    MaxCustomers(usize),
}

/// Parameters of a simulation run.
///
/// Servers can be plain, or grouped into labelled classes in index order:
///
/// ```
/// use queue_sim::SimulationConfig;
///
/// // One high-price seller, then three medium, then six low.
/// let config = SimulationConfig::default().with_server_classes([("H", 1), ("M", 3), ("L", 6)]);
///
/// assert_eq!(config.servers(), 10);
/// ```
///
/// ```
/// use queue_sim::{AssignmentPolicy, RunLimit, SimulationConfig};
///
/// let config = SimulationConfig::default()
///     .with_servers(3)
///     .with_policy(AssignmentPolicy::RoundRobin)
///     .with_limit(RunLimit::MaxTime(60));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct SimulationConfig {
    pub(crate) servers: usize,
    pub(crate) classes: Vec<(String, usize)>,
    pub(crate) policy: AssignmentPolicy,
    pub(crate) limit: RunLimit,
}

impl SimulationConfig {
    /// The number of servers in the pool, none of them labelled.
    pub fn with_servers(self, servers: usize) -> Self {
        Self {
            servers,
            classes: Vec::new(),
            ..self
        }
    }

    /// Build the pool from labelled classes, `count` servers each, in the given order.
    ///
    /// Replaces any earlier server count.
    pub fn with_server_classes<L>(self, classes: impl IntoIterator<Item = (L, usize)>) -> Self
    where
        L: Into<String>,
    {
        let classes: Vec<(String, usize)> = classes
            .into_iter()
            .map(|(label, count)| (label.into(), count))
            .collect();

        Self {
            servers: classes.iter().map(|(_, count)| count).sum(),
            classes,
            ..self
        }
    }

    /// How free servers are chosen.
    pub fn with_policy(self, policy: AssignmentPolicy) -> Self {
        Self { policy, ..self }
    }

    /// When to stop early.
    pub fn with_limit(self, limit: RunLimit) -> Self {
        Self { limit, ..self }
    }

    /// The number of servers in the pool.
    pub fn servers(&self) -> usize {
        self.servers
    }

    /// Server classes and how many servers each has, in index order.
    pub fn server_classes(&self) -> &[(String, usize)] {
        &self.classes
    }

    /// How free servers are chosen.
    pub fn policy(&self) -> AssignmentPolicy {
        self.policy
    }

    /// When the run stops early.
    pub fn limit(&self) -> RunLimit {
        self.limit
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            servers: 1,
            classes: Vec::new(),
            policy: AssignmentPolicy::default(),
            limit: RunLimit::default(),
        }
    }
}

impl Display for RunLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunLimit::Unbounded => f.write_str("unbounded"),
            RunLimit::MaxTime(time) => write!(f, "until time {time}"),
            RunLimit::MaxCustomers(count) => write!(f, "until {count} customers depart"),
        }
    }
}

impl Display for SimulationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "servers: {}, policy: {:?}, limit: {}",
            self.servers, self.policy, self.limit
        )?;

        if !self.classes.is_empty() {
            f.write_str(", classes:")?;
            for (label, count) in &self.classes {
                write!(f, " {label}x{count}")?;
            }
        }

        Ok(())
    }
}
