use std::collections::HashSet;

use queue_sim::{
    Arrival, AssignmentPolicy, ClassReport, Customer, CustomerId, CustomerState, RunLimit,
    ServerId, ServerPool, SimError, Simulation, SimulationConfig, Time,
};

use crate::types::run;

/// Given one server
/// When two customers arrive at 0 and 1, each needing 5 ticks
/// Then the second waits until the first leaves at 5
#[test]
fn single_server_two_arrivals() {
    let report = run(1, &[(0, 5), (1, 5)]);

    let first = &report.completed[0];
    assert_eq!(first.id(), CustomerId::new(0));
    assert_eq!(first.seller(), Some(ServerId::new(0)));
    assert_eq!(first.response_time(), Some(0));
    assert_eq!(first.turnaround_time(), Some(5));

    let second = &report.completed[1];
    assert_eq!(second.id(), CustomerId::new(1));
    assert_eq!(second.seller(), Some(ServerId::new(0)));
    assert_eq!(second.service_start(), Some(5));
    assert_eq!(second.response_time(), Some(4));
    assert_eq!(second.turnaround_time(), Some(9));
}

/// Given two servers
/// When two customers arrive together at 0
/// Then both are served immediately on different servers
#[test]
fn two_servers_simultaneous_arrivals() {
    let report = run(2, &[(0, 3), (0, 3)]);

    for customer in &report.completed {
        assert_eq!(customer.response_time(), Some(0));
        assert_eq!(customer.turnaround_time(), Some(3));
    }

    let sellers: Vec<_> = report.completed.iter().map(|c| c.seller()).collect();
    assert_eq!(
        sellers,
        vec![Some(ServerId::new(0)), Some(ServerId::new(1))]
    );
    assert_eq!(report.summary.response_time.max, 0);
}

/// Given no arrivals
/// Then the run ends straight away with nothing completed
#[test]
fn empty_arrival_feed() {
    let sim = Simulation::new(SimulationConfig::default(), Vec::<Arrival>::new()).unwrap();
    assert!(sim.is_finished());

    let report = sim.run().unwrap();

    assert!(report.completed.is_empty());
    assert!(report.open.is_empty());
    assert_eq!(report.ended_at, 0);
    assert_eq!(report.summary.completed, 0);
    assert_eq!(report.summary.throughput, 0.0);
}

#[test]
fn out_of_order_arrivals_are_rejected() {
    let err = Simulation::new(SimulationConfig::default(), [(0, 1), (5, 1), (4, 1)]).unwrap_err();

    assert_eq!(
        err,
        SimError::OutOfOrderArrival {
            customer: CustomerId::new(2),
            arrival_time: 4,
            previous: 5,
        }
    );
}

#[test]
fn equal_arrival_times_are_in_order() {
    assert!(Simulation::new(SimulationConfig::default(), [(3, 1), (3, 1), (3, 1)]).is_ok());
}

/// Given one server and a burst of arrivals
/// Then waiting customers are served first come, first served
#[test]
fn waiting_customers_are_served_fifo() {
    let report = run(1, &[(0, 10), (1, 1), (2, 1), (3, 1)]);

    let starts: Vec<_> = report
        .completed
        .iter()
        .map(|c| (c.id().index(), c.service_start()))
        .collect();

    assert_eq!(
        starts,
        vec![(0, Some(0)), (1, Some(10)), (2, Some(11)), (3, Some(12))]
    );
}

/// Given an arrival and a departure at the same tick
/// Then the arrival (scheduled first) waits and takes the freed server at that same tick
#[test]
fn arrival_and_departure_on_the_same_tick() {
    let report = run(1, &[(0, 2), (2, 2)]);

    let second = &report.completed[1];
    assert_eq!(second.service_start(), Some(2));
    assert_eq!(second.response_time(), Some(0));
}

#[test]
fn round_robin_spreads_work() {
    let report = Simulation::new(
        SimulationConfig::default()
            .with_servers(3)
            .with_policy(AssignmentPolicy::RoundRobin),
        [(0, 1), (2, 1), (4, 1)],
    )
    .unwrap()
    .run()
    .unwrap();

    let sellers: Vec<_> = report
        .completed
        .iter()
        .map(|c| c.seller().map(|s| s.index()))
        .collect();
    assert_eq!(sellers, vec![Some(0), Some(1), Some(2)]);

    // Lowest-index would have reused the first server every time.
    let report = Simulation::new(
        SimulationConfig::default().with_servers(3),
        [(0, 1), (2, 1), (4, 1)],
    )
    .unwrap()
    .run()
    .unwrap();

    let sellers: Vec<_> = report
        .completed
        .iter()
        .map(|c| c.seller().map(|s| s.index()))
        .collect();
    assert_eq!(sellers, vec![Some(0), Some(0), Some(0)]);
}

#[test]
fn stepping_exposes_intermediate_states() {
    let mut sim = Simulation::new(SimulationConfig::default(), [(0, 4), (1, 4)]).unwrap();

    // Arrival and service start of the first customer, then arrival of the second.
    for _ in 0..3 {
        sim.step().unwrap();
    }

    let first = sim.customer(CustomerId::new(0)).unwrap();
    let second = sim.customer(CustomerId::new(1)).unwrap();

    assert_eq!(first.state(), CustomerState::InService);
    assert_eq!(second.state(), CustomerState::Waiting);
    assert_eq!(second.seller(), None);
    assert_eq!(sim.now(), 1);
    assert_eq!(
        sim.pool().waiting().collect::<Vec<_>>(),
        vec![CustomerId::new(1)]
    );
}

/// Given the largest pool there is, all of it busy
/// When two more customers arrive
/// Then both wait, and take the first two servers to be released
#[test]
fn largest_pool_never_shares_a_server() {
    let servers = ServerPool::MAX_SERVERS;
    let arrivals = std::iter::repeat((0, 10))
        .take(servers)
        .chain([(0, 1), (2, 3)]);

    let report = Simulation::new(
        SimulationConfig::default()
            .with_servers(servers)
            .with_policy(AssignmentPolicy::RoundRobin),
        arrivals,
    )
    .unwrap()
    .run()
    .unwrap();

    assert_eq!(report.completed.len(), servers + 2);

    let first_wave: HashSet<_> = report
        .completed
        .iter()
        .filter(|c| c.service_start() == Some(0))
        .map(|c| c.seller())
        .collect();
    assert_eq!(first_wave.len(), servers, "every server should get its own customer");

    let late: Vec<_> = report
        .completed
        .iter()
        .filter(|c| c.id().index() >= servers)
        .map(|c| (c.seller(), c.service_start()))
        .collect();
    assert_eq!(
        late,
        vec![
            (Some(ServerId::new(0)), Some(10)),
            (Some(ServerId::new(1)), Some(10)),
        ]
    );
}

#[test]
fn pool_too_large_to_number_is_rejected() {
    let err = Simulation::new(
        SimulationConfig::default().with_servers(ServerPool::MAX_SERVERS + 1),
        [(0, 1)],
    )
    .unwrap_err();

    assert!(matches!(err, SimError::TooManyServers { .. }));
}

/// Given two servers and customers bound to the second
/// Then they queue for it even while the first is idle
#[test]
fn bound_customers_wait_for_their_seller() {
    let second = ServerId::new(1);

    let report = Simulation::new(
        SimulationConfig::default().with_servers(2),
        [
            Arrival::with_service(0, 4).for_seller(second),
            Arrival::with_service(1, 4).for_seller(second),
            Arrival::with_service(2, 1),
        ],
    )
    .unwrap()
    .run()
    .unwrap();

    let served: Vec<_> = report
        .completed
        .iter()
        .map(|c| (c.id().index(), c.seller().map(|s| s.index()), c.service_start()))
        .collect();

    assert_eq!(
        served,
        vec![(2, Some(0), Some(2)), (0, Some(1), Some(0)), (1, Some(1), Some(4))]
    );
    assert_eq!(report.completed[2].response_time(), Some(3));
}

/// Given one server with customers waiting both for it specifically and for anyone
/// Then it serves them in arrival order across both queues
#[test]
fn shared_and_own_queues_interleave_by_arrival() {
    let report = Simulation::new(
        SimulationConfig::default(),
        [
            Arrival::with_service(0, 5),
            Arrival::with_service(1, 1),
            Arrival::with_service(2, 1).for_seller(ServerId::new(0)),
            Arrival::with_service(3, 1),
        ],
    )
    .unwrap()
    .run()
    .unwrap();

    let starts: Vec<_> = report
        .completed
        .iter()
        .map(|c| (c.id().index(), c.service_start()))
        .collect();

    assert_eq!(
        starts,
        vec![(0, Some(0)), (1, Some(5)), (2, Some(6)), (3, Some(7))]
    );
}

/// Given high, medium and low sellers with three customers each, slower down the classes
/// When the run is cut off part way
/// Then each class reports who it served and who it still had
#[test]
fn seller_classes_report_served_and_unserved() {
    let by_class = |_: &Customer, server: ServerId| -> Time { server.index() as Time + 1 };

    let arrivals: Vec<_> = (0..3u16)
        .flat_map(|seller| std::iter::repeat(seller).take(3))
        .map(|seller| Arrival::at(0).for_seller(ServerId::new(seller)))
        .collect();

    let report = Simulation::new(
        SimulationConfig::default()
            .with_server_classes([("H", 1), ("M", 1), ("L", 1)])
            .with_limit(RunLimit::MaxTime(5)),
        arrivals,
    )
    .unwrap()
    .with_service_model(by_class)
    .run()
    .unwrap();

    let class = |class: &str, served, unserved| ClassReport {
        class: class.to_string(),
        servers: 1,
        served,
        unserved,
    };

    assert_eq!(
        report.class_totals(),
        vec![class("H", 3, 0), class("M", 2, 1), class("L", 1, 2)]
    );
    assert_eq!(report.summary.completed, 6);
}
