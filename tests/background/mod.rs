use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use futures::future::join_all;
use queue_sim::{
    Arrival, AssignmentPolicy, Customer, ServerId, Simulation, SimulationConfig, Time,
};
use tokio_test::assert_ok;

use crate::types::workload;

fn simulation(seed: u64) -> Simulation {
    Simulation::new(
        SimulationConfig::default()
            .with_servers(3)
            .with_policy(AssignmentPolicy::LeastBusy),
        workload(seed, 100, 3, 8),
    )
    .unwrap()
}

/// Given a simulation running in the background
/// When we receive every completion
/// Then they arrive in completion order and match the final report
#[tokio::test]
async fn streamed_completions_match_report() {
    let mut handle = simulation(21).spawn(4);

    let mut streamed = Vec::new();
    while let Some(customer) = handle.next_completed().await {
        streamed.push(customer);
    }

    let report = assert_ok!(handle.finish().await);

    assert_eq!(streamed, report.completed);
    assert!(streamed
        .windows(2)
        .all(|pair| pair[0].departure_time() <= pair[1].departure_time()));
}

/// Given the same workload run in the background and in the foreground
/// Then the results are identical
#[tokio::test]
async fn background_run_matches_foreground() {
    let background = tokio_test::task::spawn(simulation(8).spawn(1).finish()).await;
    let background = assert_ok!(background);

    let foreground = simulation(8).run().unwrap();

    assert_eq!(background.completed, foreground.completed);
    assert_eq!(background.summary, foreground.summary);
}

/// Given several runs with the same inputs going at once
/// Then they all agree
#[tokio::test]
async fn concurrent_replays_agree() {
    let runs = (0..4).map(|_| simulation(13).spawn(8).finish());

    let reports: Vec<_> = join_all(runs)
        .await
        .into_iter()
        .map(|report| report.unwrap())
        .collect();

    for report in &reports[1..] {
        assert_eq!(report.completed, reports[0].completed);
        assert_eq!(report.summary, reports[0].summary);
    }
}

/// Given a background run blocked on a full completion channel
/// When its handle is dropped
/// Then the task stops and nobody else is served
#[tokio::test]
async fn dropping_the_handle_aborts_the_run() {
    let started = Arc::new(AtomicUsize::new(0));
    let model = {
        let started = Arc::clone(&started);
        move |_: &Customer, _: ServerId| -> Time {
            started.fetch_add(1, Ordering::SeqCst);
            1
        }
    };

    let arrivals: Vec<_> = (0..100).map(Arrival::at).collect();
    let sim = Simulation::new(SimulationConfig::default(), arrivals)
        .unwrap()
        .with_service_model(model);

    let mut handle = sim.spawn(1);

    // Receiving proves the task is running. It then refills the channel and blocks again.
    assert!(handle.next_completed().await.is_some());
    tokio::task::yield_now().await;

    let at_drop = started.load(Ordering::SeqCst);
    drop(handle);

    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert_eq!(
        started.load(Ordering::SeqCst),
        at_drop,
        "service kept starting after the handle was dropped"
    );
    assert!(at_drop < 100, "the run finished before it could be dropped");
}
