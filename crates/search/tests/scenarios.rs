//! In-process scenarios: supervisor and generators on threads sharing a
//! real segment and real named semaphores.

mod common;

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;

use tricolor_core::{RemovedEdge, Solution};
use tricolor_ipc::{Publish, Received, SemaphoreValues, ShutdownToken, SolutionChannel, CAPACITY};
use tricolor_search::{
    Generator, GeneratorExit, GeneratorOptions, Reporter, Supervisor, SupervisorExit,
};

use common::*;

/// Records improvements; cancels `stop` once an improvement of
/// `stop_at` edges or fewer is seen.
#[derive(Clone)]
struct Recorder {
    improved: Arc<Mutex<Vec<usize>>>,
    colorable: Arc<Mutex<bool>>,
    stop_at: Option<(usize, ShutdownToken)>,
}

impl Recorder {
    fn new(stop_at: Option<(usize, ShutdownToken)>) -> Self {
        Self {
            improved: Arc::default(),
            colorable: Arc::default(),
            stop_at,
        }
    }
}

impl Reporter for Recorder {
    fn improved(&mut self, solution: &Solution) -> io::Result<()> {
        self.improved.lock().unwrap().push(solution.len());
        if let Some((limit, token)) = &self.stop_at {
            if solution.len() <= *limit {
                token.cancel();
            }
        }
        Ok(())
    }

    fn colorable(&mut self) -> io::Result<()> {
        *self.colorable.lock().unwrap() = true;
        Ok(())
    }
}

fn spawn_generators(
    names: &tricolor_core::config::IpcNames,
    edges: &[&str],
    count: u64,
) -> Vec<thread::JoinHandle<tricolor_search::GeneratorReport>> {
    (0..count)
        .map(|i| {
            // attach before the supervisor can possibly finish and unlink
            let channel = SolutionChannel::attach(names).unwrap();
            let graph = graph(edges);
            thread::spawn(move || {
                let options = GeneratorOptions {
                    seed: 1000 + i,
                    max_iterations: None,
                };
                Generator::new(graph, options, ShutdownToken::new())
                    .run(&channel)
                    .unwrap()
            })
        })
        .collect()
}

#[test]
fn triangle_is_reported_colorable() {
    let names = unique_names();
    let channel = SolutionChannel::create(&names, 0o600, false).unwrap();
    let generators = spawn_generators(&names, TRIANGLE, 2);

    let recorder = Recorder::new(None);
    let seen = recorder.clone();
    let supervisor = thread::spawn(move || {
        Supervisor::new(ShutdownToken::new(), recorder)
            .serve(channel)
            .unwrap()
    });

    let report = supervisor.join().unwrap();
    assert_eq!(report.exit, SupervisorExit::Colorable);
    assert_eq!(report.best, Some(Solution::default()));
    assert!(*seen.colorable.lock().unwrap());

    for handle in generators {
        let gen = handle.join().unwrap();
        assert_eq!(gen.exit, GeneratorExit::SupervisorStopped);
    }
    assert_unlinked(&names);
}

#[test]
fn k4_improves_down_to_one_edge_and_never_succeeds() {
    let names = unique_names();
    let channel = SolutionChannel::create(&names, 0o600, false).unwrap();
    let generators = spawn_generators(&names, K4, 3);

    let token = ShutdownToken::new();
    let recorder = Recorder::new(Some((1, token.clone())));
    let seen = recorder.clone();
    let supervisor =
        thread::spawn(move || Supervisor::new(token, recorder).serve(channel).unwrap());

    let report = supervisor.join().unwrap();
    assert_eq!(report.exit, SupervisorExit::Signalled);
    assert_eq!(report.best.as_ref().map(Solution::len), Some(1));
    assert!(!*seen.colorable.lock().unwrap());

    let improved = seen.improved.lock().unwrap().clone();
    assert_eq!(improved.last(), Some(&1));
    assert!(improved.windows(2).all(|w| w[1] < w[0]), "{improved:?} not strictly decreasing");

    for handle in generators {
        assert_eq!(handle.join().unwrap().exit, GeneratorExit::SupervisorStopped);
    }
    assert_unlinked(&names);
}

#[test]
fn concurrent_producers_claim_distinct_slots_in_order() {
    const PRODUCERS: u32 = 4;
    const PER_PRODUCER: u32 = 300;
    let total = (PRODUCERS * PER_PRODUCER) as u64;
    assert!(total > CAPACITY as u64, "must wrap the ring");

    let names = unique_names();
    let owner = SolutionChannel::create(&names, 0o600, false).unwrap();

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let channel = SolutionChannel::attach(&names).unwrap();
            thread::spawn(move || {
                let token = ShutdownToken::new();
                (0..PER_PRODUCER)
                    .map(|seq| {
                        let entry: Solution = [RemovedEdge { from: p, to: seq }].into_iter().collect();
                        match channel.publish(&entry, &token).unwrap() {
                            Publish::Published { cursor } => cursor,
                            other => panic!("unexpected {other:?}"),
                        }
                    })
                    .collect::<Vec<u64>>()
            })
        })
        .collect();

    let token = ShutdownToken::new();
    let mut last_seq: HashMap<u32, u32> = HashMap::new();
    for expected in 0..total {
        assert!(owner.outstanding() <= CAPACITY as u64);
        match owner.recv(&token).unwrap() {
            Received::Entry { cursor, solution } => {
                assert_eq!(cursor, expected);
                let edge = solution.edges()[0];
                // each producer's own entries stay in publication order
                if let Some(prev) = last_seq.insert(edge.from, edge.to) {
                    assert!(edge.to > prev);
                }
            }
            Received::Cancelled => unreachable!(),
        }
    }

    let mut claimed: Vec<u64> = producers
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    claimed.sort_unstable();
    assert_eq!(claimed, (0..total).collect::<Vec<u64>>());

    assert_eq!(
        owner.semaphore_values().unwrap(),
        SemaphoreValues { free: CAPACITY as i32, used: 0, write: 1 }
    );
}

#[test]
fn stop_wakes_producers_blocked_on_a_full_ring() {
    let names = unique_names();
    let owner = SolutionChannel::create(&names, 0o600, false).unwrap();
    let filler = SolutionChannel::attach(&names).unwrap();
    let token = ShutdownToken::new();
    let one: Solution = [RemovedEdge { from: 0, to: 1 }].into_iter().collect();

    for _ in 0..CAPACITY {
        filler.publish(&one, &token).unwrap();
    }

    // these block: one on `free` while holding `write`, the rest on `write`
    let blocked: Vec<_> = (0..3)
        .map(|_| {
            let channel = SolutionChannel::attach(&names).unwrap();
            let entry = one.clone();
            thread::spawn(move || channel.publish(&entry, &ShutdownToken::new()).unwrap())
        })
        .collect();

    thread::sleep(std::time::Duration::from_millis(100));
    owner.signal_stop().unwrap();

    for handle in blocked {
        assert_eq!(handle.join().unwrap(), Publish::Stopped);
    }
    assert_eq!(owner.semaphore_values().unwrap().write, 1);
    assert_eq!(owner.outstanding(), CAPACITY as u64);
}
