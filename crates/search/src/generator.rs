//! The producer loop: random recoloring, conflict extraction, publication.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, trace};

use tricolor_core::Graph;
use tricolor_ipc::{IpcError, Publish, ShutdownToken, SolutionChannel};

#[derive(Debug, Clone, Copy, Default)]
pub struct GeneratorOptions {
    pub seed: u64,
    /// Stop after this many iterations; unbounded when `None`.
    pub max_iterations: Option<u64>,
}

/// Why the loop ended. All of these are normal exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorExit {
    /// The supervisor set the shared stop flag.
    SupervisorStopped,
    /// This process was asked to stop (signal or token).
    Signalled,
    IterationLimit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorReport {
    pub exit: GeneratorExit,
    pub iterations: u64,
    pub published: u64,
    /// Candidates with more conflicts than fit in a slot.
    pub discarded: u64,
}

/// Per-process search state: the local graph copy, its RNG and the
/// shutdown token.
pub struct Generator {
    graph: Graph,
    rng: StdRng,
    token: ShutdownToken,
    options: GeneratorOptions,
}

impl Generator {
    pub fn new(graph: Graph, options: GeneratorOptions, token: ShutdownToken) -> Self {
        Self {
            graph,
            rng: StdRng::seed_from_u64(options.seed),
            token,
            options,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Search until told to stop. Only resource errors are returned as `Err`.
    pub fn run(&mut self, channel: &SolutionChannel) -> Result<GeneratorReport, IpcError> {
        let mut report = GeneratorReport {
            exit: GeneratorExit::IterationLimit,
            iterations: 0,
            published: 0,
            discarded: 0,
        };

        report.exit = loop {
            if self.token.is_cancelled() {
                break GeneratorExit::Signalled;
            }
            if channel.stop_requested() {
                break GeneratorExit::SupervisorStopped;
            }
            if self
                .options
                .max_iterations
                .is_some_and(|max| report.iterations >= max)
            {
                break GeneratorExit::IterationLimit;
            }
            report.iterations += 1;

            self.graph.randomize_colors(&mut self.rng);
            let candidate = self.graph.removal_candidates();

            // Decide before touching any semaphore; nothing to give back.
            if !candidate.fits() {
                report.discarded += 1;
                trace!(edges = candidate.len(), "discarded oversized candidate");
                continue;
            }

            match channel.publish(&candidate, &self.token)? {
                Publish::Published { cursor } => {
                    report.published += 1;
                    debug!(cursor, edges = candidate.len(), "reported solution");
                }
                Publish::Stopped => break GeneratorExit::SupervisorStopped,
                Publish::Cancelled => break GeneratorExit::Signalled,
            }
        };

        Ok(report)
    }
}
