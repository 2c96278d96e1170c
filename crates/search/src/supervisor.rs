//! The consumer loop and the shutdown sequence that owns shared resources.
//!
//! ```text
//! INIT ──▶ RUNNING ──▶ { SUCCESS | SIGNALED | ERROR } ──▶ CLEANUP ──▶ EXIT
//! ```
//!
//! INIT is [`SolutionChannel::create`]; [`Supervisor::serve`] covers the
//! rest. Every terminal state goes through the same cleanup: raise the
//! shared stop flag, then drop the channel, which unmaps and unlinks the
//! segment and closes and unlinks the three semaphores.

use tracing::{info, warn};

use tricolor_core::Solution;
use tricolor_ipc::{IpcError, Received, ShutdownToken, SolutionChannel};

use crate::report::Reporter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorExit {
    /// A zero-length entry arrived: the graph is 3-colorable as is.
    Colorable,
    /// This process was asked to stop.
    Signalled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorReport {
    pub exit: SupervisorExit,
    /// Fewest-edges solution seen, if any entry arrived.
    pub best: Option<Solution>,
    pub received: u64,
    pub improvements: u64,
}

pub struct Supervisor<R: Reporter> {
    token: ShutdownToken,
    reporter: R,
}

impl<R: Reporter> Supervisor<R> {
    pub fn new(token: ShutdownToken, reporter: R) -> Self {
        Self { token, reporter }
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Drain the channel until success or shutdown, then tear it down.
    ///
    /// Cleanup runs on every path, including when draining fails.
    pub fn serve(&mut self, channel: SolutionChannel) -> Result<SupervisorReport, IpcError> {
        let outcome = self.drain(&channel);

        match &outcome {
            Ok(report) => info!(exit = ?report.exit, received = report.received, "supervisor stopping"),
            Err(e) => warn!(error = %e, "supervisor stopping after error"),
        }
        if let Some(signal) = self.token.received_signal() {
            info!(signal, "handled signal");
        }

        if let Err(e) = channel.signal_stop() {
            warn!(error = %e, "failed to signal generators");
        }
        drop(channel);
        info!("cleaned up all resources");

        outcome
    }

    fn drain(&mut self, channel: &SolutionChannel) -> Result<SupervisorReport, IpcError> {
        let mut best: Option<Solution> = None;
        let mut received = 0;
        let mut improvements = 0;

        let exit = loop {
            if self.token.is_cancelled() {
                break SupervisorExit::Signalled;
            }

            let solution = match channel.recv(&self.token)? {
                Received::Entry { solution, .. } => solution,
                Received::Cancelled => break SupervisorExit::Signalled,
            };
            received += 1;

            if solution.is_colorable() {
                if let Err(e) = self.reporter.colorable() {
                    warn!(error = %e, "failed to write report");
                }
                best = Some(solution);
                break SupervisorExit::Colorable;
            }

            if solution.improves_on(best.as_ref()) {
                if let Err(e) = self.reporter.improved(&solution) {
                    warn!(error = %e, "failed to write report");
                }
                improvements += 1;
                best = Some(solution);
            }
        };

        Ok(SupervisorReport {
            exit,
            best,
            received,
            improvements,
        })
    }
}
