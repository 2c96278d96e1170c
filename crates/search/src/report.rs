//! User-facing output of the supervisor.

use std::io::{self, Write};

use tricolor_core::Solution;

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Receives the supervisor's noteworthy events.
pub trait Reporter {
    fn started(&mut self, _pid: u32) -> io::Result<()> {
        Ok(())
    }

    /// A solution with fewer edges than any seen before.
    fn improved(&mut self, solution: &Solution) -> io::Result<()>;

    /// A generator found a coloring with no conflicts at all.
    fn colorable(&mut self) -> io::Result<()>;
}

/// Writes one line per event, optionally highlighted with ANSI colors.
pub struct ConsoleReporter<W: Write> {
    out: W,
    color: bool,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout(color: bool) -> Self {
        Self::new(io::stdout(), color)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, color: &str, text: &str) -> io::Result<()> {
        if self.color {
            writeln!(self.out, "{color}{text}{RESET}")?;
        } else {
            writeln!(self.out, "{text}")?;
        }
        self.out.flush()
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn started(&mut self, pid: u32) -> io::Result<()> {
        writeln!(self.out, "Started supervisor with pid {pid}")?;
        self.out.flush()
    }

    fn improved(&mut self, solution: &Solution) -> io::Result<()> {
        let text = format!("Solution with {} edge(s): {solution}", solution.len());
        self.line(YELLOW, &text)
    }

    fn colorable(&mut self) -> io::Result<()> {
        self.line(GREEN, "The graph is 3-colorable")
    }
}
