//! Randomised search for a small edge set whose removal makes a graph
//! 3-colorable, split across one supervisor and any number of generators.

pub mod bootstrap;
pub mod generator;
pub mod report;
pub mod supervisor;

pub use generator::{Generator, GeneratorExit, GeneratorOptions, GeneratorReport};
pub use report::{ConsoleReporter, Reporter};
pub use supervisor::{Supervisor, SupervisorExit, SupervisorReport};
