//! Helpers shared by the integration tests.

#![allow(dead_code)]

use tricolor_core::config::IpcNames;
use tricolor_core::{EdgeToken, Graph};
use tricolor_ipc::{NamedSemaphore, SharedSegment};

/// A namespace no other test (or process) is using.
pub fn unique_namespace() -> String {
    format!("tricolor-it-{}", uuid::Uuid::new_v4().simple())
}

pub fn unique_names() -> IpcNames {
    IpcNames::for_namespace(&unique_namespace())
}

pub const TRIANGLE: &[&str] = &["0-1", "1-2", "2-0"];
pub const K4: &[&str] = &["0-1", "0-2", "0-3", "1-2", "1-3", "2-3"];

pub fn graph<S: AsRef<str>>(edges: &[S]) -> Graph {
    let tokens: Vec<EdgeToken> = edges.iter().map(|e| e.as_ref().parse().unwrap()).collect();
    Graph::from_tokens(&tokens).unwrap()
}

/// Panics unless the segment and all three semaphores are gone.
pub fn assert_unlinked(names: &IpcNames) {
    assert!(
        !SharedSegment::unlink(&names.segment).unwrap(),
        "segment {} still linked",
        names.segment
    );
    for name in [&names.free, &names.used, &names.write] {
        assert!(!NamedSemaphore::unlink(name).unwrap(), "semaphore {name} still linked");
    }
}
