//! Behavioral specifications for the skylark runtime.
//!
//! These tests are black-box where possible: CLI specs invoke the
//! `skylark` binary and check stdout, stderr, exit codes, and on-disk
//! effects; pipeline specs drive the library stack end to end with a
//! scripted provider transport.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// cli/
#[path = "specs/cli/basics.rs"]
mod cli_basics;
#[path = "specs/cli/run.rs"]
mod cli_run;
#[path = "specs/cli/watch.rs"]
mod cli_watch;

// pipeline/
#[path = "specs/pipeline/watch_flow.rs"]
mod pipeline_watch_flow;
