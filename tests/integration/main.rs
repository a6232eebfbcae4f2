//! End-to-end test harness for the runner workspace: drives a full
//! `Runner` over in-memory probe/reader fixtures, one file per concern.

mod common;
mod properties;
mod scenarios;
