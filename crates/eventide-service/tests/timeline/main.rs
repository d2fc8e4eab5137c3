//! Integration tests for event timelines.
//!
//! Every test runs the service layer against the in-memory store, with a
//! fixed expansion context so results do not depend on the wall clock.

mod helpers;

mod cloning;
mod maintenance;
mod reconcile;
mod views;
