//! Integration Tests Module
//!
//! End-to-end tests of the tool runtime through its public API: a full
//! write/edit/run/list session, fast/portable search equivalence, and the
//! approval protocol against a scripted UI loop.

// Shared fixtures: scripted UI loop and in-memory checkpoint store
mod support;

// Write, edit, run, list against an interactive panel
mod scenario_test;

// fd/rg results match the portable walker
mod backend_equivalence_test;

// Allow-list, rejection feedback, cancellation and diff review
mod approval_test;
