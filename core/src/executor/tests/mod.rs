//! Tests for the executor
//!
//! Organized by construct family

mod alt_tests;
mod driver_tests;
mod engine_tests;
mod helpers;
mod par_tests;
mod switch_tests;
mod trace_tests;
