//! Test suites for the SPADIC control daemon.

mod support;
mod unit;
