//! Tuning Lab - a policy-checked SQL*Plus broker for an Oracle tuning lab.
//!
//! This library exposes the core modules for the binary and integration tests.

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod ratelimit;
pub mod runner;
pub mod safety;
