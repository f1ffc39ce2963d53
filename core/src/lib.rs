//! mes-core: operator assignment, capacity planning and step execution
//! for a manufacturing execution system.
//!
//! The engine owns a single SQLite store. Every component borrows it
//! through `MesEngine` accessors; none of them cache state between calls.

pub mod types;
pub mod error;
pub mod clock;
pub mod config;
pub mod event;
pub mod command;
pub mod store;

pub mod operator;
pub mod availability;
pub mod assignment;
pub mod capacity;
pub mod editor;
pub mod work_order;
pub mod execution;
pub mod planner;
pub mod genealogy;
pub mod session;
pub mod presence;

pub mod rng;
pub mod name_generator;
pub mod demo;
pub mod engine;
