//! robopath-core: the "program the robot" grid puzzle engine.
//!
//! Layering, leaves first:
//!   grid / level / queue / ghost / run  data and pure rules
//!   engine                              synchronous state machine
//!   loader / generator                  level provider boundary
//!   store / sink                        persistence seams
//!   session                             async driver with the run timer

pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod generator;
pub mod ghost;
pub mod grid;
pub mod level;
pub mod loader;
pub mod queue;
pub mod rng;
pub mod run;
pub mod session;
pub mod sink;
pub mod snapshot;
pub mod store;
pub mod types;
