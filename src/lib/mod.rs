#[macro_use]
extern crate lazy_static;
extern crate tracing;

pub mod cli;
pub mod connection;
pub mod fetch;
pub mod health;
pub mod logger;
pub mod monitor;
pub mod probe;
