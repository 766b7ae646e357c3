//! Platform plugins for taskflow: the OS process runner, event observers and
//! the factory that wires them from configuration.

pub mod factory;
pub mod observer;
pub mod runner;
