//! Concrete implementations of the [`ProcessBus`](crate::bus::ProcessBus) contract

pub mod memory;
