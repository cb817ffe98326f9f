//! Sub-module where the execution of attach operations is located.
//!
//! [`registry`] maps command names to handlers, [`commands`] holds the built-in ones and
//! [`listener`] runs the consumer thread serving dequeued operations.

pub mod commands;
pub mod listener;
pub mod registry;
