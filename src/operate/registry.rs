//! Command registry.
//!
//! [`CommandRegistry`] is the structure to create the command table of the attach listener and
//! set it up with the built-in commands.

use std::{
    collections::BTreeMap,
    panic::{self, AssertUnwindSafe},
};

use futures::AsyncWrite;

use crate::{operate::commands, operation::Operation};

/// Result code of an unknown command.
pub const RESULT_UNKNOWN_COMMAND: i32 = -1;

/// Result code of a command whose handler panicked.
pub const RESULT_COMMAND_PANICKED: i32 = -2;

type Handler = Box<dyn Fn(&[String], &mut String) -> i32 + Send + Sync>;

/// Table of the commands an attach client may run.
///
/// A handler receives the operation arguments and a buffer for its output, and returns the
/// result code sent to the client, `0` on success.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Handler>,
}

impl CommandRegistry {
    /// Creates a new registry with no commands registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new registry with `getversion`, `properties` and `echo` registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_command("getversion", commands::get_version);
        registry.register_command("properties", commands::properties);
        registry.register_command("echo", commands::echo);
        registry
    }

    /// Registers a command, replacing any previous one with the same name.
    pub fn register_command<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&[String], &mut String) -> i32 + Send + Sync + 'static,
    {
        self.commands.insert(name.into(), Box::new(handler));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Runs command `name` and returns its result code and output.
    ///
    /// A panicking handler does not unwind into the caller: the command fails with
    /// [`RESULT_COMMAND_PANICKED`] and whatever output it produced is discarded.
    pub fn execute(&self, name: &str, args: &[String]) -> (i32, String) {
        let mut output = String::new();
        let result = match self.commands.get(name) {
            Some(handler) => {
                match panic::catch_unwind(AssertUnwindSafe(|| handler(args, &mut output))) {
                    Ok(result) => result,
                    Err(_) => {
                        log::error!(target: "attach", "operation {name} panicked");
                        output.clear();
                        output.push_str(&format!("Operation {name} failed"));
                        RESULT_COMMAND_PANICKED
                    }
                }
            }
            None => {
                output.push_str(&format!("Operation {name} not recognized!"));
                RESULT_UNKNOWN_COMMAND
            }
        };
        (result, output)
    }

    /// Runs the operation and completes it.
    pub fn serve<C>(&self, op: Operation<C>)
    where
        C: AsyncWrite + Unpin,
    {
        let (result, output) = self.execute(op.name(), op.args());
        log::debug!(target: "attach", "operation {} completed with {result}", op.name());
        op.complete(result, &output);
    }
}
