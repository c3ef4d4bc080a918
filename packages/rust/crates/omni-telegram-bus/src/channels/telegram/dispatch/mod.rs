//! Outgoing commands: bus subject → platform API call → optional reply.

mod command;
mod dispatcher;

pub use command::{CommandError, OutgoingCommand};
pub use dispatcher::OutgoingDispatcher;
