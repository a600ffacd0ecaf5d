pub mod agents;
pub mod chat;
pub mod conversations;
pub mod events;
pub mod repl_command;
pub mod send;
