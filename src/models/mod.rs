pub mod client;
pub mod connection;
pub mod ipc;
pub mod message;
pub mod settings;
