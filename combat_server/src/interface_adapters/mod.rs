// Interface adapters: wire protocol, network handling, and collaborator clients.

pub mod clients;
pub mod net;
pub mod protocol;
pub mod state;
pub mod stores;
pub mod transport;
