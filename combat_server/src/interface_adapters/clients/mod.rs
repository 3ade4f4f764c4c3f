// Outbound HTTP clients for collaborator services.

pub mod auth;
pub mod relay;
