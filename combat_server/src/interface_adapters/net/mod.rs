// Network adapter modules: the public websocket and per-player connection ownership.

pub mod client;
pub mod sessions;

pub use client::ws_handler;
