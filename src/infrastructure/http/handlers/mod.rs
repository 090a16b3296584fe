//! HTTP Handlers

mod ping;
mod render;
mod websocket;

pub use ping::*;
pub use render::*;
pub use websocket::*;
