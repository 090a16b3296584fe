//! Command Handlers 实现

mod render_handlers;

pub use render_handlers::*;
