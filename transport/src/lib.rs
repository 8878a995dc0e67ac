pub mod app;
pub mod client;
pub mod executor;
pub mod handler;

pub use app::race_app;
pub use client::H2Transport;
pub use executor::SmolExecutor;
pub use handler::{ServeError, serve_connection, serve_plain};
