pub mod app;
pub mod config;
pub mod error;
pub mod loans;
pub mod observability;
pub mod routes;
pub mod state;

pub use app::{assemble, create_app, App, AppBuilder, MountedGroup};
pub use config::Config;
