mod routes;

pub mod app;
pub mod config;
pub mod error;
pub mod state;
pub mod storage;

pub use app::{build_router, run_server};
