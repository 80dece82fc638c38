pub mod config;
pub mod db;
pub mod error;
pub mod query;
mod service;
mod status;
pub mod sync;
pub mod tool;
pub mod types;

#[macro_use]
extern crate log;

pub use error::*;
pub use service::*;
pub use status::*;
