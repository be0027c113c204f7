pub mod cache;
pub mod catalog;
pub mod db;
pub mod models;
pub mod qdrant;
pub mod schema;

mod error;

pub use error::{Error, Result};
