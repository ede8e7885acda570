pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod recommend;
pub mod scoring;
pub mod services;

pub use config::Config;
pub use db::Repository;
pub use error::{AppError, Result};
pub use recommend::Recommender;
