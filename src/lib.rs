pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;


pub use config::Config;
pub use db::{Database, SqliteTable};
pub use error::{SlugError, SlugResult};
pub use models::{Conditions, Entity, Filters, Record};
pub use services::sluggable::{Scope, SlugConfig, SlugTransition, Sluggable, Uniqueness};
pub use services::slugger::{Slugger, SluggerSettings};
pub use services::store::{MemoryStore, SlugStore};
