//! One-shot WordPress → static-site sync: fetch posts over the WP REST
//! API, render them to templated Markdown, localize embedded images,
//! land everything in one GitHub commit, then delete the source posts.

pub mod config;
pub mod filename;
pub mod filter;
pub mod github;
pub mod images;
pub mod model;
pub mod render;
pub mod sync;
pub mod tags;
pub mod wordpress;

pub use config::{Config, ConfigError};
pub use model::Post;
pub use sync::{run, SyncOutcome};
