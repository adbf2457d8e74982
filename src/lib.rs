pub mod article;
pub mod config;
pub mod crawler;
pub mod error;
pub mod pathfinder;
pub mod similarity;

pub use article::ArticleId;
pub use error::{FetchError, SimilarityError, WalkError};

/// Sent with every HTTP request, as Wikimedia's robot policy asks
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
