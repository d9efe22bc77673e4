mod articles;
mod feeds;
mod schema;
mod types;

pub use schema::Database;
pub use types::{Article, Feed, FeedStatus, NewArticle, StorageError};
