pub mod api;
pub mod error;
pub mod ids;
pub mod models;

pub use error::{BazaarError, Result};
pub use ids::{CommentId, ItemId, ThreadId, UserId};
