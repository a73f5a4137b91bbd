pub mod comments;
pub mod health;
pub mod memories;
pub mod posts;
