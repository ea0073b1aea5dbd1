pub mod content;
pub mod feed;
pub mod identity;
pub mod interactions;
