pub mod admin;
pub mod punch;
pub mod reports;
pub mod summary;
