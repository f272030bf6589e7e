//! Page state and view models for the post list and post detail routes

pub mod detail;
pub mod list;

pub use detail::{OnDemand, PostPage, PostView};
pub use list::{ListState, PostList, PostSummary};
