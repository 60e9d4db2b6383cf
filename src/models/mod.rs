//! Domain models
//!
//! Entities and input types shared by the repository and service layers.

pub mod category;
pub mod post;
pub mod session;
pub mod tag;
pub mod user;

pub use category::{Category, CreateCategoryInput};
pub use post::{
    CreatePostInput, ListParams, PagedResult, Post, PostFilter, SortKey, UpdatePostInput,
};
pub use session::Session;
pub use tag::Tag;
pub use user::{MemberRole, MembershipStatus, RegisterUserInput, UpdateUserInput, User};
