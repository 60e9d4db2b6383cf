//! Repository layer
//!
//! One repository per aggregate, each defined as a trait with a SQLx-backed
//! implementation so services can be tested against in-memory databases.

pub mod category;
pub mod post;
pub mod session;
pub mod tag;
pub mod user;

pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use user::{SqlxUserRepository, UserRepository};
