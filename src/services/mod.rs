//! Service layer
//!
//! Business logic between the HTTP handlers and the repositories.

pub mod markdown;
pub mod membership;
pub mod oauth;
pub mod post;
pub mod report;
pub mod search;
pub mod signature;
pub mod user;

pub use markdown::MarkdownRenderer;
pub use membership::{MembershipService, PaymentGateway};
pub use oauth::OauthClient;
pub use post::PostService;
pub use report::ReportGenerator;
pub use search::FilterComposer;
pub use user::UserService;
