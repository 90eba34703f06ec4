mod error;
mod publisher;
mod session;

pub use error::{BrowserError, BrowserResult};
pub use publisher::{EditorRoute, PostPublisher};
pub use session::{
    url_has_suffix, AdminSession, AdminSessionFactory, ChromiumSession, ChromiumSessionFactory,
};
