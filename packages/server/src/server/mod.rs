// HTTP server setup (Axum)
pub mod app;
pub mod caller;
pub mod error;
pub mod html;
pub mod routes;

pub use app::*;
pub use caller::Caller;
pub use error::{HtmlError, JsonError};
