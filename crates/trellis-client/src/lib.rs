//! Trellis Client — HTTP and push-channel access to a workspace server,
//! plus the [`ReviewSession`] that drives the core diff engine with it.

pub mod api;
pub mod http;
pub mod push;
pub mod session;

pub use api::WorkspaceApi;
pub use http::HttpWorkspaceClient;
pub use push::{connect_push, push_url, PushMessage};
pub use session::{ApplyReport, FailureNotice, ReviewSession};
