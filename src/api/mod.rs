//! HTTP handlers for the ingress boundary.

pub mod status;
pub mod webhook;

pub use status::{health, root};
pub use webhook::{github_webhook, gitlab_webhook};
