//! Embeddable chat widget runtime.
//!
//! The runtime boots once per host page, resolves its tenant configuration
//! from the embedding `<script>` tag, fetches the tenant's appearance with a
//! bounded retry, renders an isolated widget subtree and drives the chat
//! exchange against the backend. The host page, its storage and the network
//! are modelled explicitly ([`page::HostPage`], [`session::KeyValueStore`],
//! [`transport::Transport`]).

pub mod api;
pub mod boot;
pub mod config;
pub mod error;
pub mod guard;
pub mod inject;
pub mod page;
pub mod pipeline;
pub mod render;
pub mod resolver;
pub mod server;
pub mod session;
pub mod settings;
pub mod snippet;
pub mod transport;
pub mod view;
pub mod widget;

pub use boot::{BootOutcome, boot};
pub use error::{BootError, FetchError, StorageError};
pub use page::{HostPage, ScriptTag};
pub use resolver::WidgetConfig;
pub use settings::{AppearanceConfig, RetryPolicy, Starter, WidgetSettings};
pub use widget::{Action, Widget};
