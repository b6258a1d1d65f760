//! # converge-remote
//!
//! The remote control-plane surface consumed by the synchronizer.
//!
//! - [`api::RemoteApi`] — one method per remote operation
//! - [`page::collect_all`] — walks a paged listing to completion
//! - [`memory::InMemoryRemote`] — fixture-backed remote that records calls
//! - [`http::HttpRemote`] — blocking JSON:API client

pub mod api;
pub mod error;
pub mod http;
pub mod memory;
pub mod page;

pub use api::{
    Collection, ListOptions, RemoteApi, VcsProvider, VcsProviderFilter, WorkspacePatch,
};
pub use error::RemoteError;
pub use http::HttpRemote;
pub use memory::{CallKind, InMemoryRemote, RemoteCall, RemoteFixture, WorkspaceRecord};
pub use page::{collect_all, Page, FIRST_PAGE};
