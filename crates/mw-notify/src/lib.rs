//! mw-notify
//!
//! Change and failure notifications.
//!
//! Delivery is best-effort by contract: a [`Notifier`] never returns an error,
//! and an unconfigured channel is a logged no-op. Reconciliation never waits on
//! or branches on delivery success.

mod chat;
pub mod render;

use mw_diff::ChangeSet;
use mw_schemas::{FetchFailure, Snapshot};
use mw_sources::SourceDescriptor;

pub use chat::{ChatChannel, ChatNotifier};

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// First observation or a genuine change; `current` is what will be persisted.
    async fn notify_change(&self, source: &SourceDescriptor, changes: &ChangeSet, current: &Snapshot);

    async fn notify_failure(&self, source: &SourceDescriptor, failure: &FetchFailure);
}

/// Drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait::async_trait]
impl Notifier for NoopNotifier {
    async fn notify_change(&self, _: &SourceDescriptor, _: &ChangeSet, _: &Snapshot) {}

    async fn notify_failure(&self, _: &SourceDescriptor, _: &FetchFailure) {}
}
