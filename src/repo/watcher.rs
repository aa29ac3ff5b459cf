//! The watcher boundary: a producer emits `AppEvent`s (from a Kubernetes
//! informer or any other source of truth for Application/ApplicationSet
//! objects); [`super::RepoIndex`] is the single consumer.
//!
//! The concrete informer is an external collaborator — only the event
//! shape and the index's consumption loop are part of the core.

use tokio::sync::mpsc;

use crate::model::{Application, ApplicationSet};

/// What happened to a watched object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEventKind {
    Add,
    Update,
    Delete,
}

/// One change to an Application or ApplicationSet, as reported by the
/// watcher. `Update` carries both the previous and current value since the
/// two may name different repos (the index must un-index the old source
/// before indexing the new one).
#[derive(Debug, Clone)]
pub enum AppEvent {
    App {
        kind: AppEventKind,
        old: Option<Application>,
        new: Option<Application>,
    },
    AppSet {
        kind: AppEventKind,
        old: Option<ApplicationSet>,
        new: Option<ApplicationSet>,
    },
}

impl AppEvent {
    #[must_use]
    pub fn app_added(app: Application) -> Self {
        AppEvent::App {
            kind: AppEventKind::Add,
            old: None,
            new: Some(app),
        }
    }

    #[must_use]
    pub fn app_updated(old: Application, new: Application) -> Self {
        AppEvent::App {
            kind: AppEventKind::Update,
            old: Some(old),
            new: Some(new),
        }
    }

    #[must_use]
    pub fn app_deleted(app: Application) -> Self {
        AppEvent::App {
            kind: AppEventKind::Delete,
            old: Some(app),
            new: None,
        }
    }
}

/// Drive a [`super::RepoIndex`] from a channel of watcher events until the
/// sender is dropped. Intended to run as a long-lived background task; the
/// index applies each event serially so readers always see a consistent
/// state for a given repo.
pub async fn run_index_consumer(index: std::sync::Arc<super::RepoIndex>, mut events: mpsc::Receiver<AppEvent>) {
    while let Some(event) = events.recv().await {
        index.apply(event);
    }
}
