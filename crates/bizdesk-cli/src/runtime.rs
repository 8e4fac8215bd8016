// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use bizdesk_api::Backend;
use bizdesk_app::{Collection, CommitTicket, FetchTicket, FieldEdit, ResourceKind};
use bizdesk_tui::{AppRuntime, InternalEvent};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;
use tracing::debug;

/// Runs backend calls on worker threads so the event loop keeps drawing
/// while requests are in flight.
pub struct BackendRuntime<B> {
    backend: Arc<B>,
}

impl<B: Backend + 'static> BackendRuntime<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }
}

impl<B: Backend + 'static> AppRuntime for BackendRuntime<B> {
    fn load_collection(&mut self, kind: ResourceKind) -> Result<Collection> {
        self.backend.list(kind)
    }

    fn commit_edit(&mut self, edit: &FieldEdit) -> Result<()> {
        self.backend.update_field(edit)
    }

    fn spawn_load(
        &mut self,
        kind: ResourceKind,
        ticket: FetchTicket,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        thread::Builder::new()
            .name(format!("load-{}", kind.label()))
            .spawn(move || {
                let result = backend.list(kind).map_err(|error| format!("{error:#}"));
                if tx
                    .send(InternalEvent::Loaded {
                        kind,
                        ticket,
                        result,
                    })
                    .is_err()
                {
                    debug!(resource = kind.label(), "ui gone before load finished");
                }
            })
            .with_context(|| format!("spawn {} load worker", kind.label()))?;
        Ok(())
    }

    fn spawn_commit(
        &mut self,
        ticket: CommitTicket,
        edit: FieldEdit,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        let kind = edit.kind;
        thread::Builder::new()
            .name(format!("commit-{}", kind.label()))
            .spawn(move || {
                let result = backend.update_field(&edit).map_err(|error| error.to_string());
                if tx
                    .send(InternalEvent::Committed {
                        kind,
                        ticket,
                        result,
                    })
                    .is_err()
                {
                    debug!(resource = kind.label(), "ui gone before commit finished");
                }
            })
            .with_context(|| format!("spawn {} commit worker", kind.label()))?;
        Ok(())
    }
}
