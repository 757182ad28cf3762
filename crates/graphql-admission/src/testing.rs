// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Helpers for asserting on the events the pipeline logs.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex},
};

use tracing::{
    field::{Field, Visit},
    subscriber::DefaultGuard,
    Event, Level, Subscriber,
};
use tracing_subscriber::{layer::Context, layer::SubscriberExt, Layer};

#[derive(Clone, Debug)]
pub(crate) struct CapturedEvent {
    pub level: Level,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

/// Events logged on the current thread since [capture] was called.
#[derive(Clone, Default)]
pub(crate) struct Captured(Arc<Mutex<Vec<CapturedEvent>>>);

struct CaptureLayer(Captured);

#[derive(Default)]
struct Visitor {
    message: String,
    fields: BTreeMap<String, String>,
}

/// Install a subscriber that records every event on this thread, until the guard is dropped.
/// Tests using this should run on a current-thread runtime (the `tokio::test` default).
pub(crate) fn capture() -> (DefaultGuard, Captured) {
    let captured = Captured::default();
    let subscriber = tracing_subscriber::registry().with(CaptureLayer(captured.clone()));
    (tracing::subscriber::set_default(subscriber), captured)
}

impl Captured {
    pub(crate) fn events(&self) -> Vec<CapturedEvent> {
        self.0.lock().unwrap().clone()
    }

    /// The only event whose message contains `needle`. Panics if there is not exactly one.
    pub(crate) fn find(&self, needle: &str) -> CapturedEvent {
        let mut matches: Vec<_> = self
            .events()
            .into_iter()
            .filter(|e| e.message.contains(needle))
            .collect();

        assert_eq!(
            matches.len(),
            1,
            "Expected one event containing {needle:?}, got: {:#?}",
            self.events()
        );

        matches.pop().unwrap()
    }
}

impl CapturedEvent {
    pub(crate) fn field(&self, name: &str) -> &str {
        self.fields
            .get(name)
            .unwrap_or_else(|| panic!("No field {name:?} on {self:#?}"))
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = Visitor::default();
        event.record(&mut visitor);

        self.0 .0.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

impl Visit for Visitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_owned();
        } else {
            self.fields.insert(field.name().to_owned(), value.to_owned());
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_owned(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields
                .insert(field.name().to_owned(), format!("{value:?}"));
        }
    }
}
