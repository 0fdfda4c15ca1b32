//! Muting stderr logs while progress bars draw
//!
//! Log lines written between bar redraws tear the bars apart. [`GatedLayer`]
//! drops events on the wrapped layer while any [`ProgressGuard`] is alive.
//! Span bookkeeping always reaches the inner layer so its span state stays
//! consistent, and other layers (the log file) are unaffected.

use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// Live guards; they may overlap
static ACTIVE_GUARDS: AtomicUsize = AtomicUsize::new(0);

fn muted() -> bool {
    ACTIVE_GUARDS.load(Ordering::SeqCst) > 0
}

/// Keeps stderr logging muted until dropped
#[must_use = "logs are muted only while the guard is held"]
pub struct ProgressGuard(());

impl ProgressGuard {
    pub fn activate() -> Self {
        ACTIVE_GUARDS.fetch_add(1, Ordering::SeqCst);
        Self(())
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        ACTIVE_GUARDS.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Wraps a layer so its events are dropped while progress bars are visible
pub struct GatedLayer<L> {
    inner: L,
}

impl<L> GatedLayer<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }
}

impl<S, L> Layer<S> for GatedLayer<L>
where
    S: Subscriber,
    L: Layer<S>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        if !muted() {
            self.inner.on_event(event, ctx);
        }
    }

    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        self.inner.on_new_span(attrs, id, ctx);
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        self.inner.on_record(id, values, ctx);
    }

    fn on_follows_from(&self, id: &Id, follows: &Id, ctx: Context<'_, S>) {
        self.inner.on_follows_from(id, follows, ctx);
    }

    fn on_enter(&self, id: &Id, ctx: Context<'_, S>) {
        self.inner.on_enter(id, ctx);
    }

    fn on_exit(&self, id: &Id, ctx: Context<'_, S>) {
        self.inner.on_exit(id, ctx);
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        self.inner.on_close(id, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;

    struct CountEvents(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for CountEvents {
        fn on_event(&self, _event: &Event<'_>, _ctx: Context<'_, S>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    // One test owns the global guard count so parallel tests cannot race it
    #[test]
    fn test_guards_mute_events_until_all_dropped() {
        let seen = Arc::new(AtomicUsize::new(0));
        let subscriber =
            tracing_subscriber::registry().with(GatedLayer::new(CountEvents(seen.clone())));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("shown");
            {
                let _outer = ProgressGuard::activate();
                {
                    let _spinner = ProgressGuard::activate();
                    tracing::info!("hidden");
                }
                assert!(muted());
                tracing::info!("still hidden");
            }
            assert!(!muted());
            tracing::info!("shown again");
        });

        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
