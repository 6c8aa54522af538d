//! Document owner: applies mutations, keeps undo history and debounces
//! persistence.
//!
//! The engine never reads a clock. The host reports time through
//! [`MapEngine::tick`]; a change schedules a flush `quiet_ms` after the
//! latest known time, and every further change pushes the deadline back.

use crate::history::History;
use crate::mutation::{MapMutation, apply_mutation};
use metro_core::{EditorSettings, LoadOutcome, MapDocument, MapError, MapSection, SectionKind};

pub const DEFAULT_SAVE_QUIET_MS: f64 = 500.0;

// ─── Change sink ─────────────────────────────────────────────────────────

/// Receives the document whenever a debounced save fires.
pub trait ChangeSink {
    fn on_change(&mut self, doc: &MapDocument);
}

impl<F: FnMut(&MapDocument)> ChangeSink for F {
    fn on_change(&mut self, doc: &MapDocument) {
        self(doc)
    }
}

/// Sink that drops every change.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ChangeSink for NullSink {
    fn on_change(&mut self, _doc: &MapDocument) {}
}

// ─── Debounce ────────────────────────────────────────────────────────────

/// Trailing-edge timer driven by the host's frame clock.
///
/// An edit only marks the timer dirty; the quiet period is measured from the
/// first poll after it, so a clock that stalled while nothing was edited
/// cannot make the save due immediately.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet_ms: f64,
    now_ms: f64,
    dirty: bool,
    due_at: Option<f64>,
}

impl Debouncer {
    pub fn new(quiet_ms: f64) -> Self {
        Self {
            quiet_ms: quiet_ms.max(0.0),
            now_ms: 0.0,
            dirty: false,
            due_at: None,
        }
    }

    /// (Re)start the quiet period at the next poll.
    pub fn schedule(&mut self) {
        self.dirty = true;
        self.due_at = None;
    }

    pub fn cancel(&mut self) {
        self.dirty = false;
        self.due_at = None;
    }

    pub fn is_pending(&self) -> bool {
        self.dirty || self.due_at.is_some()
    }

    /// Advance time; returns `true` (once) when the deadline has passed.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        if !now_ms.is_finite() {
            return false;
        }
        self.now_ms = self.now_ms.max(now_ms);
        if std::mem::take(&mut self.dirty) {
            self.due_at = Some(self.now_ms + self.quiet_ms);
        }
        match self.due_at {
            Some(due) if self.now_ms >= due => {
                self.due_at = None;
                true
            }
            _ => false,
        }
    }
}

// ─── Engine ──────────────────────────────────────────────────────────────

pub struct MapEngine<S: ChangeSink> {
    document: MapDocument,
    active: SectionKind,
    history: History,
    persist: Debouncer,
    loaded: bool,
    sink: S,
}

impl<S: ChangeSink> MapEngine<S> {
    pub fn new(sink: S, history_depth: usize, quiet_ms: f64) -> Self {
        Self {
            document: MapDocument::skeleton(),
            active: SectionKind::Metro,
            history: History::new(history_depth),
            persist: Debouncer::new(quiet_ms),
            loaded: false,
            sink,
        }
    }

    /// Replace the document. History is cleared and nothing is scheduled;
    /// the returned notice describes a load that fell back to the skeleton.
    pub fn load(&mut self, outcome: LoadOutcome) -> Option<MapError> {
        self.document = outcome.document;
        self.history.clear();
        self.persist.cancel();
        self.loaded = true;
        if self.document.section(self.active).is_none() {
            self.active = self
                .document
                .sections()
                .next()
                .map_or(SectionKind::Metro, |(k, _)| k);
        }
        log::debug!(
            "loaded document with {} stations",
            self.document.station_count()
        );
        outcome.notice
    }

    pub fn document(&self) -> &MapDocument {
        &self.document
    }

    pub fn active_section(&self) -> SectionKind {
        self.active
    }

    pub fn set_active_section(&mut self, kind: SectionKind) {
        self.active = kind;
    }

    pub fn section(&self) -> Option<&MapSection> {
        self.document.section(self.active)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Apply a mutation to the active section. Returns `true` when the
    /// document changed; only then is history recorded and a save scheduled.
    pub fn execute(&mut self, mutation: MapMutation) -> bool {
        let label = mutation.label();
        let before = self.document.clone();
        if !apply_mutation(&mut self.document, self.active, mutation) {
            log::debug!("{label}: target missing, ignored");
            return false;
        }
        if self.document == before {
            return false;
        }
        log::debug!("{label}");
        self.history.record(before);
        self.persist.schedule();
        true
    }

    pub fn begin_batch(&mut self) {
        self.history.begin_batch(&self.document);
    }

    pub fn end_batch(&mut self) -> bool {
        let pushed = self.history.end_batch(&self.document);
        if pushed {
            self.persist.schedule();
        }
        pushed
    }

    pub fn in_batch(&self) -> bool {
        self.history.in_batch()
    }

    /// Restore the latest snapshot. No-op on an empty history.
    pub fn undo(&mut self) -> bool {
        let Some(prev) = self.history.pop() else {
            return false;
        };
        self.document = prev;
        self.persist.schedule();
        log::debug!("undo ({} left)", self.history.len());
        true
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Write persisted view settings. Not an undoable edit.
    pub fn store_settings(&mut self, settings: EditorSettings) -> bool {
        if self.document.info.editor_settings.as_ref() == Some(&settings) {
            return false;
        }
        self.document.info.editor_settings = Some(settings);
        self.persist.schedule();
        true
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    pub fn save_pending(&self) -> bool {
        self.persist.is_pending()
    }

    /// Advance the clock and deliver a due save. Saves are withheld until a
    /// document has been loaded and while it has no stations.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        if !self.persist.poll(now_ms) {
            return false;
        }
        self.flush_now()
    }

    /// Deliver the document immediately, subject to the same gate as `tick`.
    pub fn flush_now(&mut self) -> bool {
        self.persist.cancel();
        if !self.loaded || self.document.station_count() == 0 {
            log::debug!("save skipped: document not ready");
            return false;
        }
        log::debug!("saving document");
        self.sink.on_change(&self.document);
        true
    }

    /// Drop a scheduled save and any open batch.
    pub fn cancel_pending(&mut self) {
        self.persist.cancel();
        while self.history.in_batch() {
            self.history.end_batch(&self.document);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metro_core::{Id, load_document};
    use serde_json::json;

    #[derive(Default)]
    struct Recorder(Vec<MapDocument>);

    impl ChangeSink for Recorder {
        fn on_change(&mut self, doc: &MapDocument) {
            self.0.push(doc.clone());
        }
    }

    fn loaded() -> MapEngine<Recorder> {
        let mut e = MapEngine::new(Recorder::default(), 50, 500.0);
        e.load(load_document(json!({ "metro_map": { "lines": [
            { "id": "L", "stations": [{ "id": "A", "x": 0, "y": 0 }] }
        ]}})));
        e
    }

    fn rename(name: &str) -> MapMutation {
        MapMutation::RenameStation {
            station: Id::intern("A"),
            name: name.into(),
        }
    }

    #[test]
    fn debouncer_restarts_quiet_period() {
        let mut d = Debouncer::new(500.0);
        d.poll(1000.0);
        d.schedule();
        assert!(d.is_pending());
        assert!(!d.poll(1400.0));
        d.schedule();
        assert!(!d.poll(1800.0));
        assert!(!d.poll(2299.0));
        assert!(d.poll(2300.0));
        assert!(!d.poll(3000.0), "fires once");
        assert!(!d.is_pending());
    }

    #[test]
    fn noop_mutation_leaves_no_history() {
        let mut e = loaded();
        assert!(e.execute(rename("X")));
        assert!(!e.execute(rename("X")));
        assert_eq!(e.history_len(), 1);
    }

    #[test]
    fn save_waits_for_quiet_period() {
        let mut e = loaded();
        e.tick(0.0);
        e.execute(rename("X"));
        assert!(!e.tick(100.0));
        assert!(!e.tick(599.0));
        assert!(e.tick(600.0));
        assert_eq!(e.sink().0.len(), 1);
        assert!(!e.tick(2000.0));
    }

    #[test]
    fn idle_clock_gap_does_not_skip_quiet_period() {
        let mut e = loaded();
        e.tick(1_000.0);
        e.execute(rename("X"));
        assert!(!e.tick(60_000.0));
        assert!(e.sink().0.is_empty());
        assert!(e.tick(60_500.0));
        assert_eq!(e.sink().0.len(), 1);

        // edits made before the first frame wait a full period too
        let mut e = loaded();
        e.execute(rename("Y"));
        assert!(!e.tick(60_000.0));
        assert!(e.tick(60_500.0));
    }

    #[test]
    fn non_finite_frames_do_not_start_the_period() {
        let mut e = loaded();
        e.execute(rename("X"));
        assert!(!e.tick(f64::NAN));
        assert!(e.save_pending());
        assert!(!e.tick(100.0));
        assert!(e.tick(600.0));
    }

    #[test]
    fn save_is_withheld_before_load() {
        let mut e = MapEngine::new(Recorder::default(), 50, 500.0);
        e.execute(MapMutation::new_line(None));
        assert!(!e.tick(10_000.0));
        assert!(e.sink().0.is_empty());
    }
}
