//! Interactive editing on top of `metro-core` and `metro-render`: undoable
//! mutations, debounced persistence and the pointer/keyboard state machine.

pub mod config;
pub mod controller;
pub mod engine;
pub mod history;
pub mod input;
pub mod mutation;
pub mod shortcuts;

pub use config::EditorConfig;
pub use controller::{Editor, LayerToggle, Mode, snap_point};
pub use engine::{ChangeSink, Debouncer, MapEngine, NullSink};
pub use history::History;
pub use input::EditorEvent;
pub use mutation::{MapMutation, RegenerateScope, apply_mutation};
pub use shortcuts::{ShortcutAction, ShortcutMap};
