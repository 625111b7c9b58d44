//! Core library for the Mod Preferences Manager.
//! Edits typed preference entries through per-type editor widgets, tracks unsaved edits
//! against committed values, and persists everything to a TOML preferences file.

pub mod builtin;
pub mod cached;
pub mod category;
pub mod controller;
mod gui;
pub mod interactive;
pub mod mapper;
pub mod statics;
pub mod store;
pub mod validator;
pub mod value;

pub use cached::CachedPreference;
pub use controller::{Controller, DirtySet, PanelVisibility};
pub use gui::run_gui;
pub use interactive::{InteractiveValue, ValueRegistry, Variant};
pub use store::{EntryDef, EntryKey, PreferenceStore};
pub use value::{PrefValue, ValueType};
