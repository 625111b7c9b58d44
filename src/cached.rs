use crate::{
    controller::DirtySet,
    interactive::{InteractiveValue, ValueRegistry},
    statics,
    store::{Entry, EntryKey, PreferenceStore, ValueChanged},
    value::ValueType,
};
use eframe::egui::{self, RichText};
use std::sync::mpsc::Receiver;
use tracing::{debug, warn};

/// Retained row node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreferenceRow {
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowAction {
    Commit,
    Undo,
    Reset,
}

/// Binds one store entry to one editor widget.
pub struct CachedPreference {
    key: EntryKey,
    display_name: String,
    description: Option<String>,
    signature: String,
    hidden: bool,
    fallback_type: ValueType,
    interactive: Box<dyn InteractiveValue>,
    changes: Receiver<ValueChanged>,
    row: Option<PreferenceRow>,
    undo_visible: bool,
}

/// The store has no null values; an absent committed value becomes the type's empty value.
fn ensure_config_valid(entry: &mut Entry) {
    if entry.value().is_some() {
        return;
    }
    let empty = entry.value_type().empty_instance();
    debug!(entry = %entry.key(), "synthesizing empty value");
    entry.set_value(Some(empty));
}

impl CachedPreference {
    pub fn new(entry: &mut Entry, registry: &mut ValueRegistry) -> Self {
        ensure_config_valid(entry);
        let changes = entry.subscribe();
        let fallback_type = entry.value_type().clone();
        let mut interactive = registry.create(entry.edited_value().cloned(), &fallback_type);
        interactive.set_owner_label(entry.display_name());
        Self {
            key: entry.key().clone(),
            display_name: entry.display_name().to_string(),
            description: entry.description().map(str::to_string),
            signature: fallback_type.to_string(),
            hidden: entry.is_hidden(),
            fallback_type,
            interactive,
            changes,
            row: None,
            undo_visible: false,
        }
    }

    pub fn key(&self) -> &EntryKey {
        &self.key
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Type signature shown next to the name.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn fallback_type(&self) -> &ValueType {
        &self.fallback_type
    }

    pub fn undo_visible(&self) -> bool {
        self.undo_visible
    }

    pub fn row(&self) -> Option<PreferenceRow> {
        self.row
    }

    pub fn is_active(&self) -> bool {
        self.row.is_some_and(|r| r.active)
    }

    pub fn interactive(&self) -> &dyn InteractiveValue {
        self.interactive.as_ref()
    }

    pub fn interactive_mut(&mut self) -> &mut dyn InteractiveValue {
        self.interactive.as_mut()
    }

    /// Builds the row on first use, then shows it.
    pub fn enable(&mut self, store: &mut PreferenceStore, dirty: &mut DirtySet) {
        match self.row.as_mut() {
            Some(row) => row.active = true,
            None => {
                self.interactive.construct_ui();
                self.row = Some(PreferenceRow { active: true });
                self.update_value(store, dirty);
            }
        }
    }

    pub fn disable(&mut self) {
        self.set_visible(false);
    }

    pub fn set_visible(&mut self, visible: bool) {
        if let Some(row) = self.row.as_mut() {
            row.active = visible;
        }
    }

    pub fn destroy(&mut self) {
        self.interactive.destroy_ui();
        self.row = None;
    }

    /// Reloads the widget from the entry's edited slot.
    pub fn update_value(&mut self, store: &mut PreferenceStore, dirty: &mut DirtySet) {
        let Some(entry) = store.entry_mut(&self.key) else {
            warn!(entry = %self.key, "entry vanished from the store");
            return;
        };
        ensure_config_valid(entry);
        self.interactive.set_value(entry.edited_value().cloned());
        self.interactive.on_value_updated();
        self.interactive.refresh_sub_content_state();
        self.sync_dirty(entry, dirty);
    }

    fn sync_dirty(&mut self, entry: &Entry, dirty: &mut DirtySet) {
        if entry.is_dirty() {
            dirty.insert(self.key.clone());
            self.undo_visible = true;
        } else {
            dirty.remove(&self.key);
            self.undo_visible = false;
        }
    }

    /// Stages the widget's value into the edited slot after validation.
    /// Returns `false` when the value was already staged.
    pub fn commit_interactive_value(&mut self, store: &mut PreferenceStore, dirty: &mut DirtySet) -> bool {
        let Some(entry) = store.entry_mut(&self.key) else {
            warn!(entry = %self.key, "entry vanished from the store");
            return false;
        };

        let mut value = self.interactive.value().cloned();
        if let Some(validator) = entry.validator() {
            if let Some(current) = value.take() {
                let checked = validator.ensure_valid(current.clone());
                if checked != current {
                    debug!(entry = %self.key, "validator adjusted the edited value");
                    self.interactive.set_value(Some(checked.clone()));
                    self.interactive.refresh_ui_for_value();
                }
                value = Some(checked);
            }
        }

        if value.as_ref() == entry.edited_value() {
            return false;
        }
        entry.set_edited_value(value);
        self.sync_dirty(entry, dirty);
        true
    }

    /// Copies the committed value back into the edited slot and the widget.
    pub fn undo(&mut self, store: &mut PreferenceStore, dirty: &mut DirtySet) {
        let Some(entry) = store.entry_mut(&self.key) else {
            return;
        };
        entry.set_edited_value(entry.value().cloned());
        self.update_value(store, dirty);
    }

    pub fn reset_to_default(&mut self, store: &mut PreferenceStore, dirty: &mut DirtySet) {
        let Some(entry) = store.entry_mut(&self.key) else {
            return;
        };
        entry.reset_to_default();
        self.update_value(store, dirty);
        self.drain_changes();
    }

    /// The entry was saved; hides Undo and leaves the dirty set. The save's own
    /// commit notification is dropped so it is not taken for an outside change.
    pub fn on_saved(&mut self, dirty: &mut DirtySet) {
        self.undo_visible = false;
        dirty.remove(&self.key);
        self.drain_changes();
    }

    fn drain_changes(&mut self) -> bool {
        self.changes.try_iter().count() > 0
    }

    /// Reflects committed-value changes made elsewhere. Returns `true` if any arrived.
    pub fn poll_external_changes(&mut self, store: &mut PreferenceStore, dirty: &mut DirtySet) -> bool {
        if !self.drain_changes() {
            return false;
        }
        debug!(entry = %self.key, "value changed outside the panel");
        self.update_value(store, dirty);
        true
    }

    /// Draws the row; returns `true` when the entry's edited slot changed.
    pub fn show(&mut self, ui: &mut egui::Ui, store: &mut PreferenceStore, dirty: &mut DirtySet) -> bool {
        if !self.is_active() {
            return false;
        }

        let mut action = None;
        ui.push_id(&self.key, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new(&self.display_name).strong());
                ui.label(RichText::new(&self.signature).italics().color(statics::COLOR_SIGNATURE));
                if self.undo_visible && ui.button(statics::EN_BTN_UNDO).clicked() {
                    action = Some(RowAction::Undo);
                }
                if ui.button(statics::EN_BTN_DEFAULT).clicked() {
                    action = Some(RowAction::Reset);
                }
            });
            if let Some(description) = &self.description {
                ui.label(RichText::new(description).italics().color(statics::COLOR_DESCRIPTION));
            }
            if self.interactive.show_main(ui) {
                action = Some(RowAction::Commit);
            }
            self.interactive.show_expand_button(ui);
            if self.interactive.core().sub.expanded && self.interactive.show_sub(ui) {
                action = Some(RowAction::Commit);
            }
            ui.separator();
        });

        match action {
            Some(RowAction::Commit) => self.commit_interactive_value(store, dirty),
            Some(RowAction::Undo) => {
                self.undo(store, dirty);
                true
            }
            Some(RowAction::Reset) => {
                self.reset_to_default(store, dirty);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CachedPreference;
    use crate::{
        controller::DirtySet,
        interactive::{InteractiveBool, ValueRegistry},
        store::{EntryDef, EntryKey, PreferenceStore},
        validator::IntRangeValidator,
        value::{PrefValue, ValueType},
    };

    fn store_with(def: EntryDef) -> (PreferenceStore, EntryKey) {
        let mut store = PreferenceStore::in_memory();
        let key = store.create_category("Mod", "Mod").create_entry(def).key().clone();
        (store, key)
    }

    fn cached(store: &mut PreferenceStore, key: &EntryKey, dirty: &mut DirtySet) -> CachedPreference {
        let mut registry = ValueRegistry::new();
        let mut pref = CachedPreference::new(store.entry_mut(key).unwrap(), &mut registry);
        pref.enable(store, dirty);
        pref
    }

    #[test]
    fn absent_values_are_synthesized_into_both_slots() {
        let (mut store, key) = store_with(EntryDef::new("Names", ValueType::Array(Box::new(ValueType::String))));
        let mut dirty = DirtySet::default();
        let pref = cached(&mut store, &key, &mut dirty);
        let entry = store.entry(&key).unwrap();
        assert_eq!(entry.value(), Some(&PrefValue::Array(vec![])));
        assert_eq!(entry.edited_value(), Some(&PrefValue::Array(vec![])));
        assert_eq!(pref.interactive().value(), Some(&PrefValue::Array(vec![])));
        assert_eq!(pref.signature(), "string[]");
    }

    #[test]
    fn commit_clamps_through_the_validator() {
        let (mut store, key) = store_with(
            EntryDef::new("Count", ValueType::Integer)
                .with_default(PrefValue::Integer(5))
                .validator(IntRangeValidator::new(0, 10)),
        );
        let mut dirty = DirtySet::default();
        let mut pref = cached(&mut store, &key, &mut dirty);

        pref.interactive_mut().set_value(Some(PrefValue::Integer(50)));
        assert!(pref.commit_interactive_value(&mut store, &mut dirty));
        assert_eq!(store.entry(&key).unwrap().edited_value(), Some(&PrefValue::Integer(10)));
        assert_eq!(pref.interactive().value(), Some(&PrefValue::Integer(10)));
        assert!(dirty.contains(&key));
    }

    #[test]
    fn editing_back_to_the_committed_value_cleans_the_entry() {
        let (mut store, key) =
            store_with(EntryDef::new("On", ValueType::Bool).with_default(PrefValue::Bool(false)));
        let mut dirty = DirtySet::default();
        let mut pref = cached(&mut store, &key, &mut dirty);

        let toggle = |pref: &mut CachedPreference, on: bool| {
            pref.interactive_mut()
                .as_any_mut()
                .downcast_mut::<InteractiveBool>()
                .unwrap()
                .on_toggle(on)
        };
        assert!(toggle(&mut pref, true));
        assert!(pref.commit_interactive_value(&mut store, &mut dirty));
        assert!(pref.undo_visible());

        assert!(toggle(&mut pref, false));
        assert!(pref.commit_interactive_value(&mut store, &mut dirty));
        assert!(!pref.undo_visible());
        assert!(dirty.is_empty());
    }

    #[test]
    fn external_changes_reach_the_widget() {
        let (mut store, key) =
            store_with(EntryDef::new("Name", ValueType::String).with_default(PrefValue::String("a".into())));
        let mut dirty = DirtySet::default();
        let mut pref = cached(&mut store, &key, &mut dirty);

        store.entry_mut(&key).unwrap().set_value(Some(PrefValue::String("b".into())));
        assert!(pref.poll_external_changes(&mut store, &mut dirty));
        assert_eq!(pref.interactive().value(), Some(&PrefValue::String("b".into())));
        assert!(!pref.poll_external_changes(&mut store, &mut dirty));
    }

    #[test]
    fn destroy_drops_the_row_and_enable_rebuilds_it() {
        let (mut store, key) =
            store_with(EntryDef::new("On", ValueType::Bool).with_default(PrefValue::Bool(true)));
        let mut dirty = DirtySet::default();
        let mut pref = cached(&mut store, &key, &mut dirty);
        assert!(pref.is_active());

        pref.disable();
        assert!(!pref.is_active());
        pref.destroy();
        assert!(pref.row().is_none());
        assert!(!pref.interactive().is_ui_constructed());

        pref.enable(&mut store, &mut dirty);
        assert!(pref.interactive().is_ui_constructed());
        assert_eq!(pref.interactive().value(), Some(&PrefValue::Bool(true)));
    }
}
