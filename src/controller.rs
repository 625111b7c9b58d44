use crate::{
    cached::CachedPreference,
    category::{CategoryInfo, PreferenceInfo},
    interactive::{InteractiveValue, ValueRegistry},
    statics,
    store::{EntryKey, PreferenceStore},
};
use eframe::egui;
use indexmap::IndexMap;
use std::collections::{HashSet, hash_set};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PanelVisibility {
    #[default]
    Hidden,
    Visible,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum StartupState {
    #[default]
    Pending,
    Yielded,
    Done,
}

/// Single-shot action that fires on the second tick.
#[derive(Debug, Clone, Default)]
pub struct DeferredStartup {
    state: StartupState,
}

impl DeferredStartup {
    /// Returns `true` exactly once.
    pub fn tick(&mut self) -> bool {
        match self.state {
            StartupState::Pending => {
                self.state = StartupState::Yielded;
                false
            }
            StartupState::Yielded => {
                self.state = StartupState::Done;
                true
            }
            StartupState::Done => false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == StartupState::Done
    }
}

/// Entries whose edited slot differs from their committed slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtySet(HashSet<EntryKey>);

impl DirtySet {
    pub fn insert(&mut self, key: EntryKey) -> bool {
        self.0.insert(key)
    }

    pub fn remove(&mut self, key: &EntryKey) -> bool {
        self.0.remove(key)
    }

    pub fn contains(&self, key: &EntryKey) -> bool {
        self.0.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> hash_set::Iter<'_, EntryKey> {
        self.0.iter()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// Empty filter matches everything; otherwise a case-insensitive substring of the name
/// or the description. `filter` must already be lowercase.
pub fn matches_filter(filter: &str, display_name: &str, description: Option<&str>) -> bool {
    filter.is_empty()
        || display_name.to_lowercase().contains(filter)
        || description.is_some_and(|d| d.to_lowercase().contains(filter))
}

/// Panel state: categories, selection, filtering and saving.
#[derive(Default)]
pub struct Controller {
    visibility: PanelVisibility,
    categories: IndexMap<String, CategoryInfo>,
    cached: IndexMap<EntryKey, CachedPreference>,
    current: Option<String>,
    filter: String,
    show_hidden: bool,
    dirty: DirtySet,
    startup: DeferredStartup,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visibility(&self) -> PanelVisibility {
        self.visibility
    }

    pub fn show_menu(&self) -> bool {
        self.visibility == PanelVisibility::Visible
    }

    pub fn set_show_menu(&mut self, show: bool) {
        self.visibility = if show {
            PanelVisibility::Visible
        } else {
            PanelVisibility::Hidden
        };
    }

    pub fn toggle_menu(&mut self) {
        self.set_show_menu(!self.show_menu());
    }

    pub fn on_close_panel_clicked(&mut self) {
        self.set_show_menu(false);
    }

    pub fn is_ready(&self) -> bool {
        self.startup.is_done()
    }

    /// Per-frame work: the deferred category setup, then external value changes.
    pub fn tick(&mut self, store: &mut PreferenceStore, registry: &mut ValueRegistry) {
        if self.startup.tick() {
            self.setup_categories(store, registry);
            info!(categories = self.categories.len(), "preferences panel initialized");
        }
        self.poll_external_changes(store);
    }

    /// Builds rows for every category not seen before, ordered by display name.
    pub fn setup_categories(&mut self, store: &mut PreferenceStore, registry: &mut ValueRegistry) {
        let mut pending: Vec<(String, String, Vec<EntryKey>)> = store
            .categories()
            .filter(|c| !self.categories.contains_key(c.identifier()))
            .map(|c| {
                (
                    c.identifier().to_string(),
                    c.display_name().to_string(),
                    c.entries().map(|e| e.key().clone()).collect(),
                )
            })
            .collect();
        pending.sort_by(|a, b| a.1.cmp(&b.1));

        for (identifier, display_name, keys) in pending {
            let mut preferences = Vec::with_capacity(keys.len());
            for key in keys {
                let Some(entry) = store.entry_mut(&key) else {
                    continue;
                };
                let mut cached = CachedPreference::new(entry, registry);
                cached.enable(store, &mut self.dirty);
                if cached.is_hidden() {
                    cached.set_visible(false);
                }
                preferences.push(PreferenceInfo::new(key.clone(), cached.is_hidden()));
                self.cached.insert(key, cached);
            }

            let mut info = CategoryInfo::new(identifier.clone(), display_name, preferences);
            if info.completely_hidden {
                info.list_button_visible = self.show_hidden;
            }
            debug!(category = %identifier, entries = info.preferences.len(), "category added");
            self.categories.insert(identifier, info);
        }
        self.categories
            .sort_by(|_, a, _, b| a.display_name.cmp(&b.display_name));
    }

    pub fn categories(&self) -> impl Iterator<Item = &CategoryInfo> {
        self.categories.values()
    }

    pub fn category(&self, identifier: &str) -> Option<&CategoryInfo> {
        self.categories.get(identifier)
    }

    pub fn current_category(&self) -> Option<&CategoryInfo> {
        self.categories.get(self.current.as_deref()?)
    }

    pub fn cached(&self, key: &EntryKey) -> Option<&CachedPreference> {
        self.cached.get(key)
    }

    pub fn cached_mut(&mut self, key: &EntryKey) -> Option<&mut CachedPreference> {
        self.cached.get_mut(key)
    }

    pub fn set_active_category(&mut self, identifier: &str) {
        if !self.categories.contains_key(identifier) {
            return;
        }
        self.unset_active_category();
        if let Some(info) = self.categories.get_mut(identifier) {
            info.content_visible = true;
            info.highlighted = true;
        }
        self.current = Some(identifier.to_string());
        self.refresh_filter();
    }

    pub fn unset_active_category(&mut self) {
        let Some(current) = self.current.take() else {
            return;
        };
        if let Some(info) = self.categories.get_mut(&current) {
            info.content_visible = false;
            info.highlighted = false;
        }
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn filter_configs(&mut self, search: &str) {
        self.filter = search.to_lowercase();
        self.refresh_filter();
    }

    /// Recomputes row visibility for the selected category.
    pub fn refresh_filter(&mut self) {
        let Some(info) = self.current.as_ref().and_then(|c| self.categories.get_mut(c)) else {
            return;
        };
        for pref in &mut info.preferences {
            let Some(cached) = self.cached.get_mut(&pref.key) else {
                continue;
            };
            pref.visible = if pref.hidden && !self.show_hidden {
                false
            } else {
                matches_filter(&self.filter, cached.display_name(), cached.description())
            };
            cached.set_visible(pref.visible);
        }
    }

    pub fn show_hidden(&self) -> bool {
        self.show_hidden
    }

    pub fn set_hidden_config_visibility(&mut self, show: bool) {
        if self.show_hidden == show {
            return;
        }
        self.show_hidden = show;

        for info in self.categories.values_mut().filter(|i| i.completely_hidden) {
            info.list_button_visible = show;
        }
        if !show && self.current_category().is_some_and(|c| c.completely_hidden) {
            self.unset_active_category();
        }
        self.refresh_filter();
    }

    pub fn is_entry_visible(&self, key: &EntryKey) -> bool {
        self.cached.get(key).is_some_and(CachedPreference::is_active)
    }

    pub fn dirty(&self) -> &DirtySet {
        &self.dirty
    }

    pub fn save_enabled(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Writes the store. Edits count as saved whether or not the write succeeded.
    pub fn save_preferences(&mut self, store: &mut PreferenceStore) {
        if let Err(e) = store.save() {
            error!(error = %format!("{e:#}"), "failed to save preferences");
        }
        let saved: Vec<EntryKey> = self.dirty.iter().cloned().collect();
        for key in saved {
            if let Some(cached) = self.cached.get_mut(&key) {
                cached.on_saved(&mut self.dirty);
            }
        }
        self.dirty.clear();
    }

    /// Applies `edit` to an entry's widget and runs the commit attempt when it reports
    /// an edit. Returns whether the edited slot changed.
    pub fn edit_entry(
        &mut self,
        key: &EntryKey,
        store: &mut PreferenceStore,
        edit: impl FnOnce(&mut dyn InteractiveValue) -> bool,
    ) -> bool {
        let Some(cached) = self.cached.get_mut(key) else {
            return false;
        };
        if !edit(cached.interactive_mut()) {
            return false;
        }
        cached.commit_interactive_value(store, &mut self.dirty)
    }

    pub fn commit_entry(&mut self, key: &EntryKey, store: &mut PreferenceStore) -> bool {
        match self.cached.get_mut(key) {
            Some(cached) => cached.commit_interactive_value(store, &mut self.dirty),
            None => false,
        }
    }

    pub fn undo_entry(&mut self, key: &EntryKey, store: &mut PreferenceStore) {
        if let Some(cached) = self.cached.get_mut(key) {
            cached.undo(store, &mut self.dirty);
        }
    }

    pub fn reset_entry(&mut self, key: &EntryKey, store: &mut PreferenceStore) {
        if let Some(cached) = self.cached.get_mut(key) {
            cached.reset_to_default(store, &mut self.dirty);
        }
    }

    /// Returns the number of rows that picked up an outside change.
    pub fn poll_external_changes(&mut self, store: &mut PreferenceStore) -> usize {
        let mut updated = 0;
        for cached in self.cached.values_mut() {
            if cached.poll_external_changes(store, &mut self.dirty) {
                updated += 1;
            }
        }
        updated
    }

    /// Drops every row's widgets.
    pub fn teardown(&mut self) {
        for cached in self.cached.values_mut() {
            cached.destroy();
        }
        self.unset_active_category();
    }

    /// Draws the rows of the selected category.
    pub fn show_category_content(&mut self, ui: &mut egui::Ui, store: &mut PreferenceStore) {
        let Some(info) = self.current_category() else {
            ui.label(statics::EN_NO_CATEGORY);
            return;
        };
        let keys: Vec<EntryKey> = info
            .preferences
            .iter()
            .filter(|p| p.visible)
            .map(|p| p.key.clone())
            .collect();
        if keys.is_empty() {
            ui.label(statics::EN_NO_MATCHES);
            return;
        }
        for key in keys {
            if let Some(cached) = self.cached.get_mut(&key) {
                cached.show(ui, store, &mut self.dirty);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DeferredStartup, DirtySet, matches_filter};
    use crate::store::EntryKey;

    #[test]
    fn deferred_startup_fires_once_after_one_frame() {
        let mut startup = DeferredStartup::default();
        assert!(!startup.tick());
        assert!(!startup.is_done());
        assert!(startup.tick());
        assert!(!startup.tick());
        assert!(startup.is_done());
    }

    #[test]
    fn filter_matches_name_or_description() {
        assert!(matches_filter("", "Beta", None));
        assert!(matches_filter("alp", "Alpha", Some("turns on alpha")));
        assert!(!matches_filter("alp", "Beta", None));
        assert!(matches_filter("turns", "Alpha", Some("Turns on alpha")));
    }

    #[test]
    fn dirty_set_is_keyed_by_entry() {
        let mut dirty = DirtySet::default();
        assert!(dirty.insert(EntryKey::new("a", "b")));
        assert!(!dirty.insert(EntryKey::new("a", "b")));
        assert_eq!(dirty.len(), 1);
        assert!(dirty.remove(&EntryKey::new("a", "b")));
        assert!(dirty.is_empty());
    }
}
