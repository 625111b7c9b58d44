use crate::{
    mapper,
    statics,
    validator::ValueValidator,
    value::{PrefValue, ValueType},
};
use anyhow::Context;
use indexmap::IndexMap;
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, Sender},
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

/// Identifies one entry across the whole store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey {
    pub category: String,
    pub entry: String,
}

impl EntryKey {
    pub fn new(category: impl Into<String>, entry: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            entry: entry.into(),
        }
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.category, self.entry)
    }
}

/// Sent to subscribers whenever an entry's committed value changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChanged {
    pub key: EntryKey,
    pub old: Option<PrefValue>,
    pub new: Option<PrefValue>,
}

/// Declaration of an entry, as a mod would register it.
#[derive(Debug)]
pub struct EntryDef {
    identifier: String,
    ty: ValueType,
    default: Option<PrefValue>,
    display_name: Option<String>,
    description: Option<String>,
    hidden: bool,
    validator: Option<Box<dyn ValueValidator>>,
}

impl EntryDef {
    /// An entry without a default starts out with no committed value.
    pub fn new(identifier: impl Into<String>, ty: ValueType) -> Self {
        Self {
            identifier: identifier.into(),
            ty,
            default: None,
            display_name: None,
            description: None,
            hidden: false,
            validator: None,
        }
    }

    pub fn with_default(mut self, default: PrefValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn validator(mut self, validator: impl ValueValidator + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }
}

/// One typed preference with a committed slot and an edited slot.
#[derive(Debug)]
pub struct Entry {
    key: EntryKey,
    display_name: String,
    description: Option<String>,
    hidden: bool,
    ty: ValueType,
    default: Option<PrefValue>,
    value: Option<PrefValue>,
    edited: Option<PrefValue>,
    validator: Option<Box<dyn ValueValidator>>,
    subscribers: Vec<Sender<ValueChanged>>,
}

impl Entry {
    fn from_def(category: &str, def: EntryDef) -> Self {
        let validated = match (def.default, &def.validator) {
            (Some(v), Some(validator)) => Some(validator.ensure_valid(v)),
            (default, _) => default,
        };
        Self {
            key: EntryKey::new(category, def.identifier.clone()),
            display_name: def.display_name.unwrap_or(def.identifier),
            description: def.description,
            hidden: def.hidden,
            ty: def.ty,
            default: validated.clone(),
            value: validated.clone(),
            edited: validated,
            validator: def.validator,
            subscribers: Vec::new(),
        }
    }

    pub fn key(&self) -> &EntryKey {
        &self.key
    }

    pub fn identifier(&self) -> &str {
        &self.key.entry
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn value_type(&self) -> &ValueType {
        &self.ty
    }

    pub fn validator(&self) -> Option<&dyn ValueValidator> {
        self.validator.as_deref()
    }

    /// Committed value.
    pub fn value(&self) -> Option<&PrefValue> {
        self.value.as_ref()
    }

    pub fn edited_value(&self) -> Option<&PrefValue> {
        self.edited.as_ref()
    }

    pub fn default_value(&self) -> Option<&PrefValue> {
        self.default.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.value != self.edited
    }

    /// Replaces both slots.
    pub fn set_value(&mut self, value: Option<PrefValue>) {
        let old = self.value.take();
        self.value = value.clone();
        self.edited = value;
        if old != self.value {
            self.notify(old);
        }
    }

    /// Stages a value without committing it.
    pub fn set_edited_value(&mut self, value: Option<PrefValue>) {
        self.edited = value;
    }

    pub fn reset_to_default(&mut self) {
        self.set_value(self.default.clone());
    }

    /// Moves the edited slot into the committed slot.
    pub fn commit_edit(&mut self) {
        if !self.is_dirty() {
            return;
        }
        let old = std::mem::replace(&mut self.value, self.edited.clone());
        self.notify(old);
    }

    pub fn subscribe(&mut self) -> Receiver<ValueChanged> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn notify(&mut self, old: Option<PrefValue>) {
        let change = ValueChanged {
            key: self.key.clone(),
            old,
            new: self.value.clone(),
        };
        // Receivers that went away are dropped here.
        self.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }
}

#[derive(Debug)]
pub struct Category {
    identifier: String,
    display_name: String,
    entries: IndexMap<String, Entry>,
    /// Values from the file not yet claimed by a declared entry.
    loaded: toml::Table,
}

impl Category {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn entry(&self, identifier: &str) -> Option<&Entry> {
        self.entries.get(identifier)
    }

    pub fn entry_mut(&mut self, identifier: &str) -> Option<&mut Entry> {
        self.entries.get_mut(identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declares an entry. Declaring an identifier twice returns the existing entry.
    /// A value present in the file replaces the default when it converts to the
    /// declared type.
    pub fn create_entry(&mut self, def: EntryDef) -> &mut Entry {
        let category = self.identifier.clone();
        let loaded = self.loaded.remove(&def.identifier);
        self.entries
            .entry(def.identifier.clone())
            .or_insert_with(|| {
                let mut entry = Entry::from_def(&category, def);
                if let Some(raw) = loaded {
                    match mapper::to(&entry.ty, &raw) {
                        Ok(v) => {
                            let v = match &entry.validator {
                                Some(validator) => validator.ensure_valid(v),
                                None => v,
                            };
                            entry.value = Some(v.clone());
                            entry.edited = Some(v);
                        }
                        Err(e) => warn!(
                            category = %category,
                            entry = %entry.key.entry,
                            error = %e,
                            "stored value does not match the declared type; keeping default"
                        ),
                    }
                }
                entry
            })
    }

    fn adopt_loaded(&mut self) -> usize {
        let loaded = std::mem::take(&mut self.loaded);
        let count = loaded.len();
        for (key, raw) in loaded {
            let (ty, value) = mapper::infer(&raw);
            debug!(category = %self.identifier, entry = %key, ty = %ty, "adopting undeclared entry");
            self.create_entry(EntryDef::new(key, ty).with_default(value));
        }
        count
    }

    fn to_table(&self) -> anyhow::Result<toml::Table> {
        let mut table = toml::Table::new();
        for entry in self.entries.values() {
            // Absent values have no TOML form.
            let Some(value) = &entry.value else {
                continue;
            };
            let structured = mapper::value_from(value)
                .with_context(|| format!("serializing {}", entry.key))?;
            table.insert(entry.key.entry.clone(), structured.into_toml());
        }
        for (key, raw) in &self.loaded {
            table.insert(key.clone(), raw.clone());
        }
        Ok(table)
    }
}

/// Preference store backed by a TOML file: one table per category.
#[derive(Debug)]
pub struct PreferenceStore {
    path: Option<PathBuf>,
    line_ending: LineEnding,
    /// File sections that no category has claimed.
    document: toml::Table,
    categories: IndexMap<String, Category>,
}

impl PreferenceStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            line_ending: LineEnding::Lf,
            document: toml::Table::new(),
            categories: IndexMap::new(),
        }
    }

    /// Loads `path`. A missing file is an empty store that will be created on save.
    pub fn load_path(path: &Path) -> anyhow::Result<Self> {
        let mut store = if path.exists() {
            let text = fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
            Self::load_str(&text).with_context(|| format!("parsing {path:?}"))?
        } else {
            info!(path = %path.display(), "preferences file not found; starting empty");
            Self::in_memory()
        };
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    pub fn load_str(text: &str) -> anyhow::Result<Self> {
        let document: toml::Table = toml::from_str(text).context("parsing TOML")?;
        Ok(Self {
            path: None,
            line_ending: detect_line_ending(text.as_bytes()),
            document,
            categories: IndexMap::new(),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Declares a category. Declaring an identifier twice returns the existing category.
    pub fn create_category(&mut self, identifier: &str, display_name: &str) -> &mut Category {
        let loaded = match self.document.remove(identifier) {
            Some(toml::Value::Table(table)) => table,
            Some(other) => {
                warn!(
                    category = identifier,
                    found = other.type_str(),
                    "top-level key is not a table; discarding it"
                );
                toml::Table::new()
            }
            None => toml::Table::new(),
        };
        self.categories
            .entry(identifier.to_string())
            .or_insert_with(|| Category {
                identifier: identifier.to_string(),
                display_name: display_name.to_string(),
                entries: IndexMap::new(),
                loaded,
            })
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn category(&self, identifier: &str) -> Option<&Category> {
        self.categories.get(identifier)
    }

    pub fn category_mut(&mut self, identifier: &str) -> Option<&mut Category> {
        self.categories.get_mut(identifier)
    }

    pub fn entry(&self, key: &EntryKey) -> Option<&Entry> {
        self.categories.get(&key.category)?.entries.get(&key.entry)
    }

    pub fn entry_mut(&mut self, key: &EntryKey) -> Option<&mut Entry> {
        self.categories
            .get_mut(&key.category)?
            .entries
            .get_mut(&key.entry)
    }

    /// Creates entries for everything in the file that nobody declared, typing each
    /// from its stored value. Returns the number of adopted entries.
    pub fn adopt_undeclared(&mut self) -> usize {
        let sections: Vec<String> = self
            .document
            .iter()
            .filter(|(_, v)| v.is_table())
            .map(|(k, _)| k.clone())
            .collect();
        for id in sections {
            self.create_category(&id, &id);
        }

        let adopted: usize = self.categories.values_mut().map(Category::adopt_loaded).sum();
        if adopted > 0 {
            info!(adopted, "adopted undeclared preference entries");
        }
        adopted
    }

    /// Commits every edited slot.
    pub fn commit_edits(&mut self) {
        for entry in self.categories.values_mut().flat_map(|c| c.entries.values_mut()) {
            entry.commit_edit();
        }
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        let mut root = self.document.clone();
        for (id, category) in &self.categories {
            root.insert(id.clone(), toml::Value::Table(category.to_table()?));
        }
        let text = toml::to_string_pretty(&root).context("serializing preferences")?;
        Ok(match self.line_ending {
            LineEnding::Lf => text,
            LineEnding::CrLf => text.replace(statics::NL_LF, statics::NL_CRLF),
        })
    }

    /// Commits all edits, then writes the whole file.
    pub fn save(&mut self) -> anyhow::Result<()> {
        self.commit_edits();
        let path = self
            .path
            .clone()
            .context("preference store has no file path")?;
        let text = self.to_toml_string()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("creating {parent:?}"))?;
        }
        fs::write(&path, text).with_context(|| format!("writing {path:?}"))?;
        info!(path = %path.display(), "saved preferences");
        Ok(())
    }
}

fn detect_line_ending(text_bytes: &[u8]) -> LineEnding {
    let mut lf = 0usize;
    let mut crlf = 0usize;
    for (i, b) in text_bytes.iter().enumerate() {
        if *b != b'\n' {
            continue;
        }
        if i > 0 && text_bytes[i - 1] == b'\r' {
            crlf += 1;
        } else {
            lf += 1;
        }
    }
    if crlf > lf {
        LineEnding::CrLf
    } else {
        LineEnding::Lf
    }
}

#[cfg(test)]
mod tests {
    use super::{EntryDef, EntryKey, LineEnding, PreferenceStore, detect_line_ending};
    use crate::{
        validator::FloatValidator,
        value::{PrefValue, ValueType},
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn declared_entry_picks_up_file_value() {
        let mut store = PreferenceStore::load_str("[Mod]\nSpeed = 3.5\n").unwrap();
        let cat = store.create_category("Mod", "My Mod");
        let entry = cat.create_entry(
            EntryDef::new("Speed", ValueType::Float).with_default(PrefValue::Float(1.0)),
        );
        assert_eq!(entry.value(), Some(&PrefValue::Float(3.5)));
        assert_eq!(entry.edited_value(), Some(&PrefValue::Float(3.5)));
        assert_eq!(entry.default_value(), Some(&PrefValue::Float(1.0)));
    }

    #[test]
    fn file_value_of_wrong_type_keeps_default() {
        let mut store = PreferenceStore::load_str("[Mod]\nSpeed = \"fast\"\n").unwrap();
        let entry = store.create_category("Mod", "Mod").create_entry(
            EntryDef::new("Speed", ValueType::Float).with_default(PrefValue::Float(1.0)),
        );
        assert_eq!(entry.value(), Some(&PrefValue::Float(1.0)));
    }

    #[test]
    fn loaded_values_pass_through_the_validator() {
        let mut store = PreferenceStore::load_str("[Mod]\nDelay = 500.0\n").unwrap();
        let entry = store.create_category("Mod", "Mod").create_entry(
            EntryDef::new("Delay", ValueType::Float)
                .with_default(PrefValue::Float(1.0))
                .validator(FloatValidator::with_range(1.0, 1.0, 100.0)),
        );
        assert_eq!(entry.value(), Some(&PrefValue::Float(1.0)));
    }

    #[test]
    fn declaring_twice_returns_the_existing_entry() {
        let mut store = PreferenceStore::in_memory();
        let cat = store.create_category("Mod", "Mod");
        cat.create_entry(EntryDef::new("A", ValueType::Integer).with_default(PrefValue::Integer(1)))
            .set_value(Some(PrefValue::Integer(7)));
        let again = cat.create_entry(
            EntryDef::new("A", ValueType::Integer).with_default(PrefValue::Integer(1)),
        );
        assert_eq!(again.value(), Some(&PrefValue::Integer(7)));
        assert_eq!(cat.len(), 1);
    }

    #[test]
    fn subscribers_see_commits_and_dead_ones_are_pruned() {
        let mut store = PreferenceStore::in_memory();
        let entry = store.create_category("Mod", "Mod").create_entry(
            EntryDef::new("A", ValueType::Bool).with_default(PrefValue::Bool(false)),
        );
        let rx = entry.subscribe();
        let dropped = entry.subscribe();
        drop(dropped);

        entry.set_edited_value(Some(PrefValue::Bool(true)));
        assert!(entry.is_dirty());
        entry.commit_edit();
        assert!(!entry.is_dirty());

        let change = rx.try_recv().unwrap();
        assert_eq!(change.key, EntryKey::new("Mod", "A"));
        assert_eq!(change.old, Some(PrefValue::Bool(false)));
        assert_eq!(change.new, Some(PrefValue::Bool(true)));
        assert_eq!(entry.subscriber_count(), 1);

        // No change, no notification.
        entry.set_value(Some(PrefValue::Bool(true)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn reset_to_default_replaces_both_slots() {
        let mut store = PreferenceStore::in_memory();
        let entry = store.create_category("Mod", "Mod").create_entry(
            EntryDef::new("Name", ValueType::String).with_default(PrefValue::String("a".into())),
        );
        entry.set_value(Some(PrefValue::String("b".into())));
        entry.set_edited_value(Some(PrefValue::String("c".into())));
        entry.reset_to_default();
        assert_eq!(entry.value(), Some(&PrefValue::String("a".into())));
        assert!(!entry.is_dirty());
    }

    #[test]
    fn crlf_files_are_written_back_with_crlf() {
        let mut store = PreferenceStore::load_str("[Mod]\r\nA = 1\r\nB = true\r\n").unwrap();
        assert_eq!(store.line_ending(), LineEnding::CrLf);
        store.adopt_undeclared();
        let text = store.to_toml_string().unwrap();
        assert!(text.contains("A = 1\r\n"), "{text:?}");
        assert!(!text.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn detect_line_ending_uses_majority() {
        assert_eq!(detect_line_ending(b"a = 1\nb = 2\r\nc = 3\n"), LineEnding::Lf);
        assert_eq!(detect_line_ending(b"a = 1\r\nb = 2\nc = 3\r\n"), LineEnding::CrLf);
    }
}
