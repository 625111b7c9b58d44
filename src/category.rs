use crate::store::EntryKey;

/// One entry's place in a category listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceInfo {
    pub key: EntryKey,
    pub hidden: bool,
    /// Whether the row is currently shown.
    pub visible: bool,
}

impl PreferenceInfo {
    /// Hidden entries start out invisible.
    pub fn new(key: EntryKey, hidden: bool) -> Self {
        Self {
            key,
            hidden,
            visible: !hidden,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryInfo {
    pub identifier: String,
    pub display_name: String,
    pub preferences: Vec<PreferenceInfo>,
    /// Every entry is hidden (vacuously true for an empty category).
    pub completely_hidden: bool,
    pub list_button_visible: bool,
    pub highlighted: bool,
    pub content_visible: bool,
}

impl CategoryInfo {
    pub fn new(
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        preferences: Vec<PreferenceInfo>,
    ) -> Self {
        let completely_hidden = preferences.iter().all(|p| p.hidden);
        Self {
            identifier: identifier.into(),
            display_name: display_name.into(),
            preferences,
            completely_hidden,
            list_button_visible: !completely_hidden,
            highlighted: false,
            content_visible: false,
        }
    }

    pub fn visible_count(&self) -> usize {
        self.preferences.iter().filter(|p| p.visible).count()
    }
}
