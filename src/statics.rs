// UI strings, colours and other constants shared by the panel and the preference store.

use eframe::egui::Color32;

pub const APP_NAME: &str = "Mod Preferences Manager";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// The manager's own preference category.
pub const MANAGER_CATEGORY: &str = "ModPreferencesManager";
pub const MANAGER_CATEGORY_DISPLAY: &str = "Mod Preferences Manager";
pub const PREF_MAIN_MENU_TOGGLE: &str = "MainMenuToggle";
pub const PREF_STARTUP_DELAY: &str = "StartupDelay";
pub const PREF_SHOW_ON_STARTUP: &str = "ShowOnStartup";

pub const DEFAULT_PREFS_FILE: &str = "preferences.toml";

pub const NL_LF: &str = "\n";
pub const NL_CRLF: &str = "\r\n";

// English UI strings (EN_ prefix to make future localization easier)
pub const EN_BTN_SAVE: &str = "Save Preferences";
pub const EN_BTN_CLOSE: &str = "Close";
pub const EN_BTN_UNDO: &str = "Undo";
pub const EN_BTN_DEFAULT: &str = "Default";
pub const EN_BTN_EXPAND: &str = "▲ Expand to edit";
pub const EN_BTN_COLLAPSE: &str = "▼ Click to hide";

pub const EN_TOGGLE_SHOW_HIDDEN: &str = "Show Advanced Settings";
pub const EN_LABEL_SEARCH: &str = "Search:";
pub const EN_HINT_SEARCH: &str = "name or description";
pub const EN_HEADING_CATEGORIES: &str = "Categories";
pub const EN_NO_CATEGORY: &str = "Select a category on the left.";
pub const EN_NO_MATCHES: &str = "No settings match the current filter.";
pub const EN_LOADING: &str = "Loading preferences...";
pub const EN_BACKDROP_HINT: &str = "Press the menu key to open the preferences panel.";
pub const EN_BACKDROP_KEY: &str = "Menu key:";

pub const EN_BOOL_TRUE: &str = "true";
pub const EN_BOOL_FALSE: &str = "false";
pub const EN_UNRENDERABLE: &str = "This value cannot be shown as text.";

// Colours.
pub const COLOR_TITLE: Color32 = Color32::from_rgb(0x4c, 0xd4, 0x3d);
pub const COLOR_TRUE: Color32 = Color32::from_rgb(0x6b, 0xc9, 0x81);
pub const COLOR_FALSE: Color32 = Color32::from_rgb(0xc9, 0x6b, 0x6b);
pub const COLOR_INVALID_TEXT: Color32 = Color32::from_rgb(0xe0, 0x40, 0x40);
pub const COLOR_DESCRIPTION: Color32 = Color32::from_gray(0x9e);
pub const COLOR_SIGNATURE: Color32 = Color32::from_rgb(0x5c, 0x9c, 0xd6);
pub const COLOR_DIRTY: Color32 = Color32::from_rgb(0xe0, 0xb0, 0x40);

// Layout.
pub const WINDOW_SIZE: [f32; 2] = [1100.0, 760.0];
pub const PANEL_SIZE: [f32; 2] = [900.0, 620.0];
pub const CATEGORY_LIST_WIDTH: f32 = 240.0;
pub const LIST_ROW_HEIGHT: f32 = 22.0;
pub const SWATCH_SIZE: [f32; 2] = [48.0, 18.0];
pub const CHANNEL_INPUT_WIDTH: f32 = 64.0;
pub const TEXT_EDITOR_ROWS: usize = 6;
