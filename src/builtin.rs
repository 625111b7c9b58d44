//! The manager's own preferences, plus demo categories that exercise every editor.

use crate::{
    statics,
    store::{EntryDef, EntryKey, PreferenceStore},
    validator::{FloatValidator, IntRangeValidator},
    value::{
        ColorRepr, EnumType, EnumValue, IntRepr, PrefValue, Rgba, StructType, ValueType,
    },
};
use indexmap::IndexMap;
use std::{sync::Arc, time::Duration};

/// Keys the panel toggle can be bound to. Names match egui key names.
pub fn key_code() -> Arc<EnumType> {
    Arc::new(EnumType::new(
        "KeyCode",
        IntRepr::I32,
        [
            ("None", 0),
            ("Backspace", 8),
            ("Tab", 9),
            ("Escape", 27),
            ("Space", 32),
            ("Insert", 277),
            ("Home", 278),
            ("End", 279),
            ("PageUp", 280),
            ("PageDown", 281),
            ("F1", 282),
            ("F2", 283),
            ("F3", 284),
            ("F4", 285),
            ("F5", 286),
            ("F6", 287),
            ("F7", 288),
            ("F8", 289),
            ("F9", 290),
            ("F10", 291),
            ("F11", 292),
            ("F12", 293),
        ],
    ))
}

fn manager_key(entry: &str) -> EntryKey {
    EntryKey::new(statics::MANAGER_CATEGORY, entry)
}

pub fn register_manager_category(store: &mut PreferenceStore) {
    let key_code = key_code();
    let category =
        store.create_category(statics::MANAGER_CATEGORY, statics::MANAGER_CATEGORY_DISPLAY);
    category.create_entry(
        EntryDef::new(statics::PREF_MAIN_MENU_TOGGLE, ValueType::Enum(key_code.clone()))
            .with_default(PrefValue::Enum(EnumValue::new(key_code, 286)))
            .display_name("Main Menu Toggle")
            .description("Key that shows or hides the preferences panel."),
    );
    category.create_entry(
        EntryDef::new(statics::PREF_STARTUP_DELAY, ValueType::Float)
            .with_default(PrefValue::Float(1.0))
            .display_name("Startup Delay")
            .description("Seconds to wait before the panel is created.")
            .validator(FloatValidator::with_range(1.0, 1.0, 100.0)),
    );
    category.create_entry(
        EntryDef::new(statics::PREF_SHOW_ON_STARTUP, ValueType::Bool)
            .with_default(PrefValue::Bool(true))
            .display_name("Show On Startup")
            .description("Open the panel as soon as it has been created."),
    );
}

/// Name of the key bound to the panel toggle, or `None` when the toggle is unbound.
pub fn toggle_key_name(store: &PreferenceStore) -> Option<String> {
    let entry = store.entry(&manager_key(statics::PREF_MAIN_MENU_TOGGLE))?;
    entry
        .value()?
        .as_enum()
        .filter(|key| key.bits != 0)
        .map(ToString::to_string)
}

pub fn startup_delay(store: &PreferenceStore) -> Duration {
    let seconds = store
        .entry(&manager_key(statics::PREF_STARTUP_DELAY))
        .and_then(|e| e.value())
        .and_then(PrefValue::as_f64)
        .unwrap_or(1.0);
    Duration::from_secs_f64(seconds.clamp(0.0, 100.0))
}

pub fn show_on_startup(store: &PreferenceStore) -> bool {
    store
        .entry(&manager_key(statics::PREF_SHOW_ON_STARTUP))
        .and_then(|e| e.value())
        .and_then(PrefValue::as_bool)
        .unwrap_or(true)
}

fn difficulty() -> Arc<EnumType> {
    Arc::new(EnumType::new(
        "Difficulty",
        IntRepr::U8,
        [("Story", 0), ("Normal", 1), ("Default", 1), ("Hard", 2), ("Nightmare", 3)],
    ))
}

fn layers() -> Arc<EnumType> {
    Arc::new(EnumType::flags(
        "SpawnLayers",
        IntRepr::I32,
        [("None", 0), ("Ground", 1), ("Water", 2), ("Air", 4), ("All", -1)],
    ))
}

fn table<const N: usize>(fields: [(&str, PrefValue); N]) -> PrefValue {
    PrefValue::Table(
        fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<IndexMap<_, _>>(),
    )
}

/// Demo categories covering every editor variant.
pub fn register_demo_categories(store: &mut PreferenceStore) {
    let difficulty = difficulty();
    let layers = layers();
    let gameplay = store.create_category("DemoGameplay", "Demo: Gameplay");
    gameplay.create_entry(
        EntryDef::new("GodMode", ValueType::Bool)
            .with_default(PrefValue::Bool(false))
            .display_name("God Mode")
            .description("Player takes no damage."),
    );
    gameplay.create_entry(
        EntryDef::new("Lives", ValueType::Integer)
            .with_default(PrefValue::Integer(3))
            .description("Extra lives, between 1 and 99.")
            .validator(IntRangeValidator::new(1, 99)),
    );
    gameplay.create_entry(
        EntryDef::new("GameSpeed", ValueType::Float)
            .with_default(PrefValue::Float(1.0))
            .display_name("Game Speed")
            .validator(FloatValidator::with_range(1.0, 0.1, 10.0)),
    );
    gameplay.create_entry(
        EntryDef::new("PlayerName", ValueType::String)
            .with_default(PrefValue::String("Player".into()))
            .display_name("Player Name"),
    );
    gameplay.create_entry(
        EntryDef::new("Difficulty", ValueType::Enum(difficulty.clone()))
            .with_default(PrefValue::Enum(EnumValue::new(difficulty, 1))),
    );
    gameplay.create_entry(
        EntryDef::new("SpawnLayers", ValueType::Enum(layers.clone()))
            .with_default(PrefValue::Enum(EnumValue::new(layers, 1 | 4)))
            .display_name("Spawn Layers")
            .description("Where enemies may appear."),
    );
    gameplay.create_entry(
        EntryDef::new("DebugOverlay", ValueType::Bool)
            .with_default(PrefValue::Bool(false))
            .display_name("Debug Overlay")
            .hidden(true),
    );

    let window = Arc::new(StructType::new(
        "WindowSettings",
        [
            ("width", ValueType::Integer),
            ("height", ValueType::Integer),
            ("fullscreen", ValueType::Bool),
        ],
    ));
    let keybind = Arc::new(StructType::new(
        "Keybind",
        [("action", ValueType::String), ("key", ValueType::String)],
    ));
    let visuals = store.create_category("DemoVisuals", "Demo: Visuals");
    visuals.create_entry(
        EntryDef::new("HighlightColor", ValueType::Color(ColorRepr::Float))
            .with_default(PrefValue::Color(Rgba::Float([1.0, 0.8, 0.2, 1.0])))
            .display_name("Highlight Color"),
    );
    visuals.create_entry(
        EntryDef::new("HudTint", ValueType::Color(ColorRepr::Byte))
            .with_default(PrefValue::Color(Rgba::Byte([64, 160, 255, 200])))
            .display_name("HUD Tint"),
    );
    visuals.create_entry(
        EntryDef::new("Window", ValueType::Struct(window)).with_default(table([
            ("width", PrefValue::Integer(1280)),
            ("height", PrefValue::Integer(720)),
            ("fullscreen", PrefValue::Bool(false)),
        ])),
    );
    visuals.create_entry(
        EntryDef::new("FpsPresets", ValueType::Array(Box::new(ValueType::Integer)))
            .with_default(PrefValue::Array(vec![
                PrefValue::Integer(30),
                PrefValue::Integer(60),
                PrefValue::Integer(144),
            ]))
            .display_name("FPS Presets"),
    );
    visuals.create_entry(
        EntryDef::new(
            "Keybinds",
            ValueType::Array(Box::new(ValueType::Struct(keybind))),
        )
        .with_default(PrefValue::Array(vec![
            table([
                ("action", PrefValue::String("jump".into())),
                ("key", PrefValue::String("Space".into())),
            ]),
            table([
                ("action", PrefValue::String("map".into())),
                ("key", PrefValue::String("M".into())),
            ]),
        ])),
    );
    visuals.create_entry(
        EntryDef::new("Motd", ValueType::String)
            .display_name("Message Of The Day")
            .description("Declared without a default."),
    );

    let internal = store.create_category("DemoInternal", "Demo: Internal");
    internal.create_entry(
        EntryDef::new("CacheVersion", ValueType::Integer)
            .with_default(PrefValue::Integer(7))
            .hidden(true),
    );
    internal.create_entry(
        EntryDef::new("LastProfile", ValueType::String)
            .with_default(PrefValue::String(String::new()))
            .hidden(true),
    );
}
