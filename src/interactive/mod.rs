//! Editor widgets for preference values.
//!
//! Each variant keeps retained widget state ("nodes") that egui draws every frame.
//! User input enters a variant through its `on_*` handlers; a handler returning `true`
//! means the owning row must run its commit attempt.

mod boolean;
mod color;
mod enumeration;
mod flags;
mod toml_object;

pub use boolean::InteractiveBool;
pub use color::{ColorChannelEditor, InteractiveColor};
pub use enumeration::{Dropdown, EnumModel, InteractiveEnum};
pub use flags::{ALL_FLAG, FlagToggle, InteractiveFlags, NONE_FLAG, Section, SectionGuard};
pub use toml_object::{InteractiveTomlObject, TextEditor};

use crate::{
    statics,
    value::{EnumType, PrefValue, ValueType},
};
use eframe::egui;
use std::{any::Any, any::TypeId, collections::HashMap, rc::Rc};
use tracing::{debug, info, warn};

/// Expand/collapse state of a widget's secondary content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubContentState {
    pub expanded: bool,
    pub constructed: bool,
    pub button_visible: bool,
}

/// State shared by every variant.
#[derive(Debug, Clone)]
pub struct ValueCore {
    pub value: Option<PrefValue>,
    pub fallback_type: ValueType,
    pub ui_constructed: bool,
    pub sub: SubContentState,
}

impl ValueCore {
    pub fn new(value: Option<PrefValue>, fallback_type: ValueType) -> Self {
        Self {
            value,
            fallback_type,
            ui_constructed: false,
            sub: SubContentState::default(),
        }
    }

    /// Runtime type of the held value, or the fallback while the value is absent.
    pub fn value_type(&self) -> ValueType {
        match &self.value {
            Some(v) => v.runtime_type(&self.fallback_type),
            None => self.fallback_type.clone(),
        }
    }
}

pub trait InteractiveValue {
    fn core(&self) -> &ValueCore;
    fn core_mut(&mut self) -> &mut ValueCore;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn variant_name(&self) -> &'static str;
    fn supports_type(&self, ty: &ValueType) -> bool;

    /// Creates the main-row nodes.
    fn build_main_content(&mut self);
    /// Drops the main-row nodes.
    fn destroy_main_content(&mut self);
    /// Rewrites existing nodes from the current value. Never creates nodes.
    fn refresh_ui_for_value(&mut self);
    /// Draws the main row; returns `true` when an edit must be committed.
    fn show_main(&mut self, ui: &mut egui::Ui) -> bool;

    fn has_sub_content(&self) -> bool {
        false
    }

    fn sub_content_wanted(&self) -> bool {
        self.has_sub_content()
    }

    fn build_sub_content(&mut self) {}

    fn destroy_sub_content_nodes(&mut self) {}

    fn show_sub(&mut self, _ui: &mut egui::Ui) -> bool {
        false
    }

    /// Display name of the owning entry.
    fn set_owner_label(&mut self, _label: &str) {}

    fn value(&self) -> Option<&PrefValue> {
        self.core().value.as_ref()
    }

    fn set_value(&mut self, value: Option<PrefValue>) {
        self.core_mut().value = value;
    }

    fn value_type(&self) -> ValueType {
        self.core().value_type()
    }

    fn is_ui_constructed(&self) -> bool {
        self.core().ui_constructed
    }

    fn construct_ui(&mut self) {
        if self.core().ui_constructed {
            return;
        }
        self.core_mut().ui_constructed = true;
        self.build_main_content();
        let wanted = self.has_sub_content() && self.sub_content_wanted();
        self.core_mut().sub.button_visible = wanted;
        self.refresh_ui_for_value();
    }

    /// The value changed out of band.
    fn on_value_updated(&mut self) {
        if !self.core().ui_constructed {
            self.construct_ui();
        } else {
            self.refresh_ui_for_value();
        }
    }

    /// Flips expansion; the first expansion builds the sub-content.
    fn toggle_sub_content(&mut self) {
        let sub = &mut self.core_mut().sub;
        sub.expanded = !sub.expanded;
        if sub.expanded && !sub.constructed {
            sub.constructed = true;
            self.build_sub_content();
        }
        self.refresh_ui_for_value();
    }

    /// Hides the expand affordance, and collapses, when sub-content is no longer wanted.
    fn refresh_sub_content_state(&mut self) {
        let wanted = self.has_sub_content() && self.sub_content_wanted();
        let sub = &mut self.core_mut().sub;
        sub.button_visible = wanted;
        if !wanted {
            sub.expanded = false;
        }
    }

    fn destroy_sub_content(&mut self) {
        if !self.core().sub.constructed {
            return;
        }
        self.destroy_sub_content_nodes();
        let sub = &mut self.core_mut().sub;
        sub.constructed = false;
        sub.expanded = false;
    }

    fn destroy_ui(&mut self) {
        self.destroy_sub_content();
        self.destroy_main_content();
        self.core_mut().ui_constructed = false;
    }

    fn expand_button_text(&self) -> &'static str {
        if self.core().sub.expanded {
            statics::EN_BTN_COLLAPSE
        } else {
            statics::EN_BTN_EXPAND
        }
    }

    /// Draws the expand affordance if visible and toggles on click.
    fn show_expand_button(&mut self, ui: &mut egui::Ui) {
        if !self.core().sub.button_visible {
            return;
        }
        if ui.small_button(self.expand_button_text()).clicked() {
            self.toggle_sub_content();
        }
    }
}

/// A widget variant the registry can construct.
pub trait Variant: InteractiveValue + Sized + 'static {
    fn supports(ty: &ValueType) -> bool;
    fn create(value: Option<PrefValue>, fallback: ValueType, names: &mut EnumNameCache) -> Self;
}

/// One named value of an enum type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumName {
    pub id: i64,
    pub name: String,
}

/// Enum names discovered per enum type. Discovery runs at most once per type.
#[derive(Debug, Default)]
pub struct EnumNameCache {
    names: HashMap<String, Rc<[EnumName]>>,
    discoveries: usize,
}

impl EnumNameCache {
    pub fn names_for(&mut self, ty: &EnumType) -> Rc<[EnumName]> {
        if let Some(names) = self.names.get(ty.name()) {
            return names.clone();
        }

        self.discoveries += 1;
        let mut names: Vec<EnumName> = Vec::new();
        for (declared, raw) in ty.declared() {
            let id = match ty.to_bits(declared, *raw) {
                Ok(id) => id,
                Err(e) => {
                    warn!(enum_name = ty.name(), error = %e, "skipping enum value");
                    continue;
                }
            };
            let name = ty.name_of(id).unwrap_or(declared).to_string();
            if names.iter().any(|n| n.name == name) {
                continue;
            }
            names.push(EnumName { id, name });
        }
        debug!(enum_name = ty.name(), count = names.len(), "discovered enum names");

        let names: Rc<[EnumName]> = names.into();
        self.names.insert(ty.name().to_string(), names.clone());
        names
    }

    /// Number of times discovery actually ran.
    pub fn discoveries(&self) -> usize {
        self.discoveries
    }
}

type Constructor = fn(Option<PrefValue>, ValueType, &mut EnumNameCache) -> Box<dyn InteractiveValue>;

fn construct<T: Variant>(
    value: Option<PrefValue>,
    fallback: ValueType,
    names: &mut EnumNameCache,
) -> Box<dyn InteractiveValue> {
    Box::new(T::create(value, fallback, names))
}

fn builtin_variants() -> [(fn(&ValueType) -> bool, Constructor); 4] {
    [
        (InteractiveBool::supports, construct::<InteractiveBool>),
        (InteractiveFlags::supports, construct::<InteractiveFlags>),
        (InteractiveEnum::supports, construct::<InteractiveEnum>),
        (InteractiveColor::supports, construct::<InteractiveColor>),
    ]
}

struct CustomVariant {
    type_id: TypeId,
    probe: Box<dyn InteractiveValue>,
    construct: Constructor,
}

/// Chooses and builds the editor widget for a value.
#[derive(Default)]
pub struct ValueRegistry {
    enum_names: EnumNameCache,
    custom: Vec<CustomVariant>,
}

impl ValueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variant after the built-in ones. Registering the same type again is a no-op
    /// and returns `false`.
    pub fn register_custom_variant<T: Variant>(&mut self) -> bool {
        let type_id = TypeId::of::<T>();
        if self.custom.iter().any(|c| c.type_id == type_id) {
            return false;
        }
        let probe = T::create(None, ValueType::String, &mut self.enum_names);
        info!(variant = probe.variant_name(), "registered custom editor variant");
        self.custom.push(CustomVariant {
            type_id,
            probe: Box::new(probe),
            construct: construct::<T>,
        });
        true
    }

    pub fn custom_variant_count(&self) -> usize {
        self.custom.len()
    }

    /// Builds the first variant supporting the value's runtime type (the fallback type
    /// while the value is absent): built-ins, then custom variants, then the TOML editor.
    pub fn create(&mut self, value: Option<PrefValue>, fallback: &ValueType) -> Box<dyn InteractiveValue> {
        let ty = match &value {
            Some(v) => v.runtime_type(fallback),
            None => fallback.clone(),
        };

        let chosen = builtin_variants()
            .into_iter()
            .find(|(supports, _)| supports(&ty))
            .map(|(_, ctor)| ctor)
            .or_else(|| {
                self.custom
                    .iter()
                    .find(|c| c.probe.supports_type(&ty))
                    .map(|c| c.construct)
            })
            .unwrap_or(construct::<InteractiveTomlObject>);

        let widget = chosen(value, fallback.clone(), &mut self.enum_names);
        debug!(ty = %ty, variant = widget.variant_name(), "created editor");
        widget
    }

    pub fn enum_names(&mut self) -> &mut EnumNameCache {
        &mut self.enum_names
    }
}

#[cfg(test)]
mod tests {
    use super::{EnumNameCache, InteractiveValue, ValueCore, ValueRegistry, Variant};
    use crate::value::{
        ColorRepr, EnumType, EnumValue, IntRepr, PrefValue, Rgba, StructType, ValueType,
    };
    use eframe::egui;
    use std::{any::Any, rc::Rc, sync::Arc};

    fn quality() -> Arc<EnumType> {
        Arc::new(EnumType::new(
            "Quality",
            IntRepr::U8,
            [("Low", 0), ("Medium", 1), ("Default", 1), ("High", 2), ("Broken", 999)],
        ))
    }

    fn layers() -> Arc<EnumType> {
        Arc::new(EnumType::flags(
            "Layers",
            IntRepr::I32,
            [("None", 0), ("Ground", 1), ("Water", 2), ("Air", 4), ("All", -1)],
        ))
    }

    #[test]
    fn enum_names_are_discovered_once_per_type() {
        let mut cache = EnumNameCache::default();
        let first = cache.names_for(&quality());
        let second = cache.names_for(&quality());
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.discoveries(), 1);

        // Aliases collapse, out-of-range values are skipped.
        let names: Vec<&str> = first.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["Low", "Medium", "High"]);
    }

    #[test]
    fn registry_picks_variants_in_priority_order() {
        let mut registry = ValueRegistry::new();
        let cases: Vec<(Option<PrefValue>, ValueType, &str)> = vec![
            (Some(PrefValue::Bool(true)), ValueType::Bool, "bool"),
            (
                Some(PrefValue::Enum(EnumValue::new(layers(), 5))),
                ValueType::Enum(layers()),
                "flags",
            ),
            (None, ValueType::Enum(quality()), "enum"),
            (
                Some(PrefValue::Color(Rgba::Byte([1, 2, 3, 4]))),
                ValueType::Color(ColorRepr::Byte),
                "color",
            ),
            (Some(PrefValue::Integer(3)), ValueType::Integer, "toml"),
            (
                None,
                ValueType::Struct(Arc::new(StructType::new("S", [("a", ValueType::Bool)]))),
                "toml",
            ),
        ];
        for (value, fallback, expected) in cases {
            let ty = match &value {
                Some(v) => v.runtime_type(&fallback),
                None => fallback.clone(),
            };
            let widget = registry.create(value, &fallback);
            assert_eq!(widget.variant_name(), expected, "for {ty}");
            assert!(widget.supports_type(&ty));
        }
    }

    #[test]
    fn value_type_follows_the_value_over_the_declared_type() {
        let mut registry = ValueRegistry::new();
        let widget = registry.create(Some(PrefValue::Bool(false)), &ValueType::String);
        assert_eq!(widget.variant_name(), "bool");
    }

    #[derive(Debug)]
    struct Percent {
        core: ValueCore,
    }

    impl InteractiveValue for Percent {
        fn core(&self) -> &ValueCore {
            &self.core
        }
        fn core_mut(&mut self) -> &mut ValueCore {
            &mut self.core
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
        fn variant_name(&self) -> &'static str {
            "percent"
        }
        fn supports_type(&self, ty: &ValueType) -> bool {
            Self::supports(ty)
        }
        fn build_main_content(&mut self) {}
        fn destroy_main_content(&mut self) {}
        fn refresh_ui_for_value(&mut self) {}
        fn show_main(&mut self, _ui: &mut egui::Ui) -> bool {
            false
        }
    }

    impl Variant for Percent {
        fn supports(ty: &ValueType) -> bool {
            *ty == ValueType::Float
        }
        fn create(value: Option<PrefValue>, fallback: ValueType, _: &mut EnumNameCache) -> Self {
            Self {
                core: ValueCore::new(value, fallback),
            }
        }
    }

    #[test]
    fn custom_variants_register_once_and_come_after_builtins() {
        let mut registry = ValueRegistry::new();
        assert!(registry.register_custom_variant::<Percent>());
        assert!(!registry.register_custom_variant::<Percent>());
        assert_eq!(registry.custom_variant_count(), 1);

        let widget = registry.create(Some(PrefValue::Float(0.5)), &ValueType::Float);
        assert_eq!(widget.variant_name(), "percent");
        assert!(widget.as_any().downcast_ref::<Percent>().is_some());

        let widget = registry.create(Some(PrefValue::Bool(true)), &ValueType::Float);
        assert_eq!(widget.variant_name(), "bool");
    }

    #[test]
    fn sub_content_is_built_on_first_expand_only() {
        let mut registry = ValueRegistry::new();
        let mut widget = registry.create(
            Some(PrefValue::Enum(EnumValue::new(layers(), 0))),
            &ValueType::Enum(layers()),
        );
        widget.construct_ui();
        assert!(widget.core().sub.button_visible);
        assert!(!widget.core().sub.constructed);

        widget.toggle_sub_content();
        assert!(widget.core().sub.expanded && widget.core().sub.constructed);
        assert_eq!(widget.expand_button_text(), crate::statics::EN_BTN_COLLAPSE);

        widget.toggle_sub_content();
        assert!(!widget.core().sub.expanded);
        assert!(widget.core().sub.constructed);

        widget.destroy_ui();
        assert!(!widget.is_ui_constructed());
        assert!(!widget.core().sub.constructed);
    }
}
