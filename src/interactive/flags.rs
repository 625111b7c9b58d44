use super::{EnumModel, EnumNameCache, InteractiveValue, ValueCore, Variant};
use crate::value::{PrefValue, ValueType};
use eframe::egui;
use std::{any::Any, cell::Cell, rc::Rc};

/// Identity of the "every bit" flag.
pub const ALL_FLAG: i64 = -1;
/// Identity of the "no bits" flag.
pub const NONE_FLAG: i64 = 0;

fn is_sentinel(id: i64) -> bool {
    id == ALL_FLAG || id == NONE_FLAG
}

/// A non-blocking exclusive region for callback reentrancy on the UI thread.
#[derive(Debug, Default, Clone)]
pub struct Section(Rc<Cell<bool>>);

impl Section {
    /// `None` while the section is already held.
    pub fn enter(&self) -> Option<SectionGuard> {
        if self.0.replace(true) {
            return None;
        }
        Some(SectionGuard(self.0.clone()))
    }

    pub fn is_held(&self) -> bool {
        self.0.get()
    }
}

#[derive(Debug)]
pub struct SectionGuard(Rc<Cell<bool>>);

impl Drop for SectionGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagToggle {
    pub id: i64,
    pub name: String,
    pub on: bool,
}

impl FlagToggle {
    fn is_on_for(&self, bits: i64) -> bool {
        (bits == NONE_FLAG && self.id == NONE_FLAG)
            || (bits == ALL_FLAG && self.id == ALL_FLAG)
            || (self.id != ALL_FLAG && bits & self.id != 0)
    }
}

/// Bit-flags editor: a summary on the main row and one toggle per flag in the sub-content.
#[derive(Debug)]
pub struct InteractiveFlags {
    core: ValueCore,
    model: EnumModel,
    summary: Option<String>,
    toggles: Vec<FlagToggle>,
    value_section: Section,
    refresh_section: Section,
}

impl InteractiveFlags {
    pub fn toggles(&self) -> &[FlagToggle] {
        &self.toggles
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn toggle_index(&self, name: &str) -> Option<usize> {
        self.toggles.iter().position(|t| t.name == name)
    }

    /// Section held while the combined value is computed from the toggles.
    pub fn value_section(&self) -> &Section {
        &self.value_section
    }

    /// Section held while the toggles are rewritten from the value.
    pub fn refresh_section(&self) -> &Section {
        &self.refresh_section
    }

    /// A sentinel toggle replaces the whole value; any other toggle recomputes the value
    /// as the union of the ordinary toggles that are on.
    pub fn on_flag_toggled(&mut self, index: usize, on: bool) -> bool {
        // Toggle writes made by a refresh are not edits.
        if self.refresh_section.is_held() {
            return false;
        }
        {
            let Some(_guard) = self.value_section.enter() else {
                return false;
            };
            let Some(toggle) = self.toggles.get_mut(index) else {
                return false;
            };
            toggle.on = on;
            let id = toggle.id;

            let bits = if is_sentinel(id) {
                id
            } else {
                self.toggles
                    .iter()
                    .filter(|t| t.on && !is_sentinel(t.id))
                    .fold(NONE_FLAG, |acc, t| acc | t.id)
            };
            let Some(value) = self.model.make_value(bits) else {
                return false;
            };
            self.core.value = Some(value);
        }
        self.refresh_ui_for_value();
        true
    }

    fn refresh_toggles(&mut self) {
        let Some(_guard) = self.refresh_section.enter() else {
            return;
        };
        let bits = self.model.bits(&self.core);
        for toggle in &mut self.toggles {
            toggle.on = toggle.is_on_for(bits);
        }
    }
}

impl Variant for InteractiveFlags {
    fn supports(ty: &ValueType) -> bool {
        ty.is_flags_enum()
    }

    fn create(value: Option<PrefValue>, fallback: ValueType, names: &mut EnumNameCache) -> Self {
        let core = ValueCore::new(value, fallback);
        let model = EnumModel::new(&core, names);
        Self {
            core,
            model,
            summary: None,
            toggles: Vec::new(),
            value_section: Section::default(),
            refresh_section: Section::default(),
        }
    }
}

impl InteractiveValue for InteractiveFlags {
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
        "flags"
    }

    fn supports_type(&self, ty: &ValueType) -> bool {
        Self::supports(ty)
    }

    fn has_sub_content(&self) -> bool {
        true
    }

    fn build_main_content(&mut self) {
        self.summary = Some(String::new());
    }

    fn destroy_main_content(&mut self) {
        self.summary = None;
    }

    fn build_sub_content(&mut self) {
        self.toggles = self
            .model
            .names
            .iter()
            .map(|n| FlagToggle {
                id: n.id,
                name: n.name.clone(),
                on: false,
            })
            .collect();
    }

    fn destroy_sub_content_nodes(&mut self) {
        self.toggles.clear();
    }

    fn refresh_ui_for_value(&mut self) {
        let bits = self.model.bits(&self.core);
        let text = self.model.format(bits);
        if let Some(summary) = self.summary.as_mut() {
            *summary = text;
        }
        if self.core.sub.constructed {
            self.refresh_toggles();
        }
    }

    fn show_main(&mut self, ui: &mut egui::Ui) -> bool {
        if let Some(summary) = &self.summary {
            ui.label(summary.as_str());
        }
        false
    }

    fn show_sub(&mut self, ui: &mut egui::Ui) -> bool {
        let mut clicked = None;
        ui.vertical(|ui| {
            for (i, toggle) in self.toggles.iter().enumerate() {
                let mut on = toggle.on;
                if ui.checkbox(&mut on, toggle.name.as_str()).changed() {
                    clicked = Some((i, on));
                }
            }
        });
        match clicked {
            Some((i, on)) => self.on_flag_toggled(i, on),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{InteractiveFlags, Section};
    use crate::{
        interactive::{EnumNameCache, InteractiveValue, Variant},
        value::{EnumType, EnumValue, IntRepr, PrefValue, ValueType},
    };
    use std::sync::Arc;

    fn layers_widget(bits: i64) -> InteractiveFlags {
        let ty = Arc::new(EnumType::flags(
            "Layers",
            IntRepr::I32,
            [("None", 0), ("Ground", 1), ("Water", 2), ("Air", 4), ("All", -1)],
        ));
        let mut widget = InteractiveFlags::create(
            Some(PrefValue::Enum(EnumValue::new(ty.clone(), bits))),
            ValueType::Enum(ty),
            &mut EnumNameCache::default(),
        );
        widget.construct_ui();
        widget.toggle_sub_content();
        widget
    }

    fn bits(widget: &InteractiveFlags) -> i64 {
        widget.value().and_then(PrefValue::as_enum).map(|e| e.bits).unwrap()
    }

    fn on_names(widget: &InteractiveFlags) -> Vec<&str> {
        widget
            .toggles()
            .iter()
            .filter(|t| t.on)
            .map(|t| t.name.as_str())
            .collect()
    }

    fn toggle(widget: &mut InteractiveFlags, name: &str, on: bool) -> bool {
        let index = widget.toggle_index(name).unwrap();
        widget.on_flag_toggled(index, on)
    }

    #[test]
    fn ordinary_flags_combine() {
        let mut w = layers_widget(0);
        assert_eq!(on_names(&w), ["None"]);

        assert!(toggle(&mut w, "Ground", true));
        assert!(toggle(&mut w, "Air", true));
        assert_eq!(bits(&w), 5);
        assert_eq!(on_names(&w), ["Ground", "Air"]);
        assert_eq!(w.summary(), Some("Ground, Air"));
    }

    #[test]
    fn none_sentinel_clears_everything() {
        let mut w = layers_widget(5);
        assert!(toggle(&mut w, "None", true));
        assert_eq!(bits(&w), 0);
        assert_eq!(on_names(&w), ["None"]);
    }

    #[test]
    fn all_sentinel_then_ordinary_flag_recomputes() {
        let mut w = layers_widget(0);
        assert!(toggle(&mut w, "All", true));
        assert_eq!(bits(&w), -1);
        assert_eq!(on_names(&w), ["Ground", "Water", "Air", "All"]);

        assert!(toggle(&mut w, "Water", false));
        assert_eq!(bits(&w), 5);
        assert!(!on_names(&w).contains(&"All"));
    }

    #[test]
    fn toggles_during_refresh_are_ignored() {
        let mut w = layers_widget(1);
        let guard = w.refresh_section().enter().unwrap();
        assert!(!toggle(&mut w, "Air", true));
        drop(guard);
        assert_eq!(bits(&w), 1);
    }

    #[test]
    fn toggles_while_the_value_is_computed_are_ignored() {
        let mut w = layers_widget(1);
        let guard = w.value_section().enter().unwrap();
        assert!(!toggle(&mut w, "Air", true));
        drop(guard);
        assert_eq!(bits(&w), 1);
        assert_eq!(on_names(&w), ["Ground"]);

        assert!(toggle(&mut w, "Air", true));
        assert_eq!(bits(&w), 5);
    }

    #[test]
    fn section_is_exclusive_until_the_guard_drops() {
        let section = Section::default();
        let guard = section.enter();
        assert!(guard.is_some());
        assert!(section.enter().is_none());
        drop(guard);
        assert!(!section.is_held());
        assert!(section.enter().is_some());
    }

    #[test]
    fn toggles_are_only_built_when_expanded() {
        let ty = Arc::new(EnumType::flags("F", IntRepr::U8, [("A", 1), ("B", 2)]));
        let mut w = InteractiveFlags::create(None, ValueType::Enum(ty), &mut EnumNameCache::default());
        w.construct_ui();
        assert!(w.toggles().is_empty());
        w.toggle_sub_content();
        assert_eq!(w.toggles().len(), 2);
    }
}
