use super::{EnumNameCache, InteractiveValue, ValueCore, Variant};
use crate::{
    statics,
    value::{PrefValue, ValueType},
};
use eframe::egui::{self, Color32, RichText};
use std::any::Any;

#[derive(Debug, Clone, PartialEq)]
pub struct BoolToggle {
    pub on: bool,
    pub label: &'static str,
    pub color: Color32,
}

#[derive(Debug)]
pub struct InteractiveBool {
    core: ValueCore,
    toggle: Option<BoolToggle>,
}

impl InteractiveBool {
    pub fn toggle(&self) -> Option<&BoolToggle> {
        self.toggle.as_ref()
    }

    pub fn on_toggle(&mut self, on: bool) -> bool {
        self.core.value = Some(PrefValue::Bool(on));
        self.refresh_ui_for_value();
        true
    }
}

impl Variant for InteractiveBool {
    fn supports(ty: &ValueType) -> bool {
        *ty == ValueType::Bool
    }

    fn create(value: Option<PrefValue>, fallback: ValueType, _names: &mut EnumNameCache) -> Self {
        Self {
            core: ValueCore::new(value, fallback),
            toggle: None,
        }
    }
}

impl InteractiveValue for InteractiveBool {
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
        "bool"
    }

    fn supports_type(&self, ty: &ValueType) -> bool {
        Self::supports(ty)
    }

    fn build_main_content(&mut self) {
        self.toggle = Some(BoolToggle {
            on: false,
            label: statics::EN_BOOL_FALSE,
            color: statics::COLOR_FALSE,
        });
    }

    fn destroy_main_content(&mut self) {
        self.toggle = None;
    }

    fn refresh_ui_for_value(&mut self) {
        let on = self.core.value.as_ref().and_then(PrefValue::as_bool).unwrap_or(false);
        if let Some(toggle) = self.toggle.as_mut() {
            toggle.on = on;
            (toggle.label, toggle.color) = if on {
                (statics::EN_BOOL_TRUE, statics::COLOR_TRUE)
            } else {
                (statics::EN_BOOL_FALSE, statics::COLOR_FALSE)
            };
        }
    }

    fn show_main(&mut self, ui: &mut egui::Ui) -> bool {
        let Some(toggle) = &self.toggle else {
            return false;
        };
        let mut on = toggle.on;
        let text = RichText::new(toggle.label).color(toggle.color);
        if ui.checkbox(&mut on, text).changed() {
            return self.on_toggle(on);
        }
        false
    }
}
