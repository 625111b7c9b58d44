use super::{EnumName, EnumNameCache, InteractiveValue, ValueCore, Variant};
use crate::value::{EnumType, EnumValue, PrefValue, ValueType};
use eframe::egui;
use std::{any::Any, rc::Rc, sync::Arc};
use tracing::warn;

/// The enum type being edited and its cached names.
#[derive(Debug, Clone)]
pub struct EnumModel {
    pub ty: Option<Arc<EnumType>>,
    pub names: Rc<[EnumName]>,
}

impl EnumModel {
    pub fn new(core: &ValueCore, cache: &mut EnumNameCache) -> Self {
        let ty = match core.value_type() {
            ValueType::Enum(ty) => Some(ty),
            _ => None,
        };
        let names = match &ty {
            Some(ty) => cache.names_for(ty),
            None => Rc::from(Vec::new()),
        };
        Self { ty, names }
    }

    pub fn bits(&self, core: &ValueCore) -> i64 {
        core.value
            .as_ref()
            .and_then(PrefValue::as_enum)
            .map_or(0, |e| e.bits)
    }

    pub fn make_value(&self, bits: i64) -> Option<PrefValue> {
        let ty = self.ty.clone()?;
        Some(PrefValue::Enum(EnumValue::new(ty, bits)))
    }

    pub fn format(&self, bits: i64) -> String {
        match &self.ty {
            Some(ty) => ty.format(bits),
            None => bits.to_string(),
        }
    }
}

/// Dropdown node: option texts and the selected index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dropdown {
    pub options: Vec<String>,
    pub selected: Option<usize>,
    pub caption: String,
}

#[derive(Debug)]
pub struct InteractiveEnum {
    core: ValueCore,
    model: EnumModel,
    dropdown: Option<Dropdown>,
}

impl InteractiveEnum {
    pub fn model(&self) -> &EnumModel {
        &self.model
    }

    pub fn dropdown(&self) -> Option<&Dropdown> {
        self.dropdown.as_ref()
    }

    /// Parses the chosen option back into a value of the enum type.
    pub fn on_option_selected(&mut self, index: usize) -> bool {
        let Some(option) = self.dropdown.as_ref().and_then(|d| d.options.get(index)) else {
            return false;
        };
        let parsed = self
            .model
            .ty
            .as_ref()
            .and_then(|ty| ty.parse(option))
            .and_then(|bits| self.model.make_value(bits));
        let Some(value) = parsed else {
            warn!(option = %option, "dropdown option does not parse to an enum value");
            return false;
        };
        self.core.value = Some(value);
        self.refresh_ui_for_value();
        true
    }
}

impl Variant for InteractiveEnum {
    fn supports(ty: &ValueType) -> bool {
        matches!(ty, ValueType::Enum(_))
    }

    fn create(value: Option<PrefValue>, fallback: ValueType, names: &mut EnumNameCache) -> Self {
        let core = ValueCore::new(value, fallback);
        let model = EnumModel::new(&core, names);
        Self {
            core,
            model,
            dropdown: None,
        }
    }
}

impl InteractiveValue for InteractiveEnum {
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
        "enum"
    }

    fn supports_type(&self, ty: &ValueType) -> bool {
        Self::supports(ty)
    }

    fn build_main_content(&mut self) {
        self.dropdown = Some(Dropdown {
            options: self.model.names.iter().map(|n| n.name.clone()).collect(),
            selected: None,
            caption: String::new(),
        });
    }

    fn destroy_main_content(&mut self) {
        self.dropdown = None;
    }

    fn refresh_ui_for_value(&mut self) {
        let bits = self.model.bits(&self.core);
        let caption = self.model.format(bits);
        if let Some(dropdown) = self.dropdown.as_mut() {
            dropdown.selected = self.model.names.iter().position(|n| n.id == bits);
            dropdown.caption = caption;
        }
    }

    fn show_main(&mut self, ui: &mut egui::Ui) -> bool {
        let Some(dropdown) = &self.dropdown else {
            return false;
        };
        let mut picked = None;
        egui::ComboBox::from_id_salt("enum_dropdown")
            .selected_text(dropdown.caption.as_str())
            .show_ui(ui, |ui| {
                for (i, option) in dropdown.options.iter().enumerate() {
                    if ui
                        .selectable_label(dropdown.selected == Some(i), option.as_str())
                        .clicked()
                    {
                        picked = Some(i);
                    }
                }
            });
        match picked {
            Some(i) => self.on_option_selected(i),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::InteractiveEnum;
    use crate::{
        interactive::{EnumNameCache, InteractiveValue, Variant},
        value::{EnumType, EnumValue, IntRepr, PrefValue, ValueType},
    };
    use std::sync::Arc;

    fn difficulty() -> Arc<EnumType> {
        Arc::new(EnumType::new(
            "Difficulty",
            IntRepr::I32,
            [("Easy", 0), ("Normal", 1), ("Hard", 2)],
        ))
    }

    #[test]
    fn selecting_an_option_parses_it_back() {
        let ty = difficulty();
        let mut cache = EnumNameCache::default();
        let mut widget = InteractiveEnum::create(
            Some(PrefValue::Enum(EnumValue::new(ty.clone(), 1))),
            ValueType::Enum(ty.clone()),
            &mut cache,
        );
        widget.construct_ui();
        let dropdown = widget.dropdown().unwrap();
        assert_eq!(dropdown.options, ["Easy", "Normal", "Hard"]);
        assert_eq!(dropdown.selected, Some(1));
        assert_eq!(dropdown.caption, "Normal");

        assert!(widget.on_option_selected(2));
        assert_eq!(widget.value(), Some(&PrefValue::Enum(EnumValue::new(ty, 2))));
        assert_eq!(widget.dropdown().unwrap().selected, Some(2));

        assert!(!widget.on_option_selected(9));
    }

    #[test]
    fn absent_value_uses_the_declared_enum() {
        let ty = difficulty();
        let mut widget =
            InteractiveEnum::create(None, ValueType::Enum(ty), &mut EnumNameCache::default());
        widget.construct_ui();
        assert_eq!(widget.dropdown().unwrap().selected, Some(0));
        assert_eq!(widget.model().names.len(), 3);
    }
}
