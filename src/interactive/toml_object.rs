use super::{EnumNameCache, InteractiveValue, ValueCore, Variant};
use crate::{
    mapper::{self, MapperError, TextLayout},
    statics,
    value::{PrefValue, ValueType},
};
use eframe::egui;
use std::any::Any;
use tracing::{debug, error};

/// Multi-line text node of the generic editor.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEditor {
    pub text: String,
    pub layout: TextLayout,
    pub valid: bool,
}

/// Generic editor: the value as TOML text, parsed back on every change.
#[derive(Debug)]
pub struct InteractiveTomlObject {
    core: ValueCore,
    owner_label: String,
    editor: Option<TextEditor>,
    /// Runtime type that could not be rendered as text.
    unrenderable: Option<ValueType>,
}

impl InteractiveTomlObject {
    pub fn editor(&self) -> Option<&TextEditor> {
        self.editor.as_ref()
    }

    pub fn is_unrenderable(&self) -> bool {
        self.unrenderable.is_some()
    }

    pub fn on_text_changed(&mut self, text: &str) -> bool {
        let ty = self.core.value_type();
        let Some(editor) = self.editor.as_mut() else {
            return false;
        };
        editor.text = text.to_string();
        match mapper::parse_text(&ty, &editor.text, &editor.layout) {
            Ok(value) => {
                editor.valid = true;
                self.core.value = Some(value);
                self.refresh_ui_for_value();
                true
            }
            Err(e) => {
                editor.valid = false;
                debug!(entry = %self.owner_label, error = %e, "text does not parse");
                false
            }
        }
    }
}

/// Inline text when the mapper can stringify the value, otherwise one of the table forms.
fn render(value: &PrefValue, key: &str) -> Result<(String, TextLayout), MapperError> {
    let structured = mapper::value_from(value)?;
    match structured.serialized_value() {
        Ok(text) => Ok((text, TextLayout::Inline)),
        Err(e) => {
            debug!(error = %e, "no inline form; trying table serializers");
            if structured.is_table_array() {
                let text = structured.serialize_table_array(key)?;
                Ok((text, TextLayout::TableArray { key: key.to_string() }))
            } else if structured.is_table() {
                Ok((structured.serialize_non_inline_table()?, TextLayout::Table))
            } else {
                Err(MapperError::UnsupportedShape(structured.as_toml().type_str()))
            }
        }
    }
}

impl Variant for InteractiveTomlObject {
    fn supports(_ty: &ValueType) -> bool {
        true
    }

    fn create(value: Option<PrefValue>, fallback: ValueType, _names: &mut EnumNameCache) -> Self {
        Self {
            core: ValueCore::new(value, fallback),
            owner_label: String::from("value"),
            editor: None,
            unrenderable: None,
        }
    }
}

impl InteractiveValue for InteractiveTomlObject {
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
        "toml"
    }

    fn supports_type(&self, ty: &ValueType) -> bool {
        Self::supports(ty)
    }

    fn set_owner_label(&mut self, label: &str) {
        self.owner_label = label.to_string();
    }

    fn build_main_content(&mut self) {
        self.editor = Some(TextEditor {
            text: String::new(),
            layout: TextLayout::Inline,
            valid: true,
        });
    }

    fn destroy_main_content(&mut self) {
        self.editor = None;
    }

    fn refresh_ui_for_value(&mut self) {
        let ty = self.core.value_type();
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        if self.unrenderable.as_ref() == Some(&ty) {
            return;
        }
        let Some(value) = &self.core.value else {
            editor.text.clear();
            editor.layout = TextLayout::Inline;
            editor.valid = true;
            return;
        };

        // Text the user typed that already means this value stays as typed.
        if editor.valid
            && mapper::parse_text(&ty, &editor.text, &editor.layout).ok().as_ref() == Some(value)
        {
            return;
        }

        match render(value, &self.owner_label) {
            Ok((text, layout)) => {
                editor.text = text;
                editor.layout = layout;
                editor.valid = true;
                self.unrenderable = None;
            }
            Err(e) => {
                error!(entry = %self.owner_label, ty = %ty, error = %e, "value cannot be shown as text");
                self.unrenderable = Some(ty);
            }
        }
    }

    fn show_main(&mut self, ui: &mut egui::Ui) -> bool {
        if self.unrenderable.is_some() {
            ui.colored_label(statics::COLOR_INVALID_TEXT, statics::EN_UNRENDERABLE);
            return false;
        }
        let Some(editor) = &self.editor else {
            return false;
        };
        let mut text = editor.text.clone();
        let color = if editor.valid {
            ui.visuals().text_color()
        } else {
            statics::COLOR_INVALID_TEXT
        };
        let rows = match editor.layout {
            TextLayout::Inline => 1,
            _ => statics::TEXT_EDITOR_ROWS,
        };
        let response = ui.add(
            egui::TextEdit::multiline(&mut text)
                .code_editor()
                .desired_rows(rows)
                .desired_width(f32::INFINITY)
                .text_color(color),
        );
        if response.changed() {
            return self.on_text_changed(&text);
        }
        false
    }
}
