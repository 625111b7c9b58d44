use super::{EnumNameCache, InteractiveValue, ValueCore, Variant};
use crate::{
    statics,
    value::{ColorChannel, ColorRepr, PrefValue, Rgba, ValueType},
};
use eframe::egui::{self, Color32};
use std::{any::Any, ops::RangeInclusive};
use tracing::debug;

/// Slider plus text input for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorChannelEditor {
    pub channel: ColorChannel,
    pub slider: f32,
    pub input: String,
    pub range: RangeInclusive<f32>,
    pub integer_only: bool,
    /// The input holds text the user is still typing.
    editing: bool,
}

impl ColorChannelEditor {
    fn new(channel: ColorChannel, repr: ColorRepr) -> Self {
        let (range, integer_only) = match repr {
            ColorRepr::Byte => (0.0..=255.0, true),
            ColorRepr::Float => (0.0..=1.0, false),
        };
        Self {
            channel,
            slider: 0.0,
            input: String::new(),
            range,
            integer_only,
            editing: false,
        }
    }

    fn format(&self, value: f32) -> String {
        if self.integer_only {
            format!("{}", value.round() as i64)
        } else {
            ryu::Buffer::new().format(value).to_string()
        }
    }

    /// Digits only for byte channels; digits and one decimal point otherwise.
    fn sanitize(&self, text: &str) -> String {
        let mut seen_point = false;
        text.chars()
            .filter(|c| {
                if c.is_ascii_digit() {
                    return true;
                }
                if *c == '.' && !self.integer_only && !seen_point {
                    seen_point = true;
                    return true;
                }
                false
            })
            .collect()
    }

    fn set_from(&mut self, value: f32) {
        self.slider = value;
        if !self.editing {
            self.input = self.format(value);
        }
    }
}

#[derive(Debug)]
pub struct InteractiveColor {
    core: ValueCore,
    repr: ColorRepr,
    swatch: Option<Color32>,
    channels: Vec<ColorChannelEditor>,
}

impl InteractiveColor {
    pub fn repr(&self) -> ColorRepr {
        self.repr
    }

    pub fn swatch(&self) -> Option<Color32> {
        self.swatch
    }

    pub fn channels(&self) -> &[ColorChannelEditor] {
        &self.channels
    }

    fn color(&self) -> Rgba {
        match &self.core.value {
            Some(PrefValue::Color(c)) => *c,
            _ => Rgba::zero(self.repr),
        }
    }

    fn set_channel(&mut self, index: usize, value: f32) -> bool {
        let Some(editor) = self.channels.get(index) else {
            return false;
        };
        let color = self.color().with_channel(editor.channel, value);
        self.core.value = Some(PrefValue::Color(color));
        self.refresh_ui_for_value();
        true
    }

    pub fn on_slider_changed(&mut self, index: usize, value: f32) -> bool {
        for editor in &mut self.channels {
            editor.editing = false;
        }
        self.set_channel(index, value)
    }

    /// Keeps the typed text as is while it parses and is in range; out of range text
    /// is replaced by the clamped value. Unparsable text is not an edit.
    pub fn on_input_changed(&mut self, index: usize, text: &str) -> bool {
        let Some(editor) = self.channels.get_mut(index) else {
            return false;
        };
        editor.input = editor.sanitize(text);
        editor.editing = true;
        match editor.input.parse::<f32>() {
            Ok(value) => {
                if !editor.range.contains(&value) {
                    editor.editing = false;
                }
                self.set_channel(index, value)
            }
            Err(e) => {
                debug!(channel = editor.channel.label(), error = %e, "ignoring channel input");
                false
            }
        }
    }

    /// The input lost focus; show the canonical text again.
    pub fn on_input_finished(&mut self, index: usize) {
        if let Some(editor) = self.channels.get_mut(index) {
            editor.editing = false;
        }
        self.refresh_ui_for_value();
    }
}

impl Variant for InteractiveColor {
    fn supports(ty: &ValueType) -> bool {
        matches!(ty, ValueType::Color(_))
    }

    fn create(value: Option<PrefValue>, fallback: ValueType, _names: &mut EnumNameCache) -> Self {
        let core = ValueCore::new(value, fallback);
        let repr = match core.value_type() {
            ValueType::Color(repr) => repr,
            _ => ColorRepr::Float,
        };
        Self {
            core,
            repr,
            swatch: None,
            channels: Vec::new(),
        }
    }
}

enum ChannelEvent {
    Slider(usize, f32),
    Input(usize, String),
    InputFinished(usize),
}

impl InteractiveValue for InteractiveColor {
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
        "color"
    }

    fn supports_type(&self, ty: &ValueType) -> bool {
        Self::supports(ty)
    }

    fn build_main_content(&mut self) {
        self.swatch = Some(Color32::BLACK);
        self.channels = ColorChannel::ALL
            .iter()
            .map(|c| ColorChannelEditor::new(*c, self.repr))
            .collect();
    }

    fn destroy_main_content(&mut self) {
        self.swatch = None;
        self.channels.clear();
    }

    fn refresh_ui_for_value(&mut self) {
        let color = self.color();
        if let Some(swatch) = self.swatch.as_mut() {
            let [r, g, b, a] = color.to_srgba_bytes();
            *swatch = Color32::from_rgba_unmultiplied(r, g, b, a);
        }
        for editor in &mut self.channels {
            editor.set_from(color.channel(editor.channel));
        }
    }

    fn show_main(&mut self, ui: &mut egui::Ui) -> bool {
        let Some(swatch) = self.swatch else {
            return false;
        };
        let mut events = Vec::new();
        ui.horizontal(|ui| {
            let (rect, _) = ui.allocate_exact_size(statics::SWATCH_SIZE.into(), egui::Sense::hover());
            ui.painter().rect_filled(rect, 2.0, swatch);

            egui::Grid::new("color_channels").num_columns(3).show(ui, |ui| {
                for (i, editor) in self.channels.iter().enumerate() {
                    ui.label(editor.channel.label());

                    let mut slider = editor.slider;
                    let mut widget = egui::Slider::new(&mut slider, editor.range.clone()).show_value(false);
                    if editor.integer_only {
                        widget = widget.integer();
                    }
                    if ui.add(widget).changed() {
                        events.push(ChannelEvent::Slider(i, slider));
                    }

                    let mut text = editor.input.clone();
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut text).desired_width(statics::CHANNEL_INPUT_WIDTH),
                    );
                    if response.changed() {
                        events.push(ChannelEvent::Input(i, text));
                    }
                    if response.lost_focus() {
                        events.push(ChannelEvent::InputFinished(i));
                    }
                    ui.end_row();
                }
            });
        });

        let mut commit = false;
        for event in events {
            match event {
                ChannelEvent::Slider(i, v) => commit |= self.on_slider_changed(i, v),
                ChannelEvent::Input(i, text) => commit |= self.on_input_changed(i, &text),
                ChannelEvent::InputFinished(i) => self.on_input_finished(i),
            }
        }
        commit
    }
}

#[cfg(test)]
mod tests {
    use super::InteractiveColor;
    use crate::{
        interactive::{EnumNameCache, InteractiveValue, Variant},
        value::{ColorRepr, PrefValue, Rgba, ValueType},
    };
    use eframe::egui::Color32;

    fn widget(value: Rgba) -> InteractiveColor {
        let repr = value.repr();
        let mut w = InteractiveColor::create(
            Some(PrefValue::Color(value)),
            ValueType::Color(repr),
            &mut EnumNameCache::default(),
        );
        w.construct_ui();
        w
    }

    #[test]
    fn byte_colors_use_integer_channels() {
        let w = widget(Rgba::Byte([10, 20, 30, 255]));
        for editor in w.channels() {
            assert_eq!(editor.range, 0.0..=255.0);
            assert!(editor.integer_only);
        }
        assert_eq!(w.channels()[1].input, "20");
        assert_eq!(w.swatch(), Some(Color32::from_rgba_unmultiplied(10, 20, 30, 255)));
    }

    #[test]
    fn float_colors_use_decimal_channels() {
        let w = widget(Rgba::Float([0.5, 0.25, 1.0, 1.0]));
        assert_eq!(w.repr(), ColorRepr::Float);
        for editor in w.channels() {
            assert_eq!(editor.range, 0.0..=1.0);
            assert!(!editor.integer_only);
        }
        assert_eq!(w.channels()[0].input, "0.5");
    }

    #[test]
    fn channel_edits_keep_the_other_channels() {
        let mut w = widget(Rgba::Byte([10, 20, 30, 255]));
        assert!(w.on_slider_changed(2, 200.0));
        assert_eq!(w.value(), Some(&PrefValue::Color(Rgba::Byte([10, 20, 200, 255]))));
        assert_eq!(w.channels()[2].input, "200");
        assert_eq!(w.swatch(), Some(Color32::from_rgba_unmultiplied(10, 20, 200, 255)));

        assert!(w.on_input_changed(0, "7x7"));
        assert_eq!(w.value(), Some(&PrefValue::Color(Rgba::Byte([77, 20, 200, 255]))));
        assert_eq!(w.channels()[0].input, "77");
    }

    #[test]
    fn typed_text_survives_until_focus_is_lost() {
        let mut w = widget(Rgba::Float([0.0, 0.0, 0.0, 1.0]));
        assert!(w.on_input_changed(0, "0.50"));
        assert_eq!(w.channels()[0].input, "0.50");
        assert_eq!(w.channels()[0].slider, 0.5);

        assert!(!w.on_input_changed(1, ""));
        assert_eq!(w.value(), Some(&PrefValue::Color(Rgba::Float([0.5, 0.0, 0.0, 1.0]))));

        w.on_input_finished(0);
        assert_eq!(w.channels()[0].input, "0.5");
    }

    #[test]
    fn float_channels_are_clamped() {
        let mut w = widget(Rgba::Float([0.0, 0.0, 0.0, 1.0]));
        assert!(w.on_input_changed(3, "2.5"));
        assert_eq!(w.value(), Some(&PrefValue::Color(Rgba::Float([0.0, 0.0, 0.0, 1.0]))));
        assert_eq!(w.channels()[3].input, "1.0");
    }

    #[test]
    fn out_of_range_byte_input_shows_the_clamped_value() {
        let mut w = widget(Rgba::Byte([10, 20, 30, 255]));
        assert!(w.on_input_changed(0, "999"));
        assert_eq!(w.value(), Some(&PrefValue::Color(Rgba::Byte([255, 20, 30, 255]))));
        assert_eq!(w.channels()[0].input, "255");

        // In range text is left as typed.
        assert!(w.on_input_changed(1, "040"));
        assert_eq!(w.channels()[1].input, "040");
    }
}
