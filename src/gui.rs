use crate::{
    builtin,
    controller::Controller,
    interactive::ValueRegistry,
    statics,
    store::PreferenceStore,
};
use eframe::egui::{self, RichText};
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub fn run_gui(store: PreferenceStore, registry: ValueRegistry) -> eframe::Result {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size(statics::WINDOW_SIZE),
        ..Default::default()
    };
    let title = format!("{} {}", statics::APP_NAME, statics::APP_VERSION);
    eframe::run_native(
        &title,
        options,
        Box::new(|_cc| Ok(Box::new(PrefsApp::new(store, registry)))),
    )
}

/// Host window. The preferences panel is created once the startup delay has passed.
struct PrefsApp {
    store: PreferenceStore,
    registry: ValueRegistry,
    controller: Option<Controller>,
    launched: Instant,
    search: String,
    /// Last toggle key name already reported as unmapped.
    unmapped_key: Option<String>,
}

impl PrefsApp {
    fn new(store: PreferenceStore, registry: ValueRegistry) -> Self {
        Self {
            store,
            registry,
            controller: None,
            launched: Instant::now(),
            search: String::new(),
            unmapped_key: None,
        }
    }

    fn create_menu(&mut self) {
        if self.controller.is_some() {
            warn!("a preferences panel already exists; not creating another");
            return;
        }
        let mut controller = Controller::new();
        controller.set_show_menu(builtin::show_on_startup(&self.store));
        self.controller = Some(controller);
        info!("preferences panel created");
    }

    fn toggle_key(&mut self) -> Option<egui::Key> {
        let name = builtin::toggle_key_name(&self.store)?;
        let key = egui::Key::from_name(&name);
        if key.is_none() && self.unmapped_key.as_deref() != Some(name.as_str()) {
            warn!(key = %name, "toggle key has no keyboard equivalent");
            self.unmapped_key = Some(name);
        }
        key
    }

    fn selectable_row_left(
        ui: &mut egui::Ui,
        selected: bool,
        text: &str,
        row_h: f32,
    ) -> egui::Response {
        let w = ui.available_width();
        let (rect, response) = ui.allocate_exact_size(egui::vec2(w, row_h), egui::Sense::click());
        let response = response.on_hover_cursor(egui::CursorIcon::PointingHand);

        let visuals = ui.style().interact_selectable(&response, selected);
        if ui.is_rect_visible(rect) {
            ui.painter()
                .rect_filled(rect, visuals.corner_radius, visuals.bg_fill);
            ui.painter().rect_stroke(
                rect,
                visuals.corner_radius,
                visuals.bg_stroke,
                egui::StrokeKind::Inside,
            );
            let font_id = egui::TextStyle::Button.resolve(ui.style());
            ui.painter().text(
                rect.left_center() + egui::vec2(6.0, 0.0),
                egui::Align2::LEFT_CENTER,
                text,
                font_id,
                visuals.text_color(),
            );
        }
        response
    }

    fn render_toolbar(
        ui: &mut egui::Ui,
        controller: &mut Controller,
        store: &mut PreferenceStore,
        search: &mut String,
    ) {
        ui.horizontal(|ui| {
            let save = egui::Button::new(statics::EN_BTN_SAVE).min_size(egui::vec2(160.0, 28.0));
            if ui.add_enabled(controller.save_enabled(), save).clicked() {
                controller.save_preferences(store);
            }
            if controller.save_enabled() {
                ui.colored_label(
                    statics::COLOR_DIRTY,
                    format!("{} unsaved", controller.dirty().len()),
                );
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button(statics::EN_BTN_CLOSE).clicked() {
                    controller.on_close_panel_clicked();
                }
            });
        });
        ui.horizontal(|ui| {
            let mut show_hidden = controller.show_hidden();
            if ui
                .checkbox(&mut show_hidden, statics::EN_TOGGLE_SHOW_HIDDEN)
                .changed()
            {
                controller.set_hidden_config_visibility(show_hidden);
            }
            ui.separator();
            ui.label(statics::EN_LABEL_SEARCH);
            let response = ui.add(
                egui::TextEdit::singleline(search)
                    .hint_text(statics::EN_HINT_SEARCH)
                    .desired_width(f32::INFINITY),
            );
            if response.changed() {
                controller.filter_configs(search);
            }
        });
    }

    fn render_category_list(ui: &mut egui::Ui, controller: &mut Controller) {
        ui.heading(statics::EN_HEADING_CATEGORIES);
        ui.separator();
        let mut clicked = None;
        ui.push_id("categories_scroll", |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    for info in controller.categories().filter(|c| c.list_button_visible) {
                        let row = Self::selectable_row_left(
                            ui,
                            info.highlighted,
                            &info.display_name,
                            statics::LIST_ROW_HEIGHT,
                        );
                        if row.clicked() {
                            clicked = Some(info.identifier.clone());
                        }
                    }
                });
        });
        if let Some(identifier) = clicked {
            controller.set_active_category(&identifier);
        }
    }

    fn render_panel(
        ui: &mut egui::Ui,
        controller: &mut Controller,
        store: &mut PreferenceStore,
        search: &mut String,
    ) {
        if !controller.is_ready() {
            ui.label(statics::EN_LOADING);
            return;
        }
        Self::render_toolbar(ui, controller, store, search);
        ui.separator();

        egui::SidePanel::left("category_list")
            .resizable(true)
            .default_width(statics::CATEGORY_LIST_WIDTH)
            .show_inside(ui, |ui| Self::render_category_list(ui, controller));

        egui::CentralPanel::default().show_inside(ui, |ui| {
            ui.push_id("entries_scroll", |ui| {
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| controller.show_category_content(ui, store));
            });
        });
    }
}

impl eframe::App for PrefsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.controller.is_none() {
            let delay = builtin::startup_delay(&self.store);
            let elapsed = self.launched.elapsed();
            if elapsed >= delay {
                self.create_menu();
            } else {
                ctx.request_repaint_after(delay - elapsed);
            }
        }

        let toggle_key = self.toggle_key();
        let Self {
            store,
            registry,
            controller,
            search,
            ..
        } = self;

        if let Some(controller) = controller.as_mut() {
            controller.tick(store, registry);
            if !controller.is_ready() {
                // The deferred setup runs on the next frame.
                ctx.request_repaint();
            }
            if let Some(key) = toggle_key {
                if ctx.input(|i| i.key_pressed(key)) {
                    controller.toggle_menu();
                }
            }
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(statics::APP_NAME);
            ui.label(statics::EN_BACKDROP_HINT);
            if let Some(key) = toggle_key {
                ui.horizontal(|ui| {
                    ui.label(statics::EN_BACKDROP_KEY);
                    ui.label(RichText::new(key.name()).strong());
                });
            }
        });

        let Some(controller) = controller.as_mut() else {
            return;
        };
        if !controller.show_menu() {
            return;
        }

        let title = RichText::new(format!("{} v{}", statics::APP_NAME, statics::APP_VERSION))
            .strong()
            .color(statics::COLOR_TITLE);
        let mut open = true;
        egui::Window::new(title)
            .id(egui::Id::new("preferences_panel"))
            .open(&mut open)
            .collapsible(false)
            .default_size(statics::PANEL_SIZE)
            .show(ctx, |ui| Self::render_panel(ui, controller, store, search));
        if !open {
            controller.on_close_panel_clicked();
        }

        // Keep polling for outside changes while the panel is up.
        ctx.request_repaint_after(Duration::from_millis(500));
    }
}
