// gui.rs
use crate::app::file_dialogs;
use crate::app::{App, ConflictChoice};
use crate::size::{format_bytes, SizeUnit};
use egui::{Align2, Color32, CursorIcon, Frame, RichText, Rounding, Stroke};

const ACCENT: Color32 = Color32::from_rgb(100, 200, 250);
const MUTED: Color32 = Color32::from_rgb(200, 200, 200);

pub fn render(app: &mut App, ctx: &egui::Context) {
    let frame = Frame {
        fill: Color32::from_rgb(30, 30, 40),
        rounding: Rounding::same(10.0),
        stroke: Stroke::new(1.0, ACCENT),
        inner_margin: egui::style::Margin::same(20.0),
        ..Default::default()
    };

    let busy = app.is_busy();
    if busy {
        ctx.output().cursor_icon = CursorIcon::Wait;
    }
    let modal_open = app.error_message.is_some() || app.pending_overwrite.is_some();

    egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
        ui.set_enabled(!busy && !modal_open);

        ui.heading(RichText::new("JPEG Size Compressor").size(28.0).color(ACCENT));
        ui.add_space(20.0);

        input_row(app, ui);
        ui.add_space(10.0);
        target_row(app, ui);
        ui.add_space(10.0);

        ui.horizontal(|ui| {
            let compress = ui.add_enabled(app.compress_enabled, egui::Button::new("Compress"));
            if compress.clicked() {
                app.request_compression();
            }
            if !app.status.is_empty() {
                ui.label(RichText::new(&app.status).color(MUTED));
            }
        });

        if let Some(report) = &app.last_report {
            ui.add_space(10.0);
            ui.group(|ui| {
                ui.set_min_width(ui.available_width());
                ui.label(RichText::new("Last result").size(16.0).color(ACCENT));
                ui.label(format!("Output: {}", report.output_path.display()));
                ui.label(format!(
                    "{} -> {} (quality {}, {:.2}s)",
                    format_bytes(report.original_size as i64),
                    format_bytes(report.compressed_size as i64),
                    report.quality,
                    report.elapsed.as_secs_f32()
                ));
            });
        }

        ui.add_space(20.0);
        log_panel(app, ui);
    });

    overwrite_prompt(app, ctx);
    error_dialog(app, ctx);
}

fn input_row(app: &mut App, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        let path_text = app
            .input_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "No image selected".to_string());
        ui.add_sized([360.0, 20.0], egui::Label::new(path_text));
        if ui.button("Browse...").clicked() {
            if let Some(path) = file_dialogs::select_image() {
                app.select_input(path);
            }
        }
        if ui
            .add_enabled(app.input_path.is_some(), egui::Button::new("Open folder"))
            .clicked()
        {
            app.open_folder();
        }
    });
}

fn target_row(app: &mut App, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.label("Target size:");

        let mut value = app.target_value;
        let response = ui.add(
            egui::DragValue::new(&mut value)
                .clamp_range(0.0..=app.max_target_value())
                .speed(1.0)
                .max_decimals(2),
        );
        if response.changed() {
            app.set_target_value(value);
        }

        let mut selected = app.unit;
        egui::ComboBox::from_id_source("target_unit")
            .width(60.0)
            .selected_text(selected.label())
            .show_ui(ui, |ui| {
                for unit in SizeUnit::ALL {
                    ui.selectable_value(&mut selected, unit, unit.label());
                }
            });
        if selected != app.unit {
            app.change_unit(selected);
        }

        if let Some(label) = &app.calculated_label {
            ui.label(RichText::new(label).color(MUTED));
        }
    });
}

fn log_panel(app: &App, ui: &mut egui::Ui) {
    ui.group(|ui| {
        ui.set_min_width(ui.available_width());
        ui.label(RichText::new("Log").size(16.0).color(ACCENT));

        egui::ScrollArea::vertical()
            .max_height(160.0)
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                let logs = app.log_messages.lock();
                for line in logs.iter() {
                    if line.contains("Error") || line.contains("failed") {
                        ui.label(RichText::new(line).color(Color32::RED));
                    } else {
                        ui.label(line);
                    }
                }
            });
    });
}

fn overwrite_prompt(app: &mut App, ctx: &egui::Context) {
    let Some(job) = &app.pending_overwrite else {
        return;
    };
    let message = format!(
        "{} already exists. Overwrite it?\n\"No\" saves under a new name instead.",
        job.output_path.display()
    );

    let mut choice = None;
    egui::Window::new("Question")
        .collapsible(false)
        .resizable(false)
        .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(message);
            ui.add_space(10.0);
            ui.horizontal(|ui| {
                if ui.button("Yes").clicked() {
                    choice = Some(ConflictChoice::Overwrite);
                }
                if ui.button("No").clicked() {
                    choice = Some(ConflictChoice::Rename);
                }
                if ui.button("Cancel").clicked() {
                    choice = Some(ConflictChoice::Cancel);
                }
            });
        });

    if let Some(choice) = choice {
        app.resolve_conflict(choice);
    }
}

fn error_dialog(app: &mut App, ctx: &egui::Context) {
    let Some(message) = &app.error_message else {
        return;
    };
    let text = format!("An error occurred: {}", message);

    let mut dismissed = false;
    egui::Window::new("Error")
        .collapsible(false)
        .resizable(false)
        .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(RichText::new(text).color(Color32::LIGHT_RED));
            ui.add_space(10.0);
            if ui.button("OK").clicked() {
                dismissed = true;
            }
        });

    if dismissed {
        app.error_message = None;
    }
}
