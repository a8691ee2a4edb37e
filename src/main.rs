// main.rs
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod error;
mod size;
mod utils;

use app::App;
use eframe::NativeOptions;

fn main() {
    let native_options = NativeOptions {
        initial_window_size: Some(egui::Vec2::new(720.0, 520.0)),
        resizable: true,
        ..Default::default()
    };
    eframe::run_native(
        "JPEG Size Compressor",
        native_options,
        Box::new(|_cc| Box::new(App::default())),
    );
}
