// app.rs
pub mod file_dialogs;
pub mod gui;
pub mod image_processing;

use crate::error::CompressError;
use crate::size::{
    self, convert_on_unit_change, estimate_target_bytes, format_bytes, SizeSpec, SizeUnit,
    DEFAULT_PERCENTAGE,
};
use crate::utils::Logger;
use eframe::egui;
use eframe::App as EframeApp;
use image_processing::CompressionJob;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

pub struct App {
    pub input_path: Option<PathBuf>,
    pub original_size: Option<u64>,
    pub target_value: f64,
    pub unit: SizeUnit,
    /// Bytes the percentage currently maps to; only meaningful in percent mode.
    pub raw_calculated_size: u64,
    /// Text next to the target size, `None` when hidden.
    pub calculated_label: Option<String>,
    pub compress_enabled: bool,
    pub status: String,
    pub error_message: Option<String>,
    pub pending_overwrite: Option<CompressionJob>,
    pub last_report: Option<CompressionReport>,
    pub log_messages: Arc<Mutex<Vec<String>>>,
    pub compression_receiver: Option<Receiver<CompressionUpdate>>,
    logger: Logger,
}

pub enum CompressionUpdate {
    Status(String),
    Finished(Result<CompressionReport, String>),
}

#[derive(Clone, Debug)]
pub struct CompressionReport {
    pub output_path: PathBuf,
    pub original_size: u64,
    pub compressed_size: u64,
    pub quality: u8,
    pub elapsed: Duration,
}

/// Answer to "the output file already exists".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictChoice {
    Overwrite,
    Rename,
    Cancel,
}

impl Default for App {
    fn default() -> Self {
        let log_messages = Arc::new(Mutex::new(Vec::new()));
        Self {
            input_path: None,
            original_size: None,
            target_value: DEFAULT_PERCENTAGE,
            unit: SizeUnit::Percent,
            raw_calculated_size: 0,
            calculated_label: None,
            compress_enabled: false,
            status: String::new(),
            error_message: None,
            pending_overwrite: None,
            last_report: None,
            logger: Logger::new(log_messages.clone()),
            log_messages,
            compression_receiver: None,
        }
    }
}

impl App {
    pub fn is_busy(&self) -> bool {
        self.compression_receiver.is_some()
    }

    pub fn target_value(&self) -> Option<f64> {
        Some(self.target_value).filter(|value| value.is_finite() && *value > 0.0)
    }

    pub fn max_target_value(&self) -> f64 {
        if self.unit.is_percent() {
            size::MAX_PERCENTAGE
        } else {
            i32::MAX as f64
        }
    }

    pub fn select_input(&mut self, path: PathBuf) {
        self.logger.log(format!("Selected {}", path.display()));
        self.input_path = Some(path);
        if let Some(len) = self.refresh_original_size() {
            self.logger.log(format!("Original size: {}", format_bytes(len as i64)));
        }
        self.recalculate();
    }

    /// Re-reads the input's length; an unreadable file disables Compress.
    fn refresh_original_size(&mut self) -> Option<u64> {
        let result = size::read_original_size(self.input_path.as_ref()?);
        match result {
            Ok(len) => {
                self.original_size = Some(len);
                self.compress_enabled = true;
            }
            Err(e) => {
                self.original_size = None;
                self.compress_enabled = false;
                self.show_error(e.to_string());
            }
        }
        self.original_size
    }

    pub fn set_target_value(&mut self, value: f64) {
        self.target_value = value;
        if self.unit.is_percent() {
            self.recalculate();
        }
    }

    pub fn change_unit(&mut self, new_unit: SizeUnit) {
        if new_unit == self.unit {
            return;
        }
        if new_unit.is_percent() {
            self.refresh_original_size();
        }
        let conversion =
            convert_on_unit_change(self.unit, new_unit, self.target_value(), self.original_size);
        self.unit = conversion.unit;
        self.target_value = conversion.value.unwrap_or(0.0);
        self.show_estimate(conversion.calculated);
    }

    /// Refreshes the estimate shown next to a percentage target.
    pub fn recalculate(&mut self) {
        if !self.target_value.is_finite() {
            return;
        }
        let estimate = estimate_target_bytes(self.target_value, self.original_size).ok();
        self.show_estimate(estimate);
    }

    fn show_estimate(&mut self, estimate: Option<u64>) {
        if !self.unit.is_percent() || self.input_path.is_none() {
            self.calculated_label = None;
            return;
        }
        match estimate {
            Some(bytes) => {
                self.raw_calculated_size = bytes;
                self.calculated_label = Some(format!("({})", format_bytes(bytes as i64)));
            }
            None => {
                self.calculated_label = Some("(???)".to_string());
                self.compress_enabled = false;
            }
        }
    }

    pub fn size_spec(&self) -> Option<SizeSpec> {
        self.target_value().map(|value| SizeSpec::new(value, self.unit))
    }

    /// Starts a job for the current selection, or parks it in
    /// `pending_overwrite` when the output file already exists.
    pub fn request_compression(&mut self) {
        match self.prepare_job() {
            Ok(job) if job.output_path.exists() => self.pending_overwrite = Some(job),
            Ok(job) => self.start_compression(job),
            Err(e) => self.show_error(e.to_string()),
        }
    }

    fn prepare_job(&self) -> Result<CompressionJob, CompressError> {
        let size_spec = self.size_spec().ok_or(CompressError::TargetSizeRequired)?;
        let input_path = self.input_path.clone().ok_or(CompressError::NoInput)?;
        let target_bytes = match size_spec {
            SizeSpec::Percentage(_) if self.original_size.is_some() => self.raw_calculated_size,
            _ => size_spec.target_bytes(self.original_size)?,
        };
        self.logger.log(format!(
            "Target extent: {}",
            size_spec.extent(self.original_size)?
        ));
        Ok(CompressionJob {
            output_path: size::output_path_for(&input_path),
            input_path,
            size_spec,
            target_bytes,
        })
    }

    pub fn resolve_conflict(&mut self, choice: ConflictChoice) {
        let Some(mut job) = self.pending_overwrite.take() else {
            return;
        };
        match choice {
            ConflictChoice::Overwrite => self.start_compression(job),
            ConflictChoice::Rename => {
                job.output_path = size::next_available_path(&job.output_path);
                self.start_compression(job);
            }
            ConflictChoice::Cancel => self.logger.log("Compression cancelled"),
        }
    }

    fn start_compression(&mut self, job: CompressionJob) {
        let (sender, receiver) = channel();
        self.compression_receiver = Some(receiver);
        self.status = "Compressing...".to_string();

        let logger = self.logger.clone();
        std::thread::spawn(move || {
            image_processing::compress_image(job, logger, sender);
        });
    }

    /// Drains worker updates; returns true when something changed.
    pub fn poll_worker(&mut self) -> bool {
        let Some(receiver) = &self.compression_receiver else {
            return false;
        };
        let mut updates = Vec::new();
        let mut disconnected = false;
        loop {
            match receiver.try_recv() {
                Ok(update) => updates.push(update),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        let changed = !updates.is_empty() || disconnected;
        let mut finished = None;
        for update in updates {
            match update {
                CompressionUpdate::Status(status) => self.status = status,
                CompressionUpdate::Finished(result) => finished = Some(result),
            }
        }
        // A panicking worker drops its sender without reporting.
        if finished.is_none() && disconnected {
            finished = Some(Err("compression worker stopped unexpectedly".to_string()));
        }

        if let Some(result) = finished {
            self.compression_receiver = None;
            match result {
                Ok(report) => {
                    self.status = format!(
                        "Done: {} -> {}",
                        format_bytes(report.original_size as i64),
                        format_bytes(report.compressed_size as i64)
                    );
                    self.last_report = Some(report);
                }
                Err(e) => {
                    self.status.clear();
                    self.show_error(e);
                }
            }
        }
        changed
    }

    pub fn open_folder(&mut self) {
        let Some(path) = self.input_path.clone() else {
            return;
        };
        if let Err(e) = file_dialogs::open_containing_folder(&path) {
            self.show_error(e.to_string());
        }
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.logger.log(format!("Error: {}", message));
        self.error_message = Some(message);
    }
}

impl EframeApp for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let changed = self.poll_worker();

        gui::render(self, ctx);

        if changed || self.is_busy() {
            ctx.request_repaint();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Instant;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "jpeg_size_compressor-app-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn wait_for_worker(app: &mut App) {
        let deadline = Instant::now() + Duration::from_secs(30);
        while app.is_busy() && Instant::now() < deadline {
            app.poll_worker();
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(!app.is_busy(), "worker did not finish");
    }

    #[test]
    fn percent_without_file_stays_hidden() {
        let mut app = App::default();
        app.change_unit(SizeUnit::KB);
        app.set_target_value(500.0);
        app.change_unit(SizeUnit::Percent);

        assert_eq!(app.unit, SizeUnit::Percent);
        assert_eq!(app.target_value, DEFAULT_PERCENTAGE);
        assert_eq!(app.calculated_label, None);
        assert!(app.error_message.is_none());
    }

    #[test]
    fn selecting_a_file_shows_estimate() {
        let dir = scratch_dir("select");
        let path = dir.join("photo.png");
        fs::write(&path, vec![0u8; 2000]).unwrap();

        let mut app = App::default();
        app.select_input(path);
        assert!(app.compress_enabled);
        assert_eq!(app.original_size, Some(2000));
        assert_eq!(app.raw_calculated_size, 1000);
        assert_eq!(app.calculated_label.as_deref(), Some("(1000B)"));

        app.set_target_value(25.0);
        assert_eq!(app.raw_calculated_size, 500);

        app.change_unit(SizeUnit::B);
        assert_eq!(app.target_value, 500.0);
        assert_eq!(app.calculated_label, None);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn zero_percent_updates_estimate() {
        let dir = scratch_dir("zero-percent");
        let path = dir.join("photo.png");
        fs::write(&path, vec![0u8; 2000]).unwrap();

        let mut app = App::default();
        app.select_input(path);
        assert_eq!(app.calculated_label.as_deref(), Some("(1000B)"));

        app.set_target_value(0.0);
        assert_eq!(app.raw_calculated_size, 0);
        assert_eq!(app.calculated_label.as_deref(), Some("(0B)"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn switching_to_percent_uses_conversion_estimate() {
        let dir = scratch_dir("to-percent");
        let path = dir.join("photo.png");
        fs::write(&path, vec![0u8; 4096]).unwrap();

        let mut app = App::default();
        app.select_input(path);
        app.change_unit(SizeUnit::KB);
        assert_eq!(app.target_value, 2.0);

        app.set_target_value(1.0);
        app.change_unit(SizeUnit::Percent);
        assert_eq!(app.target_value, 25.0);
        assert_eq!(app.raw_calculated_size, 1024);
        assert_eq!(app.calculated_label.as_deref(), Some("(1KB)"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn switching_to_percent_rereads_deleted_input() {
        let dir = scratch_dir("deleted");
        let path = dir.join("photo.png");
        fs::write(&path, vec![0u8; 2000]).unwrap();

        let mut app = App::default();
        app.select_input(path.clone());
        app.change_unit(SizeUnit::B);
        assert!(app.error_message.is_none());

        fs::remove_file(&path).unwrap();
        app.change_unit(SizeUnit::Percent);

        assert_eq!(app.original_size, None);
        assert!(app.error_message.is_some());
        assert!(!app.compress_enabled);
        assert_eq!(app.target_value, DEFAULT_PERCENTAGE);
        assert_eq!(app.calculated_label.as_deref(), Some("(???)"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unreadable_file_disables_compress() {
        let dir = scratch_dir("unreadable");
        let mut app = App::default();
        app.select_input(dir.join("gone.png"));

        assert!(!app.compress_enabled);
        assert!(app.error_message.is_some());
        assert_eq!(app.calculated_label.as_deref(), Some("(???)"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn compress_requires_target_size() {
        let mut app = App::default();
        app.set_target_value(0.0);
        app.request_compression();
        assert_eq!(
            app.error_message.as_deref(),
            Some("A target size is required.")
        );
        assert!(!app.is_busy());
    }

    #[test]
    fn existing_output_prompts_then_renames() {
        let dir = scratch_dir("conflict");
        let input = dir.join("foo.png");
        image::RgbImage::from_pixel(16, 16, image::Rgb([200, 40, 40]))
            .save(&input)
            .unwrap();
        fs::write(dir.join("foo-compressed.jpg"), b"old").unwrap();

        let mut app = App::default();
        app.select_input(input);
        app.change_unit(SizeUnit::B);
        app.set_target_value(4096.0);
        app.request_compression();

        let pending = app.pending_overwrite.as_ref().unwrap();
        assert_eq!(pending.output_path, dir.join("foo-compressed.jpg"));
        assert_eq!(pending.target_bytes, 4096);
        assert!(!app.is_busy());

        app.resolve_conflict(ConflictChoice::Rename);
        assert!(app.pending_overwrite.is_none());
        wait_for_worker(&mut app);

        let report = app.last_report.clone().unwrap();
        assert_eq!(report.output_path, dir.join("foo-compressed (1).jpg"));
        assert!(report.output_path.exists());
        assert_eq!(fs::read(dir.join("foo-compressed.jpg")).unwrap(), b"old");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn cancel_leaves_existing_output_alone() {
        let dir = scratch_dir("cancel");
        let input = dir.join("bar.png");
        fs::write(&input, vec![1u8; 64]).unwrap();
        fs::write(dir.join("bar-compressed.jpg"), b"old").unwrap();

        let mut app = App::default();
        app.select_input(input);
        app.request_compression();
        assert!(app.pending_overwrite.is_some());

        app.resolve_conflict(ConflictChoice::Cancel);
        assert!(app.pending_overwrite.is_none());
        assert!(!app.is_busy());
        assert!(!dir.join("bar-compressed (1).jpg").exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn worker_failure_surfaces_as_error() {
        let dir = scratch_dir("failure");
        let input = dir.join("broken.png");
        fs::write(&input, b"not an image").unwrap();

        let mut app = App::default();
        app.select_input(input);
        app.request_compression();
        assert!(app.is_busy());
        wait_for_worker(&mut app);

        assert!(app.error_message.is_some());
        assert!(app.last_report.is_none());
        assert!(!dir.join("broken-compressed.jpg").exists());

        fs::remove_dir_all(&dir).unwrap();
    }
}
