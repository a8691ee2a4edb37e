// utils.rs
use parking_lot::Mutex;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Appends timestamped lines to the shared log shown in the window.
#[derive(Clone)]
pub struct Logger {
    sender: mpsc::Sender<String>,
}

impl Logger {
    pub fn new(log_messages: Arc<Mutex<Vec<String>>>) -> Self {
        let (sender, receiver) = mpsc::channel::<String>();

        thread::spawn(move || {
            for message in receiver {
                log_messages.lock().push(message);
            }
        });

        Logger { sender }
    }

    pub fn log(&self, message: impl AsRef<str>) {
        let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
        let line = format!("[{}] {}", timestamp, message.as_ref());
        // The collector only goes away with the window.
        let _ = self.sender.send(line);
    }
}

pub fn measure_time<F, T>(f: F) -> (T, Duration)
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let result = f();
    (result, start.elapsed())
}

pub fn get_memory_usage() -> String {
    match sys_info::mem_info() {
        Ok(mem_info) => format!(
            "Memory: total {} MB, available {} MB",
            mem_info.total / 1024,
            mem_info.avail / 1024
        ),
        Err(e) => format!("Unable to get memory info: {}", e),
    }
}
