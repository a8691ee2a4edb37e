// file_dialogs.rs
use rfd::FileDialog;
use std::io;
use std::path::{Path, PathBuf};

pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpeg", "jpg", "png", "gif"];

pub fn select_image() -> Option<PathBuf> {
    FileDialog::new()
        .add_filter("Image files", &IMAGE_EXTENSIONS)
        .pick_file()
}

/// Opens the directory holding `path` in the system file manager.
pub fn open_containing_folder(path: &Path) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    open::that(dir)
}
