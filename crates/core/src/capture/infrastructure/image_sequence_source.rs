use std::fs;
use std::path::{Path, PathBuf};

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

/// Replays a directory of still images as a camera feed.
///
/// Files are served in file-name order, decoded to RGB with the `image`
/// crate. The frame index is the position in that order. Once every file
/// has been served the source yields `None`.
pub struct ImageSequenceSource {
    dir: PathBuf,
    paths: Vec<PathBuf>,
    cursor: usize,
    opened: bool,
}

impl ImageSequenceSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            paths: Vec::new(),
            cursor: 0,
            opened: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.opened
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn open(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let paths = list_images(&self.dir)?;
        if paths.is_empty() {
            return Err(format!("No images found in {}", self.dir.display()).into());
        }
        log::debug!("Opened {} frames from {}", paths.len(), self.dir.display());
        self.paths = paths;
        self.cursor = 0;
        self.opened = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if !self.opened {
            return Err("Frame source is not open".into());
        }
        let Some(path) = self.paths.get(self.cursor) else {
            return Ok(None);
        };
        let index = self.cursor;
        self.cursor += 1;

        let img = image::open(path)
            .map_err(|e| format!("Failed to decode {}: {e}", path.display()))?
            .into_rgb8();
        let (width, height) = img.dimensions();
        Ok(Some(Frame::new(img.into_raw(), width, height, 3, index)))
    }

    fn release(&mut self) {
        self.paths.clear();
        self.cursor = 0;
        self.opened = false;
    }
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| format!("Cannot open frame directory {}: {e}", dir.display()))?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_image(path))
        .collect();
    paths.sort();
    Ok(paths)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
