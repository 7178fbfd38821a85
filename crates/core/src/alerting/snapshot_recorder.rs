use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use image::Rgb;

use crate::shared::constants::SNAPSHOT_LOG_HEADER;
use crate::shared::frame::Frame;
use crate::shared::imaging::crop;
use crate::shared::label_font::LabelFont;
use crate::shared::region::Region;
use crate::video::domain::image_writer::ImageWriter;

const NAME_COLOR: Rgb<u8> = Rgb([127, 255, 0]);

/// Saves evidence images of newly recognized people and appends each one
/// to a CSV log (`Timestamp,Name,Filename`).
///
/// Every failure is logged and swallowed; recording never interrupts the
/// frame loop.
pub struct SnapshotRecorder {
    dir: PathBuf,
    log_file: PathBuf,
    padding: f64,
    writer: Box<dyn ImageWriter>,
    font: LabelFont,
}

impl SnapshotRecorder {
    pub fn new(
        dir: PathBuf,
        log_file: PathBuf,
        padding: f64,
        writer: Box<dyn ImageWriter>,
        font: LabelFont,
    ) -> Self {
        Self {
            dir,
            log_file,
            padding,
            writer,
            font,
        }
    }

    /// Crops the padded face from the clean color frame, stamps the name on
    /// it and saves it. Returns the image path when the image was written.
    pub fn record(&self, frame: &Frame, face: &Region, name: &str) -> Option<PathBuf> {
        self.record_at(frame, face, name, Local::now())
    }

    fn record_at(
        &self,
        frame: &Frame,
        face: &Region,
        name: &str,
        now: DateTime<Local>,
    ) -> Option<PathBuf> {
        let region = snapshot_region(face, self.padding, frame.width(), frame.height());
        let cropped = crop(frame, &region)?;

        let mut image = cropped.to_rgb_image();
        self.font.draw(&mut image, 5, 5, name, NAME_COLOR);

        let path = self.dir.join(format!(
            "{}_{}.png",
            file_stem(name),
            now.format("%Y%m%d_%H%M%S_%3f")
        ));
        if let Err(e) = self
            .writer
            .write(&path, &Frame::from_rgb(image), None)
        {
            log::warn!("Failed to save snapshot {}: {e}", path.display());
            return None;
        }

        let line = format!(
            "{},{},{}",
            now.format("%Y-%m-%d %H:%M:%S"),
            name,
            path.display()
        );
        if let Err(e) = append_log_line(&self.log_file, &line) {
            log::warn!(
                "Failed to append to snapshot log {}: {e}",
                self.log_file.display()
            );
        }
        log::debug!("Saved snapshot {}", path.display());
        Some(path)
    }
}

/// The face box grown by `padding` of its size on every side and clamped to
/// the frame. Falls back to the bare face box when clamping leaves nothing,
/// and to the whole frame when even that lies outside.
pub fn snapshot_region(face: &Region, padding: f64, width: u32, height: u32) -> Region {
    let padded = face.padded(padding).clip_to(width, height);
    if !padded.is_empty() {
        return padded;
    }
    let bare = face.clip_to(width, height);
    if !bare.is_empty() {
        return bare;
    }
    Region::frame_bounds(width, height)
}

/// Keeps names usable as file name components.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

fn append_log_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let is_new = !path.exists();
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if is_new {
        writeln!(file, "{SNAPSHOT_LOG_HEADER}")?;
    }
    writeln!(file, "{line}")
}
