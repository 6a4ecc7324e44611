//! Presenter that writes each overlay as one JSON line.

use std::io::Write;

use tracing::warn;
use vision::{OverlayFrame, OverlayPresenter};

pub struct JsonLinesPresenter<W: Write> {
    writer: W,
    presented: u64,
}

impl<W: Write> JsonLinesPresenter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            presented: 0,
        }
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    fn write_frame(&mut self, frame: &OverlayFrame) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.writer, frame)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> OverlayPresenter for JsonLinesPresenter<W> {
    fn present(&mut self, frame: OverlayFrame) {
        match self.write_frame(&frame) {
            Ok(()) => self.presented += 1,
            Err(err) => warn!(frame = frame.frame_number, "failed to write overlay: {err}"),
        }
    }
}
