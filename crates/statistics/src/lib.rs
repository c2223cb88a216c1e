use std::collections::HashMap;
use std::time::Instant;

use anyhow::{bail, Result};
use util::RingBuffer;

/// Number of frames of history kept per section.
const HISTORY_FRAMES: usize = 64;

#[derive(Debug, Default)]
struct Section {
    history: RingBuffer<f32, HISTORY_FRAMES>,
    accumulated_ms: f32,
    opened: Option<Instant>,
}

/// Named CPU timing sections with per-frame rolling history.
///
/// Sections are opened and closed while a frame is recorded and executed;
/// [`new_frame`](Self::new_frame) folds the accumulated times into the
/// history. A section may be opened several times per frame; the times add
/// up. Opening an already-open section, or ending the frame with a section
/// still open, is an error.
#[derive(Debug, Default)]
pub struct RendererStatistics {
    sections: HashMap<String, Section>,
    order: Vec<String>,
    frame_index: u64,
}

impl RendererStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the current frame's section times into the history and start a
    /// new frame.
    pub fn new_frame(&mut self) -> Result<()> {
        for (name, section) in &mut self.sections {
            if section.opened.is_some() {
                bail!("section '{name}' still open at end of frame");
            }
            section.history.push(section.accumulated_ms);
            section.accumulated_ms = 0.0;
        }
        self.frame_index += 1;
        Ok(())
    }

    pub fn begin_section(&mut self, name: &str) -> Result<()> {
        let section = self.section_mut(name);
        if section.opened.is_some() {
            bail!("section '{name}' is already open");
        }
        section.opened = Some(Instant::now());
        Ok(())
    }

    pub fn end_section(&mut self, name: &str) -> Result<()> {
        let Some(section) = self.sections.get_mut(name) else {
            bail!("section '{name}' was never opened");
        };
        match section.opened.take() {
            None => bail!("section '{name}' is not open"),
            Some(start) => {
                section.accumulated_ms += start.elapsed().as_secs_f32() * 1000.0;
                Ok(())
            }
        }
    }

    /// Rolling average of a section's per-frame time, in milliseconds.
    /// `None` until the section has completed at least one frame.
    pub fn average_ms(&self, name: &str) -> Option<f32> {
        let section = self.sections.get(name)?;
        if section.history.is_empty() {
            return None;
        }
        Some(section.history.iter().sum::<f32>() / section.history.len() as f32)
    }

    /// Last completed frame's time for a section, in milliseconds.
    pub fn latest_ms(&self, name: &str) -> Option<f32> {
        self.sections.get(name)?.history.latest()
    }

    /// Drop partial timings left behind by an abandoned frame, so the next
    /// `new_frame` starts clean.
    pub fn discard_open_sections(&mut self) {
        for section in self.sections.values_mut() {
            section.opened = None;
        }
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Section names in first-use order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    fn section_mut(&mut self, name: &str) -> &mut Section {
        if !self.sections.contains_key(name) {
            self.order.push(name.to_owned());
        }
        self.sections.entry(name.to_owned()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::RendererStatistics;

    #[test]
    fn sections_accumulate_into_history() {
        let mut stats = RendererStatistics::new();
        stats.begin_section("opaque").unwrap();
        stats.end_section("opaque").unwrap();
        // Reopening within the same frame adds up rather than erroring.
        stats.begin_section("opaque").unwrap();
        stats.end_section("opaque").unwrap();
        assert_eq!(stats.average_ms("opaque"), None);

        stats.new_frame().unwrap();
        assert!(stats.average_ms("opaque").is_some());
        assert!(stats.latest_ms("opaque").unwrap() >= 0.0);
        assert_eq!(stats.frame_index(), 1);
    }

    #[test]
    fn double_open_is_an_error() {
        let mut stats = RendererStatistics::new();
        stats.begin_section("sky").unwrap();
        assert!(stats.begin_section("sky").is_err());
    }

    #[test]
    fn close_without_open_is_an_error() {
        let mut stats = RendererStatistics::new();
        assert!(stats.end_section("sky").is_err());
        stats.begin_section("sky").unwrap();
        stats.end_section("sky").unwrap();
        assert!(stats.end_section("sky").is_err());
    }

    #[test]
    fn frame_end_with_open_section_is_an_error() {
        let mut stats = RendererStatistics::new();
        stats.begin_section("tonemap").unwrap();
        assert!(stats.new_frame().is_err());
    }

    #[test]
    fn names_keep_first_use_order() {
        let mut stats = RendererStatistics::new();
        for name in ["depth", "opaque", "tonemap"] {
            stats.begin_section(name).unwrap();
            stats.end_section(name).unwrap();
        }
        let names: Vec<_> = stats.section_names().collect();
        assert_eq!(names, vec!["depth", "opaque", "tonemap"]);
    }
}
