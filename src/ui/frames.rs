//! ImGui context with explicit frame bookkeeping
//!
//! ImGui aborts if a frame is started while the previous one was never
//! rendered. A redraw can build the panel and then lose the surface before
//! anything is drawn, so the open frame is tracked here and closed on every
//! path.

use imgui::{Context, DrawData, FontConfig, FontSource, Io, Ui};
use std::time::Instant;

pub struct UiFrames {
    context: Context,
    last_tick: Option<Instant>,
    frame_open: bool,
}

impl UiFrames {
    /// Creates a context with the default font at `font_size` pixels and no
    /// ini persistence.
    pub fn new(font_size: f32) -> Self {
        let mut context = Context::create();
        context.set_ini_filename(None);
        context.fonts().add_font(&[FontSource::DefaultFontData {
            config: Some(FontConfig {
                oversample_h: 1,
                pixel_snap_h: true,
                size_pixels: font_size,
                ..Default::default()
            }),
        }]);

        Self {
            context,
            last_tick: None,
            frame_open: false,
        }
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    pub fn io(&self) -> &Io {
        self.context.io()
    }

    /// Records the time since the previous tick as ImGui's frame delta.
    ///
    /// Called once per rendered frame, paused or not, so the averaged rate
    /// is current when the panel opens.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub fn tick_at(&mut self, now: Instant) {
        if let Some(last) = self.last_tick {
            let delta = now.saturating_duration_since(last);
            if !delta.is_zero() {
                self.context.io_mut().update_delta_time(delta);
            }
        }
        self.last_tick = Some(now);
    }

    /// Starts a frame, first closing one that was built but never rendered.
    pub fn begin(&mut self) -> &mut Ui {
        if self.frame_open {
            log::debug!("Discarding an unrendered UI frame");
            self.context.render();
        }
        self.frame_open = true;
        self.context.frame()
    }

    /// Ends the open frame and returns its draw lists.
    pub fn finish(&mut self) -> Option<&DrawData> {
        if !self.frame_open {
            return None;
        }
        self.frame_open = false;
        Some(self.context.render())
    }

    /// Ends the open frame without drawing it.
    pub fn discard(&mut self) {
        if self.finish().is_some() {
            log::debug!("UI frame dropped with the scene frame");
        }
    }

    pub fn is_frame_open(&self) -> bool {
        self.frame_open
    }
}

/// Serializes tests that create an ImGui context; only one may exist per
/// process.
#[cfg(test)]
pub(crate) fn context_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
pub(crate) fn test_frames() -> UiFrames {
    let mut frames = UiFrames::new(13.0);
    let io = frames.context_mut().io_mut();
    io.display_size = [1280.0, 720.0];
    frames.context_mut().fonts().build_rgba32_texture();
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::ui::settings_panel;
    use std::time::Duration;

    #[test]
    fn test_dropped_scene_frame_closes_ui_frame() {
        let _guard = context_lock();
        let mut frames = test_frames();
        let mut config = RenderConfig::default();

        // surface lost after the panel was built
        settings_panel::draw(frames.begin(), &mut config, 60.0);
        assert!(frames.is_frame_open());
        frames.discard();
        assert!(!frames.is_frame_open());

        settings_panel::draw(frames.begin(), &mut config, 60.0);
        assert!(frames.finish().is_some());
        assert!(frames.finish().is_none());
    }

    #[test]
    fn test_begin_closes_an_unrendered_frame() {
        let _guard = context_lock();
        let mut frames = test_frames();
        let mut config = RenderConfig::default();

        settings_panel::draw(frames.begin(), &mut config, 60.0);
        settings_panel::draw(frames.begin(), &mut config, 60.0);
        assert!(frames.finish().is_some());
        assert!(!frames.is_frame_open());
    }

    #[test]
    fn test_discard_without_frame_is_noop() {
        let _guard = context_lock();
        let mut frames = test_frames();
        frames.discard();
        assert!(frames.finish().is_none());
    }

    #[test]
    fn test_tick_tracks_last_frame_delta() {
        let _guard = context_lock();
        let mut frames = test_frames();
        let start = Instant::now();

        // long unpaused stretch, then one short frame before the panel opens
        frames.tick_at(start);
        frames.tick_at(start + Duration::from_secs(5));
        frames.tick_at(start + Duration::from_millis(5016));

        assert!((frames.io().delta_time - 0.016).abs() < 1e-4);
    }

    #[test]
    fn test_first_tick_keeps_default_delta() {
        let _guard = context_lock();
        let mut frames = test_frames();
        let before = frames.io().delta_time;
        frames.tick_at(Instant::now());
        assert_eq!(frames.io().delta_time, before);
    }
}
