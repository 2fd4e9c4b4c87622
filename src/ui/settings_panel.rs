//! Settings panel shown while the application is paused

use crate::config::{ranges, RenderConfig};

/// Draws the settings window, editing `config` in place.
///
/// `framerate` is the averaged frames per second shown at the bottom.
pub fn draw(ui: &imgui::Ui, config: &mut RenderConfig, framerate: f32) {
    ui.window("Settings")
        .position([20.0, 20.0], imgui::Condition::FirstUseEver)
        .always_auto_resize(true)
        .build(|| {
            ui.text("Tessellation: ");
            let (min, max) = ranges::TESSELLATION_LEVEL;
            ui.slider("tessellation level", min, max, &mut config.tessellation_level);
            ui.checkbox("Wireframe", &mut config.wireframe);
            let (min, max) = ranges::DISPLACEMENT_FACTOR;
            ui.slider("displacement factor", min, max, &mut config.displacement_factor);
            ui.separator();

            ui.text("Ambient light: ");
            ui.color_edit3("ambient light color", &mut config.ambient_light_color);
            unit_slider(ui, "ambient light intensity", &mut config.ambient_light_intensity);
            ui.separator();

            ui.text("Light 1: ");
            let (min, max) = ranges::LIGHT_DIRECTION;
            imgui::Drag::new("light 1 direction")
                .range(min, max)
                .speed(ranges::LIGHT_DIRECTION_SPEED)
                .build_array(ui, &mut config.light_direction);
            ui.color_edit3("light 1 color", &mut config.light_color);
            unit_slider(ui, "light 1 intensity", &mut config.light_intensity);
            ui.separator();

            ui.text("Material: ");
            unit_slider(ui, "ambient occlusion mix", &mut config.ambient_occlusion_mix);
            unit_slider(ui, "normal mapping mix", &mut config.normal_mapping_mix);
            unit_slider(ui, "reflection mix", &mut config.reflection_mix);
            let (min, max) = ranges::SPECULAR_EXPONENT;
            ui.slider("specular exponent", min, max, &mut config.specular_exponent);
            ui.separator();

            ui.text(frame_time_label(framerate));
        });
}

fn unit_slider(ui: &imgui::Ui, label: &str, value: &mut f32) -> bool {
    let (min, max) = ranges::UNIT;
    ui.slider(label, min, max, value)
}

/// Average frame time and rate, as shown in the panel footer.
pub fn frame_time_label(framerate: f32) -> String {
    let frame_ms = if framerate > 0.0 {
        1000.0 / framerate
    } else {
        0.0
    };
    format!("Application average {frame_ms:.3} ms/frame ({framerate:.1} FPS)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::frames::{context_lock, test_frames};

    #[test]
    fn test_frame_time_label() {
        assert_eq!(
            frame_time_label(60.0),
            "Application average 16.667 ms/frame (60.0 FPS)"
        );
    }

    #[test]
    fn test_frame_time_label_before_first_sample() {
        assert_eq!(
            frame_time_label(0.0),
            "Application average 0.000 ms/frame (0.0 FPS)"
        );
    }

    #[test]
    fn test_panel_builds_with_defaults() {
        let _guard = context_lock();
        let mut frames = test_frames();

        let mut config = RenderConfig::default();
        draw(frames.begin(), &mut config, 60.0);
        assert!(frames.finish().is_some());

        // no interaction, nothing changes
        assert_eq!(config, RenderConfig::default());
    }
}
