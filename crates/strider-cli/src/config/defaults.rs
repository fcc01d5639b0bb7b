use strider::engine::config::{DEFAULT_FRAMES_MAX, DEFAULT_STEPS_PER_FRAME};

/// Values the CLI falls back to when neither the config file nor the command line sets them.
pub struct DefaultsConfig {
    pub n_frames: usize,
    pub n_steps_per_frame: usize,
    pub n_frames_max: usize,
    pub spring_constant: f64,
    pub box_edge: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            n_frames: 100,
            n_steps_per_frame: DEFAULT_STEPS_PER_FRAME,
            n_frames_max: DEFAULT_FRAMES_MAX,
            spring_constant: 1000.0,
            box_edge: 3.0,
        }
    }
}
