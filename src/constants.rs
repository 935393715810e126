// Background subtractor defaults
pub const HISTORY: usize = 500;
pub const VAR_THRESHOLD: f64 = 4.0 * 4.0;
pub const DETECT_SHADOWS: bool = true;
pub const N_MIXTURES: usize = 5;
pub const MAX_MIXTURES: usize = 255;
pub const BACKGROUND_RATIO: f64 = 0.9;
pub const VAR_THRESHOLD_GEN: f64 = 3.0 * 3.0;
pub const VAR_INIT: f64 = 15.0;
pub const VAR_MIN: f64 = 4.0;
pub const VAR_MAX: f64 = 5.0 * VAR_INIT;
pub const COMPLEXITY_REDUCTION_THRESHOLD: f64 = 0.05;
pub const SHADOW_VALUE: u8 = 127;
pub const SHADOW_THRESHOLD: f64 = 0.5;

// Mask values
pub const FOREGROUND: u8 = 255;
pub const BACKGROUND: u8 = 0;

// Array printing
pub const LINE_WIDTH: usize = 75;
pub const FLOAT_PRECISION: usize = 8;
pub const SUMMARY_THRESHOLD: usize = 1000;
pub const EDGE_ITEMS: usize = 3;

// Shape of the sample 16-bit, three channel matrix
pub const SAMPLE_ROWS: usize = 240;
pub const SAMPLE_COLS: usize = 320;
pub const SAMPLE_CHANNELS: usize = 3;
