//! Adaptive Gaussian mixture background model (Zivkovic's MOG2).
//!
//! Every pixel keeps up to `n_mixtures` Gaussians, each with a weight, a mean
//! per channel and a single variance shared by the channels. Modes are kept
//! sorted by weight; the heaviest modes whose weights add up to
//! `background_ratio` describe the background.

use crate::array::{Element, NdArray};
use crate::constants::{
    BACKGROUND, BACKGROUND_RATIO, COMPLEXITY_REDUCTION_THRESHOLD, DETECT_SHADOWS, FOREGROUND,
    HISTORY, MAX_MIXTURES, N_MIXTURES, SHADOW_THRESHOLD, SHADOW_VALUE, VAR_INIT, VAR_MAX, VAR_MIN,
    VAR_THRESHOLD, VAR_THRESHOLD_GEN,
};
use crate::error::{Error, Result};
use log::debug;
use serde::Deserialize;
use std::cmp::min;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Mog2Params {
    /// Frames that make up the automatic learning rate window
    pub history: usize,
    /// Squared Mahalanobis distance below which a pixel is background
    pub var_threshold: f64,
    pub detect_shadows: bool,
    pub n_mixtures: usize,
    pub background_ratio: f64,
    /// Squared Mahalanobis distance below which a pixel updates a mode
    pub var_threshold_gen: f64,
    pub var_init: f64,
    pub var_min: f64,
    pub var_max: f64,
    pub complexity_reduction_threshold: f64,
    pub shadow_value: u8,
    /// Darkest ratio to the background that still counts as shadow
    pub shadow_threshold: f64,
}

impl Default for Mog2Params {
    fn default() -> Self {
        Mog2Params {
            history: HISTORY,
            var_threshold: VAR_THRESHOLD,
            detect_shadows: DETECT_SHADOWS,
            n_mixtures: N_MIXTURES,
            background_ratio: BACKGROUND_RATIO,
            var_threshold_gen: VAR_THRESHOLD_GEN,
            var_init: VAR_INIT,
            var_min: VAR_MIN,
            var_max: VAR_MAX,
            complexity_reduction_threshold: COMPLEXITY_REDUCTION_THRESHOLD,
            shadow_value: SHADOW_VALUE,
            shadow_threshold: SHADOW_THRESHOLD,
        }
    }
}

impl Mog2Params {
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        // Read JSON file
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let params: Mog2Params = serde_json::from_reader(reader)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(Error::InvalidParams(msg.to_string()));

        if self.history == 0 {
            return invalid("history must be positive");
        }
        if self.n_mixtures == 0 || self.n_mixtures > MAX_MIXTURES {
            return invalid("n_mixtures must lie in [1, 255]");
        }
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.var_init) || !positive(self.var_threshold) || !positive(self.var_threshold_gen) {
            return invalid("var_init, var_threshold and var_threshold_gen must be finite and positive");
        }
        if !(self.var_min > 0.0) || !self.var_max.is_finite() || self.var_min > self.var_max {
            return invalid("variance bounds must satisfy 0 < var_min <= var_max");
        }
        if !(0.0..=1.0).contains(&self.shadow_threshold) {
            return invalid("shadow_threshold must lie in [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.background_ratio) {
            return invalid("background_ratio must lie in [0, 1]");
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Gaussian {
    weight: f64,
    variance: f64,
}

/// Swaps modes `i` and `i - 1` together with their means.
fn swap_down(modes: &mut [Gaussian], means: &mut [f64], channels: usize, i: usize) {
    modes.swap(i - 1, i);
    for c in 0..channels {
        means.swap((i - 1) * channels + c, i * channels + c);
    }
}

fn detect_shadow(params: &Mog2Params, data: &[f64], modes: &[Gaussian], means: &[f64], nmodes: usize) -> bool {
    let channels = data.len();
    let mut total_weight = 0.0;

    for (mode, gaussian) in modes.iter().enumerate().take(nmodes) {
        let mean = &means[mode * channels..(mode + 1) * channels];
        let numerator: f64 = data.iter().zip(mean).map(|(d, m)| d * m).sum();
        let denominator: f64 = mean.iter().map(|m| m * m).sum();

        if denominator == 0.0 {
            return false;
        }

        // The pixel has to be a darker version of the mode
        if numerator <= denominator && numerator >= params.shadow_threshold * denominator {
            let a = numerator / denominator;
            let dist2a: f64 = data.iter().zip(mean).map(|(d, m)| (a * m - d).powi(2)).sum();
            if dist2a < params.var_threshold * gaussian.variance * a * a {
                return true;
            }
        }

        total_weight += gaussian.weight;
        if total_weight > params.background_ratio {
            return false;
        }
    }

    false
}

/// Updates the mixture of one pixel and classifies it.
fn update_pixel(
    params: &Mog2Params,
    data: &[f64],
    modes: &mut [Gaussian],
    means: &mut [f64],
    nmodes: &mut usize,
    alpha: f64,
) -> u8 {
    let channels = data.len();
    let alpha1 = 1.0 - alpha;
    let prune = -alpha * params.complexity_reduction_threshold;

    let mut fits = false;
    let mut background = false;
    let mut total_weight = 0.0;

    let mut mode = 0;
    while mode < *nmodes {
        let mut weight = alpha1 * modes[mode].weight + prune;
        let mut swap_count = 0;

        if !fits {
            let var = modes[mode].variance;
            let offset = mode * channels;
            let dist2: f64 = (0..channels).map(|c| (means[offset + c] - data[c]).powi(2)).sum();

            if total_weight < params.background_ratio && dist2 < params.var_threshold * var {
                background = true;
            }

            if dist2 < params.var_threshold_gen * var {
                fits = true;

                weight += alpha;
                let k = alpha / weight;
                for c in 0..channels {
                    means[offset + c] -= k * (means[offset + c] - data[c]);
                }

                let var_new = var + k * (dist2 - var);
                modes[mode].variance = var_new.max(params.var_min).min(params.var_max);

                // Bubble the updated mode towards the heavier end
                let mut i = mode;
                while i > 0 && weight >= modes[i - 1].weight {
                    swap_down(modes, means, channels, i);
                    swap_count += 1;
                    i -= 1;
                }
            }
        }

        if weight < -prune {
            weight = 0.0;
            *nmodes -= 1;
        }

        modes[mode - swap_count].weight = weight;
        total_weight += weight;
        mode += 1;
    }

    if total_weight > 0.0 {
        for gaussian in modes.iter_mut().take(*nmodes) {
            gaussian.weight /= total_weight;
        }
    }

    // Nothing matched: replace the weakest mode or add a new one
    if !fits && alpha > 0.0 {
        let new_mode = if *nmodes == modes.len() {
            modes.len() - 1
        } else {
            *nmodes += 1;
            *nmodes - 1
        };

        if *nmodes == 1 {
            modes[new_mode].weight = 1.0;
        } else {
            modes[new_mode].weight = alpha;
            for gaussian in modes.iter_mut().take(*nmodes - 1) {
                gaussian.weight *= alpha1;
            }
        }

        means[new_mode * channels..(new_mode + 1) * channels].copy_from_slice(data);
        modes[new_mode].variance = params.var_init;

        let mut i = *nmodes - 1;
        while i > 0 && alpha >= modes[i - 1].weight {
            swap_down(modes, means, channels, i);
            i -= 1;
        }
    }

    if background {
        BACKGROUND
    } else if params.detect_shadows && detect_shadow(params, data, modes, means, *nmodes) {
        params.shadow_value
    } else {
        FOREGROUND
    }
}

pub struct BackgroundSubtractorMog2 {
    params: Mog2Params,
    /// `(rows, cols, channels)` of the frames the model was built for
    shape: Option<(usize, usize, usize)>,
    nframes: usize,
    modes: Vec<Gaussian>,
    means: Vec<f64>,
    modes_used: Vec<usize>,
}

impl BackgroundSubtractorMog2 {
    pub fn new(params: Mog2Params) -> Result<Self> {
        params.validate()?;
        Ok(BackgroundSubtractorMog2 {
            params,
            shape: None,
            nframes: 0,
            modes: vec![],
            means: vec![],
            modes_used: vec![],
        })
    }

    pub fn params(&self) -> &Mog2Params {
        &self.params
    }

    pub fn frames_seen(&self) -> usize {
        self.nframes
    }

    pub fn reset(&mut self) {
        self.shape = None;
        self.nframes = 0;
        self.modes.clear();
        self.means.clear();
        self.modes_used.clear();
    }

    fn initialize(&mut self, shape: (usize, usize, usize)) -> Result<()> {
        let (rows, cols, channels) = shape;
        let too_large = || Error::InvalidParams(format!("{}x{}x{} frame is too large for the model", rows, cols, channels));
        let pixels = rows.checked_mul(cols).ok_or_else(too_large)?;
        let n_modes = pixels.checked_mul(self.params.n_mixtures).ok_or_else(too_large)?;
        let n_means = n_modes.checked_mul(channels).ok_or_else(too_large)?;

        debug!("initialising background model for {}x{} frames with {} channel(s)", rows, cols, channels);

        self.shape = Some(shape);
        self.nframes = 0;
        self.modes = vec![Gaussian::default(); n_modes];
        self.means = vec![0.0; n_means];
        self.modes_used = vec![0; pixels];
        Ok(())
    }

    /// Feeds one frame to the model and returns the foreground mask: 0 for
    /// background, `shadow_value` for shadows, 255 for foreground.
    ///
    /// A negative or missing `learning_rate` picks one from the number of
    /// frames seen so far. A frame with a different shape restarts the model.
    pub fn apply<T: Element>(&mut self, frame: &NdArray<T>, learning_rate: Option<f64>) -> Result<NdArray<u8>> {
        let shape = frame.image_shape()?;
        let (rows, cols, channels) = shape;
        if frame.is_empty() {
            return Err(Error::EmptyFrame);
        }

        if self.shape != Some(shape) {
            self.initialize(shape)?;
        }

        self.nframes += 1;
        let alpha = match learning_rate {
            Some(rate) if rate >= 0.0 && self.nframes > 1 => rate,
            _ => 1.0 / min(2 * self.nframes, self.params.history) as f64,
        };

        let n_mixtures = self.params.n_mixtures;
        let mut mask = Vec::with_capacity(rows * cols);
        let mut data = vec![0.0; channels];

        for (idx, pixel) in frame.as_slice().chunks(channels).enumerate() {
            for (d, &v) in data.iter_mut().zip(pixel) {
                *d = v.to_f64();
            }

            let modes = &mut self.modes[idx * n_mixtures..(idx + 1) * n_mixtures];
            let means = &mut self.means[idx * n_mixtures * channels..(idx + 1) * n_mixtures * channels];
            let nmodes = &mut self.modes_used[idx];
            mask.push(update_pixel(&self.params, &data, modes, means, nmodes, alpha));
        }

        Ok(NdArray::from_parts(vec![rows, cols], mask))
    }

    /// Weighted mean of the background modes of every pixel.
    pub fn background_image(&self) -> Result<NdArray<f64>> {
        let (rows, cols, channels) = self.shape.ok_or(Error::NotInitialized)?;
        let n_mixtures = self.params.n_mixtures;
        let mut image = Vec::with_capacity(rows * cols * channels);
        let mut mean_val = vec![0.0; channels];

        for (idx, &nmodes) in self.modes_used.iter().enumerate() {
            let modes = &self.modes[idx * n_mixtures..(idx + 1) * n_mixtures];
            let means = &self.means[idx * n_mixtures * channels..(idx + 1) * n_mixtures * channels];
            let mut total_weight = 0.0;
            mean_val.iter_mut().for_each(|v| *v = 0.0);

            for (mode, gaussian) in modes.iter().enumerate().take(nmodes) {
                for c in 0..channels {
                    mean_val[c] += gaussian.weight * means[mode * channels + c];
                }
                total_weight += gaussian.weight;
                if total_weight > self.params.background_ratio {
                    break;
                }
            }

            let inv_weight = if total_weight.abs() > f64::EPSILON { 1.0 / total_weight } else { 0.0 };
            image.extend(mean_val.iter().map(|v| v * inv_weight));
        }

        let shape = if channels == 1 { vec![rows, cols] } else { vec![rows, cols, channels] };
        Ok(NdArray::from_parts(shape, image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_frame(rows: usize, cols: usize, value: f64) -> NdArray<f64> {
        NdArray::from_shape_vec(vec![rows, cols], vec![value; rows * cols]).unwrap()
    }

    fn warmed_up(value: f64, frames: usize) -> BackgroundSubtractorMog2 {
        let mut subtractor = BackgroundSubtractorMog2::new(Mog2Params::default()).unwrap();
        let frame = constant_frame(2, 2, value);
        for _ in 0..frames {
            subtractor.apply(&frame, None).unwrap();
        }
        subtractor
    }

    #[test]
    fn first_frame_matches_its_own_mode() {
        let mut subtractor = BackgroundSubtractorMog2::new(Mog2Params::default()).unwrap();
        let frame = NdArray::from_rows(&[[1.0, 2.0, 3.0]]).unwrap();
        let mask = subtractor.apply(&frame, None).unwrap();
        assert_eq!(mask.shape(), &[1, 3]);
        assert_eq!(mask.as_slice(), &[SHADOW_VALUE; 3]);
        assert_eq!(subtractor.frames_seen(), 1);
    }

    #[test]
    fn static_scene_becomes_background() {
        let mut subtractor = warmed_up(100.0, 1);
        let mask = subtractor.apply(&constant_frame(2, 2, 100.0), None).unwrap();
        assert!(mask.as_slice().iter().all(|&v| v == BACKGROUND));
    }

    #[test]
    fn sudden_change_is_foreground() {
        let mut subtractor = warmed_up(100.0, 20);
        let mask = subtractor.apply(&constant_frame(2, 2, 250.0), None).unwrap();
        assert!(mask.as_slice().iter().all(|&v| v == FOREGROUND));
    }

    #[test]
    fn darker_background_is_shadow() {
        let mut subtractor = warmed_up(100.0, 20);
        let mask = subtractor.apply(&constant_frame(2, 2, 60.0), None).unwrap();
        assert!(mask.as_slice().iter().all(|&v| v == SHADOW_VALUE));
    }

    #[test]
    fn shadows_are_foreground_when_detection_is_off() {
        let params = Mog2Params { detect_shadows: false, ..Mog2Params::default() };
        let mut subtractor = BackgroundSubtractorMog2::new(params).unwrap();
        let frame = constant_frame(2, 2, 100.0);
        for _ in 0..20 {
            subtractor.apply(&frame, None).unwrap();
        }
        let mask = subtractor.apply(&constant_frame(2, 2, 60.0), None).unwrap();
        assert!(mask.as_slice().iter().all(|&v| v == FOREGROUND));
    }

    #[test]
    fn background_image_converges_to_the_scene() {
        let subtractor = warmed_up(42.0, 10);
        let background = subtractor.background_image().unwrap();
        assert_eq!(background.shape(), &[2, 2]);
        assert!(background.as_slice().iter().all(|&v| (v - 42.0).abs() < 1e-9));
    }

    #[test]
    fn colour_frames_keep_their_channels() {
        let mut subtractor = BackgroundSubtractorMog2::new(Mog2Params::default()).unwrap();
        let frame = NdArray::from_shape_vec(vec![1, 2, 3], vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0]).unwrap();
        for _ in 0..5 {
            subtractor.apply(&frame, None).unwrap();
        }
        let background = subtractor.background_image().unwrap();
        assert_eq!(background.shape(), &[1, 2, 3]);
        assert_eq!(background.as_slice(), frame.as_slice());
    }

    #[test]
    fn zero_learning_rate_freezes_the_model() {
        let mut subtractor = warmed_up(100.0, 5);
        let changed = constant_frame(2, 2, 250.0);
        for _ in 0..10 {
            let mask = subtractor.apply(&changed, Some(0.0)).unwrap();
            assert!(mask.as_slice().iter().all(|&v| v == FOREGROUND));
        }
        let background = subtractor.background_image().unwrap();
        assert!(background.as_slice().iter().all(|&v| (v - 100.0).abs() < 1e-9));
    }

    #[test]
    fn new_frame_shape_restarts_the_model() {
        let mut subtractor = warmed_up(100.0, 5);
        assert_eq!(subtractor.frames_seen(), 5);
        let mask = subtractor.apply(&constant_frame(3, 1, 100.0), None).unwrap();
        assert_eq!(mask.shape(), &[3, 1]);
        assert_eq!(subtractor.frames_seen(), 1);
    }

    #[test]
    fn rejects_frames_that_are_not_images() {
        let mut subtractor = BackgroundSubtractorMog2::new(Mog2Params::default()).unwrap();
        assert!(matches!(subtractor.apply(&NdArray::from_vec(vec![1.0]), None), Err(Error::UnsupportedDims(1))));
        assert!(matches!(subtractor.apply(&NdArray::<f64>::zeros(vec![0, 4]), None), Err(Error::EmptyFrame)));
        assert!(matches!(subtractor.background_image(), Err(Error::NotInitialized)));
    }

    #[test]
    fn params_are_validated() {
        assert!(BackgroundSubtractorMog2::new(Mog2Params { history: 0, ..Mog2Params::default() }).is_err());
        assert!(BackgroundSubtractorMog2::new(Mog2Params { n_mixtures: 0, ..Mog2Params::default() }).is_err());
        assert!(BackgroundSubtractorMog2::new(Mog2Params { var_min: 80.0, ..Mog2Params::default() }).is_err());
        assert!(BackgroundSubtractorMog2::new(Mog2Params { shadow_threshold: 1.5, ..Mog2Params::default() }).is_err());
    }

    #[test]
    fn oversized_or_degenerate_params_are_rejected() {
        let rejected = |params: Mog2Params| matches!(BackgroundSubtractorMog2::new(params), Err(Error::InvalidParams(_)));

        assert!(rejected(Mog2Params { n_mixtures: usize::MAX, ..Mog2Params::default() }));
        assert!(rejected(Mog2Params { n_mixtures: MAX_MIXTURES + 1, ..Mog2Params::default() }));
        assert!(rejected(Mog2Params { var_init: 0.0, ..Mog2Params::default() }));
        assert!(rejected(Mog2Params { var_threshold: f64::NAN, ..Mog2Params::default() }));
        assert!(rejected(Mog2Params { var_threshold_gen: -1.0, ..Mog2Params::default() }));
        assert!(rejected(Mog2Params { var_max: f64::INFINITY, ..Mog2Params::default() }));

        let mut subtractor = BackgroundSubtractorMog2::new(Mog2Params { n_mixtures: MAX_MIXTURES, ..Mog2Params::default() }).unwrap();
        let mask = subtractor.apply(&NdArray::from_rows(&[[1.0, 2.0, 3.0]]).unwrap(), None).unwrap();
        assert_eq!(mask.as_slice(), &[SHADOW_VALUE; 3]);
    }

    #[test]
    fn frames_too_large_to_index_are_rejected() {
        let mut subtractor = BackgroundSubtractorMog2::new(Mog2Params::default()).unwrap();
        assert!(matches!(subtractor.initialize((usize::MAX, 2, 1)), Err(Error::InvalidParams(_))));
        assert!(matches!(subtractor.initialize((usize::MAX / 4, 1, 1)), Err(Error::InvalidParams(_))));
    }

    #[test]
    fn params_fill_missing_keys_with_defaults() {
        let params: Mog2Params = serde_json::from_str(r#"{ "history": 50, "detect_shadows": false }"#).unwrap();
        assert_eq!(params.history, 50);
        assert!(!params.detect_shadows);
        assert_eq!(params.n_mixtures, N_MIXTURES);
        assert_eq!(params.var_max, VAR_MAX);
    }
}
