use crate::frame::Frame;
use image::{GrayImage, Luma};
use tracing::{debug, info};

/// Per-pixel classification produced by the background model.
/// 255 = foreground, 127 = shadow, 0 = background.
pub type ForegroundMask = GrayImage;

pub const MASK_FOREGROUND: u8 = 255;
pub const MASK_SHADOW: u8 = 127;
pub const MASK_BACKGROUND: u8 = 0;

const MAX_MODES: usize = 5;
const BACKGROUND_RATIO: f32 = 0.9;
const VAR_THRESHOLD_GEN: f32 = 9.0;
const VAR_INIT: f32 = 15.0;
const VAR_MIN: f32 = 4.0;
const VAR_MAX: f32 = 75.0;
const COMPLEXITY_REDUCTION: f32 = 0.05;
const SHADOW_TAU: f32 = 0.5;

#[derive(Debug, Clone, Copy, Default)]
struct GaussianMode {
    weight: f32,
    mean: f32,
    variance: f32,
}

/// Adaptive Gaussian mixture background model over grayscale frames.
///
/// Every pixel keeps up to five weighted Gaussian modes ordered by weight.
/// Each call to [`BackgroundModel::apply`] classifies the frame against the
/// current estimate and then folds the frame into it.
pub struct BackgroundModel {
    history: u32,
    var_threshold: f32,
    detect_shadows: bool,
    width: u32,
    height: u32,
    modes: Vec<GaussianMode>,
    mode_counts: Vec<u8>,
    frames_seen: u64,
}

impl BackgroundModel {
    /// Create an empty model. `var_threshold` is the squared Mahalanobis
    /// distance under which a pixel matches a background mode.
    pub fn new(history: u32, var_threshold: f32, detect_shadows: bool) -> Self {
        info!(
            "Creating background model (history: {}, var_threshold: {}, shadows: {})",
            history, var_threshold, detect_shadows
        );

        Self {
            history: history.max(1),
            var_threshold,
            detect_shadows,
            width: 0,
            height: 0,
            modes: Vec::new(),
            mode_counts: Vec::new(),
            frames_seen: 0,
        }
    }

    /// Model configured from a motion sensitivity in [0, 1]
    pub fn from_config(config: &crate::config::MotionConfig) -> Self {
        Self::new(config.history, config.var_threshold(), true)
    }

    pub fn var_threshold(&self) -> f32 {
        self.var_threshold
    }

    pub fn history(&self) -> u32 {
        self.history
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    pub fn is_initialized(&self) -> bool {
        self.frames_seen > 0
    }

    /// Classify a frame and update the model with it
    pub fn apply(&mut self, frame: &Frame) -> ForegroundMask {
        self.apply_gray(&frame.to_gray())
    }

    /// Classify a grayscale image and update the model with it
    pub fn apply_gray(&mut self, gray: &GrayImage) -> ForegroundMask {
        let (width, height) = gray.dimensions();

        if self.frames_seen == 0 || (width, height) != (self.width, self.height) {
            self.seed(gray);
            return GrayImage::new(width, height);
        }

        self.frames_seen += 1;
        let learning_rate =
            1.0 / (2 * self.frames_seen).min(self.history as u64).max(1) as f32;

        let mut mask = GrayImage::new(width, height);
        for (index, (pixel, out)) in gray.pixels().zip(mask.pixels_mut()).enumerate() {
            let start = index * MAX_MODES;
            let modes = &mut self.modes[start..start + MAX_MODES];
            let count = &mut self.mode_counts[index];
            let value = pixel[0] as f32;

            let background = update_pixel(modes, count, value, learning_rate, self.var_threshold);

            *out = Luma([if background {
                MASK_BACKGROUND
            } else if self.detect_shadows
                && is_shadow(&modes[..*count as usize], value, self.var_threshold)
            {
                MASK_SHADOW
            } else {
                MASK_FOREGROUND
            }]);
        }

        mask
    }

    /// Reset the model so the next frame seeds it again
    pub fn reset(&mut self) {
        self.frames_seen = 0;
        self.modes.clear();
        self.mode_counts.clear();
    }

    fn seed(&mut self, gray: &GrayImage) {
        let (width, height) = gray.dimensions();
        if self.frames_seen > 0 {
            debug!(
                "Frame size changed from {}x{} to {}x{}; re-seeding background model",
                self.width, self.height, width, height
            );
        } else {
            info!("Initializing background model with first frame ({}x{})", width, height);
        }

        let pixels = (width * height) as usize;
        self.width = width;
        self.height = height;
        self.modes = vec![GaussianMode::default(); pixels * MAX_MODES];
        self.mode_counts = vec![1; pixels];
        for (index, pixel) in gray.pixels().enumerate() {
            self.modes[index * MAX_MODES] = GaussianMode {
                weight: 1.0,
                mean: pixel[0] as f32,
                variance: VAR_INIT,
            };
        }
        self.frames_seen = 1;
    }
}

/// Update one pixel's mixture with a new sample. Returns true when the sample
/// matched one of the modes that together make up the background.
fn update_pixel(
    modes: &mut [GaussianMode],
    count: &mut u8,
    value: f32,
    alpha: f32,
    var_threshold: f32,
) -> bool {
    let prune = -alpha * COMPLEXITY_REDUCTION;
    let decay = 1.0 - alpha;
    let mut n = *count as usize;

    let mut fits = false;
    let mut background = false;
    let mut cumulative_weight = 0.0f32;

    for i in 0..n {
        let mut weight = decay * modes[i].weight + prune;

        if !fits {
            let diff = modes[i].mean - value;
            let dist2 = diff * diff;
            let variance = modes[i].variance;

            if cumulative_weight < BACKGROUND_RATIO && dist2 < var_threshold * variance {
                background = true;
            }

            if dist2 < VAR_THRESHOLD_GEN * variance {
                fits = true;
                weight += alpha;
                let k = alpha / weight;
                modes[i].mean -= k * diff;
                modes[i].variance = (variance + k * (dist2 - variance)).clamp(VAR_MIN, VAR_MAX);
                modes[i].weight = weight;
                cumulative_weight += weight;

                // Processed modes before i already carry updated weights
                let mut j = i;
                while j > 0 && modes[j].weight > modes[j - 1].weight {
                    modes.swap(j, j - 1);
                    j -= 1;
                }
                continue;
            }
        }

        modes[i].weight = weight;
        cumulative_weight += weight;
    }

    // Drop modes whose weight fell below the complexity prior
    let mut kept = 0;
    for i in 0..n {
        if modes[i].weight >= -prune {
            modes[kept] = modes[i];
            kept += 1;
        }
    }
    n = kept;

    let total: f32 = modes[..n].iter().map(|m| m.weight).sum();
    if total > 0.0 {
        for mode in &mut modes[..n] {
            mode.weight /= total;
        }
    }

    if !fits {
        let slot = if n == MAX_MODES { MAX_MODES - 1 } else { n };
        if n < MAX_MODES {
            n += 1;
        }

        modes[slot] = GaussianMode {
            weight: if n == 1 { 1.0 } else { alpha },
            mean: value,
            variance: VAR_INIT,
        };
        for (i, mode) in modes[..n].iter_mut().enumerate() {
            if i != slot {
                mode.weight *= decay;
            }
        }

        let mut j = slot;
        while j > 0 && modes[j].weight > modes[j - 1].weight {
            modes.swap(j, j - 1);
            j -= 1;
        }
    }

    *count = n as u8;
    background
}

/// A sample darker than a background mode by a bounded ratio, with matching
/// chromaticity (trivially true for luma), counts as shadow.
fn is_shadow(modes: &[GaussianMode], value: f32, var_threshold: f32) -> bool {
    let mut cumulative_weight = 0.0f32;

    for mode in modes {
        let numerator = mode.mean * value;
        let denominator = mode.mean * mode.mean;
        if denominator == 0.0 {
            return false;
        }

        if numerator <= denominator && numerator >= SHADOW_TAU * denominator {
            let a = numerator / denominator;
            let diff = a * mode.mean - value;
            if diff * diff < var_threshold * mode.variance * a * a {
                return true;
            }
        }

        cumulative_weight += mode.weight;
        if cumulative_weight > BACKGROUND_RATIO {
            return false;
        }
    }

    false
}
