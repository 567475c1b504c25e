mod background;
mod motion;

pub use background::{
    BackgroundModel, ForegroundMask, MASK_BACKGROUND, MASK_FOREGROUND, MASK_SHADOW,
};
pub use motion::{MotionClassifier, MotionRegion, MotionVerdict};
