use super::background::ForegroundMask;
use crate::config::MotionConfig;
use image::Luma;
use imageproc::{
    contrast::threshold,
    distance_transform::Norm,
    morphology::dilate,
    region_labelling::{connected_components, Connectivity},
};
use serde::Serialize;
use tracing::{debug, trace};

/// Mask values above this are definite foreground; shadow gray falls below it
const FOREGROUND_CUTOFF: u8 = 244;
const DILATE_ITERATIONS: usize = 2;

/// Bounding box and pixel area of one connected foreground region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MotionRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub area: u32,
}

/// Result of classifying one foreground mask
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MotionVerdict {
    pub motion_detected: bool,
    pub regions: Vec<MotionRegion>,
}

impl MotionVerdict {
    pub fn total_area(&self) -> u64 {
        self.regions.iter().map(|r| r.area as u64).sum()
    }
}

/// Turns a foreground mask into a motion verdict plus annotated regions
#[derive(Debug, Clone)]
pub struct MotionClassifier {
    min_area: u32,
}

impl MotionClassifier {
    pub fn new(min_area: u32) -> Self {
        Self { min_area }
    }

    pub fn from_config(config: &MotionConfig) -> Self {
        Self::new(config.min_area)
    }

    pub fn min_area(&self) -> u32 {
        self.min_area
    }

    /// Binarize, dilate, label and filter regions by area
    pub fn classify(&self, mask: &ForegroundMask) -> MotionVerdict {
        let mut binary = threshold(mask, FOREGROUND_CUTOFF);
        for _ in 0..DILATE_ITERATIONS {
            binary = dilate(&binary, Norm::LInf, 1);
        }

        let labels = connected_components(&binary, Connectivity::Eight, Luma([0u8]));
        let candidates = collect_regions(&labels);
        let candidate_count = candidates.len();

        let regions: Vec<MotionRegion> = candidates
            .into_iter()
            .filter(|region| {
                let keep = region.area > self.min_area;
                if !keep {
                    trace!(
                        "Discarding region at ({}, {}) with area {} <= {}",
                        region.x,
                        region.y,
                        region.area,
                        self.min_area
                    );
                }
                keep
            })
            .collect();

        if !regions.is_empty() {
            debug!(
                "Motion regions: {} of {} candidates above {} px",
                regions.len(),
                candidate_count,
                self.min_area
            );
        }

        MotionVerdict {
            motion_detected: !regions.is_empty(),
            regions,
        }
    }
}

#[derive(Clone, Copy)]
struct RegionBounds {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    area: u32,
}

fn collect_regions(labels: &image::ImageBuffer<Luma<u32>, Vec<u32>>) -> Vec<MotionRegion> {
    let mut bounds: Vec<Option<RegionBounds>> = Vec::new();

    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue;
        }
        if bounds.len() < label {
            bounds.resize(label, None);
        }

        let entry = &mut bounds[label - 1];
        match entry {
            Some(b) => {
                b.min_x = b.min_x.min(x);
                b.min_y = b.min_y.min(y);
                b.max_x = b.max_x.max(x);
                b.max_y = b.max_y.max(y);
                b.area += 1;
            }
            None => {
                *entry = Some(RegionBounds {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                    area: 1,
                });
            }
        }
    }

    bounds
        .into_iter()
        .flatten()
        .map(|b| MotionRegion {
            x: b.min_x,
            y: b.min_y,
            width: b.max_x - b.min_x + 1,
            height: b.max_y - b.min_y + 1,
            area: b.area,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::background::{MASK_FOREGROUND, MASK_SHADOW};
    use image::GrayImage;

    fn mask_with_blocks(blocks: &[(u32, u32, u32, u32, u8)]) -> ForegroundMask {
        let mut mask = GrayImage::new(200, 200);
        for &(x0, y0, w, h, value) in blocks {
            for y in y0..y0 + h {
                for x in x0..x0 + w {
                    mask.put_pixel(x, y, Luma([value]));
                }
            }
        }
        mask
    }

    #[test]
    fn test_empty_mask_has_no_motion() {
        let classifier = MotionClassifier::new(1200);
        let verdict = classifier.classify(&GrayImage::new(64, 48));
        assert!(!verdict.motion_detected);
        assert!(verdict.regions.is_empty());
    }

    #[test]
    fn test_dilation_grows_region_by_two_pixels_each_side() {
        let classifier = MotionClassifier::new(0);
        let verdict = classifier.classify(&mask_with_blocks(&[(20, 20, 26, 36, MASK_FOREGROUND)]));

        assert_eq!(verdict.regions.len(), 1);
        let region = verdict.regions[0];
        assert_eq!((region.x, region.y), (18, 18));
        assert_eq!((region.width, region.height), (30, 40));
        assert_eq!(region.area, 1200);
    }

    #[test]
    fn test_area_equal_to_minimum_is_excluded() {
        // 26x36 dilates to exactly 30x40 = 1200 px
        let mask = mask_with_blocks(&[(20, 20, 26, 36, MASK_FOREGROUND)]);

        let verdict = MotionClassifier::new(1200).classify(&mask);
        assert!(!verdict.motion_detected);

        let verdict = MotionClassifier::new(1199).classify(&mask);
        assert!(verdict.motion_detected);
        assert_eq!(verdict.regions[0].area, 1200);
    }

    #[test]
    fn test_shadow_values_are_dropped() {
        let mask = mask_with_blocks(&[(20, 20, 80, 80, MASK_SHADOW)]);
        let verdict = MotionClassifier::new(100).classify(&mask);
        assert!(!verdict.motion_detected);
    }

    #[test]
    fn test_all_qualifying_regions_are_reported() {
        let mask = mask_with_blocks(&[
            (10, 10, 50, 50, MASK_FOREGROUND),
            (120, 120, 50, 50, MASK_FOREGROUND),
            (100, 10, 4, 4, MASK_FOREGROUND),
        ]);
        let verdict = MotionClassifier::new(1200).classify(&mask);

        assert!(verdict.motion_detected);
        assert_eq!(verdict.regions.len(), 2);
        assert!(verdict.regions.iter().all(|r| r.area == 54 * 54));
        assert_eq!(verdict.total_area(), 2 * 54 * 54);
    }

    #[test]
    fn test_nearby_fragments_merge_after_dilation() {
        // Two 30x40 blocks three pixels apart become one region
        let mask = mask_with_blocks(&[
            (20, 20, 30, 40, MASK_FOREGROUND),
            (53, 20, 30, 40, MASK_FOREGROUND),
        ]);
        let verdict = MotionClassifier::new(0).classify(&mask);
        assert_eq!(verdict.regions.len(), 1);
        assert_eq!(verdict.regions[0].width, 67);
    }
}
