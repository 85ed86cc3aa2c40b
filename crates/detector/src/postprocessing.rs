use serde::Serialize;

pub struct TransformParams {
    pub orig_width: u32,
    pub orig_height: u32,
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

/// Axis-aligned box in original image pixel coordinates (corner format).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_id: u16,
}

pub struct PostProcessor {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

impl PostProcessor {
    pub fn new(confidence_threshold: f32, iou_threshold: f32) -> Self {
        Self {
            confidence_threshold,
            iou_threshold,
        }
    }

    /// Parse detections from the raw prediction tensor.
    ///
    /// Expects `[1, 4 + num_classes, num_anchors]` where rows 0-3 are boxes in
    /// cxcywh format (pixels in model input space) and the remaining rows are
    /// per-class scores (already sigmoided). Applies confidence filtering, the
    /// inverse letterbox transform, and per-class non-maximum suppression.
    pub fn parse_detections(
        &self,
        predictions: &ndarray::ArrayViewD<f32>,
        transform: &TransformParams,
    ) -> anyhow::Result<Vec<Detection>> {
        let shape = predictions.shape();
        if shape.len() != 3 || shape[0] != 1 || shape[1] <= 4 {
            anyhow::bail!(
                "unexpected prediction tensor shape {:?}, expected [1, 4 + num_classes, num_anchors]",
                shape
            );
        }

        let num_classes = shape[1] - 4;
        let num_anchors = shape[2];

        let mut candidates = Vec::new();

        for i in 0..num_anchors {
            // Argmax over class scores for this anchor
            let mut confidence = f32::NEG_INFINITY;
            let mut class_idx = 0usize;
            for c in 0..num_classes {
                let score = predictions[[0, 4 + c, i]];
                if score > confidence {
                    confidence = score;
                    class_idx = c;
                }
            }

            if confidence < self.confidence_threshold {
                continue;
            }

            let cx = predictions[[0, 0, i]];
            let cy = predictions[[0, 1, i]];
            let w = predictions[[0, 2, i]];
            let h = predictions[[0, 3, i]];

            let (x1_input, y1_input, x2_input, y2_input) = cxcywh_to_xyxy(cx, cy, w, h);

            // Undo the letterbox transform and clamp to the original image
            let x1 = ((x1_input - transform.offset_x) / transform.scale)
                .max(0.0)
                .min(transform.orig_width as f32);
            let y1 = ((y1_input - transform.offset_y) / transform.scale)
                .max(0.0)
                .min(transform.orig_height as f32);
            let x2 = ((x2_input - transform.offset_x) / transform.scale)
                .max(0.0)
                .min(transform.orig_width as f32);
            let y2 = ((y2_input - transform.offset_y) / transform.scale)
                .max(0.0)
                .min(transform.orig_height as f32);

            candidates.push(Detection {
                bbox: BoundingBox { x1, y1, x2, y2 },
                confidence,
                class_id: class_idx as u16,
            });
        }

        Ok(self.non_max_suppression(candidates))
    }

    /// Greedy per-class NMS, highest confidence first.
    fn non_max_suppression(&self, mut candidates: Vec<Detection>) -> Vec<Detection> {
        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut kept: Vec<Detection> = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let suppressed = kept.iter().any(|k| {
                k.class_id == candidate.class_id
                    && k.bbox.iou(&candidate.bbox) > self.iou_threshold
            });
            if !suppressed {
                kept.push(candidate);
            }
        }

        kept
    }
}

/// Convert bounding box from center-width-height format to corner format
#[inline]
fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
    let x1 = cx - w / 2.0;
    let y1 = cy - h / 2.0;
    let x2 = cx + w / 2.0;
    let y2 = cy + h / 2.0;
    (x1, y1, x2, y2)
}
