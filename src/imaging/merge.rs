//! Pairwise merge reduction: stack a group of images into one composite.
//!
//! A group enters as a list of [`MergeNode`]s, each carrying the count of
//! source images already folded into it. The reduction repeatedly merges the
//! two lightest nodes until one remains, driven by an explicit min-heap
//! keyed by `(weight, insertion sequence)` — equal weights merge in
//! insertion order, and there is no recursion regardless of group size.
//!
//! A pairwise merge normalizes both operands to landscape orientation,
//! scales them to a shared width, and stacks them vertically. The stacked
//! result is re-normalized with a rotation direction that alternates every
//! two merges, which keeps long reductions from drifting toward ever more
//! extreme aspect ratios in one direction.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use image::imageops::FilterType;
use image::{imageops, DynamicImage, GenericImageView, ImageBuffer, Rgb, RgbImage};
use log::debug;
use thiserror::Error;

/// Maximum aspect-ratio difference between two merge operands.
///
/// Operands are decorated composites that were padded to a shared target
/// ratio upstream; a larger difference means the grouping stage fed this
/// merge images it never normalized.
const ASPECT_TOLERANCE: f64 = 1e-5;

const STACK_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("aspect ratios differ beyond tolerance: {0} vs {1} — group was not normalized before merging")]
    AspectRatioMismatch(f64, f64),
    #[error("resize target needs exactly one of width or height")]
    AmbiguousResizeTarget,
}

/// An image plus the count of source images folded into it.
#[derive(Debug)]
pub struct MergeNode {
    pub image: DynamicImage,
    pub weight: u32,
}

impl MergeNode {
    /// Wrap a single source image (weight 1).
    pub fn new(image: DynamicImage) -> Self {
        Self { image, weight: 1 }
    }

    pub fn width(&self) -> u32 {
        self.image.dimensions().0
    }

    pub fn height(&self) -> u32 {
        self.image.dimensions().1
    }

    pub fn aspect_ratio(&self) -> f64 {
        let (w, h) = self.image.dimensions();
        w as f64 / h as f64
    }

    /// Rotate into landscape orientation if necessary.
    fn ensure_landscape(&mut self, rotate_ccw: bool) {
        if self.aspect_ratio() < 1.0 {
            self.image = if rotate_ccw {
                self.image.rotate270()
            } else {
                self.image.rotate90()
            };
        }
    }

    /// Scale to the given width *or* height, preserving aspect ratio.
    fn scale_to_target(&mut self, width: Option<u32>, height: Option<u32>) -> Result<(), MergeError> {
        let (prev_w, prev_h) = self.image.dimensions();
        let (new_w, new_h) = match (width, height) {
            (Some(_), Some(_)) | (None, None) => return Err(MergeError::AmbiguousResizeTarget),
            (Some(w), None) => {
                let factor = w as f64 / prev_w as f64;
                (w, (prev_h as f64 * factor).round() as u32)
            }
            (None, Some(h)) => {
                let factor = h as f64 / prev_h as f64;
                ((prev_w as f64 * factor).round() as u32, h)
            }
        };
        if (new_w, new_h) != (prev_w, prev_h) {
            self.image = self
                .image
                .resize_exact(new_w.max(1), new_h.max(1), FilterType::Lanczos3);
        }
        Ok(())
    }
}

/// Rotation direction for re-normalizing a merged result.
///
/// Alternates every two merges: weights 2 and 3 rotate clockwise, 4 and 5
/// counter-clockwise, and so on.
fn rotate_ccw_for_weight(weight: u32) -> bool {
    (weight / 2) % 2 == 0
}

/// Heap entry ordered by `(weight, seq)` so that equal weights pop in
/// insertion order.
struct PendingMerge {
    weight: u32,
    seq: u64,
    node: MergeNode,
}

impl PartialEq for PendingMerge {
    fn eq(&self, other: &Self) -> bool {
        (self.weight, self.seq) == (other.weight, other.seq)
    }
}

impl Eq for PendingMerge {}

impl PartialOrd for PendingMerge {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingMerge {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.weight, self.seq).cmp(&(other.weight, other.seq))
    }
}

/// Reduce a group of nodes into a single node.
///
/// An empty input yields `None`; a single node is returned unchanged.
/// Intermediate images are dropped as soon as they are folded into a merged
/// canvas, so at most the current group's composites are alive at once.
pub fn merge_group(nodes: Vec<MergeNode>) -> Result<Option<MergeNode>, MergeError> {
    let mut heap: BinaryHeap<Reverse<PendingMerge>> = BinaryHeap::with_capacity(nodes.len());
    let mut seq = 0u64;
    for node in nodes {
        heap.push(Reverse(PendingMerge { weight: node.weight, seq, node }));
        seq += 1;
    }

    while heap.len() > 1 {
        let (Some(Reverse(a)), Some(Reverse(b))) = (heap.pop(), heap.pop()) else {
            break;
        };
        let merged = merge_pair(a.node, b.node)?;
        debug!(
            "merged pair into {}x{} node of weight {}",
            merged.width(),
            merged.height(),
            merged.weight
        );
        heap.push(Reverse(PendingMerge { weight: merged.weight, seq, node: merged }));
        seq += 1;
    }

    Ok(heap.pop().map(|e| e.0.node))
}

/// Merge two nodes into one by stacking vertically at a shared width.
fn merge_pair(mut a: MergeNode, mut b: MergeNode) -> Result<MergeNode, MergeError> {
    a.ensure_landscape(true);
    b.ensure_landscape(true);

    let (ratio_a, ratio_b) = (a.aspect_ratio(), b.aspect_ratio());
    if (ratio_a - ratio_b).abs() >= ASPECT_TOLERANCE {
        return Err(MergeError::AspectRatioMismatch(ratio_a, ratio_b));
    }

    let shared_width = a.width().max(b.width());
    a.scale_to_target(Some(shared_width), None)?;
    b.scale_to_target(Some(shared_width), None)?;

    let mut canvas: RgbImage = ImageBuffer::from_pixel(
        shared_width,
        a.height() + b.height(),
        STACK_BACKGROUND,
    );
    imageops::overlay(&mut canvas, &a.image.to_rgb8(), 0, 0);
    imageops::overlay(&mut canvas, &b.image.to_rgb8(), 0, a.height() as i64);

    let weight = a.weight + b.weight;
    let mut merged = MergeNode {
        image: DynamicImage::ImageRgb8(canvas),
        weight,
    };
    merged.ensure_landscape(rotate_ccw_for_weight(weight));
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, color: Rgb<u8>) -> MergeNode {
        MergeNode::new(DynamicImage::ImageRgb8(ImageBuffer::from_pixel(
            width, height, color,
        )))
    }

    const RED: Rgb<u8> = Rgb([220, 40, 40]);
    const BLUE: Rgb<u8> = Rgb([40, 40, 220]);
    const GREEN: Rgb<u8> = Rgb([40, 220, 40]);

    #[test]
    fn empty_group_yields_no_result() {
        assert!(merge_group(Vec::new()).unwrap().is_none());
    }

    #[test]
    fn single_node_is_returned_unchanged() {
        // A portrait single node must not be rotated or rescaled.
        let merged = merge_group(vec![solid(200, 300, RED)]).unwrap().unwrap();
        assert_eq!(merged.weight, 1);
        assert_eq!((merged.width(), merged.height()), (200, 300));
    }

    #[test]
    fn pair_merge_sums_weights() {
        let a = MergeNode { image: solid(300, 200, RED).image, weight: 3 };
        let b = MergeNode { image: solid(300, 200, BLUE).image, weight: 2 };
        let merged = merge_group(vec![a, b]).unwrap().unwrap();
        assert_eq!(merged.weight, 5);
    }

    #[test]
    fn unit_weight_group_conserves_total_weight() {
        let nodes: Vec<MergeNode> = (0..6).map(|_| solid(300, 200, GREEN)).collect();
        let merged = merge_group(nodes).unwrap().unwrap();
        assert_eq!(merged.weight, 6);
    }

    #[test]
    fn rotation_direction_alternates_every_two_merges() {
        assert!(!rotate_ccw_for_weight(2));
        assert!(!rotate_ccw_for_weight(3));
        assert!(rotate_ccw_for_weight(4));
        assert!(rotate_ccw_for_weight(5));
        assert!(!rotate_ccw_for_weight(6));
        assert!(!rotate_ccw_for_weight(7));
        assert!(rotate_ccw_for_weight(8));
        assert!(rotate_ccw_for_weight(9));
    }

    #[test]
    fn pair_merge_stacks_then_rotates_clockwise_at_weight_two() {
        // Two 300x200 operands stack into 300x400 (portrait), which a
        // weight-2 merge rotates clockwise: the first operand (top of the
        // stack) ends up on the right side.
        let merged = merge_group(vec![solid(300, 200, RED), solid(300, 200, BLUE)])
            .unwrap()
            .unwrap();
        assert_eq!((merged.width(), merged.height()), (400, 300));

        let rgb = merged.image.to_rgb8();
        assert_eq!(*rgb.get_pixel(399, 0), RED, "first operand on the right");
        assert_eq!(*rgb.get_pixel(0, 0), BLUE, "second operand on the left");
    }

    #[test]
    fn lightest_nodes_merge_first() {
        // Weights 2, 1, 1: the two unit nodes merge first, then the result
        // (weight 2) meets the original weight-2 node. On equal weights the
        // earlier-inserted node pops first, so the original ends up as the
        // top operand of the final stack.
        let heavy = MergeNode { image: solid(400, 300, RED).image, weight: 2 };
        let merged = merge_group(vec![heavy, solid(300, 200, BLUE), solid(300, 200, GREEN)])
            .unwrap()
            .unwrap();
        assert_eq!(merged.weight, 4);

        // blue+green stack to 300x400, rotate clockwise to 400x300; the
        // final merge stacks red on top at width 400, giving 400x600,
        // rotated counter-clockwise (weight 4) to 600x400. After a
        // counter-clockwise rotation the top of the stack lands on the left.
        assert_eq!((merged.width(), merged.height()), (600, 400));
        let rgb = merged.image.to_rgb8();
        assert_eq!(*rgb.get_pixel(0, 0), RED, "heavy node was the first operand");
    }

    #[test]
    fn mismatched_aspect_ratios_are_rejected() {
        let err = merge_group(vec![solid(300, 200, RED), solid(400, 200, BLUE)]).unwrap_err();
        assert!(matches!(err, MergeError::AspectRatioMismatch(..)));
    }

    #[test]
    fn portrait_operands_are_normalized_before_comparison() {
        // 200x300 rotates to 300x200 and then matches its partner.
        let merged = merge_group(vec![solid(200, 300, RED), solid(300, 200, BLUE)])
            .unwrap()
            .unwrap();
        assert_eq!(merged.weight, 2);
    }

    #[test]
    fn operands_scale_to_the_larger_width() {
        let merged = merge_group(vec![solid(300, 200, RED), solid(600, 400, BLUE)])
            .unwrap()
            .unwrap();
        // Stack is 600x800, rotated clockwise at weight 2.
        assert_eq!((merged.width(), merged.height()), (800, 600));
    }

    #[test]
    fn scale_to_target_requires_exactly_one_dimension() {
        let mut node = solid(300, 200, RED);
        assert!(matches!(
            node.scale_to_target(None, None),
            Err(MergeError::AmbiguousResizeTarget)
        ));
        assert!(matches!(
            node.scale_to_target(Some(600), Some(400)),
            Err(MergeError::AmbiguousResizeTarget)
        ));
    }

    #[test]
    fn scale_to_target_preserves_aspect_ratio() {
        let mut node = solid(300, 200, RED);
        node.scale_to_target(Some(600), None).unwrap();
        assert_eq!((node.width(), node.height()), (600, 400));

        let mut node = solid(300, 200, BLUE);
        node.scale_to_target(None, Some(100)).unwrap();
        assert_eq!((node.width(), node.height()), (150, 100));
    }
}
