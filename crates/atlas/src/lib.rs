//! 2D packing of square baked-texture regions into a shared atlas, so that
//! per-entity data (reflection probes, baked lighting tiles) can be stored
//! contiguously and addressed through a single sampler.

use thiserror::Error;

/// Maximum number of regions one packer instance can lay out in a single
/// call. Scratch storage is sized for this many entries.
pub const MAX_REGIONS: usize = 32;

/// One region to place in the atlas. Identity is the index in the slice
/// handed to the packer: `size` is read-only input, `(x, y)` is written back
/// by the packer.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct AtlasRegion {
    pub size: u32,
    pub x: u32,
    pub y: u32,
}

impl AtlasRegion {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            x: 0,
            y: 0,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AtlasError {
    #[error("atlas packer capacity exceeded: {requested} regions requested, capacity is {capacity}")]
    CapacityExceeded {
        requested: usize,
        capacity: usize,
    },
}

/// A breakpoint on the skyline: content left of `x` reaches `height`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Breakpoint {
    x: u32,
    height: u32,
}

/// Packs up to [`MAX_REGIONS`] square regions into a bounded square atlas.
///
/// Scratch buffers (sizes, sort order, skyline) are reused across calls on
/// the same instance, so a packer must not be shared between threads; give
/// each concurrent caller its own instance. Dropping the packer releases the
/// scratch storage.
///
/// Neither variant validates that the atlas is large enough for the input
/// set; that is the caller's responsibility.
#[derive(Debug)]
pub struct AtlasPacker {
    sizes: [u32; MAX_REGIONS],
    order: [usize; MAX_REGIONS],
    skyline: Vec<Breakpoint>,
}

impl Default for AtlasPacker {
    fn default() -> Self {
        Self::new()
    }
}

impl AtlasPacker {
    pub fn new() -> Self {
        Self {
            sizes: [0; MAX_REGIONS],
            order: [0; MAX_REGIONS],
            skyline: Vec::with_capacity(MAX_REGIONS),
        }
    }

    /// Place every region with skyline packing, writing `(x, y)` back into
    /// the slice in place, addressed by original index.
    ///
    /// Regions are placed in descending size order along a pen cursor; the
    /// skyline tracks the irregular top edge of placed content so that rows
    /// step down onto earlier, larger items instead of starting flat.
    /// Output x is scaled by `width_multiplier` for non-square footprints;
    /// output y is unscaled.
    pub fn pack(
        &mut self,
        regions: &mut [AtlasRegion],
        atlas_size: u32,
        width_multiplier: u32,
    ) -> Result<(), AtlasError> {
        let count = self.prepare(regions)?;
        self.skyline.clear();

        let mut pen_x = 0u32;
        let mut pen_y = 0u32;
        for &index in &self.order[..count] {
            let size = self.sizes[index];
            regions[index].x = pen_x * width_multiplier;
            regions[index].y = pen_y;
            pen_x += size;

            let height = pen_y + size;
            match self.skyline.last_mut() {
                // Flat run: extend the previous breakpoint instead of
                // growing the skyline.
                Some(last) if last.height == height => last.x = pen_x,
                _ => self.skyline.push(Breakpoint {
                    x: pen_x,
                    height,
                }),
            }

            if pen_x >= atlas_size {
                // The row is full; continue on top of the item that closed
                // it, starting from the remaining skyline edge.
                self.skyline.pop();
                pen_y += size;
                pen_x = self.skyline.last().map_or(0, |breakpoint| breakpoint.x);
            }
        }
        Ok(())
    }

    /// Shelf-packing variant of [`pack`](Self::pack): rows are flat and a
    /// region that would cross the right edge starts a new row. Lower
    /// packing density, used where compaction quality does not matter.
    pub fn simple_pack(
        &mut self,
        regions: &mut [AtlasRegion],
        atlas_size: u32,
        width_multiplier: u32,
    ) -> Result<(), AtlasError> {
        let count = self.prepare(regions)?;

        let mut pen_x = 0u32;
        let mut pen_y = 0u32;
        let mut row_height = 0u32;
        for &index in &self.order[..count] {
            let size = self.sizes[index];
            if pen_x + size > atlas_size {
                pen_x = 0;
                pen_y += row_height;
                row_height = 0;
            }
            regions[index].x = pen_x * width_multiplier;
            regions[index].y = pen_y;
            pen_x += size;
            row_height = row_height.max(size);
        }
        Ok(())
    }

    /// Copy sizes and identity indices into scratch storage and sort the
    /// indices by descending size. Insertion sort: the inputs are small and
    /// usually near-sorted by caller importance, and equal sizes must keep
    /// their original relative order.
    fn prepare(&mut self, regions: &[AtlasRegion]) -> Result<usize, AtlasError> {
        let count = regions.len();
        if count > MAX_REGIONS {
            return Err(AtlasError::CapacityExceeded {
                requested: count,
                capacity: MAX_REGIONS,
            });
        }

        for (index, region) in regions.iter().enumerate() {
            self.sizes[index] = region.size;
            self.order[index] = index;
        }

        for i in 1..count {
            let key = self.order[i];
            let key_size = self.sizes[key];
            let mut j = i;
            while j > 0 && self.sizes[self.order[j - 1]] < key_size {
                self.order[j] = self.order[j - 1];
                j -= 1;
            }
            self.order[j] = key;
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::{AtlasError, AtlasPacker, AtlasRegion, MAX_REGIONS};

    fn regions(sizes: &[u32]) -> Vec<AtlasRegion> {
        sizes.iter().copied().map(AtlasRegion::new).collect()
    }

    fn positions(regions: &[AtlasRegion]) -> Vec<(u32, u32)> {
        regions.iter().map(|r| (r.x, r.y)).collect()
    }

    fn assert_no_overlap(regions: &[AtlasRegion]) {
        for (i, a) in regions.iter().enumerate() {
            for b in regions.iter().skip(i + 1) {
                let disjoint_x = a.x + a.size <= b.x || b.x + b.size <= a.x;
                let disjoint_y = a.y + a.size <= b.y || b.y + b.size <= a.y;
                assert!(
                    disjoint_x || disjoint_y,
                    "regions {a:?} and {b:?} overlap"
                );
            }
        }
    }

    #[test]
    fn simple_pack_reference_layout() {
        let mut packer = AtlasPacker::new();
        let mut input = regions(&[10, 6, 6, 4]);
        packer.simple_pack(&mut input, 16, 1).unwrap();
        assert_eq!(positions(&input), vec![(0, 0), (10, 0), (0, 10), (6, 10)]);
        assert_no_overlap(&input);
    }

    #[test]
    fn simple_pack_equal_sizes_keep_input_order() {
        let mut packer = AtlasPacker::new();
        let mut input = regions(&[8, 8, 8, 8]);
        packer.simple_pack(&mut input, 16, 1).unwrap();
        assert_eq!(positions(&input), vec![(0, 0), (8, 0), (0, 8), (8, 8)]);
        assert_no_overlap(&input);
    }

    #[test]
    fn simple_pack_contains_and_separates_mixed_sizes() {
        let mut packer = AtlasPacker::new();
        let mut input = regions(&[4, 12, 4, 8, 2, 2, 6]);
        packer.simple_pack(&mut input, 16, 1).unwrap();
        for region in &input {
            assert!(region.x + region.size <= 16, "region {region:?} exceeds atlas");
        }
        assert_no_overlap(&input);
    }

    #[test]
    fn pack_steps_onto_the_skyline() {
        let mut packer = AtlasPacker::new();
        let mut input = regions(&[8, 8, 4, 4, 4, 2, 2]);
        packer.pack(&mut input, 16, 1).unwrap();
        assert_eq!(
            positions(&input),
            vec![
                (0, 0),
                (8, 0),
                (0, 8),
                (4, 8),
                (8, 8),
                (12, 8),
                (14, 8),
            ]
        );
        assert_no_overlap(&input);
    }

    #[test]
    fn pack_scales_x_by_width_multiplier_only() {
        let mut packer = AtlasPacker::new();
        let mut scaled = regions(&[8, 8, 8, 8]);
        let mut unscaled = regions(&[8, 8, 8, 8]);
        packer.pack(&mut scaled, 16, 6).unwrap();
        packer.pack(&mut unscaled, 16, 1).unwrap();
        for (scaled, unscaled) in scaled.iter().zip(&unscaled) {
            assert_eq!(scaled.x, unscaled.x * 6);
            assert_eq!(scaled.y, unscaled.y);
        }
    }

    #[test]
    fn sort_is_stable_for_equal_sizes() {
        // Equal-size regions must be placed in input order: with a full
        // first row, index 2 lands on row two before index 3.
        let mut packer = AtlasPacker::new();
        let mut input = regions(&[6, 6, 6, 6]);
        packer.simple_pack(&mut input, 12, 1).unwrap();
        assert_eq!(positions(&input), vec![(0, 0), (6, 0), (0, 6), (6, 6)]);
    }

    #[test]
    fn descending_sort_places_largest_first() {
        let mut packer = AtlasPacker::new();
        let mut input = regions(&[2, 10, 4]);
        packer.simple_pack(&mut input, 16, 1).unwrap();
        // Largest first: the 10 sits at the origin even though it was the
        // second input.
        assert_eq!(input[1].x, 0);
        assert_eq!(input[1].y, 0);
        assert_no_overlap(&input);
    }

    #[test]
    fn capacity_overflow_is_reported_and_leaves_input_untouched() {
        let mut packer = AtlasPacker::new();
        let mut input = regions(&vec![4; MAX_REGIONS + 1]);
        let before = input.clone();

        let result = packer.pack(&mut input, 1024, 1);
        assert_eq!(
            result,
            Err(AtlasError::CapacityExceeded {
                requested: MAX_REGIONS + 1,
                capacity: MAX_REGIONS,
            })
        );
        assert_eq!(input, before);

        let result = packer.simple_pack(&mut input, 1024, 1);
        assert!(result.is_err());
        assert_eq!(input, before);
    }

    #[test]
    fn full_capacity_packs() {
        let mut packer = AtlasPacker::new();
        let mut input = regions(&vec![8; MAX_REGIONS]);
        packer.simple_pack(&mut input, 64, 1).unwrap();
        assert_no_overlap(&input);
        // 8 per row at width 64: four full rows.
        assert_eq!(input.last().unwrap().y, 24);
    }

    #[test]
    fn scratch_reuse_across_calls() {
        let mut packer = AtlasPacker::new();
        let mut first = regions(&[8, 8, 8, 8]);
        packer.pack(&mut first, 16, 1).unwrap();
        // A second, smaller batch must not see leftovers from the first.
        let mut second = regions(&[4, 4]);
        packer.pack(&mut second, 16, 1).unwrap();
        assert_eq!(positions(&second), vec![(0, 0), (4, 0)]);
    }
}
