// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Filtering geometry for a single filter pass

/// Integer (x, y) pair used for sizes, offsets and strides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point2 {
    pub x: usize,
    pub y: usize,
}

impl Point2 {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Same value on both axes
    pub const fn splat(v: usize) -> Self {
        Self { x: v, y: v }
    }
}

/// Left / top half of a filter extent: even sizes split evenly,
/// odd sizes leave the left half one smaller than the right.
#[inline]
pub fn left_half(size: usize) -> usize {
    size / 2
}

/// `base + delta` if it lands inside `0..len`.
///
/// Neighbor lookups on a layer grid use this so off-grid neighbors read as absent.
#[inline]
pub fn offset_index(base: usize, delta: isize, len: usize) -> Option<usize> {
    base.checked_add_signed(delta).filter(|&i| i < len)
}

/// Geometry of one filtering pass over a padded raster.
///
/// `border` is auto-raised to `filter_right` whenever the filter changes so that every
/// sampled pixel lies inside the padded raster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Geom {
    /// Size of the padded input raster
    pub input: Point2,
    /// Output grid size (derived by [`Geom::set_size`])
    pub output: Point2,
    /// Starting border into the raster, always `>= filter_right`
    pub border: Point2,
    /// Stride between output cells, in input pixels
    pub spacing: Point2,
    /// Full filter extent
    pub filter_size: Point2,
    /// Left / top part of the filter
    pub filter_left: Point2,
    /// Right / bottom part of the filter (`filter_size - filter_left`)
    pub filter_right: Point2,
}

impl Geom {
    pub fn new(border: Point2, spacing: Point2, filter_size: Point2) -> Self {
        let mut geom = Self::default();
        geom.set(border, spacing, filter_size);
        geom
    }

    /// Set the basic parameters and refresh the filter split
    pub fn set(&mut self, border: Point2, spacing: Point2, filter_size: Point2) {
        self.border = border;
        self.spacing = spacing;
        self.filter_size = filter_size;
        self.update_filter();
    }

    /// Recompute the filter halves and raise (never lower) the border to `filter_right`
    pub fn update_filter(&mut self) {
        self.filter_left = Point2::new(
            left_half(self.filter_size.x),
            left_half(self.filter_size.y),
        );
        self.filter_right = Point2::new(
            self.filter_size.x - self.filter_left.x,
            self.filter_size.y - self.filter_left.y,
        );
        self.border.x = self.border.x.max(self.filter_right.x);
        self.border.y = self.border.y.max(self.filter_right.y);
    }

    /// Store the input size and derive `output = (input - 2 * border) / spacing`.
    ///
    /// An input smaller than twice the border, or a zero spacing, yields an empty output.
    pub fn set_size(&mut self, input: Point2) {
        self.input = input;
        let out_axis = |inp: usize, border: usize, spacing: usize| {
            inp.saturating_sub(2 * border).checked_div(spacing).unwrap_or(0)
        };
        self.output = Point2::new(
            out_axis(input.x, self.border.x, self.spacing.x),
            out_axis(input.y, self.border.y, self.spacing.y),
        );
    }

    /// First raster pixel sampled by output cell (0, 0)
    #[inline]
    pub fn input_start(&self) -> Point2 {
        Point2::new(
            self.border.x - self.filter_left.x,
            self.border.y - self.filter_left.y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_filter_split() {
        let geom = Geom::new(Point2::splat(0), Point2::splat(1), Point2::new(6, 5));
        assert_eq!(geom.filter_left, Point2::new(3, 2));
        assert_eq!(geom.filter_right, Point2::new(3, 3));
    }

    #[test]
    fn test_border_raised_not_lowered() {
        let geom = Geom::new(Point2::new(1, 9), Point2::splat(1), Point2::splat(5));
        assert_eq!(geom.border, Point2::new(3, 9));
    }

    #[test]
    fn test_output_size() {
        // V1 simple-cell settings: 12px filter, stride 4, 128px image padded by 6
        let mut geom = Geom::new(Point2::splat(0), Point2::splat(4), Point2::splat(12));
        geom.set_size(Point2::splat(140));
        assert_eq!(geom.border, Point2::splat(6));
        assert_eq!(geom.output, Point2::splat(32));
    }

    #[test]
    fn test_output_floors_and_saturates() {
        let mut geom = Geom::new(Point2::splat(2), Point2::new(3, 2), Point2::splat(3));
        geom.set_size(Point2::new(15, 15));
        assert_eq!(geom.output, Point2::new(3, 5));

        geom.set_size(Point2::new(3, 3));
        assert_eq!(geom.output, Point2::new(0, 0));
    }

    #[test]
    fn test_zero_spacing_gives_empty_output() {
        let mut geom = Geom::new(Point2::splat(2), Point2::new(0, 1), Point2::splat(3));
        geom.set_size(Point2::splat(10));
        assert_eq!(geom.output, Point2::new(0, 6));
    }

    #[test]
    fn test_offset_index_bounds() {
        assert_eq!(offset_index(0, -1, 4), None);
        assert_eq!(offset_index(3, 1, 4), None);
        assert_eq!(offset_index(2, -1, 4), Some(1));
        assert_eq!(offset_index(2, 0, 4), Some(2));
    }

    proptest! {
        #[test]
        fn prop_border_covers_filter_right(
            fx in 0usize..64, fy in 0usize..64, bx in 0usize..64, by in 0usize..64,
        ) {
            let geom = Geom::new(Point2::new(bx, by), Point2::splat(1), Point2::new(fx, fy));
            prop_assert!(geom.border.x >= fx - fx / 2);
            prop_assert!(geom.border.y >= fy - fy / 2);
            prop_assert!(geom.border.x >= bx);
            prop_assert!(geom.border.y >= by);
            prop_assert_eq!(geom.filter_left.x + geom.filter_right.x, fx);
        }
    }
}
