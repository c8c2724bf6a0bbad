//! Static layout and aspect-ratio catalogs.
//!
//! A [`Layout`] is an ordered list of [`Cell`]s in normalized frame units:
//! `(0, 0)` is the top-left corner of the collage and `(1, 1)` the
//! bottom-right. Cell `N` is paired with image `N` in display order.
//!
//! Cells may overlap. The `overlap` preset stacks a smaller card on top of a
//! full-bleed background photo; later cells draw over earlier ones.
//!
//! ```text
//! grid-2x2          feature-left      mosaic
//! ┌─────┬─────┐     ┌─────┬─────┐     ┌─────┬─────┐
//! │  0  │  1  │     │     │  1  │     │  0  │  1  │
//! ├─────┼─────┤     │  0  ├─────┤     ├───┬─┴─┬───┤
//! │  2  │  3  │     │     │  2  │     │ 2 │ 3 │ 4 │
//! └─────┴─────┘     └─────┴─────┘     └───┴───┴───┘
//! ```

/// Hard cap on images in a collage, regardless of layout.
pub const MAX_IMAGES: usize = 5;

/// Layout used when no valid layout id is configured.
pub const DEFAULT_LAYOUT_ID: &str = "grid-2x2";

/// Aspect ratio used when no valid aspect id is configured.
pub const DEFAULT_ASPECT_RATIO_ID: &str = "4:5";

/// Normalized rectangle within the collage frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

const fn cell(x: f64, y: f64, width: f64, height: f64) -> Cell {
    Cell {
        x,
        y,
        width,
        height,
    }
}

impl Cell {
    /// Whether a normalized point falls inside this cell (edges inclusive).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub id: &'static str,
    pub name: &'static str,
    pub max_images: usize,
    pub cells: &'static [Cell],
}

impl Layout {
    /// Effective image capacity: the layout's own limit, never above [`MAX_IMAGES`].
    pub fn capacity(&self) -> usize {
        self.max_images.min(MAX_IMAGES)
    }
}

pub static LAYOUTS: &[Layout] = &[
    Layout {
        id: "single",
        name: "Single",
        max_images: 1,
        cells: &[cell(0.0, 0.0, 1.0, 1.0)],
    },
    Layout {
        id: "split-v",
        name: "Side by side",
        max_images: 2,
        cells: &[cell(0.0, 0.0, 0.5, 1.0), cell(0.5, 0.0, 0.5, 1.0)],
    },
    Layout {
        id: "split-h",
        name: "Stacked",
        max_images: 2,
        cells: &[cell(0.0, 0.0, 1.0, 0.5), cell(0.0, 0.5, 1.0, 0.5)],
    },
    Layout {
        id: "feature-left",
        name: "Feature left",
        max_images: 3,
        cells: &[
            cell(0.0, 0.0, 0.5, 1.0),
            cell(0.5, 0.0, 0.5, 0.5),
            cell(0.5, 0.5, 0.5, 0.5),
        ],
    },
    Layout {
        id: "triptych",
        name: "Triptych",
        max_images: 3,
        cells: &[
            cell(0.0, 0.0, 1.0 / 3.0, 1.0),
            cell(1.0 / 3.0, 0.0, 1.0 / 3.0, 1.0),
            cell(2.0 / 3.0, 0.0, 1.0 / 3.0, 1.0),
        ],
    },
    Layout {
        id: "grid-2x2",
        name: "Grid",
        max_images: 4,
        cells: &[
            cell(0.0, 0.0, 0.5, 0.5),
            cell(0.5, 0.0, 0.5, 0.5),
            cell(0.0, 0.5, 0.5, 0.5),
            cell(0.5, 0.5, 0.5, 0.5),
        ],
    },
    Layout {
        id: "feature-top",
        name: "Feature top",
        max_images: 4,
        cells: &[
            cell(0.0, 0.0, 1.0, 0.6),
            cell(0.0, 0.6, 1.0 / 3.0, 0.4),
            cell(1.0 / 3.0, 0.6, 1.0 / 3.0, 0.4),
            cell(2.0 / 3.0, 0.6, 1.0 / 3.0, 0.4),
        ],
    },
    Layout {
        id: "mosaic",
        name: "Mosaic",
        max_images: 5,
        cells: &[
            cell(0.0, 0.0, 0.5, 0.5),
            cell(0.5, 0.0, 0.5, 0.5),
            cell(0.0, 0.5, 1.0 / 3.0, 0.5),
            cell(1.0 / 3.0, 0.5, 1.0 / 3.0, 0.5),
            cell(2.0 / 3.0, 0.5, 1.0 / 3.0, 0.5),
        ],
    },
    Layout {
        id: "overlap",
        name: "Overlap",
        max_images: 2,
        cells: &[cell(0.0, 0.0, 1.0, 1.0), cell(0.45, 0.45, 0.5, 0.5)],
    },
];

/// Look up a layout by id.
pub fn find_layout(id: &str) -> Option<&'static Layout> {
    LAYOUTS.iter().find(|l| l.id == id)
}

/// Look up a layout by id, falling back to the default layout.
pub fn layout_or_default(id: &str) -> &'static Layout {
    find_layout(id).unwrap_or(&LAYOUTS[5])
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectRatio {
    pub id: &'static str,
    pub label: &'static str,
    /// Width divided by height.
    pub value: f64,
}

pub static ASPECT_RATIOS: &[AspectRatio] = &[
    AspectRatio {
        id: "1:1",
        label: "Square",
        value: 1.0,
    },
    AspectRatio {
        id: "4:5",
        label: "Portrait 4:5",
        value: 4.0 / 5.0,
    },
    AspectRatio {
        id: "3:4",
        label: "Portrait 3:4",
        value: 3.0 / 4.0,
    },
    AspectRatio {
        id: "2:3",
        label: "Portrait 2:3",
        value: 2.0 / 3.0,
    },
    AspectRatio {
        id: "9:16",
        label: "Story 9:16",
        value: 9.0 / 16.0,
    },
    AspectRatio {
        id: "16:9",
        label: "Widescreen 16:9",
        value: 16.0 / 9.0,
    },
    AspectRatio {
        id: "4:3",
        label: "Landscape 4:3",
        value: 4.0 / 3.0,
    },
    AspectRatio {
        id: "3:2",
        label: "Landscape 3:2",
        value: 3.0 / 2.0,
    },
];

pub fn find_aspect_ratio(id: &str) -> Option<&'static AspectRatio> {
    ASPECT_RATIOS.iter().find(|a| a.id == id)
}

/// Look up an aspect ratio by id, falling back to the default ratio.
pub fn aspect_ratio_or_default(id: &str) -> &'static AspectRatio {
    find_aspect_ratio(id).unwrap_or(&ASPECT_RATIOS[1])
}
