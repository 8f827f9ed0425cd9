//! Error diffusion kernel definitions.

/// An error diffusion kernel.
///
/// Each entry is an offset `(dx, dy)` to a not-yet-visited neighbor and the
/// numerator of the share of the error it receives; the share is
/// `weight / divisor`. `dy` is never negative and `dy == 0` implies `dx > 0`.
///
/// The total propagated is `sum(weights) / divisor`. Floyd–Steinberg moves all
/// of the error, Atkinson only 75 %.
#[derive(Debug, Clone, Copy)]
pub struct Kernel {
    /// `(dx, dy, weight)`; `dx` is mirrored on serpentine reverse rows.
    pub entries: &'static [(i32, i32, u8)],

    pub divisor: u8,

    /// Rows the kernel reaches below the current one. The error buffer keeps
    /// `max_dy + 1` rows.
    pub max_dy: usize,
}

impl Kernel {
    /// Fraction of the quantization error passed on to neighbors.
    pub fn propagation(&self) -> f32 {
        let total: u32 = self.entries.iter().map(|&(_, _, w)| w as u32).sum();
        total as f32 / self.divisor as f32
    }
}

/// Floyd–Steinberg, 100 % propagation over 4 neighbors.
///
/// ```text
///        X   7
///    3   5   1
/// ```
pub const FLOYD_STEINBERG: Kernel = Kernel {
    entries: &[
        (1, 0, 7),  // right
        (-1, 1, 3), // bottom-left
        (0, 1, 5),  // bottom
        (1, 1, 1),  // bottom-right
    ],
    divisor: 16,
    max_dy: 1,
};

/// Atkinson, 75 % propagation over 6 neighbors.
///
/// ```text
///        X   1   1
///    1   1   1
///        1
/// ```
pub const ATKINSON: Kernel = Kernel {
    entries: &[
        (1, 0, 1),
        (2, 0, 1),
        (-1, 1, 1),
        (0, 1, 1),
        (1, 1, 1),
        (0, 2, 1),
    ],
    divisor: 8,
    max_dy: 2,
};
