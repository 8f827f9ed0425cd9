//! Palette with dual color storage and nearest-color matching.

use std::collections::HashSet;
use std::str::FromStr;

use super::error::PaletteError;
use crate::color::{LinearRgb, Oklab, Srgb};

/// Largest palette a packed frame can address (one nibble per pixel).
pub const MAX_PALETTE_LEN: usize = 16;

/// The Waveshare 7.3" ACeP (7in3f) colors, in device code order.
///
/// The position of each color is the 3-bit code the controller expects in a
/// frame nibble: black 0, white 1, green 2, blue 3, red 4, yellow 5, orange 6.
const ACEP_7COLOR: [[u8; 3]; 7] = [
    [0, 0, 0],
    [255, 255, 255],
    [0, 255, 0],
    [0, 0, 255],
    [255, 0, 0],
    [255, 255, 0],
    [255, 128, 0],
];

/// Distance metric for palette color matching.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DistanceMetric {
    /// Squared Euclidean distance in Oklab. Good for grey-only palettes.
    #[default]
    Euclidean,

    /// HyAB hybrid distance with chroma coupling.
    ///
    /// `kl * |dL| + kc * sqrt(da² + db²) + kchroma * |C_pixel - C_palette|`
    ///
    /// The coupling term keeps grey pixels on black and white instead of
    /// drifting to a light chromatic entry such as yellow.
    HyAB { kl: f32, kc: f32, kchroma: f32 },
}

/// Any palette entry with Oklab chroma above this counts as chromatic.
const CHROMA_DETECTION_THRESHOLD: f32 = 0.03;

/// An ordered, immutable set of device colors.
///
/// Index `i` of the palette is the value written into the frame for a pixel
/// of color `i`. Two colors are kept per entry: the *official* color (what the
/// datasheet calls it) and the *actual* color (what the panel really shows).
/// Matching and error computation use the actual colors; without a
/// calibration both are the same.
///
/// ```
/// use eink_frame::{Palette, Srgb};
///
/// let colors = [Srgb::from_u8(0, 0, 0), Srgb::from_u8(255, 255, 255)];
/// let palette = Palette::new(&colors, None).unwrap();
/// assert_eq!(palette.len(), 2);
/// assert_eq!(Palette::acep_7color().len(), 7);
/// ```
#[derive(Debug, Clone)]
pub struct Palette {
    official: Vec<Srgb>,
    actual: Vec<Srgb>,
    actual_linear: Vec<LinearRgb>,
    actual_oklab: Vec<Oklab>,
    actual_chroma: Vec<f32>,
    distance_metric: DistanceMetric,
}

impl Palette {
    /// Create a palette from official colors and optional measured colors.
    ///
    /// # Errors
    ///
    /// - [`PaletteError::EmptyPalette`] if `official` is empty
    /// - [`PaletteError::TooManyColors`] above [`MAX_PALETTE_LEN`] entries
    /// - [`PaletteError::LengthMismatch`] if `actual` has a different length
    /// - [`PaletteError::DuplicateColor`] if either list repeats a color
    pub fn new(official: &[Srgb], actual: Option<&[Srgb]>) -> Result<Self, PaletteError> {
        if official.is_empty() {
            return Err(PaletteError::EmptyPalette);
        }
        if official.len() > MAX_PALETTE_LEN {
            return Err(PaletteError::TooManyColors {
                len: official.len(),
            });
        }

        let actual = match actual {
            Some(a) if a.len() != official.len() => {
                return Err(PaletteError::LengthMismatch {
                    official: official.len(),
                    actual: a.len(),
                })
            }
            Some(a) => a,
            None => official,
        };

        check_unique(official)?;
        check_unique(actual)?;

        Ok(Self::build(official.to_vec(), actual.to_vec()))
    }

    /// Create a palette from hex strings such as `"#FF0000"` or `"#F00"`.
    pub fn from_hex(official: &[&str], actual: Option<&[&str]>) -> Result<Self, PaletteError> {
        let official = parse_hex_list(official)?;
        let actual = actual.map(parse_hex_list).transpose()?;
        Palette::new(&official, actual.as_deref())
    }

    /// The 7-color ACeP palette in device code order.
    pub fn acep_7color() -> Self {
        let colors: Vec<Srgb> = ACEP_7COLOR.iter().map(|&c| Srgb::from_bytes(c)).collect();
        Self::build(colors.clone(), colors)
    }

    /// Replace the matching colors with measured ones, keeping the codes.
    pub fn with_actual(self, actual: &[Srgb]) -> Result<Self, PaletteError> {
        Palette::new(&self.official, Some(actual))
    }

    fn build(official: Vec<Srgb>, actual: Vec<Srgb>) -> Self {
        // Bytes go through the gamma table so palette entries and decoded
        // pixels of the same color produce identical linear values.
        let actual_linear: Vec<LinearRgb> = actual
            .iter()
            .map(|c| LinearRgb::from_bytes(c.to_bytes()))
            .collect();
        let actual_oklab: Vec<Oklab> = actual_linear.iter().map(|&l| Oklab::from(l)).collect();
        let actual_chroma: Vec<f32> = actual_oklab.iter().map(|c| c.chroma()).collect();

        let distance_metric = if actual_chroma
            .iter()
            .any(|&c| c > CHROMA_DETECTION_THRESHOLD)
        {
            DistanceMetric::HyAB {
                kl: 2.0,
                kc: 1.0,
                kchroma: 10.0,
            }
        } else {
            DistanceMetric::Euclidean
        };

        Self {
            official,
            actual,
            actual_linear,
            actual_oklab,
            actual_chroma,
            distance_metric,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.official.len()
    }

    /// Always `false`; empty palettes are rejected at construction.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.official.is_empty()
    }

    /// Official color at `idx`, the color a frame index stands for.
    #[inline]
    pub fn official(&self, idx: usize) -> Srgb {
        self.official[idx]
    }

    /// Measured color at `idx`.
    #[inline]
    pub fn actual(&self, idx: usize) -> Srgb {
        self.actual[idx]
    }

    #[inline]
    pub fn actual_linear(&self, idx: usize) -> LinearRgb {
        self.actual_linear[idx]
    }

    #[inline]
    pub fn distance_metric(&self) -> DistanceMetric {
        self.distance_metric
    }

    /// True if any entry is chromatic; such palettes default to HyAB.
    pub fn is_chromatic(&self) -> bool {
        self.actual_chroma
            .iter()
            .any(|&c| c > CHROMA_DETECTION_THRESHOLD)
    }

    /// Find the nearest entry to `color`, returning `(index, distance)`.
    ///
    /// Ties resolve to the lowest index, which keeps matching deterministic.
    #[inline]
    pub fn find_nearest(&self, color: Oklab) -> (usize, f32) {
        let pixel_chroma = color.chroma();

        let mut best_idx = 0;
        let mut best_dist = f32::MAX;
        for (i, &entry) in self.actual_oklab.iter().enumerate() {
            let dist = match self.distance_metric {
                DistanceMetric::Euclidean => color.distance_squared(entry),
                DistanceMetric::HyAB { kl, kc, kchroma } => {
                    let dl = (color.l - entry.l).abs();
                    let da = color.a - entry.a;
                    let db = color.b - entry.b;
                    let coupling = (pixel_chroma - self.actual_chroma[i]).abs();
                    kl * dl + kc * (da * da + db * db).sqrt() + kchroma * coupling
                }
            };
            if dist < best_dist {
                best_dist = dist;
                best_idx = i;
            }
        }

        (best_idx, best_dist)
    }

    /// Official colors as a flat `[R, G, B, ...]` table, e.g. a PNG PLTE chunk.
    pub fn to_rgb_table(&self) -> Vec<u8> {
        self.official.iter().flat_map(|c| c.to_bytes()).collect()
    }
}

fn check_unique(colors: &[Srgb]) -> Result<(), PaletteError> {
    let mut seen = HashSet::new();
    for (index, color) in colors.iter().enumerate() {
        if !seen.insert(color.to_bytes()) {
            return Err(PaletteError::DuplicateColor { index });
        }
    }
    Ok(())
}

fn parse_hex_list(list: &[&str]) -> Result<Vec<Srgb>, PaletteError> {
    list.iter()
        .map(|s| Srgb::from_str(s).map_err(PaletteError::ParseColor))
        .collect()
}
