use eink_frame::{frame_len, Palette};

/// Native geometry of a supported panel model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelSpec {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
}

impl PanelSpec {
    /// Waveshare 7.3" ACeP, 7 colors
    pub const ACEP_7IN3F: Self = Self {
        name: "waveshare-7in3f",
        width: 800,
        height: 480,
    };

    /// Bytes in one packed frame
    pub fn frame_len(&self) -> usize {
        frame_len(self.width, self.height)
    }

    /// Device palette in controller code order
    pub fn palette(&self) -> Palette {
        Palette::acep_7color()
    }
}
