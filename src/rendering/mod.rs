pub mod preview;

pub use preview::{encode_preview, prune_previews, save_preview, PreviewError};
