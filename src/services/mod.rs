pub mod coordinator;
pub mod decoder;

pub use coordinator::{CoordinatorOptions, CoordinatorStatus, DisplayCoordinator, RenderReport};
pub use decoder::{decode_image, DecodeError, ACCEPTED_MIME};
