pub mod index;
pub mod status;
pub mod upload;

pub use index::handle_index;
pub use status::{handle_status, __path_handle_status};
pub use upload::{handle_upload, UploadForm, UploadResponse, __path_handle_upload};
