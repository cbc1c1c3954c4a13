pub mod archive;
pub mod render;

pub use archive::archive_channel;
pub use render::{checksum, render_document, transcript_filename};
