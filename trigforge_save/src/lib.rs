//! Read-modify-write access to the game's local-levels save container, plus
//! the pipeline that exports a compiled trigger graph into one level.

pub mod config;
pub mod container;
pub mod export;
pub mod plist;
pub mod save_file;
pub mod save_paths;

use thiserror::Error;

pub use config::Config;
pub use export::{ExportOptions, ExportSummary, export_to_savefile, strip_marked};
pub use save_file::{SaveData, SaveFile};
pub use save_paths::SavePaths;

/// Failures specific to the save container. I/O and path context is added on
/// top of these with `anyhow`.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("no level named '{0}' in the save file")]
    LevelNotFound(String),
    #[error("the save file contains no levels")]
    NoLevels,
    #[error("malformed save document: {0}")]
    MalformedDocument(String),
    #[error("container is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("container stream error: {0}")]
    Io(#[from] std::io::Error),
    #[error("container text is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error("level payload: {0}")]
    Payload(#[from] trigforge_data::PayloadError),
}
