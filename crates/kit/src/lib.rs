//! Kit assembly and the stores it writes to.
//!
//! A kit is one language's prayer script, post metadata, narrated audio, and
//! image, recorded as a [`MarketingHistoryItem`] with its binary assets in a
//! [`BlobStore`].

pub mod assembler;
pub mod blob;
pub mod error;
pub mod history;
pub mod types;

pub use {
    assembler::KitAssembler,
    blob::{BlobStore, FileBlobStore, InMemoryBlobStore},
    error::{Error, Result},
    history::{FileHistoryStore, HistoryStore, InMemoryHistoryStore, insert_sorted},
    types::{KitRequest, MarketingHistoryItem, audio_blob_key, history_id, image_blob_key},
};
