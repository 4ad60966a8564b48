//! Zip container access
//!
//! [`SourceArchive`] is the read-only view of an input pack and
//! [`OutputArchive`] accumulates the entries of the converted zip.

pub mod reader;
pub mod writer;

pub use reader::{ArchiveEntry, SourceArchive};
pub use writer::OutputArchive;

/// Build an in-memory zip; names ending in `/` become directory entries
#[cfg(test)]
pub(crate) fn build_test_zip(entries: &[(&str, &[u8])]) -> bytes::Bytes {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
    }
    bytes::Bytes::from(writer.finish().unwrap().into_inner())
}
