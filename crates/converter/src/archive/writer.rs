//! Accumulating output archive and zip serialization

use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::{ConvertError, Result};

/// Entries of the converted archive, keyed by path
///
/// Inserting an existing path replaces its contents. Entries are written in
/// path order with a fixed timestamp so equal inputs give equal archives.
#[derive(Debug, Default, Clone)]
pub struct OutputArchive {
    entries: BTreeMap<String, Bytes>,
}

impl OutputArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; returns the previous contents if any
    pub fn insert<S: Into<String>>(&mut self, path: S, bytes: Bytes) -> Option<Bytes> {
        let path = path.into();
        let previous = self.entries.insert(path.clone(), bytes);
        if previous.is_some() {
            debug!("Replaced existing output entry: {}", path);
        }
        previous
    }

    pub fn get(&self, path: &str) -> Option<&Bytes> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Serialize all entries into a Deflate-compressed zip
    pub fn into_zip(self, compression_level: Option<i64>) -> Result<Bytes> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let base_options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(compression_level)
            .last_modified_time(DateTime::default());

        for (path, bytes) in &self.entries {
            let options = base_options.large_file(bytes.len() as u64 >= u32::MAX as u64);
            writer.start_file(path.as_str(), options).map_err(|source| ConvertError::ArchiveWrite {
                entry: path.clone(),
                source,
            })?;
            writer.write_all(bytes).map_err(|e| ConvertError::ArchiveWrite {
                entry: path.clone(),
                source: e.into(),
            })?;
        }

        let cursor = writer.finish().map_err(|source| ConvertError::ArchiveWrite {
            entry: "<central directory>".to_string(),
            source,
        })?;

        let content = cursor.into_inner();
        debug!("Serialized {} entries into {} bytes", self.entries.len(), content.len());
        Ok(Bytes::from(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::SourceArchive;

    #[test]
    fn last_write_wins() {
        let mut output = OutputArchive::new();
        assert!(output.insert("config/a.txt", Bytes::from_static(b"one")).is_none());
        let previous = output.insert("config/a.txt", Bytes::from_static(b"two"));

        assert_eq!(previous.as_deref(), Some(&b"one"[..]));
        assert_eq!(output.len(), 1);
        assert_eq!(output.get("config/a.txt").map(|b| &b[..]), Some(&b"two"[..]));
    }

    #[tokio::test]
    async fn serialized_zip_reads_back() {
        let mut output = OutputArchive::new();
        output.insert("mods/b.jar", Bytes::from_static(b"jar-bytes"));
        output.insert("config/a.txt", Bytes::from_static(b"a=1"));

        let content = output.into_zip(Some(6)).unwrap();
        let archive = SourceArchive::open(content, "out.zip").unwrap();

        let names: Vec<_> = archive.entries().map(|e| e.name().to_string()).collect();
        assert_eq!(names, vec!["config/a.txt", "mods/b.jar"]);
        let jar = archive.entry_by_name("mods/b.jar").unwrap().bytes().await.unwrap();
        assert_eq!(&jar[..], b"jar-bytes");
    }

    #[test]
    fn serialization_is_deterministic() {
        let build = || {
            let mut output = OutputArchive::new();
            output.insert("z.txt", Bytes::from_static(b"zzz"));
            output.insert("a.txt", Bytes::from_static(b"aaa"));
            output.into_zip(None).unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn empty_output_is_still_a_zip() {
        let content = OutputArchive::new().into_zip(None).unwrap();
        let archive = SourceArchive::open(content, "empty.zip").unwrap();
        assert!(archive.is_empty());
    }
}
