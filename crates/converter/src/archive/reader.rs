//! Read-only view of an input pack archive

use bytes::Bytes;
use std::io::{Cursor, Read};
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{ConvertError, Result};

/// Upper bound on the buffer reserved up front from an entry's declared size
const MAX_PREALLOCATION: u64 = 16 << 20;

#[derive(Debug, Clone)]
struct EntryMeta {
    name: String,
    is_directory: bool,
    index: usize,
    size: u64,
}

/// An opened pack archive held fully in memory
#[derive(Debug, Clone)]
pub struct SourceArchive {
    name: String,
    zip: ZipArchive<Cursor<Bytes>>,
    entries: Vec<EntryMeta>,
}

impl SourceArchive {
    /// Open `bytes` as a zip container; `name` is used for messages and as
    /// the fallback output name
    pub fn open<S: Into<String>>(bytes: Bytes, name: S) -> Result<Self> {
        let name = name.into();
        if bytes.is_empty() {
            return Err(ConvertError::EmptyInput);
        }

        let mut zip =
            ZipArchive::new(Cursor::new(bytes)).map_err(|source| ConvertError::CorruptArchive {
                name: name.clone(),
                source,
            })?;

        let mut entries = Vec::with_capacity(zip.len());
        for index in 0..zip.len() {
            let file = zip.by_index_raw(index).map_err(|source| ConvertError::CorruptArchive {
                name: name.clone(),
                source,
            })?;
            entries.push(EntryMeta {
                name: file.name().to_string(),
                is_directory: file.is_dir(),
                index,
                size: file.size(),
            });
        }

        debug!("Opened {} with {} entries", name, entries.len());
        Ok(Self { name, zip, entries })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, in central directory order
    pub fn entries(&self) -> impl Iterator<Item = ArchiveEntry<'_>> {
        self.entries.iter().map(move |meta| ArchiveEntry { archive: self, meta })
    }

    /// Exact-name lookup
    pub fn entry_by_name(&self, name: &str) -> Option<ArchiveEntry<'_>> {
        self.entries().find(|entry| entry.name() == name)
    }
}

/// One entry of a [`SourceArchive`]; the payload is only decompressed on demand
#[derive(Debug, Clone, Copy)]
pub struct ArchiveEntry<'a> {
    archive: &'a SourceArchive,
    meta: &'a EntryMeta,
}

impl<'a> ArchiveEntry<'a> {
    pub fn name(&self) -> &'a str {
        &self.meta.name
    }

    pub fn is_directory(&self) -> bool {
        self.meta.is_directory
    }

    /// Uncompressed size recorded in the archive
    pub fn size(&self) -> u64 {
        self.meta.size
    }

    /// Decompress the entry on the blocking pool
    pub async fn bytes(&self) -> Result<Bytes> {
        let mut zip = self.archive.zip.clone();
        let index = self.meta.index;
        let capacity = initial_capacity(self.meta.size);
        let entry = self.meta.name.clone();

        let read = tokio::task::spawn_blocking(move || -> std::result::Result<Vec<u8>, ZipError> {
            let mut file = zip.by_index(index)?;
            let mut buffer = Vec::with_capacity(capacity);
            file.read_to_end(&mut buffer)?;
            Ok(buffer)
        })
        .await
        .map_err(|source| ConvertError::TaskFailed {
            context: format!("reading archive entry '{}'", entry),
            source,
        })?;

        read.map(Bytes::from)
            .map_err(|source| ConvertError::ArchiveRead { entry, source })
    }
}

/// The declared size comes from the archive headers and is not trusted
fn initial_capacity(declared_size: u64) -> usize {
    declared_size.min(MAX_PREALLOCATION) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::build_test_zip;

    #[test]
    fn empty_input_is_rejected() {
        let result = SourceArchive::open(Bytes::new(), "empty.mrpack");
        assert!(matches!(result, Err(ConvertError::EmptyInput)));
    }

    #[test]
    fn garbage_is_corrupt() {
        let junk = Bytes::from_static(b"definitely not a zip");
        let result = SourceArchive::open(junk, "junk.mrpack");
        match result {
            Err(ConvertError::CorruptArchive { name, .. }) => assert_eq!(name, "junk.mrpack"),
            other => panic!("Expected CorruptArchive, got {:?}", other),
        }
    }

    #[test]
    fn declared_size_does_not_drive_allocation() {
        assert_eq!(initial_capacity(5), 5);
        assert_eq!(initial_capacity(u64::MAX), MAX_PREALLOCATION as usize);
        assert_eq!(initial_capacity(1 << 40), MAX_PREALLOCATION as usize);
    }

    #[tokio::test]
    async fn entries_larger_than_the_preallocation_read_fully() {
        let big = vec![7u8; MAX_PREALLOCATION as usize + 1024];
        let data = build_test_zip(&[("overrides/big.bin", &big[..])]);
        let archive = SourceArchive::open(data, "big.mrpack").unwrap();

        let entry = archive.entry_by_name("overrides/big.bin").unwrap();
        let bytes = entry.bytes().await.unwrap();
        assert_eq!(bytes.len(), big.len());
    }

    #[tokio::test]
    async fn lists_entries_and_reads_lazily() {
        let data = build_test_zip(&[
            ("overrides/", b""),
            ("overrides/config/foo.txt", b"foo=1"),
            ("modrinth.index.json", b"{}"),
        ]);
        let archive = SourceArchive::open(data, "pack.mrpack").unwrap();

        assert_eq!(archive.len(), 3);
        let names: Vec<_> = archive.entries().map(|e| (e.name(), e.is_directory())).collect();
        assert_eq!(
            names,
            vec![
                ("overrides/", true),
                ("overrides/config/foo.txt", false),
                ("modrinth.index.json", false),
            ]
        );

        let entry = archive.entry_by_name("overrides/config/foo.txt").unwrap();
        assert_eq!(entry.size(), 5);
        assert_eq!(&entry.bytes().await.unwrap()[..], b"foo=1");
        assert!(archive.entry_by_name("missing").is_none());
    }
}
