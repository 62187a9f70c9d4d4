//! ZIP container access
//!
//! The engine consumes the OOXML container as a key→bytes store: read a part
//! as text, clone untouched parts into the output archive, write new or
//! rewritten parts.

use std::io::{Cursor, Read, Write};

use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{DocxlabError, Result};

/// Read-side view of a template archive.
#[derive(Debug)]
pub struct ZipStore {
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

/// Write-side of the output archive, backed by an in-memory buffer.
pub struct ZipSink {
    writer: ZipWriter<Cursor<Vec<u8>>>,
}

impl ZipStore {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| DocxlabError::TemplateParse(format!("unreadable archive: {e}")))?;
        Ok(Self { archive })
    }

    /// Names of every part in the archive, in stored order.
    pub fn part_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_owned).collect()
    }

    /// Read a part as UTF-8 text; it is an error for the part to be missing.
    pub fn read_text(&mut self, name: &str) -> Result<String> {
        match self.try_read_text(name)? {
            Some(text) => Ok(text),
            None => Err(DocxlabError::TemplateParse(format!(
                "missing part '{name}'"
            ))),
        }
    }

    /// Read a part as UTF-8 text, or `None` if the archive has no such part.
    pub fn try_read_text(&mut self, name: &str) -> Result<Option<String>> {
        match self.archive.by_name(name) {
            Ok(mut file) => {
                let mut text = String::new();
                file.read_to_string(&mut text)?;
                Ok(Some(text))
            }
            Err(ZipError::FileNotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Copy every part except `except` into the sink, bytes untouched.
    pub fn clone_except(&mut self, sink: &mut ZipSink, except: &[String]) -> Result<()> {
        for i in 0..self.archive.len() {
            let file = self.archive.by_index_raw(i)?;
            if except.iter().any(|name| name == file.name()) {
                continue;
            }
            sink.writer.raw_copy_file(file)?;
        }
        Ok(())
    }
}

impl ZipSink {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Write (or overwrite) a part.
    pub fn set(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.writer.start_file(name, SimpleFileOptions::default())?;
        self.writer.write_all(data)?;
        Ok(())
    }

    /// Finish the archive and return its bytes.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        let cursor = self.writer.finish()?;
        Ok(cursor.into_inner())
    }
}

impl Default for ZipSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_zip() -> Vec<u8> {
        let mut sink = ZipSink::new();
        sink.set("a.txt", b"alpha").unwrap();
        sink.set("b.txt", b"beta").unwrap();
        sink.into_bytes().unwrap()
    }

    #[test]
    fn test_read_text() {
        let mut store = ZipStore::from_bytes(sample_zip()).unwrap();
        assert_eq!(store.read_text("a.txt").unwrap(), "alpha");
        assert_eq!(store.try_read_text("missing.txt").unwrap(), None);
        assert!(store.read_text("missing.txt").is_err());
    }

    #[test]
    fn test_clone_except() {
        let mut store = ZipStore::from_bytes(sample_zip()).unwrap();
        let mut sink = ZipSink::new();
        store
            .clone_except(&mut sink, &["b.txt".to_string()])
            .unwrap();
        sink.set("c.txt", b"gamma").unwrap();

        let mut out = ZipStore::from_bytes(sink.into_bytes().unwrap()).unwrap();
        assert_eq!(out.read_text("a.txt").unwrap(), "alpha");
        assert_eq!(out.try_read_text("b.txt").unwrap(), None);
        assert_eq!(out.read_text("c.txt").unwrap(), "gamma");
    }

    #[test]
    fn test_garbage_is_template_parse_error() {
        let err = ZipStore::from_bytes(vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, DocxlabError::TemplateParse(_)));
    }
}
