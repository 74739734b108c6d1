//! ZIP container codec

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;
use zip::read::ZipArchive;
use zip::result::ZipError;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

/// Read side of a ZIP container
pub struct Container<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl Container<BufReader<File>> {
    /// Open a container from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> Container<R> {
    /// Open a container from a seekable reader
    pub fn from_reader(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader).map_err(invalid_zip)?;
        Ok(Self { archive })
    }

    /// Names of all file entries, as declared, in archive order.
    ///
    /// Directory entries are skipped; duplicate names are fatal.
    pub fn entry_names(&mut self) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(self.archive.len());
        let mut seen = HashSet::new();

        for i in 0..self.archive.len() {
            let file = self.archive.by_index_raw(i).map_err(invalid_zip)?;
            let name = file.name().to_string();
            if name.ends_with('/') {
                continue;
            }
            if !seen.insert(normalize_entry_name(&name)) {
                return Err(Error::InvalidFormat(format!("duplicate ZIP entry '{}'", name)));
            }
            names.push(name);
        }

        Ok(names)
    }

    /// Read the bytes of a named entry
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = self.archive.by_name(name).map_err(|e| match e {
            ZipError::FileNotFound => Error::PartNotFound(name.to_string()),
            other => invalid_zip(other),
        })?;

        let mut data = Vec::with_capacity(file.size().min(16 * 1024 * 1024) as usize);
        file.read_to_end(&mut data)
            .map_err(|e| Error::InvalidFormat(format!("truncated entry '{}': {}", name, e)))?;
        log::trace!("read entry {} ({} bytes)", name, data.len());
        Ok(data)
    }
}

/// Write side of a ZIP container; entries are streamed in call order
pub struct ContainerWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: FileOptions<'static, ()>,
    written: HashSet<String>,
}

impl<W: Write + Seek> ContainerWriter<W> {
    /// Start a new container
    pub fn new(writer: W) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            options: FileOptions::default().compression_method(CompressionMethod::Deflated),
            written: HashSet::new(),
        }
    }

    /// Write one entry. Separators are normalized and a leading '/' omitted.
    pub fn write_entry(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let name = normalize_entry_name(name);
        if !self.written.insert(name.clone()) {
            return Err(Error::InvalidFormat(format!("duplicate ZIP entry '{}'", name)));
        }
        self.zip.start_file(name.as_str(), self.options)?;
        self.zip.write_all(data)?;
        log::trace!("wrote entry {} ({} bytes)", name, data.len());
        Ok(())
    }

    /// Finish the archive and return the underlying writer
    pub fn finish(self) -> Result<W> {
        Ok(self.zip.finish()?)
    }
}

fn normalize_entry_name(name: &str) -> String {
    name.replace('\\', "/").trim_start_matches('/').to_string()
}

fn invalid_zip(err: ZipError) -> Error {
    match err {
        ZipError::Io(e) => Error::InvalidFormat(format!("unreadable ZIP: {}", e)),
        other => Error::InvalidFormat(format!("not a valid ZIP archive: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn test_write_and_read_back() {
        let mut writer = ContainerWriter::new(Cursor::new(Vec::new()));
        writer.write_entry("/a/b.xml", b"<b/>").unwrap();
        writer.write_entry("a\\c.xml", b"<c/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let mut container = Container::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(container.entry_names().unwrap(), vec!["a/b.xml", "a/c.xml"]);
        assert_eq!(container.read("a/c.xml").unwrap(), b"<c/>");
    }

    #[test]
    fn test_duplicate_write_rejected() {
        let mut writer = ContainerWriter::new(Cursor::new(Vec::new()));
        writer.write_entry("a.xml", b"1").unwrap();
        let err = writer.write_entry("/a.xml", b"2").unwrap_err();
        assert_eq!(err.code(), "invalid-format");
    }

    #[test]
    fn test_not_a_zip() {
        let result = Container::from_reader(Cursor::new(b"plain text".to_vec()));
        assert_eq!(result.err().map(|e| e.code()), Some("invalid-format"));
    }

    #[test]
    fn test_missing_entry() {
        let mut writer = ContainerWriter::new(Cursor::new(Vec::new()));
        writer.write_entry("a.xml", b"1").unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        let mut container = Container::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(container.read("b.xml").unwrap_err().code(), "part-not-found");
    }
}
