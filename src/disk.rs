use crate::error::{OverlapError, Result};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Sequential reader over a device, image file or pipe
pub struct BlockSource {
    reader: BufReader<File>,
    /// `None` for pipes and other streams that cannot seek
    size: Option<u64>,
    path: PathBuf,
}

impl BlockSource {
    /// Open a device or file for reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let mut file = File::open(path_ref).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                OverlapError::FileNotFound(path_ref.display().to_string())
            } else {
                OverlapError::Io(e)
            }
        })?;

        // Block devices report a zero metadata length, seeking to the end does not
        let size = match file.seek(SeekFrom::End(0)) {
            Ok(size) => {
                file.seek(SeekFrom::Start(0))?;
                Some(size)
            }
            Err(e) if e.kind() == ErrorKind::NotSeekable => None,
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            reader: BufReader::new(file),
            size,
            path: path_ref.to_path_buf(),
        })
    }

    /// Total size in bytes, if the source can tell
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_seekable(&self) -> bool {
        self.size.is_some()
    }

    /// Number of blocks, counting a short final block
    pub fn block_count(&self, block_size: u64) -> Option<u64> {
        self.size.map(|size| size.div_ceil(block_size.max(1)))
    }

    /// Position the reader at the start of `block`
    pub fn seek_to_block(&mut self, block: u64, block_size: u64) -> Result<()> {
        let Some(size) = self.size else {
            if block == 0 {
                return Ok(());
            }
            return Err(OverlapError::InvalidArgument(format!(
                "cannot resume at block {block}: {} is not seekable",
                self.path.display()
            )));
        };

        let offset = block.checked_mul(block_size).ok_or_else(|| {
            OverlapError::InvalidArgument(format!("block {block} is out of range"))
        })?;
        if offset > size {
            return Err(OverlapError::InvalidArgument(format!(
                "cannot resume at block {block}: source is only {size} bytes"
            )));
        }
        self.reader.seek(SeekFrom::Start(offset))?;
        Ok(())
    }
}

impl Read for BlockSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_reports_size_and_blocks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[1u8; 1300]).unwrap();
        file.flush().unwrap();

        let source = BlockSource::open(file.path()).unwrap();
        assert_eq!(source.size(), Some(1300));
        assert!(source.is_seekable());
        assert_eq!(source.block_count(512), Some(3));
        assert_eq!(source.block_count(1300), Some(1));
    }

    #[test]
    fn test_open_missing_file() {
        let err = BlockSource::open("/nonexistent/find-overlap/device").err().unwrap();
        assert!(matches!(err, OverlapError::FileNotFound(_)));
    }

    #[test]
    fn test_seek_to_block() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let data: Vec<u8> = (0..1024u32).map(|i| (i / 256) as u8).collect();
        file.write_all(&data).unwrap();
        file.flush().unwrap();

        let mut source = BlockSource::open(file.path()).unwrap();
        source.seek_to_block(2, 256).unwrap();
        let mut byte = [0u8; 1];
        source.read_exact(&mut byte).unwrap();
        assert_eq!(byte[0], 2);

        assert!(source.seek_to_block(5, 256).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_fifo_has_unknown_size() {
        let dir = tempfile::tempdir().unwrap();
        let fifo = dir.path().join("stream");
        let status = std::process::Command::new("mkfifo").arg(&fifo).status().unwrap();
        assert!(status.success());

        let writer = {
            let fifo = fifo.clone();
            std::thread::spawn(move || {
                let _ = std::fs::write(fifo, [7u8; 100]);
            })
        };

        let mut source = BlockSource::open(&fifo).unwrap();
        assert_eq!(source.size(), None);
        assert_eq!(source.block_count(16), None);
        assert!(source.seek_to_block(0, 16).is_ok());
        assert!(matches!(
            source.seek_to_block(1, 16),
            Err(OverlapError::InvalidArgument(_))
        ));

        let mut data = Vec::new();
        source.read_to_end(&mut data).unwrap();
        assert_eq!(data, vec![7u8; 100]);
        writer.join().unwrap();
    }
}
