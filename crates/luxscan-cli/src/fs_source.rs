//! File-backed sample producer.
//!
//! Stands in for a frame decoder: each fixed-size block of file bytes
//! becomes one luminance sample, the mean byte value of the block. A
//! short final block is averaged over the bytes it actually holds.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use luxscan_core::SampleSource;

/// Bytes averaged into one sample by default.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Reads a file block by block, yielding one mean-value sample per
/// block.
pub struct FileBlockSource {
    id: String,
    path: PathBuf,
    block_size: usize,
    reader: Option<BufReader<File>>,
}

impl FileBlockSource {
    pub fn new(path: &Path, block_size: usize) -> Self {
        assert!(block_size > 0, "block size must be non-zero");
        Self {
            id: path.display().to_string(),
            path: path.to_path_buf(),
            block_size,
            reader: None,
        }
    }

    pub fn boxed(path: &Path, block_size: usize) -> Box<dyn SampleSource> {
        Box::new(Self::new(path, block_size))
    }

    /// Fill `buf` from the reader, returning how many bytes landed.
    /// Stops early only at end of file.
    fn fill_block(reader: &mut BufReader<File>, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl SampleSource for FileBlockSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn open(&mut self) -> io::Result<()> {
        let file = File::open(&self.path)?;
        self.reader = Some(BufReader::new(file));
        Ok(())
    }

    fn next_sample(&mut self) -> Option<u8> {
        let reader = self.reader.as_mut().expect("next_sample before open");
        let mut buf = vec![0u8; self.block_size];
        match Self::fill_block(reader, &mut buf) {
            Ok(0) => None,
            Ok(filled) => {
                let sum: u64 = buf[..filled].iter().map(|&b| u64::from(b)).sum();
                Some((sum / filled as u64) as u8)
            }
            Err(e) => {
                // Treat a mid-file read error as a truncated source; the
                // samples produced so far still count.
                log::warn!("{}: read failed: {e}", self.id);
                None
            }
        }
    }
}
