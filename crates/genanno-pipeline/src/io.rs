//! Input opening shared by the FASTA, GFF3 and table readers
//!
//! Gzip input is recognised by its magic bytes, not by extension, so a
//! renamed `proteins.faa` that is actually compressed still reads correctly.

use crate::error::{PipelineError, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open a plain or gzip-compressed file for buffered line reading
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    if !path.exists() {
        return Err(PipelineError::InputMissing(path.to_path_buf()));
    }

    let mut file = File::open(path)?;
    let mut magic = [0u8; 2];
    let n = read_prefix(&mut file, &mut magic)?;
    let file = File::open(path)?;

    if n == 2 && magic == GZIP_MAGIC {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn read_prefix(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Create (truncating) an output file, creating parent directories first
pub fn create_output(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Write a whole buffer to `path` and flush
pub fn write_file(path: &Path, contents: &str) -> Result<()> {
    let mut out = create_output(path)?;
    out.write_all(contents.as_bytes())?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    #[test]
    fn test_open_plain_and_gzip() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("a.txt");
        std::fs::write(&plain, "line1\nline2\n").unwrap();

        let gz = dir.path().join("a.txt.gz");
        let mut enc = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
        enc.write_all(b"line1\nline2\n").unwrap();
        enc.finish().unwrap();

        for path in [&plain, &gz] {
            let lines: Vec<String> = open_input(path).unwrap().lines().map(|l| l.unwrap()).collect();
            assert_eq!(lines, vec!["line1", "line2"]);
        }
    }

    #[test]
    fn test_missing_input() {
        let err = open_input(Path::new("/nonexistent/proteins.faa")).err().unwrap();
        assert!(matches!(err, PipelineError::InputMissing(_)));
    }

    #[test]
    fn test_empty_file_is_plain() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.tsv");
        std::fs::write(&empty, "").unwrap();
        assert_eq!(open_input(&empty).unwrap().lines().count(), 0);
    }
}
