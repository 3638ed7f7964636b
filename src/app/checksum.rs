use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::info;

use crate::error::{PipelineError, Result};

/// Lower-case hex MD5 of the file content.
pub(crate) fn file_md5(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|err| PipelineError::io(path, err))?;
    let mut reader = BufReader::new(file);
    let mut context = md5::Context::new();
    let mut buf = [0_u8; 64 * 1024];
    loop {
        let read = reader
            .read(&mut buf)
            .map_err(|err| PipelineError::io(path, err))?;
        if read == 0 {
            break;
        }
        context.consume(&buf[..read]);
    }
    Ok(format!("{:x}", context.compute()))
}

/// Compares the file against `expected`; exact, case-sensitive match.
pub(crate) fn verify(path: &Path, expected: &str) -> Result<()> {
    let actual = file_md5(path)?;
    if actual != expected {
        return Err(PipelineError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }
    info!(path = %path.display(), checksum = %actual, "checksum verified");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn hashes_file_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("S02E01A1DE.mp4");
        fs::write(&path, b"abc").expect("write fixture");
        assert_eq!(
            file_md5(&path).expect("hash"),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn upper_case_expectation_does_not_match() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("S02E01A1DE.mp4");
        fs::write(&path, b"abc").expect("write fixture");

        verify(&path, "900150983cd24fb0d6963f7d28e17f72").expect("exact match");
        let err = verify(&path, "900150983CD24FB0D6963F7D28E17F72").expect_err("case differs");
        match err {
            PipelineError::ChecksumMismatch { expected, actual, .. } => {
                assert_eq!(expected, "900150983CD24FB0D6963F7D28E17F72");
                assert_eq!(actual, "900150983cd24fb0d6963f7d28e17f72");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = file_md5(&dir.path().join("absent.mp4")).expect_err("no file");
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}
