// Copyright 2026 Revtail Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::TailError;

/// One opened file plus the size/mtime baseline captured at open time.
///
/// The size contract is fixed at open: reads never go past `len_at_open`, and
/// every positioned read re-stats the handle first so concurrent mutation is
/// detected rather than silently read through. The handle is owned exclusively
/// by one reader and closed on drop.
pub struct FileSession {
    file: File,
    path: PathBuf,
    len_at_open: u64,
    modified_at_open: Option<SystemTime>,
}

impl FileSession {
    /// Open `path` and capture the consistency baseline.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TailError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let meta = file.metadata()?;
        Ok(Self {
            file,
            path,
            len_at_open: meta.len(),
            // Some filesystems do not report mtime; the consistency check is
            // skipped there rather than failing every request.
            modified_at_open: meta.modified().ok(),
        })
    }

    /// File size as of open time. Reads are confined to `[0, len_at_open)`.
    pub fn len_at_open(&self) -> u64 {
        self.len_at_open
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fill `buf` exactly from `[offset, offset + buf.len())`.
    ///
    /// Re-stats the handle first and fails with [`TailError::FileChanged`]
    /// when the modification time has advanced since open.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), TailError> {
        self.check_unchanged()?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn check_unchanged(&self) -> Result<(), TailError> {
        let baseline = match self.modified_at_open {
            Some(t) => t,
            None => return Ok(()),
        };
        let now = self.file.metadata()?.modified()?;
        if now != baseline {
            return Err(TailError::FileChanged(format!(
                "{} was modified after the read started",
                self.path.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn read_at_returns_requested_range() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"0123456789").unwrap();

        let mut s = FileSession::open(tmp.path()).unwrap();
        assert_eq!(s.len_at_open(), 10);

        let mut buf = [0u8; 4];
        s.read_at(3, &mut buf).unwrap();
        assert_eq!(&buf, b"3456");
    }

    #[test]
    fn mutation_after_open_fails_the_read() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"hello\n").unwrap();

        let mut s = FileSession::open(tmp.path()).unwrap();

        // Append and push the mtime forward so the change is unambiguous even
        // on coarse-grained filesystems.
        tmp.write_all(b"more\n").unwrap();
        tmp.as_file()
            .set_modified(SystemTime::now() + std::time::Duration::from_secs(5))
            .unwrap();

        let mut buf = [0u8; 5];
        let err = s.read_at(0, &mut buf).unwrap_err();
        assert!(matches!(err, TailError::FileChanged(_)), "got {err}");
    }
}
