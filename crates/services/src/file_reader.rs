//! Reads the files a request refers to, within fixed size limits.
//!
//! Reading is synchronous and happens on the UI thread right before a stream
//! is launched, so the limits keep both latency and prompt size bounded.

use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const MAX_FILE_BYTES: u64 = 250 * 1024;
pub const MAX_BATCH_BYTES: u64 = 1536 * 1024;

/// Encoding a file was successfully decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Windows1252,
    Latin1,
}

impl TextEncoding {
    /// Decoders in the order they are tried.
    pub const ORDER: [TextEncoding; 3] = [
        TextEncoding::Utf8,
        TextEncoding::Windows1252,
        TextEncoding::Latin1,
    ];

    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => {
                let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                encoding_rs::UTF_8
                    .decode_without_bom_handling_and_without_replacement(bytes)
                    .map(Cow::into_owned)
            }
            TextEncoding::Windows1252 => {
                let text = encoding_rs::WINDOWS_1252
                    .decode_without_bom_handling_and_without_replacement(bytes)?;
                // WHATWG passes the unassigned bytes through as C1 controls;
                // treat them as a failed decode so Latin-1 gets its turn.
                if text.chars().any(is_cp1252_unassigned) {
                    None
                } else {
                    Some(text.into_owned())
                }
            }
            TextEncoding::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes).into_owned()),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Windows1252 => "windows-1252",
            TextEncoding::Latin1 => "iso-8859-1",
        })
    }
}

fn is_cp1252_unassigned(c: char) -> bool {
    matches!(c, '\u{81}' | '\u{8D}' | '\u{8F}' | '\u{90}' | '\u{9D}')
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadFile {
    pub path: PathBuf,
    pub content: String,
    pub encoding: TextEncoding,
}

impl ReadFile {
    pub fn file_name(&self) -> String {
        display_name(&self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotFound,
    NotAFile,
    TooLarge { size: u64 },
    BatchLimit,
    Unreadable(String),
    Undecodable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotFound => write!(f, "file not found"),
            SkipReason::NotAFile => write!(f, "not a regular file"),
            SkipReason::TooLarge { size } => {
                write!(f, "file too large ({} KiB, limit {} KiB)", size / 1024, MAX_FILE_BYTES / 1024)
            }
            SkipReason::BatchLimit => write!(f, "total size limit reached"),
            SkipReason::Unreadable(e) => write!(f, "could not read: {e}"),
            SkipReason::Undecodable => write!(f, "could not decode as text"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

impl SkippedFile {
    /// One-line warning suitable for the transcript.
    pub fn describe(&self) -> String {
        format!("Skipping {}: {}", display_name(&self.path), self.reason)
    }
}

/// Result of one `read_files` call. `files` keeps input order.
#[derive(Debug, Clone, Default)]
pub struct ReadBatch {
    pub files: Vec<ReadFile>,
    pub skipped: Vec<SkippedFile>,
}

impl ReadBatch {
    pub fn get(&self, path: &Path) -> Option<&ReadFile> {
        self.files.iter().find(|f| f.path == path)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FileReader {
    pub max_file_bytes: u64,
    pub max_batch_bytes: u64,
}

impl Default for FileReader {
    fn default() -> Self {
        Self {
            max_file_bytes: MAX_FILE_BYTES,
            max_batch_bytes: MAX_BATCH_BYTES,
        }
    }
}

impl FileReader {
    pub fn with_limits(max_file_bytes: u64, max_batch_bytes: u64) -> Self {
        Self {
            max_file_bytes,
            max_batch_bytes,
        }
    }

    pub fn read_files<P: AsRef<Path>>(&self, paths: &[P]) -> ReadBatch {
        let mut batch = ReadBatch::default();
        let mut total: u64 = 0;

        for (idx, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            let meta = match fs::metadata(path) {
                Ok(m) => m,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    batch.skip(path, SkipReason::NotFound);
                    continue;
                }
                Err(e) => {
                    batch.skip(path, SkipReason::Unreadable(e.to_string()));
                    continue;
                }
            };
            if !meta.is_file() {
                batch.skip(path, SkipReason::NotAFile);
                continue;
            }
            let size = meta.len();
            if size > self.max_file_bytes {
                batch.skip(path, SkipReason::TooLarge { size });
                continue;
            }
            if total + size > self.max_batch_bytes {
                for rest in &paths[idx..] {
                    batch.skip(rest.as_ref(), SkipReason::BatchLimit);
                }
                break;
            }

            let bytes = match fs::read(path) {
                Ok(b) => b,
                Err(e) => {
                    batch.skip(path, SkipReason::Unreadable(e.to_string()));
                    continue;
                }
            };
            let decoded = TextEncoding::ORDER
                .iter()
                .find_map(|enc| enc.decode(&bytes).map(|text| (text, *enc)));
            match decoded {
                Some((content, encoding)) => {
                    tracing::debug!("read {} as {}", path.display(), encoding);
                    total += size;
                    batch.files.push(ReadFile {
                        path: path.to_path_buf(),
                        content,
                        encoding,
                    });
                }
                None => batch.skip(path, SkipReason::Undecodable),
            }
        }
        batch
    }
}

impl ReadBatch {
    fn skip(&mut self, path: &Path, reason: SkipReason) {
        tracing::warn!("skipping {}: {}", path.display(), reason);
        self.skipped.push(SkippedFile {
            path: path.to_path_buf(),
            reason,
        });
    }
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reads_in_input_order_and_reports_missing() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.txt");
        let b = tmp.path().join("b.txt");
        fs::write(&a, "alpha").unwrap();
        fs::write(&b, "beta").unwrap();
        let missing = tmp.path().join("nope.txt");

        let batch = FileReader::default().read_files(&[b.clone(), missing.clone(), a.clone()]);
        let names: Vec<_> = batch.files.iter().map(|f| f.file_name()).collect();
        assert_eq!(names, vec!["b.txt", "a.txt"]);
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].path, missing);
        assert_eq!(batch.skipped[0].reason, SkipReason::NotFound);
    }

    #[test]
    fn directories_and_oversized_files_are_skipped() {
        let tmp = tempdir().unwrap();
        let big = tmp.path().join("big.txt");
        fs::write(&big, vec![b'x'; 64]).unwrap();
        let small = tmp.path().join("small.txt");
        fs::write(&small, "ok").unwrap();

        let reader = FileReader::with_limits(32, 1024);
        let batch = reader.read_files(&[tmp.path().to_path_buf(), big.clone(), small.clone()]);
        assert_eq!(batch.files.len(), 1);
        assert_eq!(batch.files[0].path, small);
        assert_eq!(batch.skipped[0].reason, SkipReason::NotAFile);
        assert_eq!(batch.skipped[1].reason, SkipReason::TooLarge { size: 64 });
    }

    #[test]
    fn batch_limit_stops_the_whole_batch() {
        let tmp = tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..4)
            .map(|i| {
                let p = tmp.path().join(format!("f{i}.txt"));
                fs::write(&p, vec![b'a'; 10]).unwrap();
                p
            })
            .collect();

        let batch = FileReader::with_limits(100, 25).read_files(&paths);
        assert_eq!(batch.files.len(), 2);
        // third file would exceed the limit; it and the rest are skipped
        assert_eq!(batch.skipped.len(), 2);
        assert!(batch.skipped.iter().all(|s| s.reason == SkipReason::BatchLimit));
        assert_eq!(batch.skipped[1].path, paths[3]);
    }

    #[test]
    fn decoding_falls_back_through_encodings() {
        assert_eq!(
            TextEncoding::Utf8.decode(b"\xEF\xBB\xBFhi").as_deref(),
            Some("hi")
        );
        assert!(TextEncoding::Utf8.decode(b"caf\xE9").is_none());
        assert_eq!(
            TextEncoding::Windows1252.decode(b"\x93quoted\x94 \x80").as_deref(),
            Some("\u{201C}quoted\u{201D} \u{20AC}")
        );
        // 0x81 is unassigned in windows-1252
        assert!(TextEncoding::Windows1252.decode(b"a\x81b").is_none());
        assert_eq!(
            TextEncoding::Latin1.decode(b"a\x81b").as_deref(),
            Some("a\u{81}b")
        );
    }

    #[test]
    fn windows_1252_rejects_only_unassigned_bytes() {
        for b in [0x81u8, 0x8D, 0x8F, 0x90, 0x9D] {
            assert!(TextEncoding::Windows1252.decode(&[b'x', b]).is_none(), "{b:#x}");
            assert_eq!(
                TextEncoding::Latin1.decode(&[b]).unwrap(),
                char::from(b).to_string()
            );
        }
        assert_eq!(
            TextEncoding::Windows1252.decode(b"\x8A\x9F\xFF").as_deref(),
            Some("\u{160}\u{178}\u{FF}")
        );
    }

    #[test]
    fn reported_encoding_is_first_that_succeeds() {
        let tmp = tempdir().unwrap();
        let utf = tmp.path().join("utf.txt");
        let win = tmp.path().join("win.txt");
        let lat = tmp.path().join("lat.txt");
        fs::write(&utf, "héllo").unwrap();
        fs::write(&win, b"caf\xE9 \x80").unwrap();
        fs::write(&lat, b"x\x8Dy").unwrap();

        let batch = FileReader::default().read_files(&[&utf, &win, &lat]);
        let encodings: Vec<_> = batch.files.iter().map(|f| f.encoding).collect();
        assert_eq!(
            encodings,
            vec![TextEncoding::Utf8, TextEncoding::Windows1252, TextEncoding::Latin1]
        );
        assert_eq!(batch.get(&win).unwrap().content, "café €");
    }
}
