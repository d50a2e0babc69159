//! Attachment file rules: accepted types, size cap and on-disk naming.
//!
//! A file is accepted only when its extension and its leading bytes agree on
//! one of the supported kinds. Stored names are `{millis}-{sanitized name}`.

use std::path::{Path, PathBuf};

/// Directory under the upload root holding child attachments.
pub const ATTACHMENT_SUBDIR: &str = "lampiran";

/// Public URL prefix recorded in the attachment section.
pub const URL_PREFIX: &str = "/uploads/lampiran/";

pub const MAX_FILE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
  Pdf,
  Jpeg,
  Png,
  Doc,
  Docx,
}

impl FileKind {
  pub fn from_extension(name: &str) -> Option<Self> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
      "pdf" => Some(FileKind::Pdf),
      "jpg" | "jpeg" => Some(FileKind::Jpeg),
      "png" => Some(FileKind::Png),
      "doc" => Some(FileKind::Doc),
      "docx" => Some(FileKind::Docx),
      _ => None,
    }
  }

  /// Identify the content from its magic bytes.
  pub fn sniff(bytes: &[u8]) -> Option<Self> {
    if bytes.starts_with(b"%PDF") {
      Some(FileKind::Pdf)
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
      Some(FileKind::Jpeg)
    } else if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
      Some(FileKind::Png)
    } else if bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]) {
      // OLE compound document
      Some(FileKind::Doc)
    } else if bytes.starts_with(b"PK\x03\x04") {
      Some(FileKind::Docx)
    } else {
      None
    }
  }
}

/// Why an uploaded file was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
  TooLarge,
  UnsupportedType,
  ContentMismatch,
}

impl Refusal {
  pub fn message(&self, field: &str) -> String {
    match self {
      Refusal::TooLarge => format!("File {field} melebihi batas 5MB"),
      Refusal::UnsupportedType => {
        format!("Tipe file {field} tidak didukung. Gunakan PDF, JPG, PNG, DOC atau DOCX")
      }
      Refusal::ContentMismatch => format!("Isi file {field} tidak sesuai dengan ekstensinya"),
    }
  }
}

/// Check one upload before anything touches the disk.
pub fn check(name: &str, bytes: &[u8]) -> Result<FileKind, Refusal> {
  if bytes.len() > MAX_FILE_BYTES {
    return Err(Refusal::TooLarge);
  }
  let kind = FileKind::from_extension(name).ok_or(Refusal::UnsupportedType)?;
  match FileKind::sniff(bytes) {
    Some(found) if found == kind => Ok(kind),
    _ => Err(Refusal::ContentMismatch),
  }
}

/// Keep the basename, turn whitespace into `_` and drop anything that is not
/// alphanumeric, `.`, `-` or `_`.
pub fn sanitize(name: &str) -> String {
  let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
  let cleaned: String = base
    .chars()
    .filter_map(|c| match c {
      c if c.is_whitespace() => Some('_'),
      c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => Some(c),
      _ => None,
    })
    .collect();
  let cleaned = cleaned.trim_start_matches('.');
  if cleaned.is_empty() { "file".to_owned() } else { cleaned.to_owned() }
}

pub fn stored_name(millis: i64, original: &str) -> String { format!("{millis}-{}", sanitize(original)) }

/// A download name must be a single plain path segment.
pub fn is_safe_name(name: &str) -> bool {
  !name.is_empty() && !name.contains("..") && !name.contains('/') && !name.contains('\\')
}

/// The name offered to the browser: the stored name minus its timestamp.
pub fn display_name(stored: &str) -> &str {
  match stored.split_once('-') {
    Some((prefix, rest)) if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) => rest,
    _ => stored,
  }
}

/// Where the file behind a recorded URL lives, if the URL names one safely.
pub fn path_for_url(dir: &Path, url: &str) -> Option<PathBuf> {
  let name = url.rsplit('/').next()?;
  is_safe_name(name).then(|| dir.join(name))
}
