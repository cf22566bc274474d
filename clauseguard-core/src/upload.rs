use std::time::Duration;

use thiserror::Error;

pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptedType {
    pub mime: &'static str,
    pub extension: &'static str,
}

pub const ACCEPTED_TYPES: [AcceptedType; 4] = [
    AcceptedType {
        mime: "application/pdf",
        extension: "pdf",
    },
    AcceptedType {
        mime: "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        extension: "docx",
    },
    AcceptedType {
        mime: "application/msword",
        extension: "doc",
    },
    AcceptedType {
        mime: "text/plain",
        extension: "txt",
    },
];

/// A file picked by the user, before any bytes are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub filename: String,
    pub mime_type: Option<String>,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("File is too large. Maximum size is 10MB.")]
    TooLarge { size_bytes: u64, max_bytes: u64 },

    #[error("Invalid file type. Please upload PDF, DOCX, DOC, or TXT files.")]
    InvalidType {
        filename: String,
        mime_type: Option<String>,
    },

    #[error("File upload failed. Please try again.")]
    Other { reason: String },
}

fn extension_of(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

fn essence(mime: &str) -> String {
    // Drop parameters such as `; charset=utf-8`.
    mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

/// Looks the file up in the allow-list by MIME type first, then by extension.
pub fn accepted_type_for(filename: &str, mime_type: Option<&str>) -> Option<&'static AcceptedType> {
    if let Some(mime) = mime_type.map(essence).filter(|m| !m.is_empty()) {
        if let Some(t) = ACCEPTED_TYPES.iter().find(|t| t.mime == mime) {
            return Some(t);
        }
    }
    let ext = extension_of(filename)?;
    ACCEPTED_TYPES.iter().find(|t| t.extension == ext)
}

/// Checks one candidate against the size limit and the type allow-list.
///
/// Size is checked first, so an oversized file of the wrong type reports the
/// size problem.
pub fn validate_upload(candidate: &FileCandidate) -> Result<&'static AcceptedType, UploadRejection> {
    if candidate.filename.trim().is_empty() {
        return Err(UploadRejection::Other {
            reason: "missing file name".into(),
        });
    }

    if candidate.size_bytes > MAX_UPLOAD_BYTES {
        return Err(UploadRejection::TooLarge {
            size_bytes: candidate.size_bytes,
            max_bytes: MAX_UPLOAD_BYTES,
        });
    }

    accepted_type_for(&candidate.filename, candidate.mime_type.as_deref()).ok_or_else(|| {
        UploadRejection::InvalidType {
            filename: candidate.filename.clone(),
            mime_type: candidate.mime_type.clone(),
        }
    })
}

/// Single-file selection: nothing picked is `Ok(None)`, more than one is rejected.
pub fn select_single(files: &[FileCandidate]) -> Result<Option<&FileCandidate>, UploadRejection> {
    match files {
        [] => Ok(None),
        [one] => validate_upload(one).map(|_| Some(one)),
        _ => Err(UploadRejection::Other {
            reason: "only one file can be uploaded at a time".into(),
        }),
    }
}

/// Estimated upload progress; the transport gives no byte-level feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadProgress {
    percent: u8,
}

impl UploadProgress {
    pub const STEP: u8 = 10;
    pub const CEILING: u8 = 90;
    pub const TICK: Duration = Duration::from_millis(200);

    pub fn new() -> Self {
        Self::default()
    }

    pub fn percent(self) -> u8 {
        self.percent
    }

    /// Advances one step while the request is in flight; stalls at the ceiling.
    pub fn tick(&mut self) -> bool {
        if self.percent >= Self::CEILING {
            return false;
        }
        self.percent = (self.percent + Self::STEP).min(Self::CEILING);
        true
    }

    pub fn complete(&mut self) {
        self.percent = 100;
    }

    pub fn reset(&mut self) {
        self.percent = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, mime: Option<&str>, size: u64) -> FileCandidate {
        FileCandidate {
            filename: name.into(),
            mime_type: mime.map(str::to_string),
            size_bytes: size,
        }
    }

    #[test]
    fn accepts_pdf_under_limit() {
        let t = validate_upload(&file("lease.pdf", Some("application/pdf"), 2 * 1024 * 1024)).unwrap();
        assert_eq!(t.extension, "pdf");
    }

    #[test]
    fn accepts_by_extension_when_mime_is_generic() {
        let t = validate_upload(&file("Notes.TXT", Some("application/octet-stream"), 10)).unwrap();
        assert_eq!(t.mime, "text/plain");
        let t = validate_upload(&file("offer.docx", None, 10)).unwrap();
        assert_eq!(t.extension, "docx");
    }

    #[test]
    fn rejects_oversized_files_with_size_message() {
        for size in [MAX_UPLOAD_BYTES + 1, 50 * 1024 * 1024, u64::MAX] {
            let err = validate_upload(&file("big.pdf", Some("application/pdf"), size)).unwrap_err();
            assert!(matches!(err, UploadRejection::TooLarge { .. }));
            assert_eq!(err.to_string(), "File is too large. Maximum size is 10MB.");
        }
        assert!(validate_upload(&file("edge.pdf", None, MAX_UPLOAD_BYTES)).is_ok());
    }

    #[test]
    fn rejects_unknown_types_with_type_message() {
        for (name, mime) in [
            ("malware.exe", Some("application/x-msdownload")),
            ("photo.png", Some("image/png")),
            ("README", None),
        ] {
            let err = validate_upload(&file(name, mime, 100)).unwrap_err();
            assert!(matches!(err, UploadRejection::InvalidType { .. }), "{name}");
            assert!(err.to_string().starts_with("Invalid file type"));
        }
    }

    #[test]
    fn mime_parameters_are_ignored() {
        assert!(accepted_type_for("x", Some("text/plain; charset=utf-8")).is_some());
    }

    #[test]
    fn selecting_many_files_is_rejected() {
        let files = vec![file("a.pdf", None, 1), file("b.pdf", None, 1)];
        let err = select_single(&files).unwrap_err();
        assert_eq!(err.to_string(), "File upload failed. Please try again.");
        assert_eq!(select_single(&[]).unwrap(), None);
    }

    #[test]
    fn progress_is_monotonic_and_capped() {
        let mut p = UploadProgress::new();
        let mut last = 0;
        for _ in 0..20 {
            p.tick();
            assert!(p.percent() >= last);
            last = p.percent();
        }
        assert_eq!(p.percent(), UploadProgress::CEILING);
        p.complete();
        assert_eq!(p.percent(), 100);
        p.reset();
        assert_eq!(p.percent(), 0);
    }
}
