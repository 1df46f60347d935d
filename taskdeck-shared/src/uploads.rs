/// Attachment ingestion policy
///
/// Validation and naming rules applied to every uploaded file before the
/// task service stores it:
///
/// - at most [`MAX_FILES_PER_CALL`] files per call
/// - at most [`MAX_FILE_BYTES`] per file
/// - the file extension AND the declared media type must both be on the
///   allow-list (a mismatched pair fails even if each is individually
///   plausible)
/// - stored filenames are system-generated and collision-resistant;
///   original names are display-only and sanitized
///
/// # Example
///
/// ```
/// use taskdeck_shared::uploads::{validate_batch, UploadedFile};
/// use bytes::Bytes;
///
/// let files = vec![UploadedFile {
///     original_name: "report.pdf".to_string(),
///     content_type: "application/pdf".to_string(),
///     data: Bytes::from_static(b"%PDF-1.4"),
/// }];
///
/// assert!(validate_batch(&files).is_ok());
/// ```

use bytes::Bytes;
use rand::{distributions::Alphanumeric, Rng};

/// Maximum number of files accepted in one call
pub const MAX_FILES_PER_CALL: usize = 10;

/// Maximum size of a single file (5 MiB)
pub const MAX_FILE_BYTES: usize = 5 * 1024 * 1024;

/// Extensions accepted for upload (lowercase, no dot)
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "jpeg", "jpg", "png", "gif", "pdf", "doc", "docx", "txt", "zip", "rar",
];

/// Declared media types accepted for upload
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
    "application/zip",
    "application/x-rar-compressed",
];

/// One incoming file, as extracted from the multipart body
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied filename
    pub original_name: String,

    /// Client-declared media type
    pub content_type: String,

    /// File contents
    pub data: Bytes,
}

/// Error type for upload validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    /// The call carried no files at all
    #[error("No files uploaded")]
    NoFiles,

    /// More than [`MAX_FILES_PER_CALL`] files in one call
    #[error("Too many files: {count} exceeds the limit of {MAX_FILES_PER_CALL}")]
    TooManyFiles { count: usize },

    /// A file exceeds [`MAX_FILE_BYTES`]
    #[error("File '{name}' is too large: {size} bytes exceeds the 5MB limit")]
    FileTooLarge { name: String, size: usize },

    /// Extension or declared media type is not on the allow-list
    #[error("File type not allowed for '{name}'")]
    DisallowedType { name: String },
}

/// Validates a whole upload call
///
/// Rejects the call wholesale: if any file fails, none are accepted.
///
/// # Errors
///
/// Returns the first violation found
pub fn validate_batch(files: &[UploadedFile]) -> Result<(), UploadError> {
    if files.is_empty() {
        return Err(UploadError::NoFiles);
    }

    if files.len() > MAX_FILES_PER_CALL {
        return Err(UploadError::TooManyFiles { count: files.len() });
    }

    for file in files {
        validate_file(file)?;
    }

    Ok(())
}

/// Validates a single file against size and type rules
///
/// Both the extension and the declared media type must pass; checking only
/// one would let a renamed executable through.
///
/// # Errors
///
/// Returns `FileTooLarge` or `DisallowedType`
pub fn validate_file(file: &UploadedFile) -> Result<(), UploadError> {
    if file.data.len() > MAX_FILE_BYTES {
        return Err(UploadError::FileTooLarge {
            name: file.original_name.clone(),
            size: file.data.len(),
        });
    }

    let extension_ok = file_extension(&file.original_name)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false);

    let content_type_ok = ALLOWED_CONTENT_TYPES.contains(&file.content_type.as_str());

    if !extension_ok || !content_type_ok {
        return Err(UploadError::DisallowedType {
            name: file.original_name.clone(),
        });
    }

    Ok(())
}

/// Extracts the lowercased extension of a filename, without the dot
pub fn file_extension(name: &str) -> Option<String> {
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Generates a collision-resistant stored filename
///
/// Shape: `{millisecond timestamp}-{random alphanumeric suffix}.{ext}`,
/// with the extension taken (sanitized) from the original name and
/// omitted when the original has none.
pub fn generate_stored_filename(original_name: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();

    match file_extension(original_name) {
        Some(ext) => format!("{}-{}.{}", millis, suffix, ext),
        None => format!("{}-{}", millis, suffix),
    }
}

/// Sanitizes a display filename
///
/// Keeps only the final path component and strips characters that are
/// unsafe in paths or headers.
pub fn sanitize_display_name(name: &str) -> String {
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name);

    name.chars()
        .filter(|c| !c.is_control() && !matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect()
}

/// Best-effort repair of latin-1-mangled original filenames
///
/// Some clients transmit non-ASCII names one byte per character; the
/// received string then holds each UTF-8 byte as its own char. If every
/// char fits in a byte and the byte sequence is valid UTF-8, the
/// reinterpretation is returned. Otherwise the raw name is kept — this is
/// a heuristic, not a guarantee.
pub fn decode_original_name(raw: &str) -> String {
    // Pure-ASCII names cannot have been mangled
    if raw.is_ascii() {
        return raw.to_string();
    }

    let bytes: Option<Vec<u8>> = raw
        .chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect();

    match bytes {
        Some(bytes) => String::from_utf8(bytes).unwrap_or_else(|_| raw.to_string()),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, content_type: &str, size: usize) -> UploadedFile {
        UploadedFile {
            original_name: name.to_string(),
            content_type: content_type.to_string(),
            data: Bytes::from(vec![0u8; size]),
        }
    }

    #[test]
    fn test_empty_batch_rejected() {
        assert_eq!(validate_batch(&[]), Err(UploadError::NoFiles));
    }

    #[test]
    fn test_batch_of_ten_accepted_eleven_rejected() {
        let ten: Vec<_> = (0..10).map(|_| file("a.txt", "text/plain", 10)).collect();
        assert!(validate_batch(&ten).is_ok());

        let eleven: Vec<_> = (0..11).map(|_| file("a.txt", "text/plain", 10)).collect();
        assert_eq!(
            validate_batch(&eleven),
            Err(UploadError::TooManyFiles { count: 11 })
        );
    }

    #[test]
    fn test_size_boundary() {
        // Exactly 5MB is accepted
        let at_limit = file("big.pdf", "application/pdf", MAX_FILE_BYTES);
        assert!(validate_file(&at_limit).is_ok());

        // One more byte is rejected
        let over = file("big.pdf", "application/pdf", MAX_FILE_BYTES + 1);
        assert!(matches!(
            validate_file(&over),
            Err(UploadError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_both_checks_must_pass() {
        // Allowed extension, disallowed declared type
        let renamed_exe = file("report.pdf", "application/x-msdownload", 10);
        assert!(matches!(
            validate_file(&renamed_exe),
            Err(UploadError::DisallowedType { .. })
        ));

        // Disallowed extension, allowed declared type
        let wrong_ext = file("script.exe", "application/pdf", 10);
        assert!(matches!(
            validate_file(&wrong_ext),
            Err(UploadError::DisallowedType { .. })
        ));

        // Both allowed
        let ok = file("report.pdf", "application/pdf", 10);
        assert!(validate_file(&ok).is_ok());
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let upper = file("PHOTO.JPG", "image/jpeg", 10);
        assert!(validate_file(&upper).is_ok());
    }

    #[test]
    fn test_no_extension_rejected() {
        let bare = file("README", "text/plain", 10);
        assert!(matches!(
            validate_file(&bare),
            Err(UploadError::DisallowedType { .. })
        ));

        // A lone-dot name has no usable extension either
        assert_eq!(file_extension(".gitignore"), None);
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("a.txt"), Some("txt".to_string()));
        assert_eq!(file_extension("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(file_extension("dir/photo.PNG"), Some("png".to_string()));
        assert_eq!(file_extension("noext"), None);
        assert_eq!(file_extension("trailing."), None);
    }

    #[test]
    fn test_stored_filename_shape() {
        let name = generate_stored_filename("report.pdf");
        assert!(name.ends_with(".pdf"));

        let (prefix, _) = name.rsplit_once('.').unwrap();
        let (millis, suffix) = prefix.split_once('-').unwrap();
        assert!(millis.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(suffix.len(), 9);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_stored_filenames_are_unique() {
        let a = generate_stored_filename("a.txt");
        let b = generate_stored_filename("a.txt");
        assert_ne!(a, b);
    }

    #[test]
    fn test_stored_filename_without_extension() {
        let name = generate_stored_filename("README");
        assert!(!name.contains('.'));
    }

    #[test]
    fn test_sanitize_display_name() {
        assert_eq!(sanitize_display_name("report.pdf"), "report.pdf");
        assert_eq!(sanitize_display_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_display_name("dir\\evil.txt"), "evil.txt");
        assert_eq!(sanitize_display_name("a<b>c|d.txt"), "abcd.txt");
        assert_eq!(sanitize_display_name("tab\there.txt"), "tabhere.txt");
    }

    #[test]
    fn test_decode_original_name_repairs_mangled_utf8() {
        // "café.txt" transmitted one byte per char arrives as "cafÃ©.txt"
        let mangled = "caf\u{c3}\u{a9}.txt";
        assert_eq!(decode_original_name(mangled), "café.txt");
    }

    #[test]
    fn test_decode_original_name_keeps_ascii() {
        assert_eq!(decode_original_name("plain.txt"), "plain.txt");
    }

    #[test]
    fn test_decode_original_name_keeps_undecodable_raw() {
        // Chars above U+00FF cannot be byte-reinterpreted
        assert_eq!(decode_original_name("日本語.txt"), "日本語.txt");

        // Fits in bytes but is not valid UTF-8: keep the raw name
        let not_utf8 = "na\u{ef}ve.txt";
        assert_eq!(decode_original_name(not_utf8), not_utf8);
    }
}
