use crate::error::CoreError;
use std::fs;
use std::path::Path;

/// Read the source rules document as text.
///
/// Plain text files are read as UTF-8; anything not decodable is a
/// `Parse` error, never a panic. With the `pdf` feature a `.pdf` path is
/// run through text extraction first.
pub fn load_document(path: &Path) -> Result<String, CoreError> {
    #[cfg(feature = "pdf")]
    if path.extension().and_then(|e| e.to_str()) == Some("pdf") {
        return pdf_extract::extract_text(path)
            .map_err(|e| CoreError::Parse(format!("pdf extraction failed: {e}")));
    }

    let bytes = fs::read(path)
        .map_err(|e| CoreError::Parse(format!("cannot read {}: {e}", path.display())))?;
    String::from_utf8(bytes).map_err(|_| {
        CoreError::Parse(format!("{} is not valid UTF-8 text", path.display()))
    })
}
