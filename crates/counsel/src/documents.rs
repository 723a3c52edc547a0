//! Best-effort text extraction for uploaded reference documents.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

/// Cap on document text stored into a conversation, to keep token usage down.
pub const MAX_DOC_CHARS: usize = 12_000;
/// PDFs are read up to this many pages.
pub const MAX_PDF_PAGES: usize = 40;

const TRUNCATION_MARKER: &str = "\n[TRUNCATED]";

/// Extract plain text from a `.txt`, `.md` or `.pdf` file.
pub fn extract_text(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "txt" | "md" => {
            let raw = fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(String::from_utf8_lossy(&raw).into_owned())
        }
        "pdf" => extract_pdf(path),
        other => Err(anyhow!("unsupported document type: '{}'", other)),
    }
}

fn extract_pdf(path: &Path) -> Result<String> {
    let document = lopdf::Document::load(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let pages: Vec<u32> = document
        .get_pages()
        .keys()
        .copied()
        .take(MAX_PDF_PAGES)
        .collect();
    document
        .extract_text(&pages)
        .map_err(|e| anyhow!("failed to extract text from {}: {}", path.display(), e))
}

/// Cap extracted text at [`MAX_DOC_CHARS`] characters, marking the cut.
pub fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_DOC_CHARS) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
    }
}
