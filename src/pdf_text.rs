use anyhow::Result;
use tracing::debug;

/// Extract plain text from PDF bytes using `pdf-extract`.
///
/// Scanned or image-only documents come back empty; that is treated as an
/// error so callers can skip the file instead of storing an unusable
/// material.
pub fn extract_text(data: &[u8]) -> Result<String> {
    let text = pdf_extract::extract_text_from_mem(data)
        .map_err(|e| anyhow::anyhow!("PDF text extraction failed: {}", e))?;

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(anyhow::anyhow!("PDF contains no extractable text"));
    }

    debug!(
        byte_count = data.len(),
        text_length = trimmed.len(),
        "Extracted text from PDF"
    );

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_bytes_are_rejected() {
        assert!(extract_text(b"definitely not a pdf").is_err());
        assert!(extract_text(&[]).is_err());
    }
}
