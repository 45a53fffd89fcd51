//! Published diagram images.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata about an image stored alongside a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub name: String,
    pub size_in_bytes: u64,
    pub last_modified_date: DateTime<Utc>,
}

/// Image bytes together with their detected content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageContent {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Returns true for file names the image listing includes (`.png`, `.svg`).
pub fn is_image_filename(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".png") || lower.ends_with(".svg")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_filename() {
        assert!(is_image_filename("diagram.png"));
        assert!(is_image_filename("Diagram.SVG"));
        assert!(!is_image_filename("diagram.jpg"));
        assert!(!is_image_filename("png"));
    }
}
