use std::hash::{Hash, Hasher};

use twox_hash::XxHash64;

/// Cheap fingerprint used to skip re-analysing identical text.
pub fn compute_content_hash(content: &str) -> u64 {
    let mut hasher = XxHash64::default();
    content.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_text_hashes_equal() {
        assert_eq!(compute_content_hash("local a = 1; a"), compute_content_hash("local a = 1; a"));
        assert_ne!(compute_content_hash("local a = 1; a"), compute_content_hash("local a = 2; a"));
    }
}
