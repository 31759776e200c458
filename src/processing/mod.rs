//! Optional image-processing collaborators.
//!
//! This module only defines the contract the API consumes: something
//! that can suggest tags for an image and pull text out of it. The
//! default implementation is disabled and returns nothing; plugging in a
//! real classifier or OCR backend means implementing [`ImageProcessor`].
//!
//! The search function is a literal keyword matcher, not semantic search.

use std::path::Path;

use serde::Serialize;

/// Contract for auto-tagging / OCR backends.
///
/// Implementations never propagate errors: a missing file, a missing
/// model or a backend failure all come back as an empty result.
pub trait ImageProcessor: Send + Sync {
    /// Suggest up to `max_tags` tags for the image at `image_path`.
    fn auto_tag(&self, image_path: &Path, max_tags: usize) -> Vec<String>;

    /// Extract visible text from the image at `image_path`.
    fn extract_text(&self, image_path: &Path) -> String;

    /// Backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// Default backend: processing is switched off.
pub struct DisabledProcessor;

impl ImageProcessor for DisabledProcessor {
    fn auto_tag(&self, _image_path: &Path, _max_tags: usize) -> Vec<String> {
        Vec::new()
    }

    fn extract_text(&self, _image_path: &Path) -> String {
        String::new()
    }

    fn backend_name(&self) -> &'static str {
        "disabled"
    }
}

/// One record's searchable text: its path, tag set and extracted text.
#[derive(Debug, Clone, Serialize)]
pub struct SearchEntry {
    pub path: String,
    pub tags: Vec<String>,
    pub extracted_text: String,
}

/// Keyword-matching search placeholder.
///
/// Returns the paths of entries where every whitespace-split query token
/// appears in some tag (case-insensitively), or where the whole query is
/// a case-insensitive substring of the extracted text.
pub fn keyword_search(query: &str, entries: &[SearchEntry]) -> Vec<String> {
    let query_lower = query.to_lowercase();
    let tokens: Vec<&str> = query_lower.split_whitespace().collect();

    entries
        .iter()
        .filter(|entry| {
            let tags_lower: Vec<String> =
                entry.tags.iter().map(|t| t.to_lowercase()).collect();
            let found_in_tags = tokens
                .iter()
                .all(|token| tags_lower.iter().any(|tag| tag.contains(token)));
            let found_in_text = entry.extracted_text.to_lowercase().contains(&query_lower);
            found_in_tags || found_in_text
        })
        .map(|entry| entry.path.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, tags: &[&str], text: &str) -> SearchEntry {
        SearchEntry {
            path: path.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            extracted_text: text.to_string(),
        }
    }

    fn fixtures() -> Vec<SearchEntry> {
        vec![
            entry("cat.jpg", &["cat", "animal", "pet"], "my cute cat"),
            entry("party.png", &["birthday", "party", "cake"], "Happy Birthday!"),
            entry("park.jpeg", &["park", "tree", "nature"], "a lovely day in the park"),
        ]
    }

    #[test]
    fn every_token_must_match_a_tag() {
        let results = keyword_search("cat pet", &fixtures());
        assert_eq!(results, vec!["cat.jpg"]);

        // one matching token is not enough
        assert!(keyword_search("cat spaceship", &fixtures()).is_empty());
    }

    #[test]
    fn tag_matching_is_case_insensitive() {
        let results = keyword_search("BIRTHDAY", &fixtures());
        assert_eq!(results, vec!["party.png"]);
    }

    #[test]
    fn whole_query_matches_extracted_text() {
        // no tag contains both words, but the OCR text carries the phrase
        let results = keyword_search("cute cat", &fixtures());
        assert_eq!(results, vec!["cat.jpg"]);
    }

    #[test]
    fn no_match_returns_empty() {
        assert!(keyword_search("submarine", &fixtures()).is_empty());
    }

    #[test]
    fn disabled_processor_returns_nothing() {
        let processor = DisabledProcessor;
        assert!(processor.auto_tag(Path::new("/missing.jpg"), 5).is_empty());
        assert!(processor.extract_text(Path::new("/missing.jpg")).is_empty());
    }
}
