use serde::Serialize;

/// Metadata captured for one distinct image.
///
/// A record is created at the image's first sighting and never mutated;
/// later sightings of the same canonical URL are ignored.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
    /// Canonical image URL (the record's identity).
    pub url: String,

    /// Page on which the image was first discovered.
    #[serde(rename = "pageFound")]
    pub page_found: String,

    /// Alt text, when the source element declared one.
    #[serde(rename = "altText")]
    pub alt_text: Option<String>,

    /// Declared width in pixels, -1 when unknown.
    pub width: i32,

    /// Declared height in pixels, -1 when unknown.
    pub height: i32,

    /// Heuristic logo classification.
    #[serde(rename = "isLogo")]
    pub is_logo: bool,
}
