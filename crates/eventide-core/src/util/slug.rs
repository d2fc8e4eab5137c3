//! Slug generation for event URLs.
//!
//! ## Summary
//! Slugs are lowercase ASCII words joined by hyphens. Events split off into
//! variations get a suffixed slug so both events stay addressable.

/// Generate a URL-safe slug from an event title.
///
/// Examples:
/// - "Summer Lecture Series" -> "summer-lecture-series"
/// - "Kids' Art Club" -> "kids-art-club"
/// - "Music & Dance" -> "music-dance"
#[must_use]
pub fn generate_slug(title: &str) -> String {
    let slug = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        "event".to_string()
    } else if uuid::Uuid::parse_str(&slug).is_ok() {
        // Keep slugs distinguishable from event ids in URLs
        format!("event-{slug}")
    } else {
        slug
    }
}

/// Derive the slug of a variation split off from `base_slug`.
///
/// The suffix comes from the variation's id so repeated splits of the same
/// event never collide.
#[must_use]
pub fn variation_slug(base_slug: &str, variation_id: uuid::Uuid) -> String {
    let simple = variation_id.simple().to_string();
    let suffix = simple.get(simple.len().saturating_sub(8)..).unwrap_or(&simple);
    format!("{base_slug}-{suffix}")
}
