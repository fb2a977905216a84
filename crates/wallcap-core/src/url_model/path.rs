//! Photo display names from photo page URLs.

/// Last non-empty path segment of a photo page URL, absolute or relative
/// (`/photo/1234/misty-morning` → `misty-morning`). Query and fragment are ignored.
pub fn photo_display_name(url: &str) -> Option<String> {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(|c| c == '?' || c == '#')
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    let segment = path.split('/').filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}
