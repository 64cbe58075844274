use serde::Deserialize;
use url::Url;

use crate::error::{CatalogError, CatalogResult};
use crate::model::SlotId;

/// Body returned by the advert server when the requested app id is
/// unknown. Treated as a failed fetch rather than an empty catalog.
pub const SERVER_ERROR_MARKER: &str = "There was an error";

/// Raw manifest document as served, one entry per slot letter.
#[derive(Debug, Deserialize)]
pub struct ManifestDoc {
    #[serde(default)]
    pub slots: Vec<ManifestSlot>,
}

#[derive(Debug, Deserialize)]
pub struct ManifestSlot {
    pub slotid: String,
    #[serde(default)]
    pub adid: i64,
    #[serde(default)]
    pub updatetime: i64,
    #[serde(default)]
    pub active: bool,
    pub adurl: String,
    pub imgurl: String,
}

/// How the advertised app's package name is carried inside `adurl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageSource {
    /// Android store links carry it as the `id` query parameter.
    QueryParam,
    /// iOS links carry it after a `#` fragment.
    UrlFragment,
    /// No structured carrier, the full URL stands in as the name.
    FullUrl,
}

pub fn parse_manifest(body: &[u8]) -> CatalogResult<ManifestDoc> {
    let text = std::str::from_utf8(body)
        .map_err(|e| CatalogError::parse(format!("manifest is not UTF-8: {e}")))?;
    if text.trim().is_empty() {
        return Err(CatalogError::parse("manifest body is empty"));
    }
    if text.contains(SERVER_ERROR_MARKER) {
        return Err(CatalogError::parse("server reported an error for this app id"));
    }
    let doc: ManifestDoc =
        serde_json::from_str(text).map_err(|e| CatalogError::Parse(e.to_string()))?;
    if doc.slots.is_empty() {
        return Err(CatalogError::parse("manifest contains no slots"));
    }
    Ok(doc)
}

/// Splits `"1a"` into slot number 1, letter `a`. One or more digits
/// followed by exactly one lowercase letter; anything else is rejected
/// and the whole manifest with it.
pub fn parse_slot_id(raw: &str) -> CatalogResult<SlotId> {
    let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
    let rest = &raw[digits.len()..];
    let number: u32 = digits
        .parse()
        .map_err(|_| CatalogError::SlotId(raw.to_string()))?;
    let mut rest_chars = rest.chars();
    match (rest_chars.next(), rest_chars.next()) {
        (Some(letter), None) if letter.is_ascii_lowercase() => Ok(SlotId::new(number, letter)),
        _ => Err(CatalogError::SlotId(raw.to_string())),
    }
}

/// Upgrades plain-http URLs in place; the advert server redirects them
/// anyway and mobile webviews refuse mixed content.
pub fn to_https(url: &str) -> String {
    url.replace("http://", "https://")
}

pub fn extract_package_name(ad_url: &Url, source: PackageSource) -> String {
    match source {
        PackageSource::QueryParam => ad_url
            .query_pairs()
            .find(|(k, _)| k == "id")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default(),
        PackageSource::UrlFragment => ad_url.fragment().unwrap_or_default().to_string(),
        PackageSource::FullUrl => ad_url.as_str().to_string(),
    }
}

/// File extension (with leading dot) of the image URL's path segment,
/// ignoring any query string. Defaults to `.png`.
pub fn image_extension(img_url: &Url) -> String {
    img_url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| name.rfind('.').map(|dot| name[dot..].to_lowercase()))
        .filter(|ext| ext.len() > 1)
        .unwrap_or_else(|| ".png".to_string())
}

/// Deterministic on-disk name for a slot's image, stable across
/// sessions so the cache survives restarts.
pub fn cache_file_name(id: SlotId, img_url: &Url) -> String {
    format!("ias_{id}{}", image_extension(img_url))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("1a", 1, 'a')]
    #[case("2b", 2, 'b')]
    #[case("12c", 12, 'c')]
    fn slot_ids_parse(#[case] raw: &str, #[case] number: u32, #[case] letter: char) {
        let id = parse_slot_id(raw).unwrap();
        assert_eq!(id.number, number);
        assert_eq!(id.letter, letter);
    }

    #[rstest]
    #[case("a1")]
    #[case("1")]
    #[case("1ab")]
    #[case("1A")]
    #[case("")]
    fn malformed_slot_ids_are_rejected(#[case] raw: &str) {
        assert!(parse_slot_id(raw).is_err());
    }

    #[test]
    fn server_error_body_fails_parse() {
        let err = parse_manifest(b"There was an error").unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[test]
    fn empty_body_fails_parse() {
        assert!(parse_manifest(b"  ").is_err());
    }

    #[test]
    fn manifest_without_slots_fails_parse() {
        assert!(parse_manifest(br#"{"slots":[]}"#).is_err());
    }

    #[test]
    fn package_name_from_query_param() {
        let url = Url::parse("https://play.google.com/store/apps/details?id=com.pickle.game").unwrap();
        assert_eq!(
            extract_package_name(&url, PackageSource::QueryParam),
            "com.pickle.game"
        );
    }

    #[test]
    fn package_name_from_fragment() {
        let url = Url::parse("https://itunes.apple.com/app/id123#com.pickle.game").unwrap();
        assert_eq!(
            extract_package_name(&url, PackageSource::UrlFragment),
            "com.pickle.game"
        );
    }

    #[test]
    fn package_name_falls_back_to_full_url() {
        let url = Url::parse("https://example.com/landing").unwrap();
        assert_eq!(
            extract_package_name(&url, PackageSource::FullUrl),
            "https://example.com/landing"
        );
    }

    #[test]
    fn missing_query_param_gives_empty_name() {
        let url = Url::parse("https://play.google.com/store/apps/details?ref=x").unwrap();
        assert_eq!(extract_package_name(&url, PackageSource::QueryParam), "");
    }

    #[rstest]
    #[case("https://cdn.example.com/uploads/adverts/foo.jpg", ".jpg")]
    #[case("https://cdn.example.com/uploads/adverts/foo.PNG?v=2", ".png")]
    #[case("https://cdn.example.com/uploads/adverts/foo", ".png")]
    fn image_extensions(#[case] url: &str, #[case] expected: &str) {
        let url = Url::parse(url).unwrap();
        assert_eq!(image_extension(&url), expected);
    }

    #[test]
    fn cache_file_names_are_deterministic() {
        let url = Url::parse("https://cdn.example.com/adverts/banner.jpg").unwrap();
        assert_eq!(cache_file_name(SlotId::new(1, 'a'), &url), "ias_1a.jpg");
    }

    #[test]
    fn http_urls_are_upgraded() {
        assert_eq!(
            to_https("http://ias.example.com/ad/1.json"),
            "https://ias.example.com/ad/1.json"
        );
    }
}
