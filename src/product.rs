use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use tracing::debug;

const PAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

const COLORS: &[&str] = &[
    "black", "white", "red", "blue", "green", "yellow", "brown", "gray", "grey", "beige", "tan",
    "pink", "orange", "purple", "navy", "maroon", "olive",
];

// Ordered so that more specific names win ("t-shirt" before "shirt").
const GARMENT_TYPES: &[&str] = &[
    "hoodie", "sweater", "t-shirt", "shirt", "jacket", "coat", "blouse", "top",
];

fn color_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"\b({})\b", COLORS.join("|"))).expect("valid color pattern")
    })
}

fn brand_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)brand[:\s]+([A-Za-z0-9'&-]{2,})").expect("valid brand pattern"))
}

/// Best-effort garment image discovery for a product page: the `og:image`
/// meta tag, falling back to the last `<img>` on the page (product shots
/// tend to come after chrome and icons).
pub async fn resolve_product_image(client: &reqwest::Client, product_url: &str) -> Option<String> {
    let response = client
        .get(product_url)
        .timeout(PAGE_FETCH_TIMEOUT)
        .send()
        .await
        .ok()?;
    if !response.status().is_success() {
        debug!(url = %product_url, status = %response.status(), "product page fetch failed");
        return None;
    }
    let html = response.text().await.ok()?;
    extract_og_image(&html)
}

pub fn extract_og_image(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let og = Selector::parse(r#"meta[property="og:image"], meta[name="og:image"]"#).ok()?;
    if let Some(element) = document.select(&og).next() {
        if let Some(content) = element.value().attr("content") {
            if !content.trim().is_empty() {
                return Some(content.trim().to_string());
            }
        }
    }

    let img = Selector::parse("img").ok()?;
    let mut best = None;
    for element in document.select(&img) {
        let src = element
            .value()
            .attr("src")
            .or_else(|| element.value().attr("data-src"));
        if let Some(src) = src {
            if !src.trim().is_empty() {
                best = Some(src.trim().to_string());
            }
        }
    }
    best
}

/// Naive product attribute extraction from URL or title text: first color
/// word, first garment type substring, and a `brand:` token when present.
pub fn extract_attrs(text: &str) -> Map<String, Value> {
    let lower = text.to_lowercase();
    let mut attrs = Map::new();

    if let Some(captures) = color_regex().captures(&lower) {
        if let Some(color) = captures.get(1) {
            attrs.insert("color".to_string(), Value::String(color.as_str().to_string()));
        }
    }

    if let Some(garment_type) = GARMENT_TYPES.iter().find(|t| lower.contains(*t)) {
        attrs.insert(
            "type".to_string(),
            Value::String((*garment_type).to_string()),
        );
    }

    if let Some(captures) = brand_regex().captures(text) {
        if let Some(brand) = captures.get(1) {
            attrs.insert("brand".to_string(), Value::String(brand.as_str().to_string()));
        }
    }

    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn og_image_wins_over_inline_images() {
        let html = r#"<html><head>
            <meta property="og:image" content="https://shop.example/hero.jpg">
            </head><body><img src="https://shop.example/icon.png"></body></html>"#;
        assert_eq!(
            extract_og_image(html).as_deref(),
            Some("https://shop.example/hero.jpg")
        );
    }

    #[test]
    fn falls_back_to_the_last_img_tag() {
        let html = r#"<html><body>
            <img src="https://shop.example/logo.svg">
            <img data-src="https://shop.example/product-large.jpg">
            </body></html>"#;
        assert_eq!(
            extract_og_image(html).as_deref(),
            Some("https://shop.example/product-large.jpg")
        );
    }

    #[test]
    fn page_without_images_yields_none() {
        assert_eq!(extract_og_image("<html><body><p>hi</p></body></html>"), None);
    }

    #[test]
    fn extracts_color_type_and_brand() {
        let attrs = extract_attrs("Red hoodie, brand: Acme, limited drop");
        assert_eq!(attrs["color"], "red");
        assert_eq!(attrs["type"], "hoodie");
        assert_eq!(attrs["brand"], "Acme");
    }

    #[test]
    fn specific_garment_types_win() {
        let attrs = extract_attrs("classic white t-shirt");
        assert_eq!(attrs["type"], "t-shirt");
    }

    #[test]
    fn color_requires_a_word_boundary() {
        let attrs = extract_attrs("trendy blackout curtains");
        assert!(attrs.get("color").is_none());
    }
}
