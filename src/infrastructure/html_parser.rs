//! HTML parsing and category extraction for product pages
//!
//! The category of a product is the first entry of the breadcrumb trail
//! rendered at the top of its detail page.

use anyhow::{Result, anyhow};
use scraper::{Html, Selector};
use tracing::debug;

use crate::infrastructure::fetch_error::FetchFailure;

/// CSS selectors locating the breadcrumb trail
#[derive(Debug, Clone)]
pub struct BreadcrumbSelectors {
    /// Container element of the trail
    pub trail: String,
    /// Entries inside the container, in display order
    pub entry: String,
}

impl Default for BreadcrumbSelectors {
    fn default() -> Self {
        Self {
            trail: "#wayfinding-breadcrumbs_feature_div".to_string(),
            entry: "a".to_string(),
        }
    }
}

/// Extracts category labels from product detail pages
#[derive(Debug, Clone)]
pub struct CategoryExtractor {
    trail: Selector,
    entry: Selector,
}

impl CategoryExtractor {
    /// Create a new extractor with the default selectors
    pub fn new() -> Result<Self> {
        Self::with_selectors(&BreadcrumbSelectors::default())
    }

    pub fn with_selectors(selectors: &BreadcrumbSelectors) -> Result<Self> {
        let trail = Selector::parse(&selectors.trail)
            .map_err(|e| anyhow!("Invalid breadcrumb trail selector: {}", e))?;
        let entry = Selector::parse(&selectors.entry)
            .map_err(|e| anyhow!("Invalid breadcrumb entry selector: {}", e))?;

        Ok(Self { trail, entry })
    }

    /// All non-empty trail entries, or `None` when the page has no trail
    ///
    /// Blank links are skipped, so a trail opening with an empty anchor still
    /// yields the first labelled entry instead of the sentinel.
    pub fn extract_trail(&self, html: &str) -> Option<Vec<String>> {
        let document = Html::parse_document(html);
        let container = document.select(&self.trail).next()?;

        let entries = container
            .select(&self.entry)
            .map(|link| clean_text(&link.text().collect::<String>()))
            .filter(|text| !text.is_empty())
            .collect();

        Some(entries)
    }

    /// First breadcrumb entry of the page
    pub fn extract_category(&self, html: &str) -> Result<String, FetchFailure> {
        let trail = self.extract_trail(html).ok_or(FetchFailure::MissingBreadcrumb)?;
        debug!("Breadcrumb trail: {:?}", trail);

        trail
            .into_iter()
            .next()
            .ok_or(FetchFailure::MissingBreadcrumb)
    }
}

/// Collapses runs of whitespace into single spaces
fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT_PAGE: &str = r#"
        <html><body>
          <div id="wayfinding-breadcrumbs_feature_div">
            <ul class="a-unordered-list">
              <li><span><a class="a-link-normal" href="/electronics">
                    Electronics
              </a></span></li>
              <li><span class="a-list-item">›</span></li>
              <li><span><a class="a-link-normal" href="/headphones">Headphones &amp; Earbuds</a></span></li>
            </ul>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_extracts_first_breadcrumb_entry() {
        let extractor = CategoryExtractor::new().unwrap();
        assert_eq!(extractor.extract_category(PRODUCT_PAGE).unwrap(), "Electronics");
        assert_eq!(
            extractor.extract_trail(PRODUCT_PAGE).unwrap(),
            vec!["Electronics".to_string(), "Headphones & Earbuds".to_string()]
        );
    }

    #[test]
    fn test_missing_trail() {
        let extractor = CategoryExtractor::new().unwrap();
        let html = "<html><body><div id='dp-container'>No breadcrumbs</div></body></html>";
        assert_eq!(extractor.extract_trail(html), None);
        assert_eq!(extractor.extract_category(html), Err(FetchFailure::MissingBreadcrumb));
    }

    #[test]
    fn test_trail_without_links() {
        let extractor = CategoryExtractor::new().unwrap();
        let html = r#"<div id="wayfinding-breadcrumbs_feature_div"><a href="/x">   </a></div>"#;
        assert_eq!(extractor.extract_category(html), Err(FetchFailure::MissingBreadcrumb));
    }

    #[test]
    fn test_malformed_markup_does_not_panic() {
        let extractor = CategoryExtractor::new().unwrap();
        let html = "<<<div id=\"wayfinding-breadcrumbs_feature_div\"><a>Garden<a>Tools</div";
        let category = extractor.extract_category(html);
        assert!(category.is_ok() || category == Err(FetchFailure::MissingBreadcrumb));
    }

    #[test]
    fn test_invalid_selector_is_rejected() {
        let selectors = BreadcrumbSelectors {
            trail: "##".to_string(),
            ..BreadcrumbSelectors::default()
        };
        assert!(CategoryExtractor::with_selectors(&selectors).is_err());
    }

    #[test]
    fn test_blank_leading_link_is_skipped() {
        let extractor = CategoryExtractor::new().unwrap();
        let html = r#"<div id="wayfinding-breadcrumbs_feature_div"><a href="/a">  </a><a href="/b">Beauty</a></div>"#;

        assert_eq!(extractor.extract_trail(html), Some(vec!["Beauty".to_string()]));
        assert_eq!(extractor.extract_category(html).unwrap(), "Beauty");
    }
}
