//! Parse carousel markup into image URLs without DOM rendering.

use scraper::{Html, Selector};
use tracing::warn;

/// Collect the `src` of the marker image inside every slide, in DOM order.
/// Slides without a qualifying image contribute nothing.
pub fn carousel_image_urls(html: &str, slide: &str, slide_image: &str) -> Vec<String> {
    let (Ok(slide_sel), Ok(image_sel)) = (Selector::parse(slide), Selector::parse(slide_image))
    else {
        warn!("invalid slide selectors {slide:?} / {slide_image:?}");
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut urls = Vec::new();
    for slide_el in document.select(&slide_sel) {
        if let Some(img) = slide_el.select(&image_sel).next() {
            if let Some(src) = img.value().attr("src") {
                urls.push(src.to_string());
            }
        }
    }
    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE: &str = "div.swiper-slide";
    const IMAGE: &str = "img.system-components-pack-item-image";

    #[test]
    fn urls_follow_dom_order() {
        let html = r#"
            <div class="swiper-container">
              <div class="swiper-slide"><img class="system-components-pack-item-image" src="/img/1.jpg"></div>
              <div class="swiper-slide"><img class="system-components-pack-item-image" src="https://cdn.example.com/2.jpg"></div>
            </div>"#;
        assert_eq!(
            carousel_image_urls(html, SLIDE, IMAGE),
            vec!["/img/1.jpg", "https://cdn.example.com/2.jpg"]
        );
    }

    #[test]
    fn slides_without_marker_image_contribute_nothing() {
        let html = r#"
            <div class="swiper-slide"><img class="thumbnail" src="/thumb.jpg"></div>
            <div class="swiper-slide"><img class="system-components-pack-item-image" src="/img/1.jpg"></div>
            <div class="swiper-slide"></div>"#;
        assert_eq!(carousel_image_urls(html, SLIDE, IMAGE), vec!["/img/1.jpg"]);
    }

    #[test]
    fn image_without_src_is_skipped() {
        let html =
            r#"<div class="swiper-slide"><img class="system-components-pack-item-image"></div>"#;
        assert!(carousel_image_urls(html, SLIDE, IMAGE).is_empty());
    }

    #[test]
    fn empty_page_yields_no_urls() {
        assert!(carousel_image_urls("<html></html>", SLIDE, IMAGE).is_empty());
    }
}
