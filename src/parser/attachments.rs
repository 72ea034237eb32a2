use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use super::record::Attachment;

static EMBED_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("embed[src]").unwrap());
static FULL_PDF_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[title="Download Full PDF"]"#).unwrap());
static SIDEBAR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#downloadsizemenu-side-bar a").unwrap());
static FORMAT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".field-format .field-value").unwrap());
static DOWNLOAD_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[aria-label="Download"]"#).unwrap());

/// Locate a full-text PDF for the item page, in priority order: embedded
/// viewer, "Download Full PDF" link, sidebar "All" sizes link, and a plain
/// download link when the format field says the item is a PDF.
pub fn find_pdf(doc: &Html, base: &Url) -> Option<Attachment> {
    let href = first_attr(doc, &EMBED_SEL, "src")
        .or_else(|| first_attr(doc, &FULL_PDF_SEL, "href"))
        .or_else(|| {
            doc.select(&SIDEBAR_SEL)
                .find(|a| a.text().collect::<String>().contains("All"))
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string)
        })
        .or_else(|| {
            let format: String = doc.select(&FORMAT_SEL).next()?.text().collect();
            if format.contains("application/pdf") {
                first_attr(doc, &DOWNLOAD_SEL, "href")
            } else {
                None
            }
        })?;

    let resolved = base.join(&href).map(String::from).unwrap_or(href);
    Some(Attachment::pdf(resolved))
}

fn first_attr(doc: &Html, sel: &Selector, attr: &str) -> Option<String> {
    doc.select(sel)
        .next()
        .and_then(|e| e.value().attr(attr))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf_url(html: &str) -> Option<String> {
        let base = Url::parse("https://content.example.edu/digital/collection/rms/id/60").unwrap();
        find_pdf(&Html::parse_document(html), &base).and_then(|a| a.url)
    }

    #[test]
    fn embed_wins() {
        let url = pdf_url(
            r#"<embed src="/utils/getfile/collection/amar/id/63405/filename/63406.pdf">
               <a title="Download Full PDF" href="/other.pdf">PDF</a>"#,
        );
        assert_eq!(
            url.as_deref(),
            Some("https://content.example.edu/utils/getfile/collection/amar/id/63405/filename/63406.pdf")
        );
    }

    #[test]
    fn full_pdf_link() {
        let url = pdf_url(r#"<a title="Download Full PDF" href="https://x.org/full.pdf">PDF</a>"#);
        assert_eq!(url.as_deref(), Some("https://x.org/full.pdf"));
    }

    #[test]
    fn sidebar_all_sizes() {
        let url = pdf_url(
            r#"<div id="downloadsizemenu-side-bar">
                 <a href="/small.jpg">Small</a>
                 <a href="/digital/api/collection/rms/id/60/download">All (PDF)</a>
               </div>"#,
        );
        assert_eq!(
            url.as_deref(),
            Some("https://content.example.edu/digital/api/collection/rms/id/60/download")
        );
    }

    #[test]
    fn download_link_needs_pdf_format() {
        let page = |format: &str| {
            format!(
                r#"<div class="field-format"><span class="field-value">{format}</span></div>
                   <a aria-label="Download" href="/dl/60">Download</a>"#
            )
        };
        assert_eq!(
            pdf_url(&page("application/pdf")).as_deref(),
            Some("https://content.example.edu/dl/60")
        );
        assert_eq!(pdf_url(&page("image/jpeg")), None);
    }

    #[test]
    fn attachment_shape() {
        let base = Url::parse("https://x.org/").unwrap();
        let doc = Html::parse_document(r#"<embed src="a.pdf">"#);
        let att = find_pdf(&doc, &base).unwrap();
        assert_eq!(att.title, "Full Text PDF");
        assert_eq!(att.mime_type, "application/pdf");
    }
}
