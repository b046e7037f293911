//! Plain-text extraction from PDF, DOCX, HTML and text files, and from web pages.

use std::io::{Cursor, Read};
use std::path::Path;
use std::time::Duration;

use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::Client;
use scraper::{Html, Node};
use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::models::IndexingConfig;
use crate::utils::{file_extension, join_nonempty_lines};

/// Document kinds, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Html,
    PlainText,
    /// Newline-separated list of web pages to fetch.
    LinkList,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        match file_extension(path)?.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            "html" | "htm" => Some(DocumentKind::Html),
            "txt" | "md" => Some(DocumentKind::PlainText),
            "url" => Some(DocumentKind::LinkList),
            _ => None,
        }
    }
}

/// Best-effort text extractor.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    client: Client,
}

impl TextExtractor {
    pub fn new(config: &IndexingConfig) -> Result<Self, ExtractError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(|e| ExtractError::Fetch {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    pub fn with_defaults() -> Result<Self, ExtractError> {
        Self::new(&IndexingConfig::default())
    }

    /// Extract text from a file. Returns `Ok(None)` for unsupported file types.
    pub async fn extract(&self, path: &Path) -> Result<Option<String>, ExtractError> {
        let Some(kind) = DocumentKind::from_path(path) else {
            debug!("skipping unsupported file {}", path.display());
            return Ok(None);
        };

        let bytes = tokio::fs::read(path).await?;
        let text = match kind {
            DocumentKind::Pdf => extract_pdf(&bytes)?,
            DocumentKind::Docx => extract_docx(&bytes)?,
            DocumentKind::Html => html_to_text(&String::from_utf8_lossy(&bytes)),
            DocumentKind::PlainText => String::from_utf8_lossy(&bytes).into_owned(),
            DocumentKind::LinkList => {
                let mut pages = Vec::new();
                for url in parse_link_list(&String::from_utf8_lossy(&bytes)) {
                    // One dead link shouldn't sink the whole dataset
                    match self.extract_url(url).await {
                        Ok(page) => pages.push(page),
                        Err(e) => warn!("skipping link: {e}"),
                    }
                }
                pages.join("\n")
            }
        };

        debug!(
            "extracted {} chars from {} ({:?})",
            text.len(),
            path.display(),
            kind
        );
        Ok(Some(text))
    }

    /// Fetch a web page and return its visible text.
    pub async fn extract_url(&self, url: &str) -> Result<String, ExtractError> {
        let fetch_error = |e: reqwest::Error| ExtractError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(fetch_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(fetch_error)?;
        Ok(html_to_text(&body))
    }
}

/// Concatenate per-page text. Pages without extractable text contribute nothing.
pub fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let document =
        lopdf::Document::load_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;

    let mut text = String::new();
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => debug!("page {page_number} has no extractable text: {e}"),
        }
    }
    Ok(text)
}

/// Paragraph texts of `word/document.xml`, one paragraph per line.
pub fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::Docx(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Docx(e.to_string()))?
        .read_to_string(&mut xml)?;

    docx_paragraphs(&xml).map(|paragraphs| paragraphs.join("\n"))
}

fn docx_paragraphs(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_paragraph = false;
    let mut in_text = false;

    loop {
        match reader
            .read_event()
            .map_err(|e| ExtractError::Docx(e.to_string()))?
        {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => {
                    in_paragraph = true;
                    current.clear();
                }
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(String::new()),
                b"w:tab" if in_paragraph => current.push('\t'),
                b"w:br" | b"w:cr" if in_paragraph => current.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t.unescape().map_err(|e| ExtractError::Docx(e.to_string()))?;
                current.push_str(&text);
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    in_paragraph = false;
                    paragraphs.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// Visible text of an HTML document.
///
/// Text inside `script` and `style` is dropped; remaining text nodes are joined
/// with spaces and non-empty trimmed lines are joined with a single space.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts: Vec<&str> = Vec::new();

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| matches!(el.name(), "script" | "style"))
        });
        if !hidden {
            parts.push(text);
        }
    }

    join_nonempty_lines(&parts.join(" "))
}

/// URLs listed in a link-list file, skipping blanks and `#` comments.
pub fn parse_link_list(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn build_docx(document_xml: &str) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buffer);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("word/document.xml", options).unwrap();
            zip.write_all(document_xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn test_document_kind_from_path() {
        assert_eq!(
            DocumentKind::from_path(Path::new("a.PDF")),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("a.docx")),
            Some(DocumentKind::Docx)
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("links.url")),
            Some(DocumentKind::LinkList)
        );
        assert_eq!(DocumentKind::from_path(Path::new("a.png")), None);
        assert_eq!(DocumentKind::from_path(Path::new("a.doc")), None);
        assert_eq!(DocumentKind::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_html_to_text_strips_script_and_style() {
        let html = r#"<html><head><title>T</title><style>body { color: red; }</style></head>
            <body>
              <h1>Heading</h1>
              <script>var x = 1;</script>
              <p>First   paragraph</p>
              <p>Second</p>
            </body></html>"#;
        let text = html_to_text(html);

        assert!(text.contains("Heading"));
        assert!(text.contains("First   paragraph"));
        assert!(text.contains("Second"));
        assert!(!text.contains("var x"));
        assert!(!text.contains("color"));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn test_docx_paragraphs_one_per_line() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:body>
<w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t xml:space="preserve"> world</w:t></w:r></w:p>
<w:p/>
<w:p><w:r><w:t>A &amp; B</w:t><w:tab/><w:t>C</w:t></w:r></w:p>
</w:body>
</w:document>"#;
        let text = extract_docx(&build_docx(xml)).unwrap();
        assert_eq!(text, "Hello world\n\nA & B\tC");
    }

    #[test]
    fn test_docx_rejects_non_zip() {
        assert!(matches!(
            extract_docx(b"plain bytes"),
            Err(ExtractError::Docx(_))
        ));
    }

    #[test]
    fn test_pdf_rejects_garbage() {
        assert!(matches!(
            extract_pdf(b"not a pdf"),
            Err(ExtractError::Pdf(_))
        ));
    }

    #[test]
    fn test_parse_link_list() {
        let urls: Vec<&str> =
            parse_link_list("# docs\nhttps://a.example\n\n  https://b.example  \n").collect();
        assert_eq!(urls, vec!["https://a.example", "https://b.example"]);
    }

    #[tokio::test]
    async fn test_extract_plain_text_and_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, "some plain words").unwrap();
        let png = dir.path().join("image.png");
        std::fs::write(&png, [0u8, 1, 2]).unwrap();

        let extractor = TextExtractor::with_defaults().unwrap();
        assert_eq!(
            extractor.extract(&txt).await.unwrap().as_deref(),
            Some("some plain words")
        );
        assert!(extractor.extract(&png).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_extract_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><body><p>Visible</p><script>hidden()</script></body></html>",
            ))
            .mount(&server)
            .await;

        let extractor = TextExtractor::with_defaults().unwrap();
        let text = extractor
            .extract_url(&format!("{}/page", server.uri()))
            .await
            .unwrap();
        assert_eq!(text, "Visible");
    }

    #[tokio::test]
    async fn test_extract_url_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let extractor = TextExtractor::with_defaults().unwrap();
        let err = extractor
            .extract_url(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_extract_link_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/one"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>one</p>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/two"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>two</p>"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let links = dir.path().join("links.url");
        std::fs::write(
            &links,
            format!("{uri}/one\n# skipped\n{uri}/missing\n{uri}/two\n", uri = server.uri()),
        )
        .unwrap();

        let extractor = TextExtractor::with_defaults().unwrap();
        let text = extractor.extract(&links).await.unwrap().unwrap();
        assert_eq!(text, "one\ntwo");
    }
}
