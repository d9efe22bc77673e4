use anyhow::Result;
use feed_rs::model::{Entry, MediaObject};
use feed_rs::parser;

/// Placeholder title for entries whose source provides none.
const DEFAULT_TITLE: &str = "Untitled";

/// A parsed source document: the feed's own title plus its candidate
/// articles in document order.
#[derive(Debug, Clone)]
pub struct FetchedFeed {
    /// Title declared by the source, if any. Callers adopt it for feeds the
    /// user has not renamed.
    pub title: Option<String>,
    pub articles: Vec<FetchedArticle>,
}

/// One candidate article extracted from a source document.
#[derive(Debug, Clone)]
pub struct FetchedArticle {
    /// Native entry id when the source provides one, else the entry link.
    pub guid: String,
    pub title: String,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub published: Option<i64>,
}

/// Parse an RSS/Atom document into candidate articles.
///
/// Entries with neither an id nor a link are dropped: they cannot be
/// deduplicated or displayed meaningfully. Everything else is normalized
/// per-field, with absent values left as `None` rather than invented.
pub fn parse_feed(bytes: &[u8]) -> Result<FetchedFeed> {
    let feed = parser::parse(bytes)?;

    let title = feed
        .title
        .map(|t| t.content)
        .filter(|t| !t.trim().is_empty());

    let articles: Vec<FetchedArticle> = feed.entries.into_iter().filter_map(candidate).collect();

    Ok(FetchedFeed { title, articles })
}

/// Normalize one entry, or discard it when it carries neither id nor link.
fn candidate(entry: Entry) -> Option<FetchedArticle> {
    let url = entry
        .links
        .iter()
        .map(|l| l.href.trim())
        .find(|href| !href.is_empty())
        .map(str::to_string);

    let native_id = entry.id.trim();
    let guid = if !native_id.is_empty() {
        native_id.to_string()
    } else if let Some(link) = &url {
        link.clone()
    } else {
        // No id, no link: silently discarded
        return None;
    };

    let title = entry
        .title
        .map(|t| t.content)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let author = entry.authors.first().map(|a| a.name.clone());
    let image_url = image_enclosure(&entry.media);
    let published = entry.published.or(entry.updated).map(|dt| dt.timestamp());
    let summary = entry.summary.map(|s| s.content);
    let content = entry.content.and_then(|c| c.body);

    Some(FetchedArticle {
        guid,
        title,
        url,
        summary,
        content,
        author,
        image_url,
        published,
    })
}

/// First enclosure whose declared media type is an image.
fn image_enclosure(media: &[MediaObject]) -> Option<String> {
    for object in media {
        for content in &object.content {
            let Some(url) = content.url.as_ref() else {
                continue;
            };
            let is_image = content
                .content_type
                .as_ref()
                .map(|m| m.to_string().starts_with("image"))
                .unwrap_or(false);
            if is_image {
                return Some(url.as_str().to_string());
            }
        }
    }
    None
}
