use serde::Deserialize;

/// A decoded RSS 2.0 document.
///
/// Only the fields the aggregator uses are mapped; everything else in the XML
/// is ignored. Text fields default to empty when an element is absent.
#[derive(Debug, Clone, Default)]
pub struct FeedDocument {
    pub channel: FeedChannel,
}

#[derive(Debug, Clone, Default)]
pub struct FeedChannel {
    pub title: String,
    pub link: String,
    pub description: String,
    /// Items in document order
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    /// Raw `<pubDate>` text; parsed later against the accepted layouts
    pub pub_date: String,
}

// Wire shapes. quick-xml matches on local names, so `<atom:link>` and
// `<link>` land in the same field; every text field is therefore a list and
// the first non-empty entry wins.

#[derive(Deserialize)]
struct RawDocument {
    channel: RawChannel,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawChannel {
    title: Vec<Text>,
    link: Vec<Text>,
    description: Vec<Text>,
    item: Vec<RawItem>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawItem {
    title: Vec<Text>,
    link: Vec<Text>,
    description: Vec<Text>,
    #[serde(rename = "pubDate")]
    pub_date: Vec<Text>,
}

/// Text content of an element; attributes are dropped.
#[derive(Default, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    value: String,
}

fn first_text(texts: Vec<Text>) -> String {
    texts
        .into_iter()
        .map(|t| t.value)
        .find(|v| !v.trim().is_empty())
        .unwrap_or_default()
}

impl From<RawItem> for FeedItem {
    fn from(raw: RawItem) -> Self {
        Self {
            title: first_text(raw.title),
            link: first_text(raw.link),
            description: first_text(raw.description),
            pub_date: first_text(raw.pub_date),
        }
    }
}

impl From<RawChannel> for FeedChannel {
    fn from(raw: RawChannel) -> Self {
        Self {
            title: first_text(raw.title),
            link: first_text(raw.link),
            description: first_text(raw.description),
            items: raw.item.into_iter().map(FeedItem::from).collect(),
        }
    }
}

/// Decode RSS XML into a [`FeedDocument`].
///
/// SEC-002: quick-xml (0.37) never expands `<!ENTITY>` declarations, so
/// crafted DOCTYPEs cannot pull in external content. The `overlapped-lists`
/// feature lets `<item>` elements be split up by other channel children.
pub fn parse_document(bytes: &[u8]) -> Result<FeedDocument, quick_xml::DeError> {
    let raw: RawDocument = quick_xml::de::from_reader(bytes)?;
    Ok(FeedDocument {
        channel: raw.channel.into(),
    })
}
