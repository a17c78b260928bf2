use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// --- Natural Keys ---

/// Externally assigned post identifier, unique across the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub i64);

/// Externally assigned author identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorId(pub i64);

/// Canonical hashtag text. Only constructed from already-normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagKey(String);

impl TagKey {
    /// Wrap an already-normalized tag. Returns `None` for empty text.
    pub fn new(normalized: impl Into<String>) -> Option<Self> {
        let s = normalized.into();
        if s.is_empty() {
            None
        } else {
            Some(Self(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for AuthorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for TagKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// --- Graph Vocabulary ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexKind {
    Post,
    Author,
    Tag,
}

impl VertexKind {
    pub const ALL: [VertexKind; 3] = [VertexKind::Post, VertexKind::Author, VertexKind::Tag];

    /// Graph label.
    pub fn label(self) -> &'static str {
        match self {
            VertexKind::Post => "Post",
            VertexKind::Author => "Author",
            VertexKind::Tag => "Tag",
        }
    }

    /// Property holding the natural key.
    pub fn key_property(self) -> &'static str {
        match self {
            VertexKind::Post => "post_id",
            VertexKind::Author => "author_id",
            VertexKind::Tag => "name",
        }
    }

    pub fn index(self) -> usize {
        match self {
            VertexKind::Post => 0,
            VertexKind::Author => 1,
            VertexKind::Tag => 2,
        }
    }
}

impl std::fmt::Display for VertexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Author → Post
    Authored,
    /// Retweeting post → original post
    Retweets,
    RepliesTo,
    Quotes,
    /// Post → Tag
    Tags,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 5] = [
        EdgeKind::Authored,
        EdgeKind::Retweets,
        EdgeKind::RepliesTo,
        EdgeKind::Quotes,
        EdgeKind::Tags,
    ];

    /// Relationship type in the graph.
    pub fn rel_type(self) -> &'static str {
        match self {
            EdgeKind::Authored => "AUTHORED",
            EdgeKind::Retweets => "RETWEETS",
            EdgeKind::RepliesTo => "REPLIES_TO",
            EdgeKind::Quotes => "QUOTES",
            EdgeKind::Tags => "TAGS",
        }
    }

    /// (source kind, target kind) this edge connects.
    pub fn endpoints(self) -> (VertexKind, VertexKind) {
        match self {
            EdgeKind::Authored => (VertexKind::Author, VertexKind::Post),
            EdgeKind::Retweets | EdgeKind::RepliesTo | EdgeKind::Quotes => {
                (VertexKind::Post, VertexKind::Post)
            }
            EdgeKind::Tags => (VertexKind::Post, VertexKind::Tag),
        }
    }

    pub fn index(self) -> usize {
        match self {
            EdgeKind::Authored => 0,
            EdgeKind::Retweets => 1,
            EdgeKind::RepliesTo => 2,
            EdgeKind::Quotes => 3,
            EdgeKind::Tags => 4,
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeKind::Authored => write!(f, "authored"),
            EdgeKind::Retweets => write!(f, "retweets"),
            EdgeKind::RepliesTo => write!(f, "replies_to"),
            EdgeKind::Quotes => write!(f, "quotes"),
            EdgeKind::Tags => write!(f, "tags"),
        }
    }
}

/// The three post-to-post reference properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceField {
    RetweetOf,
    ReplyTo,
    QuoteOf,
}

impl ReferenceField {
    pub fn property(self) -> &'static str {
        match self {
            ReferenceField::RetweetOf => "retweet_of",
            ReferenceField::ReplyTo => "reply_to",
            ReferenceField::QuoteOf => "quote_of",
        }
    }

    pub fn edge(self) -> EdgeKind {
        match self {
            ReferenceField::RetweetOf => EdgeKind::Retweets,
            ReferenceField::ReplyTo => EdgeKind::RepliesTo,
            ReferenceField::QuoteOf => EdgeKind::Quotes,
        }
    }
}

/// Natural key of any vertex. Doubles as the vertex handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VertexKey {
    Post(PostId),
    Author(AuthorId),
    Tag(TagKey),
}

impl VertexKey {
    pub fn kind(&self) -> VertexKind {
        match self {
            VertexKey::Post(_) => VertexKind::Post,
            VertexKey::Author(_) => VertexKind::Author,
            VertexKey::Tag(_) => VertexKind::Tag,
        }
    }
}

impl std::fmt::Display for VertexKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VertexKey::Post(id) => write!(f, "Post({id})"),
            VertexKey::Author(id) => write!(f, "Author({id})"),
            VertexKey::Tag(tag) => write!(f, "Tag({tag})"),
        }
    }
}

// --- Stored Vertices ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostVertex {
    pub post_id: PostId,
    pub created_at: NaiveDateTime,
    pub text: String,
    pub author_id: AuthorId,
    pub geo: Option<String>,
    pub retweet_of: Option<PostId>,
    pub reply_to: Option<PostId>,
    pub quote_of: Option<PostId>,
}

impl PostVertex {
    pub fn reference(&self, field: ReferenceField) -> Option<PostId> {
        match field {
            ReferenceField::RetweetOf => self.retweet_of,
            ReferenceField::ReplyTo => self.reply_to,
            ReferenceField::QuoteOf => self.quote_of,
        }
    }

    pub fn set_reference(&mut self, field: ReferenceField, value: Option<PostId>) {
        match field {
            ReferenceField::RetweetOf => self.retweet_of = value,
            ReferenceField::ReplyTo => self.reply_to = value,
            ReferenceField::QuoteOf => self.quote_of = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorVertex {
    pub author_id: AuthorId,
    pub screen_name: String,
    pub country: Option<String>,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagVertex {
    pub name: TagKey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Vertex {
    Post(PostVertex),
    Author(AuthorVertex),
    Tag(TagVertex),
}

impl Vertex {
    pub fn key(&self) -> VertexKey {
        match self {
            Vertex::Post(p) => VertexKey::Post(p.post_id),
            Vertex::Author(a) => VertexKey::Author(a.author_id),
            Vertex::Tag(t) => VertexKey::Tag(t.name.clone()),
        }
    }

    pub fn kind(&self) -> VertexKind {
        match self {
            Vertex::Post(_) => VertexKind::Post,
            Vertex::Author(_) => VertexKind::Author,
            Vertex::Tag(_) => VertexKind::Tag,
        }
    }

    pub fn into_post(self) -> Option<PostVertex> {
        match self {
            Vertex::Post(p) => Some(p),
            _ => None,
        }
    }
}

// --- Normalized Records ---

/// Author as parsed from a record's `user` object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAuthor {
    pub author_id: AuthorId,
    pub screen_name: String,
    pub country: Option<String>,
    pub verified: bool,
}

impl ParsedAuthor {
    pub fn to_vertex(&self) -> AuthorVertex {
        AuthorVertex {
            author_id: self.author_id,
            screen_name: self.screen_name.clone(),
            country: self.country.clone(),
            verified: self.verified,
        }
    }
}

/// One post, normalized. `None` references mean the record carried none.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPost {
    pub post_id: PostId,
    pub created_at: NaiveDateTime,
    pub text: String,
    pub author: ParsedAuthor,
    pub geo: Option<String>,
    pub retweet_of: Option<PostId>,
    pub reply_to: Option<PostId>,
    pub quote_of: Option<PostId>,
    pub tags: Vec<TagKey>,
}

impl ParsedPost {
    pub fn reference(&self, field: ReferenceField) -> Option<PostId> {
        match field {
            ReferenceField::RetweetOf => self.retweet_of,
            ReferenceField::ReplyTo => self.reply_to,
            ReferenceField::QuoteOf => self.quote_of,
        }
    }
}

/// Per-record data-quality signals gathered while normalizing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataQuality {
    pub timestamp_fallbacks: u32,
    pub dropped_tags: u32,
}

/// A normalized record: the outer post plus, for retweets, the embedded
/// original it derives from (`post.retweet_of == Some(original.post_id)`).
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub post: ParsedPost,
    pub original: Option<ParsedPost>,
    pub quality: DataQuality,
}
