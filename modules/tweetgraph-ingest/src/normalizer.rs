//! Record normalizer: one raw feed record in, one `ParsedRecord` out.
//!
//! Pure. Never touches the store. Field names follow the feed's JSON shape
//! (`id`, `user.id`, `retweeted_status`, `entities.hashtags[].text`, ...).

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use tweetgraph_common::{
    AuthorId, DataQuality, IngestConfig, NormalizeError, ParsedAuthor, ParsedPost, ParsedRecord,
    PostId, TagKey,
};

/// Outcome of normalizing one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Post(ParsedRecord),
    /// Feed control message, identified by the marker key it carried.
    Control(String),
}

// --- Raw feed shape ---
//
// Every field is optional here; required-ness is checked explicitly so a
// missing field is reported by name rather than as a serde error.

#[derive(Debug, Deserialize)]
struct RawPost {
    id: Option<i64>,
    created_at: Option<String>,
    text: Option<String>,
    user: Option<RawUser>,
    retweeted_status: Option<Box<RawPost>>,
    in_reply_to_status_id: Option<i64>,
    quoted_status_id: Option<i64>,
    place: Option<RawPlace>,
    entities: Option<RawEntities>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: Option<i64>,
    screen_name: Option<String>,
    location: Option<String>,
    verified: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawPlace {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEntities {
    hashtags: Option<Vec<RawHashtag>>,
}

#[derive(Debug, Deserialize)]
struct RawHashtag {
    /// Any JSON type; only strings become tags.
    text: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    control_markers: Vec<String>,
    lowercase_tags: bool,
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new(&IngestConfig::default())
    }
}

impl RecordNormalizer {
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            control_markers: config.control_markers.clone(),
            lowercase_tags: config.lowercase_tags,
        }
    }

    /// Normalize a raw record. Control messages are not errors.
    pub fn normalize(&self, record: Value) -> Result<Normalized, NormalizeError> {
        if let Some(marker) = self.control_marker(&record) {
            return Ok(Normalized::Control(marker));
        }

        let raw: RawPost = serde_json::from_value(record)?;
        let mut quality = DataQuality::default();

        let original = match raw.retweeted_status.as_deref() {
            Some(embedded) => Some(self.parse_post(embedded, None, &mut quality)?),
            None => None,
        };
        let retweet_of = original.as_ref().map(|o| o.post_id);
        let post = self.parse_post(&raw, retweet_of, &mut quality)?;

        Ok(Normalized::Post(ParsedRecord {
            post,
            original,
            quality,
        }))
    }

    /// A record with no `id` that carries a feed-level marker key.
    fn control_marker(&self, record: &Value) -> Option<String> {
        let obj = record.as_object()?;
        if obj.get("id").is_some_and(|id| !id.is_null()) {
            return None;
        }
        self.control_markers
            .iter()
            .find(|m| obj.contains_key(m.as_str()))
            .cloned()
    }

    /// `retweet_of` comes from the caller: only the outer post of a record
    /// derives from an embedded original.
    fn parse_post(
        &self,
        raw: &RawPost,
        retweet_of: Option<PostId>,
        quality: &mut DataQuality,
    ) -> Result<ParsedPost, NormalizeError> {
        let post_id = PostId(raw.id.ok_or(NormalizeError::MissingField("id"))?);
        let user = raw.user.as_ref().ok_or(NormalizeError::MissingField("user"))?;
        let author_id = AuthorId(user.id.ok_or(NormalizeError::MissingField("user.id"))?);
        let created_at_raw = raw
            .created_at
            .as_deref()
            .ok_or(NormalizeError::MissingField("created_at"))?;
        let text = raw
            .text
            .clone()
            .ok_or(NormalizeError::MissingField("text"))?;

        let created_at = match parse_feed_timestamp(created_at_raw) {
            Some(ts) => ts,
            None => {
                debug!(%post_id, created_at = created_at_raw, "Unparseable timestamp, using ingestion time");
                quality.timestamp_fallbacks += 1;
                Utc::now().naive_utc()
            }
        };

        let mut tags: Vec<TagKey> = Vec::new();
        if let Some(hashtags) = raw.entities.as_ref().and_then(|e| e.hashtags.as_ref()) {
            for hashtag in hashtags {
                let normalized = hashtag
                    .text
                    .as_ref()
                    .and_then(Value::as_str)
                    .and_then(|t| TagKey::new(normalize_tag(t, self.lowercase_tags)));
                match normalized {
                    Some(tag) if !tags.contains(&tag) => tags.push(tag),
                    Some(_) => {}
                    None => {
                        debug!(%post_id, raw = ?hashtag.text, "Dropping hashtag that is not usable text");
                        quality.dropped_tags += 1;
                    }
                }
            }
        }

        Ok(ParsedPost {
            post_id,
            created_at,
            text,
            author: ParsedAuthor {
                author_id,
                screen_name: user.screen_name.clone().unwrap_or_default(),
                country: non_blank(user.location.as_deref()),
                verified: user.verified.unwrap_or(false),
            },
            geo: non_blank(raw.place.as_ref().and_then(|p| p.country.as_deref())),
            retweet_of,
            reply_to: raw.in_reply_to_status_id.map(PostId),
            quote_of: raw.quoted_status_id.map(PostId),
            tags,
        })
    }
}

fn non_blank(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse the feed's fixed format `"Weekday Month Day HH:MM:SS +OFFSET Year"`.
///
/// Components are taken positionally from the end; weekday and offset are
/// ignored, giving a naive timestamp as written.
pub fn parse_feed_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    if parts.len() < 5 {
        return None;
    }
    let n = parts.len();
    let year: i32 = parts[n - 1].parse().ok()?;
    let month = month_number(parts[n - 5])?;
    let day: u32 = parts[n - 4].parse().ok()?;
    let time = NaiveTime::parse_from_str(parts[n - 3], "%H:%M:%S").ok()?;
    Some(NaiveDate::from_ymd_opt(year, month, day)?.and_time(time))
}

fn month_number(abbrev: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    MONTHS
        .iter()
        .position(|m| *m == abbrev)
        .map(|i| i as u32 + 1)
}

/// Canonical tag key: NFD decomposition with every combining mark removed,
/// optionally lowercased. May return an empty string.
pub fn normalize_tag(raw: &str, lowercase: bool) -> String {
    let stripped: String = raw
        .trim()
        .trim_start_matches('#')
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    if lowercase {
        stripped.to_lowercase()
    } else {
        stripped
    }
}
