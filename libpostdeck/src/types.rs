//! Core types for Postdeck

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Social media destination a content item is queued for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Instagram,
    Facebook,
    Twitter,
    Linkedin,
}

impl Destination {
    pub const ALL: [Destination; 4] = [
        Destination::Instagram,
        Destination::Facebook,
        Destination::Twitter,
        Destination::Linkedin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Facebook => "facebook",
            Self::Twitter => "twitter",
            Self::Linkedin => "linkedin",
        }
    }
}

impl FromStr for Destination {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "instagram" => Ok(Self::Instagram),
            "facebook" => Ok(Self::Facebook),
            "twitter" | "x" => Ok(Self::Twitter),
            "linkedin" => Ok(Self::Linkedin),
            _ => Err(format!(
                "Invalid destination: '{}'. Valid options: instagram, facebook, twitter, linkedin",
                s
            )),
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of media behind a reference, guessed from its extension
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Detect media kind from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "heic" => Some(Self::Image),
            "mp4" | "mov" | "m4v" | "webm" => Some(Self::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// Opaque handle to an image or video resource (URL or storage path)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct MediaRef(String);

impl MediaRef {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A blank handle can never be resolved by the publish endpoint
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Media kind from the handle's extension, ignoring any query string
    pub fn kind(&self) -> Option<MediaKind> {
        let path = self.0.split(|c| c == '?' || c == '#').next().unwrap_or_default();
        let file = path.rsplit('/').next().unwrap_or_default();
        let (_, ext) = file.rsplit_once('.')?;
        MediaKind::from_extension(ext)
    }
}

impl std::fmt::Display for MediaRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A queued piece of content
///
/// Read-only once handed to a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub caption: String,
    pub media: Option<MediaRef>,
    pub destination: Destination,
    pub created_at: i64,
}

impl ContentItem {
    pub fn new(
        title: String,
        caption: String,
        media: Option<MediaRef>,
        destination: Destination,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            caption,
            media,
            destination,
            created_at: Utc::now().timestamp(),
        }
    }

    /// Item can go into a batch for `active`: it carries media and targets
    /// that destination
    pub fn is_eligible(&self, active: Destination) -> bool {
        self.destination == active && self.media.as_ref().is_some_and(|m| !m.is_empty())
    }

    /// Text sent as the caption; falls back to the title when the caption
    /// is blank
    pub fn publish_caption(&self) -> &str {
        if self.caption.trim().is_empty() {
            &self.title
        } else {
            &self.caption
        }
    }
}

/// Result tag of one attempted item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Success,
    Failure,
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

/// Record of one publish attempt, appended in item order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemOutcome {
    pub item_id: String,
    pub result: OutcomeKind,
    pub error: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl ItemOutcome {
    pub fn success(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            result: OutcomeKind::Success,
            error: None,
            attempted_at: Utc::now(),
        }
    }

    pub fn failure(item_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            result: OutcomeKind::Failure,
            error: Some(error.into()),
            attempted_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == OutcomeKind::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(media: Option<&str>, destination: Destination) -> ContentItem {
        ContentItem::new(
            "Launch day".to_string(),
            "We are live!".to_string(),
            media.map(MediaRef::new),
            destination,
        )
    }

    #[test]
    fn test_destination_from_str() {
        assert_eq!("instagram".parse::<Destination>().unwrap(), Destination::Instagram);
        assert_eq!("LinkedIn".parse::<Destination>().unwrap(), Destination::Linkedin);
        assert_eq!("x".parse::<Destination>().unwrap(), Destination::Twitter);

        let err = "myspace".parse::<Destination>().unwrap_err();
        assert!(err.contains("Invalid destination: 'myspace'"));
    }

    #[test]
    fn test_destination_display_matches_serde() {
        for destination in Destination::ALL {
            let json = serde_json::to_string(&destination).unwrap();
            assert_eq!(json, format!("\"{}\"", destination));
        }
    }

    #[test]
    fn test_eligibility_requires_media_and_destination() {
        assert!(item(Some("https://cdn.example/a.jpg"), Destination::Instagram)
            .is_eligible(Destination::Instagram));
        assert!(!item(Some("https://cdn.example/a.jpg"), Destination::Facebook)
            .is_eligible(Destination::Instagram));
        assert!(!item(None, Destination::Instagram).is_eligible(Destination::Instagram));
        assert!(!item(Some("   "), Destination::Instagram).is_eligible(Destination::Instagram));
    }

    #[test]
    fn test_publish_caption_falls_back_to_title() {
        let mut content = item(Some("a.png"), Destination::Twitter);
        assert_eq!(content.publish_caption(), "We are live!");

        content.caption = "  ".to_string();
        assert_eq!(content.publish_caption(), "Launch day");
    }

    #[test]
    fn test_media_kind_detection() {
        assert_eq!(MediaRef::new("photo.JPG").kind(), Some(MediaKind::Image));
        assert_eq!(
            MediaRef::new("https://cdn.example/v/clip.mp4?sig=abc").kind(),
            Some(MediaKind::Video)
        );
        assert_eq!(MediaRef::new("https://cdn.example/blob").kind(), None);
        assert_eq!(MediaRef::new("archive.zip").kind(), None);
    }

    #[test]
    fn test_item_outcome_constructors() {
        let ok = ItemOutcome::success("item-1");
        assert!(ok.is_success());
        assert!(ok.error.is_none());

        let failed = ItemOutcome::failure("item-2", "HTTP 500");
        assert_eq!(failed.result, OutcomeKind::Failure);
        assert_eq!(failed.error.as_deref(), Some("HTTP 500"));
    }
}
