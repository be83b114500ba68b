//! Database models
//!
//! Rust structs representing the four record collections.
//! All models use serde with camelCase field names so the bundled
//! snapshot files and the external JSON targets share one schema.

use crate::config;
use crate::error::{AppError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four named record sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Enquiries,
    Feedbacks,
    Rettings,
    Portfolio,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Enquiries,
        Collection::Feedbacks,
        Collection::Rettings,
        Collection::Portfolio,
    ];

    /// SQLite table backing the collection
    pub fn table_name(self) -> &'static str {
        match self {
            Collection::Enquiries => "enquiries",
            Collection::Feedbacks => "feedbacks",
            Collection::Rettings => "rettings",
            Collection::Portfolio => "portfolio",
        }
    }

    /// Human label used for file names and bundle keys
    pub fn label(self) -> &'static str {
        match self {
            Collection::Enquiries => "Enquiry",
            Collection::Feedbacks => "Feedback",
            Collection::Rettings => "Rettings",
            Collection::Portfolio => "Portfolio",
        }
    }

    /// Snapshot / external target file name
    pub fn file_name(self) -> String {
        format!("{}.json", self.label())
    }

    /// Portfolio carries inline media and is kept out of file targets
    pub fn supports_external_target(self) -> bool {
        !matches!(self, Collection::Portfolio)
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Collection::Enquiries => 0,
            Collection::Feedbacks => 1,
            Collection::Rettings => 2,
            Collection::Portfolio => 3,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// A record stored in one of the collections
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> &str;
}

/// Generate a record id: `<prefix>_<unix millis>_<random base-36>`
pub fn generate_id(prefix: &str) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..config::ID_SUFFIX_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}_{}_{}", prefix, Utc::now().timestamp_millis(), suffix)
}

// ===== Enquiries =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnquiryStatus {
    Pending,
    Contacted,
}

/// A booking enquiry submitted from the enquiry page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enquiry {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub occasion_type: String,
    pub event_date: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub status: EnquiryStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_reply_date: Option<DateTime<Utc>>,
}

impl Record for Enquiry {
    const COLLECTION: Collection = Collection::Enquiries;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Create enquiry request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEnquiry {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub occasion_type: String,
    pub event_date: String,
    pub location: String,
    #[serde(default)]
    pub budget_range: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Enquiry {
    /// New enquiries always start out pending
    pub fn create(req: NewEnquiry) -> Self {
        Self {
            id: generate_id(config::ENQUIRY_ID_PREFIX),
            name: req.name,
            phone: req.phone,
            email: req.email,
            occasion_type: req.occasion_type,
            event_date: req.event_date,
            location: req.location,
            budget_range: req.budget_range,
            message: req.message,
            status: EnquiryStatus::Pending,
            created_at: Utc::now(),
            admin_reply: None,
            admin_reply_date: None,
        }
    }
}

// ===== Feedback =====

/// Star rating, always within 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: u8) -> Result<Self> {
        if (config::MIN_RATING..=config::MAX_RATING).contains(&value) {
            Ok(Self(value))
        } else {
            Err(AppError::InvalidRecord(format!(
                "rating must be between {} and {}, got {}",
                config::MIN_RATING,
                config::MAX_RATING,
                value
            )))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = AppError;

    fn try_from(value: u8) -> Result<Self> {
        Rating::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> u8 {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Customer feedback left on the feedback page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: String,
    pub name: String,
    pub rating: Rating,
    pub service_type: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_reply_date: Option<DateTime<Utc>>,
}

impl Record for Feedback {
    const COLLECTION: Collection = Collection::Feedbacks;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Create feedback request. The rating is validated on creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedback {
    pub name: String,
    pub rating: u8,
    pub service_type: String,
    pub message: String,
}

impl Feedback {
    pub fn create(req: NewFeedback) -> Result<Self> {
        Ok(Self {
            id: generate_id(config::FEEDBACK_ID_PREFIX),
            name: req.name,
            rating: Rating::new(req.rating)?,
            service_type: req.service_type,
            message: req.message,
            created_at: Utc::now(),
            admin_reply: None,
            admin_reply_date: None,
        })
    }
}

// ===== Rettings =====

/// Rating-like record aggregated from the producers in [`RettingSource`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Retting {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub source: RettingSource,
}

/// Producers of retting records, tagged by `type` in JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub enum RettingSource {
    Feedback(FeedbackRetting),
}

/// Copy of a feedback record's content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRetting {
    pub name: String,
    pub rating: Rating,
    pub service_type: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_reply_date: Option<DateTime<Utc>>,
}

impl Record for Retting {
    const COLLECTION: Collection = Collection::Rettings;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Retting {
    pub fn create(source: RettingSource) -> Self {
        Self {
            id: generate_id(config::RETTING_ID_PREFIX),
            created_at: Utc::now(),
            source,
        }
    }

    /// Derived record for a saved feedback: same content and timestamp, new id
    pub fn from_feedback(feedback: &Feedback) -> Self {
        Self {
            id: generate_id(config::RETTING_ID_PREFIX),
            created_at: feedback.created_at,
            source: RettingSource::Feedback(FeedbackRetting {
                name: feedback.name.clone(),
                rating: feedback.rating,
                service_type: feedback.service_type.clone(),
                message: feedback.message.clone(),
                admin_reply: feedback.admin_reply.clone(),
                admin_reply_date: feedback.admin_reply_date,
            }),
        }
    }

    pub fn rating(&self) -> Rating {
        match &self.source {
            RettingSource::Feedback(fb) => fb.rating,
        }
    }
}

// ===== Portfolio =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortfolioCategory {
    Bridal,
    Sider,
    Engagement,
    #[serde(rename = "Baby Shower")]
    BabyShower,
    Party,
    #[serde(rename = "Pre-Wedding")]
    PreWedding,
    Photoshoot,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    fn mime_family(self) -> &'static str {
        match self {
            MediaType::Image => "image/",
            MediaType::Video => "video/",
        }
    }
}

/// Where a portfolio item's media lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Remote or site-relative URL
    Remote(String),
    /// `data:<mime>;base64,<payload>` URI embedded in the record
    Inline { mime: String, len: usize },
}

impl MediaSource {
    pub fn parse(media_url: &str) -> Result<Self> {
        let Some(rest) = media_url.strip_prefix("data:") else {
            if media_url.trim().is_empty() {
                return Err(AppError::InvalidRecord("media URL is empty".to_string()));
            }
            return Ok(MediaSource::Remote(media_url.to_string()));
        };

        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| AppError::InvalidRecord("data URI has no payload".to_string()))?;
        let mime = header.strip_suffix(";base64").ok_or_else(|| {
            AppError::InvalidRecord("inline media must be base64 encoded".to_string())
        })?;
        let bytes = BASE64
            .decode(payload)
            .map_err(|e| AppError::InvalidRecord(format!("invalid base64 media: {}", e)))?;

        Ok(MediaSource::Inline {
            mime: mime.to_string(),
            len: bytes.len(),
        })
    }

    /// Check the payload against the declared media type
    pub fn validate(media_type: MediaType, media_url: &str) -> Result<Self> {
        let source = Self::parse(media_url)?;
        if let MediaSource::Inline { mime, .. } = &source {
            if !mime.starts_with(media_type.mime_family()) {
                return Err(AppError::InvalidRecord(format!(
                    "inline media is {} but item is declared as {:?}",
                    mime, media_type
                )));
            }
        }
        Ok(source)
    }
}

/// An image or video shown on the portfolio pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioItem {
    pub id: String,
    pub title: String,
    pub category: PortfolioCategory,
    #[serde(default)]
    pub tags: Vec<String>,
    pub caption: String,
    pub media_type: MediaType,
    /// Remote URL or base64 data URI
    pub media_url: String,
    pub created_at: DateTime<Utc>,
}

impl Record for PortfolioItem {
    const COLLECTION: Collection = Collection::Portfolio;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Create portfolio item request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPortfolioItem {
    pub title: String,
    pub category: PortfolioCategory,
    #[serde(default)]
    pub tags: Vec<String>,
    pub caption: String,
    pub media_type: MediaType,
    pub media_url: String,
}

/// Partial portfolio update. Id and creation time cannot change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioUpdate {
    pub title: Option<String>,
    pub category: Option<PortfolioCategory>,
    pub tags: Option<Vec<String>>,
    pub caption: Option<String>,
    pub media_type: Option<MediaType>,
    pub media_url: Option<String>,
}

impl PortfolioItem {
    pub fn create(req: NewPortfolioItem) -> Result<Self> {
        MediaSource::validate(req.media_type, &req.media_url)?;
        Ok(Self {
            id: generate_id(config::PORTFOLIO_ID_PREFIX),
            title: req.title,
            category: req.category,
            tags: req.tags,
            caption: req.caption,
            media_type: req.media_type,
            media_url: req.media_url,
            created_at: Utc::now(),
        })
    }

    /// Apply an update to a copy, leaving `self` untouched when the result is invalid
    pub fn updated(&self, update: PortfolioUpdate) -> Result<Self> {
        let mut item = self.clone();
        if let Some(title) = update.title {
            item.title = title;
        }
        if let Some(category) = update.category {
            item.category = category;
        }
        if let Some(tags) = update.tags {
            item.tags = tags;
        }
        if let Some(caption) = update.caption {
            item.caption = caption;
        }
        if let Some(media_type) = update.media_type {
            item.media_type = media_type;
        }
        if let Some(media_url) = update.media_url {
            item.media_url = media_url;
        }
        MediaSource::validate(item.media_type, &item.media_url)?;
        Ok(item)
    }
}
