use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    repository::{RawDocument, StoreError},
};

// --- Resource Contract ---

/// Resource
///
/// A content entity stored as its own collection in the document store. Implementing this
/// trait is all it takes to expose an entity through the generic CRUD handlers: the
/// collection name doubles as the route segment (`/api/{COLLECTION}`).
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;

    /// Rejects payloads with missing or blank required fields.
    fn validate(&self) -> AppResult<()>;
}

fn require(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::missing_field(field));
    }
    Ok(())
}

/// Document
///
/// A stored resource: the typed body flattened next to its identity and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document<T> {
    pub id: Uuid,
    #[serde(flatten)]
    pub body: T,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<T: Resource> Document<T> {
    /// Decodes a raw store row into the typed resource.
    pub fn from_raw(raw: RawDocument) -> Result<Self, StoreError> {
        let body = serde_json::from_value(raw.body)
            .map_err(|e| StoreError::Corrupt(format!("{}/{}: {e}", T::COLLECTION, raw.id)))?;
        Ok(Self {
            id: raw.id,
            body,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        })
    }
}

// --- Content Schemas ---
//
// Required string fields default to empty so a missing field surfaces as a validation
// error naming the field rather than as a deserialization failure.

/// Article
///
/// Long-form post shown on the public site.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct Article {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub author: Option<String>,
    pub cover_image: Option<String>,
    #[serde(default)]
    pub published: bool,
}

impl Resource for Article {
    const COLLECTION: &'static str = "articles";

    fn validate(&self) -> AppResult<()> {
        require("title", &self.title)?;
        require("body", &self.body)
    }
}

/// Banner
///
/// Hero slide on the home page. `position` orders the carousel.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct Banner {
    #[serde(default)]
    pub title: String,
    pub subtitle: Option<String>,
    #[serde(default)]
    pub image_url: String,
    pub link: Option<String>,
    pub position: Option<i32>,
}

impl Resource for Banner {
    const COLLECTION: &'static str = "banners";

    fn validate(&self) -> AppResult<()> {
        require("title", &self.title)?;
        require("image_url", &self.image_url)
    }
}

/// Committee
///
/// A member of the institution's board or staff listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct Committee {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    pub photo_url: Option<String>,
    pub bio: Option<String>,
    pub position: Option<i32>,
}

impl Resource for Committee {
    const COLLECTION: &'static str = "committees";

    fn validate(&self) -> AppResult<()> {
        require("name", &self.name)?;
        require("role", &self.role)
    }
}

/// Content
///
/// Free-form copy for a named page section (e.g. "about", "vision").
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct Content {
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub title: String,
    pub body: Option<String>,
    pub image_url: Option<String>,
}

impl Resource for Content {
    const COLLECTION: &'static str = "contents";

    fn validate(&self) -> AppResult<()> {
        require("section", &self.section)?;
        require("title", &self.title)
    }
}

/// News
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct News {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub image_url: Option<String>,
    #[ts(type = "string | null")]
    pub event_date: Option<NaiveDate>,
}

impl Resource for News {
    const COLLECTION: &'static str = "news";

    fn validate(&self) -> AppResult<()> {
        require("title", &self.title)?;
        require("body", &self.body)
    }
}

/// Video
///
/// An embedded video, usually a YouTube link.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct Video {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    pub description: Option<String>,
}

impl Resource for Video {
    const COLLECTION: &'static str = "videos";

    fn validate(&self) -> AppResult<()> {
        require("title", &self.title)?;
        require("url", &self.url)
    }
}

/// Gallery
///
/// One uploaded image. Usually created by the upload endpoint, which fills `image_url`
/// with the object-storage URL.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct Gallery {
    #[serde(default)]
    pub image_url: String,
    pub caption: Option<String>,
}

impl Resource for Gallery {
    const COLLECTION: &'static str = "gallery";

    fn validate(&self) -> AppResult<()> {
        require("image_url", &self.image_url)
    }
}

/// Contact
///
/// A message submitted through the public contact form.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct Contact {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl Resource for Contact {
    const COLLECTION: &'static str = "contacts";

    fn validate(&self) -> AppResult<()> {
        require("name", &self.name)?;
        require("email", &self.email)?;
        if !self.email.contains('@') {
            return Err(AppError::Validation("Invalid email address".to_string()));
        }
        require("message", &self.message)
    }
}

// --- Session Schemas ---

/// LoginRequest
///
/// Input payload for `POST /api/login`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// LoginResponse
///
/// Body returned alongside the session cookie. The token itself is never exposed to scripts.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    pub success: bool,
    pub email: String,
}

/// LogoutResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LogoutResponse {
    pub success: bool,
}

/// SessionInfo
///
/// Output of `GET /api/session`: who is signed in and until when.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SessionInfo {
    pub email: String,
    #[ts(type = "string")]
    pub expires_at: DateTime<Utc>,
}

/// UploadResponse
///
/// Output of `POST /api/upload`: the public URL of the stored image and the gallery
/// document recorded for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
    pub document: Document<Gallery>,
}
