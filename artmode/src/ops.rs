//! Art-app operations: list, upload, delete.

use frames::{CodecError, InnerRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::error::ArtModeError;
use crate::session::{Expect, Session};
use crate::transport::Transport;

// =============================================================================
// WIRE CONSTANTS
// =============================================================================

pub const GET_CONTENT_LIST: &str = "get_content_list";
pub const SEND_IMAGE: &str = "send_image";
pub const DELETE_IMAGE_LIST: &str = "delete_image_list";

/// Data event answering `get_content_list`.
pub const CONTENT_LIST_EVENT: &str = "content_list";

/// Data event answering `send_image`.
pub const IMAGE_ADDED_EVENT: &str = "image_added";

pub const LANDSCAPE_MATTE: &str = "shadowbox_polar";
pub const PORTRAIT_MATTE: &str = "flexible_polar";

/// A stored artwork entry, kept exactly as the TV reported it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentItem(Value);

impl ContentItem {
    /// Server-assigned id, when the entry carries a string `content_id`.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        self.0.get("content_id").and_then(Value::as_str)
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for ContentItem {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Image encodings the TV accepts in `send_image`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Map a file extension to a format. Unknown extensions default to JPEG.
    #[must_use]
    pub fn from_extension(extension: &str) -> Self {
        let extension = extension.trim_start_matches('.');
        if extension.eq_ignore_ascii_case("png") {
            Self::Png
        } else {
            Self::Jpeg
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
        }
    }
}

/// Format a timestamp as `YYYY:MM:DD HH:MM:SS`, the EXIF date layout.
#[must_use]
pub fn format_image_date(at: OffsetDateTime) -> String {
    format!(
        "{:04}:{:02}:{:02} {:02}:{:02}:{:02}",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second()
    )
}

impl<T: Transport> Session<T> {
    /// List the artwork stored on the TV.
    ///
    /// # Errors
    ///
    /// Returns any [`Session::request`] error, or [`ArtModeError::Codec`] if
    /// `content_list` is absent or not a list of items.
    pub async fn list_content(&mut self) -> Result<Vec<ContentItem>, ArtModeError> {
        let data = self
            .request(
                &InnerRequest::new(GET_CONTENT_LIST),
                Expect::response().data_event(CONTENT_LIST_EVENT),
                None,
            )
            .await?;

        let items = match data.get("content_list") {
            Some(Value::String(encoded)) => {
                serde_json::from_str(encoded).map_err(CodecError::NestedJson)?
            }
            Some(list @ Value::Array(_)) => {
                serde_json::from_value(list.clone()).map_err(CodecError::Json)?
            }
            _ => return Err(CodecError::MissingField("content_list").into()),
        };
        Ok(items)
    }

    /// Upload an image as a binary frame and return the TV's confirmation.
    ///
    /// `extension` selects the `file_type`; `created_at` becomes the
    /// `image_date` shown on the TV.
    ///
    /// # Errors
    ///
    /// Returns any [`Session::request`] error.
    pub async fn upload_image(
        &mut self,
        image: &[u8],
        extension: &str,
        created_at: OffsetDateTime,
    ) -> Result<Value, ArtModeError> {
        let format = ImageFormat::from_extension(extension);
        let request = InnerRequest::new(SEND_IMAGE)
            .with("matte_id", LANDSCAPE_MATTE)
            .with("file_type", format.as_str())
            .with("image_date", format_image_date(created_at))
            .with("portrait_matte_id", PORTRAIT_MATTE);

        tracing::info!(bytes = image.len(), file_type = format.as_str(), "uploading image");
        self.request(
            &request,
            Expect::response().data_event(IMAGE_ADDED_EVENT),
            Some(image),
        )
        .await
    }

    /// Delete images by content id in one request. The response is returned
    /// as received.
    ///
    /// # Errors
    ///
    /// Returns any [`Session::request`] error.
    pub async fn delete_images<S: AsRef<str>>(
        &mut self,
        content_ids: &[S],
    ) -> Result<Value, ArtModeError> {
        let list = content_ids
            .iter()
            .map(|id| serde_json::json!({ "content_id": id.as_ref() }))
            .collect::<Vec<_>>();
        let request = InnerRequest::new(DELETE_IMAGE_LIST).with("content_id_list", list);

        tracing::info!(count = content_ids.len(), "deleting images");
        self.request(&request, Expect::response(), None).await
    }
}

#[cfg(test)]
#[path = "ops_test.rs"]
mod tests;
