//! Volunteer post fields

use serde::Deserialize;
use serde_json::Value;

use super::Document;

/// Field holding the identity that owns a post or an application
pub const OWNER_FIELD: &str = "email";

/// Field matched by the title search
pub const SEARCH_FIELD: &str = "postTitle";

/// Whitelisted fields accepted when updating a post.
///
/// Anything else in the request body is ignored. A field that is absent (or
/// `null`) leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVolunteerInput {
    pub date: Option<Value>,
    pub thumbnail: Option<Value>,
    pub post_title: Option<Value>,
    pub description: Option<Value>,
    pub category: Option<Value>,
    pub location: Option<Value>,
    pub volunteer_number: Option<Value>,
}

impl UpdateVolunteerInput {
    /// The fields to set, keyed by their stored names
    pub fn into_fields(self) -> Document {
        let mut fields = Document::new();
        let pairs = [
            ("date", self.date),
            ("thumbnail", self.thumbnail),
            ("postTitle", self.post_title),
            ("description", self.description),
            ("category", self.category),
            ("location", self.location),
            ("volunteerNumber", self.volunteer_number),
        ];
        for (key, value) in pairs {
            if let Some(value) = value {
                fields.insert(key.to_string(), value);
            }
        }
        fields
    }
}
