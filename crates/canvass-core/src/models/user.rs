//! User profile and account forms.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::de::{lenient_string, string_or_number};

/// The authenticated user's profile as returned by the backend.
///
/// Only the fields the client reads are typed. Everything else the server
/// sends is kept in `extra` so a record written to disk and read back is
/// identical to the one received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default, deserialize_with = "string_or_number", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "string_or_number", skip_serializing_if = "Option::is_none")]
    pub region_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number", skip_serializing_if = "Option::is_none")]
    pub constituency_id: Option<String>,
    #[serde(default, alias = "avatar", deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Bearer token, when the backend embeds it in the user object.
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    /// Name for greetings and headers, falling back to the email address.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.email.as_deref())
            .unwrap_or("Unknown user")
    }
}

/// An image attached to a registration.
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Fields submitted to `POST /register` as multipart form data.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub password_confirmation: String,
    pub region_id: Option<String>,
    pub constituency_id: Option<String>,
    pub avatar: Option<AvatarUpload>,
}

impl RegistrationForm {
    /// Text fields in submission order. Unset optional ids are omitted.
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("name", self.name.clone()),
            ("email", self.email.clone()),
            ("phone", self.phone.clone()),
            ("password", self.password.clone()),
            ("password_confirmation", self.password_confirmation.clone()),
        ];
        if let Some(ref id) = self.region_id {
            fields.push(("region_id", id.clone()));
        }
        if let Some(ref id) = self.constituency_id {
            fields.push(("constituency_id", id.clone()));
        }
        fields
    }
}

/// Partial update for `PATCH /user-profile`. Unset fields are not sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constituency_id: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone.is_none()
            && self.region_id.is_none()
            && self.constituency_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_record_keeps_unknown_fields() {
        let json = r#"{"id": 17, "name": "Ama Mensah", "email": "ama@example.com", "region_id": 3, "constituency_id": "45", "token": "t-1", "referral_code": "AMA17", "verified": true}"#;
        let user: UserRecord = serde_json::from_str(json).expect("user should parse");

        assert_eq!(user.id.as_deref(), Some("17"));
        assert_eq!(user.region_id.as_deref(), Some("3"));
        assert_eq!(user.constituency_id.as_deref(), Some("45"));
        assert_eq!(user.extra.get("referral_code"), Some(&Value::from("AMA17")));

        let written = serde_json::to_string(&user).expect("user should serialize");
        let reread: UserRecord = serde_json::from_str(&written).expect("user should reparse");
        assert_eq!(reread, user);
    }

    #[test]
    fn test_user_record_coerces_odd_scalars() {
        let json = r#"{"id": 42.0, "name": "Ama", "phone": 244123456, "email": null, "avatar": false}"#;
        let user: UserRecord = serde_json::from_str(json).expect("user should parse");

        assert_eq!(user.id.as_deref(), Some("42"));
        assert_eq!(user.phone.as_deref(), Some("244123456"));
        assert_eq!(user.email, None);
        assert_eq!(user.avatar_url, None);
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let user = UserRecord {
            name: Some("  ".to_string()),
            email: Some("kofi@example.com".to_string()),
            ..Default::default()
        };
        assert_eq!(user.display_name(), "kofi@example.com");
        assert_eq!(UserRecord::default().display_name(), "Unknown user");
    }

    #[test]
    fn test_registration_fields_skip_missing_ids() {
        let form = RegistrationForm {
            name: "Esi".to_string(),
            email: "esi@example.com".to_string(),
            region_id: Some("2".to_string()),
            ..Default::default()
        };
        let names: Vec<&str> = form.text_fields().iter().map(|(k, _)| *k).collect();
        assert!(names.contains(&"region_id"));
        assert!(!names.contains(&"constituency_id"));
    }

    #[test]
    fn test_profile_update_serializes_only_set_fields() {
        let update = ProfileUpdate {
            phone: Some("0244000000".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
        assert_eq!(
            serde_json::to_value(&update).expect("update should serialize"),
            serde_json::json!({"phone": "0244000000"})
        );
        assert!(ProfileUpdate::default().is_empty());
    }
}
