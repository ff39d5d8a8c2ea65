use serde::Serialize;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{dates::parse_date, error::AppError, uploads::MultipartForm};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Shown when the user never uploaded a picture.
pub const DEFAULT_AVATAR: &str = "https://www.w3schools.com/w3images/avatar2.png";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub profile_picture: String,
    pub contact_no: String,
    pub cnic: String,
    #[serde(with = "iso_date::option")]
    pub dob: Option<Date>,
    pub gender: String,
    pub address: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Fields sent by the client; `None` leaves the stored value untouched.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub contact_no: Option<String>,
    pub cnic: Option<String>,
    pub dob: Option<Date>,
    pub gender: Option<String>,
    pub address: Option<String>,
}

impl ProfilePatch {
    pub fn from_form(form: &MultipartForm) -> Result<Self, AppError> {
        let dob = match form.text(&["dob"]) {
            Some(raw) => Some(
                parse_date(&raw)
                    .ok_or_else(|| AppError::bad_request("dob must be a YYYY-MM-DD date"))?,
            ),
            None => None,
        };
        let username = form.text(&["username"]);
        if username.as_ref().is_some_and(|u| u.chars().count() > 64) {
            return Err(AppError::bad_request("Username too long"));
        }
        Ok(Self {
            username,
            bio: form.text(&["bio"]),
            contact_no: form.text(&["contactNo", "phoneNumber", "contact_no"]),
            cnic: form.text(&["cnic"]),
            dob,
            gender: form.text(&["gender"]),
            address: form.text(&["address"]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn patch_keeps_only_non_blank_fields() {
        let mut form = MultipartForm::default();
        form.push("bio", "hello".into());
        form.push("gender", "   ".into());
        form.push("phoneNumber", "0300-1234567".into());
        form.push("dob", "1999-4-7".into());

        let patch = ProfilePatch::from_form(&form).unwrap();
        assert_eq!(
            patch,
            ProfilePatch {
                bio: Some("hello".into()),
                contact_no: Some("0300-1234567".into()),
                dob: Some(date!(1999 - 04 - 07)),
                ..Default::default()
            }
        );
    }

    #[test]
    fn patch_rejects_bad_dob() {
        let mut form = MultipartForm::default();
        form.push("dob", "07/04/1999".into());
        let err = ProfilePatch::from_form(&form).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn view_serializes_camel_case_with_plain_dates() {
        let view = ProfileView {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            username: "ada".into(),
            email: "ada@example.com".into(),
            bio: String::new(),
            profile_picture: DEFAULT_AVATAR.into(),
            contact_no: "123".into(),
            cnic: String::new(),
            dob: Some(date!(1999 - 04 - 07)),
            gender: String::new(),
            address: String::new(),
            created_at: datetime!(2025-01-01 0:00 UTC),
            updated_at: datetime!(2025-01-02 0:00 UTC),
        };
        let v = serde_json::to_value(&view).unwrap();
        assert_eq!(v["userId"], Uuid::nil().to_string());
        assert_eq!(v["contactNo"], "123");
        assert_eq!(v["profilePicture"], DEFAULT_AVATAR);
        assert_eq!(v["dob"], "1999-04-07");
        assert_eq!(v["createdAt"], "2025-01-01T00:00:00Z");
    }
}
