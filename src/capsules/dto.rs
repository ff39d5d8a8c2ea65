use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{dates::parse_date, error::AppError, uploads::MultipartForm};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CapsuleType {
    Personal,
    Shared,
}

impl CapsuleType {
    pub fn as_str(self) -> &'static str {
        match self {
            CapsuleType::Personal => "Personal",
            CapsuleType::Shared => "Shared",
        }
    }
}

impl fmt::Display for CapsuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapsuleType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "personal" => Ok(CapsuleType::Personal),
            "shared" => Ok(CapsuleType::Shared),
            _ => Err(AppError::bad_request("capsuleType must be Personal or Shared")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CapsuleStatus {
    Locked,
    Open,
}

impl CapsuleStatus {
    /// Locked strictly before the unlock date, open from that day on.
    pub fn at(unlock_date: Date, today: Date) -> Self {
        if today < unlock_date {
            CapsuleStatus::Locked
        } else {
            CapsuleStatus::Open
        }
    }
}

/// Validated fields of a create request, before the media is stored.
#[derive(Debug, PartialEq, Eq)]
pub struct CapsuleDraft {
    pub title: String,
    pub description: String,
    pub unlock_date: Date,
    pub capsule_type: CapsuleType,
    pub friends: Vec<Uuid>,
}

impl CapsuleDraft {
    pub fn from_form(form: &MultipartForm, owner: Uuid, today: Date) -> Result<Self, AppError> {
        let title = form
            .text(&["title"])
            .ok_or_else(|| AppError::bad_request("title is required"))?;
        if title.chars().count() > 200 {
            return Err(AppError::bad_request("title is too long"));
        }
        let description = form.text(&["description"]).unwrap_or_default();

        let raw_date = form
            .text(&["unlockDate", "unlock_date"])
            .ok_or_else(|| AppError::bad_request("unlockDate is required"))?;
        let unlock_date = parse_date(&raw_date)
            .ok_or_else(|| AppError::bad_request("unlockDate must be a YYYY-MM-DD date"))?;
        if unlock_date <= today {
            return Err(AppError::bad_request("unlockDate must be in the future"));
        }

        let capsule_type: CapsuleType = form
            .text(&["capsuleType", "capsule_type"])
            .ok_or_else(|| AppError::bad_request("capsuleType is required"))?
            .parse()?;

        let mut friends = Vec::new();
        for raw in form.list("friends") {
            let id = Uuid::parse_str(&raw)
                .map_err(|_| AppError::bad_request(format!("{} is not a valid friend id", raw)))?;
            if id == owner {
                return Err(AppError::bad_request("You cannot share a capsule with yourself"));
            }
            if !friends.contains(&id) {
                friends.push(id);
            }
        }

        match (capsule_type, friends.is_empty()) {
            (CapsuleType::Shared, true) => {
                return Err(AppError::bad_request(
                    "Shared capsules need at least one friend",
                ))
            }
            (CapsuleType::Personal, false) => {
                return Err(AppError::bad_request("Personal capsules cannot be shared"))
            }
            _ => {}
        }

        Ok(Self {
            title,
            description,
            unlock_date,
            capsule_type,
            friends,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CapsuleView {
    pub id: Uuid,
    pub owner: Uuid,
    pub title: String,
    pub description: String,
    #[serde(with = "iso_date")]
    pub unlock_date: Date,
    pub capsule_type: CapsuleType,
    pub status: CapsuleStatus,
    /// Withheld until the capsule opens.
    pub media: Option<String>,
    pub friends: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct CapsuleListResponse {
    pub capsules: Vec<CapsuleView>,
}
