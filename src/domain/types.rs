//! Shared domain enumerations aligned with persisted database enums.

use serde::{Deserialize, Serialize};

/// Catalogue status of a product, independent of the `is_active` soft-delete flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "product_status", rename_all = "snake_case")]
pub enum ProductStatus {
    Active,
    Inactive,
    Discontinued,
}

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
            ProductStatus::Discontinued => "discontinued",
        }
    }

    /// `active ⇄ inactive ⇄ discontinued`; re-applying the current status is allowed.
    pub fn can_transition_to(self, next: ProductStatus) -> bool {
        use ProductStatus::*;
        matches!(
            (self, next),
            (Active, Active)
                | (Inactive, Inactive)
                | (Discontinued, Discontinued)
                | (Active, Inactive)
                | (Inactive, Active)
                | (Inactive, Discontinued)
                | (Discontinued, Inactive)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "blog_post_status", rename_all = "snake_case")]
pub enum BlogPostStatus {
    Draft,
    Published,
    Archived,
}

impl BlogPostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BlogPostStatus::Draft => "draft",
            BlogPostStatus::Published => "published",
            BlogPostStatus::Archived => "archived",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "appointment_status", rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        self == next
            || matches!(
                (self, next),
                (Pending, Confirmed)
                    | (Confirmed, Completed)
                    | (Pending, Cancelled)
                    | (Confirmed, Cancelled)
            )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "appointment_type", rename_all = "snake_case")]
pub enum AppointmentType {
    #[default]
    InStore,
    Pickup,
    OnSite,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "inquiry_status", rename_all = "snake_case")]
pub enum InquiryStatus {
    New,
    InProgress,
    Resolved,
    Closed,
}

impl InquiryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InquiryStatus::New => "new",
            InquiryStatus::InProgress => "in_progress",
            InquiryStatus::Resolved => "resolved",
            InquiryStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "inquiry_urgency", rename_all = "snake_case")]
pub enum InquiryUrgency {
    Low,
    #[default]
    Normal,
    High,
    Emergency,
}

/// Workshop progress of a repair, strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "repair_status", rename_all = "snake_case")]
pub enum RepairStatus {
    Received,
    Diagnosing,
    Repairing,
    Ready,
    Collected,
}

impl RepairStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RepairStatus::Received => "received",
            RepairStatus::Diagnosing => "diagnosing",
            RepairStatus::Repairing => "repairing",
            RepairStatus::Ready => "ready",
            RepairStatus::Collected => "collected",
        }
    }

    pub fn can_transition_to(self, next: RepairStatus) -> bool {
        next >= self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "admin_role", rename_all = "snake_case")]
pub enum AdminRole {
    Owner,
    Editor,
}

impl AdminRole {
    pub fn as_str(self) -> &'static str {
        match self {
            AdminRole::Owner => "owner",
            AdminRole::Editor => "editor",
        }
    }
}

impl TryFrom<&str> for AdminRole {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "owner" => Ok(AdminRole::Owner),
            "editor" => Ok(AdminRole::Editor),
            _ => Err(()),
        }
    }
}
