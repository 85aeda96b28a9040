use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::document::{display_label, require_non_negative, require_text};
use super::{Collection, Document, Lifecycle, Module, Tracked};
use crate::cms::LoopConfig;
use crate::error::Error;

/// Placeholder shown for sites without any image.
pub const NO_IMAGE: &str = "NO IMAGE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    Static,
    Digital,
}

impl ContentType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ContentType::Static => "static",
            ContentType::Digital => "digital",
        }
    }

    #[must_use]
    pub fn label(self) -> String {
        display_label(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub url: String,
    #[serde(default)]
    pub kind: MediaKind,
}

/// Playback settings of a digital screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CmsConfig {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub spot_duration_secs: u32,
    pub spots_per_loop: u32,
}

/// A billboard site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_code: Option<String>,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default)]
    pub price_per_month: f64,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cms: Option<CmsConfig>,
}

impl Product {
    /// URL of the first image, or the `NO IMAGE` placeholder.
    #[must_use]
    pub fn display_image(&self) -> &str {
        self.media
            .iter()
            .find(|m| m.kind == MediaKind::Image)
            .map_or(NO_IMAGE, |m| m.url.as_str())
    }
}

impl Document for Product {
    const COLLECTION: Collection = Collection::Products;
    const MODULE: Module = Module::Business;
    const FILTERABLE: &'static [&'static str] = &["content_type", "site_code"];

    fn validate(&self) -> Result<(), String> {
        require_text("name", &self.name)?;
        require_non_negative("price_per_month", self.price_per_month)?;
        if let Some(lat) = self.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err("latitude must be between -90 and 90".to_string());
            }
        }
        if let Some(lng) = self.longitude {
            if !(-180.0..=180.0).contains(&lng) {
                return Err("longitude must be between -180 and 180".to_string());
            }
        }
        if let Some(cms) = &self.cms {
            if self.content_type != ContentType::Digital {
                return Err("cms settings only apply to digital sites".to_string());
            }
            LoopConfig::from(cms).validate().map_err(|e| match e {
                Error::BadRequest(msg) => msg,
                other => other.to_string(),
            })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
        BookingStatus::Completed,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    /// Whether the booking still holds the site.
    #[must_use]
    pub const fn holds_site(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Lifecycle for BookingStatus {
    fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub client_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quotation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Booking {
    /// True when both bookings hold the same site on at least one common day.
    #[must_use]
    pub fn conflicts_with(&self, other: &Booking) -> bool {
        self.product_id == other.product_id
            && self.status.holds_site()
            && other.status.holds_site()
            && self.start_date <= other.end_date
            && other.start_date <= self.end_date
    }
}

impl Document for Booking {
    const COLLECTION: Collection = Collection::Bookings;
    const MODULE: Module = Module::Sales;
    const FILTERABLE: &'static [&'static str] =
        &["product_id", "status", "client_id", "quotation_id"];
    const PROTECTED: &'static [&'static str] = &["status"];

    fn validate(&self) -> Result<(), String> {
        require_text("product_id", &self.product_id)?;
        require_text("client_name", &self.client_name)?;
        if self.end_date < self.start_date {
            return Err("end_date cannot be before start_date".to_string());
        }
        require_non_negative("total_cost", self.total_cost)
    }
}

impl Tracked for Booking {
    type Status = BookingStatus;

    fn status(&self) -> BookingStatus {
        self.status
    }

    fn set_status(&mut self, status: BookingStatus) {
        self.status = status;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOrderKind {
    Installation,
    Maintenance,
    Repair,
    Dismantling,
    Monitoring,
    RollUp,
    RollDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOrderStatus {
    #[default]
    Pending,
    Approved,
    InProgress,
    Completed,
    Cancelled,
}

impl JobOrderStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            JobOrderStatus::Pending => "pending",
            JobOrderStatus::Approved => "approved",
            JobOrderStatus::InProgress => "in_progress",
            JobOrderStatus::Completed => "completed",
            JobOrderStatus::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub const fn is_open(self) -> bool {
        !matches!(self, JobOrderStatus::Completed | JobOrderStatus::Cancelled)
    }
}

impl fmt::Display for JobOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Lifecycle for JobOrderStatus {
    fn can_transition_to(self, next: Self) -> bool {
        use JobOrderStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Approved, InProgress)
                | (InProgress, Completed)
                | (Pending | Approved | InProgress, Cancelled)
        )
    }
}

/// Work order dispatched to a logistics crew.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOrder {
    #[serde(default)]
    pub jo_number: String,
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    pub kind: JobOrderKind,
    #[serde(default)]
    pub status: JobOrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quotation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl Document for JobOrder {
    const COLLECTION: Collection = Collection::JobOrders;
    const MODULE: Module = Module::Logistics;
    const FILTERABLE: &'static [&'static str] =
        &["product_id", "status", "kind", "assigned_to", "quotation_id"];
    const PROTECTED: &'static [&'static str] = &["status", "jo_number", "requested_by"];

    fn validate(&self) -> Result<(), String> {
        require_text("product_id", &self.product_id)
    }
}

impl Tracked for JobOrder {
    type Status = JobOrderStatus;

    fn status(&self) -> JobOrderStatus {
        self.status
    }

    fn set_status(&mut self, status: JobOrderStatus) {
        self.status = status;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    #[default]
    Pending,
    Ongoing,
    Completed,
    Cancelled,
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Ongoing => "ongoing",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::Cancelled => "cancelled",
        })
    }
}

impl Lifecycle for AssignmentStatus {
    fn can_transition_to(self, next: Self) -> bool {
        use AssignmentStatus::*;
        matches!(
            (self, next),
            (Pending, Ongoing) | (Ongoing, Completed) | (Pending | Ongoing, Cancelled)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAssignment {
    #[serde(default)]
    pub sa_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_order_id: Option<String>,
    pub product_id: String,
    pub service_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crew: Option<String>,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: AssignmentStatus,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl Document for ServiceAssignment {
    const COLLECTION: Collection = Collection::ServiceAssignments;
    const MODULE: Module = Module::Logistics;
    const FILTERABLE: &'static [&'static str] = &["product_id", "job_order_id", "status", "crew"];
    const PROTECTED: &'static [&'static str] = &["status", "sa_number"];

    fn validate(&self) -> Result<(), String> {
        require_text("product_id", &self.product_id)?;
        require_text("service_type", &self.service_type)?;
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err("end_date cannot be before start_date".to_string());
            }
        }
        Ok(())
    }
}

impl Tracked for ServiceAssignment {
    type Status = AssignmentStatus;

    fn status(&self) -> AssignmentStatus {
        self.status
    }

    fn set_status(&mut self, status: AssignmentStatus) {
        self.status = status;
    }
}

/// Content booked into one spot of a digital screen's loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenSchedule {
    pub product_id: String,
    pub spot_number: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default)]
    pub content_type: MediaKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ScreenSchedule {
    #[must_use]
    pub fn active_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    #[must_use]
    pub fn overlaps(&self, other: &ScreenSchedule) -> bool {
        self.product_id == other.product_id
            && self.spot_number == other.spot_number
            && self.start_date <= other.end_date
            && other.start_date <= self.end_date
    }
}

impl Document for ScreenSchedule {
    const COLLECTION: Collection = Collection::ScreenSchedules;
    const MODULE: Module = Module::Cms;
    const FILTERABLE: &'static [&'static str] = &["product_id", "spot_number"];

    fn validate(&self) -> Result<(), String> {
        require_text("product_id", &self.product_id)?;
        require_text("title", &self.title)?;
        if self.spot_number == 0 {
            return Err("spot_number starts at 1".to_string());
        }
        if self.end_date < self.start_date {
            return Err("end_date cannot be before start_date".to_string());
        }
        Ok(())
    }
}
