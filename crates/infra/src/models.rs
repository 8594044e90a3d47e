use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Player,
    Owner,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Player => "player",
            UserRole::Owner => "owner",
            UserRole::Admin => "admin",
        }
    }
}

impl From<&str> for UserRole {
    fn from(role: &str) -> Self {
        match role {
            "owner" => UserRole::Owner,
            "admin" => UserRole::Admin,
            _ => UserRole::Player, // Unknown roles get the least privilege
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "gender", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "token_purpose", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

/// Lifecycle of a booking. `Paid` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Paid,
    Cancelled,
}

impl BookingStatus {
    /// Whether a booking in this status holds its slot.
    pub fn is_active(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "connection_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Open,
    Full,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub dob: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub profile_pic_url: Option<String>,
    pub is_profile_complete: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserTokenRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub purpose: TokenPurpose,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Slot {
    #[sqlx(rename = "label")]
    pub time: String,
    pub booked: bool,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TurfRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub price: i32,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub slots: Vec<Slot>,
}

impl TurfRow {
    pub fn slot(&self, label: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.time == label)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BookingRow {
    pub id: Uuid,
    pub turf_id: Uuid,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub user_phone: Option<String>,
    pub date: NaiveDate,
    pub slot: String,
    pub status: BookingStatus,
    pub payment_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A booking joined with the turf it was made on (turf columns are null once the turf is gone).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserBookingRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub booking: BookingRow,
    pub turf_name: Option<String>,
    pub turf_price: Option<i32>,
    pub turf_city: Option<String>,
}

/// A booking on one of an owner's turfs, joined with the booking user's account fields.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OwnerBookingRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub booking: BookingRow,
    pub turf_name: String,
    pub account_name: Option<String>,
    pub account_email: Option<String>,
    pub account_phone: Option<String>,
}

/// Public identity of a user, as shown next to the games they play in.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ConnectionRow {
    pub id: Uuid,
    pub turf: String,
    pub date: NaiveDate,
    pub created_by: Uuid,
    pub max_players: i32,
    pub players: Vec<Uuid>,
    pub sport: String,
    pub contact_number: String,
    pub email: String,
    pub message: String,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
}

impl ConnectionRow {
    pub fn has_player(&self, user_id: Uuid) -> bool {
        self.players.contains(&user_id)
    }
}
