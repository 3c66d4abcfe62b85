use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::utils::geo::GeoPoint;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn to_str(&self) -> &str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, InProgress)
                | (Confirmed, Cancelled)
                | (InProgress, Completed)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingParty {
    Client,
    Handyman,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingAction {
    Accept,
    Decline,
    Start,
    Complete,
    Cancel,
}

impl BookingAction {
    pub fn target(&self) -> BookingStatus {
        match self {
            BookingAction::Accept => BookingStatus::Confirmed,
            BookingAction::Decline | BookingAction::Cancel => BookingStatus::Cancelled,
            BookingAction::Start => BookingStatus::InProgress,
            BookingAction::Complete => BookingStatus::Completed,
        }
    }

    /// Accept and decline are the artisan's answer to a request; the rest
    /// may come from either side of the booking.
    pub fn allowed_for(&self, party: BookingParty) -> bool {
        match self {
            BookingAction::Accept | BookingAction::Decline => party == BookingParty::Handyman,
            BookingAction::Start | BookingAction::Complete | BookingAction::Cancel => true,
        }
    }

    pub fn to_str(&self) -> &str {
        match self {
            BookingAction::Accept => "accept",
            BookingAction::Decline => "decline",
            BookingAction::Start => "start",
            BookingAction::Complete => "complete",
            BookingAction::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Booking {
    pub id: Uuid,
    pub client_id: Uuid,
    pub handyman_id: Uuid,
    pub service_id: Option<Uuid>,
    pub booking_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub address: String,
    pub city: String,
    pub job_lat: Option<f64>,
    pub job_lng: Option<f64>,
    pub description: Option<String>,
    pub proposed_price: Option<BigDecimal>,
    pub handyman_comment: Option<String>,
    pub response_date: Option<DateTime<Utc>>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn party(&self, user_id: Uuid) -> Option<BookingParty> {
        if user_id == self.client_id {
            Some(BookingParty::Client)
        } else if user_id == self.handyman_id {
            Some(BookingParty::Handyman)
        } else {
            None
        }
    }

    pub fn counterparty(&self, user_id: Uuid) -> Uuid {
        if user_id == self.client_id {
            self.handyman_id
        } else {
            self.client_id
        }
    }

    pub fn job_location(&self) -> Option<GeoPoint> {
        GeoPoint::from_columns(self.job_lat, self.job_lng)
    }
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub client_id: Uuid,
    pub handyman_id: Uuid,
    pub service_id: Option<Uuid>,
    pub booking_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub address: String,
    pub city: String,
    pub job_location: Option<GeoPoint>,
    pub description: Option<String>,
    pub proposed_price: Option<BigDecimal>,
}

/// Column changes applied together with a status compare-and-set.
#[derive(Debug, Clone)]
pub struct BookingChange {
    pub to: BookingStatus,
    pub end_date: Option<DateTime<Utc>>,
    pub proposed_price: Option<BigDecimal>,
    pub handyman_comment: Option<String>,
    pub response_date: Option<DateTime<Utc>>,
}

impl BookingChange {
    pub fn status(to: BookingStatus) -> Self {
        BookingChange {
            to,
            end_date: None,
            proposed_price: None,
            handyman_comment: None,
            response_date: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct BookingTimeline {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub status: BookingStatus,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Review {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    const ALL: [BookingStatus; 5] = [Pending, Confirmed, InProgress, Completed, Cancelled];

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in [Completed, Cancelled] {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{} -> {} allowed", from, to);
            }
        }
    }

    #[test]
    fn test_transition_table() {
        let allowed: Vec<(BookingStatus, BookingStatus)> = ALL
            .iter()
            .flat_map(|from| ALL.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .collect();

        assert_eq!(
            allowed,
            vec![
                (Pending, Confirmed),
                (Pending, Cancelled),
                (Confirmed, InProgress),
                (Confirmed, Cancelled),
                (InProgress, Completed),
            ]
        );
    }

    #[test]
    fn test_action_authority() {
        assert!(BookingAction::Accept.allowed_for(BookingParty::Handyman));
        assert!(!BookingAction::Accept.allowed_for(BookingParty::Client));
        assert!(!BookingAction::Decline.allowed_for(BookingParty::Client));
        assert!(BookingAction::Cancel.allowed_for(BookingParty::Client));
        assert!(BookingAction::Cancel.allowed_for(BookingParty::Handyman));
        assert!(BookingAction::Start.allowed_for(BookingParty::Client));
        assert!(BookingAction::Complete.allowed_for(BookingParty::Handyman));
    }
}
