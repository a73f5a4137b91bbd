use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::schema::{tunnel_messages, tunnel_otps, tunnel_sessions, user_profiles, users};

/// How long an issued OTP stays valid.
pub const OTP_VALIDITY_MINUTES: i64 = 5;

// --- Users (read-only here; owned by souls-auth) ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = user_profiles)]
pub struct UserProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub profile_code: String,
    pub is_verified: bool,
    pub profile_picture_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

// --- Tunnel Sessions ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = tunnel_sessions)]
pub struct TunnelSession {
    pub id: Uuid,
    pub initiator_id: Uuid,
    pub recipient_id: Uuid,
    pub chat_room_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TunnelSession {
    pub fn includes(&self, user_id: Uuid) -> bool {
        self.initiator_id == user_id || self.recipient_id == user_id
    }

    pub fn other_party(&self, user_id: Uuid) -> Uuid {
        if self.initiator_id == user_id {
            self.recipient_id
        } else {
            self.initiator_id
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tunnel_sessions)]
pub struct NewTunnelSession {
    pub initiator_id: Uuid,
    pub recipient_id: Uuid,
    pub chat_room_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

// --- Tunnel OTPs ---

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = tunnel_otps)]
pub struct TunnelOtp {
    pub id: Uuid,
    pub session_id: Uuid,
    pub code: String,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
}

impl TunnelOtp {
    /// Unused and still inside the validity window.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && now <= self.created_at + Duration::minutes(OTP_VALIDITY_MINUTES)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tunnel_otps)]
pub struct NewTunnelOtp {
    pub session_id: Uuid,
    pub code: String,
}

// --- Tunnel Messages ---

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = tunnel_messages)]
pub struct TunnelMessage {
    pub id: Uuid,
    pub chat_room_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tunnel_messages)]
pub struct NewTunnelMessage {
    pub chat_room_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(now: DateTime<Utc>) -> TunnelSession {
        TunnelSession {
            id: Uuid::new_v4(),
            initiator_id: Uuid::new_v4(),
            recipient_id: Uuid::new_v4(),
            chat_room_id: Uuid::new_v4(),
            is_active: false,
            created_at: now,
            expires_at: now + Duration::minutes(30),
        }
    }

    #[test]
    fn session_membership() {
        let now = Utc::now();
        let s = session(now);
        assert!(s.includes(s.initiator_id));
        assert!(s.includes(s.recipient_id));
        assert!(!s.includes(Uuid::new_v4()));
        assert_eq!(s.other_party(s.initiator_id), s.recipient_id);
        assert_eq!(s.other_party(s.recipient_id), s.initiator_id);
    }

    #[test]
    fn session_expiry() {
        let now = Utc::now();
        let s = session(now);
        assert!(!s.is_expired(now));
        assert!(!s.is_expired(now + Duration::minutes(30)));
        assert!(s.is_expired(now + Duration::minutes(31)));
    }

    #[test]
    fn otp_valid_inside_window() {
        let now = Utc::now();
        let otp = TunnelOtp {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            code: "123456".into(),
            is_used: false,
            created_at: now,
        };
        assert!(otp.is_valid(now));
        assert!(otp.is_valid(now + Duration::minutes(5)));
        assert!(!otp.is_valid(now + Duration::minutes(6)));
    }

    #[test]
    fn used_otp_never_valid() {
        let now = Utc::now();
        let otp = TunnelOtp {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            code: "123456".into(),
            is_used: true,
            created_at: now,
        };
        assert!(!otp.is_valid(now));
    }
}
