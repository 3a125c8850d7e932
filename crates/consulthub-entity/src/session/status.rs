//! Session type and lifecycle status enums.

use serde::{Deserialize, Serialize};

use consulthub_core::AppError;

/// Kind of consultation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    /// Text chat.
    Chat,
    /// Audio call.
    Audio,
    /// Video call.
    Video,
    /// Introductory consultation, never billed.
    FreeConsultation,
}

impl SessionType {
    /// Return the type as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::FreeConsultation => "free_consultation",
        }
    }

    /// Check whether this type is always free of charge.
    pub fn is_free(&self) -> bool {
        matches!(self, Self::FreeConsultation)
    }
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SessionType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(Self::Chat),
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            "free_consultation" => Ok(Self::FreeConsultation),
            _ => Err(AppError::validation(format!("Invalid session type: {s}"))),
        }
    }
}

/// Lifecycle status of a session.
///
/// `connecting -> active -> ending/completed`, or
/// `scheduled -> active -> completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, participants attached, waiting for media/chat to start.
    Connecting,
    /// Booked for a later time; no participants yet.
    Scheduled,
    /// In progress and accruing cost.
    Active,
    /// Being torn down.
    Ending,
    /// Finished and billed.
    Completed,
}

impl SessionStatus {
    /// Return the status as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Scheduled => "scheduled",
            Self::Active => "active",
            Self::Ending => "ending",
            Self::Completed => "completed",
        }
    }

    /// Check whether the status is terminal for billing purposes.
    pub fn is_closing(&self) -> bool {
        matches!(self, Self::Ending | Self::Completed)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
