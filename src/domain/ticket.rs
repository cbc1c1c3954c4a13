use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::{ChannelId, GuildId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketCategory {
    Report,
    Purchase,
    Bug,
    Appeal,
    Password,
    Question,
    Booster,
}

impl TicketCategory {
    pub const ALL: [TicketCategory; 7] = [
        TicketCategory::Report,
        TicketCategory::Purchase,
        TicketCategory::Bug,
        TicketCategory::Appeal,
        TicketCategory::Password,
        TicketCategory::Question,
        TicketCategory::Booster,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketCategory::Report => "report",
            TicketCategory::Purchase => "purchase",
            TicketCategory::Bug => "bug",
            TicketCategory::Appeal => "appeal",
            TicketCategory::Password => "password",
            TicketCategory::Question => "question",
            TicketCategory::Booster => "booster",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TicketCategory::Report => "Report a player",
            TicketCategory::Purchase => "Store purchase",
            TicketCategory::Bug => "Bug report",
            TicketCategory::Appeal => "Ban appeal",
            TicketCategory::Password => "Password reset",
            TicketCategory::Question => "General question",
            TicketCategory::Booster => "Booster rewards",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            TicketCategory::Report => "🚨",
            TicketCategory::Purchase => "🛒",
            TicketCategory::Bug => "🐛",
            TicketCategory::Appeal => "⚖️",
            TicketCategory::Password => "🔑",
            TicketCategory::Question => "❓",
            TicketCategory::Booster => "💎",
        }
    }

    pub fn from_slug(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        TicketCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub channel_id: ChannelId,
    pub channel_name: String,
    pub guild_id: GuildId,
    pub owner_id: UserId,
    pub category: TicketCategory,
    pub created_at: DateTime<Utc>,
    pub status: TicketStatus,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_by: Option<UserId>,
}

impl Ticket {
    pub fn is_open(&self) -> bool {
        self.status == TicketStatus::Open
    }
}

/// The person asking for a ticket, as seen on the interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub id: UserId,
    pub handle: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRequest {
    pub category: TicketCategory,
    pub nickname: String,
    pub mode: String,
    pub detail: String,
}
