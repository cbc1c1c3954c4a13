use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

macro_rules! snowflake {
    ($name:ident, $label:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                value.trim().parse::<u64>().map($name).map_err(|_| {
                    AppError::Validation(format!("invalid {} id '{}'", $label, value))
                })
            }
        }
    };
}

snowflake!(GuildId, "guild");
snowflake!(ChannelId, "channel");
snowflake!(UserId, "user");
snowflake!(RoleId, "role");
snowflake!(MessageId, "message");

impl GuildId {
    /// The `@everyone` role shares its id with the guild.
    pub fn everyone_role(self) -> RoleId {
        RoleId(self.0)
    }
}
