use crate::domain::ids::{ChannelId, GuildId, RoleId, UserId};
use crate::domain::ticket::TicketCategory;

/// Discord rejects channel names longer than this.
pub const CHANNEL_NAME_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelName(pub String);

impl ChannelName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn for_ticket(category: TicketCategory, handle: &str, owner: UserId) -> Self {
        let handle = slugify(handle).unwrap_or_else(|| owner.to_string());
        let mut name = format!("{}-{}", category.as_str(), handle);
        if name.len() > CHANNEL_NAME_LIMIT {
            // slugs are ascii, so byte truncation stays on a char boundary
            name.truncate(CHANNEL_NAME_LIMIT);
            let trimmed = name.trim_end_matches('-').len();
            name.truncate(trimmed);
        }
        Self(name)
    }
}

fn slugify(input: &str) -> Option<String> {
    let mut result = String::with_capacity(input.len());
    let mut prev_dash = true;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            result.push(ch.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            result.push('-');
            prev_dash = true;
        }
    }
    let trimmed = result.trim_end_matches('-');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    View,
    Send,
    ReadHistory,
    Attach,
    Manage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteTarget {
    Role(RoleId),
    Member(UserId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionOverwrite {
    pub target: OverwriteTarget,
    pub allow: Vec<Permission>,
    pub deny: Vec<Permission>,
}

/// Everything needed to create a channel together with its permission set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub guild_id: GuildId,
    pub name: ChannelName,
    pub parent_id: ChannelId,
    pub overwrites: Vec<PermissionOverwrite>,
}

impl ChannelSpec {
    /// Private ticket channel: hidden from everyone except the owner and staff.
    pub fn private_ticket(
        guild_id: GuildId,
        parent_id: ChannelId,
        name: ChannelName,
        owner: UserId,
        staff_role: RoleId,
    ) -> Self {
        Self {
            guild_id,
            name,
            parent_id,
            overwrites: vec![
                PermissionOverwrite {
                    target: OverwriteTarget::Role(guild_id.everyone_role()),
                    allow: Vec::new(),
                    deny: vec![Permission::View],
                },
                PermissionOverwrite {
                    target: OverwriteTarget::Member(owner),
                    allow: vec![
                        Permission::View,
                        Permission::Send,
                        Permission::ReadHistory,
                        Permission::Attach,
                    ],
                    deny: Vec::new(),
                },
                PermissionOverwrite {
                    target: OverwriteTarget::Role(staff_role),
                    allow: vec![
                        Permission::View,
                        Permission::Send,
                        Permission::ReadHistory,
                        Permission::Manage,
                    ],
                    deny: Vec::new(),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugifies_ticket_channel_name() {
        let name = ChannelName::for_ticket(TicketCategory::Bug, "Coco_Fan 99!", UserId(5));
        assert_eq!(name.as_str(), "bug-coco-fan-99");
    }

    #[test]
    fn falls_back_to_owner_id_for_unprintable_handles() {
        let name = ChannelName::for_ticket(TicketCategory::Question, "ñ✨ñ", UserId(1234));
        assert_eq!(name.as_str(), "question-1234");
    }

    #[test]
    fn truncates_to_channel_name_limit() {
        let handle = "a".repeat(150);
        let name = ChannelName::for_ticket(TicketCategory::Purchase, &handle, UserId(1));
        assert_eq!(name.as_str().len(), CHANNEL_NAME_LIMIT);
        assert!(name.as_str().starts_with("purchase-aaa"));
    }

    #[test]
    fn private_ticket_denies_everyone() {
        let spec = ChannelSpec::private_ticket(
            GuildId(1),
            ChannelId(2),
            ChannelName("bug-x".to_string()),
            UserId(3),
            RoleId(4),
        );
        let everyone = &spec.overwrites[0];
        assert_eq!(everyone.target, OverwriteTarget::Role(RoleId(1)));
        assert_eq!(everyone.deny, vec![Permission::View]);
        assert!(spec.overwrites[1].allow.contains(&Permission::Attach));
        assert!(spec.overwrites[2].allow.contains(&Permission::Manage));
    }
}
