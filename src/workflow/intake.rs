use std::collections::HashMap;

use crate::context::AppContext;
use crate::domain::ids::GuildId;
use crate::domain::ticket::{Requester, TicketCategory, TicketRequest};
use crate::error::{AppError, AppResult};
use crate::workflow::lifecycle::{CreateOutcome, request_create};

pub const INTAKE_PREFIX: &str = "ticket:intake:";
pub const NICKNAME_FIELD: &str = "nickname";
pub const MODE_FIELD: &str = "mode";
pub const DETAIL_FIELD: &str = "detail";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeForm {
    pub custom_id: String,
    pub title: String,
    pub inputs: Vec<IntakeInput>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeInput {
    pub custom_id: &'static str,
    pub label: &'static str,
    pub placeholder: &'static str,
    pub paragraph: bool,
    pub max_length: u16,
}

/// The three-question form shown after a category is picked on the panel.
pub fn intake_form(category: TicketCategory) -> IntakeForm {
    IntakeForm {
        custom_id: format!("{INTAKE_PREFIX}{}", category.as_str()),
        title: format!("{} {}", category.emoji(), category.label()),
        inputs: vec![
            IntakeInput {
                custom_id: NICKNAME_FIELD,
                label: "In-game nickname",
                placeholder: "Steve",
                paragraph: false,
                max_length: 32,
            },
            IntakeInput {
                custom_id: MODE_FIELD,
                label: "Game mode",
                placeholder: "Survival, Skyblock, ...",
                paragraph: false,
                max_length: 64,
            },
            IntakeInput {
                custom_id: DETAIL_FIELD,
                label: "What happened?",
                placeholder: "Explain your case with as much detail as possible.",
                paragraph: true,
                max_length: 1000,
            },
        ],
    }
}

pub fn category_from_custom_id(custom_id: &str) -> Option<TicketCategory> {
    custom_id
        .strip_prefix(INTAKE_PREFIX)
        .and_then(TicketCategory::from_slug)
}

pub fn parse_submission(
    category: TicketCategory,
    fields: &HashMap<String, String>,
) -> AppResult<TicketRequest> {
    let field = |name: &str, label: &str| {
        fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation(format!("{label} is required")))
    };

    Ok(TicketRequest {
        category,
        nickname: field(NICKNAME_FIELD, "Nickname")?,
        mode: field(MODE_FIELD, "Game mode")?,
        detail: field(DETAIL_FIELD, "Detail")?,
    })
}

pub async fn submit(
    ctx: &AppContext,
    guild: GuildId,
    requester: &Requester,
    category: TicketCategory,
    fields: &HashMap<String, String>,
) -> AppResult<CreateOutcome> {
    let request = parse_submission(category, fields)?;
    request_create(ctx, guild, requester, request).await
}
