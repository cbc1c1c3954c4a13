use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::context::AppContext;
use crate::domain::ids::{ChannelId, GuildId, UserId};
use crate::domain::message::{CATEGORY_SELECT_ID, CLOSE_BUTTON_ID};
use crate::domain::ticket::{Requester, TicketCategory};
use crate::error::{AppError, AppResult};
use crate::services::Capability;
use crate::workflow::close::close_ticket;
use crate::workflow::intake::{
    INTAKE_PREFIX, IntakeForm, category_from_custom_id, intake_form, submit,
};
use crate::workflow::panel::publish_panel;

const INTERACTION_EVENT: &str = "interaction";
const INTERACTION_TTL: Duration = Duration::from_secs(15 * 60);
const EPHEMERAL: u64 = 1 << 6;

const PING: u8 = 1;
const APPLICATION_COMMAND: u8 = 2;
const MESSAGE_COMPONENT: u8 = 3;
const MODAL_SUBMIT: u8 = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub member: Option<InteractionMember>,
    #[serde(default)]
    pub user: Option<InteractionUser>,
    #[serde(default)]
    pub data: Option<InteractionData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionMember {
    pub user: InteractionUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InteractionData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub custom_id: Option<String>,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub options: Vec<CommandOption>,
    #[serde(default)]
    pub components: Vec<ModalRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModalRow {
    #[serde(default)]
    pub components: Vec<ModalField>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModalField {
    pub custom_id: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl Interaction {
    fn actor(&self) -> AppResult<InteractionUser> {
        self.member
            .as_ref()
            .map(|member| member.user.clone())
            .or_else(|| self.user.clone())
            .ok_or_else(|| AppError::Validation("interaction has no user".to_string()))
    }

    fn guild(&self) -> AppResult<GuildId> {
        self.guild_id
            .as_deref()
            .ok_or_else(|| AppError::Validation("tickets only work inside a server".to_string()))?
            .parse()
    }

    fn channel(&self) -> AppResult<ChannelId> {
        self.channel_id
            .as_deref()
            .ok_or_else(|| AppError::Validation("interaction has no channel".to_string()))?
            .parse()
    }

    fn data(&self) -> AppResult<&InteractionData> {
        self.data
            .as_ref()
            .ok_or_else(|| AppError::Validation("interaction has no data".to_string()))
    }
}

/// What the HTTP handler answers Discord with straight away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionReply {
    Pong,
    Message { content: String, ephemeral: bool },
    Modal(IntakeForm),
    /// "Thinking..." placeholder; a deferred action edits it later.
    Deferred { ephemeral: bool },
}

impl InteractionReply {
    pub fn ephemeral(content: impl Into<String>) -> Self {
        InteractionReply::Message {
            content: content.into(),
            ephemeral: true,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            InteractionReply::Pong => json!({ "type": 1 }),
            InteractionReply::Message { content, ephemeral } => json!({
                "type": 4,
                "data": {
                    "content": content,
                    "flags": if *ephemeral { EPHEMERAL } else { 0 },
                    "allowed_mentions": { "parse": [] },
                },
            }),
            InteractionReply::Deferred { ephemeral } => json!({
                "type": 5,
                "data": { "flags": if *ephemeral { EPHEMERAL } else { 0 } },
            }),
            InteractionReply::Modal(form) => {
                let rows: Vec<Value> = form
                    .inputs
                    .iter()
                    .map(|input| {
                        json!({
                            "type": 1,
                            "components": [{
                                "type": 4,
                                "custom_id": input.custom_id,
                                "label": input.label,
                                "style": if input.paragraph { 2 } else { 1 },
                                "placeholder": input.placeholder,
                                "required": true,
                                "max_length": input.max_length,
                            }],
                        })
                    })
                    .collect();
                json!({
                    "type": 9,
                    "data": {
                        "custom_id": form.custom_id,
                        "title": form.title,
                        "components": rows,
                    },
                })
            }
        }
    }
}

/// Work that outlives Discord's three second response window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredAction {
    PublishPanel {
        guild: GuildId,
        actor: UserId,
        channel: Option<ChannelId>,
    },
    Close {
        actor: UserId,
        channel: ChannelId,
    },
    Submit {
        guild: GuildId,
        requester: Requester,
        category: TicketCategory,
        fields: HashMap<String, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    pub reply: InteractionReply,
    pub deferred: Option<(String, DeferredAction)>,
}

impl Routed {
    fn reply(reply: InteractionReply) -> Self {
        Self {
            reply,
            deferred: None,
        }
    }

    fn defer(token: &str, action: DeferredAction) -> Self {
        Self {
            reply: InteractionReply::Deferred { ephemeral: true },
            deferred: Some((token.to_string(), action)),
        }
    }
}

/// Decides the immediate reply for an interaction and the follow-up work, if any.
pub fn route_interaction(ctx: &AppContext, interaction: &Interaction) -> AppResult<Routed> {
    if interaction.kind == PING {
        return Ok(Routed::reply(InteractionReply::Pong));
    }

    if !ctx
        .idempotency
        .claim(INTERACTION_EVENT, &interaction.id, INTERACTION_TTL)
    {
        tracing::debug!(interaction_id = %interaction.id, "duplicate interaction dropped");
        return Ok(Routed::reply(InteractionReply::ephemeral(
            "⏳ Already handled.",
        )));
    }

    match interaction.kind {
        APPLICATION_COMMAND => route_command(interaction),
        MESSAGE_COMPONENT => route_component(interaction),
        MODAL_SUBMIT => route_modal(interaction),
        other => Err(AppError::Validation(format!(
            "unsupported interaction type {other}"
        ))),
    }
}

fn route_command(interaction: &Interaction) -> AppResult<Routed> {
    let data = interaction.data()?;
    let subcommand = data.options.first();
    match (data.name.as_deref(), subcommand.map(|option| option.name.as_str())) {
        (Some("tickets"), Some("publish")) => {
            let channel = subcommand
                .and_then(|option| option.options.iter().find(|opt| opt.name == "channel"))
                .and_then(|option| option.value.as_ref())
                .and_then(Value::as_str)
                .map(str::parse::<ChannelId>)
                .transpose()?;
            let action = DeferredAction::PublishPanel {
                guild: interaction.guild()?,
                actor: interaction.actor()?.id.parse()?,
                channel,
            };
            Ok(Routed::defer(&interaction.token, action))
        }
        _ => Err(AppError::Validation("unknown command".to_string())),
    }
}

fn route_component(interaction: &Interaction) -> AppResult<Routed> {
    let data = interaction.data()?;
    match data.custom_id.as_deref() {
        Some(CATEGORY_SELECT_ID) => {
            let category = data
                .values
                .first()
                .and_then(|value| TicketCategory::from_slug(value))
                .ok_or_else(|| AppError::Validation("unknown ticket category".to_string()))?;
            Ok(Routed::reply(InteractionReply::Modal(intake_form(category))))
        }
        Some(CLOSE_BUTTON_ID) => {
            let action = DeferredAction::Close {
                actor: interaction.actor()?.id.parse()?,
                channel: interaction.channel()?,
            };
            Ok(Routed::defer(&interaction.token, action))
        }
        _ => Err(AppError::Validation("unknown component".to_string())),
    }
}

fn route_modal(interaction: &Interaction) -> AppResult<Routed> {
    let data = interaction.data()?;
    let category = data
        .custom_id
        .as_deref()
        .filter(|custom_id| custom_id.starts_with(INTAKE_PREFIX))
        .and_then(category_from_custom_id)
        .ok_or_else(|| AppError::Validation("unknown form".to_string()))?;

    let fields = data
        .components
        .iter()
        .flat_map(|row| row.components.iter())
        .map(|field| {
            (
                field.custom_id.clone(),
                field.value.clone().unwrap_or_default(),
            )
        })
        .collect();

    let user = interaction.actor()?;
    let action = DeferredAction::Submit {
        guild: interaction.guild()?,
        requester: Requester {
            id: user.id.parse()?,
            handle: user.username,
        },
        category,
        fields,
    };
    Ok(Routed::defer(&interaction.token, action))
}

/// Runs a deferred action and edits the placeholder response with its outcome.
pub async fn run_deferred(ctx: &AppContext, token: &str, action: DeferredAction) {
    let content = match action {
        DeferredAction::PublishPanel {
            guild,
            actor,
            channel,
        } => publish_as_staff(ctx, guild, actor, channel)
            .await
            .map(|panel| format!("✅ Ticket panel published in <#{}>.", panel.channel)),
        DeferredAction::Close { actor, channel } => close_ticket(ctx, actor, channel)
            .await
            .map(|report| report.user_message()),
        DeferredAction::Submit {
            guild,
            requester,
            category,
            fields,
        } => submit(ctx, guild, &requester, category, &fields)
            .await
            .map(|outcome| outcome.user_message()),
    }
    .unwrap_or_else(|err| {
        tracing::warn!(error = %err, "interaction failed");
        err.user_message()
    });

    if let Err(err) = ctx.followups.edit_original_response(token, &content).await {
        tracing::warn!(error = %err, "could not edit interaction response");
    }
}

async fn publish_as_staff(
    ctx: &AppContext,
    guild: GuildId,
    actor: UserId,
    channel: Option<ChannelId>,
) -> AppResult<crate::workflow::panel::PublishedPanel> {
    if !ctx
        .authorization
        .has_capability(guild, actor, Capability::Staff)
        .await?
    {
        return Err(AppError::Validation(
            "only staff can publish the ticket panel".to_string(),
        ));
    }
    publish_panel(ctx, channel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ticket::TicketStatus;
    use crate::infra::memory::{GUILD, Harness, PANEL_CHANNEL};

    fn interaction(raw: Value) -> Interaction {
        serde_json::from_value(raw).expect("interaction")
    }

    fn member(id: &str) -> Value {
        json!({ "user": { "id": id, "username": "steve" } })
    }

    #[test]
    fn answers_ping_with_pong() {
        let harness = Harness::new();
        let routed =
            route_interaction(&harness.ctx, &interaction(json!({ "id": "1", "type": 1 })))
                .expect("route");
        assert_eq!(routed.reply, InteractionReply::Pong);
        assert_eq!(routed.reply.to_json(), json!({ "type": 1 }));
    }

    #[test]
    fn category_select_opens_intake_modal() {
        let harness = Harness::new();
        let routed = route_interaction(
            &harness.ctx,
            &interaction(json!({
                "id": "2", "type": 3, "token": "t", "guild_id": "1", "channel_id": "5",
                "member": member("42"),
                "data": { "custom_id": CATEGORY_SELECT_ID, "values": ["appeal"] }
            })),
        )
        .expect("route");

        let body = routed.reply.to_json();
        assert_eq!(body["type"], 9);
        assert_eq!(body["data"]["custom_id"], "ticket:intake:appeal");
        assert_eq!(body["data"]["components"].as_array().map(Vec::len), Some(3));
        assert_eq!(body["data"]["components"][2]["components"][0]["style"], 2);
        assert!(routed.deferred.is_none());
    }

    #[test]
    fn drops_redelivered_interaction() {
        let harness = Harness::new();
        let raw = json!({
            "id": "3", "type": 3, "token": "t", "guild_id": "1", "channel_id": "9",
            "member": member("42"),
            "data": { "custom_id": CLOSE_BUTTON_ID }
        });
        let first = route_interaction(&harness.ctx, &interaction(raw.clone())).expect("first");
        assert!(first.deferred.is_some());

        let second = route_interaction(&harness.ctx, &interaction(raw)).expect("second");
        assert!(second.deferred.is_none());
        assert!(matches!(second.reply, InteractionReply::Message { .. }));
    }

    #[test]
    fn modal_submit_collects_fields() {
        let harness = Harness::new();
        let routed = route_interaction(
            &harness.ctx,
            &interaction(json!({
                "id": "4", "type": 5, "token": "tok", "guild_id": "1", "channel_id": "5",
                "member": member("42"),
                "data": {
                    "custom_id": "ticket:intake:bug",
                    "components": [
                        { "type": 1, "components": [{ "type": 4, "custom_id": "nickname", "value": "Steve" }] },
                        { "type": 1, "components": [{ "type": 4, "custom_id": "mode", "value": "Survival" }] },
                        { "type": 1, "components": [{ "type": 4, "custom_id": "detail", "value": "fell" }] }
                    ]
                }
            })),
        )
        .expect("route");

        let Some((token, DeferredAction::Submit { requester, category, fields, .. })) =
            routed.deferred
        else {
            panic!("expected a deferred submit");
        };
        assert_eq!(token, "tok");
        assert_eq!(requester.id, UserId(42));
        assert_eq!(category, TicketCategory::Bug);
        assert_eq!(fields.get("mode").map(String::as_str), Some("Survival"));
    }

    #[test]
    fn parses_publish_channel_option() {
        let harness = Harness::new();
        let routed = route_interaction(
            &harness.ctx,
            &interaction(json!({
                "id": "5", "type": 2, "token": "tok", "guild_id": "1", "channel_id": "5",
                "member": member("42"),
                "data": {
                    "name": "tickets",
                    "options": [{ "name": "publish", "type": 1, "options": [
                        { "name": "channel", "type": 7, "value": "77" }
                    ]}]
                }
            })),
        )
        .expect("route");
        assert_eq!(
            routed.deferred.map(|(_, action)| action),
            Some(DeferredAction::PublishPanel {
                guild: GUILD,
                actor: UserId(42),
                channel: Some(ChannelId(77)),
            })
        );
    }

    #[test]
    fn rejects_unknown_component() {
        let harness = Harness::new();
        let err = route_interaction(
            &harness.ctx,
            &interaction(json!({
                "id": "6", "type": 3, "token": "t", "guild_id": "1", "channel_id": "5",
                "member": member("42"),
                "data": { "custom_id": "shop:buy" }
            })),
        )
        .expect_err("unknown");
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn deferred_submit_edits_original_response() {
        let harness = Harness::new();
        let fields = HashMap::from([
            ("nickname".to_string(), "Steve".to_string()),
            ("mode".to_string(), "Survival".to_string()),
            ("detail".to_string(), "lost items".to_string()),
        ]);
        run_deferred(
            &harness.ctx,
            "tok",
            DeferredAction::Submit {
                guild: GUILD,
                requester: Requester {
                    id: UserId(42),
                    handle: "steve".to_string(),
                },
                category: TicketCategory::Bug,
                fields,
            },
        )
        .await;

        let ticket = harness
            .ctx
            .tickets
            .open_ticket_for(GUILD, UserId(42))
            .expect("ticket");
        assert_eq!(ticket.status, TicketStatus::Open);
        let followups = harness.platform.followups();
        assert_eq!(followups.len(), 1);
        assert_eq!(followups[0].0, "tok");
        assert!(followups[0].1.contains(&format!("<#{}>", ticket.channel_id)));
    }

    #[tokio::test]
    async fn deferred_submit_reports_validation_errors() {
        let harness = Harness::new();
        run_deferred(
            &harness.ctx,
            "tok",
            DeferredAction::Submit {
                guild: GUILD,
                requester: Requester {
                    id: UserId(42),
                    handle: "steve".to_string(),
                },
                category: TicketCategory::Bug,
                fields: HashMap::new(),
            },
        )
        .await;

        assert_eq!(harness.platform.created_count(), 0);
        assert_eq!(
            harness.platform.followups()[0].1,
            "❌ Nickname is required"
        );
    }

    #[tokio::test]
    async fn only_staff_publish_the_panel() {
        let harness = Harness::new();
        let action = DeferredAction::PublishPanel {
            guild: GUILD,
            actor: UserId(42),
            channel: None,
        };
        run_deferred(&harness.ctx, "a", action.clone()).await;
        assert!(harness.platform.sent_to(PANEL_CHANNEL).is_empty());

        harness.platform.add_staff(UserId(42));
        run_deferred(&harness.ctx, "b", action).await;
        assert_eq!(harness.platform.sent_to(PANEL_CHANNEL).len(), 1);
        assert!(harness.platform.followups()[1].1.starts_with("✅"));
    }
}
