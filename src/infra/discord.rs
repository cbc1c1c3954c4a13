use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{
    Client, RequestBuilder, Response, StatusCode,
    header::AUTHORIZATION,
    multipart::{Form, Part},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domain::channel::{ChannelSpec, OverwriteTarget, Permission};
use crate::domain::ids::{ChannelId, GuildId, MessageId, RoleId, UserId};
use crate::domain::message::{
    CATEGORY_SELECT_ID, CLOSE_BUTTON_ID, Component, Embed, OutgoingMessage,
};
use crate::domain::transcript::{TranscriptAttachment, TranscriptMessage};
use crate::error::{AppError, AppResult};
use crate::services::{
    AuthorizationService, Capability, ChannelService, DeleteOutcome, InteractionFollowup,
    MessageService,
};

const CDN_BASE: &str = "https://cdn.discordapp.com";
const MAX_ATTEMPTS: usize = 3;
const GUILD_TEXT: u8 = 0;
const OVERWRITE_ROLE: u8 = 0;
const OVERWRITE_MEMBER: u8 = 1;

/// REST client for the handful of Discord API v10 endpoints the ticket flows need.
pub struct DiscordClient {
    http: Client,
    api_base: String,
    token: Option<String>,
    application_id: Option<String>,
    staff_role: Option<RoleId>,
}

impl DiscordClient {
    pub fn new(
        api_base: String,
        token: Option<String>,
        application_id: Option<String>,
        staff_role: Option<RoleId>,
    ) -> Self {
        Self {
            http: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            application_id,
            staff_role,
        }
    }

    fn token(&self) -> AppResult<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| AppError::Configuration("DISCORD_TOKEN not configured".to_string()))
    }

    fn auth_header(token: &str) -> String {
        format!("Bot {token}")
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    /// Sends a request, waiting out 429 responses a couple of times before giving up.
    async fn execute(&self, build: impl Fn() -> AppResult<RequestBuilder>) -> AppResult<Response> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let response = build()?
                .send()
                .await
                .map_err(|err| AppError::Platform(format!("failed to call Discord: {err}")))?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS || attempt >= MAX_ATTEMPTS {
                return Ok(response);
            }

            let wait = response
                .json::<RateLimited>()
                .await
                .map(|body| body.retry_after)
                .unwrap_or(1.0);
            tracing::warn!(retry_after = wait, attempt, "rate limited by Discord");
            tokio::time::sleep(Duration::from_secs_f64(wait.clamp(0.0, 30.0))).await;
        }
    }

    async fn authed(
        &self,
        build: impl Fn(&Client) -> RequestBuilder,
    ) -> AppResult<Response> {
        let header = Self::auth_header(self.token()?);
        self.execute(|| Ok(build(&self.http).header(AUTHORIZATION, header.as_str())))
            .await
    }

    async fn fetch_member(&self, guild: GuildId, user: UserId) -> AppResult<Option<DiscordMember>> {
        let url = self.endpoint(&format!("/guilds/{guild}/members/{user}"));
        let response = self.authed(|http| http.get(&url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let member = Self::expect_success(response)
            .await?
            .json()
            .await
            .map_err(|err| AppError::Platform(format!("failed to parse member: {err}")))?;
        Ok(Some(member))
    }

    async fn expect_success(response: Response) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unable to read response>".to_string());
        Err(AppError::Platform(format!(
            "Discord responded with {status}: {body}"
        )))
    }
}

#[async_trait]
impl ChannelService for DiscordClient {
    async fn create_channel(&self, spec: &ChannelSpec) -> AppResult<ChannelId> {
        let url = self.endpoint(&format!("/guilds/{}/channels", spec.guild_id));
        let body = CreateChannelRequest::from_spec(spec);
        let response = self
            .authed(|http| http.post(&url).json(&body))
            .await?;
        let created: DiscordChannel = Self::expect_success(response)
            .await?
            .json()
            .await
            .map_err(|err| AppError::Platform(format!("failed to parse channel: {err}")))?;
        created.id.parse()
    }

    async fn delete_channel(&self, channel: ChannelId) -> AppResult<DeleteOutcome> {
        let url = self.endpoint(&format!("/channels/{channel}"));
        let response = self.authed(|http| http.delete(&url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(DeleteOutcome::NotFound);
        }
        Self::expect_success(response).await?;
        Ok(DeleteOutcome::Deleted)
    }

    async fn channel_exists(&self, channel: ChannelId) -> AppResult<bool> {
        let url = self.endpoint(&format!("/channels/{channel}"));
        let response = self.authed(|http| http.get(&url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::expect_success(response).await?;
        Ok(true)
    }
}

#[async_trait]
impl MessageService for DiscordClient {
    async fn send(&self, channel: ChannelId, message: OutgoingMessage) -> AppResult<MessageId> {
        let url = self.endpoint(&format!("/channels/{channel}/messages"));
        let payload = message_payload(&message);

        let response = match &message.attachment {
            None => self.authed(|http| http.post(&url).json(&payload)).await?,
            Some(file) => {
                let payload_json = payload.to_string();
                let header = Self::auth_header(self.token()?);
                self.execute(|| {
                    let part = Part::bytes(file.bytes.clone())
                        .file_name(file.filename.clone())
                        .mime_str(&file.content_type)
                        .map_err(|err| {
                            AppError::Platform(format!("invalid attachment type: {err}"))
                        })?;
                    let form = Form::new()
                        .text("payload_json", payload_json.clone())
                        .part("files[0]", part);
                    Ok(self
                        .http
                        .post(&url)
                        .header(AUTHORIZATION, header.as_str())
                        .multipart(form))
                })
                .await?
            }
        };

        let posted: DiscordMessageRef = Self::expect_success(response)
            .await?
            .json()
            .await
            .map_err(|err| AppError::Platform(format!("failed to parse message: {err}")))?;
        posted.id.parse()
    }

    async fn fetch_page(
        &self,
        channel: ChannelId,
        before: Option<MessageId>,
        limit: usize,
    ) -> AppResult<Vec<TranscriptMessage>> {
        let url = self.endpoint(&format!("/channels/{channel}/messages"));
        let mut query = vec![("limit", limit.to_string())];
        if let Some(before) = before {
            query.push(("before", before.to_string()));
        }
        let response = self.authed(|http| http.get(&url).query(&query)).await?;
        let page: Vec<DiscordMessage> = Self::expect_success(response)
            .await?
            .json()
            .await
            .map_err(|err| AppError::Platform(format!("failed to parse history: {err}")))?;

        page.into_iter().map(DiscordMessage::into_transcript).collect()
    }

    async fn pin(&self, channel: ChannelId, message: MessageId) -> AppResult<()> {
        let url = self.endpoint(&format!("/channels/{channel}/pins/{message}"));
        let response = self.authed(|http| http.put(&url)).await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn member_colors(
        &self,
        guild: GuildId,
        members: &[UserId],
    ) -> AppResult<HashMap<UserId, String>> {
        let url = self.endpoint(&format!("/guilds/{guild}/roles"));
        let response = self.authed(|http| http.get(&url)).await?;
        let roles: Vec<DiscordRole> = Self::expect_success(response)
            .await?
            .json()
            .await
            .map_err(|err| AppError::Platform(format!("failed to parse roles: {err}")))?;

        let mut colors = HashMap::new();
        for &member in members {
            let Some(profile) = self.fetch_member(guild, member).await? else {
                continue;
            };
            if let Some(color) = member_color(&roles, &profile.roles) {
                colors.insert(member, color);
            }
        }
        Ok(colors)
    }
}

#[async_trait]
impl AuthorizationService for DiscordClient {
    async fn has_capability(
        &self,
        guild: GuildId,
        actor: UserId,
        capability: Capability,
    ) -> AppResult<bool> {
        let Capability::Staff = capability;
        let staff_role = self
            .staff_role
            .ok_or_else(|| AppError::Configuration("STAFF_ROLE_ID not configured".to_string()))?;

        let Some(member) = self.fetch_member(guild, actor).await? else {
            return Ok(false);
        };
        Ok(member
            .roles
            .iter()
            .any(|role| role.parse::<RoleId>().ok() == Some(staff_role)))
    }
}

#[async_trait]
impl InteractionFollowup for DiscordClient {
    async fn edit_original_response(&self, token: &str, content: &str) -> AppResult<()> {
        let application_id = self.application_id.as_deref().ok_or_else(|| {
            AppError::Configuration("DISCORD_APPLICATION_ID not configured".to_string())
        })?;
        let url = self.endpoint(&format!(
            "/webhooks/{application_id}/{token}/messages/@original"
        ));
        let body = json!({ "content": content });
        let response = self
            .execute(|| Ok(self.http.patch(&url).json(&body)))
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }
}

pub fn permission_bits(permissions: &[Permission]) -> u64 {
    permissions
        .iter()
        .map(|permission| match permission {
            Permission::View => 1 << 10,
            Permission::Send => 1 << 11,
            Permission::Manage => 1 << 13,
            Permission::Attach => 1 << 15,
            Permission::ReadHistory => 1 << 16,
        })
        .fold(0, |bits, bit| bits | bit)
}

/// JSON body for `POST /channels/{id}/messages` (or `payload_json` when uploading).
pub fn message_payload(message: &OutgoingMessage) -> Value {
    let mut payload = json!({
        "allowed_mentions": { "parse": ["users"] },
    });
    if let Some(content) = &message.content {
        payload["content"] = json!(content);
    }
    if !message.embeds.is_empty() {
        let embeds: Vec<DiscordEmbed> = message.embeds.iter().map(DiscordEmbed::from).collect();
        payload["embeds"] = json!(embeds);
    }
    if !message.components.is_empty() {
        let rows: Vec<Value> = message.components.iter().map(component_row).collect();
        payload["components"] = json!(rows);
    }
    if let Some(file) = &message.attachment {
        payload["attachments"] = json!([{ "id": 0, "filename": file.filename }]);
    }
    payload
}

fn component_row(component: &Component) -> Value {
    let inner = match component {
        Component::CategorySelect(categories) => json!({
            "type": 3,
            "custom_id": CATEGORY_SELECT_ID,
            "placeholder": "Choose a category",
            "options": categories
                .iter()
                .map(|category| json!({
                    "label": category.label(),
                    "value": category.as_str(),
                    "emoji": { "name": category.emoji() },
                }))
                .collect::<Vec<_>>(),
        }),
        Component::CloseButton => json!({
            "type": 2,
            "style": 4,
            "label": "Close ticket",
            "custom_id": CLOSE_BUTTON_ID,
            "emoji": { "name": "🔒" },
        }),
        Component::LinkButton { label, url } => json!({
            "type": 2,
            "style": 5,
            "label": label,
            "url": url,
        }),
    };
    json!({ "type": 1, "components": [inner] })
}

/// Colour of the highest positioned role that has one; Discord uses 0 for "no colour".
fn member_color(roles: &[DiscordRole], member_roles: &[String]) -> Option<String> {
    roles
        .iter()
        .filter(|role| role.color != 0 && member_roles.contains(&role.id))
        .max_by_key(|role| role.position)
        .map(|role| format!("#{:06x}", role.color))
}

#[derive(Serialize)]
struct CreateChannelRequest {
    name: String,
    #[serde(rename = "type")]
    kind: u8,
    parent_id: String,
    permission_overwrites: Vec<DiscordOverwrite>,
}

impl CreateChannelRequest {
    fn from_spec(spec: &ChannelSpec) -> Self {
        Self {
            name: spec.name.as_str().to_string(),
            kind: GUILD_TEXT,
            parent_id: spec.parent_id.to_string(),
            permission_overwrites: spec
                .overwrites
                .iter()
                .map(|overwrite| {
                    let (id, kind) = match overwrite.target {
                        OverwriteTarget::Role(role) => (role.to_string(), OVERWRITE_ROLE),
                        OverwriteTarget::Member(user) => (user.to_string(), OVERWRITE_MEMBER),
                    };
                    DiscordOverwrite {
                        id,
                        kind,
                        allow: permission_bits(&overwrite.allow).to_string(),
                        deny: permission_bits(&overwrite.deny).to_string(),
                    }
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct DiscordOverwrite {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
    allow: String,
    deny: String,
}

#[derive(Serialize)]
struct DiscordEmbed {
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<DiscordEmbedName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<DiscordEmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<DiscordEmbedFooter>,
}

impl From<&Embed> for DiscordEmbed {
    fn from(embed: &Embed) -> Self {
        Self {
            author: embed
                .author
                .clone()
                .map(|name| DiscordEmbedName { name }),
            title: embed.title.clone(),
            description: embed.description.clone(),
            color: embed.color,
            fields: embed
                .fields
                .iter()
                .map(|field| DiscordEmbedField {
                    name: field.name.clone(),
                    value: field.value.clone(),
                    inline: field.inline,
                })
                .collect(),
            footer: embed
                .footer
                .clone()
                .map(|text| DiscordEmbedFooter { text }),
        }
    }
}

#[derive(Serialize)]
struct DiscordEmbedName {
    name: String,
}

#[derive(Serialize)]
struct DiscordEmbedField {
    name: String,
    value: String,
    inline: bool,
}

#[derive(Serialize)]
struct DiscordEmbedFooter {
    text: String,
}

#[derive(Deserialize)]
struct RateLimited {
    retry_after: f64,
}

#[derive(Deserialize)]
struct DiscordChannel {
    id: String,
}

#[derive(Deserialize)]
struct DiscordMessageRef {
    id: String,
}

#[derive(Deserialize)]
struct DiscordRole {
    id: String,
    #[serde(default)]
    color: u32,
    #[serde(default)]
    position: i64,
}

#[derive(Deserialize)]
struct DiscordMember {
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Deserialize)]
struct DiscordUser {
    id: String,
    username: String,
    #[serde(default)]
    global_name: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
}

#[derive(Deserialize)]
struct DiscordMessageMember {
    #[serde(default)]
    nick: Option<String>,
}

#[derive(Deserialize)]
struct DiscordAttachment {
    filename: String,
    url: String,
    #[serde(default)]
    content_type: Option<String>,
}

#[derive(Deserialize)]
struct DiscordMessage {
    id: String,
    author: DiscordUser,
    #[serde(default)]
    member: Option<DiscordMessageMember>,
    #[serde(default)]
    content: String,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    attachments: Vec<DiscordAttachment>,
    #[serde(default)]
    embeds: Vec<Value>,
}

impl DiscordMessage {
    fn into_transcript(self) -> AppResult<TranscriptMessage> {
        let author_id: UserId = self.author.id.parse()?;
        let avatar_url = match &self.author.avatar {
            Some(hash) => format!("{CDN_BASE}/avatars/{author_id}/{hash}.png"),
            None => format!(
                "{CDN_BASE}/embed/avatars/{}.png",
                (author_id.get() >> 22) % 6
            ),
        };
        let display_name = self
            .member
            .and_then(|member| member.nick)
            .or(self.author.global_name)
            .unwrap_or_else(|| self.author.username.clone());

        Ok(TranscriptMessage {
            id: self.id.parse()?,
            author_id,
            author: self.author.username,
            display_name,
            color_hex: None,
            avatar_url,
            timestamp: self.timestamp,
            content: self.content,
            attachments: self
                .attachments
                .into_iter()
                .map(|attachment| TranscriptAttachment {
                    filename: attachment.filename,
                    url: attachment.url,
                    content_type: attachment.content_type,
                })
                .collect(),
            embed_count: self.embeds.len(),
        })
    }
}
