use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::config::SupportSettings;
use crate::context::AppContext;
use crate::domain::channel::ChannelSpec;
use crate::domain::ids::{ChannelId, GuildId, MessageId, RoleId, UserId};
use crate::domain::message::OutgoingMessage;
use crate::domain::transcript::{TranscriptAttachment, TranscriptMessage};
use crate::error::{AppError, AppResult};
use crate::infra::transcript_dir::TranscriptDirectory;
use crate::services::{
    AuthorizationService, Capability, ChannelService, DeleteOutcome, InteractionFollowup,
    MessageService,
};
use crate::store::TicketStore;

pub const BOT_USER: UserId = UserId(1);

/// In-process stand-in for Discord used by the workflow tests.
pub struct MemoryPlatform {
    state: Mutex<PlatformState>,
    next_id: AtomicU64,
}

#[derive(Default)]
struct PlatformState {
    channels: HashMap<ChannelId, MemoryChannel>,
    staff: HashSet<UserId>,
    colors: HashMap<UserId, String>,
    fail_colors: bool,
    fail_create: bool,
    fail_fetch_on_page: Option<usize>,
    fetch_calls: usize,
    failing_sends: HashSet<ChannelId>,
    created: usize,
    deleted: Vec<ChannelId>,
    pins: Vec<(ChannelId, MessageId)>,
    followups: Vec<(String, String)>,
}

#[derive(Default, Clone)]
pub struct MemoryChannel {
    pub spec: Option<ChannelSpec>,
    pub history: Vec<TranscriptMessage>,
    pub sent: Vec<OutgoingMessage>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PlatformState::default()),
            next_id: AtomicU64::new(1_000),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, PlatformState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn add_channel(&self, channel: ChannelId) {
        self.state().channels.entry(channel).or_default();
    }

    pub fn add_staff(&self, user: UserId) {
        self.state().staff.insert(user);
    }

    pub fn set_color(&self, user: UserId, color: &str) {
        self.state().colors.insert(user, color.to_string());
    }

    pub fn fail_member_colors(&self) {
        self.state().fail_colors = true;
    }

    pub fn fail_channel_creation(&self) {
        self.state().fail_create = true;
    }

    /// Makes the n-th fetch_page call (1-based, counted from now) fail.
    pub fn fail_fetch_on_page(&self, page: usize) {
        let mut state = self.state();
        state.fetch_calls = 0;
        state.fail_fetch_on_page = Some(page);
    }

    pub fn fail_sends_to(&self, channel: ChannelId) {
        self.state().failing_sends.insert(channel);
    }

    pub fn seed_messages(&self, channel: ChannelId, author: UserId, count: usize) {
        for index in 0..count {
            let id = self.allocate();
            let message = message_at(id, author, format!("message {index}"));
            self.state()
                .channels
                .entry(channel)
                .or_default()
                .history
                .push(message);
        }
    }

    pub fn push_message(&self, channel: ChannelId, message: TranscriptMessage) {
        self.state()
            .channels
            .entry(channel)
            .or_default()
            .history
            .push(message);
    }

    pub fn remove_channel(&self, channel: ChannelId) {
        self.state().channels.remove(&channel);
    }

    pub fn channel(&self, channel: ChannelId) -> Option<MemoryChannel> {
        self.state().channels.get(&channel).cloned()
    }

    pub fn sent_to(&self, channel: ChannelId) -> Vec<OutgoingMessage> {
        self.channel(channel)
            .map(|channel| channel.sent)
            .unwrap_or_default()
    }

    pub fn created_count(&self) -> usize {
        self.state().created
    }

    pub fn deleted(&self) -> Vec<ChannelId> {
        self.state().deleted.clone()
    }

    pub fn pins(&self) -> Vec<(ChannelId, MessageId)> {
        self.state().pins.clone()
    }

    pub fn followups(&self) -> Vec<(String, String)> {
        self.state().followups.clone()
    }
}

pub fn message_at(id: u64, author: UserId, content: String) -> TranscriptMessage {
    TranscriptMessage {
        id: MessageId(id),
        author_id: author,
        author: format!("user{}", author.get()),
        display_name: format!("User {}", author.get()),
        color_hex: None,
        avatar_url: format!("https://cdn.example.com/avatars/{}.png", author.get()),
        timestamp: timestamp_for(id),
        content,
        attachments: Vec::<TranscriptAttachment>::new(),
        embed_count: 0,
    }
}

fn timestamp_for(id: u64) -> DateTime<Utc> {
    let base = Utc
        .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default();
    base + Duration::seconds(id as i64)
}

#[async_trait]
impl ChannelService for MemoryPlatform {
    async fn create_channel(&self, spec: &ChannelSpec) -> AppResult<ChannelId> {
        // give concurrent callers a chance to interleave
        tokio::task::yield_now().await;
        if self.state().fail_create {
            return Err(AppError::Platform("Missing Permissions".to_string()));
        }
        let channel = ChannelId(self.allocate());
        let mut state = self.state();
        state.created += 1;
        state.channels.insert(
            channel,
            MemoryChannel {
                spec: Some(spec.clone()),
                ..MemoryChannel::default()
            },
        );
        Ok(channel)
    }

    async fn delete_channel(&self, channel: ChannelId) -> AppResult<DeleteOutcome> {
        let mut state = self.state();
        if state.channels.remove(&channel).is_some() {
            state.deleted.push(channel);
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::NotFound)
        }
    }

    async fn channel_exists(&self, channel: ChannelId) -> AppResult<bool> {
        Ok(self.state().channels.contains_key(&channel))
    }
}

#[async_trait]
impl MessageService for MemoryPlatform {
    async fn send(&self, channel: ChannelId, message: OutgoingMessage) -> AppResult<MessageId> {
        if self.state().failing_sends.contains(&channel) {
            return Err(AppError::Platform("503 Service Unavailable".to_string()));
        }
        let id = self.allocate();
        let mut state = self.state();
        let Some(target) = state.channels.get_mut(&channel) else {
            return Err(AppError::Platform("Unknown Channel".to_string()));
        };
        let content = message.content.clone().unwrap_or_default();
        let mut record = message_at(id, BOT_USER, content);
        record.embed_count = message.embeds.len();
        target.history.push(record);
        target.sent.push(message);
        Ok(MessageId(id))
    }

    async fn fetch_page(
        &self,
        channel: ChannelId,
        before: Option<MessageId>,
        limit: usize,
    ) -> AppResult<Vec<TranscriptMessage>> {
        let mut state = self.state();
        state.fetch_calls += 1;
        if state.fail_fetch_on_page == Some(state.fetch_calls) {
            return Err(AppError::Platform("rate limited".to_string()));
        }
        let Some(target) = state.channels.get(&channel) else {
            return Err(AppError::Platform("Unknown Channel".to_string()));
        };
        let mut page: Vec<TranscriptMessage> = target
            .history
            .iter()
            .filter(|message| before.is_none_or(|cursor| message.id < cursor))
            .cloned()
            .collect();
        page.sort_by(|a, b| b.id.cmp(&a.id));
        page.truncate(limit);
        Ok(page)
    }

    async fn pin(&self, channel: ChannelId, message: MessageId) -> AppResult<()> {
        self.state().pins.push((channel, message));
        Ok(())
    }

    async fn member_colors(
        &self,
        _guild: GuildId,
        members: &[UserId],
    ) -> AppResult<HashMap<UserId, String>> {
        let state = self.state();
        if state.fail_colors {
            return Err(AppError::Platform("roles unavailable".to_string()));
        }
        Ok(members
            .iter()
            .filter_map(|member| Some((*member, state.colors.get(member)?.clone())))
            .collect())
    }
}

#[async_trait]
impl AuthorizationService for MemoryPlatform {
    async fn has_capability(
        &self,
        _guild: GuildId,
        actor: UserId,
        capability: Capability,
    ) -> AppResult<bool> {
        match capability {
            Capability::Staff => Ok(self.state().staff.contains(&actor)),
        }
    }
}

#[async_trait]
impl InteractionFollowup for MemoryPlatform {
    async fn edit_original_response(&self, token: &str, content: &str) -> AppResult<()> {
        self.state()
            .followups
            .push((token.to_string(), content.to_string()));
        Ok(())
    }
}

pub const GUILD: GuildId = GuildId(1);
pub const TICKETS_CATEGORY: ChannelId = ChannelId(2);
pub const LOGS_CHANNEL: ChannelId = ChannelId(3);
pub const STAFF_ROLE: RoleId = RoleId(4);
pub const PANEL_CHANNEL: ChannelId = ChannelId(5);

pub struct Harness {
    pub ctx: AppContext,
    pub platform: Arc<MemoryPlatform>,
    pub dir: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_hosting(None)
    }

    pub fn with_hosting(public_base_url: Option<&str>) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let platform = Arc::new(MemoryPlatform::new());
        platform.add_channel(LOGS_CHANNEL);
        platform.add_channel(PANEL_CHANNEL);

        let settings = SupportSettings {
            guild_id: GUILD,
            tickets_category_id: TICKETS_CATEGORY,
            logs_channel_id: LOGS_CHANNEL,
            staff_role_id: STAFF_ROLE,
            panel_channel_id: Some(PANEL_CHANNEL),
            delete_delay: std::time::Duration::from_secs(4),
        };
        let transcripts = Arc::new(TranscriptDirectory::new(
            dir.path().join("transcripts"),
            public_base_url.map(str::to_string),
        ));
        let ctx = AppContext::new(
            settings,
            platform.clone(),
            platform.clone(),
            platform.clone(),
            platform.clone(),
            transcripts,
            Arc::new(TicketStore::in_memory()),
        );
        Self { ctx, platform, dir }
    }
}
