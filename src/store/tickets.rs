use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::{ChannelId, GuildId, UserId};
use crate::domain::ticket::{Ticket, TicketStatus};
use crate::error::{AppError, AppResult};

const STORE_FILE_NAME: &str = "tickets.json";
const CLOSED_HISTORY_LIMIT: usize = 512;

#[derive(Default, Serialize, Deserialize)]
struct StoreFile {
    tickets: Vec<Ticket>,
}

/// Typed channel -> owner mapping. This is the only place a ticket channel is
/// attributed to the member who opened it.
pub struct TicketStore {
    file_path: Option<PathBuf>,
    file: Mutex<StoreFile>,
}

impl TicketStore {
    pub fn load(dir: &Path) -> AppResult<Self> {
        let path = dir.join(STORE_FILE_NAME);
        let file = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<StoreFile>(&contents)
                .map_err(|err| AppError::Storage(format!("invalid ticket store: {err}")))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreFile::default(),
            Err(err) => return Err(AppError::Io(err)),
        };

        Ok(Self {
            file_path: Some(path),
            file: Mutex::new(file),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            file_path: None,
            file: Mutex::new(StoreFile::default()),
        }
    }

    pub fn get(&self, channel: ChannelId) -> Option<Ticket> {
        let file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.tickets
            .iter()
            .find(|ticket| ticket.channel_id == channel)
            .cloned()
    }

    pub fn open_ticket_for(&self, guild: GuildId, owner: UserId) -> Option<Ticket> {
        let file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.tickets
            .iter()
            .find(|ticket| ticket.guild_id == guild && ticket.owner_id == owner && ticket.is_open())
            .cloned()
    }

    pub fn open_tickets(&self) -> Vec<Ticket> {
        let file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.tickets
            .iter()
            .filter(|ticket| ticket.is_open())
            .cloned()
            .collect()
    }

    pub fn insert(&self, ticket: Ticket) -> AppResult<()> {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let conflict = file.tickets.iter().any(|existing| {
            existing.channel_id == ticket.channel_id
                || (existing.is_open()
                    && existing.guild_id == ticket.guild_id
                    && existing.owner_id == ticket.owner_id)
        });
        if conflict {
            return Err(AppError::Storage(format!(
                "member {} already owns an open ticket",
                ticket.owner_id
            )));
        }
        let mut next = file.tickets.clone();
        next.push(ticket);
        self.commit(&mut file, next)
    }

    /// Performs the single Open -> Closed transition.
    pub fn mark_closed(
        &self,
        channel: ChannelId,
        closed_by: UserId,
        closed_at: DateTime<Utc>,
    ) -> AppResult<Ticket> {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = file.tickets.clone();
        let ticket = next
            .iter_mut()
            .find(|ticket| ticket.channel_id == channel && ticket.is_open())
            .ok_or(AppError::NotATicketChannel(channel))?;
        ticket.status = TicketStatus::Closed;
        ticket.closed_at = Some(closed_at);
        ticket.closed_by = Some(closed_by);
        let closed = ticket.clone();
        self.commit(&mut file, next)?;
        Ok(closed)
    }

    /// Closes out a ticket whose channel vanished without going through the close workflow.
    pub fn mark_gone(&self, channel: ChannelId, at: DateTime<Utc>) -> AppResult<()> {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = file.tickets.clone();
        let Some(ticket) = next
            .iter_mut()
            .find(|ticket| ticket.channel_id == channel && ticket.is_open())
        else {
            return Ok(());
        };
        ticket.status = TicketStatus::Closed;
        ticket.closed_at = Some(at);
        self.commit(&mut file, next)
    }

    /// Writes `next` to disk and only then makes it the live state, so a failed
    /// write leaves memory and file in agreement.
    fn commit(&self, file: &mut StoreFile, mut next: Vec<Ticket>) -> AppResult<()> {
        trim_closed_history(&mut next);
        let next = StoreFile { tickets: next };
        self.write(&next)?;
        *file = next;
        Ok(())
    }

    fn write(&self, file: &StoreFile) -> AppResult<()> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(file)
            .map_err(|err| AppError::Storage(format!("failed to encode ticket store: {err}")))?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, data)?;
        fs::rename(&staging, path)?;
        Ok(())
    }
}

fn trim_closed_history(tickets: &mut Vec<Ticket>) {
    let closed = tickets.iter().filter(|ticket| !ticket.is_open()).count();
    if closed <= CLOSED_HISTORY_LIMIT {
        return;
    }
    let mut overflow = closed - CLOSED_HISTORY_LIMIT;
    tickets.retain(|ticket| {
        if overflow > 0 && !ticket.is_open() {
            overflow -= 1;
            false
        } else {
            true
        }
    });
}
