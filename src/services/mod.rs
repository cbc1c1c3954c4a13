pub mod authorization;
pub mod channels;
pub mod interactions;
pub mod messages;
pub mod transcripts;

pub use authorization::{AuthorizationService, Capability};
pub use channels::{ChannelService, DeleteOutcome};
pub use interactions::InteractionFollowup;
pub use messages::MessageService;
pub use transcripts::{StoredTranscript, TranscriptHost};
