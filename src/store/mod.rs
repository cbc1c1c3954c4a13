pub mod idempotency;
pub mod locks;
pub mod tickets;

pub use idempotency::IdempotencyStore;
pub use locks::OwnerLocks;
pub use tickets::TicketStore;
