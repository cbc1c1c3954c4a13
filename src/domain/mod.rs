pub mod channel;
pub mod ids;
pub mod message;
pub mod ticket;
pub mod transcript;
