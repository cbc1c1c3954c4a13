pub mod close;
pub mod deletion;
pub mod intake;
pub mod lifecycle;
pub mod panel;
