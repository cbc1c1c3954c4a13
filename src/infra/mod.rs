pub mod discord;
pub mod transcript_dir;

#[cfg(test)]
pub mod memory;
