pub mod attempts;
pub mod common;
pub mod competitions;
pub mod leaderboard;
pub mod seed;
pub mod service;
pub mod sync;
