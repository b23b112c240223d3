pub mod health;
pub mod leaderboard;
pub mod quiz;
pub mod session;
pub mod student;
pub mod whitelist;
