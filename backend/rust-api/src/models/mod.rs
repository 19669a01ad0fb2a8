pub mod account;
pub mod calculator;
pub mod gating;
pub mod leaderboard;
pub mod progress;
pub mod qotd;
pub mod site;
pub mod user;
