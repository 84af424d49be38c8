pub mod ask;
pub mod health;
