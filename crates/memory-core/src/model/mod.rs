pub mod board;
pub mod layout;
pub mod player;
pub mod position;
pub mod score;
