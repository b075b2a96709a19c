mod chat;
mod health;
mod threats;

pub use chat::*;
pub use health::*;
pub use threats::*;
