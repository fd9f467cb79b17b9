mod handler;
mod message;

pub use handler::ws_handler;
pub use message::{FeedMessage, YIELD_UPDATE_EVENT};
