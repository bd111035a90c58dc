mod command;
mod dispatch;
mod event;
mod history;
mod presence;
mod registry;
mod stream;
pub mod heartbeat;

use axum::{Router, routing::get};

use crate::AppState;

pub use command::Command;
pub use dispatch::{ConnectionState, Relay};
pub use event::{ConnectionId, Event, Message, PrivacyMarker, User};
pub use history::History;
pub use presence::{Joined, Presence};
pub use registry::DeliveryError;
pub use stream::event_stream;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat", get(stream::connect).post(command::command))
}
