//! Real-time WebSocket gateway: channel messages, typing, presence and
//! counter updates pushed to connected members.

pub mod connection;
pub mod dispatcher;

pub use connection::handle_connection;
pub use dispatcher::Dispatcher;
