// Public API - what other modules can use
pub use handlers::{
    create_room_message, get_room_message, list_room_messages, mark_message_answered,
    react_to_message, remove_reaction_from_message,
};

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
pub mod types;
