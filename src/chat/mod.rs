//! Conversation state: the active-conversation view model and history
//! pagination.

pub mod pagination;
pub mod view_model;

pub use pagination::{Paginator, PAGE_SIZE};
pub use view_model::{
    ConversationViewModel, FREE_AI_MESSAGE_LIMIT, FREE_CONVERSATION_LIMIT,
};
