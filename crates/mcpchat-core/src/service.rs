//! Chat application flow
//!
//! [`ChatService`] ties the store to the chat loop: it keeps conversations,
//! persists each exchange and names a conversation after its first message.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::chat::{ChatClient, ChatError, ChatStop, ToolCallRecord};
use crate::store::{ChatStore, Conversation, StoreError, StoredMessage, StoredRole, DEFAULT_TITLE};
use crate::tools::{ResourceInfo, ToolFilter, ToolInfo, ToolRegistry};

/// Characters of the first message used as a conversation title
const TITLE_CHARS: usize = 50;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Empty message")]
    EmptyMessage,

    #[error("Conversation {0} not found")]
    ConversationNotFound(i64),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Chat(ChatError),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::Store(e)
    }
}

impl From<ChatError> for ServiceError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::EmptyMessage => ServiceError::EmptyMessage,
            other => ServiceError::Chat(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// One answered user message
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    pub user_message: String,
    pub assistant_response: String,
    pub tool_calls: Vec<ToolCallRecord>,
    #[serde(skip)]
    pub conversation_id: i64,
    #[serde(skip)]
    pub stop: ChatStop,
}

/// State shown on the index view
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub conversations: Vec<Conversation>,
    pub current_conversation: Conversation,
    pub messages: Vec<StoredMessage>,
    pub available_tools: Vec<ToolInfo>,
}

/// Registered tools and resources
#[derive(Debug, Clone, Serialize)]
pub struct ToolListing {
    pub tools: Vec<ToolInfo>,
    pub resources: Vec<ResourceInfo>,
}

/// Title for a conversation, from its first user message
pub fn title_from_message(message: &str) -> String {
    let mut chars = message.chars();
    let head: String = chars.by_ref().take(TITLE_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

pub struct ChatService {
    store: ChatStore,
    chat: ChatClient,
    recent_conversations: usize,
}

impl ChatService {
    pub fn new(store: ChatStore, chat: ChatClient, recent_conversations: usize) -> Self {
        Self {
            store,
            chat,
            recent_conversations,
        }
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.chat.registry()
    }

    /// The conversation with `id`, or a fresh one when the id is absent or stale
    pub async fn current_or_new(&self, id: Option<i64>) -> ServiceResult<Conversation> {
        if let Some(id) = id {
            if let Some(conversation) = self.store.run(move |s| s.get_conversation(id)).await? {
                return Ok(conversation);
            }
            warn!(conversation_id = id, "Stale conversation id, starting a new conversation");
        }
        self.new_conversation().await
    }

    pub async fn new_conversation(&self) -> ServiceResult<Conversation> {
        let conversation = self.store.run(|s| s.create_conversation(DEFAULT_TITLE)).await?;
        info!(conversation_id = conversation.id, "Started conversation");
        Ok(conversation)
    }

    /// Look up a conversation to make current
    pub async fn switch(&self, id: i64) -> ServiceResult<Conversation> {
        self.store
            .run(move |s| s.get_conversation(id))
            .await?
            .ok_or(ServiceError::ConversationNotFound(id))
    }

    /// Index view state; creates a conversation when `current` is absent or stale
    pub async fn overview(&self, current: Option<i64>) -> ServiceResult<Overview> {
        let current_conversation = self.current_or_new(current).await?;
        let id = current_conversation.id;
        let limit = self.recent_conversations;
        let (conversations, messages) = self
            .store
            .run(move |s| Ok((s.list_conversations(limit)?, s.list_messages(id)?)))
            .await?;

        Ok(Overview {
            conversations,
            current_conversation,
            messages,
            available_tools: self.registry().all_tools(),
        })
    }

    /// Every registered tool, enabled or not, and every resource
    pub async fn tool_listing(&self) -> ToolListing {
        ToolListing {
            tools: self.registry().get_tools(&ToolFilter::all()),
            resources: self.registry().all_resources().await,
        }
    }

    /// Persist the user message, run the chat loop and persist the answer
    pub async fn send(&self, conversation_id: i64, message: &str) -> ServiceResult<Exchange> {
        let message = message.trim().to_string();
        if message.is_empty() {
            return Err(ServiceError::EmptyMessage);
        }

        let content = message.clone();
        let (user_message, history) = self
            .store
            .run(move |s| {
                if s.get_conversation(conversation_id)?.is_none() {
                    return Err(StoreError::conversation_not_found(conversation_id));
                }
                let stored = s.add_message(conversation_id, StoredRole::User, &content, None)?;
                let history = s.history_before(conversation_id, stored.id)?;
                Ok((stored, history))
            })
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => ServiceError::ConversationNotFound(conversation_id),
                other => ServiceError::Store(other),
            })?;

        info!(
            conversation_id,
            message_id = user_message.id,
            history = history.len(),
            "Processing user message"
        );

        let outcome = self.chat.send_message(&message, history).await?;

        let response = outcome.response.clone();
        let tool_calls = outcome.tool_calls.clone();
        let first_message = message.clone();
        self.store
            .run(move |s| {
                s.add_message(conversation_id, StoredRole::Assistant, &response, Some(tool_calls.as_slice()))?;
                if s.count_messages(conversation_id)? == 2 {
                    s.rename_conversation(conversation_id, &title_from_message(&first_message))?;
                }
                Ok(())
            })
            .await?;

        Ok(Exchange {
            user_message: message,
            assistant_response: outcome.response,
            tool_calls: outcome.tool_calls,
            conversation_id,
            stop: outcome.stop,
        })
    }
}
