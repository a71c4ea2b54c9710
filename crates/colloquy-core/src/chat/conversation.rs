//! Conversation orchestrator owning one chat session's lifecycle.
//!
//! `Conversation` coordinates message creation, history assembly, call
//! record bookkeeping, provider invocation, and counter updates. It is
//! generic over [`ChatStore`] and [`ActorStore`] to maintain clean
//! architecture (colloquy-core never depends on colloquy-infra); the
//! completion provider is handed to [`Conversation::send_user_message`]
//! per call.

use colloquy_types::actor::{Actor, ActorId, DEFAULT_USER_HANDLE, LLM_ACTOR_HANDLE};
use colloquy_types::chat::{CallRecord, Chat, Message, MessageRole, Turn};
use colloquy_types::error::{ChatError, StoreError};
use colloquy_types::llm::{Completion, PromptMessage};
use tracing::{info, warn};
use uuid::Uuid;

use crate::actor::ActorStore;
use crate::chat::store::ChatStore;
use crate::llm::provider::CompletionProvider;

/// Orchestrates one chat session.
///
/// Each instance owns references to exactly one [`Chat`] and the two
/// resolved built-in actors. There is no shared state across instances;
/// concurrent orchestrators on the same chat interleave at the store.
pub struct Conversation<S: ChatStore, A: ActorStore> {
    store: S,
    actors: A,
    chat: Chat,
    llm_actor: Actor,
    default_actor: Actor,
}

impl<S: ChatStore, A: ActorStore> Conversation<S, A> {
    /// Create a new chat session.
    ///
    /// Resolves the two built-in actors by their well-known handles
    /// (creating them on first-ever use) and persists a fresh chat row.
    pub async fn create(store: S, actors: A) -> Result<Self, ChatError> {
        let llm_actor = actors.resolve_or_create(LLM_ACTOR_HANDLE).await?;
        let default_actor = actors.resolve_or_create(DEFAULT_USER_HANDLE).await?;

        let chat = Chat::new();
        store.create_chat(&chat).await?;
        info!(chat_id = %chat.id, "Chat created");

        Ok(Self {
            store,
            actors,
            chat,
            llm_actor,
            default_actor,
        })
    }

    /// Bind an orchestrator to an existing chat.
    ///
    /// Fails with [`ChatError::ChatNotFound`] when no such chat exists.
    pub async fn resume(store: S, actors: A, chat_id: Uuid) -> Result<Self, ChatError> {
        let chat = store
            .get_chat(&chat_id)
            .await?
            .ok_or(ChatError::ChatNotFound(chat_id))?;

        let llm_actor = actors.resolve_or_create(LLM_ACTOR_HANDLE).await?;
        let default_actor = actors.resolve_or_create(DEFAULT_USER_HANDLE).await?;

        Ok(Self {
            store,
            actors,
            chat,
            llm_actor,
            default_actor,
        })
    }

    /// The chat this orchestrator is bound to.
    ///
    /// Counters reflect the last refresh from the store (refreshed after
    /// each successful send).
    pub fn chat(&self) -> &Chat {
        &self.chat
    }

    /// The built-in actor credited with assistant messages.
    pub fn llm_actor(&self) -> &Actor {
        &self.llm_actor
    }

    /// The built-in fallback author for user messages.
    pub fn default_actor(&self) -> &Actor {
        &self.default_actor
    }

    /// Access the actor store.
    pub fn actors(&self) -> &A {
        &self.actors
    }

    /// Append a `user`-role message to the history.
    ///
    /// No validation is done on the text; empty strings are permitted.
    /// When `actor` is `None` the default human actor is credited.
    pub async fn create_user_message(
        &self,
        text: &str,
        actor: Option<ActorId>,
    ) -> Result<Message, ChatError> {
        let actor_id = actor.unwrap_or_else(|| self.default_actor.id.clone());
        let message = Message::new(self.chat.id, MessageRole::User, text, actor_id);
        self.store.save_message(&message).await?;
        Ok(message)
    }

    /// Append the chat's single `system`-role message.
    ///
    /// Fails with [`ChatError::DuplicateSystemMessage`] if one already
    /// exists. The existence check immediately precedes the write; two
    /// concurrent callers can both pass it (known race, unremediated).
    pub async fn create_system_message(
        &self,
        text: &str,
        actor: Option<ActorId>,
    ) -> Result<Message, ChatError> {
        if self.store.has_system_message(&self.chat.id).await? {
            warn!(chat_id = %self.chat.id, "Rejected second system message");
            return Err(ChatError::DuplicateSystemMessage);
        }

        let actor_id = actor.unwrap_or_else(|| self.default_actor.id.clone());
        let message = Message::new(self.chat.id, MessageRole::System, text, actor_id);
        self.store.save_message(&message).await?;
        Ok(message)
    }

    /// The full ordered message history, ascending by creation time.
    pub async fn history(&self) -> Result<Vec<Message>, ChatError> {
        Ok(self.store.get_messages(&self.chat.id, None, None).await?)
    }

    /// Create a call record in `new` status over the given messages.
    ///
    /// The association order carries no meaning; messages are attached in
    /// one batch write.
    pub async fn create_call(&self, messages: &[Message]) -> Result<CallRecord, ChatError> {
        let call = CallRecord::new(self.chat.id);
        self.store.create_call(&call).await?;

        let message_ids: Vec<Uuid> = messages.iter().map(|m| m.id).collect();
        self.store
            .attach_call_messages(&call.id, &message_ids)
            .await?;

        Ok(call)
    }

    /// Run one full user turn against the provider.
    ///
    /// Persists the user message, builds the request context (full history
    /// when `include_history`, else just the new message), records the call,
    /// invokes the provider once, then on success books the token usage on
    /// the chat, completes the call record, and persists the assistant
    /// reply.
    ///
    /// On provider failure the user message and the `new`-status call
    /// record stay persisted. That partial state is deliberate: an
    /// inspector can see that a turn was attempted but never completed.
    pub async fn send_user_message<P: CompletionProvider>(
        &mut self,
        provider: &P,
        model_name: &str,
        text: &str,
        actor: Option<ActorId>,
        include_history: bool,
    ) -> Result<Turn, ChatError> {
        let user = self.create_user_message(text, actor).await?;

        let context = if include_history {
            self.history().await?
        } else {
            vec![user.clone()]
        };

        let call = self.create_call(&context).await?;

        let prompt: Vec<PromptMessage> = context.iter().map(PromptMessage::from).collect();

        info!(
            chat_id = %self.chat.id,
            call_id = %call.id,
            model = model_name,
            provider = provider.name(),
            context_len = prompt.len(),
            "Dispatching completion request"
        );

        let Completion { text: reply, data } = provider.complete(model_name, &prompt).await?;

        let input_tokens = data.usage.prompt_tokens;
        let output_tokens = data.usage.completion_tokens;

        self.store
            .add_chat_tokens(&self.chat.id, input_tokens as u64, output_tokens as u64)
            .await?;
        self.store
            .complete_call(&call.id, input_tokens, output_tokens, &data)
            .await?;

        let assistant = Message::new(
            self.chat.id,
            MessageRole::Assistant,
            reply,
            self.llm_actor.id.clone(),
        );
        self.store.save_message(&assistant).await?;
        self.store
            .attach_call_messages(&call.id, &[assistant.id])
            .await?;

        let call = self
            .store
            .get_call(&call.id)
            .await?
            .ok_or(StoreError::NotFound)?;
        self.chat = self
            .store
            .get_chat(&self.chat.id)
            .await?
            .ok_or(ChatError::ChatNotFound(self.chat.id))?;

        info!(
            chat_id = %self.chat.id,
            call_id = %call.id,
            input_tokens,
            output_tokens,
            "Completion recorded"
        );

        Ok(Turn {
            user,
            assistant,
            call,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_types::chat::CallStatus;
    use colloquy_types::error::ProviderError;
    use colloquy_types::llm::{ResponseData, TokenUsage};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    // ------------------------------------------------------------------
    // In-memory store stub (shared state via Arc so tests can inspect it)
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct MemoryState {
        chats: HashMap<Uuid, Chat>,
        messages: Vec<Message>,
        calls: HashMap<Uuid, CallRecord>,
        call_messages: Vec<(Uuid, Uuid)>,
        actors: Vec<Actor>,
    }

    #[derive(Clone, Default)]
    struct MemoryStore {
        state: Arc<Mutex<MemoryState>>,
    }

    impl ChatStore for MemoryStore {
        async fn create_chat(&self, chat: &Chat) -> Result<(), StoreError> {
            let mut state = self.state.lock().unwrap();
            state.chats.insert(chat.id, chat.clone());
            Ok(())
        }

        async fn get_chat(&self, chat_id: &Uuid) -> Result<Option<Chat>, StoreError> {
            let state = self.state.lock().unwrap();
            Ok(state.chats.get(chat_id).cloned())
        }

        async fn list_chats(
            &self,
            _limit: Option<i64>,
            _offset: Option<i64>,
        ) -> Result<Vec<Chat>, StoreError> {
            let state = self.state.lock().unwrap();
            Ok(state.chats.values().cloned().collect())
        }

        async fn delete_chat(&self, chat_id: &Uuid) -> Result<(), StoreError> {
            let mut state = self.state.lock().unwrap();
            state.chats.remove(chat_id).ok_or(StoreError::NotFound)?;
            state.messages.retain(|m| m.chat_id != *chat_id);
            state.calls.retain(|_, c| c.chat_id != *chat_id);
            Ok(())
        }

        async fn add_chat_tokens(
            &self,
            chat_id: &Uuid,
            input_tokens: u64,
            output_tokens: u64,
        ) -> Result<(), StoreError> {
            let mut state = self.state.lock().unwrap();
            let chat = state.chats.get_mut(chat_id).ok_or(StoreError::NotFound)?;
            chat.input_tokens_total += input_tokens;
            chat.output_tokens_total += output_tokens;
            chat.updated_at = chrono::Utc::now();
            Ok(())
        }

        async fn save_message(&self, message: &Message) -> Result<(), StoreError> {
            let mut state = self.state.lock().unwrap();
            state.messages.push(message.clone());
            Ok(())
        }

        async fn get_messages(
            &self,
            chat_id: &Uuid,
            _limit: Option<i64>,
            _offset: Option<i64>,
        ) -> Result<Vec<Message>, StoreError> {
            let state = self.state.lock().unwrap();
            let mut messages: Vec<Message> = state
                .messages
                .iter()
                .filter(|m| m.chat_id == *chat_id)
                .cloned()
                .collect();
            messages.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
            Ok(messages)
        }

        async fn has_system_message(&self, chat_id: &Uuid) -> Result<bool, StoreError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .messages
                .iter()
                .any(|m| m.chat_id == *chat_id && m.role == MessageRole::System))
        }

        async fn count_messages(&self, chat_id: &Uuid) -> Result<u64, StoreError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .messages
                .iter()
                .filter(|m| m.chat_id == *chat_id)
                .count() as u64)
        }

        async fn create_call(&self, call: &CallRecord) -> Result<(), StoreError> {
            let mut state = self.state.lock().unwrap();
            state.calls.insert(call.id, call.clone());
            Ok(())
        }

        async fn attach_call_messages(
            &self,
            call_id: &Uuid,
            message_ids: &[Uuid],
        ) -> Result<(), StoreError> {
            let mut state = self.state.lock().unwrap();
            for message_id in message_ids {
                let pair = (*call_id, *message_id);
                if !state.call_messages.contains(&pair) {
                    state.call_messages.push(pair);
                }
            }
            Ok(())
        }

        async fn get_call(&self, call_id: &Uuid) -> Result<Option<CallRecord>, StoreError> {
            let state = self.state.lock().unwrap();
            Ok(state.calls.get(call_id).cloned())
        }

        async fn get_call_message_ids(&self, call_id: &Uuid) -> Result<Vec<Uuid>, StoreError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .call_messages
                .iter()
                .filter(|(c, _)| c == call_id)
                .map(|(_, m)| *m)
                .collect())
        }

        async fn complete_call(
            &self,
            call_id: &Uuid,
            input_tokens: u32,
            output_tokens: u32,
            response_data: &ResponseData,
        ) -> Result<(), StoreError> {
            let mut state = self.state.lock().unwrap();
            let call = state.calls.get_mut(call_id).ok_or(StoreError::NotFound)?;
            call.input_tokens = input_tokens;
            call.output_tokens = output_tokens;
            call.response_data = Some(response_data.clone());
            call.status = CallStatus::GenerationCompleted;
            call.updated_at = chrono::Utc::now();
            Ok(())
        }

        async fn list_calls(
            &self,
            chat_id: Option<&Uuid>,
            _limit: Option<i64>,
            _offset: Option<i64>,
        ) -> Result<Vec<CallRecord>, StoreError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .calls
                .values()
                .filter(|c| chat_id.is_none_or(|id| c.chat_id == *id))
                .cloned()
                .collect())
        }
    }

    impl ActorStore for MemoryStore {
        async fn resolve_or_create(&self, handle: &str) -> Result<Actor, StoreError> {
            let mut state = self.state.lock().unwrap();
            if let Some(actor) = state.actors.iter().find(|a| a.handle == handle) {
                return Ok(actor.clone());
            }
            let actor = Actor::new(handle);
            state.actors.push(actor.clone());
            Ok(actor)
        }

        async fn get_actor(&self, actor_id: &ActorId) -> Result<Option<Actor>, StoreError> {
            let state = self.state.lock().unwrap();
            Ok(state.actors.iter().find(|a| a.id == *actor_id).cloned())
        }
    }

    // ------------------------------------------------------------------
    // Provider stub
    // ------------------------------------------------------------------

    #[derive(Clone)]
    struct StubProvider {
        reply: String,
        prompt_tokens: u32,
        completion_tokens: u32,
        fail: bool,
        seen: Arc<Mutex<Vec<Vec<PromptMessage>>>>,
    }

    impl StubProvider {
        fn replying(reply: &str, prompt_tokens: u32, completion_tokens: u32) -> Self {
            Self {
                reply: reply.to_string(),
                prompt_tokens,
                completion_tokens,
                fail: false,
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::replying("", 0, 0)
            }
        }

        fn requests(&self) -> Vec<Vec<PromptMessage>> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl CompletionProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn complete(
            &self,
            model: &str,
            messages: &[PromptMessage],
        ) -> Result<Completion, ProviderError> {
            if self.fail {
                return Err(ProviderError::Transport("connection refused".to_string()));
            }
            self.seen.lock().unwrap().push(messages.to_vec());

            let mut message = serde_json::Map::new();
            message.insert("refusal".to_string(), serde_json::Value::Null);

            Ok(Completion {
                text: self.reply.clone(),
                data: ResponseData {
                    id: "chatcmpl-stub".to_string(),
                    model: model.to_string(),
                    usage: TokenUsage {
                        prompt_tokens: self.prompt_tokens,
                        completion_tokens: self.completion_tokens,
                        total_tokens: Some(self.prompt_tokens + self.completion_tokens),
                        extra: serde_json::Map::new(),
                    },
                    message,
                },
            })
        }
    }

    async fn new_conversation(store: &MemoryStore) -> Conversation<MemoryStore, MemoryStore> {
        Conversation::create(store.clone(), store.clone())
            .await
            .unwrap()
    }

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_resolves_both_actors() {
        let store = MemoryStore::default();
        let conv = new_conversation(&store).await;

        assert_eq!(conv.llm_actor().handle, LLM_ACTOR_HANDLE);
        assert_eq!(conv.default_actor().handle, DEFAULT_USER_HANDLE);
        assert_eq!(conv.chat().input_tokens_total, 0);
        assert_eq!(conv.chat().output_tokens_total, 0);
    }

    #[tokio::test]
    async fn test_actor_resolution_is_idempotent() {
        let store = MemoryStore::default();
        let first = new_conversation(&store).await;
        let second = new_conversation(&store).await;

        assert_eq!(first.llm_actor().id, second.llm_actor().id);
        assert_eq!(first.default_actor().id, second.default_actor().id);
        assert_eq!(store.state.lock().unwrap().actors.len(), 2);
    }

    #[tokio::test]
    async fn test_resume_missing_chat_fails() {
        let store = MemoryStore::default();
        let missing = Uuid::now_v7();
        let result = Conversation::resume(store.clone(), store.clone(), missing).await;
        assert!(matches!(result, Err(ChatError::ChatNotFound(id)) if id == missing));
    }

    #[tokio::test]
    async fn test_resume_binds_existing_chat() {
        let store = MemoryStore::default();
        let conv = new_conversation(&store).await;
        let chat_id = conv.chat().id;
        conv.create_user_message("hello", None).await.unwrap();

        let resumed = Conversation::resume(store.clone(), store.clone(), chat_id)
            .await
            .unwrap();
        assert_eq!(resumed.chat().id, chat_id);
        assert_eq!(resumed.history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_user_message_defaults_to_default_actor() {
        let store = MemoryStore::default();
        let conv = new_conversation(&store).await;

        let message = conv.create_user_message("hello", None).await.unwrap();
        assert_eq!(message.role, MessageRole::User);
        assert_eq!(message.actor_id, conv.default_actor().id);

        let other = ActorId::new();
        let message = conv
            .create_user_message("hi", Some(other.clone()))
            .await
            .unwrap();
        assert_eq!(message.actor_id, other);
    }

    #[tokio::test]
    async fn test_empty_user_message_is_permitted() {
        let store = MemoryStore::default();
        let conv = new_conversation(&store).await;
        let message = conv.create_user_message("", None).await.unwrap();
        assert_eq!(message.body, "");
        assert_eq!(conv.history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_second_system_message_rejected() {
        let store = MemoryStore::default();
        let conv = new_conversation(&store).await;

        conv.create_system_message("rules", None).await.unwrap();
        let result = conv.create_system_message("more rules", None).await;
        assert!(matches!(result, Err(ChatError::DuplicateSystemMessage)));

        // History still contains exactly one system message.
        let history = conv.history().await.unwrap();
        let system_count = history
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .count();
        assert_eq!(system_count, 1);
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_history_is_ordered_by_creation() {
        let store = MemoryStore::default();
        let conv = new_conversation(&store).await;

        conv.create_system_message("rules", None).await.unwrap();
        conv.create_user_message("first", None).await.unwrap();
        conv.create_user_message("second", None).await.unwrap();

        let history = conv.history().await.unwrap();
        assert_eq!(history.len(), 3);
        for pair in history.windows(2) {
            assert!(pair[0].created_at <= pair[1].created_at);
        }
        assert_eq!(history[0].body, "rules");
        assert_eq!(history[1].body, "first");
        assert_eq!(history[2].body, "second");
    }

    #[tokio::test]
    async fn test_create_call_starts_new_with_associations() {
        let store = MemoryStore::default();
        let conv = new_conversation(&store).await;

        let m1 = conv.create_user_message("a", None).await.unwrap();
        let m2 = conv.create_user_message("b", None).await.unwrap();

        let call = conv.create_call(&[m1.clone(), m2.clone()]).await.unwrap();
        assert_eq!(call.status, CallStatus::New);
        assert!(call.response_data.is_none());

        let ids = store.get_call_message_ids(&call.id).await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&m1.id));
        assert!(ids.contains(&m2.id));
    }

    #[tokio::test]
    async fn test_create_call_with_no_messages() {
        let store = MemoryStore::default();
        let conv = new_conversation(&store).await;

        let call = conv.create_call(&[]).await.unwrap();
        assert_eq!(call.status, CallStatus::New);
        assert!(store.get_call_message_ids(&call.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_user_message_happy_path() {
        let store = MemoryStore::default();
        let mut conv = new_conversation(&store).await;
        let provider = StubProvider::replying("hi", 5, 2);

        let turn = conv
            .send_user_message(&provider, "model-x", "hello", None, true)
            .await
            .unwrap();

        assert_eq!(turn.user.body, "hello");
        assert_eq!(turn.user.role, MessageRole::User);
        assert_eq!(turn.assistant.body, "hi");
        assert_eq!(turn.assistant.role, MessageRole::Assistant);
        assert_eq!(turn.assistant.actor_id, conv.llm_actor().id);

        // Two messages in history, in conversation order.
        let history = conv.history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].body, "hello");
        assert_eq!(history[1].body, "hi");

        // Chat counters booked exactly once.
        assert_eq!(conv.chat().input_tokens_total, 5);
        assert_eq!(conv.chat().output_tokens_total, 2);

        // One completed call referencing both messages.
        let calls = store.list_calls(None, None, None).await.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(turn.call.status, CallStatus::GenerationCompleted);
        assert_eq!(turn.call.input_tokens, 5);
        assert_eq!(turn.call.output_tokens, 2);
        let data = turn.call.response_data.as_ref().unwrap();
        assert_eq!(data.id, "chatcmpl-stub");
        assert_eq!(data.model, "model-x");

        let ids = store.get_call_message_ids(&turn.call.id).await.unwrap();
        assert!(ids.contains(&turn.user.id));
        assert!(ids.contains(&turn.assistant.id));
    }

    #[tokio::test]
    async fn test_send_includes_full_history_in_prompt() {
        let store = MemoryStore::default();
        let mut conv = new_conversation(&store).await;
        let provider = StubProvider::replying("sure", 10, 3);

        conv.create_system_message("be terse", None).await.unwrap();
        conv.send_user_message(&provider, "model-x", "hello", None, true)
            .await
            .unwrap();

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        // System message plus the just-created user message.
        assert_eq!(requests[0].len(), 2);
        assert_eq!(requests[0][0].role, MessageRole::System);
        assert_eq!(requests[0][0].content, "be terse");
        assert_eq!(requests[0][1].role, MessageRole::User);
        assert_eq!(requests[0][1].content, "hello");
    }

    #[tokio::test]
    async fn test_send_without_history_uses_only_new_message() {
        let store = MemoryStore::default();
        let mut conv = new_conversation(&store).await;
        let provider = StubProvider::replying("ok", 1, 1);

        conv.create_user_message("earlier turn", None).await.unwrap();
        let turn = conv
            .send_user_message(&provider, "model-x", "just this", None, false)
            .await
            .unwrap();

        let requests = provider.requests();
        assert_eq!(requests[0].len(), 1);
        assert_eq!(requests[0][0].content, "just this");

        // The call is associated with only the new user message plus the reply.
        let ids = store.get_call_message_ids(&turn.call.id).await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&turn.user.id));
        assert!(ids.contains(&turn.assistant.id));
    }

    #[tokio::test]
    async fn test_counters_accumulate_across_sends() {
        let store = MemoryStore::default();
        let mut conv = new_conversation(&store).await;
        let provider = StubProvider::replying("hi", 5, 2);

        conv.send_user_message(&provider, "model-x", "one", None, true)
            .await
            .unwrap();
        conv.send_user_message(&provider, "model-x", "two", None, true)
            .await
            .unwrap();

        assert_eq!(conv.chat().input_tokens_total, 10);
        assert_eq!(conv.chat().output_tokens_total, 4);
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_audit_trail() {
        let store = MemoryStore::default();
        let mut conv = new_conversation(&store).await;
        let provider = StubProvider::failing();

        let result = conv
            .send_user_message(&provider, "m", "hi", None, true)
            .await;
        assert!(matches!(result, Err(ChatError::Provider(_))));

        // The user message survives.
        let history = conv.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].body, "hi");

        // Exactly one call record, stuck in `new`, with no response data.
        let calls = store.list_calls(None, None, None).await.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].status, CallStatus::New);
        assert!(calls[0].response_data.is_none());
        assert_eq!(calls[0].input_tokens, 0);
        assert_eq!(calls[0].output_tokens, 0);

        // Counters untouched.
        let chat = store.get_chat(&conv.chat().id).await.unwrap().unwrap();
        assert_eq!(chat.input_tokens_total, 0);
        assert_eq!(chat.output_tokens_total, 0);
    }

    #[tokio::test]
    async fn test_send_after_failure_recovers() {
        let store = MemoryStore::default();
        let mut conv = new_conversation(&store).await;

        let failing = StubProvider::failing();
        conv.send_user_message(&failing, "m", "first try", None, true)
            .await
            .unwrap_err();

        let working = StubProvider::replying("made it", 7, 3);
        let turn = conv
            .send_user_message(&working, "m", "second try", None, true)
            .await
            .unwrap();

        assert_eq!(turn.assistant.body, "made it");
        // The failed attempt's user message is part of the retried context.
        let requests = working.requests();
        assert_eq!(requests[0].len(), 2);

        // Both call records remain: one abandoned, one completed.
        let calls = store.list_calls(None, None, None).await.unwrap();
        assert_eq!(calls.len(), 2);
        let completed = calls
            .iter()
            .filter(|c| c.status == CallStatus::GenerationCompleted)
            .count();
        assert_eq!(completed, 1);
    }
}
