#[cfg(test)]
mod tests {
    use crate::conversation::manager::{ConversationManager, TurnBinding};
    use crate::conversation::message::{Message, Sender};
    use crate::conversation::model::{Conversation, DEFAULT_TITLE};
    use crate::conversation::store::{ACTIVE_CONVERSATION_KEY, CONVERSATIONS_KEY, KeyValueStore};
    use crate::error::{PolyError, Result};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    // Mock KeyValueStore for testing
    #[derive(Default)]
    struct MockStore {
        values: Mutex<HashMap<String, String>>,
        saves: Mutex<usize>,
    }

    impl MockStore {
        fn with(entries: &[(&str, &str)]) -> Self {
            let store = Self::default();
            {
                let mut values = store.values.lock().unwrap();
                for (k, v) in entries {
                    values.insert(k.to_string(), v.to_string());
                }
            }
            store
        }

        fn get(&self, key: &str) -> Option<String> {
            self.values.lock().unwrap().get(key).cloned()
        }

        fn save_count(&self) -> usize {
            *self.saves.lock().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl KeyValueStore for MockStore {
        async fn load(&self, key: &str) -> Result<Option<String>> {
            Ok(self.get(key))
        }

        async fn save(&self, key: &str, value: &str) -> Result<()> {
            *self.saves.lock().unwrap() += 1;
            self.values
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn remove(&self, key: &str) -> Result<()> {
            self.values.lock().unwrap().remove(key);
            Ok(())
        }
    }

    // Store whose every operation fails
    struct BrokenStore;

    #[async_trait::async_trait]
    impl KeyValueStore for BrokenStore {
        async fn load(&self, _key: &str) -> Result<Option<String>> {
            Err(PolyError::storage("unavailable"))
        }

        async fn save(&self, _key: &str, _value: &str) -> Result<()> {
            Err(PolyError::storage("unavailable"))
        }

        async fn remove(&self, _key: &str) -> Result<()> {
            Err(PolyError::storage("unavailable"))
        }
    }

    fn manager_with(store: Arc<MockStore>) -> ConversationManager {
        ConversationManager::new(store)
    }

    async fn assert_active_invariant(manager: &ConversationManager) {
        let list = manager.list().await;
        if let Some(active) = manager.active_id().await {
            let conversation = list
                .iter()
                .find(|c| c.id == active)
                .expect("active id must be in the set");
            assert_eq!(manager.visible_messages().await, conversation.messages);
        } else {
            assert!(manager.visible_messages().await.is_empty());
        }
    }

    #[tokio::test]
    async fn test_create_prepends_and_activates() {
        let store = Arc::new(MockStore::default());
        let manager = manager_with(store.clone());

        let first = manager.create().await;
        let second = manager.create().await;

        assert_ne!(first.id, second.id);
        assert_eq!(first.title, DEFAULT_TITLE);
        let ids: Vec<String> = manager.list().await.into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![second.id.clone(), first.id.clone()]);
        assert_eq!(manager.active_id().await, Some(second.id.clone()));
        assert_eq!(store.get(ACTIVE_CONVERSATION_KEY), Some(second.id));
    }

    #[tokio::test]
    async fn test_select_unknown_is_noop() {
        let manager = manager_with(Arc::new(MockStore::default()));
        let conversation = manager.create().await;

        assert!(!manager.select("conv-missing").await);
        assert_eq!(manager.active_id().await, Some(conversation.id));
    }

    #[tokio::test]
    async fn test_select_loads_messages_into_visible_list() {
        let manager = manager_with(Arc::new(MockStore::default()));
        let first = manager.create().await;
        manager.append_message(Message::user("first")).await;
        manager.create().await;
        assert!(manager.visible_messages().await.is_empty());

        assert!(manager.select(&first.id).await);
        assert_eq!(manager.visible_messages().await, vec![Message::user("first")]);
    }

    #[tokio::test]
    async fn test_delete_active_selects_first_remaining() {
        let manager = manager_with(Arc::new(MockStore::default()));
        let a = manager.create().await;
        manager.append_message(Message::user("from a")).await;
        let b = manager.create().await;
        manager.append_message(Message::user("from b")).await;
        let c = manager.create().await;
        manager.append_message(Message::user("from c")).await;

        // order is c, b, a; deleting c leaves b first
        manager.delete(&c.id).await;

        assert_eq!(manager.active_id().await, Some(b.id.clone()));
        let visible = manager.visible_messages().await;
        assert_eq!(visible, vec![Message::user("from b")]);
        assert!(!visible.iter().any(|m| m.text == "from c"));
        assert!(manager.get(&a.id).await.is_some());
    }

    #[tokio::test]
    async fn test_delete_inactive_keeps_active() {
        let manager = manager_with(Arc::new(MockStore::default()));
        let a = manager.create().await;
        let b = manager.create().await;

        manager.delete(&a.id).await;

        assert_eq!(manager.active_id().await, Some(b.id));
        assert_eq!(manager.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_last_creates_fresh_conversation() {
        let store = Arc::new(MockStore::default());
        let manager = manager_with(store.clone());
        let only = manager.create().await;
        manager.append_message(Message::user("bye")).await;

        manager.delete(&only.id).await;

        let list = manager.list().await;
        assert_eq!(list.len(), 1);
        assert_ne!(list[0].id, only.id);
        assert!(list[0].messages.is_empty());
        assert_eq!(manager.active_id().await, Some(list[0].id.clone()));
        assert!(manager.visible_messages().await.is_empty());
        let persisted: Vec<Conversation> =
            serde_json::from_str(&store.get(CONVERSATIONS_KEY).unwrap()).unwrap();
        assert_eq!(persisted.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_persists_even_when_not_active() {
        let store = Arc::new(MockStore::default());
        let manager = manager_with(store.clone());
        let a = manager.create().await;
        manager.create().await;
        let before = store.save_count();

        manager.delete(&a.id).await;

        assert!(store.save_count() > before);
    }

    #[tokio::test]
    async fn test_active_invariant_over_operation_sequences() {
        let manager = manager_with(Arc::new(MockStore::default()));
        let mut seed: u64 = 0x5eed;
        let mut known: Vec<String> = Vec::new();

        for step in 0..200 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let pick = (seed >> 33) as usize;
            match pick % 4 {
                0 => known.push(manager.create().await.id),
                1 if !known.is_empty() => {
                    manager.select(&known[pick % known.len()]).await;
                }
                2 if !known.is_empty() => {
                    let id = known.remove(pick % known.len());
                    manager.delete(&id).await;
                    known = manager.list().await.into_iter().map(|c| c.id).collect();
                }
                _ => {
                    manager
                        .append_message(Message::user(format!("step {}", step)))
                        .await;
                    known = manager.list().await.into_iter().map(|c| c.id).collect();
                }
            }
            assert_active_invariant(&manager).await;
        }
    }

    #[tokio::test]
    async fn test_append_without_active_creates_conversation() {
        let manager = manager_with(Arc::new(MockStore::default()));
        assert!(manager.active_id().await.is_none());

        let id = manager.append_message(Message::user("hello there")).await;

        assert_eq!(manager.active_id().await, Some(id.clone()));
        let conversation = manager.get(&id).await.unwrap();
        assert_eq!(conversation.messages.len(), 1);
        assert_eq!(conversation.title, "hello there");
    }

    #[tokio::test]
    async fn test_title_only_set_from_first_user_input() {
        let manager = manager_with(Arc::new(MockStore::default()));
        let id = manager.append_message(Message::user("first question")).await;
        manager.append_message(Message::user("second question")).await;

        assert_eq!(manager.get(&id).await.unwrap().title, "first question");
    }

    #[tokio::test]
    async fn test_mutate_last_agent_message() {
        let manager = manager_with(Arc::new(MockStore::default()));
        manager.append_message(Message::user("q")).await;
        assert!(!manager.mutate_last_agent_message("ignored").await);

        manager.append_message(Message::placeholder()).await;
        assert!(manager.mutate_last_agent_message("partial").await);
        assert!(manager.mutate_last_agent_message("partial answer").await);

        let visible = manager.visible_messages().await;
        assert_eq!(visible.len(), 2);
        assert_eq!(visible[1].text, "partial answer");
        assert_eq!(visible[1].sender, Sender::Agent);
    }

    #[tokio::test]
    async fn test_mutate_in_background_conversation_leaves_visible_alone() {
        let manager = manager_with(Arc::new(MockStore::default()));
        let background = manager.create().await;
        manager.append_message(Message::placeholder()).await;
        let foreground = manager.create().await;

        assert!(manager.mutate_last_agent_message_in(&background.id, "done").await);

        assert_eq!(manager.active_id().await, Some(foreground.id));
        assert!(manager.visible_messages().await.is_empty());
        assert_eq!(manager.get(&background.id).await.unwrap().messages[0].text, "done");
    }

    #[tokio::test]
    async fn test_mutate_by_index_skips_later_agent_messages() {
        let manager = manager_with(Arc::new(MockStore::default()));
        let conversation = manager.create().await;
        manager.append_message(Message::user("price?")).await;
        let index = manager
            .append_message_at(&conversation.id, Message::placeholder())
            .await
            .unwrap();
        assert_eq!(index, 1);
        manager
            .append_message_to(&conversation.id, Message::agent_markup("stage"))
            .await;

        assert!(manager.mutate_agent_message_at(&conversation.id, index, "reply").await);
        assert!(!manager.mutate_agent_message_at(&conversation.id, 0, "nope").await);
        assert!(!manager.mutate_agent_message_at("conv-missing", index, "nope").await);

        let visible = manager.visible_messages().await;
        let texts: Vec<&str> = visible.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["price?", "reply", "stage"]);
        assert_active_invariant(&manager).await;
    }

    #[tokio::test]
    async fn test_append_to_deleted_conversation_is_dropped() {
        let manager = manager_with(Arc::new(MockStore::default()));
        let gone = manager.create().await;
        manager.create().await;
        manager.delete(&gone.id).await;

        assert!(!manager.append_message_to(&gone.id, Message::agent_markup("late")).await);
    }

    #[tokio::test]
    async fn test_resolve_target_bindings() {
        let manager = manager_with(Arc::new(MockStore::default()));
        let captured = manager.create().await;
        let current = manager.create().await;

        assert_eq!(
            manager.resolve_target(TurnBinding::Captured, &captured.id).await,
            Some(captured.id.clone())
        );
        assert_eq!(
            manager.resolve_target(TurnBinding::FollowActive, &captured.id).await,
            Some(current.id)
        );
        manager.delete(&captured.id).await;
        assert_eq!(manager.resolve_target(TurnBinding::Captured, &captured.id).await, None);
    }

    #[tokio::test]
    async fn test_load_all_restores_state() {
        let store = Arc::new(MockStore::default());
        let manager = manager_with(store.clone());
        let first = manager.create().await;
        manager.append_message(Message::user("remember me")).await;
        manager.create().await;
        manager.select(&first.id).await;

        let restored = manager_with(store);
        restored.load_all().await;

        assert_eq!(restored.list().await.len(), 2);
        assert_eq!(restored.active_id().await, Some(first.id));
        assert_eq!(restored.visible_messages().await, vec![Message::user("remember me")]);
    }

    #[tokio::test]
    async fn test_load_all_tolerates_corrupt_data() {
        let store = Arc::new(MockStore::with(&[
            (CONVERSATIONS_KEY, "{ definitely not json"),
            (ACTIVE_CONVERSATION_KEY, "conv-1"),
        ]));
        let manager = manager_with(store);
        manager.load_all().await;

        assert!(manager.list().await.is_empty());
        assert!(manager.active_id().await.is_none());
    }

    #[tokio::test]
    async fn test_load_all_drops_dangling_active_pointer() {
        let conversations = serde_json::to_string(&vec![Conversation::new("conv-1", 1)]).unwrap();
        let store = Arc::new(MockStore::with(&[
            (CONVERSATIONS_KEY, conversations.as_str()),
            (ACTIVE_CONVERSATION_KEY, "conv-404"),
        ]));
        let manager = manager_with(store);
        manager.load_all().await;

        assert_eq!(manager.list().await.len(), 1);
        assert!(manager.active_id().await.is_none());
    }

    #[tokio::test]
    async fn test_storage_failures_do_not_affect_memory() {
        let manager = ConversationManager::new(Arc::new(BrokenStore));
        manager.load_all().await;

        let id = manager.append_message(Message::user("still works")).await;
        manager.append_message(Message::placeholder()).await;
        manager.mutate_last_agent_message("answer").await;

        let conversation = manager.get(&id).await.unwrap();
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[1].text, "answer");
    }

    #[tokio::test]
    async fn test_rename_missing_conversation() {
        let manager = manager_with(Arc::new(MockStore::default()));
        let err = manager.rename("conv-missing", "x").await.unwrap_err();
        assert!(err.is_not_found());

        let conversation = manager.create().await;
        manager.rename(&conversation.id, "Renamed").await.unwrap();
        assert_eq!(manager.get(&conversation.id).await.unwrap().title, "Renamed");
    }
}
