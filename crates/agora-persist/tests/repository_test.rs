use agora_persist::store::StoreOperation;
use agora_persist::translate::RowRange;
use agora_persist::{
    ErrorKind, Filter, MemoryStore, Message, MessageType, Participant, PersistClient, QueryOptions,
    Repository, Thread, ThreadStatus,
};
use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

fn setup() -> (MemoryStore, PersistClient) {
    let store = MemoryStore::new().with_unique_key("thread_participants", &["thread_id", "user_id"]);
    let client = PersistClient::new(Arc::new(store.clone()));
    (store, client)
}

async fn create_thread(client: &PersistClient, title: &str, status: ThreadStatus) -> Thread {
    client
        .threads()
        .create(Thread::new("event-xx", Uuid::new_v4(), title).with_status(status))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_created_thread_is_found_by_id() {
    let (_, client) = setup();

    let created = client
        .threads()
        .create(Thread::new("event-xx", Uuid::new_v4(), "Discussion about Monas History"))
        .await
        .unwrap();
    let id = created.id.expect("create assigns an id");
    assert!(!id.is_nil());

    let found = client.threads().find_by_id(&id).await.unwrap();
    assert_eq!(found.id, id);
    assert_eq!(found.title, "Discussion about Monas History");
    assert_eq!(found.event_id, "event-xx");
    assert!(found.participants.is_empty());
}

#[tokio::test]
async fn test_create_keeps_a_given_id() {
    let (_, client) = setup();
    let id = Uuid::new_v4();

    let mut thread = Thread::new("event-1", Uuid::new_v4(), "Preset");
    thread.id = Some(id);
    let created = client.threads().create(thread).await.unwrap();

    assert_eq!(created.id, Some(id));
}

#[tokio::test]
async fn test_find_by_id_is_idempotent() {
    let (_, client) = setup();
    let thread = create_thread(&client, "Stable", ThreadStatus::Active).await;
    let id = thread.id.unwrap();

    let first = client.threads().find_by_id(&id).await.unwrap();
    let second = client.threads().find_by_id(&id).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_find_by_id_missing_is_not_found() {
    let (_, client) = setup();

    let err = client.threads().find_by_id(&Uuid::new_v4()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.operation(), Some("find_by_id"));
}

#[tokio::test]
async fn test_exists_reports_missing_as_false() {
    let (_, client) = setup();
    let thread = create_thread(&client, "Here", ThreadStatus::Active).await;

    assert!(client.threads().exists(&thread.id.unwrap()).await.unwrap());
    assert!(!client.threads().exists(&Uuid::new_v4()).await.unwrap());
}

#[tokio::test]
async fn test_messages_come_back_in_chronological_order() {
    let (_, client) = setup();
    let thread = create_thread(&client, "Chat", ThreadStatus::Active).await;
    let thread_id = thread.id.unwrap();
    let sender = Uuid::new_v4();
    let t1 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let t2 = t1 + Duration::minutes(5);
    let t3 = t2 + Duration::minutes(5);

    // Inserted out of order on purpose.
    for (at, content) in [(t2, "second"), (t3, "third"), (t1, "first")] {
        client
            .messages()
            .create(Message::new(thread_id, sender, content).sent_at(at))
            .await
            .unwrap();
    }

    let messages = client.messages().find_by_thread(thread_id).await.unwrap();
    let times: Vec<_> = messages.iter().map(|m| m.created_at).collect();
    assert_eq!(times, vec![t1, t2, t3]);

    let recent = client.messages().recent_in_thread(thread_id, 2).await.unwrap();
    let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["second", "third"]);
}

#[tokio::test]
async fn test_search_matches_title_case_insensitively() {
    let (_, client) = setup();
    create_thread(&client, "Discussion about Monas History", ThreadStatus::Active).await;
    create_thread(&client, "Parking at the venue", ThreadStatus::Active).await;

    let (rows, total) = client
        .threads()
        .search(&QueryOptions::new().search("monas"))
        .await
        .unwrap();

    assert_eq!(total, 1);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "Discussion about Monas History");

    let page = client
        .threads()
        .search_threads("MONAS", &QueryOptions::new())
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 1);
    assert!(!page.pagination.has_next);
}

#[tokio::test]
async fn test_search_total_ignores_the_window() {
    let (_, client) = setup();
    for i in 0..7 {
        create_thread(&client, &format!("Topic {i}"), ThreadStatus::Active).await;
    }

    let options = QueryOptions::new().search("topic").page(2).page_size(3);
    let page = client.threads().paginate(&options).await.unwrap();

    assert_eq!(page.items.len(), 3);
    assert_eq!(page.pagination.total, 7);
    assert_eq!(page.pagination.total_pages, 3);
    assert!(page.pagination.has_next);
}

#[tokio::test]
async fn test_count_by_status() {
    let (_, client) = setup();
    create_thread(&client, "Old one", ThreadStatus::Archived).await;
    create_thread(&client, "Old two", ThreadStatus::Archived).await;
    create_thread(&client, "Current", ThreadStatus::Active).await;

    let archived = client
        .threads()
        .count(&[Filter::equal("status", "archived")])
        .await
        .unwrap();
    assert_eq!(archived, 2);

    let closed = client.threads().count_by_status(ThreadStatus::Closed).await.unwrap();
    assert_eq!(closed, 0);
}

#[tokio::test]
async fn test_removed_participant_is_no_longer_listed() {
    let (_, client) = setup();
    let thread = create_thread(&client, "Members", ThreadStatus::Active).await;
    let thread_id = thread.id.unwrap();
    let stays = Uuid::new_v4();
    let leaves = Uuid::new_v4();

    for user in [stays, leaves] {
        client
            .participants()
            .create(Participant::new(thread_id, user))
            .await
            .unwrap();
    }
    assert_eq!(client.threads().find_by_id(&thread_id).await.unwrap().participants.len(), 2);

    client.participants().remove(thread_id, leaves).await.unwrap();

    let members = client.participants().find_by_thread(thread_id).await.unwrap();
    assert!(members.iter().all(|p| p.user_id != leaves));
    assert!(members.iter().any(|p| p.user_id == stays));
    assert!(!client.participants().is_participant(thread_id, leaves).await.unwrap());
}

#[tokio::test]
async fn test_duplicate_participant_is_rejected_by_storage() {
    let (_, client) = setup();
    let thread_id = Uuid::new_v4();
    let user = Uuid::new_v4();

    client.participants().create(Participant::new(thread_id, user)).await.unwrap();
    let err = client
        .participants()
        .create(Participant::new(thread_id, user))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Database);
    assert_eq!(err.operation(), Some("create"));
}

#[tokio::test]
async fn test_list_without_filters_is_sorted_and_windowed() {
    let (_, client) = setup();
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    for i in 0..5 {
        let mut thread = Thread::new("event-1", Uuid::new_v4(), format!("T{i}"));
        thread.created_at = base + Duration::hours(i);
        client.threads().create(thread).await.unwrap();
    }

    let newest = client.threads().list(&QueryOptions::new()).await.unwrap();
    let titles: Vec<&str> = newest.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["T4", "T3", "T2", "T1", "T0"]);

    let second_page = client
        .threads()
        .list(&QueryOptions::new().sort_by("created_at").ascending().page(2).page_size(2))
        .await
        .unwrap();
    let titles: Vec<&str> = second_page.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["T2", "T3"]);
}

#[tokio::test]
async fn test_storage_never_sees_a_non_positive_window() {
    let (store, client) = setup();
    create_thread(&client, "Anything", ThreadStatus::Active).await;
    store.clear_recorded();

    client
        .threads()
        .list(&QueryOptions::new().page(0).page_size(-3))
        .await
        .unwrap();
    client
        .threads()
        .search(&QueryOptions::new().page(-1).page_size(0))
        .await
        .unwrap();

    let selects: Vec<_> = store
        .recorded_queries()
        .into_iter()
        .filter(|q| q.operation == StoreOperation::Select)
        .collect();
    assert_eq!(selects.len(), 2);
    for recorded in selects {
        assert_eq!(recorded.query.range, Some(RowRange { start: 0, end: 10 }));
    }
}

#[tokio::test]
async fn test_update_replaces_the_record() {
    let (_, client) = setup();
    let mut thread = create_thread(&client, "Before", ThreadStatus::Active).await;

    thread.title = "After".to_string();
    thread.description = Some("edited".to_string());
    let updated = client.threads().update(thread.clone()).await.unwrap();
    assert_eq!(updated, thread);

    let found = client.threads().find_by_id(&thread.id.unwrap()).await.unwrap();
    assert_eq!(found.title, "After");
    assert_eq!(found.description.as_deref(), Some("edited"));
}

#[tokio::test]
async fn test_update_requires_an_id() {
    let (_, client) = setup();

    let err = client
        .threads()
        .update(Thread::new("event-1", Uuid::new_v4(), "No id"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_update_of_missing_record_is_not_found() {
    let (_, client) = setup();
    let mut thread = Thread::new("event-1", Uuid::new_v4(), "Ghost");
    thread.id = Some(Uuid::new_v4());

    let err = client.threads().update(thread).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_set_status_allows_any_transition() {
    let (_, client) = setup();
    let thread = create_thread(&client, "Lifecycle", ThreadStatus::Archived).await;
    let id = thread.id.unwrap();

    let reopened = client.threads().set_status(id, ThreadStatus::Active).await.unwrap();
    assert_eq!(reopened.status, ThreadStatus::Active);
    assert_eq!(reopened.creator_id, thread.creator_id);

    let active = client.threads().find_active(&QueryOptions::new()).await.unwrap();
    assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn test_delete_removes_the_record() {
    let (_, client) = setup();
    let thread = create_thread(&client, "Short lived", ThreadStatus::Active).await;
    let id = thread.id.unwrap();

    client.threads().delete(&id).await.unwrap();

    assert!(!client.threads().exists(&id).await.unwrap());
}

#[tokio::test]
async fn test_find_by_field_and_event() {
    let (_, client) = setup();
    let creator = Uuid::new_v4();
    client
        .threads()
        .create(Thread::new("event-a", creator, "Mine"))
        .await
        .unwrap();
    client
        .threads()
        .create(Thread::new("event-b", Uuid::new_v4(), "Theirs"))
        .await
        .unwrap();

    let mine = client.threads().find_by_creator(creator).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].title, "Mine");

    let on_b = client
        .threads()
        .find_by_event("event-b", &QueryOptions::new())
        .await
        .unwrap();
    assert_eq!(on_b.len(), 1);
    assert_eq!(on_b[0].title, "Theirs");
}

#[tokio::test]
async fn test_message_read_model_joins_sender_profile() {
    let (store, client) = setup();
    let sender = Uuid::new_v4();
    store.seed(
        "profiles",
        json!({ "id": sender, "full_name": "Sari", "avatar_url": null }),
    );

    let message = client
        .messages()
        .create(Message::new(Uuid::new_v4(), sender, "Hello").with_type(MessageType::Question))
        .await
        .unwrap();

    let view = client.messages().find_by_id(&message.id.unwrap()).await.unwrap();
    assert_eq!(view.message_type, MessageType::Question);
    assert_eq!(
        view.sender.as_ref().and_then(|p| p.full_name.as_deref()),
        Some("Sari")
    );

    let by_sender = client.messages().find_by_sender(sender).await.unwrap();
    assert_eq!(by_sender.len(), 1);
    assert_eq!(by_sender[0].clone().into_record(), message);
}

#[tokio::test]
async fn test_thread_message_pages() {
    let (_, client) = setup();
    let thread_id = Uuid::new_v4();
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    for i in 0..12 {
        client
            .messages()
            .create(Message::new(thread_id, Uuid::new_v4(), format!("m{i}")).sent_at(base + Duration::seconds(i)))
            .await
            .unwrap();
    }
    client
        .messages()
        .create(Message::new(Uuid::new_v4(), Uuid::new_v4(), "elsewhere"))
        .await
        .unwrap();

    let page = client
        .messages()
        .find_by_thread_paginated(thread_id, &QueryOptions::new().page(2))
        .await
        .unwrap();

    assert_eq!(page.pagination.total, 12);
    assert_eq!(page.pagination.total_pages, 2);
    assert!(!page.pagination.has_next);
    let contents: Vec<&str> = page.items.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["m10", "m11"]);

    assert_eq!(client.messages().count_in_thread(thread_id).await.unwrap(), 12);
}

#[tokio::test]
async fn test_update_keeps_thread_creator() {
    let (_, client) = setup();
    let mut thread = create_thread(&client, "Owned", ThreadStatus::Active).await;
    let creator = thread.creator_id;

    thread.creator_id = Uuid::new_v4();
    thread.title = "Renamed".to_string();
    let updated = client.threads().update(thread.clone()).await.unwrap();
    assert_eq!(updated.creator_id, creator);

    let found = client.threads().find_by_id(&thread.id.unwrap()).await.unwrap();
    assert_eq!(found.creator_id, creator);
    assert_eq!(found.title, "Renamed");
}

#[tokio::test]
async fn test_update_keeps_message_thread_and_sender() {
    let (store, client) = setup();
    let thread_id = Uuid::new_v4();
    let sender = Uuid::new_v4();
    let mut message = client
        .messages()
        .create(Message::new(thread_id, sender, "original"))
        .await
        .unwrap();

    message.thread_id = Uuid::new_v4();
    message.sender_id = Uuid::new_v4();
    message.content = "edited".to_string();
    client.messages().update(message.clone()).await.unwrap();

    let found = client.messages().find_by_id(&message.id.unwrap()).await.unwrap();
    assert_eq!(found.thread_id, thread_id);
    assert_eq!(found.sender_id, sender);
    assert_eq!(found.content, "edited");
    assert_eq!(store.rows("messages").len(), 1);
}

#[tokio::test]
async fn test_search_on_unsearchable_table_is_rejected() {
    let (_, client) = setup();
    let thread_id = Uuid::new_v4();
    for _ in 0..3 {
        client
            .participants()
            .create(Participant::new(thread_id, Uuid::new_v4()))
            .await
            .unwrap();
    }

    let options = QueryOptions::new().search("zzz-no-match");
    let err = client.participants().search(&options).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.operation(), Some("search"));

    let err = client.participants().list(&options).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
