//! Conversation lifecycle tests
//!
//! Drive `ConversationController` against the in-memory chat API with the
//! tokio clock paused, so typing delays elapse instantly but stay
//! measurable.

use crate::common::*;
use crate::{assert_err, assert_lifecycle, assert_ok};
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use std::time::Duration;
use studysync::client::messaging::{typing_delay, LoadOutcome, SendOutcome};
use studysync::client::ClientError;
use studysync::shared::messaging::{MessageStatus, RemoteMessage, Role};
use tokio::time::Instant;

fn remote(id: &str, role: Role, content: &str) -> RemoteMessage {
    RemoteMessage {
        id: id.to_string(),
        role,
        content: content.to_string(),
        created_at: chrono::Utc::now(),
        client_id: None,
        sender: None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_first_send_bootstraps_and_walks_lifecycle() {
    let api = FakeChat::new();
    let gate = api.hold_sends();
    let owned = controller(&api);
    let chat = &owned;
    let started = Instant::now();

    let (outcome, _) = tokio::join!(chat.send_message("Explain recursion", ada()), async {
        api.send_started.notified().await;
        assert_lifecycle!(chat.messages().await, [(User, Pending)]);
        assert_eq!(chat.conversation_id().await.as_deref(), Some("conv-1"));

        gate.notify_one();
        settle(move || async move { chat.messages().await[0].status != MessageStatus::Pending })
            .await;
        let messages = chat.messages().await;
        assert_lifecycle!(messages, [(User, Sent)]);
        assert!(messages[0].id.is_durable());
    });

    let reply = assert_matches!(outcome, Ok(SendOutcome::Delivered(reply)) => reply);
    assert_eq!(reply.content, "Echo: Explain recursion");

    let messages = chat.messages().await;
    assert_lifecycle!(messages, [(User, Delivered), (Assistant, Delivered)]);
    assert!(messages[0].timestamp < messages[1].timestamp);
    assert_eq!(messages[1].client_id, messages[0].client_id);

    let expected = typing_delay(
        reply.content.chars().count(),
        Duration::from_millis(20),
        Duration::from_millis(2000),
    );
    let elapsed = started.elapsed();
    assert!(elapsed >= expected, "reply shown after {:?}", elapsed);
    assert!(elapsed <= Duration::from_millis(2000));

    assert_eq!(
        api.calls()[0],
        ChatCall::CreateConversation {
            title: Some("Explain recursion".into()),
            initial_message: None,
        }
    );
    let conversation = chat.conversation().await.unwrap();
    assert_eq!(conversation.last_message.as_deref(), Some("Echo: Explain recursion"));
    assert!(!chat.is_busy().await);
}

#[tokio::test(start_paused = true)]
async fn test_primary_failure_falls_back_with_same_content() {
    let api = FakeChat::new();
    api.fail(&api.fail_send, true);
    let chat = controller(&api);

    let outcome = assert_ok!(chat.send_message("What is a closure?", ada()).await);
    let reply = assert_matches!(outcome, SendOutcome::Delivered(reply) => reply);
    assert_eq!(reply.content, "Fallback: What is a closure?");

    let calls = api.calls();
    assert_matches!(&calls[1], ChatCall::Send { content, .. } if content == "What is a closure?");
    assert_eq!(
        calls[2],
        ChatCall::Chat {
            message: "What is a closure?".into(),
            history: 0,
        }
    );

    let messages = chat.messages().await;
    assert_lifecycle!(messages, [(User, Delivered), (Assistant, Delivered)]);
    assert!(!messages[0].id.is_durable());
}

#[tokio::test(start_paused = true)]
async fn test_fallback_carries_prior_turns() {
    let api = FakeChat::new();
    let chat = controller(&api);
    assert_ok!(chat.send_message("first", ada()).await);

    api.fail(&api.fail_send, true);
    assert_ok!(chat.send_message("second", ada()).await);

    assert_eq!(
        api.calls().last().cloned(),
        Some(ChatCall::Chat {
            message: "second".into(),
            history: 2,
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_both_endpoints_failing_marks_error() {
    let api = FakeChat::new();
    api.fail(&api.fail_send, true);
    api.fail(&api.fail_chat, true);
    let chat = controller(&api);

    let err = chat.send_message("Hello?", ada()).await.unwrap_err();
    assert!(err.is_transport());

    let messages = chat.messages().await;
    assert_lifecycle!(messages, [(User, Error), (Assistant, Error)]);
    assert_eq!(messages[0].error.as_deref(), Some(err.user_message().as_str()));
    assert!(messages[1].content.contains("Could not reach the server"));

    // Never retried automatically
    assert_eq!(api.calls().len(), 3);
    assert!(!chat.is_busy().await);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_response_withdraws_pending_message() {
    let api = FakeChat::new();
    let gate = api.hold_sends();
    let owned = controller(&api);
    let chat = &owned;

    let (outcome, cancelled) = tokio::join!(chat.send_message("slow question", ada()), async {
        api.send_started.notified().await;
        chat.cancel_active_request().await
    });

    assert!(cancelled);
    assert_eq!(outcome.unwrap(), SendOutcome::Cancelled);
    assert!(chat.messages().await.is_empty());
    assert!(!chat.is_busy().await);

    // The server answering late changes nothing
    gate.notify_one();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(chat.messages().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_typing_keeps_sent_message_without_reply() {
    let api = FakeChat::new();
    let owned = controller(&api);
    let chat = &owned;

    let (outcome, _) = tokio::join!(chat.send_message("a longer question", ada()), async {
        settle(move || async move {
            chat.messages()
                .await
                .first()
                .is_some_and(|m| m.status == MessageStatus::Sent)
        })
        .await;
        chat.cancel_active_request().await
    });

    assert_eq!(outcome.unwrap(), SendOutcome::Cancelled);
    tokio::time::sleep(Duration::from_secs(5)).await;
    let messages = chat.messages().await;
    assert_lifecycle!(messages, [(User, Sent)]);
    assert!(messages[0].id.is_durable());
}

#[tokio::test(start_paused = true)]
async fn test_second_send_while_pending_is_rejected() {
    let api = FakeChat::new();
    let gate = api.hold_sends();
    let owned = controller(&api);
    let chat = &owned;

    let (first, _) = tokio::join!(chat.send_message("one", ada()), async {
        api.send_started.notified().await;
        assert!(chat.is_busy().await);
        assert_err!(chat.send_message("two", ada()).await, ClientError::Busy);
        gate.notify_one();
    });

    assert_matches!(first, Ok(SendOutcome::Delivered(_)));
    assert_eq!(api.sends().len(), 1);
    assert_eq!(chat.messages().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_pairs_appear_in_send_order() {
    let api = FakeChat::new();
    let chat = controller(&api);
    let prompts = [
        "a rather long first question that takes a while to answer",
        "short",
        "medium length third",
    ];
    for prompt in prompts {
        assert_ok!(chat.send_message(prompt, ada()).await);
    }

    let contents: Vec<String> = chat.messages().await.into_iter().map(|m| m.content).collect();
    let expected: Vec<String> = prompts
        .iter()
        .flat_map(|p| [p.to_string(), format!("Echo: {}", p)])
        .collect();
    assert_eq!(contents, expected);

    let messages = chat.messages().await;
    for pair in messages.chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Assistant);
        assert!(pair[0].timestamp < pair[1].timestamp);
    }
}

#[tokio::test(start_paused = true)]
async fn test_retry_resends_identical_content_and_sender() {
    let api = FakeChat::new();
    api.fail(&api.fail_send, true);
    api.fail(&api.fail_chat, true);
    let chat = controller(&api);
    let content = "Résumé ✨ tips\n  with trailing space ";

    assert_err!(chat.send_message(content, ada()).await);
    let failed = chat.messages().await[0].clone();
    assert_eq!(failed.status, MessageStatus::Error);

    api.fail(&api.fail_send, false);
    api.fail(&api.fail_chat, false);
    let outcome = assert_ok!(chat.retry_message(&failed.id).await);
    assert_matches!(outcome, SendOutcome::Delivered(_));

    let sends = api.sends();
    assert_eq!(sends.len(), 2);
    for send in &sends {
        assert_matches!(send, ChatCall::Send { content: c, sender, .. } if c == content && *sender == ada());
    }

    assert_lifecycle!(chat.messages().await, [(User, Delivered), (Assistant, Delivered)]);
}

#[tokio::test(start_paused = true)]
async fn test_retry_only_on_failed_user_messages() {
    let api = FakeChat::new();
    let chat = controller(&api);
    assert_ok!(chat.send_message("fine", ada()).await);

    let delivered = chat.messages().await[0].id.clone();
    assert_err!(chat.retry_message(&delivered).await, ClientError::InvalidRetry(_));
}

#[tokio::test(start_paused = true)]
async fn test_load_rejected_while_send_in_flight() {
    let api = FakeChat::new();
    let gate = api.hold_sends();
    let owned = controller(&api);
    let chat = &owned;

    let (outcome, _) = tokio::join!(chat.send_message("hold on", ada()), async {
        api.send_started.notified().await;
        assert_err!(chat.load_messages("conv-9").await, ClientError::SendInFlight);
        gate.notify_one();
    });
    assert_matches!(outcome, Ok(SendOutcome::Delivered(_)));
    assert!(!api.calls().contains(&ChatCall::ListMessages("conv-9".into())));
}

#[tokio::test]
async fn test_newer_load_supersedes_older() {
    let api = FakeChat::new();
    api.seed_history(
        "conv-a",
        vec![remote("a1", Role::User, "hi"), remote("a2", Role::Assistant, "hello")],
    );
    api.seed_history("conv-b", vec![remote("b1", Role::User, "other")]);
    let _gate = api.hold_load("conv-a");
    let owned = controller(&api);
    let chat = &owned;

    let (older, newer) = tokio::join!(chat.load_messages("conv-a"), async {
        api.load_started.notified().await;
        chat.load_messages("conv-b").await
    });

    assert_eq!(older.unwrap(), LoadOutcome::Superseded);
    assert_eq!(newer.unwrap(), LoadOutcome::Applied(1));
    assert_eq!(chat.conversation_id().await.as_deref(), Some("conv-b"));
    assert_eq!(chat.messages().await[0].content, "other");
}

#[tokio::test(start_paused = true)]
async fn test_send_supersedes_in_flight_load() {
    let api = FakeChat::new();
    api.seed_history("conv-a", vec![remote("a1", Role::User, "old")]);
    let _gate = api.hold_load("conv-a");
    let owned = controller(&api);
    let chat = &owned;

    let (load, send) = tokio::join!(chat.load_messages("conv-a"), async {
        api.load_started.notified().await;
        chat.send_message("new topic", ada()).await
    });

    assert_eq!(load.unwrap(), LoadOutcome::Superseded);
    assert_matches!(send, Ok(SendOutcome::Delivered(_)));
    assert_eq!(chat.messages().await.len(), 2);
    assert_eq!(chat.conversation_id().await.as_deref(), Some("conv-1"));
}

#[tokio::test]
async fn test_load_uses_listed_conversation_metadata() {
    let api = FakeChat::new();
    api.seed_conversations(vec![conversation("conv-a", "Algebra")]);
    api.seed_history(
        "conv-a",
        vec![remote("a1", Role::User, "x?"), remote("a2", Role::Assistant, "y")],
    );
    let chat = controller(&api);

    let listed = assert_ok!(chat.list_conversations().await);
    assert_eq!(listed.len(), 1);
    assert_eq!(assert_ok!(chat.load_messages("conv-a").await), LoadOutcome::Applied(2));

    assert_eq!(chat.conversation().await.unwrap().title, "Algebra");
    let messages = chat.messages().await;
    assert_lifecycle!(messages, [(User, Delivered), (Assistant, Delivered)]);
    assert!(messages.iter().all(|m| m.id.is_durable()));
}

#[tokio::test(start_paused = true)]
async fn test_delete_durable_message_goes_remote_first() {
    let api = FakeChat::new();
    let chat = controller(&api);
    assert_ok!(chat.send_message("delete me", ada()).await);
    let target = chat.messages().await[0].id.clone();

    api.fail(&api.fail_delete, true);
    assert_err!(chat.delete_message(&target).await);
    assert_eq!(chat.messages().await.len(), 2);

    api.fail(&api.fail_delete, false);
    assert_ok!(chat.delete_message(&target).await);
    assert_eq!(
        api.calls().last().cloned(),
        Some(ChatCall::Delete {
            conversation_id: "conv-1".into(),
            message_id: "msg-2".into(),
        })
    );
    let remaining = chat.messages().await;
    assert_lifecycle!(remaining, [(Assistant, Delivered)]);
}

#[tokio::test(start_paused = true)]
async fn test_delete_of_sending_message_is_busy() {
    let api = FakeChat::new();
    let gate = api.hold_sends();
    let owned = controller(&api);
    let chat = &owned;

    let (_, _) = tokio::join!(chat.send_message("in flight", ada()), async {
        api.send_started.notified().await;
        let id = chat.messages().await[0].id.clone();
        assert_err!(chat.delete_message(&id).await, ClientError::Busy);
        gate.notify_one();
    });
}

#[tokio::test]
async fn test_create_conversation_is_idempotent() {
    let api = FakeChat::new();
    let chat = controller(&api);

    let first = assert_ok!(chat.create_conversation(Some("Derivatives")).await);
    let second = assert_ok!(chat.create_conversation(Some("Something else")).await);
    assert_eq!(first, second);
    assert_eq!(
        api.calls(),
        vec![ChatCall::CreateConversation {
            title: Some("Derivatives".into()),
            initial_message: Some("Derivatives".into()),
        }]
    );
}

#[tokio::test]
async fn test_create_conversation_failure() {
    let api = FakeChat::new();
    api.fail(&api.fail_create, true);
    *api.fail_status.lock().unwrap() = Some(500);
    let chat = controller(&api);

    let err = chat.create_conversation(None).await.unwrap_err();
    assert_matches!(err, ClientError::ConversationCreationFailed(_));
    assert!(chat.conversation_id().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_reset_starts_a_new_conversation() {
    let api = FakeChat::new();
    let chat = controller(&api);
    assert_ok!(chat.send_message("first topic", ada()).await);

    chat.reset().await;
    assert!(chat.messages().await.is_empty());
    assert!(chat.conversation().await.is_none());

    assert_ok!(chat.send_message("second topic", ada()).await);
    let creates = api
        .calls()
        .into_iter()
        .filter(|c| matches!(c, ChatCall::CreateConversation { .. }))
        .count();
    assert_eq!(creates, 2);
}
