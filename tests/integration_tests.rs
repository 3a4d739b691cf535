// Integration tests for Tandem: full conversations through the dispatcher

use std::sync::Arc;

use tandem::core::{Catalog, DispatchError, Dispatcher};
use tandem::models::{InboundEvent, OutboundMessage, MAX_CALLBACK_DATA_BYTES, PROFILE_STAGE_NONE};
use tandem::services::{MemoryStore, ProfileStore};

const EXHAUSTED: &str = "No more profiles for now. Please try again a bit later.";

fn setup() -> (Dispatcher, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let dispatcher = Dispatcher::new(store.clone(), store.clone(), Arc::new(Catalog::new("tandem_bot")));
    (dispatcher, store)
}

async fn send(dispatcher: &Dispatcher, event: InboundEvent) -> Vec<OutboundMessage> {
    dispatcher.handle(event).await.unwrap()
}

async fn send_one(dispatcher: &Dispatcher, event: InboundEvent) -> OutboundMessage {
    let mut replies = send(dispatcher, event).await;
    assert_eq!(replies.len(), 1, "expected exactly one reply");
    replies.remove(0)
}

/// Register `id` and complete the whole profile
async fn onboard(dispatcher: &Dispatcher, id: &str, chat: i64, sex_token: &str) {
    send_one(dispatcher, InboundEvent::text(id, chat, "/start")).await;
    send_one(dispatcher, InboundEvent::text(id, chat, "/profile")).await;
    send_one(dispatcher, InboundEvent::text(id, chat, id)).await;
    send_one(dispatcher, InboundEvent::text(id, chat, "30")).await;
    send_one(dispatcher, InboundEvent::text(id, chat, "Moscow")).await;
    send_one(dispatcher, InboundEvent::text(id, chat, format!("About {}", id))).await;
    send_one(dispatcher, InboundEvent::photo(id, chat, format!("photo-{}", id))).await;
    let done = send_one(dispatcher, InboundEvent::text(id, chat, sex_token)).await;
    assert!(done.is_photo());
}

#[tokio::test]
async fn test_start_registers_and_greets() {
    let (dispatcher, store) = setup();

    let reply = send_one(&dispatcher, InboundEvent::text("alice", 1, "/start")).await;
    assert!(reply.text.contains("tandem\\_bot"));
    for command in ["/start", "/profile", "/next"] {
        assert!(reply.text.contains(command));
    }

    let stored = store.get_by_id("alice").await.unwrap();
    assert!(stored.registered);
    assert_eq!(stored.stage, PROFILE_STAGE_NONE);

    let again = send_one(&dispatcher, InboundEvent::text("alice", 1, "/start")).await;
    assert_eq!(again.text, "You are already registered.");
}

#[tokio::test]
async fn test_any_command_from_a_stranger_starts_onboarding() {
    let (dispatcher, store) = setup();

    let reply = send_one(&dispatcher, InboundEvent::text("alice", 1, "/next")).await;
    assert!(reply.text.starts_with("Hi! I am tandem\\_bot"));
    assert!(store.get_by_id("alice").await.unwrap().registered);
}

#[tokio::test]
async fn test_profile_entry_and_first_answer() {
    let (dispatcher, store) = setup();
    send_one(&dispatcher, InboundEvent::text("alice", 1, "/start")).await;

    let reply = send_one(&dispatcher, InboundEvent::text("alice", 1, "/profile")).await;
    assert_eq!(reply.text, "What is your name?");
    assert!(reply.keyboard.is_none());
    assert_eq!(store.get_by_id("alice").await.unwrap().stage, 0);

    let reply = send_one(&dispatcher, InboundEvent::text("alice", 1, "Alice")).await;
    assert_eq!(reply.text, "How old are you?");
    let stored = store.get_by_id("alice").await.unwrap();
    assert_eq!(stored.stage, 1);
    assert_eq!(stored.name, "Alice");
}

#[tokio::test]
async fn test_photo_at_name_stage_is_invalid() {
    let (dispatcher, store) = setup();
    send_one(&dispatcher, InboundEvent::text("alice", 1, "/start")).await;
    send_one(&dispatcher, InboundEvent::text("alice", 1, "/profile")).await;

    let reply = send_one(&dispatcher, InboundEvent::photo("alice", 1, "photo-1")).await;
    assert_eq!(reply.text, "The input was invalid, please try again.");
    assert_eq!(store.get_by_id("alice").await.unwrap().stage, 0);
}

#[tokio::test]
async fn test_completion_sends_own_profile() {
    let (dispatcher, store) = setup();
    send_one(&dispatcher, InboundEvent::text("alice", 1, "/start")).await;
    send_one(&dispatcher, InboundEvent::text("alice", 1, "/profile")).await;
    send_one(&dispatcher, InboundEvent::text("alice", 1, "Alice")).await;
    send_one(&dispatcher, InboundEvent::text("alice", 1, "25")).await;
    send_one(&dispatcher, InboundEvent::text("alice", 1, "Moscow")).await;
    send_one(&dispatcher, InboundEvent::text("alice", 1, "Likes tea")).await;

    let reply = send_one(&dispatcher, InboundEvent::photo("alice", 1, "photo-1")).await;
    assert_eq!(reply.text, "What is your sex? M/F");
    let tokens: Vec<_> = reply.keyboard.unwrap().buttons().map(|b| b.label.clone()).collect();
    assert_eq!(tokens, vec!["M", "F"]);

    let reply = send_one(&dispatcher, InboundEvent::callback("alice", 1, "choice;F")).await;
    assert_eq!(reply.photo_ref.as_deref(), Some("photo-1"));
    for expected in ["Alice", "25", "Moscow", "Likes tea", "Female"] {
        assert!(reply.text.contains(expected), "caption misses {}", expected);
    }

    let stored = store.get_by_id("alice").await.unwrap();
    assert_eq!(stored.stage, PROFILE_STAGE_NONE);
    assert!(!stored.preference_flag);
}

#[tokio::test]
async fn test_resend_buttons_reuse_previous_answers() {
    let (dispatcher, store) = setup();
    onboard(&dispatcher, "alice", 1, "F").await;

    // Second pass through the profile: every step offers the stored value
    let reply = send_one(&dispatcher, InboundEvent::text("alice", 1, "/profile")).await;
    let name = reply.keyboard.unwrap().rows[0][0].data.clone();
    assert_eq!(name, "skip;0");

    let reply = send_one(&dispatcher, InboundEvent::callback("alice", 1, name)).await;
    assert_eq!(reply.text, "How old are you?");
    let age = reply.keyboard.unwrap().rows[0][0].data.clone();
    assert_eq!(age, "skip;1");

    send_one(&dispatcher, InboundEvent::callback("alice", 1, age)).await;
    send_one(&dispatcher, InboundEvent::text("alice", 1, "Kazan")).await;
    let reply = send_one(&dispatcher, InboundEvent::text("alice", 1, "New description")).await;
    let keep = reply.keyboard.unwrap().rows[0][0].data.clone();
    assert_eq!(keep, tandem::models::KEEP_PHOTO_DATA);

    let reply = send_one(&dispatcher, InboundEvent::callback("alice", 1, keep)).await;
    assert_eq!(reply.text, "What is your sex? M/F");

    let stored = store.get_by_id("alice").await.unwrap();
    assert_eq!(stored.name, "alice");
    assert_eq!(stored.age, 30);
    assert_eq!(stored.photo_ref, "photo-alice");
    assert_eq!(stored.city, "Kazan");
    assert_eq!(stored.stage, 5);
}

#[tokio::test]
async fn test_next_with_nobody_eligible() {
    let (dispatcher, _) = setup();
    onboard(&dispatcher, "alice", 1, "M").await;
    onboard(&dispatcher, "bob", 2, "M").await;

    let reply = send_one(&dispatcher, InboundEvent::text("alice", 1, "/next")).await;
    assert_eq!(reply.text, EXHAUSTED);
    assert!(reply.keyboard.is_none());
}

#[tokio::test]
async fn test_mutual_like_notifies_both_sides() {
    let (dispatcher, _) = setup();
    onboard(&dispatcher, "masha", 10, "F").await;
    onboard(&dispatcher, "arkasha", 20, "M").await;

    let card = send_one(&dispatcher, InboundEvent::text("masha", 10, "/next")).await;
    assert!(card.text.contains("arkasha"));

    // Masha likes first: no match yet, she gets the next card
    let reply = send_one(&dispatcher, InboundEvent::callback("masha", 10, "like;arkasha")).await;
    assert_eq!(reply.text, EXHAUSTED);

    let replies = send(&dispatcher, InboundEvent::callback("arkasha", 20, "like;masha")).await;
    assert_eq!(replies.len(), 2);

    let for_masha = replies.iter().find(|m| m.channel_ref == 10).unwrap();
    assert_eq!(for_masha.photo_ref.as_deref(), Some("photo-arkasha"));
    assert!(for_masha.text.contains("@arkasha"));
    assert!(for_masha.text.contains("About arkasha"));

    let for_arkasha = replies.iter().find(|m| m.channel_ref == 20).unwrap();
    assert_eq!(for_arkasha.photo_ref.as_deref(), Some("photo-masha"));
    assert!(for_arkasha.text.contains("@masha"));
}

#[tokio::test]
async fn test_admirer_is_shown_before_others() {
    let (dispatcher, _) = setup();
    onboard(&dispatcher, "masha", 10, "F").await;
    onboard(&dispatcher, "anton", 30, "M").await;
    onboard(&dispatcher, "zakhar", 40, "M").await;

    send(&dispatcher, InboundEvent::callback("zakhar", 40, "like;masha")).await;

    let card = send_one(&dispatcher, InboundEvent::text("masha", 10, "/next")).await;
    assert!(card.text.contains("zakhar"));
}

#[tokio::test]
async fn test_toggled_match_fires_again() {
    let (dispatcher, _) = setup();
    onboard(&dispatcher, "masha", 10, "F").await;
    onboard(&dispatcher, "arkasha", 20, "M").await;

    send(&dispatcher, InboundEvent::callback("masha", 10, "like;arkasha")).await;
    assert_eq!(send(&dispatcher, InboundEvent::callback("arkasha", 20, "like;masha")).await.len(), 2);

    let after_dislike = send(&dispatcher, InboundEvent::callback("arkasha", 20, "dislike;masha")).await;
    assert_eq!(after_dislike.len(), 1);

    assert_eq!(send(&dispatcher, InboundEvent::callback("arkasha", 20, "like;masha")).await.len(), 2);
}

#[tokio::test]
async fn test_unknown_text_lists_commands() {
    let (dispatcher, store) = setup();

    let reply = send_one(&dispatcher, InboundEvent::text("alice", 1, "hello")).await;
    assert!(reply.text.starts_with("There is no such command."));
    assert!(reply.text.contains("/profile"));
    assert!(store.get_by_id("alice").await.is_err());
}

#[tokio::test]
async fn test_button_from_unknown_sender_is_an_error() {
    let (dispatcher, _) = setup();

    let err = dispatcher
        .handle(InboundEvent::callback("ghost", 1, "like;alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::UnknownParticipant(id) if id == "ghost"));
}

#[tokio::test]
async fn test_stale_suggestion_button_is_ignored() {
    let (dispatcher, store) = setup();
    onboard(&dispatcher, "alice", 1, "F").await;

    for data in ["Moscow", "skip;2", "choice;M"] {
        let replies = send(&dispatcher, InboundEvent::callback("alice", 1, data)).await;
        assert!(replies.is_empty(), "{} was not ignored", data);
    }
    assert_eq!(store.get_by_id("alice").await.unwrap().stage, PROFILE_STAGE_NONE);
}

/// Second profile pass where every earlier answer is kept with Skip
async fn skip_to_photo(dispatcher: &Dispatcher, id: &str, chat: i64) -> OutboundMessage {
    let mut reply = send_one(dispatcher, InboundEvent::text(id, chat, "/profile")).await;
    for _ in 0..4 {
        let data = reply.keyboard.expect("skip button").rows[0][0].data.clone();
        assert!(data.len() <= MAX_CALLBACK_DATA_BYTES);
        reply = send_one(dispatcher, InboundEvent::callback(id, chat, data)).await;
    }
    reply
}

#[tokio::test]
async fn test_skip_keeps_action_shaped_answers() {
    let (dispatcher, store) = setup();
    send_one(&dispatcher, InboundEvent::text("alice", 1, "/start")).await;
    send_one(&dispatcher, InboundEvent::text("alice", 1, "/profile")).await;
    send_one(&dispatcher, InboundEvent::text("alice", 1, "keep_photo")).await;
    send_one(&dispatcher, InboundEvent::text("alice", 1, "30")).await;
    send_one(&dispatcher, InboundEvent::text("alice", 1, "dislike;bob")).await;
    send_one(&dispatcher, InboundEvent::text("alice", 1, "like;coffee")).await;
    send_one(&dispatcher, InboundEvent::photo("alice", 1, "photo-1")).await;
    send_one(&dispatcher, InboundEvent::text("alice", 1, "F")).await;

    let reply = skip_to_photo(&dispatcher, "alice", 1).await;
    assert_eq!(reply.text, "Send a photo that other participants will see in their feed.");

    let stored = store.get_by_id("alice").await.unwrap();
    assert_eq!(stored.stage, 4);
    assert_eq!(stored.name, "keep_photo");
    assert_eq!(stored.city, "dislike;bob");
    assert_eq!(stored.description, "like;coffee");
    assert_eq!(store.evaluation_count().await, 0);
}

#[tokio::test]
async fn test_skip_keeps_long_description() {
    let (dispatcher, store) = setup();
    let description = "Fond of long walks along the embankment, jazz records and strong tea.";
    assert!(description.len() > MAX_CALLBACK_DATA_BYTES);

    send_one(&dispatcher, InboundEvent::text("alice", 1, "/start")).await;
    send_one(&dispatcher, InboundEvent::text("alice", 1, "/profile")).await;
    send_one(&dispatcher, InboundEvent::text("alice", 1, "Alice")).await;
    send_one(&dispatcher, InboundEvent::text("alice", 1, "30")).await;
    send_one(&dispatcher, InboundEvent::text("alice", 1, "Moscow")).await;
    send_one(&dispatcher, InboundEvent::text("alice", 1, description)).await;
    send_one(&dispatcher, InboundEvent::photo("alice", 1, "photo-1")).await;
    send_one(&dispatcher, InboundEvent::text("alice", 1, "F")).await;

    skip_to_photo(&dispatcher, "alice", 1).await;

    let stored = store.get_by_id("alice").await.unwrap();
    assert_eq!(stored.stage, 4);
    assert_eq!(stored.description, description);
}

#[tokio::test]
async fn test_channel_follows_latest_chat() {
    let (dispatcher, store) = setup();
    onboard(&dispatcher, "alice", 1, "F").await;

    let reply = send_one(&dispatcher, InboundEvent::text("alice", 5, "/next")).await;
    assert_eq!(reply.channel_ref, 5);
    assert_eq!(store.get_by_id("alice").await.unwrap().channel_ref, 5);
}

#[tokio::test]
async fn test_liking_yourself_is_ignored() {
    let (dispatcher, store) = setup();
    onboard(&dispatcher, "alice", 1, "F").await;

    let replies = send(&dispatcher, InboundEvent::callback("alice", 1, "like;alice")).await;
    assert!(replies.is_empty());
    assert_eq!(store.evaluation_count().await, 0);
}
