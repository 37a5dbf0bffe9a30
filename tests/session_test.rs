//! Session lifecycle and state-machine tests
//!
//! Drives a `ChatController` against mock transport and API doubles through
//! the full website flow, plus the no-op behavior of every invalid edge.

mod common;

use std::time::Duration;

use common::{
    MockApi, MockTransport, TransportHandle, agent_assigned, chat_closed, intake_form, message,
    mock_transport, wait_for_update,
};
use pharmadesk_chat::{
    ChatClientOptions, ChatController, ChatError, ChatUpdate, ConnectionState, MessageSender,
    OriginChannel, SessionStage,
};

fn website_controller() -> (
    ChatController<MockTransport, MockApi>,
    TransportHandle,
    MockApi,
) {
    let (transport, handle) = mock_transport();
    let api = MockApi::new();
    let controller = ChatController::new(transport, api.clone(), ChatClientOptions::default());
    (controller, handle, api)
}

async fn connected_controller() -> (
    ChatController<MockTransport, MockApi>,
    TransportHandle,
    MockApi,
) {
    let (mut controller, handle, api) = website_controller();
    controller
        .submit_intake(intake_form(), "Refill status")
        .await
        .expect("session is created");

    let mut updates = controller.subscribe();
    handle.push(agent_assigned("sys-1"));
    wait_for_update(&mut updates, |u| {
        matches!(u, ChatUpdate::StageChanged(SessionStage::Connected))
    })
    .await;

    (controller, handle, api)
}

/// Poll until the predicate holds; the mock API records calls asynchronously
async fn eventually(pred: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !pred() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never held");
}

// ============================================================================
// Session establishment
// ============================================================================

#[tokio::test]
async fn controller_starts_at_form_stage() {
    let (controller, _handle, _api) = website_controller();
    assert_eq!(controller.stage(), SessionStage::Form);
    assert!(controller.session().is_none());
}

#[tokio::test]
async fn submit_intake_moves_to_waiting_and_joins_session() {
    let (mut controller, handle, api) = website_controller();

    let session_id = controller
        .submit_intake(intake_form(), "Refill status")
        .await
        .expect("session is created");

    assert_eq!(controller.stage(), SessionStage::Waiting);
    assert_eq!(handle.joined.lock().as_slice(), [session_id.clone()]);

    let details = controller.session().expect("details are recorded");
    assert_eq!(details.id, session_id);
    assert_eq!(details.origin, OriginChannel::Website);
    assert_eq!(details.customer.phone, "5550107788");
    assert!(details.agent.is_none());

    let request = &api.created_requests()[0];
    assert_eq!(request.origin, OriginChannel::Website);
    assert_eq!(
        request.initial_message.as_deref(),
        Some("My refill still shows pending")
    );
}

#[tokio::test]
async fn invalid_intake_blocks_session_creation() {
    let (mut controller, _handle, api) = website_controller();

    let mut form = intake_form();
    form.email = "not-an-email".to_string();

    let error = controller
        .submit_intake(form, "Refill status")
        .await
        .expect_err("validation must fail");
    assert!(matches!(error, ChatError::Validation(_)));
    assert_eq!(controller.stage(), SessionStage::Form);
    assert!(api.created_requests().is_empty());
}

#[tokio::test]
async fn creation_failure_keeps_form_stage_and_is_retryable() {
    let (mut controller, _handle, api) = website_controller();
    api.fail_next_create(true);

    let error = controller
        .submit_intake(intake_form(), "Refill status")
        .await
        .expect_err("creation must fail");
    assert!(error.is_retryable());
    assert_eq!(controller.stage(), SessionStage::Form);

    // Backend recovers; the same controller retries successfully.
    api.fail_next_create(false);
    controller
        .submit_intake(intake_form(), "Refill status")
        .await
        .expect("retry succeeds");
    assert_eq!(controller.stage(), SessionStage::Waiting);
}

#[tokio::test]
async fn store_origin_starts_at_waiting() {
    let (transport, _handle) = mock_transport();
    let api = MockApi::new();

    let controller = ChatController::open_store(
        transport,
        api.clone(),
        ChatClientOptions::default(),
        intake_form().customer(),
        "Pickup counter",
    )
    .await
    .expect("handshake succeeds");

    assert_eq!(controller.stage(), SessionStage::Waiting);
    let request = &api.created_requests()[0];
    assert_eq!(request.origin, OriginChannel::Store);
    assert!(request.initial_message.is_none());
}

#[tokio::test]
async fn initial_history_is_loaded_into_the_store() {
    let (mut controller, _handle, api) = website_controller();
    api.set_history(vec![
        message("h1", MessageSender::System, "Welcome to PharmaDesk support"),
        message("h2", MessageSender::User, "My refill still shows pending"),
    ]);

    controller
        .submit_intake(intake_form(), "Refill status")
        .await
        .expect("session is created");

    let contents: Vec<_> = controller
        .messages()
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(
        contents,
        [
            "Welcome to PharmaDesk support",
            "My refill still shows pending"
        ]
    );
}

// ============================================================================
// Stage transitions
// ============================================================================

#[tokio::test]
async fn agent_assignment_connects_and_appends_system_message() {
    let (controller, _handle, _api) = connected_controller().await;

    assert_eq!(controller.stage(), SessionStage::Connected);
    let details = controller.session().expect("details are recorded");
    assert_eq!(details.agent.expect("agent is set").name, "Sam");

    let system: Vec<_> = controller
        .messages()
        .into_iter()
        .filter(|m| m.sender == MessageSender::System)
        .collect();
    assert_eq!(system.len(), 1);
    assert_eq!(system[0].content, "Sam joined the chat");
}

#[tokio::test]
async fn replayed_agent_assignment_is_a_noop() {
    let (controller, handle, _api) = connected_controller().await;
    let mut updates = controller.subscribe();

    handle.push(agent_assigned("sys-1"));
    // Force a round through the loop so the replay is fully processed.
    handle.push(pharmadesk_chat::ServerEvent::NewMessage(message(
        "m-marker",
        MessageSender::Agent,
        "marker",
    )));
    wait_for_update(&mut updates, |u| {
        matches!(u, ChatUpdate::MessageAppended(m) if m.id.as_str() == "m-marker")
    })
    .await;

    assert_eq!(controller.stage(), SessionStage::Connected);
    let system_count = controller
        .messages()
        .iter()
        .filter(|m| m.sender == MessageSender::System)
        .count();
    assert_eq!(system_count, 1);
}

#[tokio::test]
async fn closed_status_ends_the_session() {
    let (controller, handle, _api) = connected_controller().await;
    let mut updates = controller.subscribe();

    handle.push(chat_closed("sys-2"));
    wait_for_update(&mut updates, |u| {
        matches!(u, ChatUpdate::StageChanged(SessionStage::Ended))
    })
    .await;

    assert_eq!(controller.stage(), SessionStage::Ended);
    assert!(
        controller
            .messages()
            .iter()
            .any(|m| m.content == "Chat ended")
    );
}

#[tokio::test]
async fn closed_status_while_waiting_is_a_noop() {
    let (mut controller, handle, _api) = website_controller();
    controller
        .submit_intake(intake_form(), "Refill status")
        .await
        .expect("session is created");
    let mut updates = controller.subscribe();

    handle.push(chat_closed("sys-2"));
    handle.push(pharmadesk_chat::ServerEvent::NewMessage(message(
        "m-marker",
        MessageSender::System,
        "marker",
    )));
    wait_for_update(&mut updates, |u| {
        matches!(u, ChatUpdate::MessageAppended(m) if m.id.as_str() == "m-marker")
    })
    .await;

    assert_eq!(controller.stage(), SessionStage::Waiting);
}

#[tokio::test]
async fn new_message_appends_regardless_of_stage() {
    let (mut controller, handle, _api) = website_controller();
    controller
        .submit_intake(intake_form(), "Refill status")
        .await
        .expect("session is created");
    let mut updates = controller.subscribe();

    // Still waiting for an agent, but the backend can already push notices.
    handle.push(pharmadesk_chat::ServerEvent::NewMessage(message(
        "m1",
        MessageSender::System,
        "You are number 2 in the queue",
    )));
    wait_for_update(&mut updates, |u| matches!(u, ChatUpdate::MessageAppended(_))).await;

    assert_eq!(controller.stage(), SessionStage::Waiting);
    assert_eq!(controller.messages().len(), 1);
}

// ============================================================================
// Sending
// ============================================================================

#[tokio::test]
async fn send_is_rejected_before_connection() {
    let (mut controller, handle, api) = website_controller();
    controller
        .submit_intake(intake_form(), "Refill status")
        .await
        .expect("session is created");

    let error = controller
        .send_message("hello?")
        .await
        .expect_err("send must be rejected while waiting");
    assert!(matches!(error, ChatError::InvalidStage { .. }));

    // No publish and no persistence happened.
    assert!(handle.sent_contents().is_empty());
    assert!(api.persisted_messages().is_empty());
    assert!(controller.pending_sends().is_empty());
}

#[tokio::test]
async fn send_is_rejected_after_session_ends() {
    let (controller, handle, api) = connected_controller().await;
    let mut updates = controller.subscribe();
    handle.push(chat_closed("sys-2"));
    wait_for_update(&mut updates, |u| {
        matches!(u, ChatUpdate::StageChanged(SessionStage::Ended))
    })
    .await;

    let error = controller
        .send_message("anyone there?")
        .await
        .expect_err("send must be rejected after end");
    assert!(matches!(error, ChatError::SessionEnded(_)));
    assert!(handle.sent_contents().is_empty());
    assert!(api.persisted_messages().is_empty());
}

#[tokio::test]
async fn whitespace_only_message_is_rejected() {
    let (controller, handle, _api) = connected_controller().await;

    let error = controller
        .send_message("   \n\t ")
        .await
        .expect_err("empty message must be rejected");
    assert!(matches!(error, ChatError::EmptyMessage));
    assert!(handle.sent_contents().is_empty());
}

#[tokio::test]
async fn send_publishes_and_persists_independently() {
    let (controller, handle, api) = connected_controller().await;

    controller
        .send_message("  hello  ")
        .await
        .expect("send succeeds");

    assert_eq!(handle.sent_contents(), ["hello"]);
    eventually(|| !api.persisted_messages().is_empty()).await;
    let (_, request) = &api.persisted_messages()[0];
    assert_eq!(request.content, "hello");
    assert_eq!(request.sender, MessageSender::User);
}

#[tokio::test]
async fn store_populates_from_echo_not_from_send() {
    let (controller, handle, _api) = connected_controller().await;
    let mut updates = controller.subscribe();

    controller
        .send_message("hello")
        .await
        .expect("send succeeds");

    // Nothing in the store yet; only the optimistic marker exists.
    let user_messages = |c: &ChatController<MockTransport, MockApi>| {
        c.messages()
            .into_iter()
            .filter(|m| m.sender == MessageSender::User)
            .count()
    };
    assert_eq!(user_messages(&controller), 0);
    assert_eq!(controller.pending_sends().len(), 1);
    assert_eq!(controller.pending_sends()[0].content, "hello");

    // The echo is authoritative: exactly one entry, marker cleared.
    handle.push(pharmadesk_chat::ServerEvent::NewMessage(message(
        "m10",
        MessageSender::User,
        "hello",
    )));
    wait_for_update(&mut updates, |u| {
        matches!(u, ChatUpdate::MessageAppended(m) if m.content == "hello")
    })
    .await;

    assert_eq!(user_messages(&controller), 1);
    assert!(controller.pending_sends().is_empty());
}

#[tokio::test]
async fn duplicate_echo_collapses_to_one_entry() {
    let (controller, handle, _api) = connected_controller().await;
    let mut updates = controller.subscribe();

    controller
        .send_message("hello")
        .await
        .expect("send succeeds");

    handle.push(pharmadesk_chat::ServerEvent::NewMessage(message(
        "m10",
        MessageSender::User,
        "hello",
    )));
    handle.push(pharmadesk_chat::ServerEvent::NewMessage(message(
        "m10",
        MessageSender::User,
        "hello",
    )));
    handle.push(pharmadesk_chat::ServerEvent::NewMessage(message(
        "m-marker",
        MessageSender::Agent,
        "marker",
    )));
    wait_for_update(&mut updates, |u| {
        matches!(u, ChatUpdate::MessageAppended(m) if m.id.as_str() == "m-marker")
    })
    .await;

    let hellos = controller
        .messages()
        .iter()
        .filter(|m| m.content == "hello")
        .count();
    assert_eq!(hellos, 1);
}

#[tokio::test]
async fn send_while_offline_is_rejected_not_queued() {
    let (controller, handle, api) = connected_controller().await;
    let mut updates = controller.subscribe();

    handle.go_offline();
    wait_for_update(&mut updates, |u| {
        matches!(u, ChatUpdate::Connection(ConnectionState::Offline))
    })
    .await;

    let error = controller
        .send_message("are you there?")
        .await
        .expect_err("offline send must fail visibly");
    assert!(matches!(error, ChatError::NotConnected));
    // The stage is untouched; the session is presumed durable server-side.
    assert_eq!(controller.stage(), SessionStage::Connected);
    assert!(handle.sent_contents().is_empty());
    assert!(api.persisted_messages().is_empty());
    assert!(controller.pending_sends().is_empty());
}

// ============================================================================
// Reconnect and end-of-session
// ============================================================================

#[tokio::test]
async fn reconnect_backfills_history() {
    let (controller, handle, api) = connected_controller().await;
    let mut updates = controller.subscribe();
    let fetches_before = api.fetch_count();

    handle.go_offline();
    wait_for_update(&mut updates, |u| {
        matches!(u, ChatUpdate::Connection(ConnectionState::Offline))
    })
    .await;

    // A message lands server-side while we are away.
    api.set_history(vec![message(
        "m20",
        MessageSender::Agent,
        "Your refill is ready",
    )]);

    handle.go_online();
    wait_for_update(&mut updates, |u| {
        matches!(u, ChatUpdate::HistoryLoaded { appended: 1 })
    })
    .await;

    assert!(api.fetch_count() > fetches_before);
    assert!(
        controller
            .messages()
            .iter()
            .any(|m| m.content == "Your refill is ready")
    );
    assert_eq!(controller.stage(), SessionStage::Connected);
}

#[tokio::test]
async fn end_chat_requests_closure_and_waits_for_the_event() {
    let (controller, handle, api) = connected_controller().await;

    controller.end_chat().await.expect("close request succeeds");
    // The request went out, but the stage only flips on the pushed event.
    assert_eq!(api.closed_sessions().len(), 1);
    assert_eq!(controller.stage(), SessionStage::Connected);

    let mut updates = controller.subscribe();
    handle.push(chat_closed("sys-2"));
    wait_for_update(&mut updates, |u| {
        matches!(u, ChatUpdate::StageChanged(SessionStage::Ended))
    })
    .await;
    assert_eq!(controller.stage(), SessionStage::Ended);
}

#[tokio::test]
async fn shutdown_disconnects_without_ending_the_session() {
    let (mut controller, handle, api) = connected_controller().await;

    controller.shutdown().await.expect("shutdown succeeds");

    assert!(!handle.ready.load(std::sync::atomic::Ordering::SeqCst));
    // No close request: the session persists server-side.
    assert!(api.closed_sessions().is_empty());
    // Snapshot state remains readable after shutdown.
    assert_eq!(controller.stage(), SessionStage::Connected);

    // Second shutdown is a no-op.
    controller.shutdown().await.expect("shutdown is idempotent");
}

#[tokio::test]
async fn end_to_end_website_flow() {
    let (mut controller, handle, api) = website_controller();

    // form → waiting
    let session_id = controller
        .submit_intake(intake_form(), "Refill status")
        .await
        .expect("session is created");
    assert_eq!(controller.stage(), SessionStage::Waiting);

    let mut updates = controller.subscribe();

    // waiting → connected, with the system message appended
    handle.push(agent_assigned("sys-1"));
    wait_for_update(&mut updates, |u| {
        matches!(u, ChatUpdate::StageChanged(SessionStage::Connected))
    })
    .await;

    // send "hello", echo arrives, exactly one entry
    controller
        .send_message("hello")
        .await
        .expect("send succeeds");
    handle.push(pharmadesk_chat::ServerEvent::NewMessage(message(
        "m10",
        MessageSender::User,
        "hello",
    )));
    wait_for_update(&mut updates, |u| {
        matches!(u, ChatUpdate::MessageAppended(m) if m.content == "hello")
    })
    .await;
    let hellos = controller
        .messages()
        .iter()
        .filter(|m| m.content == "hello")
        .count();
    assert_eq!(hellos, 1);

    // connected → ended
    handle.push(chat_closed("sys-2"));
    wait_for_update(&mut updates, |u| {
        matches!(u, ChatUpdate::StageChanged(SessionStage::Ended))
    })
    .await;
    assert_eq!(controller.stage(), SessionStage::Ended);

    // further sends are rejected
    let error = controller
        .send_message("one more thing")
        .await
        .expect_err("send after end must fail");
    assert!(matches!(error, ChatError::SessionEnded(id) if id == session_id));
}
