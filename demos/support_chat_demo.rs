//! Interactive walkthrough against a running PharmaDesk chat backend
//!
//! Drives the full visitor flow: intake submission, waiting for an agent,
//! one message exchange, and session close. Configure the endpoints with:
//!
//! ```bash
//! PHARMADESK_API_URL=http://localhost:3001/api \
//! PHARMADESK_SOCKET_URL=ws://localhost:3001/chat \
//! RUST_LOG=info cargo run --example support_chat_demo
//! ```

use anyhow::Result;
use pharmadesk_chat::{
    ChatClientOptions, ChatController, ChatUpdate, HttpSessionApi, IntakeForm, SessionStage,
    SocketConfig, SocketTransport,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let api_url = std::env::var("PHARMADESK_API_URL")
        .unwrap_or_else(|_| "http://localhost:3001/api".to_string());
    let socket_url = std::env::var("PHARMADESK_SOCKET_URL")
        .unwrap_or_else(|_| "ws://localhost:3001/chat".to_string());

    let transport = SocketTransport::new(SocketConfig::new(&socket_url));
    let api = HttpSessionApi::new(&api_url);
    let mut controller = ChatController::new(transport, api, ChatClientOptions::default());
    let mut updates = controller.subscribe();

    let form = IntakeForm {
        name: "Dana Melton".to_string(),
        email: "dana@example.com".to_string(),
        phone: "(555) 010-7788".to_string(),
        message: "My refill still shows pending".to_string(),
    };
    let session_id = controller.submit_intake(form, "Refill status").await?;
    log::info!("Session {session_id} created; waiting for an agent");

    let mut greeted = false;
    loop {
        match updates.recv().await? {
            ChatUpdate::StageChanged(SessionStage::Connected) => {
                let agent = controller
                    .session()
                    .and_then(|details| details.agent)
                    .map_or_else(|| "an agent".to_string(), |agent| agent.name);
                log::info!("Connected to {agent}");
                if !greeted {
                    greeted = true;
                    controller.start_typing();
                    controller
                        .send_message("Hi! Could you check the status of my refill?")
                        .await?;
                }
            }
            ChatUpdate::StageChanged(SessionStage::Ended) => {
                log::info!("Session ended by the backend");
                break;
            }
            ChatUpdate::StageChanged(stage) => log::info!("Stage: {stage}"),
            ChatUpdate::MessageAppended(message) => {
                let who = message.sender_name.as_deref().unwrap_or("me");
                log::info!("{who}: {}", message.content);
            }
            ChatUpdate::AgentTyping(active) => {
                if active {
                    log::info!("Agent is typing...");
                }
            }
            ChatUpdate::HistoryLoaded { appended } => {
                log::info!("Loaded {appended} earlier message(s)");
            }
            ChatUpdate::Connection(state) => log::debug!("Connection: {state:?}"),
        }
    }

    controller.shutdown().await?;
    Ok(())
}
