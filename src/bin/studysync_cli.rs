/**
 * StudySync command-line client
 *
 * Sends one prompt to the AI assistant and prints the reply, or with
 * `--watch` prints notifications as they arrive on the push channel.
 *
 *   studysync-cli "Explain recursion"
 *   studysync-cli --watch
 */
use std::sync::Arc;
use studysync::client::gateway::{HttpGateway, PushChannel};
use studysync::client::messaging::{ConversationController, SendOutcome};
use studysync::client::notifications::NotificationService;
use studysync::client::sync::MergeOutcome;
use studysync::client::Config;
use studysync::shared::messaging::SenderContext;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = Config::from_env()?;
    if config.get_token().is_none() {
        eprintln!("STUDYSYNC_TOKEN is not set");
        std::process::exit(2);
    }

    if args.iter().any(|arg| arg == "--watch") {
        watch(config).await
    } else if args.is_empty() {
        eprintln!("usage: studysync-cli <prompt> | --watch");
        std::process::exit(2);
    } else {
        ask(config, &args.join(" ")).await
    }
}

async fn ask(config: Config, prompt: &str) -> Result<(), Box<dyn std::error::Error>> {
    let gateway = Arc::new(HttpGateway::new(config.clone()));
    let controller = ConversationController::new(gateway, config.app());
    let sender = SenderContext::new(
        std::env::var("STUDYSYNC_USER_ID").unwrap_or_else(|_| "cli".to_string()),
        std::env::var("STUDYSYNC_USER_NAME").unwrap_or_else(|_| "You".to_string()),
    );

    let outcome = tokio::select! {
        outcome = controller.send_message(prompt, sender) => outcome,
        _ = tokio::signal::ctrl_c() => {
            controller.cancel_active_request().await;
            Ok(SendOutcome::Cancelled)
        }
    };

    match outcome {
        Ok(SendOutcome::Delivered(reply)) => println!("{}", reply.content),
        Ok(SendOutcome::Cancelled) => eprintln!("cancelled"),
        Err(err) => {
            eprintln!("{}", err.user_message());
            std::process::exit(1);
        }
    }
    Ok(())
}

async fn watch(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let gateway = Arc::new(HttpGateway::new(config.clone()));
    let service = NotificationService::new(gateway);

    if let Err(err) = service.load_settings().await {
        tracing::warn!("[NOTIFY] using default settings: {}", err);
    }
    service.fetch_snapshot().await?;
    println!("{} unread", service.unread_count().await);

    let (channel, mut events) = PushChannel::connect(config)?;
    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(event) = event else { break };
        let Ok(Some(notification)) = event.notification() else {
            continue;
        };
        let now = chrono::Local::now().time();
        let alert = service.should_alert(&notification, now).await;
        if service.on_push_event(notification.clone()).await == MergeOutcome::Inserted {
            let marker = if alert { "!" } else { " " };
            println!(
                "{} [{:?}] {} - {} ({} unread)",
                marker,
                notification.kind,
                notification.title,
                notification.body,
                service.unread_count().await
            );
        }
    }
    channel.close().await;
    Ok(())
}
