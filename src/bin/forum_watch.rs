//! Tail a forum from the terminal.
//!
//! Connects to the forum named by `FORUM_API_URL` (and optionally
//! `FORUM_WS_URL`), prints the current question list, then streams push
//! notifications until Ctrl+C.

use anyhow::Context;
use tokio::signal::ctrl_c;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use forum_sync::{ForumClient, Notification, SyncConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    dotenvy::dotenv().ok();

    let config = SyncConfig::from_env().context("reading FORUM_API_URL")?;
    info!(base_url = %config.base_url, "connecting");

    let (client, mut notifications) = ForumClient::connect(config).await?;

    print_board(&client);

    loop {
        tokio::select! {
            _ = ctrl_c() => {
                info!("received Ctrl+C, shutting down");
                break;
            }
            notification = notifications.recv() => match notification {
                Some(Notification::NewQuestion(question)) => {
                    println!("+ new question #{}: {}", question.id, question.message);
                    print_board(&client);
                }
                Some(Notification::NewAnswer(answer)) => {
                    println!(
                        "+ new answer #{} on question #{}: {}",
                        answer.id, answer.question_id, answer.message
                    );
                }
                None => break,
            }
        }
    }

    client.shutdown().await;
    Ok(())
}

fn print_board(client: &ForumClient) {
    println!("--- questions ---");
    for question in client.questions() {
        let answers = client.answers_for(question.id);
        println!(
            "[{:>9}] #{} {} ({} answers)",
            question.status,
            question.id,
            question.message,
            answers.len()
        );
    }
}
