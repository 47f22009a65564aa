//! Interactive chat command.

use super::ask::load_video;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Duration;

/// Run the interactive chat command.
///
/// All questions share one session, so earlier turns inform later answers.
pub async fn run_chat(video: &str, transcript_file: Option<&Path>, settings: Settings) -> Result<()> {
    let (orchestrator, video_id) = load_video(video, transcript_file, settings).await?;
    let session_id = uuid::Uuid::new_v4().to_string();
    let timeout = Duration::from_secs(orchestrator.settings().server.query_timeout_secs);

    println!("\n{}", style("VidSage Chat").bold().cyan());
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            orchestrator.clear_session(&session_id);
            Output::info("Conversation history cleared.");
            continue;
        }

        match orchestrator
            .query_async(&session_id, &video_id, input, timeout)
            .await
        {
            Ok(response) => Output::answer(&response),
            Err(e) => Output::error(&format!("Error: {}", e)),
        }
    }

    Ok(())
}
