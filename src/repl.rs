//! Interactive chat loop, the text form of the original voice session.

use std::time::Instant;

use anyhow::Result;
use inquire::{InquireError, Text};
use tracing::warn;

use crate::chat::ChatEngine;
use crate::conversation::{Message, Role};
use crate::utils::format_duration;
use crate::voice::SpeechPipeline;

/// What one line of user input asks the loop to do.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Exit,
    Clear,
    History,
    Help,
    Say(&'a str),
}

fn interpret(input: &str) -> Command<'_> {
    match input.trim().to_lowercase().as_str() {
        "exit" | "quit" => Command::Exit,
        "clear" => Command::Clear,
        "history" => Command::History,
        "help" => Command::Help,
        _ => Command::Say(input),
    }
}

/// Log rendered for the `history` command. System messages are hidden but
/// keep their index so the numbering matches the raw log.
fn render_history(messages: &[Message]) -> String {
    let mut out = format!("\nConversation history ({} messages):", messages.len());
    for (i, message) in messages.iter().enumerate() {
        if message.role == Role::System {
            continue;
        }
        let mut content: String = message.content.chars().take(50).collect();
        if message.content.chars().count() > 50 {
            content.push_str("...");
        }
        out.push_str(&format!(
            "\n{}. {}: {}",
            i,
            message.role.as_str().to_uppercase(),
            content
        ));
    }
    out.push('\n');
    out
}

fn print_help() {
    println!("\nAvailable commands:");
    println!("  exit, quit - End the conversation");
    println!("  clear - Clear conversation history");
    println!("  history - Show conversation history");
    println!("  help - Show this help message\n");
}

/// Runs the interactive session until the user exits.
///
/// When a speech pipeline is supplied, every assistant reply is also
/// synthesized into the speech cache.
pub async fn run_chat(mut engine: ChatEngine, speech: Option<SpeechPipeline>) -> Result<()> {
    println!("\n===== voxloop chat =====\n");
    println!("Session: {}", engine.session_id());
    println!("Model: {}", engine.model());
    if let Some(ref pipeline) = speech {
        println!("Speech: {}", pipeline.engine_names().join(", "));
    }
    println!("Type 'exit', 'quit', or Ctrl+C to end the conversation.");
    println!("Type 'clear' to clear conversation history.");
    println!("Type 'history' to view conversation history.");
    println!("Type 'help' to see all available commands.\n");

    let started = Instant::now();

    loop {
        let line = match Text::new("You:").prompt() {
            Ok(line) => line,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                println!("\n\nExiting chat. Goodbye!");
                break;
            }
            Err(e) => return Err(e.into()),
        };

        match interpret(&line) {
            Command::Exit => {
                println!("\nExiting chat. Goodbye!");
                break;
            }
            Command::Clear => {
                engine.clear(true);
                println!("\nConversation history cleared.\n");
            }
            Command::History => {
                println!("{}", render_history(engine.messages()));
            }
            Command::Help => {
                print_help();
            }
            Command::Say(input) => {
                let reply = engine.respond(input).await;
                println!("\nAssistant: {}\n", reply);

                if let Some(ref pipeline) = speech {
                    match pipeline.synthesize_to_file(&reply, None).await {
                        Ok((path, _)) => println!("(audio saved to {})\n", path.display()),
                        Err(e) => warn!(error = %e, "Speech synthesis failed"),
                    }
                }
            }
        }
    }

    engine.finish();
    println!("Session duration: {}", format_duration(started.elapsed()));
    Ok(())
}
