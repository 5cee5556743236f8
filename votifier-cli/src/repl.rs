//! Interactive RCON console.

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use votifier_rcon::{Client, ConnectionConfig, RconError};

const HELP_TEXT: &str = r#"
Console commands:
  .help                 Show this help
  .reconnect            Drop the connection and log in again
  .quit, .exit          Exit the console

Anything else is sent to the server as an RCON command.
"#;

/// What the loop should do after a line.
#[derive(Debug, PartialEq, Eq)]
enum Action {
    Print(String),
    Reconnect,
    Quit,
    Send(String),
}

fn parse_line(line: &str) -> Option<Action> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(match line {
        ".help" | ".?" => Action::Print(HELP_TEXT.to_string()),
        ".quit" | ".exit" | ".q" => Action::Quit,
        ".reconnect" => Action::Reconnect,
        cmd if cmd.starts_with('.') => {
            Action::Print(format!("Unknown console command: {}. Type '.help' for help.", cmd))
        }
        cmd => Action::Send(cmd.to_string()),
    })
}

pub async fn run(addr: String, password: String) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "votifier RCON console".bold().cyan());
    println!("Connecting to {}...", addr);

    let client = Client::new(ConnectionConfig::new(addr.clone(), password));
    client.connect().await?;
    println!("{}", "Connected!".green());

    // Create readline editor
    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;

    let history_path = std::env::var("HOME")
        .map(|h| std::path::PathBuf::from(h).join(".votifier_rcon_history"))
        .unwrap_or_else(|_| ".votifier_rcon_history".into());
    let _ = rl.load_history(&history_path);

    println!("Type '.help' for console commands.\n");

    loop {
        let prompt = format!("{} ", format!("{}>", addr).cyan());
        match rl.readline(&prompt) {
            Ok(line) => match parse_line(&line) {
                None => continue,
                Some(Action::Print(text)) => println!("{}", text),
                Some(Action::Quit) => break,
                Some(Action::Reconnect) => {
                    let _ = client.close().await;
                    match client.connect().await {
                        Ok(()) => println!("{}\n", "Reconnected.".green()),
                        Err(e) => println!("{}: {}\n", "Error".red(), e),
                    }
                }
                Some(Action::Send(cmd)) => match send(&client, &cmd).await {
                    Ok(output) if output.is_empty() => println!("{}\n", "(no output)".dimmed()),
                    Ok(output) => println!("{}\n", output),
                    Err(e) => println!("{}: {}\n", "Error".red(), e),
                },
            },
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    // Save history
    let _ = rl.save_history(&history_path);

    let _ = client.close().await;
    println!("{}", "Disconnected.".dimmed());

    Ok(())
}

/// Sends a command, logging in again once if the connection was lost.
async fn send(client: &Client, cmd: &str) -> Result<String, RconError> {
    if !client.is_connected() {
        client.connect().await?;
    }
    client.command(cmd).await
}
