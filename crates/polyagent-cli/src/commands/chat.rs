//! Interactive chat REPL.

use anyhow::Result;
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use std::sync::Arc;

use polyagent_application::payment::TriggerOutcome;
use polyagent_application::{
    ActionKind, ActionMediator, DispatchError, ResponseDispatcher, SubmitOutcome,
};
use polyagent_core::wallet::WalletStatus;

use crate::app::AppContext;
use crate::commands::agents::print_agents;
use crate::commands::conversations::{print_list, print_messages, resolve_reference};
use crate::commands::events::print_events;
use crate::commands::repl_command::ReplCommand;
use crate::helper::CliHelper;

const QUIT_COMMAND: &str = "/quit";

const HELP: &[(&str, &str)] = &[
    ("/help", "show this help"),
    ("/new", "start a new conversation"),
    ("/list", "list conversations (* marks the active one)"),
    ("/select <n|id>", "switch to a conversation"),
    ("/delete [n|id]", "delete a conversation, the active one by default"),
    ("/rename <title>", "rename the active conversation"),
    ("/history", "show the active conversation"),
    ("/agent [id]", "switch agent, or show the current one"),
    ("/agents", "list available agents"),
    ("/confirm [action]", "confirm the pending payment order"),
    ("/sign <message>", "sign a message with the connected wallet"),
    ("/send <to> <amount>", "send ETH with the connected wallet"),
    ("/status", "show connection and conversation state"),
    (QUIT_COMMAND, "exit"),
];

/// Runs the REPL until `/quit` or end of input.
pub async fn run(ctx: AppContext, agent: Option<String>) -> Result<()> {
    let AppContext {
        config,
        router,
        manager,
        dispatcher,
        mediator,
        wallet,
        events,
        ..
    } = ctx;

    let mut agent = agent.unwrap_or_else(|| config.default_agent.clone());
    if router.resolve(&agent).is_err() {
        println!(
            "{}",
            format!("Unknown agent '{}', see /agents.", agent).yellow()
        );
    }

    let printer = tokio::spawn(print_events(events, manager.clone()));

    let mut rl: Editor<CliHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== PolyAgent ===".bright_magenta().bold());
    println!(
        "{}",
        format!(
            "Talking to '{}' at {}. Type /help for commands or {} to exit.",
            agent, config.backend_base_url, QUIT_COMMAND
        )
        .bright_black()
    );
    println!();

    loop {
        let prompt = format!("{}> ", agent);
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                let command = match ReplCommand::parse(trimmed) {
                    None => {
                        submit(dispatcher.clone(), agent.clone(), trimmed.to_string());
                        continue;
                    }
                    Some(Err(usage)) => {
                        println!("{}", usage.yellow());
                        continue;
                    }
                    Some(Ok(command)) => command,
                };

                match command {
                    ReplCommand::Quit => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    ReplCommand::Help => {
                        for (usage, description) in HELP {
                            println!("  {:<22} {}", usage.bright_cyan(), description);
                        }
                    }
                    ReplCommand::New => {
                        let conversation = manager.create().await;
                        println!("{}", format!("Started {}", conversation.id).bright_green());
                    }
                    ReplCommand::List => print_list(&manager).await,
                    ReplCommand::Select(reference) => {
                        match resolve_reference(&manager, &reference).await {
                            Some(id) if manager.select(&id).await => {
                                print_messages(&manager.visible_messages().await);
                            }
                            _ => println!(
                                "{}",
                                format!("No conversation matches '{}'", reference).yellow()
                            ),
                        }
                    }
                    ReplCommand::Delete(reference) => {
                        let id = match reference {
                            Some(reference) => resolve_reference(&manager, &reference).await,
                            None => manager.active_id().await,
                        };
                        match id {
                            Some(id) => {
                                manager.delete(&id).await;
                                println!("{}", format!("Deleted {}", id).bright_green());
                            }
                            None => println!("{}", "Nothing to delete.".yellow()),
                        }
                    }
                    ReplCommand::Rename(title) => {
                        let id = manager.ensure_active().await;
                        match manager.rename(&id, title).await {
                            Ok(()) => println!("{}", "Renamed.".bright_green()),
                            Err(e) => println!("{}", format!("Rename failed: {}", e).red()),
                        }
                    }
                    ReplCommand::History => print_messages(&manager.visible_messages().await),
                    ReplCommand::Agent(None) => println!("Current agent: {}", agent.bold()),
                    ReplCommand::Agent(Some(id)) => match router.resolve(&id) {
                        Ok(resolved) => {
                            agent = resolved.agent_id;
                            println!("{}", format!("Now talking to '{}'", agent).bright_green());
                        }
                        Err(e) => println!("{}", e.to_string().yellow()),
                    },
                    ReplCommand::Agents => print_agents(&router, Some(agent.as_str())),
                    ReplCommand::Confirm(action_id) => confirm(mediator.clone(), action_id),
                    ReplCommand::Sign(message) => {
                        print_wallet_status(wallet.sign_message(&message).await);
                    }
                    ReplCommand::Send { to, amount } => {
                        print_wallet_status(wallet.send_transfer(&to, &amount).await);
                    }
                    ReplCommand::Status => {
                        println!("Backend:      {}", config.backend_base_url);
                        println!("Agent:        {}", agent);
                        println!("Binding:      {:?}", config.turn_binding);
                        match manager.active_id().await {
                            Some(id) => {
                                let typing = dispatcher.is_typing(&id).await;
                                println!(
                                    "Conversation: {}{}",
                                    id,
                                    if typing { " (waiting for reply)" } else { "" }
                                );
                            }
                            None => println!("Conversation: none"),
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!(
                    "{}",
                    format!("CTRL-C detected. Type {} to exit.", QUIT_COMMAND).yellow()
                );
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    // In-flight turns and timelines are abandoned; their writes already persisted.
    printer.abort();
    Ok(())
}

/// Submits chat input in the background so the prompt stays responsive.
fn submit(dispatcher: Arc<ResponseDispatcher>, agent: String, input: String) {
    tokio::spawn(async move {
        match dispatcher.submit(&agent, &input).await {
            Ok(SubmitOutcome::Turn(report)) => {
                if !report.is_settled() {
                    tracing::warn!(
                        "[Chat] Turn in {} with '{}' failed",
                        report.conversation_id,
                        report.agent_id
                    );
                }
            }
            Ok(SubmitOutcome::Payment(outcome)) => print_trigger_outcome(&outcome),
            Err(DispatchError::EmptyInput) => {}
            Err(e @ DispatchError::Busy(_)) => println!("{}", e.to_string().yellow()),
        }
    });
}

/// Confirms the pending order; without an action id every call is a new attempt.
fn confirm(mediator: Arc<ActionMediator>, action_id: Option<String>) {
    tokio::spawn(async move {
        let outcome = match action_id {
            Some(action_id) => {
                mediator
                    .handle_action(&action_id, ActionKind::ConfirmPayment)
                    .await
            }
            None => mediator.confirm_payment().await,
        };
        print_trigger_outcome(&outcome);
    });
}

fn print_trigger_outcome(outcome: &TriggerOutcome) {
    match outcome {
        TriggerOutcome::Started(handle) => println!(
            "{}",
            format!("Payment {} is being processed.", handle.action_id()).bright_yellow()
        ),
        TriggerOutcome::Duplicate => {
            println!("{}", "This order was already confirmed.".bright_black())
        }
        TriggerOutcome::UpstreamFailed => println!(
            "{}",
            "Could not create the payment link, try /confirm again.".red()
        ),
    }
}

fn print_wallet_status(status: WalletStatus) {
    match status {
        WalletStatus::Succeeded(detail) => println!("{} {}", "OK".bright_green(), detail),
        WalletStatus::Rejected(reason) => println!("{} {}", "Rejected:".yellow(), reason),
        WalletStatus::Failed(reason) => println!("{} {}", "Failed:".red(), reason),
    }
}
