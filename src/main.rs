//! Terminal driver for a chat session.
//!
//! Plain lines are sent as user messages. Commands:
//! `/stop`, `/edit <id> <text>`, `/attach <path>`, `/patients`,
//! `/patient <id>`, `/quit`.

use std::path::PathBuf;
use std::process::ExitCode;

use tokio::io::{AsyncBufReadExt, BufReader};

use medqa_chat::chat::citation::{default_sources, resolve};
use medqa_chat::models::{Attachment, Message};
use medqa_chat::records::RecordsClient;
use medqa_chat::{ChatConfig, ChatSession, SessionUpdate, SubmitOutcome};

#[derive(Debug, PartialEq)]
enum Command {
    Send(String),
    Stop,
    Edit { id: String, text: String },
    Attach(PathBuf),
    Patients,
    Patient(String),
    Quit,
    Empty,
    Unknown(String),
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if !line.starts_with('/') {
        return Command::Send(line.to_string());
    }

    let (name, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    match name {
        "/stop" => Command::Stop,
        "/quit" | "/exit" => Command::Quit,
        "/patients" => Command::Patients,
        "/patient" if !rest.is_empty() => Command::Patient(rest.to_string()),
        "/attach" if !rest.is_empty() => Command::Attach(PathBuf::from(rest)),
        "/edit" => match rest.split_once(' ') {
            Some((id, text)) if !text.trim().is_empty() => Command::Edit {
                id: id.to_string(),
                text: text.trim().to_string(),
            },
            _ => Command::Unknown(line.to_string()),
        },
        _ => Command::Unknown(line.to_string()),
    }
}

fn print_message(message: &Message) {
    println!("[{}] {} ({})", message.role, message.content, message.id);
    if let Some(attachments) = &message.attachments {
        for a in attachments {
            println!("    + {} ({} bytes, {})", a.name, a.size, a.mime_type);
        }
    }

    let sources = default_sources();
    for citation in resolve(&message.content, &sources) {
        match citation.source {
            Some(source) => println!(
                "    [{}] {}, {} ({}) {}",
                citation.number, source.title, source.author, source.date, source.url
            ),
            None => println!("    [{}] unknown source", citation.number),
        }
    }
}

fn render(session: &ChatSession, updates: &[SessionUpdate]) {
    for update in updates {
        match update {
            SessionUpdate::StageChanged(stage) => {
                if let Some(label) = stage.label() {
                    println!("... {label}");
                }
            }
            SessionUpdate::MessageAppended { id } => {
                if let Some(message) = session.state().get(id) {
                    print_message(message);
                }
            }
            SessionUpdate::ErrorRaised(error) => println!("! {error}"),
            SessionUpdate::Disconnected => println!("! disconnected"),
        }
    }
}

async fn list_patients(records: &RecordsClient) {
    match records.get_patients().await {
        Ok(patients) if patients.is_empty() => println!("(no patients)"),
        Ok(patients) => {
            for patient in patients {
                println!("{}  {}", patient.id, patient.full_name());
            }
        }
        Err(e) => println!("! {e}"),
    }
}

async fn show_patient(records: &RecordsClient, patient_id: &str) {
    let patient = match records.get_patient(patient_id).await {
        Ok(patient) => patient,
        Err(e) => {
            println!("! {e}");
            return;
        }
    };
    println!(
        "{} ({}, born {})",
        patient.full_name(),
        patient.gender.as_deref().unwrap_or("unknown"),
        patient.birth_date.as_deref().unwrap_or("unknown")
    );

    match records.get_recent_encounters(patient_id, None).await {
        Ok(encounters) => {
            for encounter in encounters {
                let kind = encounter
                    .encounter_type
                    .first()
                    .and_then(|t| t.display())
                    .unwrap_or("encounter");
                let start = encounter
                    .period
                    .as_ref()
                    .and_then(|p| p.start.as_deref())
                    .unwrap_or("?");
                println!("    {start}  {kind}");
            }
        }
        Err(e) => println!("! {e}"),
    }

    match records.get_latest_conditions(patient_id).await {
        Ok(conditions) => {
            for condition in conditions {
                println!("    - {}", condition.code.display().unwrap_or("unnamed condition"));
            }
        }
        Err(e) => println!("! {e}"),
    }
}

/// Apply one input line. Returns `false` when the driver should exit.
async fn handle_line(
    session: &mut ChatSession,
    records: Option<&RecordsClient>,
    line: &str,
    queued: &mut Vec<Attachment>,
) -> bool {
    match parse_command(line) {
        Command::Patients => match records {
            Some(records) => list_patients(records).await,
            None => println!("! records service unavailable"),
        },
        Command::Patient(id) => match records {
            Some(records) => show_patient(records, &id).await,
            None => println!("! records service unavailable"),
        },
        Command::Empty => {}
        Command::Quit => return false,
        Command::Stop => {
            let before = session.state().len();
            if session.stop() {
                for message in &session.state().messages()[before..] {
                    print_message(message);
                }
            } else {
                println!("! nothing to stop");
            }
        }
        Command::Edit { id, text } => {
            if !session.edit_message(&id, text) {
                println!("! no message with id {id}");
            }
        }
        Command::Attach(path) => match Attachment::from_path(&path) {
            Ok(attachment) => {
                println!("+ queued {}", attachment.name);
                queued.push(attachment);
            }
            Err(e) => println!("! cannot attach {}: {e}", path.display()),
        },
        Command::Send(text) => {
            session.set_draft(text);
            match session.submit(std::mem::take(queued)) {
                SubmitOutcome::Sent => {
                    if let Some(message) = session.state().last() {
                        print_message(message);
                    }
                    println!("... {}", session.stage().label().unwrap_or_default());
                }
                SubmitOutcome::Busy => println!("! still generating, use /stop"),
                SubmitOutcome::Failed => {
                    if let Some(error) = session.state().error() {
                        println!("! {error}");
                    }
                }
                SubmitOutcome::EmptyDraft | SubmitOutcome::Closed => {}
            }
        }
        Command::Unknown(input) => println!("! unknown command: {input}"),
    }
    true
}

#[tokio::main]
async fn main() -> ExitCode {
    medqa_chat::init_tracing();

    let config = match ChatConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::from(2);
        }
    };
    tracing::info!(mode = ?config.mode, model = %config.model, "Opening chat session");

    let records = match RecordsClient::with_defaults(&config.api_base_url) {
        Ok(records) => Some(records),
        Err(e) => {
            tracing::warn!(error = %e, "Records client unavailable");
            None
        }
    };

    let mut session = ChatSession::open(config).await;
    if let Some(error) = session.state().error() {
        println!("! {error}");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut queued = Vec::new();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !handle_line(&mut session, records.as_ref(), &line, &mut queued).await {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read input");
                    break;
                }
            },
            Some(event) = session.next_event() => {
                let updates = session.apply(event);
                render(&session, &updates);
            }
        }
    }

    session.close();
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_sent() {
        assert_eq!(parse_command("  hello there "), Command::Send("hello there".into()));
        assert_eq!(parse_command("   "), Command::Empty);
    }

    #[test]
    fn slash_commands() {
        assert_eq!(parse_command("/stop"), Command::Stop);
        assert_eq!(parse_command("/quit"), Command::Quit);
        assert_eq!(parse_command("/patients"), Command::Patients);
        assert_eq!(parse_command("/patient p-17"), Command::Patient("p-17".into()));
        assert_eq!(
            parse_command("/attach ./notes/bp.csv"),
            Command::Attach(PathBuf::from("./notes/bp.csv"))
        );
        assert_eq!(
            parse_command("/edit abc-123 new text here"),
            Command::Edit {
                id: "abc-123".into(),
                text: "new text here".into()
            }
        );
    }

    #[test]
    fn malformed_commands_are_unknown() {
        assert!(matches!(parse_command("/edit abc"), Command::Unknown(_)));
        assert!(matches!(parse_command("/attach"), Command::Unknown(_)));
        assert!(matches!(parse_command("/patient"), Command::Unknown(_)));
        assert!(matches!(parse_command("/dance"), Command::Unknown(_)));
    }
}
