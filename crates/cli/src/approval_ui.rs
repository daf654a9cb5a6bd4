//! Terminal approval prompt: the external collaborator satisfying the approval gate's
//! UI side (§4.6). Grounded in the teacher's `crossterm`-based confirmation prompts.

use std::io::{stdout, Write};

use crossterm::event::{self, Event, KeyCode};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

use operon_core::approval::{ApprovalGate, ApprovalPayload, Decision};

/// Blocks the current thread on a raw-mode single-keypress y/n prompt and posts the
/// decision back through `gate`. Spawn this on `tokio::task::spawn_blocking` so it
/// doesn't stall the async runtime while waiting on the terminal.
pub fn prompt_and_respond(gate: &ApprovalGate, payload: &ApprovalPayload) {
    println!("\n--- proposed edit: {} ---", payload.file);
    println!("{}", payload.summary);
    println!("--- search ---\n{}", payload.search);
    println!("--- replace ---\n{}", payload.replace);
    print!("Apply this edit? [y/N] ");
    let _ = stdout().flush();

    let decision = read_keypress_decision().unwrap_or(Decision::Rejected);

    let gate = gate.clone();
    tokio::spawn(async move {
        gate.respond(decision).await;
    });
}

fn read_keypress_decision() -> std::io::Result<Decision> {
    enable_raw_mode()?;
    let decision = loop {
        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => break Decision::Accepted,
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Enter | KeyCode::Esc => {
                    break Decision::Rejected
                }
                _ => continue,
            }
        }
    };
    disable_raw_mode()?;
    println!();
    Ok(decision)
}
