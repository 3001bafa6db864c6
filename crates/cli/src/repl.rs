//! Interactive read loop.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use solstice_auth::SessionState;

use crate::commands::{self, Outcome};
use crate::context::AppContext;

pub fn run(ctx: &AppContext) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;

    loop {
        match editor.readline(&prompt_for(ctx)) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);

                match commands::dispatch(ctx, line) {
                    Ok(Outcome::Quit) => break,
                    Ok(Outcome::Message(message)) => {
                        if !message.is_empty() {
                            println!("{message}");
                        }
                    }
                    Err(err) => println!("error: {err}"),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

/// Prompt showing who is logged in, resolved from the persisted session.
fn prompt_for(ctx: &AppContext) -> String {
    match ctx.auth.current() {
        Ok(SessionState::Authenticated(claims)) => {
            format!("solstice {}@{}> ", claims.username, claims.role)
        }
        _ => "solstice> ".to_string(),
    }
}
