//! Masked single-line prompt for passwords.

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::fmt;
use std::io::{self, Write};

#[derive(Debug, Clone)]
pub struct PromptError {
    message: String,
}

impl PromptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for PromptError {}

impl From<io::Error> for PromptError {
    fn from(err: io::Error) -> Self {
        PromptError::new(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Submit(String),
    Cancelled,
}

/// Input collected so far; only its length is ever displayed.
#[derive(Debug, Default)]
pub struct MaskedInput {
    text: String,
}

impl MaskedInput {
    pub fn apply(&mut self, key: &KeyEvent) -> KeyOutcome {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter => KeyOutcome::Submit(std::mem::take(&mut self.text)),
            KeyCode::Esc => KeyOutcome::Cancelled,
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => KeyOutcome::Cancelled,
            KeyCode::Char('u') if ctrl => {
                self.text.clear();
                KeyOutcome::Continue
            }
            KeyCode::Backspace => {
                self.text.pop();
                KeyOutcome::Continue
            }
            KeyCode::Char(c) if !ctrl => {
                self.text.push(c);
                KeyOutcome::Continue
            }
            _ => KeyOutcome::Continue,
        }
    }

    pub fn mask(&self) -> String {
        "*".repeat(self.text.chars().count())
    }
}

/// Read a password from the terminal without echoing it.
pub fn prompt_password(prompt: &str) -> Result<String, PromptError> {
    enable_raw_mode()?;
    let result = read_masked(prompt);
    let restore = disable_raw_mode();
    println!();
    let value = result?;
    restore?;
    Ok(value)
}

fn read_masked(prompt: &str) -> Result<String, PromptError> {
    let mut stdout = io::stdout();
    let mut input = MaskedInput::default();
    loop {
        write!(stdout, "\r\x1b[2K{prompt}{}", input.mask())?;
        stdout.flush()?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match input.apply(&key) {
                KeyOutcome::Continue => {}
                KeyOutcome::Submit(value) => return Ok(value),
                KeyOutcome::Cancelled => return Err(PromptError::new("Cancelled by user")),
            }
        }
    }
}
