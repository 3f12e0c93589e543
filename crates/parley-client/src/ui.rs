//! Terminal rendering — ANSI palette keyed on sender id.
//!
//! Frames arrive while the `You : ` prompt is pending, so every render
//! first erases the prompt with backspaces, prints the message on a clean
//! line, then redraws the prompt.

use std::io::Write;

pub const DEF_COL: &str = "\x1b[0m";

const COLORS: [&str; 6] = [
    "\x1b[31m", "\x1b[32m", "\x1b[33m", "\x1b[34m", "\x1b[35m", "\x1b[36m",
];

const PROMPT_TEXT: &str = "You : ";

/// Pick a stable color for a session id.
pub fn color(id: u64) -> &'static str {
    COLORS[(id as usize) % COLORS.len()]
}

/// Print a prompt without a trailing newline.
pub fn prompt(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

/// Draw the chat input prompt.
pub fn prompt_you() {
    prompt(&format!("{}{PROMPT_TEXT}{DEF_COL}", COLORS[1]));
}

/// Backspace over a pending input prompt.
fn erase_prompt() {
    print!("{}", erase_sequence());
    let _ = std::io::stdout().flush();
}

fn erase_sequence() -> String {
    "\u{8}".repeat(PROMPT_TEXT.len())
}

pub fn banner() {
    println!("{}\n\t  ====== Welcome to the chat-room ======{}\n", COLORS[5], DEF_COL);
}

pub fn render_chat(sender: &str, sender_id: u64, body: &str) {
    erase_prompt();
    println!("{}{sender} : {DEF_COL}{body}", color(sender_id));
    prompt_you();
}

pub fn render_status(session_id: u64, text: &str) {
    erase_prompt();
    println!("{}{text}{DEF_COL}", color(session_id));
    prompt_you();
}

/// Fallback for lines that do not parse as frames.
pub fn render_raw(line: &str) {
    erase_prompt();
    println!("{line}");
    prompt_you();
}
