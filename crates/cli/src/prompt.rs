use std::io::{self, BufRead, Write};

use clientdesk_ui::ConfirmPrompt;

/// Asks on stderr and reads the answer from stdin. Anything but `y`/`yes`
/// declines, including a closed stdin.
pub struct StdinPrompt;

impl ConfirmPrompt for StdinPrompt {
    fn confirm(&self, message: &str) -> bool {
        let mut stderr = io::stderr().lock();
        if write!(stderr, "{message}\n[y/N] ").and_then(|()| stderr.flush()).is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_affirmative(&answer),
            Err(_) => false,
        }
    }
}

/// Confirms everything; backs `--yes`.
pub struct AutoConfirm;

impl ConfirmPrompt for AutoConfirm {
    fn confirm(&self, _message: &str) -> bool {
        true
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
