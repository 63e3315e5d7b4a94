//! Blocking console questions
//!
//! Prompts block the driver task while they wait for an answer, including
//! the pulse timer, but never the runtime: other tasks such as the interrupt
//! listener keep running. Closed input is an error so a non-interactive
//! caller never loops forever.

use console::Term;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use pkc_errors::TransactionError;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::{Handle, RuntimeFlavor};

/// Source of answers to the questions a transaction asks
pub trait Prompt: Send {
    /// Ask for a number in `1..=max`, re-asking until one is given
    ///
    /// # Errors
    ///
    /// Returns `PromptClosed` when the input ends before a valid answer.
    fn select_number(&mut self, question: &str, max: usize) -> Result<usize, TransactionError>;

    /// Ask a yes/no question; an empty answer takes the default
    ///
    /// # Errors
    ///
    /// Returns `PromptClosed` when the input ends before a valid answer.
    fn confirm(&mut self, question: &str, default_yes: bool) -> Result<bool, TransactionError>;
}

/// Parse an answer to a bounded numeric question
#[must_use]
pub fn parse_number(line: &str, max: usize) -> Option<usize> {
    match line.trim().parse::<usize>() {
        Ok(n) if (1..=max).contains(&n) => Some(n),
        _ => None,
    }
}

/// Parse an answer to a yes/no question
#[must_use]
pub fn parse_confirm(line: &str, default_yes: bool) -> Option<bool> {
    let answer = line.trim();
    if answer.is_empty() {
        return Some(default_yes);
    }
    if answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes") {
        Some(true)
    } else if answer.eq_ignore_ascii_case("n") || answer.eq_ignore_ascii_case("no") {
        Some(false)
    } else {
        None
    }
}

fn confirm_suffix(default_yes: bool) -> &'static str {
    if default_yes {
        " [Y/n] "
    } else {
        " [N/y] "
    }
}

/// Message shown when a number is out of range
fn out_of_range(max: usize) -> String {
    format!("Please enter a number from 1 to {max}")
}

fn check_range(n: usize, max: usize) -> Result<(), String> {
    if (1..=max).contains(&n) {
        Ok(())
    } else {
        Err(out_of_range(max))
    }
}

/// Run a blocking read without stalling the runtime's other tasks
///
/// On a multi-threaded runtime the worker is handed off first, so the
/// interrupt listener keeps running even with a single worker thread.
/// Anywhere else `read` runs in place.
#[must_use]
pub fn run_blocking<T>(read: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(read)
        }
        _ => read(),
    }
}

fn prompt_error(error: dialoguer::Error) -> TransactionError {
    let error = io::Error::from(error);
    match error.kind() {
        io::ErrorKind::Interrupted => TransactionError::Interrupted,
        io::ErrorKind::UnexpectedEof | io::ErrorKind::NotConnected => {
            TransactionError::PromptClosed
        }
        _ => TransactionError::Prompt {
            message: error.to_string(),
        },
    }
}

/// Questions asked on the user's terminal
pub struct TermPrompt {
    term: Term,
    theme: ColorfulTheme,
}

impl TermPrompt {
    #[must_use]
    pub fn new(term: Term) -> Self {
        Self {
            term,
            theme: ColorfulTheme::default(),
        }
    }

    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Term::stdout())
    }
}

impl Prompt for TermPrompt {
    fn select_number(&mut self, question: &str, max: usize) -> Result<usize, TransactionError> {
        let question = question.trim_end_matches([':', ' ']);
        run_blocking(|| {
            Input::<usize>::with_theme(&self.theme)
                .with_prompt(question)
                .validate_with(|n: &usize| check_range(*n, max))
                .interact_text_on(&self.term)
        })
        .map_err(prompt_error)
    }

    fn confirm(&mut self, question: &str, default_yes: bool) -> Result<bool, TransactionError> {
        run_blocking(|| {
            Confirm::with_theme(&self.theme)
                .with_prompt(question)
                .default(default_yes)
                .wait_for_newline(true)
                .interact_on(&self.term)
        })
        .map_err(prompt_error)
    }
}

/// Prompt answering from a fixed list of lines
///
/// Every question is recorded. Lines go through the same parsing as a
/// terminal prompt, so invalid lines cause a re-ask that consumes the next
/// one. Clones share the same script, so a test can keep one while the
/// transaction owns another.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompt {
    inner: Arc<Mutex<Script>>,
}

#[derive(Debug, Default)]
struct Script {
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let script = Script {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        };
        Self {
            inner: Arc::new(Mutex::new(script)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Questions asked so far, re-asks included
    #[must_use]
    pub fn asked(&self) -> Vec<String> {
        self.lock().asked.clone()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.lock().answers.len()
    }

    fn next(&self, question: String) -> Result<String, TransactionError> {
        let mut script = self.lock();
        script.asked.push(question);
        script
            .answers
            .pop_front()
            .ok_or(TransactionError::PromptClosed)
    }
}

impl Prompt for ScriptedPrompt {
    fn select_number(&mut self, question: &str, max: usize) -> Result<usize, TransactionError> {
        let mut asked = question.to_string();
        loop {
            let line = self.next(asked)?;
            if let Some(n) = parse_number(&line, max) {
                return Ok(n);
            }
            asked = format!("{}: ", out_of_range(max));
        }
    }

    fn confirm(&mut self, question: &str, default_yes: bool) -> Result<bool, TransactionError> {
        loop {
            let line = self.next(format!("{question}{}", confirm_suffix(default_yes)))?;
            if let Some(answer) = parse_confirm(&line, default_yes) {
                return Ok(answer);
            }
        }
    }
}
