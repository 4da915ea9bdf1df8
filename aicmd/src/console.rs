//! Transcript output on stdout: speaker labels, streamed replies, notices.
//!
//! Colour is plain ANSI and is disabled when stdout is not a terminal or
//! `NO_COLOR` is set.

use std::io::{self, IsTerminal, Write};
use std::sync::LazyLock;

static COLOR: LazyLock<bool> =
    LazyLock::new(|| std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Program,
    User,
    System,
    Assistant,
    Reply,
    Error,
}

impl Tone {
    fn code(self) -> &'static str {
        match self {
            Self::Program => "34",
            Self::User => "32",
            Self::System => "35",
            Self::Assistant => "36",
            Self::Reply => "33",
            Self::Error => "31",
        }
    }
}

pub fn paint(text: &str, tone: Tone) -> String {
    if *COLOR {
        format!("\x1b[{}m{}\x1b[0m", tone.code(), text)
    } else {
        text.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct SpeakerNames {
    pub program: String,
    pub user: String,
    pub system: String,
    pub assistant: String,
}

/// Stateful transcript writer. A speaker label is printed only when the
/// speaker changes.
#[derive(Debug)]
pub struct Console {
    names: SpeakerNames,
    last: Option<Tone>,
}

impl Console {
    pub fn new(names: SpeakerNames) -> Self {
        Self { names, last: None }
    }

    pub fn speaker(&mut self, tone: Tone) {
        if self.last == Some(tone) {
            return;
        }
        self.last = Some(tone);
        let name = match tone {
            Tone::User => &self.names.user,
            Tone::System => &self.names.system,
            Tone::Assistant => &self.names.assistant,
            Tone::Program | Tone::Reply | Tone::Error => &self.names.program,
        };
        if tone == Tone::Assistant {
            println!("{}:", paint(name, tone));
        } else {
            print!("{}: ", paint(name, tone));
            flush();
        }
    }

    /// Label for the goal prompt. Always printed, since the user speaks after
    /// every goal.
    pub fn prompt_user(&mut self) {
        self.last = None;
        self.speaker(Tone::User);
    }

    pub fn fragment(&mut self, text: &str) {
        print!("{}", paint(text, Tone::Reply));
        flush();
    }

    pub fn line(&mut self, text: &str) {
        println!("{text}");
    }

    pub fn notice(&mut self, text: &str) {
        println!("{}", paint(text, Tone::System));
    }

    pub fn success(&mut self, text: &str) {
        println!("{}", paint(text, Tone::Program));
    }

    pub fn error(&mut self, text: &str) {
        println!("{}", paint(&format!("error: {text}"), Tone::Error));
    }
}

fn flush() {
    let _ = io::stdout().flush();
}
