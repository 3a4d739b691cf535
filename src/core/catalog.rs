use std::collections::HashMap;

use crate::models::{Participant, Sex, MAX_PROFILE_STAGE};

/// Commands the bot understands outside of profile completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Start,
    Profile,
    Next,
}

const STAGE_PROMPTS: [&str; 6] = [
    "What is your name?",
    "How old are you?",
    "Which city are you from?",
    "Enter a short description of your profile.",
    "Send a photo that other participants will see in their feed.",
    "What is your sex? M/F",
];

const COMMAND_LIST: &str = "*Available commands:*\n\
    - /start - get started\n\
    - /profile - fill in your profile\n\
    - /next - show the next participant";

/// Escape the characters legacy Telegram Markdown treats as entity markers
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Immutable message catalog built once at start-up
///
/// Holds the stage prompts, the recognised command set and every fixed reply,
/// and renders profile captions. Shared between components behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Catalog {
    service_name: String,
    prompts: Vec<String>,
    commands: HashMap<String, Command>,
    pub invalid_input: String,
    pub already_registered: String,
    pub exhausted: String,
    pub skip_label: String,
    pub keep_photo_label: String,
    pub like_label: String,
    pub dislike_label: String,
    pub male_token: String,
    pub female_token: String,
    pub male_label: String,
    pub female_label: String,
}

impl Catalog {
    pub fn new(service_name: impl Into<String>) -> Self {
        let commands = [
            ("start", Command::Start),
            ("profile", Command::Profile),
            ("next", Command::Next),
        ]
        .into_iter()
        .map(|(name, command)| (name.to_string(), command))
        .collect();

        Self {
            service_name: service_name.into(),
            prompts: STAGE_PROMPTS.iter().map(|p| p.to_string()).collect(),
            commands,
            invalid_input: "The input was invalid, please try again.".to_string(),
            already_registered: "You are already registered.".to_string(),
            exhausted: "No more profiles for now. Please try again a bit later.".to_string(),
            skip_label: "Skip".to_string(),
            keep_photo_label: "Keep current photo".to_string(),
            like_label: "❤".to_string(),
            dislike_label: "➡".to_string(),
            male_token: "M".to_string(),
            female_token: "F".to_string(),
            male_label: "Male".to_string(),
            female_label: "Female".to_string(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Prompt for a profile stage, `None` outside `0..=5`
    pub fn prompt(&self, stage: i32) -> Option<&str> {
        if !(0..=MAX_PROFILE_STAGE).contains(&stage) {
            return None;
        }
        self.prompts.get(stage as usize).map(String::as_str)
    }

    /// Resolve `/command` or `/command@botname`
    pub fn command(&self, text: &str) -> Option<Command> {
        let word = text.trim().split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        self.commands.get(name).copied()
    }

    pub fn greeting(&self) -> String {
        format!(
            "Hi! I am {}, I help people get to know each other\n\n{}",
            escape_markdown(&self.service_name),
            COMMAND_LIST
        )
    }

    pub fn unknown_command(&self) -> String {
        format!("There is no such command.\n\n{}", COMMAND_LIST)
    }

    /// Parse a sex token as typed by the participant
    pub fn parse_sex(&self, token: &str) -> Option<Sex> {
        let token = token.trim();
        if token == self.male_token {
            Some(Sex::Male)
        } else if token == self.female_token {
            Some(Sex::Female)
        } else {
            None
        }
    }

    pub fn sex_label(&self, sex: Sex) -> &str {
        match sex {
            Sex::Male => &self.male_label,
            Sex::Female => &self.female_label,
        }
    }

    pub fn profile_caption(&self, participant: &Participant) -> String {
        format!(
            "*Name:* {}\n*Age:* {}\n*City:* {}\n*Description:* {}\n*Sex:* {}",
            escape_markdown(&participant.name),
            participant.age,
            escape_markdown(&participant.city),
            escape_markdown(&participant.description),
            self.sex_label(participant.sex())
        )
    }

    /// Caption shown to a participant once their own profile is complete
    pub fn own_profile_caption(&self, participant: &Participant) -> String {
        format!("{}\n\nTry the /next command", self.profile_caption(participant))
    }

    /// Caption announcing a match with `other`
    pub fn match_caption(&self, other: &Participant) -> String {
        format!(
            "Congratulations! You have a match with @{}\nFeel free to reach out in private messages\n\n{}",
            escape_markdown(&other.id),
            self.profile_caption(other)
        )
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new("tandem")
    }
}
