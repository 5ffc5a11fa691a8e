use std::fmt;
use std::str::FromStr;

use pharma_core::filter::{CardFilter, StudyMode};
use pharma_core::model::{Difficulty, DrugCard, Importance, StudySettingsDraft};

/// One line typed at the study prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Show,
    Answer(Difficulty),
    Skip,
    Undo,
    Mode(StudyMode),
    Filter(Option<CardFilter>),
    Memo(String),
    Review(String),
    Forget(String),
    ClearErrors,
    Set(SettingChange),
    AddCard(DrugCard),
    Categories,
    Weak,
    Stats,
    Help,
    Quit,
}

/// A single `set` adjustment applied on top of the current settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingChange {
    SessionMinutes(u32),
    MicroLearning(bool),
    Speech(bool),
    DailyGoal(u32),
    AutoAdvance(Option<u32>),
}

impl SettingChange {
    pub fn apply(self, draft: &mut StudySettingsDraft) {
        match self {
            SettingChange::SessionMinutes(minutes) => draft.session_minutes = minutes,
            SettingChange::MicroLearning(on) => draft.micro_learning = on,
            SettingChange::Speech(on) => draft.speech_enabled = on,
            SettingChange::DailyGoal(goal) => draft.daily_goal = goal,
            SettingChange::AutoAdvance(secs) => draft.auto_advance_secs = secs,
        }
    }
}

fn switch(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

impl FromStr for SettingChange {
    type Err = CommandError;

    fn from_str(rest: &str) -> Result<Self, Self::Err> {
        let invalid = || CommandError::Invalid {
            command: "set",
            raw: rest.trim().to_owned(),
        };
        let (key, value) = rest
            .trim()
            .split_once(char::is_whitespace)
            .ok_or_else(invalid)?;
        let value = value.trim();

        match key.to_ascii_lowercase().as_str() {
            "minutes" => value.parse().map(SettingChange::SessionMinutes).map_err(|_| invalid()),
            "goal" => value.parse().map(SettingChange::DailyGoal).map_err(|_| invalid()),
            "micro" => switch(value).map(SettingChange::MicroLearning).ok_or_else(invalid),
            "speech" => switch(value).map(SettingChange::Speech).ok_or_else(invalid),
            "auto" => match switch(value) {
                Some(false) => Ok(SettingChange::AutoAdvance(None)),
                _ => value
                    .parse()
                    .map(|secs| SettingChange::AutoAdvance(Some(secs)))
                    .map_err(|_| invalid()),
            },
            _ => Err(invalid()),
        }
    }
}

/// `name | category | importance [| mechanism [| indication]]`
fn parse_card(rest: &str) -> Result<DrugCard, CommandError> {
    let parts: Vec<&str> = rest.split('|').map(str::trim).collect();
    let invalid = || CommandError::Invalid {
        command: "add",
        raw: rest.trim().to_owned(),
    };
    if parts.len() < 3 {
        return Err(invalid());
    }
    let importance: Importance = parts[2].parse().map_err(|_| invalid())?;
    let mut card = DrugCard::new(parts[0], parts[1], importance);
    if let Some(mechanism) = parts.get(3) {
        card = card.with_mechanism(*mechanism);
    }
    if let Some(indication) = parts.get(4) {
        card = card.with_indication(*indication);
    }
    Ok(card)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    MissingArgument { command: &'static str },
    Invalid { command: &'static str, raw: String },
    Unknown(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => f.write_str("empty command"),
            CommandError::MissingArgument { command } => write!(f, "{command} needs an argument"),
            CommandError::Invalid { command, raw } => write!(f, "invalid {command} value: {raw}"),
            CommandError::Unknown(raw) => write!(f, "unknown command: {raw} (try `help`)"),
        }
    }
}

impl std::error::Error for CommandError {}

fn argument(rest: &str, command: &'static str) -> Result<String, CommandError> {
    let rest = rest.trim();
    if rest.is_empty() {
        return Err(CommandError::MissingArgument { command });
    }
    Ok(rest.to_owned())
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if line.is_empty() {
            return Err(CommandError::Empty);
        }
        let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));

        match head.to_ascii_lowercase().as_str() {
            "s" | "show" => Ok(Command::Show),
            "n" | "skip" | "next" => Ok(Command::Skip),
            "u" | "undo" => Ok(Command::Undo),
            "mode" => {
                let raw = argument(rest, "mode")?;
                raw.parse()
                    .map(Command::Mode)
                    .map_err(|_| CommandError::Invalid { command: "mode", raw })
            }
            "cat" | "category" => Ok(Command::Filter(Some(CardFilter::Category(argument(
                rest, "cat",
            )?)))),
            "search" | "/" => Ok(Command::Filter(Some(CardFilter::Search(argument(
                rest, "search",
            )?)))),
            "all" => Ok(Command::Filter(None)),
            "memo" => Ok(Command::Memo(rest.trim().to_owned())),
            "review" => Ok(Command::Review(argument(rest, "review")?)),
            "forget" => Ok(Command::Forget(argument(rest, "forget")?)),
            "clear" => Ok(Command::ClearErrors),
            "set" => Ok(Command::Set(argument(rest, "set")?.parse()?)),
            "add" => Ok(Command::AddCard(parse_card(&argument(rest, "add")?)?)),
            "cats" | "categories" => Ok(Command::Categories),
            "weak" => Ok(Command::Weak),
            "stats" => Ok(Command::Stats),
            "h" | "help" | "?" => Ok(Command::Help),
            "q" | "quit" | "exit" => Ok(Command::Quit),
            other => other
                .parse::<u8>()
                .ok()
                .and_then(|key| key.checked_sub(1))
                .and_then(|value| Difficulty::from_u8(value).ok())
                .or_else(|| other.parse::<Difficulty>().ok())
                .map(Command::Answer)
                .ok_or_else(|| CommandError::Unknown(line.to_owned())),
        }
    }
}

pub fn print_help() {
    println!("Commands:");
    println!("  show | s               reveal the answer");
    println!("  1-4 | again|hard|good|easy   grade the current card");
    println!("  skip | n               next card without grading");
    println!("  undo | u               take back the last answer");
    println!("  mode <name>            mixed, importance, weak, quick, due");
    println!("  cat <category>         only cards in a category");
    println!("  search <text>          only cards matching text");
    println!("  all                    drop the category/search filter");
    println!("  memo <text>            save a memo for the current card (empty deletes)");
    println!("  review <name>          flag a card for review");
    println!("  forget <name>          drop a card from recent errors");
    println!("  clear                  clear recent errors");
    println!("  cats                   list categories");
    println!("  set <key> <value>      minutes N, goal N, micro on|off, speech on|off, auto N|off");
    println!("  add name | category | importance [| mechanism [| indication]]");
    println!("  weak                   categories under 70% accuracy");
    println!("  stats                  session statistics");
    println!("  quit | q");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grades_parse_from_digits_and_words() {
        assert_eq!("1".parse(), Ok(Command::Answer(Difficulty::Again)));
        assert_eq!(" good ".parse(), Ok(Command::Answer(Difficulty::Good)));
        assert_eq!("4".parse(), Ok(Command::Answer(Difficulty::Easy)));
    }

    #[test]
    fn arguments_keep_inner_spaces() {
        assert_eq!(
            "cat Beta blocker".parse(),
            Ok(Command::Filter(Some(CardFilter::Category("Beta blocker".into()))))
        );
        assert_eq!(
            "review  Warfarin sodium ".parse(),
            Ok(Command::Review("Warfarin sodium".into()))
        );
        assert_eq!("memo".parse(), Ok(Command::Memo(String::new())));
    }

    #[test]
    fn mode_names_are_validated() {
        assert_eq!("mode Due".parse(), Ok(Command::Mode(StudyMode::Due)));
        assert!(matches!(
            "mode sideways".parse::<Command>(),
            Err(CommandError::Invalid { command: "mode", .. })
        ));
        assert_eq!(
            "mode".parse::<Command>(),
            Err(CommandError::MissingArgument { command: "mode" })
        );
    }

    #[test]
    fn settings_changes_parse() {
        assert_eq!(
            "set auto 5".parse(),
            Ok(Command::Set(SettingChange::AutoAdvance(Some(5))))
        );
        assert_eq!("set auto off".parse(), Ok(Command::Set(SettingChange::AutoAdvance(None))));
        assert_eq!("set speech on".parse(), Ok(Command::Set(SettingChange::Speech(true))));
        assert_eq!("set minutes 25".parse(), Ok(Command::Set(SettingChange::SessionMinutes(25))));
        assert!(matches!(
            "set goal lots".parse::<Command>(),
            Err(CommandError::Invalid { command: "set", .. })
        ));
        assert!(matches!("set volume 3".parse::<Command>(), Err(CommandError::Invalid { .. })));
    }

    #[test]
    fn custom_cards_parse_from_pipes() {
        let Ok(Command::AddCard(card)) =
            "add Apixaban | Anticoagulant | high | Factor Xa inhibitor".parse::<Command>()
        else {
            panic!("expected a card");
        };
        assert_eq!(card.name, "Apixaban");
        assert_eq!(card.category, "Anticoagulant");
        assert_eq!(card.importance, Importance::High);
        assert_eq!(card.mechanism.as_deref(), Some("Factor Xa inhibitor"));
        assert_eq!(card.indication, None);

        assert!(matches!("add Apixaban".parse::<Command>(), Err(CommandError::Invalid { .. })));
        assert!(matches!(
            "add Apixaban | Anticoagulant | vital".parse::<Command>(),
            Err(CommandError::Invalid { .. })
        ));
    }

    #[test]
    fn unknown_and_empty_lines_are_errors() {
        assert_eq!("   ".parse::<Command>(), Err(CommandError::Empty));
        assert!(matches!("dance".parse::<Command>(), Err(CommandError::Unknown(_))));
        assert!(matches!("5".parse::<Command>(), Err(CommandError::Unknown(_))));
    }
}
