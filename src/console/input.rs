use crate::tasks::runner::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Input {
    Command(Command),
    Help,
    Empty,
    Unknown(String),
}

/// Maps one typed line to a session command. While a submit confirmation is
/// pending, `y` and `n` answer it instead of navigating.
pub(crate) fn parse_line(raw: &str, awaiting_confirmation: bool) -> Input {
    let line = raw.trim().to_ascii_lowercase();
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Input::Empty;
    };
    let argument = words.next();
    if words.next().is_some() {
        return unknown(raw);
    }

    if awaiting_confirmation && argument.is_none() {
        match head {
            "y" | "yes" => return Input::Command(Command::Confirm(true)),
            "n" | "no" => return Input::Command(Command::Confirm(false)),
            _ => {}
        }
    }

    let command = match (head, argument) {
        ("n" | "next", None) => Command::Next,
        ("p" | "prev" | "previous", None) => Command::Prev,
        ("f" | "flag", None) => Command::Flag,
        ("s" | "submit", None) => Command::Submit,
        ("?" | "status", None) => Command::Status,
        ("q" | "quit" | "exit", None) => Command::Quit,
        ("h" | "help", None) => return Input::Help,
        ("g" | "goto", Some(number)) => match number.parse::<usize>() {
            Ok(number) if number >= 1 => Command::Jump(number - 1),
            _ => return unknown(raw),
        },
        ("pick", Some(option)) => match option_index(option) {
            Some(index) => Command::Select(index),
            None => return unknown(raw),
        },
        (option, None) => match option_index(option) {
            Some(index) => Command::Select(index),
            None => return unknown(raw),
        },
        _ => return unknown(raw),
    };
    Input::Command(command)
}

fn unknown(raw: &str) -> Input {
    Input::Unknown(raw.trim().to_string())
}

/// `a`/`b`/... or `1`/`2`/... to a zero-based option index.
fn option_index(token: &str) -> Option<usize> {
    if let Ok(number) = token.parse::<usize>() {
        return number.checked_sub(1);
    }
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(letter @ 'a'..='z'), None) => Some(usize::from(letter as u8 - b'a')),
        _ => None,
    }
}

/// Letter shown next to the option at `index`.
pub(crate) fn option_label(index: usize) -> char {
    match u8::try_from(index) {
        Ok(index) if index < 26 => char::from(b'A' + index),
        _ => '?',
    }
}

pub(crate) const HELP: &str = "\
Commands:
  a, b, c ... or 1, 2, 3 ...  choose an option (also: pick <letter>)
  n, next                     next question
  p, prev                     previous question
  g <number>, goto <number>   jump to a question
  f, flag                     flag or unflag the question for review
  ?, status                   show the question again
  s, submit                   submit the exam
  q, quit                     leave; answers stay saved and the exam can be resumed";
