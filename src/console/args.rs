use anyhow::{anyhow, Result};

pub(crate) const USAGE: &str = "usage: bureau-exam-client <list | take <exam-id>>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliCommand {
    List,
    Take { exam_id: String },
}

/// Parses everything after the program name. `take` falls back to
/// `default_exam` (the `EXAM_ID` variable) when no id is given.
pub(crate) fn parse_args<I>(args: I, default_exam: Option<String>) -> Result<CliCommand>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let command = args.next().ok_or_else(|| anyhow!("missing command; {USAGE}"))?;

    let parsed = match command.as_str() {
        "list" | "ls" => CliCommand::List,
        "take" | "start" => {
            let exam_id = args
                .next()
                .or(default_exam)
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| anyhow!("take missing exam id; {USAGE}"))?;
            CliCommand::Take { exam_id }
        }
        _ => return Err(anyhow!("Unknown command: {command}; {USAGE}")),
    };

    if let Some(extra) = args.next() {
        return Err(anyhow!("Unknown argument: {extra}"));
    }
    Ok(parsed)
}
