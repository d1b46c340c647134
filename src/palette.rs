use crate::content::Section;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Navigate,
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: String,
    pub label: String,
    pub keywords: Vec<String>,
    #[serde(rename = "type")]
    pub kind: CommandKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_id: Option<String>,
    pub visible_by_default: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigate_to_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_id: Option<String>,
}

const TERMINAL_SECRET: &str = "terminal-secret";

fn hidden(id: &str, label: &str, keywords: &[&str], output: &str, secret: bool) -> Command {
    Command {
        id: id.into(),
        label: label.into(),
        keywords: keywords.iter().map(|keyword| keyword.to_string()).collect(),
        kind: CommandKind::Hidden,
        hash: None,
        output: Some(output.into()),
        secret_id: secret.then(|| TERMINAL_SECRET.to_string()),
        visible_by_default: false,
    }
}

fn hidden_commands() -> Vec<Command> {
    vec![
        hidden(
            "help",
            "help",
            &["commands", "palette", "assist"],
            "Commands: about, tools, projects, experience, open source, testimonials, contact. Hidden: secret, matrix, sudo hire me.",
            false,
        ),
        hidden(
            "secret",
            "secret",
            &["hidden", "easter", "vault"],
            "No classified intel here. But curiosity looks great on you.",
            true,
        ),
        hidden(
            "matrix",
            "matrix",
            &["neo", "red pill", "wake up"],
            "Wake up, Neo. The portfolio has you.",
            true,
        ),
        hidden(
            "sudo-hire-me",
            "sudo hire me",
            &["sudo", "hire", "career"],
            "Permission granted. Drafting the offer letter... done.",
            true,
        ),
    ]
}

fn normalize(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Navigation commands for `sections` followed by the hidden commands.
pub fn command_list(sections: &[Section]) -> Vec<Command> {
    sections
        .iter()
        .map(|section| {
            let title = section.title.to_lowercase();
            Command {
                id: format!("section-{}", section.id),
                label: section.title.into(),
                keywords: vec![section.id.into(), title.clone(), format!("go to {title}")],
                kind: CommandKind::Navigate,
                hash: Some(section.id.into()),
                output: None,
                secret_id: None,
                visible_by_default: true,
            }
        })
        .chain(hidden_commands())
        .collect()
}

pub fn filter<'a>(commands: &'a [Command], query: &str) -> Vec<&'a Command> {
    let query = normalize(query);
    if query.is_empty() {
        return commands.iter().filter(|command| command.visible_by_default).collect();
    }
    commands
        .iter()
        .filter(|command| {
            normalize(&command.label).contains(&query)
                || command
                    .keywords
                    .iter()
                    .any(|keyword| normalize(keyword).contains(&query))
        })
        .collect()
}

pub fn resolve<'a>(
    commands: &'a [Command],
    query: &str,
    selected: Option<&'a Command>,
) -> Option<&'a Command> {
    if selected.is_some() {
        return selected;
    }
    let query = normalize(query);
    if query.is_empty() {
        return None;
    }
    commands
        .iter()
        .find(|command| normalize(&command.label) == query)
}

pub fn execute(command: &Command) -> Execution {
    match (command.kind, &command.hash, &command.output) {
        (CommandKind::Navigate, Some(hash), _) => Execution {
            navigate_to_hash: Some(hash.clone()),
            ..Default::default()
        },
        (CommandKind::Hidden, _, Some(output)) => Execution {
            message: Some(output.clone()),
            secret_id: command.secret_id.clone(),
            ..Default::default()
        },
        _ => Execution {
            message: Some("Command recognized, but no action is configured.".into()),
            ..Default::default()
        },
    }
}
