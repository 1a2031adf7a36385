//! Console command parsing
//!
//! One command per line. Fields are separated by `|`; the first field holds
//! the command word and, for `group`/`task`/`go`, its action:
//!
//! ```text
//! signup|Ada Lovelace|1815-12-10|ada@example.com|Secret#123
//! signin|ada@example.com|Secret#123
//! group add|Work|Things for the office
//! task edit|1|2|Write report|in_progress
//! go dashboard
//! ```

use common::routes::Route;
use tasks::TaskStatus;
use thiserror::Error;

/// A reference to a group or task: its position as listed, or its id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemRef {
    Position(usize),
    Id(uuid::Uuid),
}

impl ItemRef {
    fn parse(field: &str, what: &str) -> Result<Self, ParseError> {
        if let Ok(position) = field.parse::<usize>() {
            if position == 0 {
                return Err(ParseError::Invalid(format!("{} numbers start at 1", what)));
            }
            return Ok(ItemRef::Position(position));
        }
        field
            .parse()
            .map(ItemRef::Id)
            .map_err(|_| ParseError::Invalid(format!("Unknown {}: {}", what, field)))
    }
}

/// A parsed console command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Quit,
    Go(Route),
    SignUp {
        full_name: String,
        birth_date: String,
        email: String,
        password: String,
    },
    SignIn {
        email: String,
        password: String,
    },
    SignOut,
    Groups,
    AddGroup {
        title: String,
        description: Option<String>,
    },
    EditGroup {
        group: ItemRef,
        title: String,
        description: Option<String>,
    },
    RemoveGroup {
        group: ItemRef,
    },
    AddTask {
        group: ItemRef,
        title: String,
        status: Option<TaskStatus>,
    },
    EditTask {
        group: ItemRef,
        task: ItemRef,
        title: String,
        status: TaskStatus,
    },
    RemoveTask {
        group: ItemRef,
        task: ItemRef,
    },
}

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("Unknown command: {0} (type `help`)")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("{0}")]
    Invalid(String),
}

/// Usage lines printed by `help`
pub const HELP: &[&str] = &[
    "signup|<full name>|<birth date YYYY-MM-DD>|<email>|<password>",
    "signin|<email>|<password>",
    "signout",
    "groups",
    "group add|<title>|[description]",
    "group edit|<group>|<title>|[description]",
    "group rm|<group>",
    "task add|<group>|<title>|[status]",
    "task edit|<group>|<task>|<title>|<status>",
    "task rm|<group>|<task>",
    "go <home|signin|signup|dashboard>",
    "help",
    "quit",
];

impl std::str::FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut fields = line.split('|').map(str::trim);
        let head = fields.next().unwrap_or_default();
        let mut words = head.split_whitespace();
        let word = words.next().unwrap_or_default().to_lowercase();

        // Words after the command word count as leading fields
        let args: Vec<&str> = words.chain(fields).collect();

        match word.as_str() {
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            "signout" => Ok(Command::SignOut),
            "groups" => Ok(Command::Groups),
            "go" => match args.as_slice() {
                [route] => route.parse().map(Command::Go).map_err(ParseError::Invalid),
                _ => Err(ParseError::Usage(HELP[10])),
            },
            "signup" => match args.as_slice() {
                [full_name, birth_date, email, password] => Ok(Command::SignUp {
                    full_name: full_name.to_string(),
                    birth_date: birth_date.to_string(),
                    email: email.to_string(),
                    password: password.to_string(),
                }),
                _ => Err(ParseError::Usage(HELP[0])),
            },
            "signin" => match args.as_slice() {
                [email, password] => Ok(Command::SignIn {
                    email: email.to_string(),
                    password: password.to_string(),
                }),
                _ => Err(ParseError::Usage(HELP[1])),
            },
            "group" => parse_group(&args),
            "task" => parse_task(&args),
            _ => Err(ParseError::Unknown(head.to_string())),
        }
    }
}

fn parse_group(args: &[&str]) -> Result<Command, ParseError> {
    match args {
        ["add", title] => Ok(Command::AddGroup {
            title: title.to_string(),
            description: None,
        }),
        ["add", title, description] => Ok(Command::AddGroup {
            title: title.to_string(),
            description: Some(description.to_string()),
        }),
        ["add", ..] => Err(ParseError::Usage(HELP[4])),
        ["edit", group, title, rest @ ..] if rest.len() <= 1 => Ok(Command::EditGroup {
            group: ItemRef::parse(group, "group")?,
            title: title.to_string(),
            description: rest.first().map(|text| text.to_string()),
        }),
        ["edit", ..] => Err(ParseError::Usage(HELP[5])),
        ["rm", group] => Ok(Command::RemoveGroup {
            group: ItemRef::parse(group, "group")?,
        }),
        ["rm", ..] => Err(ParseError::Usage(HELP[6])),
        _ => Err(ParseError::Usage("group add|edit|rm ...")),
    }
}

fn parse_task(args: &[&str]) -> Result<Command, ParseError> {
    match args {
        ["add", group, title, rest @ ..] if rest.len() <= 1 => Ok(Command::AddTask {
            group: ItemRef::parse(group, "group")?,
            title: title.to_string(),
            status: rest.first().map(|status| parse_status(status)).transpose()?,
        }),
        ["add", ..] => Err(ParseError::Usage(HELP[7])),
        ["edit", group, task, title, status] => Ok(Command::EditTask {
            group: ItemRef::parse(group, "group")?,
            task: ItemRef::parse(task, "task")?,
            title: title.to_string(),
            status: parse_status(status)?,
        }),
        ["edit", ..] => Err(ParseError::Usage(HELP[8])),
        ["rm", group, task] => Ok(Command::RemoveTask {
            group: ItemRef::parse(group, "group")?,
            task: ItemRef::parse(task, "task")?,
        }),
        ["rm", ..] => Err(ParseError::Usage(HELP[9])),
        _ => Err(ParseError::Usage("task add|edit|rm ...")),
    }
}

fn parse_status(field: &str) -> Result<TaskStatus, ParseError> {
    field.parse().map_err(ParseError::Invalid)
}
