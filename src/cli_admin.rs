use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};

mod cli_style;

use cli_style::{get_prompt, get_styles, print_banner, print_error, print_key_value, print_section_header, print_success};
use gamehub_server::user::{AccountManager, Role, SqliteUserStore};

use rustyline::{
    completion::Completer, highlight::Highlighter, history::FileHistory, validate::Validator,
    CompletionType, Config, Editor, Helper,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles=get_styles())]
struct CliArgs {
    /// Path to the users.db file. Inferred when omitted.
    #[clap(value_parser = parse_path)]
    pub path: Option<PathBuf>,
}

#[derive(Parser)]
#[command(styles=get_styles(), name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Creates an identity with the given username, without credentials.
    AddUser { username: String },

    /// Creates a password for the given user.
    /// Fails if the user already has a password set.
    AddLogin { username: String, password: String },

    /// Change the password of a user, fails if no password was set.
    UpdateLogin { username: String, password: String },

    /// Deletes the password of a given user.
    DeleteLogin { username: String },

    /// Shows identity and authentication information of a given user.
    Show { username: String },

    /// Verifies the password of a given user without any persistent change.
    CheckPassword { username: String, password: String },

    /// Shows all usernames.
    ListUsers,

    /// Changes the role of a user (USER or ADMIN).
    SetRole { username: String, role: String },

    /// Shows the path of the current user db.
    Where,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

fn execute_command(
    line: String,
    accounts: &AccountManager,
    db_path: String,
) -> CommandExecutionResult {
    if line.is_empty() {
        return CommandExecutionResult::Ok;
    }

    let args =
        shlex::split(&line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());

    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    match cli {
        Ok(cli) => match cli.command {
            InnerCommand::AddUser { username } => match accounts.create_user(&username) {
                Ok(identity) => print_success(&format!("Created identity {}", identity.id)),
                Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
            },
            InnerCommand::AddLogin { username, password } => {
                if let Err(err) = accounts.create_password(&username, &password) {
                    return CommandExecutionResult::Error(format!("{}", err));
                }
                print_success("Password created");
            }
            InnerCommand::UpdateLogin { username, password } => {
                if let Err(err) = accounts.update_password(&username, &password) {
                    return CommandExecutionResult::Error(format!("{}", err));
                }
                print_success("Password updated");
            }
            InnerCommand::DeleteLogin { username } => {
                if let Err(err) = accounts.delete_password(&username) {
                    return CommandExecutionResult::Error(format!("{}", err));
                }
                print_success("Password deleted");
            }
            InnerCommand::Show { username } => {
                let identity = match accounts.get_user(&username) {
                    Ok(Some(identity)) => identity,
                    Ok(None) => {
                        return CommandExecutionResult::Error(format!(
                            "User '{}' not found",
                            username
                        ));
                    }
                    Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                };

                print_section_header("Identity");
                print_key_value("id", &identity.id);
                print_key_value("display_name", &identity.display_name);
                print_key_value(
                    "github_id",
                    identity.github_id.as_deref().unwrap_or("(none)"),
                );
                print_key_value("role", identity.role.as_str());
                print_key_value("library entries", &identity.library.len().to_string());
                print_key_value("revision", &identity.revision.to_string());

                print_section_header("Session Tokens");
                match accounts.sessions_for_user(&username) {
                    Ok(tokens) if tokens.is_empty() => print_key_value("tokens", "(none)"),
                    Ok(tokens) => {
                        for token in tokens.iter() {
                            print_key_value(
                                &format!("token …{}", &token.value.0[token.value.0.len() - 8..]),
                                &format!("last used: {:?}", token.last_used),
                            );
                        }
                    }
                    Err(err) => print_error(&format!("Failed to read tokens: {}", err)),
                }
            }
            InnerCommand::CheckPassword { username, password } => {
                match accounts.verify_password(&username, &password) {
                    Ok(Some(_)) => print_success("The password provided is correct!"),
                    Ok(None) => print_error("Wrong password (or no password set)."),
                    Err(err) => {
                        return CommandExecutionResult::Error(format!(
                            "Could not verify the password: {}",
                            err
                        ));
                    }
                }
            }
            InnerCommand::ListUsers => match accounts.list_usernames() {
                Ok(usernames) => {
                    for username in usernames {
                        print_key_value("user", &username);
                    }
                }
                Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
            },
            InnerCommand::SetRole { username, role } => {
                let role_enum = match Role::from_str(&role) {
                    Some(r) => r,
                    None => {
                        return CommandExecutionResult::Error(format!(
                            "Invalid role '{}'. Valid roles are: USER, ADMIN",
                            role
                        ));
                    }
                };
                if let Err(err) = accounts.set_role(&username, role_enum) {
                    return CommandExecutionResult::Error(format!("{}", err));
                }
                print_success(&format!("Role of '{}' set to {}", username, role_enum.as_str()));
            }
            InnerCommand::Where => {
                println!("{}", db_path);
            }
            InnerCommand::Exit => return CommandExecutionResult::Exit,
        },

        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
        }
    }
    CommandExecutionResult::Ok
}

#[derive(rustyline_derive::Hinter)]
struct AdminCliHelper {
    commands_names: Vec<String>,
}

impl AdminCliHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        AdminCliHelper { commands_names }
    }
}

impl Completer for AdminCliHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(" ") {
            return Ok((0, Vec::with_capacity(0)));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .map(|c| c.to_string())
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Highlighter for AdminCliHelper {}
impl Validator for AdminCliHelper {}
impl Helper for AdminCliHelper {}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let user_db_path = match cli_args.path {
        Some(path) => path,
        None => SqliteUserStore::infer_path().with_context(|| {
            "Could not infer the users.db file path, please specify it explicitly."
        })?,
    };
    let user_store = SqliteUserStore::new(user_db_path.clone())?;
    let accounts = AccountManager::new(Arc::new(user_store));

    print_banner(&user_db_path.display().to_string());
    InnerCli::command().print_long_help()?;

    let config = Config::builder()
        .completion_type(CompletionType::List)
        .build();

    let mut rl = Editor::<AdminCliHelper, FileHistory>::with_config(config)?;

    let helper = AdminCliHelper::new();
    rl.set_helper(Some(helper));

    loop {
        let readline = rl.readline(&get_prompt());

        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(line, &accounts, user_db_path.display().to_string()) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => {
                        break;
                    }
                    CommandExecutionResult::Error(err) => {
                        print_error(&err);
                        continue;
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                println!("Error: {:?}", e);
                break;
            }
        }
    }
    Ok(())
}
