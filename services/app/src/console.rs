//! Line-oriented front-end
//!
//! Routes between the home, sign-in, sign-up and dashboard pages the way a
//! browser client would: the dashboard needs a signed-in user and loads the
//! task groups whenever it is entered.

use anyhow::Result;
use auth::{AuthError, SessionManager};
use chrono::NaiveDate;
use common::routes::Route;
use tasks::{TaskError, TaskStore};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::commands::{Command, HELP, ItemRef};

/// Interactive client state
pub struct Console<W> {
    session: SessionManager,
    store: TaskStore,
    route: Route,
    out: W,
}

impl<W: AsyncWrite + Unpin> Console<W> {
    pub fn new(session: SessionManager, store: TaskStore, out: W) -> Self {
        Self {
            session,
            store,
            route: Route::Home,
            out,
        }
    }

    /// Page currently shown
    pub fn route(&self) -> Route {
        self.route
    }

    /// Process commands until `quit` or end of input
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R) -> Result<()> {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            self.follow_session().await?;
            let command = match line.parse::<Command>() {
                Ok(command) => command,
                Err(e) => {
                    self.say(&e.to_string()).await?;
                    continue;
                }
            };
            debug!("Console command: {:?}", command);

            if command == Command::Quit {
                break;
            }
            self.execute(command).await?;
        }

        info!("Console closed");
        Ok(())
    }

    /// Leave the dashboard when the session ended behind our back
    async fn follow_session(&mut self) -> Result<()> {
        if self.route.requires_session() && !self.session.state().is_authenticated() {
            warn!("Session ended while on {}", self.route);
            self.store.clear();
            self.say("Your session has ended.").await?;
            self.navigate(Route::SignIn).await?;
        }
        Ok(())
    }

    async fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Help => {
                for usage in HELP {
                    self.say(usage).await?;
                }
            }
            Command::Quit => {}
            Command::Go(route) => self.navigate(route).await?,
            Command::SignUp {
                full_name,
                birth_date,
                email,
                password,
            } => {
                let Ok(birth_date) = NaiveDate::parse_from_str(birth_date.trim(), "%Y-%m-%d")
                else {
                    return self.say("Birth date must be YYYY-MM-DD").await;
                };
                match self
                    .session
                    .sign_up_with(&full_name, birth_date, &email, &password)
                    .await
                {
                    Ok(next) => {
                        self.say("Account created. Please sign in.").await?;
                        self.navigate(next).await?;
                    }
                    Err(e) => self.auth_failed(e).await?,
                }
            }
            Command::SignIn { email, password } => {
                match self.session.sign_in(&email, &password).await {
                    Ok(next) => self.navigate(next).await?,
                    Err(e) => self.auth_failed(e).await?,
                }
            }
            Command::SignOut => {
                let next = self.session.sign_out().await;
                self.store.clear();
                self.navigate(next).await?;
            }
            command => self.edit_tasks(command).await?,
        }
        Ok(())
    }

    /// Commands that only make sense on the dashboard
    async fn edit_tasks(&mut self, command: Command) -> Result<()> {
        let Some(user) = self.session.current_user() else {
            self.say("Please sign in first.").await?;
            return self.navigate(Route::SignIn).await;
        };
        if command == Command::Groups || self.route != Route::Dashboard {
            self.navigate(Route::Dashboard).await?;
            if command == Command::Groups {
                return Ok(());
            }
        }

        let result = match command {
            Command::AddGroup { title, description } => self
                .store
                .create_group(user.id, &title, description.as_deref())
                .await
                .map(|_| ()),
            Command::EditGroup {
                group,
                title,
                description,
            } => match self.group_id(&group) {
                Ok(group_id) => {
                    self.store
                        .update_group(group_id, &title, description.as_deref())
                        .await
                }
                Err(e) => Err(e),
            },
            Command::RemoveGroup { group } => match self.group_id(&group) {
                Ok(group_id) => self.store.delete_group(group_id).await,
                Err(e) => Err(e),
            },
            Command::AddTask {
                group,
                title,
                status,
            } => match self.group_id(&group) {
                Ok(group_id) => self
                    .store
                    .create_task(group_id, &title, status)
                    .await
                    .map(|_| ()),
                Err(e) => Err(e),
            },
            Command::EditTask {
                group,
                task,
                title,
                status,
            } => match self.task_id(&group, &task) {
                Ok((group_id, task_id)) => {
                    self.store
                        .update_task(group_id, task_id, &title, status)
                        .await
                }
                Err(e) => Err(e),
            },
            Command::RemoveTask { group, task } => match self.task_id(&group, &task) {
                Ok((group_id, task_id)) => self.store.delete_task(group_id, task_id).await,
                Err(e) => Err(e),
            },
            _ => Ok(()),
        };

        if let Err(e) = result {
            self.say(&format!("Error: {}", e)).await?;
        }
        self.render_dashboard().await
    }

    fn group_id(&self, group: &ItemRef) -> Result<Uuid, TaskError> {
        match group {
            ItemRef::Id(id) => Ok(*id),
            ItemRef::Position(position) => self
                .store
                .groups()
                .get(position - 1)
                .map(|entry| entry.id())
                .ok_or_else(|| TaskError::Validation(format!("No group number {}", position))),
        }
    }

    fn task_id(&self, group: &ItemRef, task: &ItemRef) -> Result<(Uuid, Uuid), TaskError> {
        let group_id = self.group_id(group)?;
        let task_id = match task {
            ItemRef::Id(id) => *id,
            ItemRef::Position(position) => self
                .store
                .group(group_id)
                .and_then(|entry| entry.tasks.get(position - 1))
                .map(|task| task.id)
                .ok_or_else(|| TaskError::Validation(format!("No task number {}", position)))?,
        };
        Ok((group_id, task_id))
    }

    async fn auth_failed(&mut self, error: AuthError) -> Result<()> {
        self.say(&format!("Error: {}", error)).await?;
        if matches!(error, AuthError::InvalidCredentials) {
            let remaining = self.session.remaining_attempts().await;
            self.say(&format!("{} attempt(s) left", remaining)).await?;
        }
        Ok(())
    }

    /// Show a page, redirecting to sign-in when it needs a session
    pub async fn navigate(&mut self, route: Route) -> Result<()> {
        let route = if route.requires_session() && !self.session.state().is_authenticated() {
            info!("Redirecting {} to sign-in", route);
            Route::SignIn
        } else {
            route
        };
        self.route = route;

        match route {
            Route::Home => {
                self.say("Taskboard: `go signin`, `go signup` or `help`").await?;
            }
            Route::SignIn => self.say("Sign in: signin|<email>|<password>").await?,
            Route::SignUp => self.say(&format!("Sign up: {}", HELP[0])).await?,
            Route::Dashboard => {
                if let Some(user) = self.session.current_user() {
                    match self.store.load_groups(user.id).await {
                        Ok(report) => {
                            for error in report.errors {
                                self.say(&format!("Error: {}", error)).await?;
                            }
                        }
                        Err(e) => self.say(&format!("Error: {}", e)).await?,
                    }
                }
                self.render_dashboard().await?;
            }
        }
        Ok(())
    }

    async fn render_dashboard(&mut self) -> Result<()> {
        let name = self
            .session
            .display_name()
            .await
            .unwrap_or_else(|| auth::session::FALLBACK_DISPLAY_NAME.to_string());

        let mut page = format!("Welcome, {}\n", name);
        if self.store.groups().is_empty() {
            page.push_str("No task groups yet: group add|<title>|[description]\n");
        }
        for (i, entry) in self.store.groups().iter().enumerate() {
            page.push_str(&format!("{}. {}", i + 1, entry.group.title));
            if let Some(description) = &entry.group.description {
                page.push_str(&format!(" ({})", description));
            }
            page.push('\n');
            for (j, task) in entry.tasks.iter().enumerate() {
                page.push_str(&format!(
                    "   {}. [{}] {}\n",
                    j + 1,
                    task.status.label(),
                    task.title
                ));
            }
        }

        self.out.write_all(page.as_bytes()).await?;
        self.out.flush().await?;
        Ok(())
    }

    async fn say(&mut self, message: &str) -> Result<()> {
        self.out.write_all(message.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await?;
        Ok(())
    }

    /// Stop following the session and hand back the output
    pub async fn close(mut self) -> W {
        self.session.shutdown().await;
        self.out
    }
}
