//! Interactive session loop.
//!
//! The loop moves between [`Screen`]s. An autosave session belongs to the
//! game screen that started it: the same Enter press that ends the wait
//! cancels the screen's token, so no timer survives into the next menu.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use cloudsave_autosave::{AutosaveError, AutosaveJob, AutosaveSession};
use cloudsave_games::{GameEntry, GamesError, GamesService};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::console::Console;

const CONTINUE: &str = "Press Enter to return.";

/// Menu states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    MainMenu,
    GameMenu(GameEntry),
    AutosaveIntervalPrompt(GameEntry),
    CreateGamePrompt,
    Exited,
}

pub struct Menu<R, W> {
    console: Console<R, W>,
    service: Arc<GamesService>,
    root_id: String,
    intervals: Vec<u64>,
}

impl<R, W> Menu<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(
        console: Console<R, W>,
        service: Arc<GamesService>,
        root_id: String,
        intervals: Vec<u64>,
    ) -> Self {
        Self {
            console,
            service,
            root_id,
            intervals,
        }
    }

    /// Runs until the user exits or input closes.
    pub async fn run(&mut self) -> io::Result<()> {
        let mut screen = Screen::MainMenu;
        while screen != Screen::Exited {
            screen = match screen {
                Screen::MainMenu => self.main_menu().await?,
                Screen::GameMenu(game) => self.game_menu(game).await?,
                Screen::AutosaveIntervalPrompt(game) => self.autosave(game).await?,
                Screen::CreateGamePrompt => self.create_game().await?,
                Screen::Exited => Screen::Exited,
            };
        }
        self.console.say("Goodbye!").await
    }

    async fn main_menu(&mut self) -> io::Result<Screen> {
        let choice = self
            .console
            .select(
                "Choose an action:",
                &["Find saved game", "Create new save", "Exit"],
            )
            .await?;

        match choice {
            Some(0) => self.choose_game().await,
            Some(1) => Ok(Screen::CreateGamePrompt),
            _ => Ok(Screen::Exited),
        }
    }

    async fn choose_game(&mut self) -> io::Result<Screen> {
        let games = match self.service.list_games(&self.root_id).await {
            Ok(games) => games,
            Err(e) => {
                self.report_failure("Listing games", &e).await?;
                return self.wait(Screen::MainMenu).await;
            }
        };
        if games.is_empty() {
            self.console.say("No games found.").await?;
            return self.wait(Screen::MainMenu).await;
        }

        let names: Vec<&str> = games.iter().map(|g| g.display_name()).collect();
        match self.console.select("Choose a game:", &names).await? {
            Some(index) => Ok(Screen::GameMenu(games[index].clone())),
            None => Ok(Screen::Exited),
        }
    }

    async fn game_menu(&mut self, game: GameEntry) -> io::Result<Screen> {
        self.console
            .say(&format!("Selected game: {}", game.display_name()))
            .await?;
        let choice = self
            .console
            .select(
                "Choose an action:",
                &["Backup", "Restore", "Autosave", "Back"],
            )
            .await?;

        match choice {
            Some(0) => {
                match self.service.backup_game(&game.id).await {
                    Ok(_) => self.console.say("Backup completed.").await?,
                    Err(e) => self.report_failure("Backup", &e).await?,
                }
                self.wait(Screen::GameMenu(game)).await
            }
            Some(1) => {
                match self.service.restore_game(&game.id).await {
                    Ok(dest) => {
                        self.console
                            .say(&format!("Restore completed into {}.", dest.display()))
                            .await?
                    }
                    Err(e) => self.report_failure("Restore", &e).await?,
                }
                self.wait(Screen::GameMenu(game)).await
            }
            Some(2) => Ok(Screen::AutosaveIntervalPrompt(game)),
            Some(_) => Ok(Screen::MainMenu),
            None => Ok(Screen::Exited),
        }
    }

    /// Prompts for an interval, then runs autosave until the user presses Enter.
    async fn autosave(&mut self, game: GameEntry) -> io::Result<Screen> {
        let labels: Vec<String> = self
            .intervals
            .iter()
            .map(|m| format!("{m} minute{}", if *m == 1 { "" } else { "s" }))
            .collect();
        let label_refs: Vec<&str> = labels.iter().map(String::as_str).collect();

        let Some(index) = self
            .console
            .select("Choose the autosave interval:", &label_refs)
            .await?
        else {
            return Ok(Screen::Exited);
        };
        let Some(interval) = self.intervals[index]
            .checked_mul(60)
            .map(Duration::from_secs)
        else {
            self.console.say("Autosave failed: interval is too long.").await?;
            return self.wait(Screen::GameMenu(game)).await;
        };

        let screen_token = CancellationToken::new();
        let job: Arc<dyn AutosaveJob> = self.service.clone();
        let started = AutosaveSession::start(job, game.id.clone(), interval, &screen_token).await;
        let session = match started {
            Ok(session) => {
                self.console
                    .say(&format!(
                        "Autosave is running every {}. Press Enter to stop and return.",
                        labels[index]
                    ))
                    .await?;
                Some(session)
            }
            Err(AutosaveError::NoSaveLocation(_)) => {
                self.console
                    .say("Autosave failed: no save location recorded for this game.")
                    .await?;
                None
            }
            Err(e) => {
                tracing::error!(folder_id = %game.id, error = %e, "autosave could not start");
                self.console.say(&format!("Autosave failed: {e}")).await?;
                None
            }
        };

        let open = self.console.pause(CONTINUE).await;
        screen_token.cancel();

        match open {
            Ok(true) => Ok(Screen::GameMenu(game)),
            Ok(false) => {
                // Exiting: let an in-flight firing finish its upload.
                if let Some(session) = session {
                    session.shutdown().await;
                }
                Ok(Screen::Exited)
            }
            Err(e) => Err(e),
        }
    }

    async fn create_game(&mut self) -> io::Result<Screen> {
        let Some(name) = self.console.input("Game name").await? else {
            return Ok(Screen::Exited);
        };
        let Some(location) = self.console.input("Save location").await? else {
            return Ok(Screen::Exited);
        };

        match self
            .service
            .create_game(&self.root_id, &name, &location)
            .await
        {
            Ok(game) => {
                self.console
                    .say(&format!(
                        "Save for {} created and backed up.",
                        game.display_name()
                    ))
                    .await?
            }
            Err(e) => self.report_failure("Creating the save", &e).await?,
        }
        self.wait(Screen::MainMenu).await
    }

    /// Waits for Enter, then moves to `next` (or exits if input closed).
    async fn wait(&mut self, next: Screen) -> io::Result<Screen> {
        if self.console.pause(CONTINUE).await? {
            Ok(next)
        } else {
            Ok(Screen::Exited)
        }
    }

    async fn report_failure(&mut self, action: &str, err: &GamesError) -> io::Result<()> {
        tracing::error!(kind = ?err.kind(), error = %err, "{action} failed");
        self.console.say(&format!("{action} failed: {err}")).await
    }
}
