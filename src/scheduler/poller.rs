use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::board::{BoardClient, BoardList};
use crate::config::{BoardConfig, Config};
use crate::error::TaskError;
use crate::process::{JobSpawner, ProcessProbe, ShellSpawner, SystemProbe};
use crate::scheduler::lifecycle::{BoardLists, LifecycleController};
use crate::Result;

/// One polling loop driving a single board.
///
/// Each cycle scans the Queue list for cards to admit, then the Ongoing
/// list for cards whose process has finished, then sleeps the configured
/// interval. All state is owned by this poller's task.
pub struct BoardPoller {
    config: BoardConfig,
    client: Arc<dyn BoardClient>,
    spawner: Arc<dyn JobSpawner>,
    probe: Arc<dyn ProcessProbe>,
    log_dir: PathBuf,
}

impl BoardPoller {
    pub fn new(config: BoardConfig, client: Arc<dyn BoardClient>) -> Self {
        Self {
            config,
            client,
            spawner: Arc::new(ShellSpawner),
            probe: Arc::new(SystemProbe),
            log_dir: PathBuf::from("."),
        }
    }

    pub fn with_spawner(mut self, spawner: Arc<dyn JobSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn ProcessProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn board_id(&self) -> &str {
        &self.config.id
    }

    /// Resolve the configured lists and build the lifecycle controller.
    ///
    /// A missing list is a setup fault, fatal to this board only.
    pub async fn setup(&self) -> Result<LifecycleController> {
        let lists = BoardLists {
            queue: self.find_list(&self.config.queue_list).await?,
            ongoing: self.find_list(&self.config.ongoing_list).await?,
            done: self.find_list(&self.config.done_list).await?,
        };

        Ok(LifecycleController::new(
            self.client.clone(),
            self.spawner.clone(),
            self.probe.clone(),
            &self.config,
            lists,
        )
        .with_log_dir(self.log_dir.clone()))
    }

    async fn find_list(&self, name: &str) -> Result<BoardList> {
        self.client
            .find_list(&self.config.id, name)
            .await?
            .ok_or_else(|| TaskError::ListNotFound {
                board: self.config.id.clone(),
                list: name.to_string(),
            })
    }

    /// Poll the board until `shutdown` fires.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let mut controller = self.setup().await?;
        let interval = self.config.poll_interval();

        tracing::info!(board = %self.config.id, "Board poller started");

        loop {
            self.run_cycle(&mut controller).await;

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.cancelled() => {
                    tracing::info!(board = %self.config.id, "Board poller stopping");
                    return Ok(());
                }
            }
        }
    }

    /// One polling pass: scan Queue, then Ongoing.
    ///
    /// Per-card failures are logged and never abort the pass; a failed card
    /// fetch ends the pass early and is retried on the next cycle.
    pub async fn run_cycle(&self, controller: &mut LifecycleController) {
        tracing::debug!(board = %self.config.id, "Checking cards");

        let queue = controller.lists().queue.clone();
        match self.client.list_cards(&queue).await {
            Ok(cards) => {
                for card in &cards {
                    if let Err(err) = controller.schedule_card(card).await {
                        tracing::warn!(
                            board = %self.config.id,
                            card = %card.name,
                            %err,
                            "Failed to schedule card"
                        );
                    }
                }
            }
            Err(err) => {
                tracing::warn!(board = %self.config.id, %err, "Failed to fetch queue cards");
                return;
            }
        }

        let ongoing = controller.lists().ongoing.clone();
        match self.client.list_cards(&ongoing).await {
            Ok(cards) => {
                for card in &cards {
                    if let Err(err) = controller.check_card(card).await {
                        tracing::warn!(
                            board = %self.config.id,
                            card = %card.name,
                            %err,
                            "Failed to check card"
                        );
                    }
                }
            }
            Err(err) => {
                tracing::warn!(board = %self.config.id, %err, "Failed to fetch ongoing cards");
            }
        }
    }
}

/// Supervises one poller task per configured board.
pub struct TaskManager {
    config: Config,
    client: Arc<dyn BoardClient>,
    spawner: Arc<dyn JobSpawner>,
    probe: Arc<dyn ProcessProbe>,
    log_dir: PathBuf,
}

impl TaskManager {
    pub fn new(config: Config, client: Arc<dyn BoardClient>) -> Self {
        Self {
            config,
            client,
            spawner: Arc::new(ShellSpawner),
            probe: Arc::new(SystemProbe),
            log_dir: PathBuf::from("."),
        }
    }

    pub fn with_spawner(mut self, spawner: Arc<dyn JobSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn ProcessProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Run every board's poller concurrently until `shutdown` fires.
    ///
    /// Boards are isolated: a board whose setup fails is reported and
    /// dropped without stopping its siblings. The first board failure is
    /// returned once all pollers have exited, so a single-board deployment
    /// still surfaces its fault to the caller.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let mut pollers = JoinSet::new();

        for board in self.config.boards {
            let poller = BoardPoller::new(board, self.client.clone())
                .with_spawner(self.spawner.clone())
                .with_probe(self.probe.clone())
                .with_log_dir(self.log_dir.clone());
            let board_id = poller.board_id().to_string();
            let shutdown = shutdown.clone();

            pollers.spawn(async move { (board_id, poller.run(shutdown).await) });
        }

        let mut first_error = None;
        while let Some(joined) = pollers.join_next().await {
            match joined {
                Ok((board, Ok(()))) => {
                    tracing::info!(board = %board, "Board poller exited");
                }
                Ok((board, Err(err))) => {
                    tracing::error!(board = %board, %err, "Board poller failed");
                    first_error.get_or_insert(err);
                }
                Err(err) => {
                    tracing::error!(%err, "Board poller panicked");
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
