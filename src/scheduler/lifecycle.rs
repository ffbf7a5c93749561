use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::board::{BoardClient, BoardList, Card, Comment};
use crate::config::BoardConfig;
use crate::error::TaskError;
use crate::process::{JobSpawner, ProcessProbe, ProcessState};
use crate::scheduler::launcher::JobLauncher;
use crate::scheduler::ledger::ResourceLedger;
use crate::Result;

/// Comment tag identifying the tracked pid.
pub const PID_TAG: &str = "PID:";
/// Comment tag identifying the job id.
pub const UID_TAG: &str = "UID:";

/// Warning appended when the backing process cannot be found; the outcome
/// (success or failure) is not recoverable from a liveness check alone.
const NOT_FOUND_WARNING: &str = "❌ Error: Could not find the process";

/// The three lists a board poller drives cards through.
#[derive(Debug, Clone)]
pub struct BoardLists {
    pub queue: BoardList,
    pub ongoing: BoardList,
    pub done: BoardList,
}

/// Outcome of one lifecycle check of an Ongoing card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardOutcome {
    /// The backing process is still running; nothing changed.
    StillRunning,
    /// The card was finalized to Done and its resources released.
    Finished,
}

/// Drives one board's cards through Queue -> Ongoing -> Done.
///
/// Owned by a single board poller task; all ledger mutations happen
/// sequentially within that task.
pub struct LifecycleController {
    client: Arc<dyn BoardClient>,
    spawner: Arc<dyn JobSpawner>,
    probe: Arc<dyn ProcessProbe>,
    launcher: JobLauncher,
    ledger: ResourceLedger,
    lists: BoardLists,
    log_dir: PathBuf,
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("lists", &self.lists)
            .field("log_dir", &self.log_dir)
            .finish_non_exhaustive()
    }
}

impl LifecycleController {
    pub fn new(
        client: Arc<dyn BoardClient>,
        spawner: Arc<dyn JobSpawner>,
        probe: Arc<dyn ProcessProbe>,
        config: &BoardConfig,
        lists: BoardLists,
    ) -> Self {
        Self {
            launcher: JobLauncher::new(config.command.clone()),
            ledger: ResourceLedger::new(config.resources.clone()),
            log_dir: PathBuf::from("."),
            client,
            spawner,
            probe,
            lists,
        }
    }

    /// Directory searched for `<jobId>.log` artifacts at finalization.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn lists(&self) -> &BoardLists {
        &self.lists
    }

    /// Attempt to admit and launch a Queue card.
    ///
    /// Returns `Ok(false)` when the ledger cannot admit it this cycle; the
    /// card stays in Queue and is retried later. Admission is first-seen,
    /// first-served: a large-resource card may wait behind smaller ones.
    pub async fn schedule_card(&mut self, card: &Card) -> Result<bool> {
        let required = self.ledger.required_resources(&card.labels);
        if !self.ledger.try_reserve(&required) {
            tracing::debug!(card = %card.name, ?required, "Card held back, resources exhausted");
            return Ok(false);
        }

        match self
            .launcher
            .launch(
                self.client.as_ref(),
                self.spawner.as_ref(),
                card,
                &self.lists.ongoing,
            )
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                // The card never became a tracked Ongoing card, so the
                // admission must not stick.
                self.ledger.release(&required);
                Err(err)
            }
        }
    }

    /// Run the liveness check for an Ongoing card.
    ///
    /// `Active` is a no-op; `Terminated` and `NotFound` both finalize the
    /// card, the latter with a warning since the outcome is unknowable.
    pub async fn check_card(&mut self, card: &Card) -> Result<CardOutcome> {
        tracing::debug!(card = %card.name, "Checking card");

        let comments = self.client.fetch_comments(card).await?;
        let tracking = parse_tracking(card, &comments)?;

        match self.probe.probe(tracking.pid) {
            ProcessState::Active => Ok(CardOutcome::StillRunning),
            ProcessState::NotFound => {
                self.client.append_comment(card, NOT_FOUND_WARNING).await?;
                self.finalize(card, tracking.uid).await?;
                Ok(CardOutcome::Finished)
            }
            ProcessState::Terminated => {
                self.finalize(card, tracking.uid).await?;
                Ok(CardOutcome::Finished)
            }
        }
    }

    /// Move the card to Done, release its resources, and attach the job log
    /// if one exists.
    ///
    /// The finished comment lands before the list move. If the move then
    /// fails, the card stays in Ongoing and the next cycle finalizes it
    /// again, appending a second finished comment; the window is accepted
    /// since comments are append-only and the eventual Done state wins.
    async fn finalize(&mut self, card: &Card, uid: Uuid) -> Result<()> {
        tracing::info!(card = %card.name, uid = %uid, "Finished card");

        self.client
            .append_comment(card, &format!("✔️ Finished: {}", Utc::now()))
            .await?;
        self.client.move_card(card, &self.lists.done).await?;

        // Requirements are re-derived from the card's current labels rather
        // than snapshotted at launch; the label set is assumed stable for
        // the card's lifetime.
        let required = self.ledger.required_resources(&card.labels);
        self.ledger.release(&required);

        self.attach_log(card, uid).await;
        Ok(())
    }

    /// Attach `<uid>.log` from the log directory when present. Absence is
    /// expected; read or attach failures are logged without failing the
    /// already-finalized card.
    async fn attach_log(&self, card: &Card, uid: Uuid) {
        let name = format!("{uid}.log");
        let path = self.log_dir.join(&name);

        match tokio::fs::read(&path).await {
            Ok(contents) => {
                if let Err(err) = self.client.attach_file(card, &name, &contents).await {
                    tracing::warn!(card = %card.name, %err, "Failed to attach job log");
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(card = %card.name, path = %path.display(), %err, "Failed to read job log");
            }
        }
    }
}

/// Tracking metadata recovered from a card's comment log.
#[derive(Debug, PartialEq, Eq)]
struct Tracking {
    pid: u32,
    uid: Uuid,
}

/// Scan the comment log for the pid and job-id tags; the last parseable
/// occurrence of each wins. An Ongoing card missing either is an integrity
/// fault for that card alone.
fn parse_tracking(card: &Card, comments: &[Comment]) -> Result<Tracking> {
    let mut pid: Option<u32> = None;
    let mut uid: Option<Uuid> = None;

    for comment in comments {
        if let Some(value) = tag_value(&comment.text, PID_TAG) {
            pid = value.parse().ok().or(pid);
        }
        if let Some(value) = tag_value(&comment.text, UID_TAG) {
            uid = value.parse().ok().or(uid);
        }
    }

    let pid = pid.ok_or_else(|| TaskError::MissingTracking {
        card: card.name.clone(),
        field: "PID",
    })?;
    let uid = uid.ok_or_else(|| TaskError::MissingTracking {
        card: card.name.clone(),
        field: "UID",
    })?;

    Ok(Tracking { pid, uid })
}

fn tag_value<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    text.split_once(tag).map(|(_, rest)| rest.trim())
}
