use chrono::Utc;
use uuid::Uuid;

use crate::board::{BoardClient, BoardList, Card};
use crate::error::TaskError;
use crate::process::JobSpawner;
use crate::Result;

/// Template placeholder replaced with the card description.
const MSG_PLACEHOLDER: &str = "{msg}";
/// Template placeholder replaced with the generated job id.
const UID_PLACEHOLDER: &str = "{uid}";

/// Tracking metadata recorded on a card when its process starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchedJob {
    pub uid: Uuid,
    pub pid: u32,
}

/// Builds commands from a board's template and starts them detached.
pub struct JobLauncher {
    template: String,
}

impl JobLauncher {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Substitute the card description and job id into the template.
    fn render(&self, card: &Card, uid: Uuid) -> String {
        self.template
            .replace(MSG_PLACEHOLDER, &card.description)
            .replace(UID_PLACEHOLDER, &uid.to_string())
    }

    /// Spawn the card's command detached and tag the card with its tracking
    /// comments, moving it to the Ongoing list.
    ///
    /// The card must already hold its resource reservation. On failure the
    /// caller rolls that reservation back; a spawn failure leaves the card
    /// unmoved and untouched so it is retried on the next cycle.
    pub async fn launch(
        &self,
        client: &dyn BoardClient,
        spawner: &dyn JobSpawner,
        card: &Card,
        ongoing: &BoardList,
    ) -> Result<LaunchedJob> {
        let uid = Uuid::new_v4();
        let command = self.render(card, uid);

        let pid = spawner
            .spawn_detached(&command)
            .map_err(|source| TaskError::SpawnFailed {
                card: card.name.clone(),
                source,
            })?;

        tracing::info!(card = %card.name, pid, uid = %uid, "Scheduling card");

        client.move_card(card, ongoing).await?;
        client
            .append_comment(card, &format!("⏲ Started: {}", Utc::now()))
            .await?;
        client
            .append_comment(card, &format!("💻 PID: {pid}"))
            .await?;
        client
            .append_comment(card, &format!("🆔 UID: {uid}"))
            .await?;

        Ok(LaunchedJob { uid, pid })
    }
}
