//! Abstract board-service collaborator.
//!
//! The scheduler core never talks to a concrete board API. It consumes the
//! capability set below: read cards and their labels, read the append-only
//! comment log, request forward list moves, append comments, and attach
//! files. Cards are owned by the board service; the core never deletes or
//! reorders them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Result;

/// A list (column) on a board, resolved once at poller startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardList {
    pub id: String,
    pub name: String,
}

/// A card as read from the board service.
#[derive(Debug, Clone)]
pub struct Card {
    pub id: String,
    pub name: String,
    /// Free-text description, substituted into the command template.
    pub description: String,
    /// Label names in board order. Labels matching configured resource
    /// names double as the card's resource requirements.
    pub labels: Vec<String>,
}

/// One entry in a card's append-only comment log.
#[derive(Debug, Clone)]
pub struct Comment {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait BoardClient: Send + Sync {
    /// Look up an open list by name on the given board.
    async fn find_list(&self, board_id: &str, name: &str) -> Result<Option<BoardList>>;

    /// Cards currently on a list, in the order the board service returns
    /// them. The scheduler makes no ordering promise beyond first-seen,
    /// first-served.
    async fn list_cards(&self, list: &BoardList) -> Result<Vec<Card>>;

    async fn move_card(&self, card: &Card, target: &BoardList) -> Result<()>;

    async fn append_comment(&self, card: &Card, text: &str) -> Result<()>;

    /// The card's comment log, oldest first.
    async fn fetch_comments(&self, card: &Card) -> Result<Vec<Comment>>;

    async fn attach_file(&self, card: &Card, name: &str, contents: &[u8]) -> Result<()>;
}
