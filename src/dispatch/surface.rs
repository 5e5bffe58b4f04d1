// The capabilities a handler needs from whichever surface invoked it

use async_trait::async_trait;
use poise::serenity_prelude as serenity;

use crate::features::member_counts::MemberSplit;
use crate::models::server::GuildSummary;

/// Who invoked the command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub id: u64,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// The server an invocation happened in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildIdentity {
    pub id: String,
    pub name: String,
    pub icon_url: Option<String>,
}

/// A reply to the invoking user
#[derive(Debug, Clone)]
pub enum Reply {
    /// Visible to everyone in the channel
    Text(String),
    /// Visible only to the requester where the surface supports it
    Private(String),
    Embed(serenity::CreateEmbed),
}

impl Reply {
    pub fn text(&self) -> Option<&str> {
        match self {
            Reply::Text(text) | Reply::Private(text) => Some(text),
            Reply::Embed(_) => None,
        }
    }
}

/// Adapter between the dispatch pipeline and one way of invoking commands.
///
/// One implementation exists per input shape (chat message, slash
/// interaction); handlers never touch serenity types directly.
#[async_trait]
pub trait Surface: Send + Sync {
    fn author(&self) -> &Requester;

    fn guild(&self) -> Option<&GuildIdentity>;

    fn guild_id(&self) -> Option<&str> {
        self.guild().map(|g| g.id.as_str())
    }

    /// Whether the requester holds Manage Server in this guild
    fn can_manage_guild(&self) -> bool;

    /// Acknowledge a slow command; a no-op where the platform has no such concept
    async fn defer(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn reply(&self, reply: Reply) -> anyhow::Result<()>;

    /// Whether `channel_id` is an existing text-capable channel in this guild
    async fn is_text_channel(&self, channel_id: u64) -> bool;

    async fn guild_summary(&self) -> anyhow::Result<GuildSummary>;

    /// Count humans and bots; may be slow and may fail
    async fn fetch_member_split(&self) -> anyhow::Result<MemberSplit>;
}
