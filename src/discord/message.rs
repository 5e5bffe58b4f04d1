// Text surface: prefix commands typed in chat

use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use tracing::debug;

use crate::discord::guild;
use crate::dispatch::{pipeline, GuildIdentity, InboundMessage, Reply, Requester, Surface};
use crate::features::member_counts::MemberSplit;
use crate::models::server::GuildSummary;
use crate::Data;

pub struct MessageSurface<'a> {
    ctx: &'a serenity::Context,
    msg: &'a serenity::Message,
    author: Requester,
    guild: Option<GuildIdentity>,
    manage_guild: bool,
    data: &'a Data,
}

impl<'a> MessageSurface<'a> {
    pub fn new(ctx: &'a serenity::Context, msg: &'a serenity::Message, data: &'a Data) -> Self {
        let author = Requester {
            id: msg.author.id.get(),
            name: msg.author.name.clone(),
            avatar_url: Some(msg.author.face()),
        };

        let (guild, manage_guild) = match msg.guild_id {
            Some(guild_id) => {
                let identity = guild_id.to_guild_cached(&ctx.cache).map(|g| GuildIdentity {
                    id: g.id.to_string(),
                    name: g.name.clone(),
                    icon_url: g.icon_url(),
                });
                let roles = msg.member.as_ref().map(|m| m.roles.as_slice()).unwrap_or_default();
                let manage = guild::member_can_manage_guild(&ctx.cache, guild_id, msg.author.id, roles);
                (identity, manage)
            }
            None => (None, false),
        };

        Self {
            ctx,
            msg,
            author,
            guild,
            manage_guild,
            data,
        }
    }

    fn guild_id(&self) -> anyhow::Result<serenity::GuildId> {
        self.msg
            .guild_id
            .ok_or_else(|| anyhow::anyhow!("message {} was not sent in a guild", self.msg.id))
    }
}

#[async_trait]
impl Surface for MessageSurface<'_> {
    fn author(&self) -> &Requester {
        &self.author
    }

    fn guild(&self) -> Option<&GuildIdentity> {
        self.guild.as_ref()
    }

    fn can_manage_guild(&self) -> bool {
        self.manage_guild
    }

    async fn reply(&self, reply: Reply) -> anyhow::Result<()> {
        match reply {
            // Chat has no private replies
            Reply::Text(text) | Reply::Private(text) => {
                self.msg.reply(&self.ctx.http, text).await?;
            }
            Reply::Embed(embed) => {
                self.msg
                    .channel_id
                    .send_message(
                        &self.ctx.http,
                        serenity::CreateMessage::new()
                            .embed(embed)
                            .reference_message(self.msg),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    async fn is_text_channel(&self, channel_id: u64) -> bool {
        match self.msg.guild_id {
            Some(guild_id) => guild::is_text_channel(&self.ctx.cache, guild_id, channel_id),
            None => false,
        }
    }

    async fn guild_summary(&self) -> anyhow::Result<GuildSummary> {
        guild::summarize(self.ctx, self.guild_id()?).await
    }

    async fn fetch_member_split(&self) -> anyhow::Result<MemberSplit> {
        let split =
            guild::fetch_member_split(&self.ctx.http, self.guild_id()?, self.data.member_fetch_timeout).await?;
        Ok(split)
    }
}

/// Run a chat message through the text pipeline
pub async fn handle_message(ctx: &serenity::Context, msg: &serenity::Message, data: &Data) {
    let inbound = InboundMessage {
        author_is_bot: msg.author.bot,
        guild_id: msg.guild_id.map(|id| id.to_string()),
        content: msg.content.clone(),
    };

    // Skip the cache lookups for bot traffic
    if inbound.author_is_bot {
        return;
    }

    let surface = MessageSurface::new(ctx, msg, data);
    let outcome = pipeline::handle_message(data, &surface, &inbound).await;
    debug!("Message {} -> {:?}", msg.id, outcome);
}
