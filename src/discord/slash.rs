// Structured surface: slash command interactions

use async_trait::async_trait;
use tracing::debug;

use crate::discord::guild;
use crate::dispatch::{pipeline, GuildIdentity, Invocation, Reply, Requester, Surface};
use crate::features::member_counts::MemberSplit;
use crate::models::server::GuildSummary;
use crate::{Context, Error};

pub struct SlashSurface<'a> {
    ctx: Context<'a>,
    author: Requester,
    guild: Option<GuildIdentity>,
    manage_guild: bool,
}

impl<'a> SlashSurface<'a> {
    pub fn new(ctx: Context<'a>) -> Self {
        let user = ctx.author();
        let author = Requester {
            id: user.id.get(),
            name: user.name.clone(),
            avatar_url: Some(user.face()),
        };

        let guild = ctx.guild().map(|g| GuildIdentity {
            id: g.id.to_string(),
            name: g.name.clone(),
            icon_url: g.icon_url(),
        });

        // Discord resolves the member's effective permissions for interactions
        let manage_guild = match ctx {
            poise::Context::Application(app) => app
                .interaction
                .member
                .as_ref()
                .and_then(|member| member.permissions)
                .is_some_and(|perms| guild::grants_manage_guild([perms])),
            _ => false,
        };

        Self {
            ctx,
            author,
            guild,
            manage_guild,
        }
    }

    fn guild_id(&self) -> anyhow::Result<poise::serenity_prelude::GuildId> {
        self.ctx
            .guild_id()
            .ok_or_else(|| anyhow::anyhow!("interaction was not sent in a guild"))
    }
}

#[async_trait]
impl Surface for SlashSurface<'_> {
    fn author(&self) -> &Requester {
        &self.author
    }

    fn guild(&self) -> Option<&GuildIdentity> {
        self.guild.as_ref()
    }

    fn can_manage_guild(&self) -> bool {
        self.manage_guild
    }

    async fn defer(&self) -> anyhow::Result<()> {
        self.ctx.defer().await?;
        Ok(())
    }

    async fn reply(&self, reply: Reply) -> anyhow::Result<()> {
        let builder = match reply {
            Reply::Text(text) => poise::CreateReply::default().content(text),
            Reply::Private(text) => poise::CreateReply::default().content(text).ephemeral(true),
            Reply::Embed(embed) => poise::CreateReply::default().embed(embed),
        };
        self.ctx.send(builder).await?;
        Ok(())
    }

    async fn is_text_channel(&self, channel_id: u64) -> bool {
        match self.ctx.guild_id() {
            Some(guild_id) => guild::is_text_channel(&self.ctx.serenity_context().cache, guild_id, channel_id),
            None => false,
        }
    }

    async fn guild_summary(&self) -> anyhow::Result<GuildSummary> {
        guild::summarize(self.ctx.serenity_context(), self.guild_id()?).await
    }

    async fn fetch_member_split(&self) -> anyhow::Result<MemberSplit> {
        let split = guild::fetch_member_split(
            &self.ctx.serenity_context().http,
            self.guild_id()?,
            self.ctx.data().member_fetch_timeout,
        )
        .await?;
        Ok(split)
    }
}

/// Hand a slash invocation to the shared pipeline.
///
/// Faults are contained and answered there, so this never reports an error
/// back to poise.
pub async fn dispatch(ctx: Context<'_>, command: &str, invocation: Invocation) -> Result<(), Error> {
    let surface = SlashSurface::new(ctx);
    let outcome = pipeline::handle_structured(ctx.data(), &surface, command, &invocation).await;
    debug!("/{} -> {:?}", command, outcome);
    Ok(())
}
