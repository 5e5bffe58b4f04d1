// Shared resolve -> rate-limit -> execute -> contain path for both surfaces

use std::any::Any;
use std::panic::AssertUnwindSafe;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tracing::{debug, error, warn};

use crate::dispatch::invocation::parse_command;
use crate::dispatch::{CommandDefinition, InboundMessage, Invocation, Reply, Surface, Verdict};
use crate::error::BotError;
use crate::utils::config::DEFAULT_PREFIX;
use crate::Data;

/// What happened to an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not a command for us; nothing was done
    Ignored,
    /// Looked like a command but no such command is reachable
    Unresolved,
    RateLimited { retry_at: DateTime<Utc> },
    Completed,
    /// Handler faulted; the requester got the generic failure reply
    Failed,
}

/// Entry point for chat messages
pub async fn handle_message(data: &Data, surface: &dyn Surface, message: &InboundMessage) -> Outcome {
    handle_message_at(data, surface, message, Utc::now()).await
}

pub async fn handle_message_at(
    data: &Data,
    surface: &dyn Surface,
    message: &InboundMessage,
    now: DateTime<Utc>,
) -> Outcome {
    if message.author_is_bot {
        return Outcome::Ignored;
    }

    let prefix = prefix_for(data, message.guild_id.as_deref()).await;
    let Some((name, args)) = parse_command(&prefix, &message.content) else {
        return Outcome::Ignored;
    };

    // Unknown commands stay silent so stray prefixed chatter doesn't get answered
    let Some(definition) = data.registry.resolve_text(&name) else {
        debug!("No text command named '{}'", name);
        return Outcome::Unresolved;
    };

    let invocation = Invocation::Textual {
        raw: message.content.clone(),
        args,
    };
    run(data, surface, definition, &invocation, now).await
}

/// Entry point for slash commands
pub async fn handle_structured(
    data: &Data,
    surface: &dyn Surface,
    command: &str,
    invocation: &Invocation,
) -> Outcome {
    handle_structured_at(data, surface, command, invocation, Utc::now()).await
}

pub async fn handle_structured_at(
    data: &Data,
    surface: &dyn Surface,
    command: &str,
    invocation: &Invocation,
    now: DateTime<Utc>,
) -> Outcome {
    let Some(definition) = data.registry.resolve(command) else {
        warn!("Slash command '{}' has no registered handler", command);
        return Outcome::Unresolved;
    };

    run(data, surface, definition, invocation, now).await
}

/// The guild's prefix, falling back to the default outside guilds or on store failure
async fn prefix_for(data: &Data, guild_id: Option<&str>) -> String {
    let Some(guild_id) = guild_id else {
        return DEFAULT_PREFIX.to_string();
    };

    match data.store.prefix(guild_id).await {
        Ok(prefix) => prefix,
        Err(e) => {
            warn!("Failed to read prefix for guild {}: {:?}", guild_id, e);
            DEFAULT_PREFIX.to_string()
        }
    }
}

async fn run(
    data: &Data,
    surface: &dyn Surface,
    definition: &CommandDefinition,
    invocation: &Invocation,
    now: DateTime<Utc>,
) -> Outcome {
    let user_id = surface.author().id;
    let window = data.registry.window_for(definition);

    if let Verdict::Denied { retry_at } = data.cooldowns.acquire(definition.name, user_id, now, window) {
        let denial = BotError::RateLimited {
            command: definition.name.to_string(),
            retry_at,
        };
        if let Err(e) = surface.reply(Reply::Private(denial.user_message())).await {
            warn!("Failed to send cooldown notice for '{}': {:?}", definition.name, e);
        }
        return Outcome::RateLimited { retry_at };
    }

    let execution = AssertUnwindSafe((definition.handler)(data, surface, invocation)).catch_unwind();
    let error = match execution.await {
        Ok(Ok(())) => return Outcome::Completed,
        Ok(Err(e)) => e,
        Err(panic) => anyhow::anyhow!("handler panicked: {}", panic_message(panic.as_ref())),
    };

    contain(surface, definition.name, invocation, error).await;
    Outcome::Failed
}

/// Log a handler fault and give the requester one reply that reveals nothing internal
async fn contain(surface: &dyn Surface, command: &str, invocation: &Invocation, error: anyhow::Error) {
    let message = match error.downcast_ref::<BotError>() {
        Some(bot_error) if bot_error.is_user_error() => bot_error.user_message(),
        _ => BotError::Unhandled(anyhow::anyhow!("{}", command)).user_message(),
    };

    error!(
        command = command,
        user = surface.author().id,
        guild = surface.guild_id().unwrap_or("-"),
        invocation = %invocation.describe(),
        "Command error: {:?}",
        error
    );

    if let Err(e) = surface.reply(Reply::Private(message)).await {
        error!("Failed to report error for '{}': {:?}", command, e);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::db::ConfigStore;
    use crate::dispatch::registry::HandlerFuture;
    use crate::dispatch::surface::testing::MockSurface;
    use crate::dispatch::CommandRegistry;
    use crate::utils::config::GENERIC_FAILURE;
    use chrono::TimeZone;

    fn succeeds<'a>(_: &'a Data, surface: &'a dyn Surface, _: &'a Invocation) -> HandlerFuture<'a> {
        Box::pin(async move { surface.reply(Reply::Text("pong".into())).await })
    }

    fn fails<'a>(_: &'a Data, _: &'a dyn Surface, _: &'a Invocation) -> HandlerFuture<'a> {
        Box::pin(async { Err::<(), _>(anyhow::anyhow!("database is on fire")) })
    }

    fn panics<'a>(_: &'a Data, _: &'a dyn Surface, _: &'a Invocation) -> HandlerFuture<'a> {
        Box::pin(async {
            let missing: Option<&str> = None;
            let _ = missing.expect("unexpected null");
            Ok::<(), anyhow::Error>(())
        })
    }

    fn rejects<'a>(_: &'a Data, _: &'a dyn Surface, _: &'a Invocation) -> HandlerFuture<'a> {
        Box::pin(async { Err::<(), anyhow::Error>(BotError::PermissionDenied.into()) })
    }

    fn echo_args<'a>(_: &'a Data, surface: &'a dyn Surface, invocation: &'a Invocation) -> HandlerFuture<'a> {
        Box::pin(async move {
            let text = match invocation {
                Invocation::Textual { args, .. } => args.join("|"),
                Invocation::Structured { subcommand, .. } => subcommand.clone().unwrap_or_default(),
            };
            surface.reply(Reply::Text(text)).await
        })
    }

    async fn data() -> Data {
        let registry = CommandRegistry::new()
            .register(CommandDefinition::new("ping", succeeds).text_enabled())
            .register(CommandDefinition::new("fail", fails).text_enabled())
            .register(CommandDefinition::new("panic", panics).text_enabled())
            .register(CommandDefinition::new("reject", rejects).text_enabled())
            .register(CommandDefinition::new("echo", echo_args).text_enabled())
            .register(CommandDefinition::new("slow", succeeds).text_enabled().cooldown(Duration::from_secs(60)))
            .register(CommandDefinition::new("slashonly", succeeds));
        Data::new(ConfigStore::in_memory().await, registry, Duration::from_secs(30))
    }

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    fn message(content: &str) -> InboundMessage {
        InboundMessage {
            author_is_bot: false,
            guild_id: Some("100".into()),
            content: content.into(),
        }
    }

    #[tokio::test]
    async fn test_executes_text_command() {
        let data = data().await;
        let surface = MockSurface::new();

        let outcome = handle_message_at(&data, &surface, &message(",ping"), t0()).await;

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(surface.only_text(), "pong");
    }

    #[tokio::test]
    async fn test_args_are_passed_through() {
        let data = data().await;
        let surface = MockSurface::new();

        handle_message_at(&data, &surface, &message(",ECHO a  b c"), t0()).await;

        assert_eq!(surface.only_text(), "a|b|c");
    }

    #[tokio::test]
    async fn test_ignores_bots() {
        let data = data().await;
        let surface = MockSurface::new();
        let mut msg = message(",ping");
        msg.author_is_bot = true;

        assert_eq!(handle_message_at(&data, &surface, &msg, t0()).await, Outcome::Ignored);
        assert_eq!(surface.reply_count(), 0);
        assert!(data.cooldowns.is_empty());
    }

    #[tokio::test]
    async fn test_ignores_unprefixed() {
        let data = data().await;
        let surface = MockSurface::new();

        assert_eq!(handle_message_at(&data, &surface, &message("ping"), t0()).await, Outcome::Ignored);
        assert_eq!(surface.reply_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_command_is_silent() {
        let data = data().await;
        let surface = MockSurface::new();

        let outcome = handle_message_at(&data, &surface, &message(",nosuchthing arg"), t0()).await;

        assert_eq!(outcome, Outcome::Unresolved);
        assert_eq!(surface.reply_count(), 0);
        assert!(data.cooldowns.is_empty());
    }

    #[tokio::test]
    async fn test_slash_only_command_not_reachable_by_text() {
        let data = data().await;
        let surface = MockSurface::new();

        let outcome = handle_message_at(&data, &surface, &message(",slashonly"), t0()).await;

        assert_eq!(outcome, Outcome::Unresolved);
        assert_eq!(surface.reply_count(), 0);
    }

    #[tokio::test]
    async fn test_uses_guild_prefix() {
        let data = data().await;
        data.store.set_value("100", "prefix", "k!").await.unwrap();
        let surface = MockSurface::new();

        assert_eq!(handle_message_at(&data, &surface, &message(",ping"), t0()).await, Outcome::Ignored);
        assert_eq!(handle_message_at(&data, &surface, &message("k!ping"), t0()).await, Outcome::Completed);
        assert_eq!(surface.reply_count(), 1);
    }

    #[tokio::test]
    async fn test_prefix_change_applies_to_next_message() {
        let data = data().await;
        let surface = MockSurface::new();
        let later = t0() + chrono::Duration::seconds(10);

        assert_eq!(handle_message_at(&data, &surface, &message(",ping"), t0()).await, Outcome::Completed);
        data.store.set_value("100", "prefix", "?").await.unwrap();

        assert_eq!(handle_message_at(&data, &surface, &message(",ping"), later).await, Outcome::Ignored);
        assert_eq!(handle_message_at(&data, &surface, &message("?ping"), later).await, Outcome::Completed);
    }

    #[tokio::test]
    async fn test_default_prefix_outside_guilds() {
        let data = data().await;
        let surface = MockSurface::new().without_guild();
        let mut msg = message(",ping");
        msg.guild_id = None;

        assert_eq!(handle_message_at(&data, &surface, &msg, t0()).await, Outcome::Completed);
    }

    #[tokio::test]
    async fn test_cooldown_denies_second_use() {
        let data = data().await;
        let surface = MockSurface::new();
        let later = t0() + chrono::Duration::milliseconds(1000);

        handle_message_at(&data, &surface, &message(",ping"), t0()).await;
        let outcome = handle_message_at(&data, &surface, &message(",ping"), later).await;

        let retry_at = t0() + chrono::Duration::milliseconds(3000);
        assert_eq!(outcome, Outcome::RateLimited { retry_at });
        let replies = surface.replies();
        assert_eq!(replies.len(), 2);
        assert_eq!(
            replies[1].text().unwrap(),
            "Please wait, you are on a cooldown for `ping`. You can use it again <t:1700000003:R>."
        );
    }

    #[tokio::test]
    async fn test_cooldown_expires() {
        let data = data().await;
        let surface = MockSurface::new();
        let later = t0() + chrono::Duration::milliseconds(3001);

        handle_message_at(&data, &surface, &message(",ping"), t0()).await;
        let outcome = handle_message_at(&data, &surface, &message(",ping"), later).await;

        assert_eq!(outcome, Outcome::Completed);
    }

    #[tokio::test]
    async fn test_cooldown_per_command_and_user() {
        let data = data().await;
        let alice = MockSurface::new().with_author(1);
        let bob = MockSurface::new().with_author(2);

        handle_message_at(&data, &alice, &message(",ping"), t0()).await;

        assert_eq!(handle_message_at(&data, &alice, &message(",echo x"), t0()).await, Outcome::Completed);
        assert_eq!(handle_message_at(&data, &bob, &message(",ping"), t0()).await, Outcome::Completed);
    }

    #[tokio::test]
    async fn test_cooldown_override() {
        let data = data().await;
        let surface = MockSurface::new();
        let later = t0() + chrono::Duration::seconds(30);

        handle_message_at(&data, &surface, &message(",slow"), t0()).await;
        let outcome = handle_message_at(&data, &surface, &message(",slow"), later).await;

        assert_eq!(
            outcome,
            Outcome::RateLimited { retry_at: t0() + chrono::Duration::seconds(60) }
        );
    }

    #[tokio::test]
    async fn test_handler_error_is_contained() {
        let data = data().await;
        let surface = MockSurface::new();

        let outcome = handle_message_at(&data, &surface, &message(",fail"), t0()).await;

        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(surface.only_text(), GENERIC_FAILURE);
    }

    #[tokio::test]
    async fn test_handler_panic_is_contained() {
        let data = data().await;
        let surface = MockSurface::new();

        let outcome = handle_message_at(&data, &surface, &message(",panic"), t0()).await;

        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(surface.only_text(), GENERIC_FAILURE);
    }

    #[tokio::test]
    async fn test_user_errors_surface_their_message() {
        let data = data().await;
        let surface = MockSurface::new();

        handle_message_at(&data, &surface, &message(",reject"), t0()).await;

        assert_eq!(surface.only_text(), BotError::PermissionDenied.user_message());
    }

    #[tokio::test]
    async fn test_structured_reaches_any_command() {
        let data = data().await;
        let surface = MockSurface::new();
        let invocation = Invocation::structured(Some("go"), vec![]);

        let outcome = handle_structured_at(&data, &surface, "slashonly", &invocation, t0()).await;
        assert_eq!(outcome, Outcome::Completed);

        let outcome = handle_structured_at(&data, &surface, "echo", &invocation, t0()).await;
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(surface.replies()[1].text(), Some("go"));
    }

    #[tokio::test]
    async fn test_structured_shares_cooldowns() {
        let data = data().await;
        let surface = MockSurface::new();
        let invocation = Invocation::structured(None, vec![]);

        handle_message_at(&data, &surface, &message(",ping"), t0()).await;
        let outcome = handle_structured_at(&data, &surface, "ping", &invocation, t0()).await;

        assert!(matches!(outcome, Outcome::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_structured_unknown_command() {
        let data = data().await;
        let surface = MockSurface::new();
        let invocation = Invocation::structured(None, vec![]);

        let outcome = handle_structured_at(&data, &surface, "ghost", &invocation, t0()).await;

        assert_eq!(outcome, Outcome::Unresolved);
        assert_eq!(surface.reply_count(), 0);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
