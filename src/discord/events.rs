use poise::serenity_prelude as serenity;
use tracing::info;

use crate::discord::message;
use crate::{Data, Error};

/// Central event handler for gateway events poise doesn't consume itself
pub async fn handle_event(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            info!(
                bot = %data_about_bot.user.name,
                guilds = data_about_bot.guilds.len(),
                "Connected to gateway"
            );
        }
        serenity::FullEvent::Message { new_message } => {
            message::handle_message(ctx, new_message, data).await;
        }
        _ => {}
    }
    Ok(())
}
