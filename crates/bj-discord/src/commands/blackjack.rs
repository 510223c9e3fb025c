//! /blackjack command - Open or join the guild's table (poise implementation)

use tracing::{debug, error};

use bj_core::action::COMMAND_ACK;

use crate::commands::Data;
use crate::error::Result;
use crate::table::{self, ThreadOrigin};

/// Launch or join a game of blackjack in the current channel
#[poise::command(slash_command, guild_only, rename = "blackjack")]
pub async fn blackjack(
    ctx: poise::Context<'_, Data, crate::error::DiscordError>,
) -> Result<()> {
    ctx.send(
        poise::CreateReply::default()
            .content(COMMAND_ACK)
            .ephemeral(true),
    )
    .await?;

    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let channel_id = ctx.channel_id();
    let serenity_ctx = ctx.serenity_context();

    // Tables are opened from channels, never from inside a thread
    if table::channel_is_thread(serenity_ctx, channel_id).await {
        debug!("Ignoring /blackjack inside thread {}", channel_id);
        return Ok(());
    }

    if let Err(e) = table::take_seat(
        serenity_ctx,
        ctx.data(),
        guild_id,
        ThreadOrigin::Channel(channel_id),
        ctx.author().id,
    )
    .await
    {
        error!("Failed to seat {} in guild {}: {}", ctx.author().id, guild_id, e);
    }

    Ok(())
}
