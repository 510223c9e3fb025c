//! Seating players at a guild's table
//!
//! Shared by the `/blackjack` slash command and the plain-text trigger: both
//! open a thread for the caller, post the header and the action buttons, and
//! record the seat in the registry.

use futures::future::join_all;
use serenity::all::{
    AutoArchiveDuration, ButtonStyle, Channel, ChannelId, ChannelType, Context, CreateActionRow,
    CreateButton, CreateMessage, CreateThread, EditMessage, GuildChannel, GuildId, MessageId,
    ReactionType, UserId,
};
use tracing::{debug, error, info, warn};

use bj_core::action::MOVE_PROMPT;
use bj_core::{Seating, SessionRegistry, TableAction, header_content};

use crate::commands::Data;
use crate::error::Result;
use crate::retry::{discord_call, discord_create};

/// Where a player's thread hangs off
#[derive(Debug, Clone, Copy)]
pub enum ThreadOrigin {
    /// A fresh thread in the channel the command was used in
    Channel(ChannelId),
    /// A thread started from the message that triggered the table
    Message(ChannelId, MessageId),
}

impl ThreadOrigin {
    fn channel_id(self) -> ChannelId {
        match self {
            Self::Channel(id) | Self::Message(id, _) => id,
        }
    }
}

/// Hit/Stand action row
pub fn table_buttons(disabled: bool) -> Vec<CreateActionRow> {
    let buttons = TableAction::ALL
        .into_iter()
        .map(|action| {
            let style = match action {
                TableAction::Hit => ButtonStyle::Primary,
                TableAction::Stand => ButtonStyle::Secondary,
            };
            CreateButton::new(action.custom_id())
                .label(action.label())
                .emoji(ReactionType::Unicode(action.emoji().to_string()))
                .style(style)
                .disabled(disabled)
        })
        .collect();

    vec![CreateActionRow::Buttons(buttons)]
}

/// Map configured minutes onto Discord's fixed archive durations
pub fn archive_duration(minutes: u16) -> AutoArchiveDuration {
    match minutes {
        60 => AutoArchiveDuration::OneHour,
        4320 => AutoArchiveDuration::ThreeDays,
        10080 => AutoArchiveDuration::OneWeek,
        _ => AutoArchiveDuration::OneDay,
    }
}

/// Parse a stored decimal snowflake; zero is not a valid id
pub fn parse_snowflake(id: &str) -> Option<u64> {
    id.parse::<u64>().ok().filter(|id| *id != 0)
}

/// Thread channel kinds, or any channel carrying thread metadata
pub fn is_thread_kind(kind: ChannelType, has_thread_metadata: bool) -> bool {
    has_thread_metadata
        || matches!(
            kind,
            ChannelType::PublicThread | ChannelType::PrivateThread | ChannelType::NewsThread
        )
}

pub fn is_thread(channel: &GuildChannel) -> bool {
    is_thread_kind(channel.kind, channel.thread_metadata.is_some())
}

/// Whether `player` still needs a seat at the guild's table
pub fn needs_seat(registry: &SessionRegistry, guild_id: &str, player_id: &str) -> bool {
    !registry.game_has_player(guild_id, player_id)
}

/// Whether the channel is a thread. Lookup failures count as "don't touch it".
pub async fn channel_is_thread(ctx: &Context, channel_id: ChannelId) -> bool {
    match channel_id.to_channel(ctx).await {
        Ok(Channel::Guild(channel)) => is_thread(&channel),
        Ok(_) => false,
        Err(e) => {
            warn!("Failed to look up channel {}: {}", channel_id, e);
            true
        }
    }
}

/// Give `player` a seat at the guild's table, opening the table if needed.
///
/// Returns `None` when the player was already seated, including when a
/// concurrent request seated them first. A failure after the thread exists
/// deletes the thread and frees the seat again, so the player can retry.
pub async fn take_seat(
    ctx: &Context,
    data: &Data,
    guild_id: GuildId,
    origin: ThreadOrigin,
    player: UserId,
) -> Result<Option<Seating>> {
    let guild_key = guild_id.to_string();
    let player_key = player.to_string();

    if !needs_seat(&data.registry, &guild_key, &player_key) {
        debug!("{} is already seated in guild {}", player, guild_id);
        return Ok(None);
    }

    let thread = open_thread(ctx, data, origin).await?;

    let header = match discord_create(&data.retry, "send table header", || {
        thread.id.send_message(
            ctx,
            CreateMessage::new().content(header_content([player_key.as_str()])),
        )
    })
    .await
    {
        Ok(header) => header,
        Err(e) => {
            discard_thread(ctx, thread.id).await;
            return Err(e.into());
        }
    };

    let seating = match data.registry.seat_player(
        &guild_key,
        &player_key,
        &thread.id.to_string(),
        &header.id.to_string(),
    ) {
        Ok(seating) => seating,
        Err(e @ bj_core::Error::AlreadyJoined { .. }) => {
            warn!("{}; discarding thread {}", e, thread.id);
            discard_thread(ctx, thread.id).await;
            return Ok(None);
        }
        Err(e) => {
            discard_thread(ctx, thread.id).await;
            return Err(e.into());
        }
    };

    info!(
        "{} took a seat in guild {} ({:?}, thread {})",
        player, guild_id, seating, thread.id
    );

    let buttons = discord_create(&data.retry, "send table buttons", || {
        thread.id.send_message(
            ctx,
            CreateMessage::new()
                .content(MOVE_PROMPT)
                .components(table_buttons(false)),
        )
    })
    .await;
    if let Err(e) = buttons {
        data.registry.vacate_seat(&guild_key, &player_key);
        discard_thread(ctx, thread.id).await;
        return Err(e.into());
    }

    refresh_headers(ctx, data, guild_id).await;

    Ok(Some(seating))
}

/// Best-effort removal of a thread that never became a usable seat
async fn discard_thread(ctx: &Context, thread_id: ChannelId) {
    if let Err(e) = thread_id.delete(ctx).await {
        error!("Failed to delete abandoned thread {}: {}", thread_id, e);
    }
}

async fn open_thread(ctx: &Context, data: &Data, origin: ThreadOrigin) -> Result<GuildChannel> {
    let archive = archive_duration(data.table.auto_archive_minutes);
    let name = data.table.thread_name.as_str();
    let channel_id = origin.channel_id();

    let thread = match origin {
        ThreadOrigin::Channel(_) => {
            let builder = CreateThread::new(name)
                .kind(ChannelType::PublicThread)
                .auto_archive_duration(archive);
            discord_create(&data.retry, "create table thread", || {
                channel_id.create_thread(ctx, builder.clone())
            })
            .await?
        }
        ThreadOrigin::Message(_, message_id) => {
            let builder = CreateThread::new(name).auto_archive_duration(archive);
            discord_create(&data.retry, "create table thread", || {
                channel_id.create_thread_from_message(ctx, message_id, builder.clone())
            })
            .await?
        }
    };

    debug!("Opened thread {} in channel {}", thread.id, channel_id);
    Ok(thread)
}

/// Rewrite every seated player's header so it mentions the whole table.
///
/// Failures are logged per header; one stale header does not stop the rest.
pub async fn refresh_headers(ctx: &Context, data: &Data, guild_id: GuildId) {
    let Some(game) = data.registry.get_game(&guild_id.to_string()) else {
        return;
    };

    let content = header_content(game.seating_order());

    let edits = game.players.iter().map(|(player_id, seat)| {
        let content = content.clone();
        async move {
            let (Some(thread), Some(header)) = (
                parse_snowflake(&seat.thread_id),
                parse_snowflake(&seat.header_id),
            ) else {
                warn!("Seat of {} holds malformed ids", player_id);
                return;
            };
            let thread = ChannelId::new(thread);
            let header = MessageId::new(header);

            let result = discord_call(&data.retry, "edit table header", || {
                thread.edit_message(ctx, header, EditMessage::new().content(content.clone()))
            })
            .await;
            if let Err(e) = result {
                error!("Failed to refresh header for {}: {}", player_id, e);
            }
        }
    });

    join_all(edits).await;
}
