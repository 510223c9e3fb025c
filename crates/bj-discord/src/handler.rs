//! Discord event handler implementation using poise Framework

use serenity::all::{
    ComponentInteraction, Context, CreateInteractionResponse, CreateInteractionResponseMessage,
    FullEvent, Interaction, Message,
};
use tracing::{debug, error, info, warn};

use bj_core::action::WAITING_PROMPT;
use bj_core::{Error as CoreError, PlayerStatus, SessionRegistry, TableAction};

use crate::commands::Data;
use crate::error::{DiscordError, Result};
use crate::retry::discord_call;
use crate::table::{self, ThreadOrigin};

/// Text command recognised when the message trigger is enabled
const TEXT_TRIGGER: &str = "/blackjack";

/// Dispatch gateway events that are not slash commands
pub async fn event_handler(
    ctx: &Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, DiscordError>,
    data: &Data,
) -> Result<()> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            let guilds: Vec<String> = data_about_bot
                .guilds
                .iter()
                .map(|guild| guild.id.to_string())
                .collect();
            info!(
                "Connected as {} in {} guild(s): {:?}",
                data_about_bot.user.name,
                guilds.len(),
                guilds
            );
        }
        FullEvent::InteractionCreate {
            interaction: Interaction::Component(component),
        } => {
            handle_component(ctx, component, data).await?;
        }
        FullEvent::Message { new_message } if data.text_trigger => {
            handle_message(ctx, new_message, data).await?;
        }
        _ => {}
    }

    Ok(())
}

/// Whether a message asks for a table
pub fn is_trigger(content: &str) -> bool {
    content.split_whitespace().next() == Some(TEXT_TRIGGER)
}

/// What a Hit/Stand press did to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonOutcome {
    /// Pressed outside the presser's own thread; nothing changed
    NotYourSeat,
    /// Decision recorded over the previous status
    Recorded { previous: PlayerStatus },
    /// The table closed between the press and the update
    TableGone,
}

/// Whether `channel_id` is the thread of `player_id`'s seat
pub fn owns_seat(
    registry: &SessionRegistry,
    guild_id: &str,
    player_id: &str,
    channel_id: &str,
) -> bool {
    registry
        .get_thread(guild_id, player_id)
        .is_ok_and(|thread| thread == channel_id)
}

/// Record a declared decision. A vanished table or seat is not an error.
pub fn record_action(
    registry: &SessionRegistry,
    guild_id: &str,
    player_id: &str,
    action: TableAction,
) -> std::result::Result<ButtonOutcome, CoreError> {
    match registry.set_player_status(guild_id, player_id, action.player_status()) {
        Ok(previous) => Ok(ButtonOutcome::Recorded { previous }),
        Err(CoreError::GameNotFound(_) | CoreError::PlayerNotFound { .. }) => {
            Ok(ButtonOutcome::TableGone)
        }
        Err(e) => Err(e),
    }
}

/// Decide what a press of `action` in `channel_id` does
pub fn apply_action(
    registry: &SessionRegistry,
    guild_id: &str,
    player_id: &str,
    channel_id: &str,
    action: TableAction,
) -> std::result::Result<ButtonOutcome, CoreError> {
    if !owns_seat(registry, guild_id, player_id, channel_id) {
        return Ok(ButtonOutcome::NotYourSeat);
    }
    record_action(registry, guild_id, player_id, action)
}

/// Handle Hit/Stand button presses
async fn handle_component(
    ctx: &Context,
    component: &ComponentInteraction,
    data: &Data,
) -> Result<()> {
    let action: TableAction = match component.data.custom_id.parse() {
        Ok(action) => action,
        Err(e) => {
            debug!("Ignoring component interaction: {}", e);
            return Ok(());
        }
    };

    let Some(guild_id) = component.guild_id else {
        return Ok(());
    };
    let guild_key = guild_id.to_string();
    let player_key = component.user.id.to_string();

    let outcome = apply_action(
        &data.registry,
        &guild_key,
        &player_key,
        &component.channel_id.to_string(),
        action,
    )?;

    match outcome {
        ButtonOutcome::NotYourSeat => {
            debug!(
                "{} pressed {} outside their own seat in guild {}",
                component.user.id, action, guild_id
            );
            let response = CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content("These buttons belong to another player.")
                    .ephemeral(true),
            );
            if let Err(e) = component.create_response(ctx, response).await {
                warn!("Failed to answer foreign button press: {}", e);
            }
            return Ok(());
        }
        ButtonOutcome::Recorded { previous } => info!(
            "{} chose {} in guild {} (was {:?})",
            component.user.id, action, guild_id, previous
        ),
        ButtonOutcome::TableGone => {
            warn!(
                "Dropping {} from {}: no seat in guild {}",
                action, component.user.id, guild_id
            );
        }
    }

    let response = CreateInteractionResponse::UpdateMessage(
        CreateInteractionResponseMessage::new()
            .content(WAITING_PROMPT)
            .components(table::table_buttons(true)),
    );
    if let Err(e) = discord_call(&data.retry, "respond to table action", || {
        component.create_response(ctx, response.clone())
    })
    .await
    {
        error!("Failed responding to a component interaction: {}", e);
    }

    Ok(())
}

/// Plain-text `/blackjack` in a guild channel
async fn handle_message(ctx: &Context, msg: &Message, data: &Data) -> Result<()> {
    if msg.author.bot || !is_trigger(&msg.content) {
        return Ok(());
    }

    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };

    if table::channel_is_thread(ctx, msg.channel_id).await {
        debug!("Ignoring {} inside thread {}", TEXT_TRIGGER, msg.channel_id);
        return Ok(());
    }

    if let Err(e) = table::take_seat(
        ctx,
        data,
        guild_id,
        ThreadOrigin::Message(msg.channel_id, msg.id),
        msg.author.id,
    )
    .await
    {
        error!("Failed to seat {} in guild {}: {}", msg.author.id, guild_id, e);
    }

    Ok(())
}
