//! Primitive game mutations.
//!
//! Everything that moves a card, changes damage or lore, or exerts and
//! readies goes through these functions so that the matching
//! [`GameEvent`] is always emitted. The turn manager and the effect
//! executor share them.
//!
//! Events are appended to the caller's buffer in the order the changes
//! happen; the engine dispatches them to the trigger registry after the
//! current step finishes.

use tracing::{debug, trace};

use crate::cards::CardRegistry;
use crate::continuous;
use crate::core::{GameState, InstanceId, PlayerId, RulesConfig};
use crate::effects::KeywordKind;
use crate::error::Result;
use crate::triggers::{EventKind, GameEvent};
use crate::zones::{Zone, ZoneKey, ZonePosition};

use super::engine::{GameResult, WinReason};

// === Drawing and zone changes ===

/// Draw up to `count` cards from the top of a player's deck. Returns how
/// many were drawn; an empty deck draws nothing.
pub fn draw(
    state: &mut GameState,
    player: PlayerId,
    count: u32,
    events: &mut Vec<GameEvent>,
) -> Result<u32> {
    let deck = ZoneKey::new(player, Zone::Deck);
    let mut drawn = 0;
    for _ in 0..count {
        let Some(card) = state.zones.top_card(deck) else {
            debug!(%player, "draw from empty deck");
            break;
        };
        state.move_card(card, Zone::Hand, ZonePosition::Top)?;
        events.push(GameEvent::new(EventKind::CardDrawn).with_subject(card).with_player(player));
        drawn += 1;
    }
    Ok(drawn)
}

/// Put a card into play from any zone.
pub fn enter_play(
    state: &mut GameState,
    card: InstanceId,
    player: PlayerId,
    events: &mut Vec<GameEvent>,
) -> Result<()> {
    state.move_card(card, Zone::Play, ZonePosition::Top)?;
    events.push(GameEvent::played(card, player));
    Ok(())
}

/// Discard a card from hand.
pub fn discard(state: &mut GameState, card: InstanceId, events: &mut Vec<GameEvent>) -> Result<()> {
    let owner = state.try_instance(card)?.owner;
    state.move_card(card, Zone::Discard, ZonePosition::Top)?;
    events.push(GameEvent::new(EventKind::Discarded).with_subject(card).with_player(owner));
    Ok(())
}

/// Cards underneath a shifted character follow it out of play.
fn release_beneath(state: &mut GameState, card: InstanceId, zone: Zone) -> Result<()> {
    let beneath = std::mem::take(&mut state.try_instance_mut(card)?.beneath);
    for under in beneath {
        state.move_card(under, zone, ZonePosition::Top)?;
    }
    Ok(())
}

/// Remove a card from play into its owner's discard.
///
/// Returns false if the card was not in play.
pub fn banish(
    state: &mut GameState,
    card: InstanceId,
    events: &mut Vec<GameEvent>,
) -> Result<bool> {
    banish_with(state, card, None, events)
}

fn banish_with(
    state: &mut GameState,
    card: InstanceId,
    challenger: Option<InstanceId>,
    events: &mut Vec<GameEvent>,
) -> Result<bool> {
    let instance = state.try_instance(card)?;
    if !instance.in_play() {
        return Ok(false);
    }
    let owner = instance.owner;

    release_beneath(state, card, Zone::Discard)?;
    state.move_card(card, Zone::Discard, ZonePosition::Top)?;
    continuous::remove_for_source(state, card);
    debug!(%card, %owner, in_challenge = challenger.is_some(), "banished");

    events.push(GameEvent::banished(card, owner));
    if let Some(other) = challenger {
        events.push(
            GameEvent::new(EventKind::BanishedInChallenge)
                .with_subject(card)
                .with_actor(other)
                .with_player(owner),
        );
    }
    Ok(true)
}

/// Return a card in play to its owner's hand.
pub fn return_to_hand(
    state: &mut GameState,
    card: InstanceId,
    events: &mut Vec<GameEvent>,
) -> Result<()> {
    let instance = state.try_instance(card)?;
    let owner = instance.owner;
    let was_in_play = instance.in_play();

    if was_in_play {
        release_beneath(state, card, Zone::Hand)?;
    }
    state.move_card(card, Zone::Hand, ZonePosition::Top)?;
    if was_in_play {
        continuous::remove_for_source(state, card);
    }
    events.push(GameEvent::new(EventKind::ReturnedToHand).with_subject(card).with_player(owner));
    Ok(())
}

/// Put a card into its owner's inkwell.
pub fn put_into_inkwell(
    state: &mut GameState,
    card: InstanceId,
    exerted: bool,
    events: &mut Vec<GameEvent>,
) -> Result<()> {
    let instance = state.try_instance(card)?;
    let owner = instance.owner;
    if instance.in_play() {
        release_beneath(state, card, Zone::Discard)?;
        continuous::remove_for_source(state, card);
    }
    state.move_card(card, Zone::Inkwell, ZonePosition::Top)?;
    state.try_instance_mut(card)?.exerted = exerted;
    events.push(GameEvent::new(EventKind::CardInked).with_subject(card).with_player(owner));
    Ok(())
}

// === Readiness ===

/// Exert a card. No event if it was already exerted.
pub fn exert(state: &mut GameState, card: InstanceId, events: &mut Vec<GameEvent>) -> Result<()> {
    let instance = state.try_instance_mut(card)?;
    if instance.exerted {
        return Ok(());
    }
    instance.exerted = true;
    let owner = instance.owner;
    events.push(GameEvent::new(EventKind::Exerted).with_subject(card).with_player(owner));
    Ok(())
}

/// Ready a card. No event if it was already ready.
pub fn ready(state: &mut GameState, card: InstanceId, events: &mut Vec<GameEvent>) -> Result<()> {
    let instance = state.try_instance_mut(card)?;
    if !instance.exerted {
        return Ok(());
    }
    instance.exerted = false;
    let owner = instance.owner;
    events.push(GameEvent::new(EventKind::Readied).with_subject(card).with_player(owner));
    Ok(())
}

// === Damage ===

/// Deal damage to a card in play. Resist reduces it; challenge damage is
/// ignored by cards immune to it. Returns the damage actually dealt.
pub fn deal_damage(
    state: &mut GameState,
    target: InstanceId,
    amount: u32,
    source: Option<InstanceId>,
    in_challenge: bool,
    events: &mut Vec<GameEvent>,
) -> Result<u32> {
    let instance = state.try_instance_mut(target)?;
    if !instance.in_play() {
        return Ok(0);
    }
    if in_challenge && instance.derived.challenge_damage_immune {
        trace!(%target, "challenge damage prevented");
        return Ok(0);
    }
    let resist = instance.keyword_total(KeywordKind::Resist).max(0) as u32;
    let dealt = amount.saturating_sub(resist);
    if dealt == 0 {
        return Ok(0);
    }
    instance.damage += dealt;
    trace!(%target, dealt, total = instance.damage, "damage dealt");
    events.push(GameEvent::damage(target, source, dealt as i32));
    Ok(dealt)
}

/// Remove up to `amount` damage. Returns how much was removed.
pub fn remove_damage(
    state: &mut GameState,
    target: InstanceId,
    amount: u32,
    events: &mut Vec<GameEvent>,
) -> Result<u32> {
    let instance = state.try_instance_mut(target)?;
    let removed = amount.min(instance.damage);
    if removed == 0 {
        return Ok(0);
    }
    instance.damage -= removed;
    events.push(
        GameEvent::new(EventKind::DamageRemoved)
            .with_subject(target)
            .with_amount(removed as i32),
    );
    Ok(removed)
}

// === Lore ===

/// Give a player lore.
pub fn gain_lore(
    state: &mut GameState,
    player: PlayerId,
    amount: u32,
    events: &mut Vec<GameEvent>,
) {
    if amount == 0 {
        return;
    }
    state.players[player].gain_lore(amount);
    events.push(GameEvent::turn(EventKind::LoreGained, player).with_amount(amount as i32));
}

/// Take lore from a player, never below zero. Returns how much was lost.
pub fn lose_lore(state: &mut GameState, player: PlayerId, amount: u32) -> u32 {
    state.players[player].lose_lore(amount)
}

// === Questing and challenging ===

/// Exert a character and gain its lore.
pub fn quest(
    state: &mut GameState,
    character: InstanceId,
    events: &mut Vec<GameEvent>,
) -> Result<u32> {
    let instance = state.try_instance_mut(character)?;
    instance.exerted = true;
    let owner = instance.owner;
    let lore = instance.lore().max(0) as u32;

    events.push(GameEvent::quested(character, owner, lore as i32));
    gain_lore(state, owner, lore, events);
    Ok(lore)
}

/// Exert the attacker and exchange damage with the defender.
///
/// Locations deal no damage back. Challenger adds to the attacker's
/// damage. Combatants left with lethal damage are banished in the
/// challenge, defender first.
pub fn challenge(
    state: &mut GameState,
    cards: &CardRegistry,
    attacker: InstanceId,
    defender: InstanceId,
    events: &mut Vec<GameEvent>,
) -> Result<()> {
    let attacking = state.try_instance_mut(attacker)?;
    attacking.exerted = true;
    let player = attacking.owner;
    let challenger = attacking.keyword_total(KeywordKind::Challenger);
    let dealt = (attacking.strength() + challenger).max(0) as u32;

    let defending = state.try_instance(defender)?;
    let is_location = cards
        .get(defending.card)
        .is_some_and(|card| card.card_type == crate::cards::CardType::Location);
    let returned = if is_location {
        0
    } else {
        defending.strength().max(0) as u32
    };

    events.push(GameEvent::challenged(attacker, defender, player));
    deal_damage(state, defender, dealt, Some(attacker), true, events)?;
    deal_damage(state, attacker, returned, Some(defender), true, events)?;

    for (card, other) in [(defender, attacker), (attacker, defender)] {
        if state.try_instance(card)?.is_lethally_damaged() {
            banish_with(state, card, Some(other), events)?;
        }
    }
    Ok(())
}

// === State checks ===

/// Banish every card in play with damage at or above its willpower.
/// Returns how many were banished.
pub fn banish_lethal(state: &mut GameState, events: &mut Vec<GameEvent>) -> Result<usize> {
    let lethal: Vec<InstanceId> = state
        .instances()
        .filter(|c| c.in_play() && c.is_lethally_damaged())
        .map(|c| c.id)
        .collect();
    for card in &lethal {
        banish(state, *card, events)?;
    }
    Ok(lethal.len())
}

/// Decide the game if a player has reached the lore threshold.
#[must_use]
pub fn lore_winner(state: &GameState, config: &RulesConfig) -> Option<GameResult> {
    let winners: Vec<PlayerId> = state
        .players
        .iter()
        .filter(|(_, p)| p.lore >= config.lore_to_win)
        .map(|(id, _)| id)
        .collect();
    match winners.as_slice() {
        [] => None,
        [player] => Some(GameResult::Winner {
            player: *player,
            reason: WinReason::Lore,
        }),
        _ => Some(GameResult::Draw),
    }
}
