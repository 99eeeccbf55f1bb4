//! Action validation.
//!
//! Every [`GameAction`] is checked against the current state before the
//! engine touches anything. A failed check is not an error: it is a
//! [`Rejection`] value naming the broken rule, returned to the caller as
//! `Outcome::Rejected`.

use serde::{Deserialize, Serialize};

use crate::cards::{Card, CardInstance, CardRegistry, CardType};
use crate::continuous;
use crate::core::{GameAction, GameState, InstanceId, PlayerId};
use crate::effects::{AbilityKind, Cost, KeywordKind, Restriction};
use crate::triggers::{ConditionContext, ConditionEvaluator};
use crate::zones::Zone;

/// Why an action was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    /// A choice must be answered first.
    ChoicePending,
    /// No choice is outstanding.
    NoChoicePending,
    /// The response answers a different request.
    StaleChoice,
    /// The response does not fit the request.
    InvalidChoice,
    GameOver,
    NotYourTurn,
    WrongPhase,
    NotInHand,
    NotInPlay,
    NotEnoughInk,
    /// The card was played this turn.
    Dry,
    Exerted,
    InvalidTarget,
    /// Only Evasive or Alert characters can challenge this character.
    Evasive,
    /// A Bodyguard must be challenged first.
    Bodyguard,
    /// A Reckless character can still challenge.
    RecklessMustChallenge,
    AlreadyInked,
    NotInkable,
    /// An active restriction forbids the action.
    Restricted,
    NoSuchAbility,
    ConditionNotMet,
    /// The singers cannot pay for the song.
    CannotSing,
    /// The acting seat is not part of this game.
    UnknownPlayer,
}

/// A refused action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub reason: RejectReason,
    pub message: String,
}

impl Rejection {
    pub fn new(reason: RejectReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.reason, self.message)
    }
}

type Check = std::result::Result<(), Rejection>;

fn reject(reason: RejectReason, message: impl Into<String>) -> Check {
    Err(Rejection::new(reason, message))
}

/// Read-only view used by the checks.
struct View<'a> {
    state: &'a GameState,
    cards: &'a CardRegistry,
}

impl<'a> View<'a> {
    fn instance(&self, id: InstanceId) -> Result<&'a CardInstance, Rejection> {
        self.state.instance(id).ok_or_else(|| {
            Rejection::new(RejectReason::InvalidTarget, format!("unknown card {id}"))
        })
    }

    fn card(&self, instance: &CardInstance) -> Result<&'a Card, Rejection> {
        self.cards.get(instance.card).ok_or_else(|| {
            Rejection::new(
                RejectReason::InvalidTarget,
                format!("unknown card {}", instance.card),
            )
        })
    }

    fn card_type(&self, id: InstanceId) -> Option<CardType> {
        self.state
            .instance(id)
            .and_then(|c| self.cards.get(c.card))
            .map(|c| c.card_type)
    }

    /// An instance the player owns in the given zone.
    fn own(
        &self,
        player: PlayerId,
        id: InstanceId,
        zone: Zone,
    ) -> Result<&'a CardInstance, Rejection> {
        let instance = self.instance(id)?;
        if instance.owner != player || instance.zone != zone {
            let reason = match zone {
                Zone::Hand => RejectReason::NotInHand,
                _ => RejectReason::NotInPlay,
            };
            return Err(Rejection::new(reason, format!("{id} is not in your {zone}")));
        }
        Ok(instance)
    }

    fn own_character(
        &self,
        player: PlayerId,
        id: InstanceId,
    ) -> Result<&'a CardInstance, Rejection> {
        let instance = self.own(player, id, Zone::Play)?;
        if self.card(instance)?.card_type != CardType::Character {
            return Err(Rejection::new(
                RejectReason::InvalidTarget,
                format!("{id} is not a character"),
            ));
        }
        Ok(instance)
    }

    /// Ready and dry, or Rush when challenging.
    fn can_act(&self, instance: &CardInstance, challenging: bool) -> Check {
        if instance.exerted {
            return reject(RejectReason::Exerted, format!("{} is exerted", instance.id));
        }
        let rushing = challenging && instance.has_keyword(KeywordKind::Rush);
        if instance.is_drying(self.state.turn) && !rushing {
            return reject(RejectReason::Dry, format!("{} was played this turn", instance.id));
        }
        Ok(())
    }
}

/// Check an action against the state.
pub fn validate(state: &GameState, cards: &CardRegistry, action: &GameAction) -> Check {
    let view = View { state, cards };
    let player = action.player();

    if state.is_over() {
        return reject(RejectReason::GameOver, "the game is over");
    }
    if player.index() >= state.player_count() {
        return reject(RejectReason::UnknownPlayer, format!("{player} is not in this game"));
    }
    if matches!(action, GameAction::Concede { .. }) {
        return Ok(());
    }
    if player != state.active_player {
        return reject(RejectReason::NotYourTurn, format!("it is {}'s turn", state.active_player));
    }
    if !state.phase.accepts_actions() {
        return reject(
            RejectReason::WrongPhase,
            format!("no actions during the {} phase", state.phase),
        );
    }

    match action {
        GameAction::PlayCard { card, shift_onto, .. } => {
            check_play(&view, player, *card, *shift_onto)
        }
        GameAction::Quest { character, .. } => check_quest(&view, player, *character),
        GameAction::Challenge { attacker, defender, .. } => {
            check_challenge(&view, player, *attacker, *defender)
        }
        GameAction::UseAbility { card, ability, .. } => {
            check_ability(&view, player, *card, *ability)
        }
        GameAction::InkCard { card, .. } => check_ink(&view, player, *card),
        GameAction::SingSong { song, singers, .. } => check_sing(&view, player, *song, singers),
        GameAction::PassTurn { .. } => check_pass(&view, player),
        GameAction::Move { character, location, .. } => {
            check_move(&view, player, *character, *location)
        }
        GameAction::Concede { .. } => Ok(()),
    }
}

/// Ink needed to play a card, after reductions. Shift uses the Shift
/// value instead of the printed cost.
#[must_use]
pub fn play_cost(
    state: &GameState,
    cards: &CardRegistry,
    player: PlayerId,
    card: InstanceId,
    shift: bool,
) -> Option<u32> {
    let instance = state.instance(card)?;
    let definition = cards.get(instance.card)?;
    let base = if shift {
        shift_value(cards, instance)?
    } else {
        definition.cost
    };
    Some(continuous::effective_cost(state, cards, player, card, base))
}

/// Printed Shift value of a card, read from its compiled abilities so
/// cards in hand qualify.
fn shift_value(cards: &CardRegistry, instance: &CardInstance) -> Option<u32> {
    cards
        .abilities(instance.card)
        .iter()
        .filter_map(|a| a.as_keyword())
        .find(|k| k.kind == KeywordKind::Shift)
        .map(|k| k.value.max(0) as u32)
}

fn check_play(
    view: &View<'_>,
    player: PlayerId,
    card: InstanceId,
    shift_onto: Option<InstanceId>,
) -> Check {
    let instance = view.own(player, card, Zone::Hand)?;
    let definition = view.card(instance)?;

    if let Some(base) = shift_onto {
        let target = view.own_character(player, base)?;
        if shift_value(view.cards, instance).is_none() {
            return reject(RejectReason::InvalidTarget, format!("{} has no Shift", definition.name));
        }
        let base_name = &view.card(target)?.name;
        if !base_name.eq_ignore_ascii_case(&definition.name) {
            return reject(
                RejectReason::InvalidTarget,
                "Shift needs a character with the same name",
            );
        }
    }

    let cost = play_cost(view.state, view.cards, player, card, shift_onto.is_some())
        .unwrap_or(definition.cost);
    let ink = view.state.available_ink(player);
    if ink < cost {
        return reject(RejectReason::NotEnoughInk, format!("costs {cost}, {ink} ink available"));
    }
    Ok(())
}

fn check_quest(view: &View<'_>, player: PlayerId, character: InstanceId) -> Check {
    let instance = view.own_character(player, character)?;
    view.can_act(instance, false)?;
    if instance.is_restricted(Restriction::CantQuest)
        || instance.has_keyword(KeywordKind::Reckless)
    {
        return reject(RejectReason::Restricted, format!("{character} can't quest"));
    }
    Ok(())
}

/// Defender-side legality for one attacker, ignoring Bodyguard.
fn defender_ok(view: &View<'_>, attacker: &CardInstance, defender: &CardInstance) -> Check {
    if defender.owner == attacker.owner || !defender.in_play() {
        return reject(
            RejectReason::InvalidTarget,
            format!("{} is not an opposing card in play", defender.id),
        );
    }
    match view.card(defender)?.card_type {
        CardType::Location => {}
        CardType::Character => {
            if !defender.exerted {
                return reject(
                    RejectReason::InvalidTarget,
                    format!("{} is not exerted", defender.id),
                );
            }
            if defender.has_keyword(KeywordKind::Evasive)
                && !attacker.has_keyword(KeywordKind::Evasive)
                && !attacker.has_keyword(KeywordKind::Alert)
            {
                return reject(RejectReason::Evasive, format!("{} has Evasive", defender.id));
            }
        }
        _ => {
            return reject(
                RejectReason::InvalidTarget,
                "only characters and locations can be challenged",
            )
        }
    }
    if defender.is_restricted(Restriction::CantBeChallenged) {
        return reject(RejectReason::Restricted, format!("{} can't be challenged", defender.id));
    }
    Ok(())
}

fn check_challenge(
    view: &View<'_>,
    player: PlayerId,
    attacker: InstanceId,
    defender: InstanceId,
) -> Check {
    let attacking = view.own_character(player, attacker)?;
    view.can_act(attacking, true)?;
    if attacking.is_restricted(Restriction::CantChallenge) {
        return reject(RejectReason::Restricted, format!("{attacker} can't challenge"));
    }
    let defending = view.instance(defender)?;
    defender_ok(view, attacking, defending)?;

    let is_character = view.card_type(defender) == Some(CardType::Character);
    if is_character && !defending.has_keyword(KeywordKind::Bodyguard) {
        let guard = view
            .state
            .cards_in(defending.owner, Zone::Play)
            .into_iter()
            .filter_map(|id| view.state.instance(id))
            .find(|c| {
                c.has_keyword(KeywordKind::Bodyguard) && defender_ok(view, attacking, c).is_ok()
            });
        if let Some(guard) = guard {
            return reject(
                RejectReason::Bodyguard,
                format!("{} must be challenged first", guard.id),
            );
        }
    }
    Ok(())
}

fn check_ability(view: &View<'_>, player: PlayerId, card: InstanceId, index: usize) -> Check {
    let instance = view.own(player, card, Zone::Play)?;
    let Some(ability) = view.cards.abilities(instance.card).get(index) else {
        return reject(RejectReason::NoSuchAbility, format!("{card} has no ability {index}"));
    };
    let AbilityKind::Activated { costs } = &ability.kind else {
        return reject(
            RejectReason::NoSuchAbility,
            format!("ability {index} of {card} is not activated"),
        );
    };

    let is_character = view.card_type(card) == Some(CardType::Character);
    for cost in costs {
        match cost {
            Cost::Exert => {
                if instance.exerted {
                    return reject(RejectReason::Exerted, format!("{card} is exerted"));
                }
                if is_character && instance.is_drying(view.state.turn) {
                    return reject(RejectReason::Dry, format!("{card} was played this turn"));
                }
            }
            Cost::Ink(n) => {
                let ink = view.state.available_ink(player);
                if ink < *n {
                    return reject(
                        RejectReason::NotEnoughInk,
                        format!("costs {n}, {ink} ink available"),
                    );
                }
            }
            Cost::Discard(n) => {
                if view.state.zone_size(player, Zone::Hand) < *n as usize {
                    return reject(RejectReason::NotInHand, format!("need {n} card(s) to discard"));
                }
            }
            Cost::BanishSelf => {}
        }
    }

    let cctx = ConditionContext::new(view.state, view.cards, player).with_source(Some(card));
    if !ConditionEvaluator::evaluate(&ability.condition, &cctx) {
        return reject(RejectReason::ConditionNotMet, "the ability's condition does not hold");
    }
    Ok(())
}

fn check_ink(view: &View<'_>, player: PlayerId, card: InstanceId) -> Check {
    let instance = view.own(player, card, Zone::Hand)?;
    if view.state.players[player].inked_this_turn {
        return reject(RejectReason::AlreadyInked, "already inked a card this turn");
    }
    if !view.card(instance)?.inkable {
        return reject(RejectReason::NotInkable, format!("{card} has no inkwell symbol"));
    }
    Ok(())
}

/// Cost a character counts as when singing.
#[must_use]
pub fn singer_value(cards: &CardRegistry, singer: &CardInstance) -> u32 {
    let printed = cards.get(singer.card).map_or(0, |c| c.cost);
    let keywords = &singer.derived.keywords;
    let singer_keyword = keywords.max_value(KeywordKind::Singer).unwrap_or(0).max(0) as u32;
    printed.max(singer_keyword)
}

fn check_sing(
    view: &View<'_>,
    player: PlayerId,
    song: InstanceId,
    singers: &[InstanceId],
) -> Check {
    let instance = view.own(player, song, Zone::Hand)?;
    let definition = view.card(instance)?;
    if definition.card_type != CardType::Song {
        return reject(RejectReason::InvalidTarget, format!("{} is not a song", definition.name));
    }
    if singers.is_empty() {
        return reject(RejectReason::CannotSing, "no singers");
    }

    let mut total = 0;
    for (i, singer) in singers.iter().enumerate() {
        if singers[..i].contains(singer) {
            return reject(RejectReason::InvalidTarget, format!("{singer} listed twice"));
        }
        let character = view.own_character(player, *singer)?;
        view.can_act(character, false)?;
        if character.is_restricted(Restriction::CantSing) {
            return reject(RejectReason::Restricted, format!("{singer} can't sing"));
        }
        total += singer_value(view.cards, character);
    }

    if singers.len() == 1 {
        if total < definition.cost {
            return reject(
                RejectReason::CannotSing,
                format!("singer counts as {total}, song costs {}", definition.cost),
            );
        }
        return Ok(());
    }

    let together = view
        .cards
        .abilities(definition.id)
        .iter()
        .filter_map(|a| a.as_keyword())
        .find(|k| k.kind == KeywordKind::SingTogether);
    match together {
        Some(keyword) if total >= keyword.value.max(0) as u32 => Ok(()),
        Some(keyword) => reject(
            RejectReason::CannotSing,
            format!("singers total {total}, Sing Together needs {}", keyword.value),
        ),
        None => reject(RejectReason::CannotSing, "only Sing Together songs take several singers"),
    }
}

fn check_pass(view: &View<'_>, player: PlayerId) -> Check {
    for id in view.state.cards_in(player, Zone::Play) {
        let Some(attacker) = view.state.instance(id) else {
            continue;
        };
        if !attacker.has_keyword(KeywordKind::Reckless) {
            continue;
        }
        let could_challenge = view
            .state
            .cards_in(player.opponent(), Zone::Play)
            .into_iter()
            .any(|defender| check_challenge(view, player, id, defender).is_ok());
        if could_challenge {
            return reject(
                RejectReason::RecklessMustChallenge,
                format!("{id} is Reckless and can challenge"),
            );
        }
    }
    Ok(())
}

fn check_move(
    view: &View<'_>,
    player: PlayerId,
    character: InstanceId,
    location: InstanceId,
) -> Check {
    let instance = view.own_character(player, character)?;
    let place = view.own(player, location, Zone::Play)?;
    let definition = view.card(place)?;
    if definition.card_type != CardType::Location {
        return reject(RejectReason::InvalidTarget, format!("{location} is not a location"));
    }
    if instance.location == Some(location) {
        return reject(RejectReason::InvalidTarget, format!("{character} is already there"));
    }
    if instance.is_restricted(Restriction::CantMove) {
        return reject(RejectReason::Restricted, format!("{character} can't move"));
    }
    let cost = definition.move_cost.unwrap_or(0);
    let ink = view.state.available_ink(player);
    if ink < cost {
        return reject(
            RejectReason::NotEnoughInk,
            format!("moving costs {cost}, {ink} ink available"),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardId;
    use crate::core::RulesConfig;
    use crate::rules::Phase;
    use crate::zones::ZonePosition;

    struct Table {
        state: GameState,
        cards: CardRegistry,
    }

    impl Table {
        fn new() -> Self {
            let mut cards = CardRegistry::new();
            cards.register(Card::character(CardId::new(1), "Mulan", 3).with_stats(3, 3, 1));
            cards.register(
                Card::character(CardId::new(2), "Mushu", 2)
                    .with_stats(1, 2, 1)
                    .with_ability("Bodyguard"),
            );
            cards.register(
                Card::character(CardId::new(3), "Cri-Kee", 1)
                    .with_stats(1, 1, 1)
                    .with_ability("Evasive"),
            );
            cards.register(
                Card::character(CardId::new(4), "Shan Yu", 5)
                    .with_stats(5, 5, 1)
                    .with_ability("Reckless"),
            );
            cards.register(Card::song(CardId::new(5), "Reflection", 3));
            cards.register(Card::item(CardId::new(6), "Sword", 1).uninkable());
            let mut state = GameState::new(&RulesConfig::default(), 1);
            state.turn = 3;
            state.phase = Phase::Main;
            Self { state, cards }
        }

        fn add(&mut self, card: u32, owner: u8, zone: Zone) -> InstanceId {
            let card = self.cards.get(CardId::new(card)).unwrap().clone();
            let id = self
                .state
                .spawn(&card, PlayerId::new(owner), zone, ZonePosition::Top)
                .unwrap();
            self.state.instance_mut(id).unwrap().turn_played = Some(1);
            continuous::recompute(&mut self.state, &self.cards);
            id
        }

        fn check(&self, action: GameAction) -> Check {
            validate(&self.state, &self.cards, &action)
        }
    }

    fn reason(check: Check) -> RejectReason {
        check.unwrap_err().reason
    }

    const P0: PlayerId = PlayerId::new(0);
    const P1: PlayerId = PlayerId::new(1);

    #[test]
    fn test_turn_and_phase() {
        let mut table = Table::new();
        let mulan = table.add(1, 1, Zone::Play);
        assert_eq!(reason(table.check(GameAction::quest(P1, mulan))), RejectReason::NotYourTurn);

        table.state.phase = Phase::Draw;
        let mulan0 = table.add(1, 0, Zone::Play);
        assert_eq!(reason(table.check(GameAction::quest(P0, mulan0))), RejectReason::WrongPhase);
        assert!(table.check(GameAction::Concede { player: P1 }).is_ok());
    }

    #[test]
    fn test_unknown_seat_is_rejected() {
        let table = Table::new();
        let stranger = PlayerId::new(5);
        assert_eq!(
            reason(table.check(GameAction::Concede { player: stranger })),
            RejectReason::UnknownPlayer
        );
        assert_eq!(
            reason(table.check(GameAction::PassTurn { player: stranger })),
            RejectReason::UnknownPlayer
        );
    }

    #[test]
    fn test_quest_needs_dry_ready_character() {
        let mut table = Table::new();
        let mulan = table.add(1, 0, Zone::Play);
        assert!(table.check(GameAction::quest(P0, mulan)).is_ok());

        table.state.instance_mut(mulan).unwrap().turn_played = Some(3);
        assert_eq!(reason(table.check(GameAction::quest(P0, mulan))), RejectReason::Dry);

        table.state.instance_mut(mulan).unwrap().turn_played = Some(1);
        table.state.instance_mut(mulan).unwrap().exerted = true;
        assert_eq!(reason(table.check(GameAction::quest(P0, mulan))), RejectReason::Exerted);
    }

    #[test]
    fn test_play_needs_ink() {
        let mut table = Table::new();
        let mulan = table.add(1, 0, Zone::Hand);
        assert_eq!(reason(table.check(GameAction::play(P0, mulan))), RejectReason::NotEnoughInk);
        for _ in 0..3 {
            table.add(6, 0, Zone::Inkwell);
        }
        assert!(table.check(GameAction::play(P0, mulan)).is_ok());
    }

    #[test]
    fn test_challenge_rules() {
        let mut table = Table::new();
        let mulan = table.add(1, 0, Zone::Play);
        let mushu = table.add(2, 1, Zone::Play);
        let cri_kee = table.add(3, 1, Zone::Play);
        let other = table.add(1, 1, Zone::Play);

        let challenge = |defender| GameAction::challenge(P0, mulan, defender);
        assert_eq!(reason(table.check(challenge(other))), RejectReason::InvalidTarget);

        table.state.instance_mut(cri_kee).unwrap().exerted = true;
        assert_eq!(reason(table.check(challenge(cri_kee))), RejectReason::Evasive);

        table.state.instance_mut(other).unwrap().exerted = true;
        table.state.instance_mut(mushu).unwrap().exerted = true;
        assert_eq!(reason(table.check(challenge(other))), RejectReason::Bodyguard);
        assert!(table.check(challenge(mushu)).is_ok());
    }

    #[test]
    fn test_reckless_must_challenge() {
        let mut table = Table::new();
        let shan_yu = table.add(4, 0, Zone::Play);
        assert_eq!(reason(table.check(GameAction::quest(P0, shan_yu))), RejectReason::Restricted);
        assert!(table.check(GameAction::PassTurn { player: P0 }).is_ok());

        let target = table.add(1, 1, Zone::Play);
        table.state.instance_mut(target).unwrap().exerted = true;
        assert_eq!(
            reason(table.check(GameAction::PassTurn { player: P0 })),
            RejectReason::RecklessMustChallenge
        );
    }

    #[test]
    fn test_ink_rules() {
        let mut table = Table::new();
        let sword = table.add(6, 0, Zone::Hand);
        let mulan = table.add(1, 0, Zone::Hand);
        assert_eq!(reason(table.check(GameAction::ink(P0, sword))), RejectReason::NotInkable);
        assert!(table.check(GameAction::ink(P0, mulan)).is_ok());

        table.state.players[P0].inked_this_turn = true;
        assert_eq!(reason(table.check(GameAction::ink(P0, mulan))), RejectReason::AlreadyInked);
    }

    #[test]
    fn test_singing() {
        let mut table = Table::new();
        let song = table.add(5, 0, Zone::Hand);
        let mushu = table.add(2, 0, Zone::Play);
        let mulan = table.add(1, 0, Zone::Play);
        assert_eq!(
            reason(table.check(GameAction::sing(P0, song, mushu))),
            RejectReason::CannotSing
        );
        assert!(table.check(GameAction::sing(P0, song, mulan)).is_ok());
    }
}
