//! Ability resolution.
//!
//! Resolution is split in two: [`resolve_ability`] inspects a snapshot and
//! decides what a card does, [`apply_resolution`] folds that decision back
//! into a session. The session layer turns the same resolution into
//! per-field document writes instead of calling `apply_resolution`.

use std::fmt;

use super::model::{AbilityCard, Phase, PlayerId, Session, SystemMessage, SystemMessageKind};

/// Why a card play was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityRejection {
    /// Cards are only played during discussion.
    WrongPhase(Phase),
    /// The actor is not in the session.
    UnknownActor,
    /// The target is not in the session.
    UnknownTarget,
    /// The actor was dealt no card.
    NoCard,
    /// The actor already played their card this game.
    CardSpent,
    /// Eliminated players cannot act.
    ActorEliminated,
}

impl fmt::Display for AbilityRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongPhase(phase) => write!(f, "cards cannot be played during {phase}"),
            Self::UnknownActor => f.write_str("actor is not in the session"),
            Self::UnknownTarget => f.write_str("target is not in the session"),
            Self::NoCard => f.write_str("actor holds no card"),
            Self::CardSpent => f.write_str("card already used"),
            Self::ActorEliminated => f.write_str("actor is eliminated"),
        }
    }
}

/// Public RADAR verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanVerdict {
    /// Reads as a local.
    Safe,
    /// Reads as a spy, tourist, or joker.
    Threat,
}

impl ScanVerdict {
    fn from_threat(is_threat: bool) -> Self {
        if is_threat { Self::Threat } else { Self::Safe }
    }

    fn inverted(self) -> Self {
        match self {
            Self::Safe => Self::Threat,
            Self::Threat => Self::Safe,
        }
    }
}

impl fmt::Display for ScanVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Safe => "SAFE",
            Self::Threat => "THREAT",
        })
    }
}

/// Outcome of a RADAR scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Scanned player.
    pub target_id: PlayerId,
    /// Scanned player's display name at scan time.
    pub target_name: String,
    /// What the scan publicly reports.
    pub verdict: ScanVerdict,
    /// Whether an armed scramble trap inverted this scan.
    pub trap_consumed: bool,
}

/// What a card does to its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbilityEffect {
    /// RADAR result, broadcast to everyone.
    Scanned(ScanReport),
    /// SILENCER: the target's votes stop counting.
    Silenced,
    /// SPOOF: the target's next scan is inverted.
    Scrambled,
}

/// Everything a single card play changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilityResolution {
    /// Who played the card.
    pub actor_id: PlayerId,
    /// The card played.
    pub card: AbilityCard,
    /// Who it was played on.
    pub target_id: PlayerId,
    /// Effect on the target.
    pub effect: AbilityEffect,
    /// Public broadcast, RADAR only.
    pub message: Option<SystemMessage>,
}

/// Decides what `actor_id` playing their card on `target_id` does.
///
/// Self-targeting is allowed.
///
/// # Errors
///
/// Returns the [`AbilityRejection`] for the first precondition that fails;
/// callers treat it as a silent no-op.
pub fn resolve_ability(
    session: &Session,
    actor_id: &str,
    target_id: &str,
    now_millis: i64,
) -> Result<AbilityResolution, AbilityRejection> {
    if session.phase != Phase::Discussion {
        return Err(AbilityRejection::WrongPhase(session.phase));
    }
    let actor = session.player(actor_id).ok_or(AbilityRejection::UnknownActor)?;
    if !actor.is_active() {
        return Err(AbilityRejection::ActorEliminated);
    }
    let card = actor.ability_card.ok_or(AbilityRejection::NoCard)?;
    if actor.is_card_used {
        return Err(AbilityRejection::CardSpent);
    }
    let target = session
        .player(target_id)
        .ok_or(AbilityRejection::UnknownTarget)?;

    let (effect, message) = match card {
        AbilityCard::Radar => {
            let truth = ScanVerdict::from_threat(target.role.is_some_and(|r| r.is_threat()));
            let trap_consumed = target.scramble.is_armed();
            let verdict = if trap_consumed { truth.inverted() } else { truth };
            let message = SystemMessage {
                kind: SystemMessageKind::RadarResult,
                text: format!("SCAN RESULT: {} is confirmed {verdict}.", target.name),
                target_id: target.id.clone(),
                timestamp: now_millis,
            };
            let report = ScanReport {
                target_id: target.id.clone(),
                target_name: target.name.clone(),
                verdict,
                trap_consumed,
            };
            (AbilityEffect::Scanned(report), Some(message))
        }
        AbilityCard::Silencer => (AbilityEffect::Silenced, None),
        AbilityCard::Spoof => (AbilityEffect::Scrambled, None),
    };

    Ok(AbilityResolution {
        actor_id: actor.id.clone(),
        card,
        target_id: target.id.clone(),
        effect,
        message,
    })
}

/// Folds a resolution into `session`, filing any broadcast under
/// `message_key`.
pub fn apply_resolution(session: &mut Session, resolution: &AbilityResolution, message_key: &str) {
    if let Some(actor) = session.players.get_mut(&resolution.actor_id) {
        actor.is_card_used = true;
        actor.card_target_id = Some(resolution.target_id.clone());
    }
    if let Some(target) = session.players.get_mut(&resolution.target_id) {
        match &resolution.effect {
            AbilityEffect::Scanned(report) => {
                if report.trap_consumed {
                    target.scramble.consume();
                }
            }
            AbilityEffect::Silenced => target.is_silenced = true,
            AbilityEffect::Scrambled => target.scramble.arm(),
        }
    }
    if let Some(message) = &resolution.message {
        session
            .system_messages
            .insert(message_key.to_owned(), message.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Player, Role};

    const NOW: i64 = 1_768_471_200_000;

    fn discussion(roles: &[(&str, Role, Option<AbilityCard>)]) -> Session {
        let mut session = Session::new("ABCD", Player::new("host", "Host", true));
        session.players.clear();
        for (id, role, card) in roles {
            let mut player = Player::new(*id, id.to_uppercase(), *id == "host");
            player.role = Some(*role);
            player.ability_card = *card;
            session.players.insert((*id).to_owned(), player);
        }
        session.phase = Phase::Discussion;
        session
    }

    fn scan(session: &mut Session, actor: &str, target: &str) -> ScanReport {
        let resolution = resolve_ability(session, actor, target, NOW).unwrap();
        apply_resolution(session, &resolution, &format!("{actor}-scan"));
        match resolution.effect {
            AbilityEffect::Scanned(report) => report,
            other => panic!("expected a scan, got {other:?}"),
        }
    }

    #[test]
    fn test_radar_reports_truth_on_unscrambled_target() {
        let mut session = discussion(&[
            ("a", Role::Local, Some(AbilityCard::Radar)),
            ("b", Role::Local, Some(AbilityCard::Radar)),
            ("spy", Role::Spy, None),
            ("tourist", Role::Tourist, None),
        ]);

        assert_eq!(scan(&mut session, "a", "spy").verdict, ScanVerdict::Threat);
        assert_eq!(scan(&mut session, "b", "tourist").verdict, ScanVerdict::Threat);
    }

    #[test]
    fn test_radar_on_local_reports_safe_and_broadcasts() {
        let session = discussion(&[
            ("a", Role::Local, Some(AbilityCard::Radar)),
            ("b", Role::Local, None),
            ("spy", Role::Spy, None),
        ]);

        let resolution = resolve_ability(&session, "a", "b", NOW).unwrap();

        let message = resolution.message.unwrap();
        assert_eq!(message.text, "SCAN RESULT: B is confirmed SAFE.");
        assert_eq!(message.kind, SystemMessageKind::RadarResult);
        assert_eq!(message.target_id, "b");
        assert_eq!(message.timestamp, NOW);
    }

    #[test]
    fn test_scrambled_scan_is_inverted_once_then_truthful() {
        let mut session = discussion(&[
            ("spy", Role::Spy, Some(AbilityCard::Spoof)),
            ("a", Role::Local, Some(AbilityCard::Radar)),
            ("b", Role::Local, Some(AbilityCard::Radar)),
        ]);

        let spoof = resolve_ability(&session, "spy", "spy", NOW).unwrap();
        assert_eq!(spoof.effect, AbilityEffect::Scrambled);
        assert!(spoof.message.is_none());
        apply_resolution(&mut session, &spoof, "unused");
        assert!(session.players["spy"].scramble.is_armed());

        let first = scan(&mut session, "a", "spy");
        assert_eq!(first.verdict, ScanVerdict::Safe);
        assert!(first.trap_consumed);
        assert!(!session.players["spy"].scramble.is_armed());

        let second = scan(&mut session, "b", "spy");
        assert_eq!(second.verdict, ScanVerdict::Threat);
        assert!(!second.trap_consumed);
    }

    #[test]
    fn test_scrambled_local_reads_as_threat() {
        let mut session = discussion(&[
            ("joker", Role::Joker, Some(AbilityCard::Spoof)),
            ("a", Role::Local, Some(AbilityCard::Radar)),
            ("b", Role::Local, None),
        ]);
        let spoof = resolve_ability(&session, "joker", "b", NOW).unwrap();
        apply_resolution(&mut session, &spoof, "unused");

        let report = scan(&mut session, "a", "b");

        assert_eq!(report.verdict, ScanVerdict::Threat);
    }

    #[test]
    fn test_silencer_flags_target_without_broadcast() {
        let mut session = discussion(&[
            ("a", Role::Local, Some(AbilityCard::Silencer)),
            ("spy", Role::Spy, None),
            ("b", Role::Local, None),
        ]);

        let resolution = resolve_ability(&session, "a", "spy", NOW).unwrap();
        apply_resolution(&mut session, &resolution, "unused");

        assert!(session.players["spy"].is_silenced);
        assert!(session.players["a"].is_card_used);
        assert_eq!(session.players["a"].card_target_id.as_deref(), Some("spy"));
        assert!(session.system_messages.is_empty());
    }

    #[test]
    fn test_spent_card_is_rejected() {
        let mut session = discussion(&[
            ("a", Role::Local, Some(AbilityCard::Radar)),
            ("spy", Role::Spy, None),
            ("b", Role::Local, None),
        ]);
        scan(&mut session, "a", "b");

        let result = resolve_ability(&session, "a", "spy", NOW);

        assert_eq!(result, Err(AbilityRejection::CardSpent));
    }

    #[test]
    fn test_preconditions_reject_in_order() {
        let mut session = discussion(&[
            ("a", Role::Local, Some(AbilityCard::Radar)),
            ("b", Role::Local, None),
            ("spy", Role::Spy, None),
        ]);

        assert_eq!(
            resolve_ability(&session, "ghost", "b", NOW),
            Err(AbilityRejection::UnknownActor)
        );
        assert_eq!(
            resolve_ability(&session, "b", "a", NOW),
            Err(AbilityRejection::NoCard)
        );
        assert_eq!(
            resolve_ability(&session, "a", "ghost", NOW),
            Err(AbilityRejection::UnknownTarget)
        );

        session.players.get_mut("a").unwrap().is_eliminated = true;
        assert_eq!(
            resolve_ability(&session, "a", "b", NOW),
            Err(AbilityRejection::ActorEliminated)
        );

        session.phase = Phase::Voting;
        assert_eq!(
            resolve_ability(&session, "a", "b", NOW),
            Err(AbilityRejection::WrongPhase(Phase::Voting))
        );
    }
}
