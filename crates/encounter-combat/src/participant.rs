//! Encounter participants and initiative order.
//!
//! Participants are kept sorted by initiative (highest first, dexterity
//! modifier as tiebreaker). Re-sorting during combat keeps the turn pointer
//! on the participant it pointed at before.

use encounter_common::ParticipantId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::turn::CombatState;

/// Participant edit errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParticipantError {
    /// No participant with this ID
    #[error("participant not found: {0}")]
    NotFound(ParticipantId),
    /// Participant has no hit points tracked
    #[error("participant {0} does not track hit points")]
    UntrackedHitPoints(ParticipantId),
}

/// Result type for participant edits.
pub type ParticipantResult<T> = Result<T, ParticipantError>;

/// What kind of creature a participant is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ParticipantKind {
    /// Player character.
    #[default]
    Player,
    /// Non-player character.
    Npc,
    /// Hostile monster.
    Monster,
    /// Friendly creature controlled by the DM.
    Ally,
}

/// Hit point pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitPoints {
    /// Current hit points.
    pub current: i32,
    /// Maximum hit points.
    pub max: i32,
    /// Temporary hit points, spent before `current`.
    pub temporary: i32,
}

impl HitPoints {
    /// Full pool with no temporary hit points.
    #[must_use]
    pub const fn full(max: i32) -> Self {
        Self {
            current: max,
            max,
            temporary: 0,
        }
    }
}

/// A combatant in initiative order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Unique ID.
    pub id: ParticipantId,
    /// Display name.
    pub name: String,
    /// Creature kind.
    pub kind: ParticipantKind,
    /// Initiative roll.
    pub initiative: i32,
    /// Initiative tiebreaker.
    pub dexterity_modifier: i32,
    /// Tracked hit points, if any.
    pub hit_points: Option<HitPoints>,
    /// Defeated participants are skipped by turn advancement.
    pub defeated: bool,
}

impl Participant {
    /// Create a participant with a fresh ID.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ParticipantKind, initiative: i32) -> Self {
        Self {
            id: ParticipantId::new(),
            name: name.into(),
            kind,
            initiative,
            dexterity_modifier: 0,
            hit_points: None,
            defeated: false,
        }
    }

    /// Set the initiative tiebreaker.
    #[must_use]
    pub fn with_dexterity_modifier(mut self, modifier: i32) -> Self {
        self.dexterity_modifier = modifier;
        self
    }

    /// Track hit points starting at `max`.
    #[must_use]
    pub fn with_hit_points(mut self, max: i32) -> Self {
        self.hit_points = Some(HitPoints::full(max.max(1)));
        self
    }

    /// Whether this participant can take a turn.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        !self.defeated
    }
}

impl CombatState {
    /// Find a participant by ID.
    #[must_use]
    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    fn participant_mut(&mut self, id: ParticipantId) -> ParticipantResult<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(ParticipantError::NotFound(id))
    }

    /// Add a participant in initiative order.
    pub fn add_participant(&mut self, participant: Participant) -> ParticipantId {
        let id = participant.id;
        debug!(participant = %id, name = %participant.name, "Adding participant");
        self.participants.push(participant);
        self.sort_initiative();
        id
    }

    /// Remove a participant.
    ///
    /// Removing the current participant hands the turn to whoever followed them.
    /// This is a roster edit, not a turn move: when the removed participant was
    /// last in the order the pointer wraps to the top, but `round` and the
    /// round timer stay as they are. The new round starts on the next
    /// [`CombatState::advance_turn`].
    pub fn remove_participant(&mut self, id: ParticipantId) -> ParticipantResult<Participant> {
        let pos = self
            .participants
            .iter()
            .position(|p| p.id == id)
            .ok_or(ParticipantError::NotFound(id))?;

        let removed = self.participants.remove(pos);
        if pos < self.current_turn {
            self.current_turn -= 1;
        }
        if self.current_turn >= self.participants.len() {
            self.current_turn = 0;
        }
        debug!(participant = %id, "Removed participant");
        Ok(removed)
    }

    /// Change a participant's initiative and re-sort.
    pub fn set_initiative(&mut self, id: ParticipantId, initiative: i32) -> ParticipantResult<()> {
        self.participant_mut(id)?.initiative = initiative;
        self.sort_initiative();
        Ok(())
    }

    /// Sort by initiative, highest first.
    ///
    /// During combat the current participant stays current.
    pub fn sort_initiative(&mut self) {
        let current = if self.is_active {
            self.current_participant().map(|p| p.id)
        } else {
            None
        };
        self.participants.sort_by(|a, b| {
            b.initiative
                .cmp(&a.initiative)
                .then_with(|| b.dexterity_modifier.cmp(&a.dexterity_modifier))
        });
        if let Some(id) = current {
            if let Some(pos) = self.participants.iter().position(|p| p.id == id) {
                self.current_turn = pos;
            }
        }
    }

    /// Apply damage, spending temporary hit points first.
    ///
    /// A participant reduced to 0 is marked defeated.
    pub fn apply_damage(&mut self, id: ParticipantId, amount: i32) -> ParticipantResult<HitPoints> {
        let participant = self.participant_mut(id)?;
        let hp = participant
            .hit_points
            .as_mut()
            .ok_or(ParticipantError::UntrackedHitPoints(id))?;

        let amount = amount.max(0);
        let absorbed = amount.min(hp.temporary);
        hp.temporary -= absorbed;
        hp.current = hp.current.saturating_sub(amount - absorbed).max(0);
        let hp = *hp;

        if hp.current == 0 && !participant.defeated {
            participant.defeated = true;
            debug!(participant = %id, "Participant defeated");
        }
        Ok(hp)
    }

    /// Restore hit points up to the maximum. Healing above 0 revives.
    pub fn heal(&mut self, id: ParticipantId, amount: i32) -> ParticipantResult<HitPoints> {
        let participant = self.participant_mut(id)?;
        let hp = participant
            .hit_points
            .as_mut()
            .ok_or(ParticipantError::UntrackedHitPoints(id))?;

        hp.current = hp.current.saturating_add(amount.max(0)).min(hp.max);
        let hp = *hp;
        if hp.current > 0 {
            participant.defeated = false;
        }
        Ok(hp)
    }

    /// Grant temporary hit points. They do not stack; the larger value wins.
    pub fn grant_temporary_hit_points(
        &mut self,
        id: ParticipantId,
        amount: i32,
    ) -> ParticipantResult<HitPoints> {
        let participant = self.participant_mut(id)?;
        let hp = participant
            .hit_points
            .as_mut()
            .ok_or(ParticipantError::UntrackedHitPoints(id))?;
        hp.temporary = hp.temporary.max(amount.max(0));
        Ok(*hp)
    }
}
