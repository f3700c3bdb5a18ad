//! Ownership and visibility policy.
//!
//! Decides whether the local session may edit a unit or force and whether
//! the operator is allowed to see it, and answers enemy/teammate questions
//! both for the current roster and for a projected one.

use std::collections::BTreeMap;

use lobby_core::{ForceId, LobbyError, PlayerId, TeamId, UnitId};

use crate::{forces, World};

/// Reports whether the participant is hosted by this session.
#[must_use]
pub fn is_local(world: &World, player: PlayerId) -> bool {
    world.operator == Some(player) || world.automated.contains(&player)
}

/// Reports whether two participants fight against each other.
///
/// Participants without a team fight everyone; unknown participants are
/// treated as enemies of everyone.
#[must_use]
pub fn is_enemy(world: &World, first: PlayerId, second: PlayerId) -> bool {
    teams_hostile(first, world.team_of(first), second, world.team_of(second))
}

/// Reports whether the local session may edit the unit.
///
/// Besides locally owned units this includes teammates' units placed in a
/// force whose ancestor chain contains a locally owned force.
#[must_use]
pub fn is_unit_editable(world: &World, unit: UnitId) -> bool {
    let Some(state) = world.unit(unit) else {
        return false;
    };
    if is_local(world, state.owner) {
        return true;
    }
    state
        .force
        .is_some_and(|force| is_force_editable(world, force))
}

/// Reports whether any force in the chain from `force` up to its top-level
/// ancestor is owned by a local participant.
#[must_use]
pub fn is_force_editable(world: &World, force: ForceId) -> bool {
    let Some(state) = world.force(force) else {
        return false;
    };
    if is_local(world, state.owner) {
        return true;
    }
    forces::ancestors(world, force)
        .into_iter()
        .filter_map(|ancestor| world.force(ancestor))
        .any(|ancestor| is_local(world, ancestor.owner))
}

/// Reports whether the operator may see every unit under the blind drop rule.
#[must_use]
pub fn can_see(world: &World, units: &[UnitId]) -> bool {
    if !world.options.blind_drop {
        return true;
    }
    let Some(operator) = world.operator else {
        return false;
    };
    units.iter().all(|unit| {
        world
            .unit(*unit)
            .is_some_and(|state| !is_enemy(world, operator, state.owner))
    })
}

/// Validates that the selection may be updated from this session.
///
/// Callers must stop and surface the failure before mutating anything.
pub fn validate_update(world: &World, units: &[UnitId]) -> Result<(), LobbyError> {
    if units.is_empty() {
        return Err(LobbyError::EmptySelection);
    }
    for unit in units {
        if world.unit(*unit).is_none() {
            return Err(LobbyError::UnknownUnit(*unit));
        }
        if !is_unit_editable(world, *unit) {
            return Err(LobbyError::NotEditable(*unit));
        }
    }
    match units
        .iter()
        .find(|unit| !can_see(world, std::slice::from_ref(*unit)))
    {
        Some(hidden) => Err(LobbyError::NotVisible(*hidden)),
        None => Ok(()),
    }
}

/// Validates that the forces may be edited from this session.
pub fn validate_forces(world: &World, selection: &[ForceId]) -> Result<(), LobbyError> {
    if selection.is_empty() {
        return Err(LobbyError::EmptySelection);
    }
    for force in selection {
        if world.force(*force).is_none() {
            return Err(LobbyError::UnknownForce(*force));
        }
        if !is_force_editable(world, *force) {
            return Err(LobbyError::NotEditableForce(*force));
        }
    }
    Ok(())
}

/// Projected ownership and team assignment used to plan severing passes.
///
/// The projection starts from the world's current state and layers pending
/// owner and team changes on top, so planners can ask which relations would
/// straddle the team boundary once the change commits.
#[derive(Clone, Debug)]
pub struct Allegiance<'w> {
    world: &'w World,
    unit_owners: BTreeMap<UnitId, PlayerId>,
    force_owners: BTreeMap<ForceId, PlayerId>,
    teams: BTreeMap<PlayerId, Option<TeamId>>,
}

impl<'w> Allegiance<'w> {
    /// Projection identical to the world's current state.
    #[must_use]
    pub fn current(world: &'w World) -> Self {
        Self {
            world,
            unit_owners: BTreeMap::new(),
            force_owners: BTreeMap::new(),
            teams: BTreeMap::new(),
        }
    }

    /// Projects a pending owner change for a unit.
    #[must_use]
    pub fn with_unit_owner(mut self, unit: UnitId, owner: PlayerId) -> Self {
        let _ = self.unit_owners.insert(unit, owner);
        self
    }

    /// Projects a pending owner change for a force.
    #[must_use]
    pub fn with_force_owner(mut self, force: ForceId, owner: PlayerId) -> Self {
        let _ = self.force_owners.insert(force, owner);
        self
    }

    /// Projects a pending team change for a participant.
    #[must_use]
    pub fn with_team(mut self, player: PlayerId, team: Option<TeamId>) -> Self {
        let _ = self.teams.insert(player, team);
        self
    }

    /// World the projection is layered on.
    #[must_use]
    pub fn world(&self) -> &'w World {
        self.world
    }

    /// Projected owner of a unit.
    #[must_use]
    pub fn unit_owner(&self, unit: UnitId) -> Option<PlayerId> {
        self.unit_owners
            .get(&unit)
            .copied()
            .or_else(|| self.world.unit(unit).map(|state| state.owner))
    }

    /// Projected owner of a force.
    #[must_use]
    pub fn force_owner(&self, force: ForceId) -> Option<PlayerId> {
        self.force_owners
            .get(&force)
            .copied()
            .or_else(|| self.world.force(force).map(|state| state.owner))
    }

    /// Reports whether two participants would fight against each other.
    #[must_use]
    pub fn are_enemies(&self, first: PlayerId, second: PlayerId) -> bool {
        teams_hostile(first, self.team(first), second, self.team(second))
    }

    /// Reports whether two units would end up on opposing sides.
    #[must_use]
    pub fn units_hostile(&self, first: UnitId, second: UnitId) -> bool {
        match (self.unit_owner(first), self.unit_owner(second)) {
            (Some(a), Some(b)) => self.are_enemies(a, b),
            _ => false,
        }
    }

    /// Reports whether a unit would end up opposed to the owner of a force.
    #[must_use]
    pub fn unit_opposes_force(&self, unit: UnitId, force: ForceId) -> bool {
        match (self.unit_owner(unit), self.force_owner(force)) {
            (Some(a), Some(b)) => self.are_enemies(a, b),
            _ => false,
        }
    }

    /// Reports whether the owners of two forces would end up on opposing sides.
    #[must_use]
    pub fn forces_hostile(&self, first: ForceId, second: ForceId) -> bool {
        match (self.force_owner(first), self.force_owner(second)) {
            (Some(a), Some(b)) => self.are_enemies(a, b),
            _ => false,
        }
    }

    fn team(&self, player: PlayerId) -> Option<Option<TeamId>> {
        match self.teams.get(&player) {
            Some(team) => Some(*team),
            None => self.world.team_of(player),
        }
    }
}

fn teams_hostile(
    first: PlayerId,
    first_team: Option<Option<TeamId>>,
    second: PlayerId,
    second_team: Option<Option<TeamId>>,
) -> bool {
    if first == second {
        return false;
    }
    match (first_team, second_team) {
        (Some(Some(a)), Some(Some(b))) => a != b,
        _ => true,
    }
}
