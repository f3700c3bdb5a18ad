//! Force hierarchy: tree queries and structural edit planning.
//!
//! Forces form a forest. Every planner here reads the world and returns the
//! command batch that performs the edit; nothing is mutated until the batch
//! is applied.

use std::collections::BTreeSet;

use lobby_core::{Command, ForceId, LobbyError, PlayerId, UnitId};

use crate::{c3, ownership, ownership::Allegiance, query, transport, World};

/// Ancestors of a force, nearest first. Never contains the force itself.
#[must_use]
pub fn ancestors(world: &World, force: ForceId) -> Vec<ForceId> {
    let mut chain = Vec::new();
    let mut cursor = world.force(force).and_then(|state| state.parent);
    while let Some(parent) = cursor {
        if parent == force || chain.contains(&parent) || chain.len() > world.forces.len() {
            break;
        }
        chain.push(parent);
        cursor = world.force(parent).and_then(|state| state.parent);
    }
    chain
}

/// Every force below `force` in pre-order. Never contains the force itself
/// and is empty iff the force is a leaf.
#[must_use]
pub fn full_sub_forces(world: &World, force: ForceId) -> Vec<ForceId> {
    let mut collected = Vec::new();
    let mut stack: Vec<ForceId> = world
        .force(force)
        .map(|state| state.sub_forces.iter().rev().copied().collect())
        .unwrap_or_default();
    while let Some(next) = stack.pop() {
        if next == force || collected.contains(&next) {
            continue;
        }
        collected.push(next);
        if let Some(state) = world.force(next) {
            stack.extend(state.sub_forces.iter().rev().copied());
        }
    }
    collected
}

/// Every unit in the subtree rooted at `force`, the force's own members first.
#[must_use]
pub fn full_entities(world: &World, force: ForceId) -> Vec<UnitId> {
    std::iter::once(force)
        .chain(full_sub_forces(world, force))
        .filter_map(|member| world.force(member))
        .flat_map(|state| state.units.iter().copied())
        .collect()
}

/// Drops duplicate forces and forces whose ancestor is also selected.
///
/// Bulk deletes and reassignments run this first so that a subforce covered
/// by a selected ancestor is processed exactly once.
#[must_use]
pub fn without_redundant(world: &World, selection: &[ForceId]) -> Vec<ForceId> {
    let selected: BTreeSet<ForceId> = selection.iter().copied().collect();
    let mut kept = Vec::new();
    for force in selection {
        if kept.contains(force) {
            continue;
        }
        if ancestors(world, *force)
            .iter()
            .any(|ancestor| selected.contains(ancestor))
        {
            continue;
        }
        kept.push(*force);
    }
    kept
}

/// Plans the creation of a force below `parent`, or at the top level.
pub fn plan_create(
    world: &World,
    parent: Option<ForceId>,
    name: &str,
    owner: PlayerId,
) -> Result<(ForceId, Vec<Command>), LobbyError> {
    if let Some(parent) = parent {
        if world.force(parent).is_none() {
            return Err(LobbyError::UnknownForce(parent));
        }
    }
    if world.team_of(owner).is_none() {
        return Err(LobbyError::UnknownPlayer(owner));
    }

    let force = query::next_force_id(world);
    Ok((
        force,
        vec![Command::CreateForce {
            force,
            name: name.trim().to_owned(),
            parent,
            owner,
        }],
    ))
}

/// Plans renaming a force.
pub fn plan_rename(world: &World, force: ForceId, name: &str) -> Result<Vec<Command>, LobbyError> {
    let state = world.force(force).ok_or(LobbyError::UnknownForce(force))?;
    let name = name.trim();
    if state.name == name {
        return Ok(Vec::new());
    }
    Ok(vec![Command::RenameForce {
        force,
        name: name.to_owned(),
    }])
}

/// Plans detaching a force from its parent so it becomes top-level.
pub fn plan_promote(world: &World, force: ForceId) -> Result<Vec<Command>, LobbyError> {
    let state = world.force(force).ok_or(LobbyError::UnknownForce(force))?;
    if state.parent.is_none() {
        return Ok(Vec::new());
    }
    Ok(vec![Command::ReparentForce {
        force,
        parent: None,
    }])
}

/// Plans moving a force below a new parent, rejecting cycles.
pub fn plan_attach(
    world: &World,
    force: ForceId,
    parent: ForceId,
) -> Result<Vec<Command>, LobbyError> {
    let state = world.force(force).ok_or(LobbyError::UnknownForce(force))?;
    if world.force(parent).is_none() {
        return Err(LobbyError::UnknownForce(parent));
    }
    if parent == force || full_sub_forces(world, force).contains(&parent) {
        return Err(LobbyError::StructuralCycle { force, parent });
    }
    if state.parent == Some(parent) {
        return Ok(Vec::new());
    }
    Ok(vec![Command::ReparentForce {
        force,
        parent: Some(parent),
    }])
}

/// Plans moving units into a force.
pub fn plan_add_units(
    world: &World,
    force: ForceId,
    units: &[UnitId],
) -> Result<Vec<Command>, LobbyError> {
    if world.force(force).is_none() {
        return Err(LobbyError::UnknownForce(force));
    }
    let mut commands = Vec::new();
    let mut seen = BTreeSet::new();
    for unit in units {
        let state = world.unit(*unit).ok_or(LobbyError::UnknownUnit(*unit))?;
        if state.force != Some(force) && seen.insert(*unit) {
            commands.push(Command::AssignForce {
                unit: *unit,
                force: Some(force),
            });
        }
    }
    Ok(commands)
}

/// Plans clearing the force reference of every unit.
///
/// Returns the batch together with the forces whose membership changes.
#[must_use]
pub fn plan_remove_units(world: &World, units: &[UnitId]) -> (Vec<Command>, BTreeSet<ForceId>) {
    let mut commands = Vec::new();
    let mut seen = BTreeSet::new();
    let mut changed = BTreeSet::new();
    for unit in units {
        let Some(force) = world.unit(*unit).and_then(|state| state.force) else {
            continue;
        };
        if seen.insert(*unit) {
            let _ = changed.insert(force);
            commands.push(Command::AssignForce {
                unit: *unit,
                force: None,
            });
        }
    }
    (commands, changed)
}

/// Plans handing a single force to a teammate of its current owner.
///
/// Members keep their owners. Handing the force alone to an enemy is
/// rejected because it would leave an enemy-owned shell around units it
/// cannot hold.
pub fn plan_assign_only(
    world: &World,
    force: ForceId,
    owner: PlayerId,
) -> Result<Vec<Command>, LobbyError> {
    let state = world.force(force).ok_or(LobbyError::UnknownForce(force))?;
    if world.team_of(owner).is_none() {
        return Err(LobbyError::UnknownPlayer(owner));
    }
    if state.owner == owner {
        return Ok(Vec::new());
    }
    if ownership::is_enemy(world, state.owner, owner) {
        return Err(LobbyError::EmptyEnemyAssignmentDisallowed { force, owner });
    }
    Ok(vec![Command::SetForceOwner { force, owner }])
}

/// Plans handing forces, their subforces and every member unit to a new owner.
///
/// Redundant selections are dropped first. Transport, C3 and force relations
/// between moving units and units left behind are severed when the new owner
/// is their enemy, before any owner changes.
pub fn plan_assign_full(
    world: &World,
    selection: &[ForceId],
    owner: PlayerId,
) -> Result<Vec<Command>, LobbyError> {
    if world.team_of(owner).is_none() {
        return Err(LobbyError::UnknownPlayer(owner));
    }
    let roots = without_redundant(world, selection);
    let mut moving_forces = BTreeSet::new();
    let mut moving_units = BTreeSet::new();
    for root in &roots {
        if world.force(*root).is_none() {
            return Err(LobbyError::UnknownForce(*root));
        }
        let _ = moving_forces.insert(*root);
        moving_forces.extend(full_sub_forces(world, *root));
        moving_units.extend(full_entities(world, *root));
    }

    let mut projection = Allegiance::current(world);
    for force in &moving_forces {
        projection = projection.with_force_owner(*force, owner);
    }
    for unit in &moving_units {
        projection = projection.with_unit_owner(*unit, owner);
    }

    let mut commands = transport::plan_sever(&projection, &moving_units);
    commands.extend(c3::plan_sever(&projection, &moving_units));
    commands.extend(plan_sever_straddles(&projection));
    for force in &moving_forces {
        if world.force(*force).is_some_and(|state| state.owner != owner) {
            commands.push(Command::SetForceOwner {
                force: *force,
                owner,
            });
        }
    }
    for unit in &moving_units {
        if world.unit(*unit).is_some_and(|state| state.owner != owner) {
            commands.push(Command::SetOwner { unit: *unit, owner });
        }
    }
    Ok(commands)
}

/// Plans deleting forces together with their subtrees.
///
/// Member units are detached, not deleted.
#[must_use]
pub fn plan_delete(world: &World, selection: &[ForceId]) -> Vec<Command> {
    let mut commands = Vec::new();
    for root in without_redundant(world, selection) {
        if world.force(root).is_none() {
            continue;
        }
        for unit in full_entities(world, root) {
            commands.push(Command::AssignForce { unit, force: None });
        }
        let mut doomed = vec![root];
        doomed.extend(full_sub_forces(world, root));
        for force in doomed.into_iter().rev() {
            commands.push(Command::RemoveForce { force });
        }
    }
    commands
}

/// Plans removing every force relation that would straddle the team boundary.
///
/// Units leave forces owned by a projected enemy; forces owned by a projected
/// enemy of their parent's owner are promoted to the top level.
#[must_use]
pub fn plan_sever_straddles(projection: &Allegiance<'_>) -> Vec<Command> {
    let world = projection.world();
    let mut commands = Vec::new();
    for state in world.units.values() {
        if let Some(force) = state.force {
            if projection.unit_opposes_force(state.id, force) {
                commands.push(Command::AssignForce {
                    unit: state.id,
                    force: None,
                });
            }
        }
    }
    for state in world.forces.values() {
        if let Some(parent) = state.parent {
            if projection.forces_hostile(state.id, parent) {
                commands.push(Command::ReparentForce {
                    force: state.id,
                    parent: None,
                });
            }
        }
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply;
    use lobby_core::{ConnectionKind, TeamId, UnitKind, UnitSpec};

    const OPERATOR: PlayerId = PlayerId::new(1);
    const ALLY: PlayerId = PlayerId::new(2);
    const ENEMY: PlayerId = PlayerId::new(3);

    fn build(commands: Vec<Command>) -> World {
        let mut world = World::new();
        let mut events = Vec::new();
        for (player, team, local) in [
            (OPERATOR, 1, Some(ConnectionKind::Operator)),
            (ALLY, 1, None),
            (ENEMY, 2, None),
        ] {
            apply(
                &mut world,
                Command::AddPlayer {
                    player,
                    name: format!("P{}", player.get()),
                    team: Some(TeamId::new(team)),
                    local,
                },
                &mut events,
            );
        }
        for command in commands {
            apply(&mut world, command, &mut events);
        }
        world
    }

    fn force(id: u32, parent: Option<u32>, owner: PlayerId) -> Command {
        Command::CreateForce {
            force: ForceId::new(id),
            name: format!("F{id}"),
            parent: parent.map(ForceId::new),
            owner,
        }
    }

    fn unit(id: u32, owner: PlayerId, force: u32) -> Vec<Command> {
        vec![
            Command::AddUnit {
                unit: UnitId::new(id),
                spec: UnitSpec::new(owner, UnitKind::GroundVehicle, 40.0),
            },
            Command::AssignForce {
                unit: UnitId::new(id),
                force: Some(ForceId::new(force)),
            },
        ]
    }

    fn company() -> World {
        let mut commands = vec![
            force(1, None, OPERATOR),
            force(2, Some(1), OPERATOR),
            force(3, Some(1), OPERATOR),
            force(4, Some(3), OPERATOR),
        ];
        commands.extend(unit(10, OPERATOR, 1));
        commands.extend(unit(11, OPERATOR, 2));
        commands.extend(unit(12, ALLY, 4));
        build(commands)
    }

    #[test]
    fn sub_forces_exclude_the_root_and_are_empty_for_leaves() {
        let world = company();
        let below = full_sub_forces(&world, ForceId::new(1));
        assert_eq!(
            below,
            vec![ForceId::new(2), ForceId::new(3), ForceId::new(4)]
        );
        assert!(!below.contains(&ForceId::new(1)));
        assert!(full_sub_forces(&world, ForceId::new(4)).is_empty());
        assert_eq!(
            full_entities(&world, ForceId::new(3)),
            vec![UnitId::new(12)]
        );
    }

    #[test]
    fn attaching_below_a_descendant_is_a_cycle() {
        let world = company();
        assert_eq!(
            plan_attach(&world, ForceId::new(1), ForceId::new(4)),
            Err(LobbyError::StructuralCycle {
                force: ForceId::new(1),
                parent: ForceId::new(4),
            })
        );
        assert_eq!(
            plan_attach(&world, ForceId::new(2), ForceId::new(2)),
            Err(LobbyError::StructuralCycle {
                force: ForceId::new(2),
                parent: ForceId::new(2),
            })
        );
        assert_eq!(
            plan_attach(&world, ForceId::new(4), ForceId::new(2)),
            Ok(vec![Command::ReparentForce {
                force: ForceId::new(4),
                parent: Some(ForceId::new(2)),
            }])
        );
    }

    #[test]
    fn redundant_subforces_are_dropped() {
        let world = company();
        assert_eq!(
            without_redundant(
                &world,
                &[ForceId::new(3), ForceId::new(1), ForceId::new(4), ForceId::new(1)]
            ),
            vec![ForceId::new(1)]
        );
        assert_eq!(
            without_redundant(&world, &[ForceId::new(2), ForceId::new(4)]),
            vec![ForceId::new(2), ForceId::new(4)]
        );
    }

    #[test]
    fn full_assignment_moves_every_member_exactly_once() {
        let world = company();
        let commands =
            plan_assign_full(&world, &[ForceId::new(1), ForceId::new(3)], ALLY).expect("plan");

        let owner_changes: Vec<UnitId> = commands
            .iter()
            .filter_map(|command| match command {
                Command::SetOwner { unit, .. } => Some(*unit),
                _ => None,
            })
            .collect();
        assert_eq!(owner_changes, vec![UnitId::new(10), UnitId::new(11)]);

        let force_changes = commands
            .iter()
            .filter(|command| matches!(command, Command::SetForceOwner { .. }))
            .count();
        assert_eq!(force_changes, 4);
    }

    #[test]
    fn assigning_a_shell_to_an_enemy_is_disallowed() {
        let world = company();
        assert_eq!(
            plan_assign_only(&world, ForceId::new(2), ENEMY),
            Err(LobbyError::EmptyEnemyAssignmentDisallowed {
                force: ForceId::new(2),
                owner: ENEMY,
            })
        );
        assert_eq!(
            plan_assign_only(&world, ForceId::new(2), ALLY),
            Ok(vec![Command::SetForceOwner {
                force: ForceId::new(2),
                owner: ALLY,
            }])
        );
    }

    #[test]
    fn assigning_only_a_middle_force_keeps_the_transitive_chain_editable() {
        let mut world = company();
        let mut events = Vec::new();
        for command in plan_assign_only(&world, ForceId::new(3), ALLY).expect("plan") {
            apply(&mut world, command, &mut events);
        }
        assert!(ownership::is_force_editable(&world, ForceId::new(4)));
        assert_eq!(query::force_owner(&world, ForceId::new(4)), Some(OPERATOR));
    }

    #[test]
    fn deleting_a_force_detaches_members_and_removes_the_subtree() {
        let mut world = company();
        let commands = plan_delete(&world, &[ForceId::new(3), ForceId::new(4)]);
        assert_eq!(
            commands,
            vec![
                Command::AssignForce {
                    unit: UnitId::new(12),
                    force: None,
                },
                Command::RemoveForce {
                    force: ForceId::new(4),
                },
                Command::RemoveForce {
                    force: ForceId::new(3),
                },
            ]
        );

        let mut events = Vec::new();
        for command in commands {
            apply(&mut world, command, &mut events);
        }
        assert_eq!(query::force_of(&world, UnitId::new(12)), None);
        assert_eq!(
            query::force_snapshot(&world, ForceId::new(1))
                .expect("root survives")
                .sub_forces,
            vec![ForceId::new(2)]
        );
    }

    #[test]
    fn removing_units_reports_changed_forces() {
        let world = company();
        let (commands, changed) =
            plan_remove_units(&world, &[UnitId::new(10), UnitId::new(11), UnitId::new(10)]);
        assert_eq!(commands.len(), 2);
        assert_eq!(
            changed.into_iter().collect::<Vec<_>>(),
            vec![ForceId::new(1), ForceId::new(2)]
        );
    }
}
