//! C3 network topology.
//!
//! Shared networks are flat and identified by a [`NetworkId`]. Master/slave
//! networks are trees of master links headed by a single master, usually a
//! company commander.

use std::collections::BTreeSet;

use lobby_core::{
    C3Kind, C3Node, C3Rule, Command, LobbyError, NetworkId, UnitId, C3_MAX_DEPENDENTS,
    C3_MAX_DEPTH, C3_MAX_NODES, SHARED_C3_MAX_NODES,
};

use crate::{ownership, ownership::Allegiance, World};

/// Read-only view of the network a unit belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkSummary {
    /// Equipment family of the network.
    pub kind: C3Kind,
    /// Every unit in the network, the head first for master/slave networks.
    pub members: Vec<UnitId>,
    /// Nodes in use.
    pub used: usize,
    /// Nodes still available before the ceiling.
    pub free: usize,
}

/// Summarizes the network the unit belongs to.
#[must_use]
pub fn network_summary(world: &World, unit: UnitId) -> Option<NetworkSummary> {
    let node = node(world, unit)?;
    let (members, limit) = match node.kind {
        C3Kind::Shared => (shared_members(world, node.network), SHARED_C3_MAX_NODES),
        C3Kind::Master | C3Kind::Slave => (tree(world, head(world, unit)), C3_MAX_NODES),
    };
    Some(NetworkSummary {
        kind: node.kind,
        used: members.len(),
        free: limit.saturating_sub(members.len()),
        members,
    })
}

/// Units linked directly to the master, in identifier order.
#[must_use]
pub fn dependents(world: &World, master: UnitId) -> Vec<UnitId> {
    world
        .units
        .values()
        .filter(|state| state.c3.and_then(|node| node.master) == Some(master))
        .map(|state| state.id)
        .collect()
}

/// Plans linking `unit` into the network of `target`.
///
/// Shared equipment joins the target's flat network. Master/slave equipment
/// links to the target as its master.
pub fn plan_connect(
    world: &World,
    unit: UnitId,
    target: UnitId,
) -> Result<Vec<Command>, LobbyError> {
    let state = world.unit(unit).ok_or(LobbyError::UnknownUnit(unit))?;
    let other = world.unit(target).ok_or(LobbyError::UnknownUnit(target))?;
    let linking = state.c3.ok_or(C3Rule::MissingEquipment(unit))?;
    let host = other.c3.ok_or(C3Rule::MissingEquipment(target))?;

    if unit == target {
        return Err(C3Rule::SelfLink.into());
    }
    if ownership::is_enemy(world, state.owner, other.owner) {
        return Err(C3Rule::EnemyLink.into());
    }

    match linking.kind {
        C3Kind::Shared => {
            if host.kind != C3Kind::Shared {
                return Err(C3Rule::KindMismatch.into());
            }
            let network = host.network.ok_or(C3Rule::MissingEquipment(target))?;
            if linking.network == Some(network) {
                return Err(C3Rule::AlreadyConnected.into());
            }
            if shared_members(world, Some(network)).len() + 1 > SHARED_C3_MAX_NODES {
                return Err(C3Rule::NodeCeiling {
                    limit: SHARED_C3_MAX_NODES,
                }
                .into());
            }
            Ok(vec![Command::JoinC3Network { unit, network }])
        }
        C3Kind::Master | C3Kind::Slave => {
            check_master_link(world, unit, linking, target, host)?;
            Ok(vec![Command::SetC3Master {
                unit,
                master: Some(target),
            }])
        }
    }
}

fn check_master_link(
    world: &World,
    unit: UnitId,
    linking: C3Node,
    target: UnitId,
    host: C3Node,
) -> Result<(), C3Rule> {
    if !host.kind.is_hierarchical() {
        return Err(C3Rule::KindMismatch);
    }
    if host.kind != C3Kind::Master {
        return Err(C3Rule::NotMaster);
    }
    if linking.master == Some(target) {
        return Err(C3Rule::AlreadyConnected);
    }
    let below = descendants(world, unit);
    if below.contains(&target) {
        return Err(C3Rule::CircularLink);
    }
    if dependents(world, target).len() >= C3_MAX_DEPENDENTS {
        return Err(C3Rule::DependentLimit {
            limit: C3_MAX_DEPENDENTS,
        });
    }
    if linking.company_commander {
        return Err(C3Rule::CommanderCannotBeSubordinate);
    }
    if linking.kind == C3Kind::Master && !host.company_commander {
        return Err(C3Rule::CommanderRequired);
    }
    if depth(world, target) + 1 + height(world, unit) > C3_MAX_DEPTH {
        return Err(C3Rule::HierarchyDepth {
            limit: C3_MAX_DEPTH,
        });
    }

    let target_head = head(world, target);
    let merged = if head(world, unit) == target_head {
        tree(world, target_head).len()
    } else {
        tree(world, target_head).len() + below.len() + 1
    };
    if merged > C3_MAX_NODES {
        return Err(C3Rule::NodeCeiling {
            limit: C3_MAX_NODES,
        });
    }
    Ok(())
}

/// Plans removing a unit from its network.
pub fn plan_disconnect(world: &World, unit: UnitId) -> Result<Vec<Command>, LobbyError> {
    let state = world.unit(unit).ok_or(LobbyError::UnknownUnit(unit))?;
    if state.c3.is_none() {
        return Err(C3Rule::MissingEquipment(unit).into());
    }
    Ok(plan_release(world, unit))
}

/// Plans removing a unit from its network, planning nothing for units without C3.
///
/// Units that linked to it lose their master and stay unattached until they
/// are connected again.
#[must_use]
pub fn plan_release(world: &World, unit: UnitId) -> Vec<Command> {
    let Some(node) = node(world, unit) else {
        return Vec::new();
    };
    let mut commands = Vec::new();
    match node.kind {
        C3Kind::Shared => {
            if shared_members(world, node.network).len() > 1 {
                commands.push(Command::LeaveC3Network { unit });
            }
        }
        C3Kind::Master | C3Kind::Slave => {
            if node.master.is_some() {
                commands.push(Command::SetC3Master { unit, master: None });
            }
            for dependent in dependents(world, unit) {
                commands.push(Command::SetC3Master {
                    unit: dependent,
                    master: None,
                });
            }
            if node.company_commander {
                commands.push(Command::SetCompanyCommander {
                    unit,
                    commander: false,
                });
            }
        }
    }
    commands
}

/// Plans turning the unit into an independent master heading its own network.
pub fn plan_promote_to_master(world: &World, unit: UnitId) -> Result<Vec<Command>, LobbyError> {
    let node = master_node(world, unit)?;
    let mut commands = Vec::new();
    if node.company_commander {
        let leads_masters = dependents(world, unit).into_iter().any(|dependent| {
            self::node(world, dependent).is_some_and(|n| n.kind == C3Kind::Master)
        });
        if leads_masters {
            return Err(C3Rule::CommanderRequired.into());
        }
        commands.push(Command::SetCompanyCommander {
            unit,
            commander: false,
        });
    }
    if node.master.is_some() {
        commands.push(Command::SetC3Master { unit, master: None });
    }
    Ok(commands)
}

/// Plans turning the unit into a company commander able to lead other masters.
pub fn plan_promote_to_company_commander(
    world: &World,
    unit: UnitId,
) -> Result<Vec<Command>, LobbyError> {
    let node = master_node(world, unit)?;
    if node.company_commander {
        return Ok(Vec::new());
    }
    let mut commands = Vec::new();
    if node.master.is_some() {
        commands.push(Command::SetC3Master { unit, master: None });
    }
    commands.push(Command::SetCompanyCommander {
        unit,
        commander: true,
    });
    Ok(commands)
}

/// Plans cutting every network link between the provided units and units
/// they would oppose under the projection.
#[must_use]
pub fn plan_sever(projection: &Allegiance<'_>, units: &BTreeSet<UnitId>) -> Vec<Command> {
    let world = projection.world();
    let mut commands = Vec::new();
    for unit in units {
        let Some(node) = node(world, *unit) else {
            continue;
        };
        match node.kind {
            C3Kind::Shared => {
                let hostile = shared_members(world, node.network)
                    .into_iter()
                    .any(|member| projection.units_hostile(*unit, member));
                if hostile {
                    push_unique(&mut commands, Command::LeaveC3Network { unit: *unit });
                }
            }
            C3Kind::Master | C3Kind::Slave => {
                if let Some(master) = node.master {
                    if projection.units_hostile(*unit, master) {
                        push_unique(
                            &mut commands,
                            Command::SetC3Master {
                                unit: *unit,
                                master: None,
                            },
                        );
                    }
                }
                for dependent in dependents(world, *unit) {
                    if projection.units_hostile(*unit, dependent) {
                        push_unique(
                            &mut commands,
                            Command::SetC3Master {
                                unit: dependent,
                                master: None,
                            },
                        );
                    }
                }
            }
        }
    }
    commands
}

fn push_unique(commands: &mut Vec<Command>, command: Command) {
    if !commands.contains(&command) {
        commands.push(command);
    }
}

fn node(world: &World, unit: UnitId) -> Option<C3Node> {
    world.unit(unit).and_then(|state| state.c3)
}

fn master_node(world: &World, unit: UnitId) -> Result<C3Node, LobbyError> {
    let state = world.unit(unit).ok_or(LobbyError::UnknownUnit(unit))?;
    let node = state.c3.ok_or(C3Rule::MissingEquipment(unit))?;
    if node.kind != C3Kind::Master {
        return Err(C3Rule::NotMaster.into());
    }
    Ok(node)
}

fn shared_members(world: &World, network: Option<NetworkId>) -> Vec<UnitId> {
    let Some(network) = network else {
        return Vec::new();
    };
    world
        .units
        .values()
        .filter(|state| {
            state
                .c3
                .is_some_and(|node| node.kind == C3Kind::Shared && node.network == Some(network))
        })
        .map(|state| state.id)
        .collect()
}

fn head(world: &World, unit: UnitId) -> UnitId {
    let mut current = unit;
    let mut visited = BTreeSet::from([unit]);
    while let Some(master) = node(world, current).and_then(|node| node.master) {
        if !visited.insert(master) {
            break;
        }
        current = master;
    }
    current
}

fn depth(world: &World, unit: UnitId) -> usize {
    let mut levels = 0;
    let mut current = unit;
    while let Some(master) = node(world, current).and_then(|node| node.master) {
        levels += 1;
        if master == unit || levels > world.units.len() {
            break;
        }
        current = master;
    }
    levels
}

fn height(world: &World, unit: UnitId) -> usize {
    let mut levels = 0;
    let mut frontier = dependents(world, unit);
    let mut seen = BTreeSet::from([unit]);
    while !frontier.is_empty() {
        levels += 1;
        frontier = frontier
            .into_iter()
            .filter(|member| seen.insert(*member))
            .flat_map(|member| dependents(world, member))
            .collect();
    }
    levels
}

fn descendants(world: &World, unit: UnitId) -> Vec<UnitId> {
    let mut found = Vec::new();
    let mut stack = dependents(world, unit);
    while let Some(next) = stack.pop() {
        if next == unit || found.contains(&next) {
            continue;
        }
        found.push(next);
        stack.extend(dependents(world, next));
    }
    found
}

fn tree(world: &World, head: UnitId) -> Vec<UnitId> {
    let mut members = vec![head];
    members.extend(descendants(world, head));
    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{apply, query};
    use lobby_core::{ConnectionKind, PlayerId, TeamId, UnitKind, UnitSpec};

    const OPERATOR: PlayerId = PlayerId::new(1);
    const ENEMY: PlayerId = PlayerId::new(2);

    fn build(units: &[(u32, PlayerId, C3Kind)]) -> World {
        let mut world = World::new();
        let mut events = Vec::new();
        for (player, team, local) in [
            (OPERATOR, 1, Some(ConnectionKind::Operator)),
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
        for (unit, owner, kind) in units {
            apply(
                &mut world,
                Command::AddUnit {
                    unit: UnitId::new(*unit),
                    spec: UnitSpec::new(*owner, UnitKind::Mech { bipedal: true }, 50.0)
                        .with_c3(*kind),
                },
                &mut events,
            );
        }
        world
    }

    fn commit(world: &mut World, result: Result<Vec<Command>, LobbyError>) {
        let mut events = Vec::new();
        for command in result.expect("plan succeeds") {
            apply(world, command, &mut events);
        }
    }

    fn violation(rule: C3Rule) -> Result<Vec<Command>, LobbyError> {
        Err(LobbyError::NetworkConstraintViolation(rule))
    }

    #[test]
    fn shared_networks_stop_at_five_nodes() {
        let units: Vec<(u32, PlayerId, C3Kind)> =
            (1..=6).map(|id| (id, OPERATOR, C3Kind::Shared)).collect();
        let mut world = build(&units);
        for id in 2..=5 {
            let plan = plan_connect(&world, UnitId::new(id), UnitId::new(1));
            commit(&mut world, plan);
        }

        let summary = network_summary(&world, UnitId::new(1)).expect("summary");
        assert_eq!(summary.used, 5);
        assert_eq!(summary.free, 0);
        assert_eq!(
            plan_connect(&world, UnitId::new(6), UnitId::new(3)),
            violation(C3Rule::NodeCeiling { limit: 5 })
        );
        assert_eq!(
            plan_connect(&world, UnitId::new(2), UnitId::new(3)),
            violation(C3Rule::AlreadyConnected)
        );
    }

    #[test]
    fn company_networks_stop_at_twelve_nodes() {
        let mut units = vec![
            (1, OPERATOR, C3Kind::Master),
            (2, OPERATOR, C3Kind::Master),
            (3, OPERATOR, C3Kind::Master),
            (4, OPERATOR, C3Kind::Master),
        ];
        units.extend((5..=13).map(|id| (id, OPERATOR, C3Kind::Slave)));
        let mut world = build(&units);

        let promote = plan_promote_to_company_commander(&world, UnitId::new(1));
        commit(&mut world, promote);
        for master in 2..=4 {
            let link = plan_connect(&world, UnitId::new(master), UnitId::new(1));
            commit(&mut world, link);
        }
        for slave in 5..=12 {
            let master = 2 + (slave - 5) / 3;
            let link = plan_connect(&world, UnitId::new(slave), UnitId::new(master));
            commit(&mut world, link);
        }

        let summary = network_summary(&world, UnitId::new(12)).expect("summary");
        assert_eq!(summary.used, 12);
        assert_eq!(summary.free, 0);
        assert_eq!(
            plan_connect(&world, UnitId::new(13), UnitId::new(4)),
            violation(C3Rule::NodeCeiling { limit: 12 })
        );
    }

    #[test]
    fn links_are_rejected_across_teams_and_kinds() {
        let world = build(&[
            (1, OPERATOR, C3Kind::Master),
            (2, ENEMY, C3Kind::Slave),
            (3, OPERATOR, C3Kind::Shared),
            (4, OPERATOR, C3Kind::Slave),
        ]);
        assert_eq!(
            plan_connect(&world, UnitId::new(2), UnitId::new(1)),
            violation(C3Rule::EnemyLink)
        );
        assert_eq!(
            plan_connect(&world, UnitId::new(3), UnitId::new(1)),
            violation(C3Rule::KindMismatch)
        );
        assert_eq!(
            plan_connect(&world, UnitId::new(1), UnitId::new(1)),
            violation(C3Rule::SelfLink)
        );
        assert_eq!(
            plan_connect(&world, UnitId::new(1), UnitId::new(4)),
            violation(C3Rule::NotMaster)
        );
    }

    #[test]
    fn masters_need_a_company_commander_and_depth_is_capped() {
        let mut world = build(&[
            (1, OPERATOR, C3Kind::Master),
            (2, OPERATOR, C3Kind::Master),
            (3, OPERATOR, C3Kind::Slave),
            (4, OPERATOR, C3Kind::Master),
        ]);
        assert_eq!(
            plan_connect(&world, UnitId::new(2), UnitId::new(1)),
            violation(C3Rule::CommanderRequired)
        );

        let promote = plan_promote_to_company_commander(&world, UnitId::new(1));
        commit(&mut world, promote);
        let link = plan_connect(&world, UnitId::new(2), UnitId::new(1));
        commit(&mut world, link);
        let leaf = plan_connect(&world, UnitId::new(3), UnitId::new(2));
        commit(&mut world, leaf);

        let summary = network_summary(&world, UnitId::new(3)).expect("summary");
        assert_eq!(
            summary.members,
            vec![UnitId::new(1), UnitId::new(2), UnitId::new(3)]
        );
        assert_eq!(summary.free, 9);
        assert_eq!(
            plan_connect(&world, UnitId::new(1), UnitId::new(2)),
            violation(C3Rule::CircularLink)
        );
        assert_eq!(
            plan_connect(&world, UnitId::new(1), UnitId::new(4)),
            violation(C3Rule::CommanderCannotBeSubordinate)
        );
        assert_eq!(
            plan_promote_to_master(&world, UnitId::new(1)),
            violation(C3Rule::CommanderRequired)
        );
    }

    #[test]
    fn a_master_links_at_most_three_dependents() {
        let mut world = build(&[
            (1, OPERATOR, C3Kind::Master),
            (2, OPERATOR, C3Kind::Slave),
            (3, OPERATOR, C3Kind::Slave),
            (4, OPERATOR, C3Kind::Slave),
            (5, OPERATOR, C3Kind::Slave),
        ]);
        for id in 2..=4 {
            let plan = plan_connect(&world, UnitId::new(id), UnitId::new(1));
            commit(&mut world, plan);
        }
        assert_eq!(
            plan_connect(&world, UnitId::new(5), UnitId::new(1)),
            violation(C3Rule::DependentLimit { limit: 3 })
        );
    }

    #[test]
    fn disconnecting_a_sub_master_leaves_its_leaf_unattached() {
        let mut world = build(&[
            (1, OPERATOR, C3Kind::Master),
            (2, OPERATOR, C3Kind::Master),
            (3, OPERATOR, C3Kind::Slave),
        ]);
        let promote = plan_promote_to_company_commander(&world, UnitId::new(1));
        commit(&mut world, promote);
        let link = plan_connect(&world, UnitId::new(2), UnitId::new(1));
        commit(&mut world, link);
        let leaf = plan_connect(&world, UnitId::new(3), UnitId::new(2));
        commit(&mut world, leaf);

        let disconnect = plan_disconnect(&world, UnitId::new(2));
        commit(&mut world, disconnect);

        let master_of = |unit| {
            query::unit_snapshot(&world, UnitId::new(unit))
                .and_then(|snapshot| snapshot.c3)
                .and_then(|node| node.master)
        };
        assert_eq!(master_of(2), None);
        assert_eq!(master_of(3), None, "the leaf is not re-attached elsewhere");
        assert!(dependents(&world, UnitId::new(1)).is_empty());
    }

    #[test]
    fn projected_enemies_lose_their_links() {
        let mut world = build(&[
            (1, OPERATOR, C3Kind::Master),
            (2, OPERATOR, C3Kind::Slave),
            (3, OPERATOR, C3Kind::Shared),
            (4, OPERATOR, C3Kind::Shared),
        ]);
        let slave = plan_connect(&world, UnitId::new(2), UnitId::new(1));
        commit(&mut world, slave);
        let shared = plan_connect(&world, UnitId::new(4), UnitId::new(3));
        commit(&mut world, shared);

        let projection = Allegiance::current(&world)
            .with_unit_owner(UnitId::new(2), ENEMY)
            .with_unit_owner(UnitId::new(4), ENEMY);
        let moving: BTreeSet<UnitId> = [UnitId::new(2), UnitId::new(4)].into_iter().collect();
        assert_eq!(
            plan_sever(&projection, &moving),
            vec![
                Command::SetC3Master {
                    unit: UnitId::new(2),
                    master: None,
                },
                Command::LeaveC3Network {
                    unit: UnitId::new(4),
                },
            ]
        );
    }
}
