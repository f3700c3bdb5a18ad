#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Update routing: decides which local connection submits each change.
//!
//! The authoritative server accepts a change for a unit or force only from a
//! connection that owns it or is allied with its owner. Senders are resolved
//! against the world as it was before a batch commits, so a unit handed to an
//! enemy is still announced by the connection that used to control it.

use std::{collections::BTreeMap, fmt::Display};

use lobby_core::{
    Dispatch, ForceId, ForceSnapshot, Outbound, PlayerId, SendingConnection, TeamId, UnitId,
    UnitSnapshot,
};
use lobby_world::{ownership, query, Touched, World};
use log::warn;

/// Stateless router mapping owners to local sending connections.
#[derive(Clone, Copy, Debug, Default)]
pub struct UpdateRouter;

impl UpdateRouter {
    /// Creates a new router.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Picks the connection that may submit changes for entities of `owner`.
    ///
    /// The operator is preferred; otherwise the first automated player in
    /// hosting order that is not an enemy of the owner. `None` means every
    /// local connection is an enemy of the owner.
    #[must_use]
    pub fn correct_sender(&self, world: &World, owner: PlayerId) -> Option<SendingConnection> {
        query::local_connections(world)
            .into_iter()
            .find(|connection| !ownership::is_enemy(world, connection.player, owner))
    }

    /// Connection that may submit changes for the unit.
    #[must_use]
    pub fn sender_for_unit(&self, world: &World, unit: UnitId) -> Option<SendingConnection> {
        query::unit_owner(world, unit).and_then(|owner| self.correct_sender(world, owner))
    }

    /// Connection that may submit changes for the force.
    #[must_use]
    pub fn sender_for_force(&self, world: &World, force: ForceId) -> Option<SendingConnection> {
        query::force_owner(world, force).and_then(|owner| self.correct_sender(world, owner))
    }

    /// Resolves senders for every touched entity that exists in `world`.
    ///
    /// Call this with the world as it was before the batch commits.
    #[must_use]
    pub fn resolve(&self, world: &World, touched: &Touched) -> RoutingTable {
        let mut table = RoutingTable::default();
        for unit in touched.units.iter().chain(&touched.removed_units) {
            if query::unit_owner(world, *unit).is_some() {
                let _ = table
                    .units
                    .insert(*unit, self.sender_for_unit(world, *unit));
            }
        }
        for force in touched.forces.iter().chain(&touched.removed_forces) {
            if query::force_owner(world, *force).is_some() {
                let _ = table
                    .forces
                    .insert(*force, self.sender_for_force(world, *force));
            }
        }
        table
    }

    /// Resolves entities the pre-change world did not know against the committed world.
    pub fn complete(&self, committed: &World, touched: &Touched, table: &mut RoutingTable) {
        for unit in touched.added_units.iter().chain(&touched.units) {
            if !table.units.contains_key(unit) {
                let _ = table
                    .units
                    .insert(*unit, self.sender_for_unit(committed, *unit));
            }
        }
        for force in &touched.forces {
            if !table.forces.contains_key(force) {
                let _ = table
                    .forces
                    .insert(*force, self.sender_for_force(committed, *force));
            }
        }
    }

    /// Partitions the committed changes into one message per sender and kind.
    ///
    /// Additions come first, then updates, then deletions, so a carrier's
    /// released cargo is updated before the carrier disappears. Bundles are
    /// ordered by connection: the operator, then automated players.
    pub fn dispatch(
        &self,
        committed: &World,
        table: &RoutingTable,
        touched: &Touched,
        out: &mut Vec<Dispatch>,
    ) {
        let order = query::local_connections(committed);

        for (sender, units) in partition(&order, &touched.added_units, &table.units) {
            let units = unit_snapshots(committed, &units);
            if !units.is_empty() {
                out.push(Dispatch {
                    sender,
                    message: Outbound::AddUnits { units },
                });
            }
        }

        let unit_bundles = partition(&order, &touched.units, &table.units);
        let force_bundles = partition(&order, &touched.forces, &table.forces);
        let mut senders: Vec<SendingConnection> = Vec::new();
        for sender in unit_bundles
            .iter()
            .map(|(sender, _)| *sender)
            .chain(force_bundles.iter().map(|(sender, _)| *sender))
        {
            if !senders.contains(&sender) {
                senders.push(sender);
            }
        }
        senders.sort_by_key(|sender| rank(&order, *sender));
        for sender in senders {
            let units = bundle_for(&unit_bundles, sender)
                .map(|units| unit_snapshots(committed, units))
                .unwrap_or_default();
            let forces = bundle_for(&force_bundles, sender)
                .map(|forces| force_snapshots(committed, forces))
                .unwrap_or_default();
            let message = if forces.is_empty() {
                if units.is_empty() {
                    continue;
                }
                Outbound::UpdateUnits { units }
            } else {
                Outbound::UpdateForces { forces, units }
            };
            out.push(Dispatch { sender, message });
        }

        for (sender, units) in partition(&order, &touched.removed_units, &table.units) {
            out.push(Dispatch {
                sender,
                message: Outbound::DeleteUnits { units },
            });
        }
        for (sender, forces) in partition(&order, &touched.removed_forces, &table.forces) {
            out.push(Dispatch {
                sender,
                message: Outbound::DeleteForces { forces },
            });
        }
    }

    /// Builds the message moving a local participant to another team.
    ///
    /// A team change is always submitted by the participant's own connection.
    #[must_use]
    pub fn team_change(
        &self,
        world: &World,
        player: PlayerId,
        team: Option<TeamId>,
    ) -> Option<Dispatch> {
        let sender = query::local_connections(world)
            .into_iter()
            .find(|connection| connection.player == player);
        if sender.is_none() {
            warn!("dropping team change for {player}: it is not hosted by this session");
        }
        sender.map(|sender| Dispatch {
            sender,
            message: Outbound::UpdateTeam { player, team },
        })
    }
}

/// Senders resolved for the units and forces touched by one batch.
///
/// `None` marks an entry no local connection may submit; it is dropped with a
/// warning when the batch is dispatched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoutingTable {
    /// Sender per unit.
    pub units: BTreeMap<UnitId, Option<SendingConnection>>,
    /// Sender per force.
    pub forces: BTreeMap<ForceId, Option<SendingConnection>>,
}

fn rank(order: &[SendingConnection], sender: SendingConnection) -> usize {
    order
        .iter()
        .position(|candidate| *candidate == sender)
        .unwrap_or(order.len())
}

fn bundle_for<K>(
    bundles: &[(SendingConnection, Vec<K>)],
    sender: SendingConnection,
) -> Option<&Vec<K>> {
    bundles
        .iter()
        .find(|(candidate, _)| *candidate == sender)
        .map(|(_, keys)| keys)
}

fn partition<'a, K>(
    order: &[SendingConnection],
    keys: impl IntoIterator<Item = &'a K>,
    senders: &BTreeMap<K, Option<SendingConnection>>,
) -> Vec<(SendingConnection, Vec<K>)>
where
    K: Copy + Ord + Display + 'a,
{
    let mut bundles: Vec<(SendingConnection, Vec<K>)> = Vec::new();
    for key in keys {
        let Some(sender) = senders.get(key).copied().flatten() else {
            warn!("dropping change for {key}: no local connection may submit it");
            continue;
        };
        match bundles.iter_mut().find(|(candidate, _)| *candidate == sender) {
            Some((_, bundle)) => bundle.push(*key),
            None => bundles.push((sender, vec![*key])),
        }
    }
    bundles.sort_by_key(|(sender, _)| rank(order, *sender));
    bundles
}

fn unit_snapshots(world: &World, units: &[UnitId]) -> Vec<UnitSnapshot> {
    units
        .iter()
        .filter_map(|unit| query::unit_snapshot(world, *unit))
        .collect()
}

fn force_snapshots(world: &World, forces: &[ForceId]) -> Vec<ForceSnapshot> {
    forces
        .iter()
        .filter_map(|force| query::force_snapshot(world, *force))
        .collect()
}

/// Transport used to submit outbound messages to the authoritative server.
pub trait MessageSink {
    /// Submits newly created units.
    fn send_add(&mut self, sender: SendingConnection, units: &[UnitSnapshot]);
    /// Submits unit updates that do not involve force changes.
    fn send_update(&mut self, sender: SendingConnection, units: &[UnitSnapshot]);
    /// Submits force updates together with the units whose membership changed.
    fn send_update_force(
        &mut self,
        sender: SendingConnection,
        forces: &[ForceSnapshot],
        units: &[UnitSnapshot],
    );
    /// Submits unit deletions.
    fn send_delete(&mut self, sender: SendingConnection, units: &[UnitId]);
    /// Submits force deletions.
    fn send_delete_forces(&mut self, sender: SendingConnection, forces: &[ForceId]);
    /// Submits a team change.
    fn send_team(&mut self, sender: SendingConnection, player: PlayerId, team: Option<TeamId>);
}

/// Hands every dispatch to the sink in order.
pub fn deliver<S>(dispatches: &[Dispatch], sink: &mut S)
where
    S: MessageSink + ?Sized,
{
    for dispatch in dispatches {
        let sender = dispatch.sender;
        match &dispatch.message {
            Outbound::AddUnits { units } => sink.send_add(sender, units),
            Outbound::UpdateUnits { units } => sink.send_update(sender, units),
            Outbound::UpdateForces { forces, units } => {
                sink.send_update_force(sender, forces, units);
            }
            Outbound::DeleteUnits { units } => sink.send_delete(sender, units),
            Outbound::DeleteForces { forces } => sink.send_delete_forces(sender, forces),
            Outbound::UpdateTeam { player, team } => sink.send_team(sender, *player, *team),
        }
    }
}
