#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Local lobby state: the roster, the units and the force tree.
//!
//! The world is the session's cache of the authoritative match state. It is
//! mutated exclusively through [`apply`], which commits one primitive
//! [`Command`] and reports every unit or force it touched. The graph modules
//! ([`ownership`], [`transport`], [`forces`], [`c3`]) only read the world and
//! plan command batches, so a batch can be validated in full before anything
//! is committed.

use std::collections::{BTreeMap, BTreeSet};

use lobby_core::{
    C3Kind, C3Node, Command, ConnectionKind, Crew, Deployment, Embarkation, Event, ForceId,
    LobbyOptions, NetworkId, Placement, PlayerId, Shift, TeamId, Transporter, UnitId, UnitKind,
    UnitSpec,
};
use log::debug;

pub mod c3;
pub mod forces;
pub mod ownership;
pub mod transport;

/// Represents the session's view of the lobby.
#[derive(Clone, Debug, Default)]
pub struct World {
    options: LobbyOptions,
    players: BTreeMap<PlayerId, PlayerState>,
    operator: Option<PlayerId>,
    automated: Vec<PlayerId>,
    pub(crate) units: BTreeMap<UnitId, UnitState>,
    pub(crate) forces: BTreeMap<ForceId, ForceState>,
    top_level: Vec<ForceId>,
    next_unit_id: u32,
    next_force_id: u32,
    next_network_id: u32,
}

impl World {
    /// Creates an empty lobby with default options and no participants.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn team_of(&self, player: PlayerId) -> Option<Option<TeamId>> {
        self.players.get(&player).map(|state| state.team)
    }

    pub(crate) fn unit(&self, unit: UnitId) -> Option<&UnitState> {
        self.units.get(&unit)
    }

    pub(crate) fn force(&self, force: ForceId) -> Option<&ForceState> {
        self.forces.get(&force)
    }

    fn allocate_network(&mut self) -> NetworkId {
        self.next_network_id = self.next_network_id.saturating_add(1);
        NetworkId::new(self.next_network_id)
    }

    fn add_unit(&mut self, unit: UnitId, spec: UnitSpec, out_events: &mut Vec<Event>) {
        if self.units.contains_key(&unit) {
            debug!("ignoring duplicate registration of {unit}");
            return;
        }

        let c3 = match spec.c3 {
            Some(C3Kind::Shared) => {
                let mut node = C3Node::unlinked(C3Kind::Shared);
                node.network = Some(self.allocate_network());
                Some(node)
            }
            Some(kind) => Some(C3Node::unlinked(kind)),
            None => None,
        };

        self.next_unit_id = self.next_unit_id.max(unit.get().saturating_add(1));
        let _ = self.units.insert(
            unit,
            UnitState {
                id: unit,
                owner: spec.owner,
                kind: spec.kind,
                weight: spec.weight,
                carrier: None,
                cargo: BTreeMap::new(),
                force: None,
                transporters: spec.transporters,
                c3,
                crew: spec.crew,
                deployment: spec.deployment,
            },
        );
        out_events.push(Event::UnitAdded { unit });
    }

    fn remove_unit(&mut self, unit: UnitId, out_events: &mut Vec<Event>) {
        if !self.units.contains_key(&unit) {
            return;
        }

        self.detach_from_carrier(unit, out_events);
        let cargo: Vec<UnitId> = self
            .units
            .get(&unit)
            .map(|state| state.cargo.keys().copied().collect())
            .unwrap_or_default();
        for passenger in cargo {
            self.detach_from_carrier(passenger, out_events);
        }
        self.detach_from_force(unit, out_events);

        let dependents: Vec<UnitId> = self
            .units
            .values()
            .filter(|state| state.c3.and_then(|node| node.master) == Some(unit))
            .map(|state| state.id)
            .collect();
        for dependent in dependents {
            if let Some(node) = self.c3_mut(dependent) {
                node.master = None;
                out_events.push(Event::UnitChanged { unit: dependent });
            }
        }

        let _ = self.units.remove(&unit);
        out_events.push(Event::UnitRemoved { unit });
    }

    fn embark(
        &mut self,
        unit: UnitId,
        carrier: UnitId,
        placement: Placement,
        out_events: &mut Vec<Event>,
    ) {
        if unit == carrier || !self.units.contains_key(&unit) || !self.units.contains_key(&carrier)
        {
            debug!("ignoring embark of {unit} onto {carrier}");
            return;
        }

        self.detach_from_carrier(unit, out_events);
        if let Some(state) = self.units.get_mut(&carrier) {
            let _ = state.cargo.insert(unit, placement);
        }
        if let Some(state) = self.units.get_mut(&unit) {
            state.carrier = Some(Embarkation { carrier, placement });
        }
        out_events.push(Event::UnitChanged { unit });
        out_events.push(Event::UnitChanged { unit: carrier });
    }

    fn detach_from_carrier(&mut self, unit: UnitId, out_events: &mut Vec<Event>) {
        let Some(embarkation) = self.units.get_mut(&unit).and_then(|state| state.carrier.take())
        else {
            return;
        };

        if let Some(carrier) = self.units.get_mut(&embarkation.carrier) {
            let _ = carrier.cargo.remove(&unit);
        }
        out_events.push(Event::UnitChanged { unit });
        out_events.push(Event::UnitChanged {
            unit: embarkation.carrier,
        });
    }

    fn assign_force(&mut self, unit: UnitId, force: Option<ForceId>, out_events: &mut Vec<Event>) {
        if !self.units.contains_key(&unit) {
            return;
        }
        if let Some(target) = force {
            if !self.forces.contains_key(&target) {
                debug!("ignoring assignment of {unit} to missing {target}");
                return;
            }
        }

        self.detach_from_force(unit, out_events);
        if let Some(target) = force {
            if let Some(state) = self.forces.get_mut(&target) {
                state.units.push(unit);
            }
            if let Some(state) = self.units.get_mut(&unit) {
                state.force = Some(target);
            }
            out_events.push(Event::ForceChanged { force: target });
            out_events.push(Event::UnitChanged { unit });
        }
    }

    fn detach_from_force(&mut self, unit: UnitId, out_events: &mut Vec<Event>) {
        let Some(force) = self.units.get_mut(&unit).and_then(|state| state.force.take()) else {
            return;
        };

        if let Some(state) = self.forces.get_mut(&force) {
            state.units.retain(|member| *member != unit);
        }
        out_events.push(Event::ForceChanged { force });
        out_events.push(Event::UnitChanged { unit });
    }

    fn create_force(
        &mut self,
        force: ForceId,
        name: String,
        parent: Option<ForceId>,
        owner: PlayerId,
        out_events: &mut Vec<Event>,
    ) {
        if self.forces.contains_key(&force) {
            debug!("ignoring duplicate creation of {force}");
            return;
        }
        let parent = parent.filter(|candidate| self.forces.contains_key(candidate));

        self.next_force_id = self.next_force_id.max(force.get().saturating_add(1));
        let _ = self.forces.insert(
            force,
            ForceState {
                id: force,
                name,
                parent,
                owner,
                sub_forces: Vec::new(),
                units: Vec::new(),
            },
        );
        self.link_child(force, parent, out_events);
        out_events.push(Event::ForceChanged { force });
    }

    fn reparent_force(
        &mut self,
        force: ForceId,
        parent: Option<ForceId>,
        out_events: &mut Vec<Event>,
    ) {
        let Some(current) = self.forces.get(&force).map(|state| state.parent) else {
            return;
        };
        if current == parent {
            return;
        }
        if let Some(target) = parent {
            let descendants = forces::full_sub_forces(self, force);
            if target == force
                || descendants.contains(&target)
                || !self.forces.contains_key(&target)
            {
                debug!("ignoring reparent of {force} below {target}");
                return;
            }
        }

        self.unlink_child(force, current, out_events);
        if let Some(state) = self.forces.get_mut(&force) {
            state.parent = parent;
        }
        self.link_child(force, parent, out_events);
        out_events.push(Event::ForceChanged { force });
    }

    fn link_child(&mut self, force: ForceId, parent: Option<ForceId>, out_events: &mut Vec<Event>) {
        match parent {
            Some(parent) => {
                if let Some(state) = self.forces.get_mut(&parent) {
                    state.sub_forces.push(force);
                    out_events.push(Event::ForceChanged { force: parent });
                }
            }
            None => self.top_level.push(force),
        }
    }

    fn unlink_child(
        &mut self,
        force: ForceId,
        parent: Option<ForceId>,
        out_events: &mut Vec<Event>,
    ) {
        match parent {
            Some(parent) => {
                if let Some(state) = self.forces.get_mut(&parent) {
                    state.sub_forces.retain(|child| *child != force);
                    out_events.push(Event::ForceChanged { force: parent });
                }
            }
            None => self.top_level.retain(|top| *top != force),
        }
    }

    fn remove_force(&mut self, force: ForceId, out_events: &mut Vec<Event>) {
        let Some(state) = self.forces.get(&force) else {
            return;
        };
        let parent = state.parent;
        let members = state.units.clone();
        let children = state.sub_forces.clone();

        for unit in members {
            self.detach_from_force(unit, out_events);
        }
        for child in children {
            self.reparent_force(child, None, out_events);
        }
        self.unlink_child(force, parent, out_events);
        let _ = self.forces.remove(&force);
        out_events.push(Event::ForceRemoved { force });
    }

    fn move_force(&mut self, force: ForceId, shift: Shift, out_events: &mut Vec<Event>) {
        let Some(parent) = self.forces.get(&force).map(|state| state.parent) else {
            return;
        };
        let siblings = match parent {
            Some(parent) => match self.forces.get_mut(&parent) {
                Some(state) => &mut state.sub_forces,
                None => return,
            },
            None => &mut self.top_level,
        };
        if shift_within(siblings, force, shift) {
            out_events.push(Event::ForceChanged {
                force: parent.unwrap_or(force),
            });
        }
    }

    fn move_unit(&mut self, unit: UnitId, shift: Shift, out_events: &mut Vec<Event>) {
        let Some(force) = self.units.get(&unit).and_then(|state| state.force) else {
            return;
        };
        if let Some(state) = self.forces.get_mut(&force) {
            if shift_within(&mut state.units, unit, shift) {
                out_events.push(Event::ForceChanged { force });
            }
        }
    }

    fn c3_mut(&mut self, unit: UnitId) -> Option<&mut C3Node> {
        self.units
            .get_mut(&unit)
            .and_then(|state| state.c3.as_mut())
    }

    fn set_c3_master(&mut self, unit: UnitId, master: Option<UnitId>, out_events: &mut Vec<Event>) {
        if master.is_some_and(|candidate| !self.units.contains_key(&candidate)) {
            debug!("ignoring C3 link of {unit} to a missing master");
            return;
        }
        if let Some(node) = self.c3_mut(unit) {
            if node.kind.is_hierarchical() && node.master != master {
                node.master = master;
                out_events.push(Event::UnitChanged { unit });
            }
        }
    }

    fn join_c3_network(&mut self, unit: UnitId, network: NetworkId, out_events: &mut Vec<Event>) {
        if let Some(node) = self.c3_mut(unit) {
            if node.kind == C3Kind::Shared && node.network != Some(network) {
                node.network = Some(network);
                out_events.push(Event::UnitChanged { unit });
            }
        }
    }

    fn leave_c3_network(&mut self, unit: UnitId, out_events: &mut Vec<Event>) {
        let shared = self
            .units
            .get(&unit)
            .and_then(|state| state.c3)
            .is_some_and(|node| node.kind == C3Kind::Shared);
        if !shared {
            return;
        }
        let network = self.allocate_network();
        if let Some(node) = self.c3_mut(unit) {
            node.network = Some(network);
            out_events.push(Event::UnitChanged { unit });
        }
    }

    fn set_company_commander(
        &mut self,
        unit: UnitId,
        commander: bool,
        out_events: &mut Vec<Event>,
    ) {
        if let Some(node) = self.c3_mut(unit) {
            if node.kind == C3Kind::Master && node.company_commander != commander {
                node.company_commander = commander;
                out_events.push(Event::UnitChanged { unit });
            }
        }
    }

    fn update_unit<F>(&mut self, unit: UnitId, out_events: &mut Vec<Event>, update: F)
    where
        F: FnOnce(&mut UnitState),
    {
        if let Some(state) = self.units.get_mut(&unit) {
            update(state);
            out_events.push(Event::UnitChanged { unit });
        }
    }
}

/// Applies the provided command to the world, reporting every touched unit and force.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureOptions { options } => {
            world.options = options;
            out_events.push(Event::OptionsChanged);
        }
        Command::AddPlayer {
            player,
            name,
            team,
            local,
        } => {
            let _ = world.players.insert(player, PlayerState { name, team });
            match local {
                Some(ConnectionKind::Operator) => world.operator = Some(player),
                Some(ConnectionKind::Automated) => {
                    if !world.automated.contains(&player) {
                        world.automated.push(player);
                    }
                }
                None => {}
            }
            out_events.push(Event::PlayerChanged { player });
        }
        Command::SetTeam { player, team } => {
            if let Some(state) = world.players.get_mut(&player) {
                state.team = team;
                out_events.push(Event::PlayerChanged { player });
            }
        }
        Command::AddUnit { unit, spec } => world.add_unit(unit, spec, out_events),
        Command::RemoveUnit { unit } => world.remove_unit(unit, out_events),
        Command::Embark {
            unit,
            carrier,
            placement,
        } => world.embark(unit, carrier, placement, out_events),
        Command::Disembark { unit } => world.detach_from_carrier(unit, out_events),
        Command::SetOwner { unit, owner } => {
            world.update_unit(unit, out_events, |state| state.owner = owner);
        }
        Command::AssignForce { unit, force } => world.assign_force(unit, force, out_events),
        Command::CreateForce {
            force,
            name,
            parent,
            owner,
        } => world.create_force(force, name, parent, owner, out_events),
        Command::RenameForce { force, name } => {
            if let Some(state) = world.forces.get_mut(&force) {
                state.name = name;
                out_events.push(Event::ForceChanged { force });
            }
        }
        Command::ReparentForce { force, parent } => world.reparent_force(force, parent, out_events),
        Command::SetForceOwner { force, owner } => {
            if let Some(state) = world.forces.get_mut(&force) {
                state.owner = owner;
                out_events.push(Event::ForceChanged { force });
            }
        }
        Command::RemoveForce { force } => world.remove_force(force, out_events),
        Command::MoveForce { force, shift } => world.move_force(force, shift, out_events),
        Command::MoveUnit { unit, shift } => world.move_unit(unit, shift, out_events),
        Command::SetC3Master { unit, master } => world.set_c3_master(unit, master, out_events),
        Command::JoinC3Network { unit, network } => {
            world.join_c3_network(unit, network, out_events);
        }
        Command::LeaveC3Network { unit } => world.leave_c3_network(unit, out_events),
        Command::SetCompanyCommander { unit, commander } => {
            world.set_company_commander(unit, commander, out_events);
        }
        Command::SetCrew { unit, crew } => {
            world.update_unit(unit, out_events, |state| state.crew = crew);
        }
        Command::SetDeployment { unit, deployment } => {
            world.update_unit(unit, out_events, |state| state.deployment = deployment);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use lobby_core::{
        ConnectionKind, ForceId, ForceSnapshot, LobbyOptions, PlayerId, SendingConnection, TeamId,
        UnitId, UnitKind, UnitSnapshot,
    };

    use super::World;

    /// Provides read-only access to the active match options.
    #[must_use]
    pub fn options(world: &World) -> &LobbyOptions {
        &world.options
    }

    /// Participant operated by the human running this session, if registered.
    #[must_use]
    pub fn operator(world: &World) -> Option<PlayerId> {
        world.operator
    }

    /// Local sending connections, the operator first and automated players in hosting order.
    #[must_use]
    pub fn local_connections(world: &World) -> Vec<SendingConnection> {
        let operator = world.operator.map(|player| SendingConnection {
            player,
            kind: ConnectionKind::Operator,
        });
        operator
            .into_iter()
            .chain(world.automated.iter().map(|player| SendingConnection {
                player: *player,
                kind: ConnectionKind::Automated,
            }))
            .collect()
    }

    /// Team of the provided participant; `None` when the participant is unknown.
    #[must_use]
    pub fn team(world: &World, player: PlayerId) -> Option<Option<TeamId>> {
        world.team_of(player)
    }

    /// Display name of the provided participant.
    #[must_use]
    pub fn player_name(world: &World, player: PlayerId) -> Option<&str> {
        world.players.get(&player).map(|state| state.name.as_str())
    }

    /// Identifiers of every registered participant in ascending order.
    #[must_use]
    pub fn players(world: &World) -> Vec<PlayerId> {
        world.players.keys().copied().collect()
    }

    /// Identifiers of every unit in ascending order.
    #[must_use]
    pub fn unit_ids(world: &World) -> Vec<UnitId> {
        world.units.keys().copied().collect()
    }

    /// Units owned by the provided participant.
    #[must_use]
    pub fn units_owned_by(world: &World, player: PlayerId) -> Vec<UnitId> {
        world
            .units
            .values()
            .filter(|state| state.owner == player)
            .map(|state| state.id)
            .collect()
    }

    /// Owner of the provided unit.
    #[must_use]
    pub fn unit_owner(world: &World, unit: UnitId) -> Option<PlayerId> {
        world.unit(unit).map(|state| state.owner)
    }

    /// Type of the provided unit.
    #[must_use]
    pub fn unit_kind(world: &World, unit: UnitId) -> Option<UnitKind> {
        world.unit(unit).map(|state| state.kind)
    }

    /// Carrier transporting the provided unit, if any.
    #[must_use]
    pub fn carrier_of(world: &World, unit: UnitId) -> Option<UnitId> {
        world
            .unit(unit)
            .and_then(|state| state.carrier)
            .map(|embarkation| embarkation.carrier)
    }

    /// Units transported by the provided carrier.
    #[must_use]
    pub fn cargo_of(world: &World, carrier: UnitId) -> Vec<UnitId> {
        world
            .unit(carrier)
            .map(|state| state.cargo.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Force the provided unit belongs to, if any.
    #[must_use]
    pub fn force_of(world: &World, unit: UnitId) -> Option<ForceId> {
        world.unit(unit).and_then(|state| state.force)
    }

    /// Owner of the provided force.
    #[must_use]
    pub fn force_owner(world: &World, force: ForceId) -> Option<PlayerId> {
        world.force(force).map(|state| state.owner)
    }

    /// Identifiers of every force in ascending order.
    #[must_use]
    pub fn force_ids(world: &World) -> Vec<ForceId> {
        world.forces.keys().copied().collect()
    }

    /// Top-level forces in display order.
    #[must_use]
    pub fn top_level_forces(world: &World) -> &[ForceId] {
        &world.top_level
    }

    /// Captures a read-only snapshot of the provided unit.
    #[must_use]
    pub fn unit_snapshot(world: &World, unit: UnitId) -> Option<UnitSnapshot> {
        world.unit(unit).map(|state| UnitSnapshot {
            id: state.id,
            owner: state.owner,
            kind: state.kind,
            weight: state.weight,
            carrier: state.carrier,
            cargo: state
                .cargo
                .iter()
                .map(|(unit, placement)| (*unit, *placement))
                .collect(),
            force: state.force,
            c3: state.c3,
            crew: state.crew.clone(),
            deployment: state.deployment,
        })
    }

    /// Captures a read-only snapshot of the provided force.
    #[must_use]
    pub fn force_snapshot(world: &World, force: ForceId) -> Option<ForceSnapshot> {
        world.force(force).map(|state| ForceSnapshot {
            id: state.id,
            name: state.name.clone(),
            parent: state.parent,
            owner: state.owner,
            sub_forces: state.sub_forces.clone(),
            units: state.units.clone(),
        })
    }

    /// Identifier the next locally created unit should receive.
    #[must_use]
    pub fn next_unit_id(world: &World) -> UnitId {
        UnitId::new(world.next_unit_id)
    }

    /// Identifier the next locally created force should receive.
    #[must_use]
    pub fn next_force_id(world: &World) -> ForceId {
        ForceId::new(world.next_force_id)
    }
}

#[derive(Clone, Debug)]
struct PlayerState {
    name: String,
    team: Option<TeamId>,
}

#[derive(Clone, Debug)]
pub(crate) struct UnitState {
    pub(crate) id: UnitId,
    pub(crate) owner: PlayerId,
    pub(crate) kind: UnitKind,
    pub(crate) weight: f64,
    pub(crate) carrier: Option<Embarkation>,
    pub(crate) cargo: BTreeMap<UnitId, Placement>,
    pub(crate) force: Option<ForceId>,
    pub(crate) transporters: Vec<Transporter>,
    pub(crate) c3: Option<C3Node>,
    pub(crate) crew: Crew,
    pub(crate) deployment: Deployment,
}

#[derive(Clone, Debug)]
pub(crate) struct ForceState {
    pub(crate) id: ForceId,
    pub(crate) name: String,
    pub(crate) parent: Option<ForceId>,
    pub(crate) owner: PlayerId,
    pub(crate) sub_forces: Vec<ForceId>,
    pub(crate) units: Vec<UnitId>,
}

fn shift_within<T: PartialEq + Copy>(items: &mut [T], item: T, shift: Shift) -> bool {
    let Some(index) = items.iter().position(|candidate| *candidate == item) else {
        return false;
    };
    let target = match shift {
        Shift::Up if index > 0 => index - 1,
        Shift::Down if index + 1 < items.len() => index + 1,
        _ => return false,
    };
    items.swap(index, target);
    true
}

/// Collects the distinct units and forces reported by a batch of events.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Touched {
    /// Units that were added.
    pub added_units: BTreeSet<UnitId>,
    /// Units that changed and still exist.
    pub units: BTreeSet<UnitId>,
    /// Forces that changed and still exist.
    pub forces: BTreeSet<ForceId>,
    /// Units that were removed.
    pub removed_units: BTreeSet<UnitId>,
    /// Forces that were removed.
    pub removed_forces: BTreeSet<ForceId>,
    /// Participants that were registered or changed team.
    pub players: BTreeSet<PlayerId>,
}

impl Touched {
    /// Folds a batch of events into the distinct touched sets.
    #[must_use]
    pub fn from_events(events: &[Event]) -> Self {
        let mut touched = Self::default();
        for event in events {
            match *event {
                Event::UnitAdded { unit } => {
                    let _ = touched.added_units.insert(unit);
                }
                Event::UnitChanged { unit } => {
                    let _ = touched.units.insert(unit);
                }
                Event::UnitRemoved { unit } => {
                    let _ = touched.removed_units.insert(unit);
                }
                Event::ForceChanged { force } => {
                    let _ = touched.forces.insert(force);
                }
                Event::ForceRemoved { force } => {
                    let _ = touched.removed_forces.insert(force);
                }
                Event::PlayerChanged { player } => {
                    let _ = touched.players.insert(player);
                }
                Event::OptionsChanged => {}
            }
        }

        for unit in &touched.removed_units {
            let _ = touched.units.remove(unit);
            let _ = touched.added_units.remove(unit);
        }
        for unit in &touched.added_units {
            let _ = touched.units.remove(unit);
        }
        for force in &touched.removed_forces {
            let _ = touched.forces.remove(force);
        }
        touched
    }

    /// Reports whether no unit or force was touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added_units.is_empty()
            && self.units.is_empty()
            && self.forces.is_empty()
            && self.removed_units.is_empty()
            && self.removed_forces.is_empty()
    }
}
