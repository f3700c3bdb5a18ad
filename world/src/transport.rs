//! Transport graph: carrier/cargo planning and capacity checks.
//!
//! Loads are planned for the whole batch at once. Capacity is accounted per
//! cargo class (or per named bay) and any overflow rejects the batch before a
//! single command is produced.

use std::collections::{BTreeMap, BTreeSet};

use lobby_core::{
    BayCapacity, CargoClass, ClampPosition, Command, LobbyError, Placement, Transporter, UnitId,
    UnitKind, ULTRAHEAVY_PROTOMECH_TONS,
};
use log::debug;

use crate::{ownership, ownership::Allegiance, UnitState, World};

/// Plans unloading a unit from its carrier. Empty when the unit is not carried.
#[must_use]
pub fn plan_disembark(world: &World, unit: UnitId) -> Vec<Command> {
    match world.unit(unit).and_then(|state| state.carrier) {
        Some(_) => vec![Command::Disembark { unit }],
        None => Vec::new(),
    }
}

/// Plans unloading every unit a carrier transports.
#[must_use]
pub fn plan_offload(world: &World, carrier: UnitId) -> Vec<Command> {
    world
        .unit(carrier)
        .map(|state| {
            state
                .cargo
                .keys()
                .map(|unit| Command::Disembark { unit: *unit })
                .collect()
        })
        .unwrap_or_default()
}

/// Plans loading a batch of units onto a carrier.
///
/// With `bay` set the batch goes into that numbered bay regardless of cargo
/// class. Otherwise every cargo class is placed across the transporters
/// accepting it. Requests that cannot apply at all (unknown carrier, the
/// carrier among its own cargo, an enemy pairing, a class without a
/// transporter, an unknown bay) plan nothing.
pub fn plan_load(
    world: &World,
    units: &[UnitId],
    carrier: UnitId,
    bay: Option<u32>,
) -> Result<Vec<Command>, LobbyError> {
    let Some(host) = world.unit(carrier) else {
        debug!("load skipped: {carrier} does not exist");
        return Ok(Vec::new());
    };

    let mut batch: Vec<&UnitState> = Vec::new();
    for unit in units {
        let state = world.unit(*unit).ok_or(LobbyError::UnknownUnit(*unit))?;
        if !batch.iter().any(|queued| queued.id == state.id) {
            batch.push(state);
        }
    }
    if batch.is_empty() {
        return Ok(Vec::new());
    }
    if batch.iter().any(|state| state.id == carrier) {
        debug!("load skipped: {carrier} cannot carry itself");
        return Ok(Vec::new());
    }
    if batch
        .iter()
        .any(|state| ownership::is_enemy(world, state.owner, host.owner))
    {
        debug!("load skipped: {carrier} belongs to an enemy of the cargo");
        return Ok(Vec::new());
    }
    if carrier_chain(world, carrier)
        .iter()
        .any(|outer| batch.iter().any(|state| state.id == *outer))
    {
        debug!("load skipped: {carrier} already rides inside the cargo");
        return Ok(Vec::new());
    }

    let moving: BTreeSet<UnitId> = batch.iter().map(|state| state.id).collect();
    let occupancy = Occupancy::measure(world, host, &moving);

    let placements = match bay {
        Some(number) => match place_in_bay(host, &occupancy, number, &batch)? {
            Some(placements) => placements,
            None => {
                debug!("load skipped: {carrier} has no bay {number}");
                return Ok(Vec::new());
            }
        },
        None => {
            let mut classes: BTreeMap<CargoClass, Vec<&UnitState>> = BTreeMap::new();
            for state in batch.iter().copied() {
                classes
                    .entry(state.kind.cargo_class())
                    .or_default()
                    .push(state);
            }
            let mut placements = BTreeMap::new();
            for (class, group) in classes {
                match place_class(host, &occupancy, class, &group)? {
                    Some(placed) => placements.extend(placed),
                    None => {
                        debug!("load skipped: {carrier} cannot transport {class} units");
                        return Ok(Vec::new());
                    }
                }
            }
            placements
        }
    };

    let mut commands = Vec::new();
    for state in &batch {
        let Some(placement) = placements.get(&state.id) else {
            continue;
        };
        if state.carrier.is_some() {
            commands.push(Command::Disembark { unit: state.id });
        }
        commands.push(Command::Embark {
            unit: state.id,
            carrier,
            placement: *placement,
        });
    }
    Ok(commands)
}

/// Plans unloading every transport relation between the provided units and
/// units they would oppose under the projection.
#[must_use]
pub fn plan_sever(projection: &Allegiance<'_>, units: &BTreeSet<UnitId>) -> Vec<Command> {
    let world = projection.world();
    let mut leaving = BTreeSet::new();
    for unit in units {
        let Some(state) = world.unit(*unit) else {
            continue;
        };
        if let Some(embarkation) = state.carrier {
            if projection.units_hostile(*unit, embarkation.carrier) {
                let _ = leaving.insert(*unit);
            }
        }
        for cargo in state.cargo.keys() {
            if projection.units_hostile(*unit, *cargo) {
                let _ = leaving.insert(*cargo);
            }
        }
    }
    leaving
        .into_iter()
        .map(|unit| Command::Disembark { unit })
        .collect()
}

fn carrier_chain(world: &World, unit: UnitId) -> Vec<UnitId> {
    let mut chain = Vec::new();
    let mut cursor = world.unit(unit).and_then(|state| state.carrier);
    while let Some(embarkation) = cursor {
        if chain.contains(&embarkation.carrier) || chain.len() > world.units.len() {
            break;
        }
        chain.push(embarkation.carrier);
        cursor = world
            .unit(embarkation.carrier)
            .and_then(|state| state.carrier);
    }
    chain
}

/// Capacity already consumed on a carrier by cargo that stays aboard.
#[derive(Debug, Default)]
struct Occupancy {
    bays: BTreeMap<u32, u32>,
    troop_tons: f64,
    handles: u32,
    squadron: u32,
    front_clamp: Option<f64>,
    rear_clamp: bool,
}

impl Occupancy {
    fn measure(world: &World, host: &UnitState, moving: &BTreeSet<UnitId>) -> Self {
        let mut occupancy = Self::default();
        for (cargo, placement) in &host.cargo {
            if moving.contains(cargo) {
                continue;
            }
            let Some(state) = world.unit(*cargo) else {
                continue;
            };
            match placement {
                Placement::Bay(number) => {
                    let cost = bay_capacity(host, *number)
                        .map_or(1, |(_, capacity)| bay_cost(capacity, &state.kind));
                    *occupancy.bays.entry(*number).or_default() += cost;
                }
                Placement::TroopSpace => occupancy.troop_tons += state.weight,
                Placement::Handles => occupancy.handles += 1,
                Placement::Squadron => occupancy.squadron += 1,
                Placement::Clamp(ClampPosition::Front) => {
                    occupancy.front_clamp = Some(state.weight);
                }
                Placement::Clamp(ClampPosition::Rear) => occupancy.rear_clamp = true,
            }
        }
        occupancy
    }
}

fn bay_capacity(host: &UnitState, number: u32) -> Option<(CargoClass, BayCapacity)> {
    host.transporters.iter().find_map(|transporter| match transporter {
        Transporter::Bay {
            number: candidate,
            class,
            capacity,
        } if *candidate == number => Some((*class, *capacity)),
        _ => None,
    })
}

fn bay_cost(capacity: BayCapacity, kind: &UnitKind) -> u32 {
    match capacity {
        BayCapacity::Units(_) => 1,
        BayCapacity::Slots(_) => kind.bay_slots(),
    }
}

fn bay_limit(capacity: BayCapacity) -> u32 {
    match capacity {
        BayCapacity::Units(limit) | BayCapacity::Slots(limit) => limit,
    }
}

fn place_in_bay(
    host: &UnitState,
    occupancy: &Occupancy,
    number: u32,
    batch: &[&UnitState],
) -> Result<Option<BTreeMap<UnitId, Placement>>, LobbyError> {
    let Some((class, capacity)) = bay_capacity(host, number) else {
        return Ok(None);
    };
    let used = occupancy.bays.get(&number).copied().unwrap_or(0);
    let free = bay_limit(capacity).saturating_sub(used);
    let required: u32 = batch
        .iter()
        .map(|state| bay_cost(capacity, &state.kind))
        .sum();
    if required > free {
        return Err(LobbyError::CapacityExceeded {
            class,
            required: f64::from(required),
            available: f64::from(free),
        });
    }
    Ok(Some(
        batch
            .iter()
            .map(|state| (state.id, Placement::Bay(number)))
            .collect(),
    ))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Admits {
    Any,
    BattleArmor,
    Fighters,
}

/// A count- or slot-measured transporter with its remaining room.
#[derive(Clone, Copy, Debug)]
struct Berth {
    placement: Placement,
    free: u32,
    per_trooper: bool,
    admits: Admits,
}

impl Berth {
    fn cost(&self, kind: &UnitKind) -> Option<u32> {
        let admitted = match self.admits {
            Admits::Any => true,
            Admits::BattleArmor => kind.is_battle_armor(),
            Admits::Fighters => kind.is_fighter(),
        };
        if !admitted {
            return None;
        }
        Some(if self.per_trooper { kind.bay_slots() } else { 1 })
    }
}

fn berths(host: &UnitState, occupancy: &Occupancy, class: CargoClass) -> Vec<Berth> {
    let mut berths = Vec::new();
    for transporter in &host.transporters {
        match *transporter {
            Transporter::Bay {
                number,
                class: bay_class,
                capacity,
            } if bay_class == class => {
                let used = occupancy.bays.get(&number).copied().unwrap_or(0);
                berths.push(Berth {
                    placement: Placement::Bay(number),
                    free: bay_limit(capacity).saturating_sub(used),
                    per_trooper: matches!(capacity, BayCapacity::Slots(_)),
                    admits: Admits::Any,
                });
            }
            Transporter::InfantryHandles { squads } if class == CargoClass::Infantry => {
                berths.push(Berth {
                    placement: Placement::Handles,
                    free: squads.saturating_sub(occupancy.handles),
                    per_trooper: false,
                    admits: Admits::BattleArmor,
                });
            }
            Transporter::SquadronSlots { fighters } if class == CargoClass::AerospaceFighter => {
                berths.push(Berth {
                    placement: Placement::Squadron,
                    free: fighters.saturating_sub(occupancy.squadron),
                    per_trooper: false,
                    admits: Admits::Fighters,
                });
            }
            _ => {}
        }
    }
    berths
}

/// Places one cargo class. `Ok(None)` means the carrier offers nothing for it.
fn place_class(
    host: &UnitState,
    occupancy: &Occupancy,
    class: CargoClass,
    group: &[&UnitState],
) -> Result<Option<BTreeMap<UnitId, Placement>>, LobbyError> {
    let mut berths = berths(host, occupancy, class);

    match class {
        CargoClass::Infantry => place_infantry(host, occupancy, &mut berths, group),
        CargoClass::ProtoMech => place_proto_mechs(host, occupancy, &mut berths, group),
        _ if berths.is_empty() => Ok(None),
        _ => {
            let (placed, unplaced) = first_fit(&mut berths, group);
            if unplaced > 0 {
                return Err(shortfall(class, group.len(), unplaced));
            }
            Ok(Some(placed))
        }
    }
}

/// Infantry is sized per unit: by count when some berth admits it, otherwise
/// by tonnage against troop space.
fn place_infantry(
    host: &UnitState,
    occupancy: &Occupancy,
    berths: &mut [Berth],
    group: &[&UnitState],
) -> Result<Option<BTreeMap<UnitId, Placement>>, LobbyError> {
    let (counted, weighed): (Vec<&UnitState>, Vec<&UnitState>) = group
        .iter()
        .copied()
        .partition(|state| berths.iter().any(|berth| berth.cost(&state.kind).is_some()));

    let (mut placed, unplaced) = first_fit(berths, &counted);
    if unplaced > 0 {
        return Err(shortfall(CargoClass::Infantry, counted.len(), unplaced));
    }
    if weighed.is_empty() {
        return Ok(Some(placed));
    }
    match place_by_tonnage(host, occupancy, &weighed)? {
        Some(in_troop_space) => {
            placed.extend(in_troop_space);
            Ok(Some(placed))
        }
        None if counted.is_empty() => Ok(None),
        None => Err(shortfall(CargoClass::Infantry, group.len(), weighed.len())),
    }
}

fn first_fit(berths: &mut [Berth], group: &[&UnitState]) -> (BTreeMap<UnitId, Placement>, usize) {
    let mut placed = BTreeMap::new();
    let mut unplaced = 0;
    for state in group {
        let mut fitted = false;
        for berth in berths.iter_mut() {
            if let Some(cost) = berth.cost(&state.kind).filter(|cost| *cost <= berth.free) {
                berth.free -= cost;
                let _ = placed.insert(state.id, berth.placement);
                fitted = true;
                break;
            }
        }
        if !fitted {
            unplaced += 1;
        }
    }
    (placed, unplaced)
}

fn shortfall(class: CargoClass, required: usize, unplaced: usize) -> LobbyError {
    let required = u32::try_from(required).unwrap_or(u32::MAX);
    let unplaced = u32::try_from(unplaced).unwrap_or(u32::MAX);
    LobbyError::CapacityExceeded {
        class,
        required: f64::from(required),
        available: f64::from(required.saturating_sub(unplaced)),
    }
}

fn place_by_tonnage(
    host: &UnitState,
    occupancy: &Occupancy,
    group: &[&UnitState],
) -> Result<Option<BTreeMap<UnitId, Placement>>, LobbyError> {
    let capacity: f64 = host
        .transporters
        .iter()
        .map(|transporter| match transporter {
            Transporter::TroopSpace { tons } => *tons,
            _ => 0.0,
        })
        .sum();
    if capacity <= 0.0 {
        return Ok(None);
    }

    let free = (capacity - occupancy.troop_tons).max(0.0);
    let required: f64 = group.iter().map(|state| state.weight).sum();
    if required > free {
        return Err(LobbyError::CapacityExceeded {
            class: CargoClass::Infantry,
            required,
            available: free,
        });
    }
    Ok(Some(
        group
            .iter()
            .map(|state| (state.id, Placement::TroopSpace))
            .collect(),
    ))
}

fn place_proto_mechs(
    host: &UnitState,
    occupancy: &Occupancy,
    berths: &mut [Berth],
    group: &[&UnitState],
) -> Result<Option<BTreeMap<UnitId, Placement>>, LobbyError> {
    let (has_front, has_rear) = if host.kind.is_two_legged() {
        host.transporters
            .iter()
            .fold((false, false), |(front, rear), transporter| match transporter {
                Transporter::ProtoMechClamp { rear: true } => (front, true),
                Transporter::ProtoMechClamp { rear: false } => (true, rear),
                _ => (front, rear),
            })
    } else {
        (false, false)
    };
    if berths.is_empty() && !has_front && !has_rear {
        return Ok(None);
    }

    let mut ordered = group.to_vec();
    ordered.sort_by(|a, b| b.weight.total_cmp(&a.weight));

    let mut placed = BTreeMap::new();
    let mut front_taken = occupancy.front_clamp.is_some();
    let mut rear_taken = occupancy.rear_clamp;
    let mut front_ultraheavy = occupancy
        .front_clamp
        .is_some_and(|weight| weight > ULTRAHEAVY_PROTOMECH_TONS);
    let mut unplaced = 0;

    for state in ordered {
        let (in_bay, missed) = first_fit(berths, &[state]);
        if missed == 0 {
            placed.extend(in_bay);
            continue;
        }

        // An ultraheavy rides the front mount and blocks the rear one.
        let ultraheavy = state.weight > ULTRAHEAVY_PROTOMECH_TONS;
        if has_front && !front_taken && !(ultraheavy && rear_taken) {
            front_taken = true;
            front_ultraheavy = ultraheavy;
            let _ = placed.insert(state.id, Placement::Clamp(ClampPosition::Front));
        } else if has_rear && !rear_taken && !ultraheavy && !front_ultraheavy {
            rear_taken = true;
            let _ = placed.insert(state.id, Placement::Clamp(ClampPosition::Rear));
        } else {
            unplaced += 1;
        }
    }

    if unplaced > 0 {
        return Err(shortfall(CargoClass::ProtoMech, group.len(), unplaced));
    }
    Ok(Some(placed))
}
