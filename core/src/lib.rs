#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the lobby engine.
//!
//! This crate defines the message surface that connects adapters, the local
//! lobby world, and the action and routing systems. Systems plan composite
//! lobby actions as batches of primitive [`Command`] values, the world commits
//! those commands via its `apply` entry point and reports every unit or force
//! it touched as [`Event`] values, and the router turns the touched set into
//! [`Outbound`] messages attributed to one [`SendingConnection`] each.

use std::fmt;

use serde::{Deserialize, Serialize};

mod error;

pub use error::{C3Rule, LobbyError};

/// Maximum number of nodes a master/slave C3 network may contain.
pub const C3_MAX_NODES: usize = 12;

/// Maximum number of nodes a shared (flat) C3 network may contain.
pub const SHARED_C3_MAX_NODES: usize = 5;

/// Maximum number of hierarchy levels below a master/slave network's head.
pub const C3_MAX_DEPTH: usize = 2;

/// Maximum number of units that may link directly to a single C3 master.
pub const C3_MAX_DEPENDENTS: usize = 3;

/// Proto-mechs heavier than this weight (in tons) need the superheavy-capable front clamp.
pub const ULTRAHEAVY_PROTOMECH_TONS: f64 = 9.0;

/// Unique identifier assigned to a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit #{}", self.0)
    }
}

/// Unique identifier assigned to a force.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ForceId(u32);

impl ForceId {
    /// Creates a new force identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ForceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "force #{}", self.0)
    }
}

/// Unique identifier assigned to a match participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Creates a new player identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player #{}", self.0)
    }
}

/// Team a participant fights on. Participants without a team fight alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(u32);

impl TeamId {
    /// Creates a new team identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a shared (flat) C3 network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetworkId(u32);

impl NetworkId {
    /// Creates a new network identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Capacity class a unit occupies when transported.
///
/// Carriers track capacity per class rather than globally.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CargoClass {
    /// Battle mechs of any leg configuration.
    Mech,
    /// Conventional infantry and battle armor.
    Infantry,
    /// Proto-mechs.
    ProtoMech,
    /// Dropships, carried on docking collars.
    DropShip,
    /// Jumpships.
    JumpShip,
    /// Aerospace fighters and fighter squadrons.
    AerospaceFighter,
    /// Tracked, wheeled and hover vehicles.
    GroundVehicle,
    /// Everything else.
    Other,
}

impl fmt::Display for CargoClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Mech => "mech",
            Self::Infantry => "infantry",
            Self::ProtoMech => "proto-mech",
            Self::DropShip => "dropship",
            Self::JumpShip => "jumpship",
            Self::AerospaceFighter => "aerospace fighter",
            Self::GroundVehicle => "ground vehicle",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

/// Closed set of unit types the lobby distinguishes.
///
/// The variant is used purely for dispatch; capability questions go through
/// the query methods instead of matching on the variant at call sites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnitKind {
    /// A battle mech.
    Mech {
        /// Whether the mech stands on two legs, which enables proto-mech clamps.
        #[serde(default = "default_bipedal")]
        bipedal: bool,
    },
    /// A proto-mech.
    ProtoMech,
    /// A conventional infantry platoon or battle armor squad.
    Infantry {
        /// Whether the unit is battle armor rather than conventional infantry.
        #[serde(default)]
        battle_armor: bool,
        /// Number of troopers in the squad or platoon.
        #[serde(default = "default_troopers")]
        troopers: u32,
    },
    /// A tracked, wheeled or hover vehicle.
    GroundVehicle,
    /// A single aerospace fighter.
    AerospaceFighter,
    /// A squadron grouping several aerospace fighters.
    FighterSquadron,
    /// A dropship.
    DropShip,
    /// A jumpship.
    JumpShip,
    /// Any unit type without dedicated transport rules.
    Other,
}

fn default_bipedal() -> bool {
    true
}

fn default_troopers() -> u32 {
    1
}

impl UnitKind {
    /// Capacity class the unit occupies when loaded onto a carrier.
    #[must_use]
    pub const fn cargo_class(&self) -> CargoClass {
        match self {
            Self::Mech { .. } => CargoClass::Mech,
            Self::ProtoMech => CargoClass::ProtoMech,
            Self::Infantry { .. } => CargoClass::Infantry,
            Self::GroundVehicle => CargoClass::GroundVehicle,
            Self::AerospaceFighter | Self::FighterSquadron => CargoClass::AerospaceFighter,
            Self::DropShip => CargoClass::DropShip,
            Self::JumpShip => CargoClass::JumpShip,
            Self::Other => CargoClass::Other,
        }
    }

    /// Reports whether the unit is a single aerospace fighter.
    #[must_use]
    pub const fn is_fighter(&self) -> bool {
        matches!(self, Self::AerospaceFighter)
    }

    /// Reports whether the unit is a two-legged mech able to mount proto-mech clamps.
    #[must_use]
    pub const fn is_two_legged(&self) -> bool {
        matches!(self, Self::Mech { bipedal: true })
    }

    /// Reports whether the unit is battle armor.
    #[must_use]
    pub const fn is_battle_armor(&self) -> bool {
        matches!(
            self,
            Self::Infantry {
                battle_armor: true,
                ..
            }
        )
    }

    /// Reports whether troop space measured in tons can hold the unit.
    #[must_use]
    pub const fn uses_tonnage_cargo(&self) -> bool {
        matches!(self, Self::Infantry { .. })
    }

    /// Number of slots the unit consumes inside a slot-measured bay.
    ///
    /// Battle armor squads consume one slot per trooper; everything else
    /// consumes a single slot.
    #[must_use]
    pub const fn bay_slots(&self) -> u32 {
        match self {
            Self::Infantry {
                battle_armor: true,
                troopers,
            } => {
                if *troopers == 0 {
                    1
                } else {
                    *troopers
                }
            }
            _ => 1,
        }
    }
}

/// Measure used by a transport bay to account for its contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BayCapacity {
    /// The bay holds up to this many units regardless of their size.
    Units(u32),
    /// The bay holds units until their combined slot cost reaches this value.
    Slots(u32),
}

/// Transport capability offered by a carrier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transporter {
    /// A numbered bay dedicated to a single cargo class.
    Bay {
        /// Bay number used to address the bay explicitly.
        number: u32,
        /// Cargo class the bay accepts.
        class: CargoClass,
        /// Capacity of the bay and the measure it uses.
        capacity: BayCapacity,
    },
    /// Internal troop space measured in tons; holds infantry of any kind.
    TroopSpace {
        /// Total tonnage the troop space can hold.
        tons: f64,
    },
    /// External handles that battle armor squads ride on.
    InfantryHandles {
        /// Number of squads the handles can hold.
        squads: u32,
    },
    /// A magnetic clamp mount that holds a single proto-mech.
    ProtoMechClamp {
        /// Whether the clamp is mounted on the rear torso instead of the front.
        rear: bool,
    },
    /// Fighter slots offered by a squadron.
    SquadronSlots {
        /// Number of fighters the squadron can hold.
        fighters: u32,
    },
}

/// Front or rear position of a proto-mech clamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampPosition {
    /// The superheavy-capable front mount.
    Front,
    /// The rear mount.
    Rear,
}

/// Transporter a loaded unit occupies on its carrier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// The numbered bay holding the unit.
    Bay(u32),
    /// Tonnage-measured troop space.
    TroopSpace,
    /// Battle armor handles.
    Handles,
    /// A proto-mech clamp.
    Clamp(ClampPosition),
    /// A fighter slot inside a squadron.
    Squadron,
}

/// Carrier reference held by a transported unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Embarkation {
    /// Unit transporting the cargo.
    pub carrier: UnitId,
    /// Transporter used on the carrier.
    pub placement: Placement,
}

/// Kind of C3 equipment a unit carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum C3Kind {
    /// Flat shared network without hierarchy.
    Shared,
    /// Master computer able to lead slaves or other masters.
    Master,
    /// Slave computer that links to a master.
    Slave,
}

impl C3Kind {
    /// Reports whether the equipment participates in master/slave hierarchies.
    #[must_use]
    pub const fn is_hierarchical(&self) -> bool {
        matches!(self, Self::Master | Self::Slave)
    }
}

/// Communication network state of a single unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct C3Node {
    /// Equipment carried by the unit.
    pub kind: C3Kind,
    /// Master the unit links to, for master/slave equipment.
    pub master: Option<UnitId>,
    /// Shared network the unit belongs to, for shared equipment.
    pub network: Option<NetworkId>,
    /// Whether the unit heads a company-level master/slave network.
    pub company_commander: bool,
}

impl C3Node {
    /// Creates an unlinked node for the provided equipment.
    #[must_use]
    pub const fn unlinked(kind: C3Kind) -> Self {
        Self {
            kind,
            master: None,
            network: None,
            company_commander: false,
        }
    }
}

/// Pre-game deployment settings of a unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Deployment {
    /// Round in which the unit deploys.
    pub round: u32,
    /// Whether the unit starts hidden.
    pub hidden: bool,
    /// Whether the unit starts prone.
    pub prone: bool,
    /// Whether the unit starts hull-down.
    pub hull_down: bool,
    /// Heat the unit starts the match with.
    pub starting_heat: u32,
}

/// Crew operating a unit.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Crew {
    /// Full name of the pilot or commander.
    pub name: String,
    /// Callsign of the pilot or commander.
    pub callsign: String,
    /// Gunnery skill; lower is better.
    pub gunnery: u8,
    /// Piloting skill; lower is better.
    pub piloting: u8,
}

impl Default for Crew {
    fn default() -> Self {
        Self {
            name: String::from("Unnamed"),
            callsign: String::new(),
            gunnery: 4,
            piloting: 5,
        }
    }
}

/// Description of a unit entering the lobby.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitSpec {
    /// Player owning the unit.
    pub owner: PlayerId,
    /// Type of the unit.
    pub kind: UnitKind,
    /// Weight of the unit in tons.
    pub weight: f64,
    /// Transport capabilities the unit offers as a carrier.
    #[serde(default)]
    pub transporters: Vec<Transporter>,
    /// C3 equipment carried by the unit, if any.
    #[serde(default)]
    pub c3: Option<C3Kind>,
    /// Crew operating the unit.
    #[serde(default)]
    pub crew: Crew,
    /// Pre-game deployment settings.
    #[serde(default)]
    pub deployment: Deployment,
}

impl UnitSpec {
    /// Creates a unit description without transporters, C3 equipment or custom crew.
    #[must_use]
    pub fn new(owner: PlayerId, kind: UnitKind, weight: f64) -> Self {
        Self {
            owner,
            kind,
            weight,
            transporters: Vec::new(),
            c3: None,
            crew: Crew::default(),
            deployment: Deployment::default(),
        }
    }

    /// Adds a transporter to the description.
    #[must_use]
    pub fn with_transporter(mut self, transporter: Transporter) -> Self {
        self.transporters.push(transporter);
        self
    }

    /// Equips the unit with C3 equipment of the provided kind.
    #[must_use]
    pub fn with_c3(mut self, kind: C3Kind) -> Self {
        self.c3 = Some(kind);
        self
    }
}

/// Direction used when reordering forces or units within their parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    /// Towards the start of the parent's list.
    Up,
    /// Towards the end of the parent's list.
    Down,
}

/// Kind of local participant a sending connection speaks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionKind {
    /// The human operating the session.
    Operator,
    /// An automated player hosted inside the session.
    Automated,
}

/// Local participant through which a change can reach the authoritative server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SendingConnection {
    /// Participant the connection authenticates as.
    pub player: PlayerId,
    /// Kind of participant behind the connection.
    pub kind: ConnectionKind,
}

/// Match options that influence lobby behaviour.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbyOptions {
    /// Hides enemy unit details until play starts.
    pub blind_drop: bool,
    /// Maximum number of fighters a newly created squadron may hold.
    pub squadron_size: u32,
    /// Best skill value random skill generation may produce.
    pub skill_floor: u8,
    /// Worst skill value random skill generation may produce.
    pub skill_ceiling: u8,
}

impl Default for LobbyOptions {
    fn default() -> Self {
        Self {
            blind_drop: false,
            squadron_size: 6,
            skill_floor: 2,
            skill_ceiling: 6,
        }
    }
}

/// Primitive mutations the lobby world can commit.
///
/// Composite lobby actions are planned as ordered batches of these commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the active match options.
    ConfigureOptions {
        /// Options to activate.
        options: LobbyOptions,
    },
    /// Registers a participant in the roster.
    AddPlayer {
        /// Identifier of the participant.
        player: PlayerId,
        /// Display name of the participant.
        name: String,
        /// Team the participant fights on.
        team: Option<TeamId>,
        /// Local connection kind when the participant is hosted by this session.
        local: Option<ConnectionKind>,
    },
    /// Moves a participant to another team.
    SetTeam {
        /// Participant changing teams.
        player: PlayerId,
        /// Team to join.
        team: Option<TeamId>,
    },
    /// Adds a unit to the lobby.
    AddUnit {
        /// Identifier assigned to the unit.
        unit: UnitId,
        /// Description of the unit.
        spec: UnitSpec,
    },
    /// Removes a unit and severs every relation it still holds.
    RemoveUnit {
        /// Unit to remove.
        unit: UnitId,
    },
    /// Loads a unit onto a carrier at the provided placement.
    Embark {
        /// Unit being loaded.
        unit: UnitId,
        /// Carrier receiving the unit.
        carrier: UnitId,
        /// Transporter used on the carrier.
        placement: Placement,
    },
    /// Removes a unit from its carrier.
    Disembark {
        /// Unit leaving its carrier.
        unit: UnitId,
    },
    /// Hands a unit to another owner.
    SetOwner {
        /// Unit changing hands.
        unit: UnitId,
        /// New owner.
        owner: PlayerId,
    },
    /// Moves a unit into a force, or out of every force.
    AssignForce {
        /// Unit being moved.
        unit: UnitId,
        /// Force receiving the unit.
        force: Option<ForceId>,
    },
    /// Creates a new force.
    CreateForce {
        /// Identifier assigned to the force.
        force: ForceId,
        /// Display name of the force.
        name: String,
        /// Parent force, or `None` for a top-level force.
        parent: Option<ForceId>,
        /// Owner of the force.
        owner: PlayerId,
    },
    /// Renames a force.
    RenameForce {
        /// Force being renamed.
        force: ForceId,
        /// New display name.
        name: String,
    },
    /// Moves a force under another parent, or to the top level.
    ReparentForce {
        /// Force being moved.
        force: ForceId,
        /// New parent force.
        parent: Option<ForceId>,
    },
    /// Hands a single force to another owner without touching its members.
    SetForceOwner {
        /// Force changing hands.
        force: ForceId,
        /// New owner.
        owner: PlayerId,
    },
    /// Removes a force node from the tree.
    RemoveForce {
        /// Force to remove.
        force: ForceId,
    },
    /// Reorders a force among its siblings.
    MoveForce {
        /// Force being reordered.
        force: ForceId,
        /// Direction of travel.
        shift: Shift,
    },
    /// Reorders a unit among the members of its force.
    MoveUnit {
        /// Unit being reordered.
        unit: UnitId,
        /// Direction of travel.
        shift: Shift,
    },
    /// Links a master/slave C3 unit to a master, or unlinks it.
    SetC3Master {
        /// Unit being linked.
        unit: UnitId,
        /// Master to link to.
        master: Option<UnitId>,
    },
    /// Moves a shared C3 unit into an existing network.
    JoinC3Network {
        /// Unit joining the network.
        unit: UnitId,
        /// Network to join.
        network: NetworkId,
    },
    /// Moves a shared C3 unit into a fresh network of its own.
    LeaveC3Network {
        /// Unit leaving its network.
        unit: UnitId,
    },
    /// Grants or revokes the company commander role.
    SetCompanyCommander {
        /// Unit whose role changes.
        unit: UnitId,
        /// Whether the unit heads a company.
        commander: bool,
    },
    /// Replaces the crew of a unit.
    SetCrew {
        /// Unit receiving the crew.
        unit: UnitId,
        /// New crew.
        crew: Crew,
    },
    /// Replaces the deployment settings of a unit.
    SetDeployment {
        /// Unit being configured.
        unit: UnitId,
        /// New deployment settings.
        deployment: Deployment,
    },
}

/// Events reported by the world after committing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A participant was registered or changed team.
    PlayerChanged {
        /// Participant that changed.
        player: PlayerId,
    },
    /// Match options were replaced.
    OptionsChanged,
    /// A unit entered the lobby.
    UnitAdded {
        /// Unit that was added.
        unit: UnitId,
    },
    /// A unit's state changed.
    UnitChanged {
        /// Unit that changed.
        unit: UnitId,
    },
    /// A unit left the lobby.
    UnitRemoved {
        /// Unit that was removed.
        unit: UnitId,
    },
    /// A force's state or membership changed.
    ForceChanged {
        /// Force that changed.
        force: ForceId,
    },
    /// A force was removed from the tree.
    ForceRemoved {
        /// Force that was removed.
        force: ForceId,
    },
}

/// Immutable representation of a unit used for queries and outbound messages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    /// Identifier of the unit.
    pub id: UnitId,
    /// Player owning the unit.
    pub owner: PlayerId,
    /// Type of the unit.
    pub kind: UnitKind,
    /// Weight of the unit in tons.
    pub weight: f64,
    /// Carrier transporting the unit, if any.
    pub carrier: Option<Embarkation>,
    /// Units transported by this unit, ordered by identifier.
    pub cargo: Vec<(UnitId, Placement)>,
    /// Force the unit belongs to, if any.
    pub force: Option<ForceId>,
    /// C3 network state of the unit.
    pub c3: Option<C3Node>,
    /// Crew operating the unit.
    pub crew: Crew,
    /// Pre-game deployment settings.
    pub deployment: Deployment,
}

/// Immutable representation of a force used for queries and outbound messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceSnapshot {
    /// Identifier of the force.
    pub id: ForceId,
    /// Display name of the force.
    pub name: String,
    /// Parent force, if any.
    pub parent: Option<ForceId>,
    /// Owner of the force.
    pub owner: PlayerId,
    /// Direct subforces in display order.
    pub sub_forces: Vec<ForceId>,
    /// Direct member units in display order.
    pub units: Vec<UnitId>,
}

/// Logical message a sending connection submits to the authoritative server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Outbound {
    /// Announces newly created units.
    AddUnits {
        /// Units to add.
        units: Vec<UnitSnapshot>,
    },
    /// Updates units whose forces did not change.
    UpdateUnits {
        /// Units to update.
        units: Vec<UnitSnapshot>,
    },
    /// Updates forces together with the units whose membership changed.
    UpdateForces {
        /// Forces to update.
        forces: Vec<ForceSnapshot>,
        /// Units to update alongside the forces.
        units: Vec<UnitSnapshot>,
    },
    /// Deletes units.
    DeleteUnits {
        /// Units to delete.
        units: Vec<UnitId>,
    },
    /// Deletes forces.
    DeleteForces {
        /// Forces to delete.
        forces: Vec<ForceId>,
    },
    /// Moves a participant to another team.
    UpdateTeam {
        /// Participant changing teams.
        player: PlayerId,
        /// Team to join.
        team: Option<TeamId>,
    },
}

/// Outbound message attributed to the connection that must submit it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dispatch {
    /// Connection submitting the message.
    pub sender: SendingConnection,
    /// Message to submit.
    pub message: Outbound,
}

#[cfg(test)]
mod tests {
    use super::{
        CargoClass, ConnectionKind, Dispatch, ForceId, Outbound, PlayerId, SendingConnection,
        UnitId, UnitKind,
    };

    #[test]
    fn squadrons_share_the_fighter_cargo_class_but_are_not_fighters() {
        assert_eq!(
            UnitKind::FighterSquadron.cargo_class(),
            CargoClass::AerospaceFighter
        );
        assert!(!UnitKind::FighterSquadron.is_fighter());
        assert!(UnitKind::AerospaceFighter.is_fighter());
    }

    #[test]
    fn battle_armor_consumes_one_slot_per_trooper() {
        let squad = UnitKind::Infantry {
            battle_armor: true,
            troopers: 4,
        };
        let platoon = UnitKind::Infantry {
            battle_armor: false,
            troopers: 28,
        };
        assert_eq!(squad.bay_slots(), 4);
        assert_eq!(platoon.bay_slots(), 1);
        assert!(squad.is_battle_armor());
        assert!(platoon.uses_tonnage_cargo());
    }

    #[test]
    fn only_bipedal_mechs_are_two_legged() {
        assert!(UnitKind::Mech { bipedal: true }.is_two_legged());
        assert!(!UnitKind::Mech { bipedal: false }.is_two_legged());
        assert!(!UnitKind::ProtoMech.is_two_legged());
    }

    #[test]
    fn dispatch_round_trips_through_bincode() {
        let dispatch = Dispatch {
            sender: SendingConnection {
                player: PlayerId::new(3),
                kind: ConnectionKind::Automated,
            },
            message: Outbound::DeleteForces {
                forces: vec![ForceId::new(1), ForceId::new(4)],
            },
        };
        let bytes = bincode::serialize(&dispatch).expect("serialize");
        let restored: Dispatch = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, dispatch);
    }

    #[test]
    fn identifiers_render_with_their_domain() {
        assert_eq!(UnitId::new(7).to_string(), "unit #7");
        assert_eq!(ForceId::new(2).to_string(), "force #2");
        assert_eq!(PlayerId::new(5).to_string(), "player #5");
    }
}
