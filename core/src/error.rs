use thiserror::Error;

use crate::{CargoClass, ForceId, PlayerId, UnitId};

/// Errors that abort a single lobby action before anything is committed.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum LobbyError {
    /// The request did not name any unit or force.
    #[error("nothing was selected")]
    EmptySelection,

    /// The request named a unit the lobby does not know.
    #[error("{0} does not exist")]
    UnknownUnit(UnitId),

    /// The request named a force the lobby does not know.
    #[error("{0} does not exist")]
    UnknownForce(ForceId),

    /// The request named a participant the lobby does not know.
    #[error("{0} is not part of the match")]
    UnknownPlayer(PlayerId),

    /// The unit is neither locally owned nor part of a locally owned force.
    #[error("{0} cannot be edited from this session")]
    NotEditable(UnitId),

    /// No force in the force's ancestor chain is locally owned.
    #[error("{0} cannot be edited from this session")]
    NotEditableForce(ForceId),

    /// The participant is not hosted by this session.
    #[error("{0} is not hosted by this session")]
    NotLocalPlayer(PlayerId),

    /// Blind drop hides the unit from the local operator.
    #[error("{0} is hidden by blind drop")]
    NotVisible(UnitId),

    /// Loading the batch would overflow the carrier's capacity for a cargo class.
    #[error(
        "not enough {class} capacity: {required} needed, {available} available (short by {})",
        .required - .available
    )]
    CapacityExceeded {
        /// Cargo class that would overflow.
        class: CargoClass,
        /// Capacity the whole batch requires.
        required: f64,
        /// Capacity the carrier can still provide to the batch.
        available: f64,
    },

    /// Attaching the force would make it its own ancestor.
    #[error("{force} cannot be attached below {parent} without creating a cycle")]
    StructuralCycle {
        /// Force being attached.
        force: ForceId,
        /// Requested parent.
        parent: ForceId,
    },

    /// Reassigning a force alone to an enemy would strand an empty enemy-owned shell.
    #[error("{force} can only be handed to {owner} together with its units")]
    EmptyEnemyAssignmentDisallowed {
        /// Force being reassigned.
        force: ForceId,
        /// Requested owner.
        owner: PlayerId,
    },

    /// A C3 network rule would be broken.
    #[error("C3 network constraint violated: {0}")]
    NetworkConstraintViolation(#[from] C3Rule),

    /// The selected units cannot form a squadron.
    #[error("cannot create squadron: {0}")]
    InvalidSquadron(&'static str),

    /// The selected units cannot swap pilots.
    #[error("cannot swap pilots between {0} and {1}")]
    PilotSwapRejected(UnitId, UnitId),

    /// A random name or callsign was requested without any candidates.
    #[error("the name pool is empty")]
    EmptyNamePool,
}

/// Specific C3 network rule a link request would break.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum C3Rule {
    /// The unit carries no C3 equipment.
    #[error("{0} carries no C3 equipment")]
    MissingEquipment(UnitId),
    /// The units belong to enemy participants.
    #[error("enemy units cannot share a network")]
    EnemyLink,
    /// The units carry incompatible equipment.
    #[error("shared and master/slave equipment cannot be linked")]
    KindMismatch,
    /// The unit was asked to link to itself.
    #[error("a unit cannot link to itself")]
    SelfLink,
    /// The unit already holds the requested link.
    #[error("the units are already connected")]
    AlreadyConnected,
    /// The target is subordinate to the unit being linked.
    #[error("the link would make a unit its own master")]
    CircularLink,
    /// The target does not carry master equipment.
    #[error("the target is not a C3 master")]
    NotMaster,
    /// The network would exceed its node ceiling.
    #[error("the network would exceed {limit} nodes")]
    NodeCeiling {
        /// Maximum number of nodes.
        limit: usize,
    },
    /// The network would exceed its hierarchy depth.
    #[error("the network would exceed {limit} levels")]
    HierarchyDepth {
        /// Maximum number of levels below the head.
        limit: usize,
    },
    /// The master already links its maximum number of dependents.
    #[error("the master already links {limit} units")]
    DependentLimit {
        /// Maximum number of direct dependents.
        limit: usize,
    },
    /// Only a company commander may lead other masters.
    #[error("only a company commander may lead other masters")]
    CommanderRequired,
    /// A company commander cannot link to another master.
    #[error("a company commander cannot serve under another master")]
    CommanderCannotBeSubordinate,
}
