//! Scenario files describing a lobby and the actions to run against it.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use lobby_core::{
    Command, ConnectionKind, Deployment, Dispatch, ForceId, LobbyError, LobbyOptions, PlayerId,
    Shift, TeamId, UnitId, UnitSpec,
};
use lobby_system_actions::{CrewLabel, LobbyActions};
use lobby_world::{apply, query, World};
use serde::Deserialize;

/// Lobby state received from the server plus the local session's script.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    #[serde(default)]
    options: LobbyOptions,
    session: Session,
    #[serde(default)]
    players: Vec<PlayerEntry>,
    #[serde(default)]
    units: Vec<UnitSpec>,
    #[serde(default)]
    forces: Vec<ForceEntry>,
    #[serde(default)]
    pub(crate) actions: Vec<Action>,
}

/// Participants hosted by this session.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Session {
    operator: PlayerId,
    #[serde(default)]
    bots: Vec<PlayerId>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlayerEntry {
    id: PlayerId,
    name: String,
    #[serde(default)]
    team: Option<TeamId>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ForceEntry {
    name: String,
    owner: PlayerId,
    #[serde(default)]
    parent: Option<ForceId>,
    #[serde(default)]
    units: Vec<UnitId>,
}

/// One scripted lobby action.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", deny_unknown_fields)]
pub(crate) enum Action {
    AddUnits {
        units: Vec<UnitSpec>,
    },
    DeleteUnits {
        units: Vec<UnitId>,
    },
    DeleteForces {
        forces: Vec<ForceId>,
    },
    ChangeOwner {
        units: Vec<UnitId>,
        owner: PlayerId,
    },
    ChangeForceOwner {
        forces: Vec<ForceId>,
        owner: PlayerId,
        #[serde(default)]
        full: bool,
    },
    ChangeTeam {
        player: PlayerId,
        #[serde(default)]
        team: Option<TeamId>,
    },
    Load {
        units: Vec<UnitId>,
        carrier: UnitId,
        #[serde(default)]
        bay: Option<u32>,
    },
    Disembark {
        units: Vec<UnitId>,
    },
    Offload {
        carriers: Vec<UnitId>,
    },
    CreateForce {
        name: String,
        owner: PlayerId,
        #[serde(default)]
        parent: Option<ForceId>,
    },
    RenameForce {
        force: ForceId,
        name: String,
    },
    PromoteForce {
        force: ForceId,
    },
    AttachForce {
        force: ForceId,
        parent: ForceId,
    },
    AddToForce {
        force: ForceId,
        units: Vec<UnitId>,
    },
    RemoveFromForce {
        units: Vec<UnitId>,
    },
    MoveForce {
        force: ForceId,
        shift: Shift,
    },
    MoveUnit {
        unit: UnitId,
        shift: Shift,
    },
    ConnectC3 {
        unit: UnitId,
        target: UnitId,
    },
    DisconnectC3 {
        units: Vec<UnitId>,
    },
    PromoteToMaster {
        unit: UnitId,
    },
    PromoteToCompanyCommander {
        unit: UnitId,
    },
    SwapPilots {
        first: UnitId,
        second: UnitId,
    },
    CreateSquadron {
        fighters: Vec<UnitId>,
    },
    RandomSkills {
        units: Vec<UnitId>,
    },
    RandomNames {
        units: Vec<UnitId>,
        pool: Vec<String>,
    },
    RandomCallsigns {
        units: Vec<UnitId>,
        pool: Vec<String>,
    },
    Deploy {
        units: Vec<UnitId>,
        #[serde(default)]
        deployment: Deployment,
    },
}

impl Scenario {
    /// Reads and parses a scenario file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse scenario {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(contents).context("invalid scenario toml")?;
        scenario.check()?;
        Ok(scenario)
    }

    fn check(&self) -> Result<()> {
        let known = |player: PlayerId| self.players.iter().any(|entry| entry.id == player);
        if !known(self.session.operator) {
            bail!("operator {} is not listed in [[players]]", self.session.operator);
        }
        if let Some(bot) = self.session.bots.iter().find(|bot| !known(**bot)) {
            bail!("bot {bot} is not listed in [[players]]");
        }
        if let Some(spec) = self.units.iter().find(|spec| !known(spec.owner)) {
            bail!("a unit is owned by unlisted {}", spec.owner);
        }
        if let Some(force) = self.forces.iter().find(|force| !known(force.owner)) {
            bail!("force '{}' is owned by unlisted {}", force.name, force.owner);
        }
        Ok(())
    }

    /// Builds the lobby as the server last reported it.
    ///
    /// Units receive identifiers in listing order, forces likewise; a force
    /// may only name a parent listed before it.
    pub(crate) fn seed(&self) -> Result<World> {
        let mut world = World::new();
        let mut events = Vec::new();
        let mut commands = vec![Command::ConfigureOptions {
            options: self.options.clone(),
        }];

        for entry in &self.players {
            let local = if entry.id == self.session.operator {
                Some(ConnectionKind::Operator)
            } else if self.session.bots.contains(&entry.id) {
                Some(ConnectionKind::Automated)
            } else {
                None
            };
            commands.push(Command::AddPlayer {
                player: entry.id,
                name: entry.name.clone(),
                team: entry.team,
                local,
            });
        }
        for command in commands.drain(..) {
            apply(&mut world, command, &mut events);
        }

        for spec in &self.units {
            let unit = query::next_unit_id(&world);
            apply(
                &mut world,
                Command::AddUnit {
                    unit,
                    spec: spec.clone(),
                },
                &mut events,
            );
        }

        for entry in &self.forces {
            let force = query::next_force_id(&world);
            if let Some(parent) = entry.parent {
                if query::force_owner(&world, parent).is_none() {
                    bail!("force '{}' names unknown parent {parent}", entry.name);
                }
            }
            commands.push(Command::CreateForce {
                force,
                name: entry.name.clone(),
                parent: entry.parent,
                owner: entry.owner,
            });
            for unit in &entry.units {
                if query::unit_owner(&world, *unit).is_none() {
                    bail!("force '{}' lists unknown {unit}", entry.name);
                }
                commands.push(Command::AssignForce {
                    unit: *unit,
                    force: Some(force),
                });
            }
            for command in commands.drain(..) {
                apply(&mut world, command, &mut events);
            }
        }

        Ok(world)
    }
}

impl Action {
    /// Runs the action, appending the messages it produced.
    pub(crate) fn run(
        &self,
        actions: &mut LobbyActions,
        world: &mut World,
        out: &mut Vec<Dispatch>,
    ) -> Result<(), LobbyError> {
        match self {
            Self::AddUnits { units } => {
                let _ = actions.add_units(world, units.clone(), out)?;
            }
            Self::DeleteUnits { units } => {
                let _ = actions.delete_units(world, units, out)?;
            }
            Self::DeleteForces { forces } => {
                let _ = actions.delete_forces(world, forces, out)?;
            }
            Self::ChangeOwner { units, owner } => {
                let _ = actions.change_owner_units(world, units, *owner, out)?;
            }
            Self::ChangeForceOwner {
                forces,
                owner,
                full,
            } => {
                let _ = actions.change_owner_forces(world, forces, *owner, *full, out)?;
            }
            Self::ChangeTeam { player, team } => {
                let _ = actions.change_team(world, *player, *team, out)?;
            }
            Self::Load {
                units,
                carrier,
                bay,
            } => {
                let _ = actions.load(world, units, *carrier, *bay, out)?;
            }
            Self::Disembark { units } => {
                let _ = actions.disembark(world, units, out)?;
            }
            Self::Offload { carriers } => {
                let _ = actions.offload(world, carriers, out)?;
            }
            Self::CreateForce {
                name,
                owner,
                parent,
            } => {
                let _ = actions.create_force(world, *parent, name, *owner, out)?;
            }
            Self::RenameForce { force, name } => {
                let _ = actions.rename_force(world, *force, name, out)?;
            }
            Self::PromoteForce { force } => {
                let _ = actions.promote_force(world, *force, out)?;
            }
            Self::AttachForce { force, parent } => {
                let _ = actions.attach_force(world, *force, *parent, out)?;
            }
            Self::AddToForce { force, units } => {
                let _ = actions.add_units_to_force(world, *force, units, out)?;
            }
            Self::RemoveFromForce { units } => {
                let _ = actions.remove_units_from_force(world, units, out)?;
            }
            Self::MoveForce { force, shift } => {
                let _ = actions.move_force(world, *force, *shift, out)?;
            }
            Self::MoveUnit { unit, shift } => {
                let _ = actions.move_unit(world, *unit, *shift, out)?;
            }
            Self::ConnectC3 { unit, target } => {
                let _ = actions.connect_c3(world, *unit, *target, out)?;
            }
            Self::DisconnectC3 { units } => {
                let _ = actions.disconnect_c3(world, units, out)?;
            }
            Self::PromoteToMaster { unit } => {
                let _ = actions.promote_to_master(world, *unit, out)?;
            }
            Self::PromoteToCompanyCommander { unit } => {
                let _ = actions.promote_to_company_commander(world, *unit, out)?;
            }
            Self::SwapPilots { first, second } => {
                let _ = actions.swap_pilots(world, *first, *second, out)?;
            }
            Self::CreateSquadron { fighters } => {
                let _ = actions.create_squadron(world, fighters, out)?;
            }
            Self::RandomSkills { units } => {
                let _ = actions.random_skills(world, units, out)?;
            }
            Self::RandomNames { units, pool } => {
                let _ = actions.random_labels(world, units, CrewLabel::Name, pool, out)?;
            }
            Self::RandomCallsigns { units, pool } => {
                let _ = actions.random_labels(world, units, CrewLabel::Callsign, pool, out)?;
            }
            Self::Deploy { units, deployment } => {
                let _ = actions.configure_deployment(world, units, *deployment, out)?;
            }
        }
        Ok(())
    }

    /// Short label used when reporting the action.
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::AddUnits { .. } => "add units",
            Self::DeleteUnits { .. } => "delete units",
            Self::DeleteForces { .. } => "delete forces",
            Self::ChangeOwner { .. } => "change owner",
            Self::ChangeForceOwner { .. } => "change force owner",
            Self::ChangeTeam { .. } => "change team",
            Self::Load { .. } => "load",
            Self::Disembark { .. } => "disembark",
            Self::Offload { .. } => "offload",
            Self::CreateForce { .. } => "create force",
            Self::RenameForce { .. } => "rename force",
            Self::PromoteForce { .. } => "promote force",
            Self::AttachForce { .. } => "attach force",
            Self::AddToForce { .. } => "add to force",
            Self::RemoveFromForce { .. } => "remove from force",
            Self::MoveForce { .. } => "move force",
            Self::MoveUnit { .. } => "move unit",
            Self::ConnectC3 { .. } => "connect c3",
            Self::DisconnectC3 { .. } => "disconnect c3",
            Self::PromoteToMaster { .. } => "promote to master",
            Self::PromoteToCompanyCommander { .. } => "promote to company commander",
            Self::SwapPilots { .. } => "swap pilots",
            Self::CreateSquadron { .. } => "create squadron",
            Self::RandomSkills { .. } => "random skills",
            Self::RandomNames { .. } => "random names",
            Self::RandomCallsigns { .. } => "random callsigns",
            Self::Deploy { .. } => "deploy",
        }
    }
}
