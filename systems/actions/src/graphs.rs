//! Transport, force tree and C3 editing actions.

use lobby_core::{Command, Dispatch, ForceId, LobbyError, PlayerId, Shift, UnitId};
use lobby_world::{c3, forces, ownership, query, transport, Touched, World};
use log::{debug, info};

use crate::{units::distinct, LobbyActions};

impl LobbyActions {
    /// Loads units onto a carrier, optionally into a specific bay.
    ///
    /// A request the carrier cannot serve at all commits nothing and returns
    /// an empty touched set.
    pub fn load(
        &self,
        world: &mut World,
        units: &[UnitId],
        carrier: UnitId,
        bay: Option<u32>,
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        ownership::validate_update(world, units)?;
        let commands = transport::plan_load(world, units, carrier, bay)?;
        if commands.is_empty() {
            debug!("nothing to load onto {carrier}");
            return Ok(Touched::default());
        }
        let touched = self.execute(world, commands, out);
        info!("loaded {} units onto {carrier}", units.len());
        Ok(touched)
    }

    /// Unloads units from their carriers.
    pub fn disembark(
        &self,
        world: &mut World,
        units: &[UnitId],
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        ownership::validate_update(world, units)?;
        let commands = distinct(units)
            .into_iter()
            .flat_map(|unit| transport::plan_disembark(world, unit))
            .collect();
        Ok(self.execute(world, commands, out))
    }

    /// Unloads every unit the carriers transport.
    pub fn offload(
        &self,
        world: &mut World,
        carriers: &[UnitId],
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        ownership::validate_update(world, carriers)?;
        let commands = distinct(carriers)
            .into_iter()
            .flat_map(|carrier| transport::plan_offload(world, carrier))
            .collect();
        Ok(self.execute(world, commands, out))
    }

    /// Creates a force owned by a local participant, optionally below a parent.
    pub fn create_force(
        &self,
        world: &mut World,
        parent: Option<ForceId>,
        name: &str,
        owner: PlayerId,
        out: &mut Vec<Dispatch>,
    ) -> Result<ForceId, LobbyError> {
        if let Some(parent) = parent {
            ownership::validate_forces(world, &[parent])?;
        }
        if query::team(world, owner).is_none() {
            return Err(LobbyError::UnknownPlayer(owner));
        }
        if !ownership::is_local(world, owner) {
            return Err(LobbyError::NotLocalPlayer(owner));
        }
        let (force, commands) = forces::plan_create(world, parent, name, owner)?;
        let _ = self.execute(world, commands, out);
        info!("created {force}");
        Ok(force)
    }

    /// Renames a force.
    pub fn rename_force(
        &self,
        world: &mut World,
        force: ForceId,
        name: &str,
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        ownership::validate_forces(world, &[force])?;
        let commands = forces::plan_rename(world, force, name)?;
        Ok(self.execute(world, commands, out))
    }

    /// Detaches a force from its parent, making it top-level.
    pub fn promote_force(
        &self,
        world: &mut World,
        force: ForceId,
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        ownership::validate_forces(world, &[force])?;
        let commands = forces::plan_promote(world, force)?;
        Ok(self.execute(world, commands, out))
    }

    /// Moves a force below another force.
    pub fn attach_force(
        &self,
        world: &mut World,
        force: ForceId,
        parent: ForceId,
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        ownership::validate_forces(world, &[force, parent])?;
        let commands = forces::plan_attach(world, force, parent)?;
        Ok(self.execute(world, commands, out))
    }

    /// Moves units into a force.
    pub fn add_units_to_force(
        &self,
        world: &mut World,
        force: ForceId,
        units: &[UnitId],
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        ownership::validate_forces(world, &[force])?;
        ownership::validate_update(world, units)?;
        let commands = forces::plan_add_units(world, force, units)?;
        Ok(self.execute(world, commands, out))
    }

    /// Takes units out of their forces.
    pub fn remove_units_from_force(
        &self,
        world: &mut World,
        units: &[UnitId],
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        ownership::validate_update(world, units)?;
        let (commands, changed) = forces::plan_remove_units(world, units);
        debug!("removing units from {} forces", changed.len());
        Ok(self.execute(world, commands, out))
    }

    /// Reorders a force among its siblings.
    pub fn move_force(
        &self,
        world: &mut World,
        force: ForceId,
        shift: Shift,
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        ownership::validate_forces(world, &[force])?;
        Ok(self.execute(world, vec![Command::MoveForce { force, shift }], out))
    }

    /// Reorders a unit among the members of its force.
    pub fn move_unit(
        &self,
        world: &mut World,
        unit: UnitId,
        shift: Shift,
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        ownership::validate_update(world, &[unit])?;
        Ok(self.execute(world, vec![Command::MoveUnit { unit, shift }], out))
    }

    /// Links a unit into the C3 network of the target.
    pub fn connect_c3(
        &self,
        world: &mut World,
        unit: UnitId,
        target: UnitId,
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        ownership::validate_update(world, &[unit])?;
        let commands = c3::plan_connect(world, unit, target)?;
        Ok(self.execute(world, commands, out))
    }

    /// Removes units from their C3 networks.
    pub fn disconnect_c3(
        &self,
        world: &mut World,
        units: &[UnitId],
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        ownership::validate_update(world, units)?;
        let mut commands = Vec::new();
        for unit in distinct(units) {
            commands.extend(c3::plan_disconnect(world, unit)?);
        }
        Ok(self.execute(world, commands, out))
    }

    /// Makes a C3 master independent of any other master.
    pub fn promote_to_master(
        &self,
        world: &mut World,
        unit: UnitId,
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        ownership::validate_update(world, &[unit])?;
        let commands = c3::plan_promote_to_master(world, unit)?;
        Ok(self.execute(world, commands, out))
    }

    /// Makes a C3 master the company commander heading its network.
    pub fn promote_to_company_commander(
        &self,
        world: &mut World,
        unit: UnitId,
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        ownership::validate_update(world, &[unit])?;
        let commands = c3::plan_promote_to_company_commander(world, unit)?;
        Ok(self.execute(world, commands, out))
    }
}
