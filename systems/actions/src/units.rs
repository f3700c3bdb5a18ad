//! Unit lifecycle, ownership and team actions.

use std::collections::BTreeSet;

use lobby_core::{Command, Dispatch, ForceId, LobbyError, PlayerId, TeamId, UnitId, UnitSpec};
use lobby_world::{
    c3, forces,
    ownership::{self, Allegiance},
    query, transport, Touched, World,
};
use log::info;

use crate::LobbyActions;

impl LobbyActions {
    /// Adds units for local participants, allocating identifiers in order.
    pub fn add_units(
        &self,
        world: &mut World,
        specs: Vec<UnitSpec>,
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        if specs.is_empty() {
            return Err(LobbyError::EmptySelection);
        }
        for spec in &specs {
            if query::team(world, spec.owner).is_none() {
                return Err(LobbyError::UnknownPlayer(spec.owner));
            }
            if !ownership::is_local(world, spec.owner) {
                return Err(LobbyError::NotLocalPlayer(spec.owner));
            }
        }

        let first = query::next_unit_id(world).get();
        let commands = specs
            .into_iter()
            .zip(first..)
            .map(|(spec, id)| Command::AddUnit {
                unit: UnitId::new(id),
                spec,
            })
            .collect();
        let touched = self.execute(world, commands, out);
        info!("added {} units", touched.added_units.len());
        Ok(touched)
    }

    /// Deletes units after severing every relation they hold.
    ///
    /// Cargo is unloaded, the units leave their carriers, forces and C3
    /// networks, and only then are they removed. Updates for everything the
    /// cascade touched are dispatched before the deletions.
    pub fn delete_units(
        &self,
        world: &mut World,
        units: &[UnitId],
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        ownership::validate_update(world, units)?;

        let mut commands = Vec::new();
        for unit in distinct(units) {
            commands.extend(transport::plan_offload(world, unit));
            commands.extend(transport::plan_disembark(world, unit));
            commands.extend(forces::plan_remove_units(world, &[unit]).0);
            commands.extend(c3::plan_release(world, unit));
            commands.push(Command::RemoveUnit { unit });
        }
        let touched = self.execute(world, commands, out);
        info!("deleted {} units", touched.removed_units.len());
        Ok(touched)
    }

    /// Deletes forces and their subtrees; member units stay in the lobby.
    pub fn delete_forces(
        &self,
        world: &mut World,
        selection: &[ForceId],
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        ownership::validate_forces(world, selection)?;
        let commands = forces::plan_delete(world, selection);
        let touched = self.execute(world, commands, out);
        info!("deleted {} forces", touched.removed_forces.len());
        Ok(touched)
    }

    /// Hands units to another participant.
    ///
    /// Transport, force and C3 relations the units would hold with enemies of
    /// the new owner are severed in the same batch.
    pub fn change_owner_units(
        &self,
        world: &mut World,
        units: &[UnitId],
        owner: PlayerId,
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        ownership::validate_update(world, units)?;
        if query::team(world, owner).is_none() {
            return Err(LobbyError::UnknownPlayer(owner));
        }

        let moving = distinct(units);
        let projection = moving
            .iter()
            .fold(Allegiance::current(world), |projection, unit| {
                projection.with_unit_owner(*unit, owner)
            });
        let mut commands = transport::plan_sever(&projection, &moving);
        commands.extend(c3::plan_sever(&projection, &moving));
        commands.extend(forces::plan_sever_straddles(&projection));
        for unit in &moving {
            if query::unit_owner(world, *unit) != Some(owner) {
                commands.push(Command::SetOwner { unit: *unit, owner });
            }
        }

        let touched = self.execute(world, commands, out);
        info!("handed {} units to {owner}", moving.len());
        Ok(touched)
    }

    /// Hands forces to another participant.
    ///
    /// With `full` set the forces move together with every subforce and
    /// member unit; otherwise only the selected force nodes change hands,
    /// which is limited to teammates of their current owners.
    pub fn change_owner_forces(
        &self,
        world: &mut World,
        selection: &[ForceId],
        owner: PlayerId,
        full: bool,
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        ownership::validate_forces(world, selection)?;
        let commands = if full {
            forces::plan_assign_full(world, selection, owner)?
        } else {
            let mut commands = Vec::new();
            for force in forces::without_redundant(world, selection) {
                commands.extend(forces::plan_assign_only(world, force, owner)?);
            }
            commands
        };
        let touched = self.execute(world, commands, out);
        info!("handed {} forces to {owner}", selection.len());
        Ok(touched)
    }

    /// Moves a local participant to another team.
    ///
    /// Every transport relation, C3 link and force straddle that would join
    /// the participant's units with new enemies is severed first. The team
    /// change itself is submitted by the participant's own connection.
    pub fn change_team(
        &self,
        world: &mut World,
        player: PlayerId,
        team: Option<TeamId>,
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        if query::team(world, player).is_none() {
            return Err(LobbyError::UnknownPlayer(player));
        }
        if !ownership::is_local(world, player) {
            return Err(LobbyError::NotLocalPlayer(player));
        }

        let projection = Allegiance::current(world).with_team(player, team);
        let owned: BTreeSet<UnitId> = query::units_owned_by(world, player).into_iter().collect();
        let mut commands = transport::plan_sever(&projection, &owned);
        commands.extend(c3::plan_sever(&projection, &owned));
        commands.extend(forces::plan_sever_straddles(&projection));
        commands.push(Command::SetTeam { player, team });

        let touched = self.execute(world, commands, out);
        out.extend(self.router.team_change(world, player, team));
        info!("moved {player} to team {:?}", team.map(|team| team.get()));
        Ok(touched)
    }
}

pub(crate) fn distinct(units: &[UnitId]) -> BTreeSet<UnitId> {
    units.iter().copied().collect()
}
