//! Crew, squadron and deployment setup actions.

use std::collections::BTreeSet;

use lobby_core::{
    Command, Deployment, Dispatch, LobbyError, Placement, Transporter, UnitId, UnitKind, UnitSpec,
};
use lobby_world::{ownership, query, Touched, World};
use log::info;
use rand::{seq::SliceRandom, Rng};

use crate::{units::distinct, LobbyActions};

/// Which crew label a random pick fills in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrewLabel {
    /// The crew's full name.
    Name,
    /// The crew's callsign.
    Callsign,
}

impl LobbyActions {
    /// Exchanges the crews of two units.
    pub fn swap_pilots(
        &self,
        world: &mut World,
        first: UnitId,
        second: UnitId,
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        if first == second {
            return Err(LobbyError::PilotSwapRejected(first, second));
        }
        ownership::validate_update(world, &[first, second])?;
        let crew_of = |unit| {
            query::unit_snapshot(world, unit)
                .map(|snapshot| snapshot.crew)
                .ok_or(LobbyError::UnknownUnit(unit))
        };
        let (first_crew, second_crew) = (crew_of(first)?, crew_of(second)?);
        let commands = vec![
            Command::SetCrew {
                unit: first,
                crew: second_crew,
            },
            Command::SetCrew {
                unit: second,
                crew: first_crew,
            },
        ];
        Ok(self.execute(world, commands, out))
    }

    /// Groups aerospace fighters into a new squadron.
    ///
    /// The squadron receives the next free unit identifier, joins the force of
    /// the first fighter and carries every fighter in its slots.
    pub fn create_squadron(
        &self,
        world: &mut World,
        fighters: &[UnitId],
        out: &mut Vec<Dispatch>,
    ) -> Result<UnitId, LobbyError> {
        ownership::validate_update(world, fighters)?;
        let mut seen = BTreeSet::new();
        let members: Vec<_> = fighters
            .iter()
            .filter(|unit| seen.insert(**unit))
            .filter_map(|unit| query::unit_snapshot(world, *unit))
            .collect();
        let Some(lead) = members.first() else {
            return Err(LobbyError::EmptySelection);
        };
        if members.iter().any(|member| !member.kind.is_fighter()) {
            return Err(LobbyError::InvalidSquadron(
                "only aerospace fighters can form a squadron",
            ));
        }
        if members.iter().any(|member| member.owner != lead.owner) {
            return Err(LobbyError::InvalidSquadron(
                "every fighter must belong to the same player",
            ));
        }
        if members.iter().any(|member| member.carrier.is_some()) {
            return Err(LobbyError::InvalidSquadron(
                "transported fighters cannot join a squadron",
            ));
        }
        let capacity = query::options(world).squadron_size;
        if u32::try_from(members.len()).map_or(true, |count| count > capacity) {
            return Err(LobbyError::InvalidSquadron(
                "too many fighters for a single squadron",
            ));
        }

        let squadron = query::next_unit_id(world);
        let weight = members.iter().map(|member| member.weight).sum();
        let mut commands = vec![Command::AddUnit {
            unit: squadron,
            spec: UnitSpec::new(lead.owner, UnitKind::FighterSquadron, weight).with_transporter(
                Transporter::SquadronSlots {
                    fighters: capacity,
                },
            ),
        }];
        if let Some(force) = lead.force {
            commands.push(Command::AssignForce {
                unit: squadron,
                force: Some(force),
            });
        }
        for member in &members {
            commands.push(Command::Embark {
                unit: member.id,
                carrier: squadron,
                placement: Placement::Squadron,
            });
        }

        let _ = self.execute(world, commands, out);
        info!("formed squadron {squadron} from {} fighters", members.len());
        Ok(squadron)
    }

    /// Draws gunnery and piloting skills from the configured range.
    pub fn random_skills(
        &mut self,
        world: &mut World,
        units: &[UnitId],
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        ownership::validate_update(world, units)?;
        let options = query::options(world);
        let low = options.skill_floor.min(options.skill_ceiling);
        let high = options.skill_floor.max(options.skill_ceiling);

        let mut commands = Vec::new();
        for unit in distinct(units) {
            let Some(snapshot) = query::unit_snapshot(world, unit) else {
                continue;
            };
            let mut crew = snapshot.crew;
            crew.gunnery = self.rng.gen_range(low..=high);
            crew.piloting = self.rng.gen_range(low..=high);
            commands.push(Command::SetCrew { unit, crew });
        }
        Ok(self.execute(world, commands, out))
    }

    /// Picks crew names or callsigns from the caller's pool.
    pub fn random_labels(
        &mut self,
        world: &mut World,
        units: &[UnitId],
        label: CrewLabel,
        pool: &[String],
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        if pool.is_empty() {
            return Err(LobbyError::EmptyNamePool);
        }
        ownership::validate_update(world, units)?;

        let mut commands = Vec::new();
        for unit in distinct(units) {
            let Some(snapshot) = query::unit_snapshot(world, unit) else {
                continue;
            };
            let Some(pick) = pool.choose(&mut self.rng) else {
                return Err(LobbyError::EmptyNamePool);
            };
            let mut crew = snapshot.crew;
            match label {
                CrewLabel::Name => crew.name = pick.clone(),
                CrewLabel::Callsign => crew.callsign = pick.clone(),
            }
            commands.push(Command::SetCrew { unit, crew });
        }
        Ok(self.execute(world, commands, out))
    }

    /// Applies the same deployment settings to every unit.
    pub fn configure_deployment(
        &self,
        world: &mut World,
        units: &[UnitId],
        deployment: Deployment,
        out: &mut Vec<Dispatch>,
    ) -> Result<Touched, LobbyError> {
        ownership::validate_update(world, units)?;
        let commands = distinct(units)
            .into_iter()
            .map(|unit| Command::SetDeployment { unit, deployment })
            .collect();
        Ok(self.execute(world, commands, out))
    }
}
