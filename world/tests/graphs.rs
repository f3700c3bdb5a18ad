use lobby_core::{
    BayCapacity, C3Kind, CargoClass, Command, ConnectionKind, ForceId, LobbyError, Placement,
    PlayerId, TeamId, Transporter, UnitId, UnitKind, UnitSpec,
};
use lobby_world::{apply, c3, forces, ownership, query, transport, World};

const OPERATOR: PlayerId = PlayerId::new(1);
const BOT: PlayerId = PlayerId::new(2);
const ENEMY: PlayerId = PlayerId::new(3);

fn lobby() -> World {
    let mut world = World::new();
    let mut events = Vec::new();
    for (player, team, local) in [
        (OPERATOR, 1, Some(ConnectionKind::Operator)),
        (BOT, 1, Some(ConnectionKind::Automated)),
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
    world
}

fn commit(world: &mut World, commands: Vec<Command>) {
    let mut events = Vec::new();
    for command in commands {
        apply(world, command, &mut events);
    }
}

fn add(world: &mut World, unit: u32, spec: UnitSpec) {
    commit(
        world,
        vec![Command::AddUnit {
            unit: UnitId::new(unit),
            spec,
        }],
    );
}

fn infantry(owner: PlayerId, tons: f64) -> UnitSpec {
    UnitSpec::new(
        owner,
        UnitKind::Infantry {
            battle_armor: false,
            troopers: 7,
        },
        tons,
    )
}

fn apc() -> UnitSpec {
    UnitSpec::new(OPERATOR, UnitKind::GroundVehicle, 30.0)
        .with_transporter(Transporter::TroopSpace { tons: 2.0 })
        .with_transporter(Transporter::Bay {
            number: 1,
            class: CargoClass::Infantry,
            capacity: BayCapacity::Units(2),
        })
}

#[test]
fn infantry_is_sized_by_count_when_count_based_room_exists() {
    let mut world = lobby();
    add(&mut world, 1, apc());
    for unit in 2..=4 {
        add(&mut world, unit, infantry(OPERATOR, 1.0));
    }

    let three = [UnitId::new(2), UnitId::new(3), UnitId::new(4)];
    let rejected = transport::plan_load(&world, &three, UnitId::new(1), None);
    match rejected {
        Err(LobbyError::CapacityExceeded {
            class,
            required,
            available,
        }) => {
            assert_eq!(class, CargoClass::Infantry, "the infantry class overflows");
            assert!(required - available > 0.0, "shortfall must be positive");
        }
        other => panic!("expected a capacity error, got {other:?}"),
    }
    assert!(
        query::cargo_of(&world, UnitId::new(1)).is_empty(),
        "a rejected load leaves the carrier empty"
    );

    let plan = transport::plan_load(&world, &three[..2], UnitId::new(1), None)
        .expect("two platoons fit the bay");
    commit(&mut world, plan);
    assert_eq!(
        query::cargo_of(&world, UnitId::new(1)),
        vec![UnitId::new(2), UnitId::new(3)]
    );
    for unit in &three[..2] {
        assert_eq!(
            query::unit_snapshot(&world, *unit)
                .and_then(|snapshot| snapshot.carrier)
                .map(|embarkation| embarkation.placement),
            Some(Placement::Bay(1)),
            "loaded units reference the bay they occupy"
        );
    }
}

#[test]
fn conventional_infantry_uses_troop_space_beside_battle_armor_handles() {
    let mut world = lobby();
    add(
        &mut world,
        1,
        UnitSpec::new(OPERATOR, UnitKind::GroundVehicle, 40.0)
            .with_transporter(Transporter::TroopSpace { tons: 10.0 })
            .with_transporter(Transporter::InfantryHandles { squads: 1 }),
    );
    add(&mut world, 2, infantry(OPERATOR, 3.0));
    add(
        &mut world,
        3,
        UnitSpec::new(
            OPERATOR,
            UnitKind::Infantry {
                battle_armor: true,
                troopers: 4,
            },
            4.0,
        ),
    );

    let plan = transport::plan_load(&world, &[UnitId::new(2)], UnitId::new(1), None)
        .expect("troop space holds the platoon");
    assert_eq!(
        plan,
        vec![Command::Embark {
            unit: UnitId::new(2),
            carrier: UnitId::new(1),
            placement: Placement::TroopSpace,
        }]
    );

    let plan = transport::plan_load(&world, &[UnitId::new(2), UnitId::new(3)], UnitId::new(1), None)
        .expect("both fit");
    commit(&mut world, plan);
    let placements: Vec<_> = [UnitId::new(2), UnitId::new(3)]
        .into_iter()
        .map(|unit| {
            query::unit_snapshot(&world, unit)
                .and_then(|snapshot| snapshot.carrier)
                .map(|embarkation| embarkation.placement)
        })
        .collect();
    assert_eq!(
        placements,
        vec![Some(Placement::TroopSpace), Some(Placement::Handles)],
        "each squad is sized by the room that admits it"
    );
}

#[test]
fn carrier_and_cargo_stay_symmetric_through_offload() {
    let mut world = lobby();
    add(&mut world, 1, apc());
    add(&mut world, 2, infantry(OPERATOR, 1.0));
    add(&mut world, 3, infantry(BOT, 1.0));

    let plan = transport::plan_load(&world, &[UnitId::new(2), UnitId::new(3)], UnitId::new(1), None)
        .expect("both fit");
    commit(&mut world, plan);
    for unit in [UnitId::new(2), UnitId::new(3)] {
        assert_eq!(query::carrier_of(&world, unit), Some(UnitId::new(1)));
        assert!(query::cargo_of(&world, UnitId::new(1)).contains(&unit));
    }

    let offload = transport::plan_offload(&world, UnitId::new(1));
    assert_eq!(offload.len(), 2);
    commit(&mut world, offload);
    assert!(query::cargo_of(&world, UnitId::new(1)).is_empty());
    assert_eq!(query::carrier_of(&world, UnitId::new(3)), None);
    assert!(transport::plan_disembark(&world, UnitId::new(3)).is_empty());
}

#[test]
fn sub_forces_never_contain_the_root() {
    let mut world = lobby();
    commit(
        &mut world,
        vec![
            Command::CreateForce {
                force: ForceId::new(1),
                name: String::from("Battalion"),
                parent: None,
                owner: OPERATOR,
            },
            Command::CreateForce {
                force: ForceId::new(2),
                name: String::from("Company"),
                parent: Some(ForceId::new(1)),
                owner: BOT,
            },
            Command::CreateForce {
                force: ForceId::new(3),
                name: String::from("Lance"),
                parent: Some(ForceId::new(2)),
                owner: BOT,
            },
        ],
    );

    for force in query::force_ids(&world) {
        let below = forces::full_sub_forces(&world, force);
        assert!(!below.contains(&force), "{force} listed below itself");
        let leaf = query::force_snapshot(&world, force)
            .expect("force exists")
            .sub_forces
            .is_empty();
        assert_eq!(below.is_empty(), leaf, "{force} leaf status disagrees");
    }
    assert!(
        ownership::is_force_editable(&world, ForceId::new(3)),
        "bot-owned forces are local"
    );
}

#[test]
fn full_reassignment_of_a_force_and_its_subforce_moves_units_once() {
    let mut world = lobby();
    commit(
        &mut world,
        vec![
            Command::CreateForce {
                force: ForceId::new(1),
                name: String::from("Company"),
                parent: None,
                owner: OPERATOR,
            },
            Command::CreateForce {
                force: ForceId::new(2),
                name: String::from("Lance"),
                parent: Some(ForceId::new(1)),
                owner: OPERATOR,
            },
        ],
    );
    add(&mut world, 1, infantry(OPERATOR, 1.0));
    add(&mut world, 2, infantry(OPERATOR, 1.0));
    commit(
        &mut world,
        vec![
            Command::AssignForce {
                unit: UnitId::new(1),
                force: Some(ForceId::new(1)),
            },
            Command::AssignForce {
                unit: UnitId::new(2),
                force: Some(ForceId::new(2)),
            },
        ],
    );

    let plan = forces::plan_assign_full(&world, &[ForceId::new(1), ForceId::new(2)], BOT)
        .expect("teammate may receive the company");
    let owner_changes = plan
        .iter()
        .filter(|command| matches!(command, Command::SetOwner { .. }))
        .count();
    assert_eq!(owner_changes, 2, "every unit changes hands exactly once");

    commit(&mut world, plan);
    assert_eq!(query::units_owned_by(&world, BOT).len(), 2);
    assert_eq!(query::force_owner(&world, ForceId::new(2)), Some(BOT));
}

#[test]
fn handing_a_force_to_an_enemy_severs_the_relations_left_behind() {
    let mut world = lobby();
    commit(
        &mut world,
        vec![
            Command::CreateForce {
                force: ForceId::new(1),
                name: String::from("Company"),
                parent: None,
                owner: OPERATOR,
            },
            Command::CreateForce {
                force: ForceId::new(2),
                name: String::from("Recon"),
                parent: Some(ForceId::new(1)),
                owner: OPERATOR,
            },
        ],
    );
    add(&mut world, 1, apc());
    add(&mut world, 2, infantry(OPERATOR, 1.0));
    commit(
        &mut world,
        vec![Command::AssignForce {
            unit: UnitId::new(2),
            force: Some(ForceId::new(2)),
        }],
    );
    let load = transport::plan_load(&world, &[UnitId::new(2)], UnitId::new(1), None)
        .expect("platoon fits");
    commit(&mut world, load);

    let plan = forces::plan_assign_full(&world, &[ForceId::new(2)], ENEMY).expect("plan");
    commit(&mut world, plan);

    assert_eq!(query::carrier_of(&world, UnitId::new(2)), None);
    assert_eq!(
        query::force_snapshot(&world, ForceId::new(2))
            .expect("force survives")
            .parent,
        None,
        "the handed-over force leaves the enemy tree"
    );
    assert_eq!(query::unit_owner(&world, UnitId::new(2)), Some(ENEMY));
}

#[test]
fn disconnecting_a_sub_master_strands_its_leaf() {
    let mut world = lobby();
    for (unit, kind) in [(1, C3Kind::Master), (2, C3Kind::Master), (3, C3Kind::Slave)] {
        add(
            &mut world,
            unit,
            UnitSpec::new(OPERATOR, UnitKind::Mech { bipedal: true }, 65.0).with_c3(kind),
        );
    }
    let commander =
        c3::plan_promote_to_company_commander(&world, UnitId::new(1)).expect("master");
    commit(&mut world, commander);
    let sub = c3::plan_connect(&world, UnitId::new(2), UnitId::new(1)).expect("sub-master");
    commit(&mut world, sub);
    let leaf = c3::plan_connect(&world, UnitId::new(3), UnitId::new(2)).expect("leaf");
    commit(&mut world, leaf);
    assert_eq!(
        c3::network_summary(&world, UnitId::new(3))
            .expect("linked")
            .used,
        3
    );

    let disconnect = c3::plan_disconnect(&world, UnitId::new(2)).expect("has C3");
    commit(&mut world, disconnect);

    let leaf_summary = c3::network_summary(&world, UnitId::new(3)).expect("still equipped");
    assert_eq!(
        leaf_summary.members,
        vec![UnitId::new(3)],
        "the leaf is left on its own"
    );
    assert_eq!(
        c3::network_summary(&world, UnitId::new(1))
            .expect("commander")
            .members,
        vec![UnitId::new(1)]
    );
}
