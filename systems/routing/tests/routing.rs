use lobby_core::{
    Command, ConnectionKind, Dispatch, ForceId, ForceSnapshot, Outbound, PlayerId,
    SendingConnection, TeamId, UnitId, UnitKind, UnitSnapshot, UnitSpec,
};
use lobby_system_routing::{deliver, MessageSink, UpdateRouter};
use lobby_world::{apply, ownership, query, Touched, World};

const OPERATOR: PlayerId = PlayerId::new(1);
const BOT_RED: PlayerId = PlayerId::new(2);
const BOT_BLUE: PlayerId = PlayerId::new(3);
const REMOTE_BLUE: PlayerId = PlayerId::new(4);
const LONER: PlayerId = PlayerId::new(5);

fn connection(player: PlayerId, kind: ConnectionKind) -> SendingConnection {
    SendingConnection { player, kind }
}

fn session() -> World {
    let mut world = World::new();
    let mut events = Vec::new();
    for (player, team, local) in [
        (OPERATOR, Some(1), Some(ConnectionKind::Operator)),
        (BOT_RED, Some(1), Some(ConnectionKind::Automated)),
        (BOT_BLUE, Some(2), Some(ConnectionKind::Automated)),
        (REMOTE_BLUE, Some(2), None),
        (LONER, None, None),
    ] {
        apply(
            &mut world,
            Command::AddPlayer {
                player,
                name: format!("P{}", player.get()),
                team: team.map(TeamId::new),
                local,
            },
            &mut events,
        );
    }
    for (unit, owner) in [(1, OPERATOR), (2, BOT_BLUE), (3, REMOTE_BLUE), (4, LONER)] {
        apply(
            &mut world,
            Command::AddUnit {
                unit: UnitId::new(unit),
                spec: UnitSpec::new(owner, UnitKind::GroundVehicle, 40.0),
            },
            &mut events,
        );
    }
    world
}

#[test]
fn sender_is_unreachable_exactly_when_every_local_connection_is_an_enemy() {
    let world = session();
    let router = UpdateRouter::new();

    for owner in query::players(&world) {
        let locals = query::local_connections(&world);
        let all_enemies = locals
            .iter()
            .all(|local| ownership::is_enemy(&world, local.player, owner));
        let sender = router.correct_sender(&world, owner);
        assert_eq!(
            sender.is_none(),
            all_enemies,
            "reachability of {owner} disagrees with the enemy relation"
        );
        if let Some(sender) = sender {
            assert!(!ownership::is_enemy(&world, sender.player, owner));
        }
    }

    assert_eq!(
        router.correct_sender(&world, BOT_RED),
        Some(connection(OPERATOR, ConnectionKind::Operator)),
        "the operator is preferred for allies"
    );
    assert_eq!(
        router.correct_sender(&world, REMOTE_BLUE),
        Some(connection(BOT_BLUE, ConnectionKind::Automated)),
        "a hosted bot speaks for its own team"
    );
    assert_eq!(router.correct_sender(&world, LONER), None);
}

#[test]
fn changes_are_bundled_per_sender_and_unreachable_entries_dropped() {
    let before = session();
    let router = UpdateRouter::new();
    let mut after = before.clone();
    let mut events = Vec::new();
    for unit in 1..=4 {
        apply(
            &mut after,
            Command::SetCrew {
                unit: UnitId::new(unit),
                crew: lobby_core::Crew {
                    name: format!("Pilot {unit}"),
                    ..lobby_core::Crew::default()
                },
            },
            &mut events,
        );
    }
    let touched = Touched::from_events(&events);
    let table = router.resolve(&before, &touched);

    let mut out = Vec::new();
    router.dispatch(&after, &table, &touched, &mut out);

    let summary: Vec<(PlayerId, Vec<UnitId>)> = out
        .iter()
        .map(|dispatch| match &dispatch.message {
            Outbound::UpdateUnits { units } => (
                dispatch.sender.player,
                units.iter().map(|unit| unit.id).collect(),
            ),
            other => panic!("unexpected message {other:?}"),
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            (OPERATOR, vec![UnitId::new(1)]),
            (BOT_BLUE, vec![UnitId::new(2), UnitId::new(3)]),
        ],
        "the loner's unit has no sender and is dropped"
    );
}

#[test]
fn force_changes_turn_a_bundle_into_a_force_update() {
    let before = session();
    let router = UpdateRouter::new();
    let mut after = before.clone();
    let mut events = Vec::new();
    apply(
        &mut after,
        Command::CreateForce {
            force: ForceId::new(1),
            name: String::from("Striker Lance"),
            parent: None,
            owner: OPERATOR,
        },
        &mut events,
    );
    apply(
        &mut after,
        Command::AssignForce {
            unit: UnitId::new(1),
            force: Some(ForceId::new(1)),
        },
        &mut events,
    );
    let touched = Touched::from_events(&events);
    let mut table = router.resolve(&before, &touched);
    router.complete(&after, &touched, &mut table);

    let mut out = Vec::new();
    router.dispatch(&after, &table, &touched, &mut out);
    assert_eq!(out.len(), 1);
    match &out[0].message {
        Outbound::UpdateForces { forces, units } => {
            assert_eq!(forces[0].id, ForceId::new(1));
            assert_eq!(units[0].force, Some(ForceId::new(1)));
        }
        other => panic!("expected a force update, got {other:?}"),
    }
}

#[derive(Default)]
struct Recorder {
    calls: Vec<String>,
}

impl MessageSink for Recorder {
    fn send_add(&mut self, sender: SendingConnection, units: &[UnitSnapshot]) {
        self.calls.push(format!("add {} by {}", units.len(), sender.player));
    }

    fn send_update(&mut self, sender: SendingConnection, units: &[UnitSnapshot]) {
        self.calls
            .push(format!("update {} by {}", units.len(), sender.player));
    }

    fn send_update_force(
        &mut self,
        sender: SendingConnection,
        forces: &[ForceSnapshot],
        units: &[UnitSnapshot],
    ) {
        self.calls.push(format!(
            "force update {}/{} by {}",
            forces.len(),
            units.len(),
            sender.player
        ));
    }

    fn send_delete(&mut self, sender: SendingConnection, units: &[UnitId]) {
        self.calls
            .push(format!("delete {} by {}", units.len(), sender.player));
    }

    fn send_delete_forces(&mut self, sender: SendingConnection, forces: &[ForceId]) {
        self.calls
            .push(format!("delete forces {} by {}", forces.len(), sender.player));
    }

    fn send_team(&mut self, sender: SendingConnection, player: PlayerId, team: Option<TeamId>) {
        self.calls.push(format!(
            "team {player} -> {:?} by {}",
            team.map(|team| team.get()),
            sender.player
        ));
    }
}

#[test]
fn delivery_preserves_dispatch_order() {
    let world = session();
    let router = UpdateRouter::new();
    let operator = connection(OPERATOR, ConnectionKind::Operator);
    let dispatches = vec![
        Dispatch {
            sender: operator,
            message: Outbound::UpdateUnits {
                units: vec![query::unit_snapshot(&world, UnitId::new(1)).expect("unit")],
            },
        },
        Dispatch {
            sender: operator,
            message: Outbound::DeleteUnits {
                units: vec![UnitId::new(1)],
            },
        },
        router
            .team_change(&world, BOT_RED, Some(TeamId::new(2)))
            .expect("hosted bot"),
    ];

    let mut recorder = Recorder::default();
    deliver(&dispatches, &mut recorder);
    assert_eq!(
        recorder.calls,
        vec![
            String::from("update 1 by player #1"),
            String::from("delete 1 by player #1"),
            String::from("team player #2 -> Some(2) by player #2"),
        ]
    );
    assert!(
        router.team_change(&world, REMOTE_BLUE, None).is_none(),
        "remote participants cannot be moved from this session"
    );
}
