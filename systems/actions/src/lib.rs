#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Composite lobby actions.
//!
//! Every action follows the same template: validate the request against the
//! ownership policy, plan every side effect as a batch of primitive commands,
//! resolve senders against the world as it is now, commit the batch, and
//! route the committed changes to the local connections. A rejected request
//! returns its error before anything is committed or sent.

use lobby_core::{Command, Dispatch};
use lobby_system_routing::UpdateRouter;
use lobby_world::{apply, Touched, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

mod graphs;
mod setup;
mod units;

pub use setup::CrewLabel;

/// Facade executing lobby actions on behalf of the local session.
#[derive(Clone, Debug)]
pub struct LobbyActions {
    router: UpdateRouter,
    rng: ChaCha8Rng,
}

impl Default for LobbyActions {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl LobbyActions {
    /// Creates a facade whose random crew generation is seeded for determinism.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            router: UpdateRouter::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Commits the batch and routes the committed changes.
    ///
    /// Senders are resolved before the batch commits; entities the batch
    /// creates are resolved against the committed world.
    fn execute(
        &self,
        world: &mut World,
        commands: Vec<Command>,
        out: &mut Vec<Dispatch>,
    ) -> Touched {
        let mut staged = world.clone();
        let mut events = Vec::new();
        for command in commands {
            apply(&mut staged, command, &mut events);
        }

        let touched = Touched::from_events(&events);
        let mut table = self.router.resolve(world, &touched);
        self.router.complete(&staged, &touched, &mut table);

        *world = staged;
        self.router.dispatch(world, &table, &touched, out);
        touched
    }
}
