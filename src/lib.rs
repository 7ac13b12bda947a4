mod element;
pub use element::*;

mod intern;
pub use intern::*;

mod error;
pub use error::*;

mod graph;
pub use graph::*;

mod smiles;
pub use smiles::*;

mod ring;
pub use ring::*;

mod perception;
pub use perception::*;

mod canon;
pub use canon::*;

mod fingerprint;
pub use fingerprint::*;

mod mapping;
pub use mapping::*;

mod solution;
pub use solution::*;

mod engine;
pub use engine::*;

mod cache;
pub use cache::*;

mod prefilter;
pub use prefilter::*;

mod substructure;
pub use substructure::*;

mod mcs;
pub use mcs::*;

mod task;
pub use task::*;

mod pool;
pub use pool::*;

mod visualize;
pub use visualize::*;

#[cfg(test)]
mod testing;

/// Installs a `tracing` subscriber. `RUST_LOG` wins over `level` when set.
/// Calling this more than once is harmless.
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .try_init();
}
