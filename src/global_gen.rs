//! Default minter and entry point function.

#![cfg(feature = "global_gen")]
#![cfg_attr(docsrs, doc(cfg(feature = "global_gen")))]

use std::{env, sync::OnceLock};

use crate::{Config, Error, FlakeId, SharedMinter};

type MinterCell = OnceLock<Result<SharedMinter, Error>>;

/// Returns the process-wide minter, creating one from the environment if none exists.
fn global_minter() -> Result<&'static SharedMinter, Error> {
    static G: MinterCell = OnceLock::new();
    init_minter(&G, |var| env::var(var).ok())
}

/// Returns the minter held by `cell`, configuring it through `lookup` on first use.
///
/// The outcome of the first initialization attempt is kept, so a misconfigured environment is
/// reported by every call.
fn init_minter<'a>(
    cell: &'a MinterCell,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<&'a SharedMinter, Error> {
    cell.get_or_init(|| {
        Config::from_lookup(lookup).and_then(|config| SharedMinter::from_config(&config))
    })
    .as_ref()
    .map_err(Clone::clone)
}

/// Generates an identifier with the process-wide minter.
///
/// The minter is configured from the `FLAKEID_NODE_ID` and `FLAKEID_EPOCH_MS` environment
/// variables on first use (see [`Config::from_env`]) and guarantees the process-wide monotonic
/// order of the identifiers it issues.
///
/// # Examples
///
/// ```rust
/// # std::env::set_var("FLAKEID_NODE_ID", "7");
/// let id = flakeid::flakeid()?;
/// println!("{}", id); // e.g. "1630544123462524928"
///
/// let id_string: String = flakeid::flakeid()?.to_string();
/// # Ok::<(), flakeid::Error>(())
/// ```
pub fn flakeid() -> Result<FlakeId, Error> {
    global_minter()?.generate()
}
