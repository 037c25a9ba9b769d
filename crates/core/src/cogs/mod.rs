//! Modules bundled with the framework

mod announce;
mod ping;

pub use announce::{Announce, AnnounceSettings};
pub use ping::Ping;

use crate::cog::CogCatalog;

/// Catalog of the bundled modules
///
/// Embedders start from this and add their own with
/// [`CogCatalog::with`].
#[must_use]
pub fn catalog() -> CogCatalog {
    CogCatalog::new()
        .with("announce", || Box::new(Announce::new()))
        .with("ping", || Box::new(Ping::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_names_match_cogs() {
        let catalog = catalog();
        for name in catalog.names() {
            assert_eq!(catalog.create(&name).unwrap().name(), name);
        }
        assert_eq!(catalog.names(), vec!["announce", "ping"]);
    }
}
