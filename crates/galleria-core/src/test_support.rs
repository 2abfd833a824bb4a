// Shared helpers for unit tests.

use std::sync::Arc;

use galleria_api::{RestClient, TransportConfig};
use url::Url;

use crate::registry::Registry;

/// A registry whose client points at a dead address; good for tests that
/// never touch the network.
pub(crate) fn test_registry() -> Arc<Registry> {
    let base = Url::parse("http://localhost:1/api").expect("static URL");
    let client = RestClient::new(base, &TransportConfig::default()).expect("client build");
    Registry::new(client)
}
