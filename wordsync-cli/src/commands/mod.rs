pub mod lint;
pub mod publish;
pub mod sync;
pub mod validate;

use anyhow::{Context, Result};

use wordsync_core::{config, SiteConfig};
use wordsync_rpc::XmlRpcClient;
use wordsync_sync::SyncError;

use crate::GlobalArgs;

/// User-facing message for a sync run that could not reach the server.
pub const CONNECTION_REFUSED: &str = "Could not connect to WordPress XML-RPC server.";

/// Load the config and resolve the selected target.
pub fn load_site(global: &GlobalArgs) -> Result<SiteConfig> {
    let config = config::load(global.config.as_deref()).context("failed to load config")?;
    config
        .resolve(global.target.as_deref())
        .context("failed to resolve target")
}

/// Build the per-run client for `site`.
pub fn connect(site: &SiteConfig) -> XmlRpcClient {
    let client = XmlRpcClient::new(site);
    tracing::debug!("using endpoint {}", client.endpoint());
    client
}

/// Wrap a failed sync with the distinguished connection-refused message.
pub fn explain_sync(err: SyncError, what: &str) -> anyhow::Error {
    if err.is_connection_refused() {
        return anyhow::Error::new(err).context(CONNECTION_REFUSED);
    }
    anyhow::Error::new(err).context(format!("{what} failed"))
}

/// "Validated one term." / "Validated 3 terms."
pub fn validated_message(count: usize) -> String {
    match count {
        1 => "Validated one term.".to_string(),
        n => format!("Validated {n} terms."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validated_message_uses_one_for_single_term() {
        assert_eq!(validated_message(1), "Validated one term.");
        assert_eq!(validated_message(0), "Validated 0 terms.");
        assert_eq!(validated_message(12), "Validated 12 terms.");
    }
}
