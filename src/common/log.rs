use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, registry};
use tracing_tree::HierarchicalLayer;

const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber. Later calls are ignored.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let tree = HierarchicalLayer::new(2)
        .with_targets(true)
        .with_bracketed_fields(true)
        .with_indent_lines(true);
    if registry().with(filter).with(tree).try_init().is_err() {
        tracing::debug!("logging already initialized");
    }
}
