use crate::config::DetectorConfig;

pub fn setup_logging(config: &DetectorConfig) -> anyhow::Result<()> {
    common::setup_logging(config.environment)
}
