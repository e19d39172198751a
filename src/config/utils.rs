// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensorlink project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration validation helpers

use anyhow::Result;

use super::Config;

/// Validate rules that the type system cannot express.
///
/// Called after deserialization and after command-line overrides have been
/// applied, so an invalid override is caught the same way as an invalid
/// file.
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    if config.simulator.port == 0 {
        anyhow::bail!("simulator.port must be between 1 and 65535");
    }
    if config.polling.port == 0 {
        anyhow::bail!("polling.port must be between 1 and 65535");
    }
    if config.simulator.tick_interval_ms == 0 {
        anyhow::bail!("simulator.tick_interval_ms must be greater than 0");
    }
    if config.polling.poll_interval_ms == 0 {
        anyhow::bail!("polling.poll_interval_ms must be greater than 0");
    }
    if config.polling.connect_timeout_ms == 0 || config.polling.request_timeout_ms == 0 {
        anyhow::bail!("polling timeouts must be greater than 0");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_specific_rules(&Config::default()).is_ok());
    }

    #[test]
    fn zero_port_is_rejected() {
        let mut config = Config::default();
        config.simulator.port = 0;
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let mut config = Config::default();
        config.polling.poll_interval_ms = 0;
        assert!(validate_specific_rules(&config).is_err());

        let mut config = Config::default();
        config.simulator.tick_interval_ms = 0;
        assert!(validate_specific_rules(&config).is_err());
    }
}
