//! Configuration validation.

use super::Config;
use crate::core::identifier::validate_identifier;
use crate::core::traits::Dialect;
use crate::dialect::{DialectImpl, DialectKind};
use crate::error::{FanoutError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Source validation
    let source = config.endpoint(&config.source)?;
    if source.dialect != DialectKind::Mssql {
        return Err(FanoutError::Config(format!(
            "source endpoint '{}' must be mssql, got '{}'",
            config.source, source.dialect
        )));
    }

    // Endpoint validation
    for (name, endpoint) in &config.endpoints {
        if endpoint.database.is_empty() {
            return Err(FanoutError::Config(format!(
                "endpoints.{}.database is required",
                name
            )));
        }
        if endpoint.dialect != DialectKind::Sqlite
            && endpoint.host.as_deref().map_or(true, str::is_empty)
        {
            return Err(FanoutError::Config(format!(
                "endpoints.{}.host is required",
                name
            )));
        }
    }

    // Migration config validation
    if config.migration.page_size == 0 {
        return Err(FanoutError::Config(
            "migration.page_size must be at least 1".into(),
        ));
    }
    if config.migration.insert_chunk_size == 0 {
        return Err(FanoutError::Config(
            "migration.insert_chunk_size must be at least 1".into(),
        ));
    }
    if config.migration.insert_chunk_size > config.migration.page_size {
        return Err(FanoutError::Config(format!(
            "migration.insert_chunk_size ({}) cannot exceed migration.page_size ({})",
            config.migration.insert_chunk_size, config.migration.page_size
        )));
    }

    // Plan validation
    for plan in &config.plans {
        let target = config.endpoint(&plan.target)?;
        if plan.target == config.source {
            return Err(FanoutError::Config(format!(
                "plan target '{}' is the source endpoint",
                plan.target
            )));
        }
        if plan.direct_copy && target.dialect != DialectKind::Mssql {
            return Err(FanoutError::Config(format!(
                "direct_copy requires an mssql target, '{}' is {}",
                plan.target, target.dialect
            )));
        }
        if let Some(max) = DialectImpl::new(target.dialect, None).max_insert_rows() {
            if config.migration.insert_chunk_size > max {
                return Err(FanoutError::Config(format!(
                    "migration.insert_chunk_size ({}) exceeds the {} row limit of {} target '{}'",
                    config.migration.insert_chunk_size, max, target.dialect, plan.target
                )));
            }
        }
        if plan.schemas.is_empty() {
            return Err(FanoutError::Config(format!(
                "plan for '{}' lists no schemas",
                plan.target
            )));
        }
        for mapping in &plan.schemas {
            validate_identifier(&mapping.source)?;
            validate_identifier(mapping.target_schema())?;
            for table in mapping.include.iter().chain(&mapping.exclude) {
                validate_identifier(table)?;
            }
        }
    }

    Ok(())
}
