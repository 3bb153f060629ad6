//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::{FanoutError, Result};
use crate::source::ConnectionTarget;
use sha2::{Digest, Sha256};
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Compute a SHA256 hash of the configuration, reported with each run.
    ///
    /// Passwords are not serialized and do not affect the hash.
    pub fn hash(&self) -> String {
        let yaml = serde_yaml::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(yaml.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Look up an endpoint by name.
    pub fn endpoint(&self, name: &str) -> Result<&EndpointConfig> {
        self.endpoints
            .get(name)
            .ok_or_else(|| FanoutError::UnknownEndpoint(name.to_string()))
    }

    /// Connection handle for a named endpoint.
    pub fn connection_target(&self, name: &str) -> Result<ConnectionTarget> {
        let endpoint = self.endpoint(name)?;
        Ok(ConnectionTarget::new(
            name,
            endpoint.dialect,
            endpoint.database.clone(),
        ))
    }

    /// Connection handle for the source endpoint.
    pub fn source_target(&self) -> Result<ConnectionTarget> {
        self.connection_target(&self.source)
    }

    /// Plans, optionally narrowed to one target endpoint.
    pub fn plans_for(&self, target: Option<&str>) -> Result<Vec<&PlanConfig>> {
        match target {
            None => Ok(self.plans.iter().collect()),
            Some(name) => {
                let plans: Vec<_> = self.plans.iter().filter(|p| p.target == name).collect();
                if plans.is_empty() {
                    return Err(FanoutError::Config(format!(
                        "no plan targets endpoint '{}'",
                        name
                    )));
                }
                Ok(plans)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectKind;

    const SAMPLE: &str = r#"
source: adventureworks
endpoints:
  adventureworks:
    dialect: mssql
    host: localhost
    database: AdventureWorks2022
    user: sa
    password: secret
    wrapper: [docker, exec, sqlserver]
  people:
    dialect: postgres
    host: localhost
    database: personmanagement
    user: postgres
  inventory:
    dialect: mysql
    host: localhost
    database: inventorymanagement
    user: root
  logistics:
    dialect: sqlite
    database: data/LogisticsManagement.db
plans:
  - target: people
    schemas:
      - source: Person
        exclude: [AddressType]
      - source: HumanResources
        target: HR
  - target: logistics
    schemas:
      - source: Purchasing
"#;

    #[test]
    fn test_parse_sample_with_defaults() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.source, "adventureworks");
        assert_eq!(config.endpoints.len(), 4);
        assert_eq!(config.migration.page_size, 1000);
        assert_eq!(config.migration.insert_chunk_size, 200);
        assert_eq!(config.migration.metadata_timeout_secs, 120);
        assert_eq!(config.migration.provision_mode, ProvisionMode::Resume);
        assert_eq!(config.plans.len(), 2);
        assert!(!config.plans[0].direct_copy);
    }

    #[test]
    fn test_schema_mapping() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let person = &config.plans[0].schemas[0];
        assert_eq!(person.target_schema(), "Person");
        assert!(person.selects("Address"));
        assert!(!person.selects("AddressType"));
        assert!(!person.selects("addresstype"));

        let hr = &config.plans[0].schemas[1];
        assert_eq!(hr.target_schema(), "HR");
    }

    #[test]
    fn test_include_list_restricts_tables() {
        let mapping = SchemaMapping {
            source: "Sales".into(),
            target: None,
            include: vec!["Store".into()],
            exclude: vec![],
        };
        assert!(mapping.selects("Store"));
        assert!(!mapping.selects("Customer"));
    }

    #[test]
    fn test_connection_target() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let target = config.connection_target("logistics").unwrap();
        assert_eq!(target.dialect, DialectKind::Sqlite);
        assert_eq!(target.database, "data/LogisticsManagement.db");

        let err = config.connection_target("nope").unwrap_err();
        assert!(matches!(err, FanoutError::UnknownEndpoint(_)));
    }

    #[test]
    fn test_endpoint_defaults() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let people = config.endpoint("people").unwrap();
        assert_eq!(people.port_or_default(), Some(5432));
        assert_eq!(people.program(), "psql");
        assert_eq!(config.endpoint("logistics").unwrap().port_or_default(), None);
    }

    #[test]
    fn test_plans_for() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.plans_for(None).unwrap().len(), 2);
        assert_eq!(config.plans_for(Some("logistics")).unwrap().len(), 1);
        assert!(config.plans_for(Some("inventory")).is_err());
    }

    #[test]
    fn test_hash_ignores_password() {
        let a = Config::from_yaml(SAMPLE).unwrap();
        let b = Config::from_yaml(&SAMPLE.replace("password: secret", "password: other")).unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash().len(), 64);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fanout.yaml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.plans.len(), 2);

        assert!(matches!(
            Config::load(dir.path().join("missing.yaml")),
            Err(FanoutError::Io(_))
        ));
    }
}
