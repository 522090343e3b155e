//! Configuration module
//!
//! Every entry point reads the same environment (optionally seeded from a
//! `.env` file) and validates only the sections it uses.

use std::env;

use serde_json::{json, Map, Value};

use crate::backend_types::{CatalogBackend, StorageBackend};

// Common constants
const DB_MAX_CONNECTIONS: u32 = 5;
const CATALOG_PAGE_SIZE: usize = 100;
const SERVER_PORT: u16 = 3000;
const RECENT_PRODUCTS_DAYS: i64 = 7;
const MAX_NEIGHBORS: usize = 2;

pub const DEFAULT_SEARCH_URL: &str = "https://api.daac.asf.alaska.edu/services/search/param";
pub const DEFAULT_BASELINE_URL: &str = "https://api.daac.asf.alaska.edu/services/search/baseline";
pub const DEFAULT_HYP3_URL: &str = "https://hyp3-api.asf.alaska.edu";
pub const DEFAULT_AUTH_URL: &str = "https://urs.earthdata.nasa.gov/oauth/authorize?response_type=code&client_id=BO_n7nTIlMljdvU6kRRB3g&redirect_uri=https://auth.asf.alaska.edu/login";

/// Catalog table service settings
#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub backend: CatalogBackend,
    pub event_table: String,
    pub product_table: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub page_size: usize,
    pub aws_region: Option<String>,
    pub dynamodb_endpoint: Option<String>,
}

/// Granule search API settings
#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub search_url: String,
    pub baseline_url: String,
    pub beam_mode: String,
    pub platform: String,
    pub processing_level: String,
    pub max_neighbors: usize,
}

/// HyP3 job API settings
#[derive(Clone, Debug)]
pub struct Hyp3Config {
    pub api_url: String,
    pub auth_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Destination object store settings
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: Option<String>,
    pub public_base_url: Option<String>,
    pub aws_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
}

/// Query API settings
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub server_port: u16,
    pub recent_products_days: i64,
}

/// Job type plus the named processing parameters sent with it.
#[derive(Clone, Debug, PartialEq)]
pub struct JobProfile {
    pub job_type: String,
    pub parameters: Map<String, Value>,
}

/// Single-scene and paired job profiles used by the orchestrator.
#[derive(Clone, Debug, PartialEq)]
pub struct JobProfiles {
    pub rtc: JobProfile,
    pub insar: JobProfile,
}

impl Default for JobProfiles {
    fn default() -> Self {
        Self {
            rtc: JobProfile {
                job_type: "RTC_GAMMA".to_string(),
                parameters: Map::new(),
            },
            insar: JobProfile {
                job_type: "INSAR_GAMMA".to_string(),
                parameters: default_insar_parameters(),
            },
        }
    }
}

fn default_insar_parameters() -> Map<String, Value> {
    match json!({"include_look_vectors": true, "apply_water_mask": true}) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub catalog: CatalogConfig,
    pub search: SearchConfig,
    pub hyp3: Hyp3Config,
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub job_profiles: JobProfiles,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let aws_region = env_opt("AWS_REGION");

        let catalog = CatalogConfig {
            backend: env::var("CATALOG_BACKEND")
                .unwrap_or_else(|_| "dynamodb".to_string())
                .parse()?,
            event_table: env::var("EVENT_TABLE").unwrap_or_else(|_| "events".to_string()),
            product_table: env::var("PRODUCT_TABLE").unwrap_or_else(|_| "products".to_string()),
            database_url: env_opt("DATABASE_URL"),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| DB_MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(DB_MAX_CONNECTIONS),
            page_size: env::var("CATALOG_PAGE_SIZE")
                .unwrap_or_else(|_| CATALOG_PAGE_SIZE.to_string())
                .parse()
                .ok()
                .filter(|&size: &usize| size > 0)
                .unwrap_or(CATALOG_PAGE_SIZE),
            aws_region: aws_region.clone(),
            dynamodb_endpoint: env_opt("DYNAMODB_ENDPOINT"),
        };

        let search = SearchConfig {
            search_url: env::var("SEARCH_URL").unwrap_or_else(|_| DEFAULT_SEARCH_URL.to_string()),
            baseline_url: env::var("BASELINE_URL")
                .unwrap_or_else(|_| DEFAULT_BASELINE_URL.to_string()),
            beam_mode: env::var("SEARCH_BEAM_MODE").unwrap_or_else(|_| "IW".to_string()),
            platform: env::var("SEARCH_PLATFORM").unwrap_or_else(|_| "SENTINEL-1".to_string()),
            processing_level: env::var("SEARCH_PROCESSING_LEVEL")
                .unwrap_or_else(|_| "SLC".to_string()),
            max_neighbors: match env_opt("MAX_NEIGHBORS") {
                Some(raw) => parse_max_neighbors(&raw)?,
                None => MAX_NEIGHBORS,
            },
        };

        let hyp3 = Hyp3Config {
            api_url: env::var("HYP3_URL").unwrap_or_else(|_| DEFAULT_HYP3_URL.to_string()),
            auth_url: env::var("AUTH_URL").unwrap_or_else(|_| DEFAULT_AUTH_URL.to_string()),
            username: env_opt("EDL_USERNAME"),
            password: env_opt("EDL_PASSWORD"),
        };

        let storage = StorageConfig {
            backend: env::var("STORAGE_BACKEND")
                .unwrap_or_else(|_| "s3".to_string())
                .parse()?,
            bucket: env_opt("BUCKET_NAME"),
            public_base_url: env_opt("PUBLIC_BASE_URL"),
            aws_region,
            s3_endpoint: env_opt("S3_ENDPOINT"),
            local_storage_path: env_opt("LOCAL_STORAGE_PATH"),
        };

        let api = ApiConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            recent_products_days: env::var("RECENT_PRODUCTS_DAYS")
                .unwrap_or_else(|_| RECENT_PRODUCTS_DAYS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("RECENT_PRODUCTS_DAYS must be a whole number"))?,
        };

        let defaults = JobProfiles::default();
        let job_profiles = JobProfiles {
            rtc: JobProfile {
                job_type: env::var("RTC_JOB_TYPE").unwrap_or(defaults.rtc.job_type),
                parameters: match env_opt("RTC_JOB_PARAMETERS") {
                    Some(raw) => parse_job_parameters("RTC_JOB_PARAMETERS", &raw)?,
                    None => defaults.rtc.parameters,
                },
            },
            insar: JobProfile {
                job_type: env::var("INSAR_JOB_TYPE").unwrap_or(defaults.insar.job_type),
                parameters: match env_opt("INSAR_JOB_PARAMETERS") {
                    Some(raw) => parse_job_parameters("INSAR_JOB_PARAMETERS", &raw)?,
                    None => defaults.insar.parameters,
                },
            },
        };

        let config = Config {
            environment,
            catalog,
            search,
            hyp3,
            storage,
            api,
            job_profiles,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Checks shared by every entry point (catalog access).
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.catalog.event_table.is_empty() || self.catalog.product_table.is_empty() {
            return Err(anyhow::anyhow!(
                "EVENT_TABLE and PRODUCT_TABLE must not be empty"
            ));
        }

        match self.catalog.backend {
            CatalogBackend::Postgres => match self.catalog.database_url.as_deref() {
                Some(url) if url.starts_with("postgres://") || url.starts_with("postgresql://") => {
                }
                Some(_) => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be a valid PostgreSQL connection string"
                    ))
                }
                None => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be set when using the postgres catalog backend"
                    ))
                }
            },
            CatalogBackend::DynamoDb => {}
            CatalogBackend::Memory => {
                if self.is_production() {
                    return Err(anyhow::anyhow!(
                        "The memory catalog backend cannot be used in production"
                    ));
                }
            }
        }

        Ok(())
    }

    /// Checks for the job submission run.
    pub fn validate_find_new(&self) -> Result<(), anyhow::Error> {
        self.validate()?;
        self.validate_hyp3()?;
        if self.search.max_neighbors == 0 {
            return Err(anyhow::anyhow!("MAX_NEIGHBORS must be at least 1"));
        }
        Ok(())
    }

    /// Checks for the harvest run.
    pub fn validate_harvest(&self) -> Result<(), anyhow::Error> {
        self.validate()?;
        self.validate_hyp3()?;

        if self.storage.bucket.is_none() {
            return Err(anyhow::anyhow!("BUCKET_NAME must be set for harvesting"));
        }
        match self.storage.backend {
            StorageBackend::S3 => {
                if self.storage.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.storage.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
        }
        Ok(())
    }

    fn validate_hyp3(&self) -> Result<(), anyhow::Error> {
        if self.hyp3.username.is_none() || self.hyp3.password.is_none() {
            return Err(anyhow::anyhow!(
                "EDL_USERNAME and EDL_PASSWORD must be set to use the HyP3 API"
            ));
        }
        Ok(())
    }
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

/// Parse `MAX_NEIGHBORS`; zero and negative values are rejected.
pub fn parse_max_neighbors(raw: &str) -> Result<usize, anyhow::Error> {
    match raw.trim().parse::<usize>() {
        Ok(0) | Err(_) => Err(anyhow::anyhow!(
            "MAX_NEIGHBORS must be a positive integer, got '{}'",
            raw
        )),
        Ok(n) => Ok(n),
    }
}

/// Parse a JSON object of job parameters from an environment variable.
pub fn parse_job_parameters(name: &str, raw: &str) -> Result<Map<String, Value>, anyhow::Error> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => {
            if map.contains_key("granules") {
                return Err(anyhow::anyhow!(
                    "{} must not set 'granules', they are filled per job",
                    name
                ));
            }
            Ok(map)
        }
        Ok(_) => Err(anyhow::anyhow!("{} must be a JSON object", name)),
        Err(e) => Err(anyhow::anyhow!("{} is not valid JSON: {}", name, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            environment: "development".to_string(),
            catalog: CatalogConfig {
                backend: CatalogBackend::Memory,
                event_table: "events".to_string(),
                product_table: "products".to_string(),
                database_url: None,
                db_max_connections: DB_MAX_CONNECTIONS,
                page_size: CATALOG_PAGE_SIZE,
                aws_region: None,
                dynamodb_endpoint: None,
            },
            search: SearchConfig {
                search_url: DEFAULT_SEARCH_URL.to_string(),
                baseline_url: DEFAULT_BASELINE_URL.to_string(),
                beam_mode: "IW".to_string(),
                platform: "SENTINEL-1".to_string(),
                processing_level: "SLC".to_string(),
                max_neighbors: MAX_NEIGHBORS,
            },
            hyp3: Hyp3Config {
                api_url: DEFAULT_HYP3_URL.to_string(),
                auth_url: DEFAULT_AUTH_URL.to_string(),
                username: Some("user".to_string()),
                password: Some("pass".to_string()),
            },
            storage: StorageConfig {
                backend: StorageBackend::Local,
                bucket: Some("bucket".to_string()),
                public_base_url: None,
                aws_region: None,
                s3_endpoint: None,
                local_storage_path: Some("/tmp/sarwatch".to_string()),
            },
            api: ApiConfig {
                server_port: SERVER_PORT,
                recent_products_days: RECENT_PRODUCTS_DAYS,
            },
            job_profiles: JobProfiles::default(),
        }
    }

    #[test]
    fn test_parse_max_neighbors() {
        assert_eq!(parse_max_neighbors("3").unwrap(), 3);
        assert!(parse_max_neighbors("0").is_err());
        assert!(parse_max_neighbors("-1").is_err());
        assert!(parse_max_neighbors("many").is_err());
    }

    #[test]
    fn test_parse_job_parameters() {
        let params =
            parse_job_parameters("X", r#"{"include_look_vectors": false, "looks": "20x4"}"#)
                .unwrap();
        assert_eq!(params["include_look_vectors"], Value::Bool(false));
        assert!(parse_job_parameters("X", "[1, 2]").is_err());
        assert!(parse_job_parameters("X", "{not json").is_err());
        assert!(parse_job_parameters("X", r#"{"granules": []}"#).is_err());
    }

    #[test]
    fn test_default_profiles() {
        let profiles = JobProfiles::default();
        assert_eq!(profiles.rtc.job_type, "RTC_GAMMA");
        assert!(profiles.rtc.parameters.is_empty());
        assert_eq!(profiles.insar.job_type, "INSAR_GAMMA");
        assert_eq!(profiles.insar.parameters["apply_water_mask"], Value::Bool(true));
        assert_eq!(
            profiles.insar.parameters["include_look_vectors"],
            Value::Bool(true)
        );
    }

    #[test]
    fn test_validate_postgres_requires_url() {
        let mut config = test_config();
        config.catalog.backend = CatalogBackend::Postgres;
        assert!(config.validate().is_err());

        config.catalog.database_url = Some("mysql://localhost/db".to_string());
        assert!(config.validate().is_err());

        config.catalog.database_url = Some("postgresql://localhost/db".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_memory_backend_rejected_in_production() {
        let mut config = test_config();
        config.environment = "production".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_find_new_requires_credentials() {
        let mut config = test_config();
        assert!(config.validate_find_new().is_ok());
        config.hyp3.password = None;
        assert!(config.validate_find_new().is_err());
    }

    #[test]
    fn test_validate_harvest_requires_bucket_and_path() {
        let mut config = test_config();
        assert!(config.validate_harvest().is_ok());

        config.storage.local_storage_path = None;
        assert!(config.validate_harvest().is_err());

        let mut config = test_config();
        config.storage.bucket = None;
        assert!(config.validate_harvest().is_err());

        let mut config = test_config();
        config.storage.backend = StorageBackend::S3;
        assert!(config.validate_harvest().is_err());
        config.storage.aws_region = Some("us-west-2".to_string());
        assert!(config.validate_harvest().is_ok());
    }
}
