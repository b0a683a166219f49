//! JSON description of the context a program runs in.
//!
//! ```json
//! {
//!   "args": ["approve", { "encoding": "hex", "value": "0102" }],
//!   "txn": { "Fee": 1000, "Sender": "alice", "Accounts": ["bob"] },
//!   "gtxn": [{ "Amount": 5 }],
//!   "globals": { "MinTxnFee": 1000 },
//!   "accounts": {
//!     "alice": {
//!       "balance": 1000000,
//!       "min_balance": 100000,
//!       "applications": { "7": { "opted_in": true, "locals": { "count": 3 } } },
//!       "assets": { "31566704": { "amount": 500, "frozen": false } }
//!     }
//!   },
//!   "application": { "id": 7, "globals": { "owner": "alice" } },
//!   "assets": { "31566704": { "AssetTotal": 1000000, "AssetUnitName": "USDC" } },
//!   "cost_budget": 20000
//! }
//! ```
//!
//! Values are JSON numbers (`uint64`), strings (UTF-8 bytes) or
//! `{ "encoding": ..., "value": ... }` objects with one of the encodings
//! `hex`, `base64`, `base32`, `utf8` or `addr`. State keys are UTF-8 text.

use crate::types::address::Address;
use crate::types::encoding::{EncodingError, decode_with};
use crate::types::value::TypedValue;
use crate::virtual_machine::state::{
    Account, AppLocalState, Application, AssetHolding, AssetParams, KeyValues, Ledger,
};
use crate::virtual_machine::vm::context::{ExecutionContext, FieldValue, TxnFields};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors raised while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config \"{path}\": {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid value at {location}: {source}")]
    Value {
        location: String,
        source: EncodingError,
    },
}

/// A value as written in the configuration file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Uint(u64),
    Text(String),
    Encoded { encoding: String, value: String },
}

impl ConfigValue {
    /// Converts to a stack value; `location` names the value in errors.
    pub fn to_typed(&self, location: &str) -> Result<TypedValue, ConfigError> {
        let decoded = match self {
            ConfigValue::Uint(v) => return Ok(TypedValue::Uint64(*v)),
            ConfigValue::Text(s) => return Ok(TypedValue::from(s.as_str())),
            ConfigValue::Encoded { encoding, value } if encoding == "addr" => value
                .parse::<Address>()
                .map(|a| a.as_slice().to_vec()),
            ConfigValue::Encoded { encoding, value } => decode_with(encoding, value),
        };
        decoded
            .map(TypedValue::Bytes)
            .map_err(|source| ConfigError::Value {
                location: location.to_string(),
                source,
            })
    }
}

/// A transaction field: a single value or an array.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ConfigField {
    Array(Vec<ConfigValue>),
    Scalar(ConfigValue),
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocalStateConfig {
    pub opted_in: bool,
    pub locals: BTreeMap<String, ConfigValue>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HoldingConfig {
    pub amount: u64,
    pub frozen: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccountConfig {
    pub balance: Option<u64>,
    pub min_balance: Option<u64>,
    pub applications: BTreeMap<u64, LocalStateConfig>,
    pub assets: BTreeMap<u64, HoldingConfig>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApplicationConfig {
    pub id: u64,
    pub globals: BTreeMap<String, ConfigValue>,
}

/// Everything a program can observe, as loaded from JSON.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterpreterConfig {
    pub args: Vec<ConfigValue>,
    pub txn: BTreeMap<String, ConfigField>,
    pub gtxn: Vec<BTreeMap<String, ConfigField>>,
    pub globals: BTreeMap<String, ConfigValue>,
    pub accounts: BTreeMap<String, AccountConfig>,
    pub application: Option<ApplicationConfig>,
    pub assets: BTreeMap<u64, BTreeMap<String, ConfigValue>>,
    pub cost_budget: Option<u64>,
}

/// Reads and parses a configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<InterpreterConfig, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    InterpreterConfig::from_json(&text)
}

fn txn_fields(
    fields: &BTreeMap<String, ConfigField>,
    location: &str,
) -> Result<TxnFields, ConfigError> {
    let mut out = TxnFields::new();
    for (name, field) in fields {
        let at = format!("{location}.{name}");
        let value = match field {
            ConfigField::Scalar(v) => FieldValue::Scalar(v.to_typed(&at)?),
            ConfigField::Array(items) => FieldValue::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| v.to_typed(&format!("{at}[{i}]")))
                    .collect::<Result<_, _>>()?,
            ),
        };
        out.insert(name.clone(), value);
    }
    Ok(out)
}

/// Decodes a map of named values; `location` prefixes each name in errors.
fn typed_map(
    values: &BTreeMap<String, ConfigValue>,
    location: &str,
) -> Result<BTreeMap<String, TypedValue>, ConfigError> {
    let mut out = BTreeMap::new();
    for (name, v) in values {
        out.insert(name.clone(), v.to_typed(&format!("{location}.{name}"))?);
    }
    Ok(out)
}

/// Application state maps take their keys as UTF-8 bytes.
fn key_values(
    values: &BTreeMap<String, ConfigValue>,
    location: &str,
) -> Result<KeyValues, ConfigError> {
    Ok(typed_map(values, location)?
        .into_iter()
        .map(|(key, v)| (key.into_bytes(), v))
        .collect())
}

impl InterpreterConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds the execution context, decoding every value.
    pub fn into_context(self) -> Result<ExecutionContext, ConfigError> {
        let mut ctx = ExecutionContext::new();
        if let Some(budget) = self.cost_budget {
            ctx = ctx.with_budget(budget);
        }

        ctx.args = self
            .args
            .iter()
            .enumerate()
            .map(|(i, v)| v.to_typed(&format!("args[{i}]")))
            .collect::<Result<_, _>>()?;
        ctx.txn = txn_fields(&self.txn, "txn")?;
        ctx.gtxn = self
            .gtxn
            .iter()
            .enumerate()
            .map(|(i, fields)| txn_fields(fields, &format!("gtxn[{i}]")))
            .collect::<Result<_, _>>()?;
        ctx.globals = typed_map(&self.globals, "globals")?;
        ctx.ledger = self.ledger()?;
        Ok(ctx)
    }

    fn ledger(&self) -> Result<Ledger, ConfigError> {
        let mut ledger = Ledger::default();
        for (name, account) in &self.accounts {
            let mut applications = BTreeMap::new();
            for (app_id, local) in &account.applications {
                let locals = key_values(
                    &local.locals,
                    &format!("accounts.{name}.applications.{app_id}.locals"),
                )?;
                applications.insert(
                    *app_id,
                    AppLocalState {
                        opted_in: local.opted_in,
                        locals,
                    },
                );
            }
            let assets = account
                .assets
                .iter()
                .map(|(id, h)| {
                    (
                        *id,
                        AssetHolding {
                            amount: h.amount,
                            frozen: h.frozen,
                        },
                    )
                })
                .collect();
            ledger.accounts.insert(
                name.clone(),
                Account {
                    balance: account.balance,
                    min_balance: account.min_balance,
                    applications,
                    assets,
                },
            );
        }

        if let Some(app) = &self.application {
            ledger.application = Some(Application {
                id: app.id,
                globals: key_values(&app.globals, "application.globals")?,
            });
        }

        for (asset_id, params) in &self.assets {
            let params: AssetParams = typed_map(params, &format!("assets.{asset_id}"))?;
            ledger.assets.insert(*asset_id, params);
        }
        Ok(ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_machine::vm::cost::DEFAULT_COST_BUDGET;
    use std::io::Write;

    const FULL: &str = r#"{
        "args": ["approve", { "encoding": "hex", "value": "0102" }, 7],
        "txn": { "Fee": 1000, "Sender": "alice", "Accounts": ["bob", { "encoding": "base64", "value": "aGk=" }] },
        "gtxn": [{ "Amount": 5 }, {}],
        "globals": { "MinTxnFee": 1000 },
        "accounts": {
            "alice": {
                "balance": 1000000,
                "min_balance": 100000,
                "applications": { "7": { "opted_in": true, "locals": { "count": 3 } } },
                "assets": { "31566704": { "amount": 500 } }
            }
        },
        "application": { "id": 7, "globals": { "owner": "alice" } },
        "assets": { "31566704": { "AssetTotal": 1000000, "AssetUnitName": "USDC" } },
        "cost_budget": 700
    }"#;

    #[test]
    fn full_config_to_context() {
        let ctx = InterpreterConfig::from_json(FULL).unwrap().into_context().unwrap();
        assert_eq!(ctx.budget, 700);
        assert_eq!(
            ctx.args,
            vec![
                TypedValue::from("approve"),
                TypedValue::Bytes(vec![1, 2]),
                TypedValue::Uint64(7)
            ]
        );
        assert_eq!(ctx.txn["Fee"], FieldValue::Scalar(TypedValue::Uint64(1000)));
        assert_eq!(
            ctx.txn["Accounts"],
            FieldValue::Array(vec![TypedValue::from("bob"), TypedValue::from("hi")])
        );
        assert_eq!(ctx.gtxn.len(), 2);
        assert_eq!(ctx.globals["MinTxnFee"], TypedValue::Uint64(1000));

        assert_eq!(ctx.ledger.balance("alice").unwrap(), 1_000_000);
        assert!(ctx.ledger.opted_in("alice", 7).unwrap());
        assert_eq!(
            ctx.ledger.local_get("alice", 0, b"count").unwrap(),
            Some(TypedValue::Uint64(3))
        );
        assert_eq!(
            ctx.ledger.global_get(0, b"owner").unwrap(),
            Some(TypedValue::from("alice"))
        );
        assert_eq!(ctx.ledger.assets[&31566704]["AssetUnitName"], TypedValue::from("USDC"));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let ctx = InterpreterConfig::from_json("{}").unwrap().into_context().unwrap();
        assert_eq!(ctx.budget, DEFAULT_COST_BUDGET);
        assert!(ctx.txn.is_empty());
        assert!(ctx.ledger.application.is_none());
    }

    #[test]
    fn address_values() {
        let value = ConfigValue::Encoded {
            encoding: "addr".to_string(),
            value: "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ".to_string(),
        };
        assert_eq!(value.to_typed("txn.Receiver").unwrap(), TypedValue::Bytes(vec![0; 32]));
    }

    #[test]
    fn bad_encoding_names_location() {
        let err = InterpreterConfig::from_json(
            r#"{ "txn": { "Note": { "encoding": "rot13", "value": "x" } } }"#,
        )
        .unwrap()
        .into_context()
        .unwrap_err();
        assert!(matches!(err, ConfigError::Value { ref location, .. } if location == "txn.Note"));
    }

    #[test]
    fn unknown_top_level_key() {
        assert!(matches!(
            InterpreterConfig::from_json(r#"{ "acounts": {} }"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.cost_budget, Some(700));
        assert!(config.accounts.contains_key("alice"));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("absent.json"));
    }
}
