//! Ledger data supplied by the caller.
//!
//! The [`Ledger`] holds the accounts, the current application and asset
//! parameters that the state-accessing opcodes read. The only mutations the
//! engine performs are on application local and global key-value maps.
//!
//! Lookups of things the caller never supplied (accounts, balances, the
//! application) are configuration errors that name the missing key.

use crate::types::value::TypedValue;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::operand::{AssetHoldingField, AssetParamsField};
use std::collections::BTreeMap;

/// Key-value map used for application state.
pub type KeyValues = BTreeMap<Vec<u8>, TypedValue>;

/// An account's holding of one asset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetHolding {
    pub amount: u64,
    pub frozen: bool,
}

impl AssetHolding {
    pub fn field(&self, field: AssetHoldingField) -> TypedValue {
        match field {
            AssetHoldingField::AssetBalance => TypedValue::Uint64(self.amount),
            AssetHoldingField::AssetFrozen => TypedValue::from(self.frozen),
        }
    }
}

/// An account's local state in one application.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppLocalState {
    pub opted_in: bool,
    pub locals: KeyValues,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    pub balance: Option<u64>,
    pub min_balance: Option<u64>,
    /// Local state keyed by application id.
    pub applications: BTreeMap<u64, AppLocalState>,
    /// Holdings keyed by asset id.
    pub assets: BTreeMap<u64, AssetHolding>,
}

/// The application the program runs as.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Application {
    pub id: u64,
    pub globals: KeyValues,
}

/// Asset parameters keyed by field name.
pub type AssetParams = BTreeMap<String, TypedValue>;

/// Caller-supplied ledger view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ledger {
    /// Accounts keyed by address text (or any name the program refers to).
    pub accounts: BTreeMap<String, Account>,
    pub application: Option<Application>,
    /// Asset parameters keyed by asset id.
    pub assets: BTreeMap<u64, AssetParams>,
}

impl Ledger {
    pub fn account(&self, name: &str) -> Result<&Account, VMError> {
        self.accounts.get(name).ok_or_else(|| VMError::AccountNotFound {
            account: name.to_string(),
        })
    }

    fn account_mut(&mut self, name: &str) -> Result<&mut Account, VMError> {
        self.accounts
            .get_mut(name)
            .ok_or_else(|| VMError::AccountNotFound {
                account: name.to_string(),
            })
    }

    pub fn balance(&self, name: &str) -> Result<u64, VMError> {
        self.account(name)?
            .balance
            .ok_or_else(|| VMError::BalanceNotSet {
                account: name.to_string(),
            })
    }

    pub fn min_balance(&self, name: &str) -> Result<u64, VMError> {
        self.account(name)?
            .min_balance
            .ok_or_else(|| VMError::MinBalanceNotSet {
                account: name.to_string(),
            })
    }

    /// Maps application id 0 to the current application's id.
    pub fn resolve_app_id(&self, app_id: u64) -> Result<u64, VMError> {
        match (app_id, &self.application) {
            (0, Some(app)) => Ok(app.id),
            (0, None) => Err(VMError::ApplicationNotFound { app_id }),
            (id, _) => Ok(id),
        }
    }

    /// Returns the application with the given id (0 selects the current one).
    pub fn application(&self, app_id: u64) -> Result<&Application, VMError> {
        let id = self.resolve_app_id(app_id)?;
        self.application
            .as_ref()
            .filter(|app| app.id == id)
            .ok_or(VMError::ApplicationNotFound { app_id: id })
    }

    fn current_application_mut(&mut self) -> Result<&mut Application, VMError> {
        self.application
            .as_mut()
            .ok_or(VMError::ApplicationNotFound { app_id: 0 })
    }

    /// The account's entry for an application; a missing entry is a configuration error.
    fn local_state(&self, name: &str, app_id: u64) -> Result<&AppLocalState, VMError> {
        let id = self.resolve_app_id(app_id)?;
        self.account(name)?
            .applications
            .get(&id)
            .ok_or_else(|| VMError::LocalStateNotFound {
                account: name.to_string(),
                app_id: id,
            })
    }

    pub fn opted_in(&self, name: &str, app_id: u64) -> Result<bool, VMError> {
        Ok(self.local_state(name, app_id)?.opted_in)
    }

    pub fn local_get(&self, name: &str, app_id: u64, key: &[u8]) -> Result<Option<TypedValue>, VMError> {
        Ok(self.local_state(name, app_id)?.locals.get(key).cloned())
    }

    fn local_state_mut(&mut self, name: &str) -> Result<&mut AppLocalState, VMError> {
        let id = self.resolve_app_id(0)?;
        self.account_mut(name)?
            .applications
            .get_mut(&id)
            .ok_or_else(|| VMError::LocalStateNotFound {
                account: name.to_string(),
                app_id: id,
            })
    }

    pub fn local_put(&mut self, name: &str, key: Vec<u8>, value: TypedValue) -> Result<(), VMError> {
        self.local_state_mut(name)?.locals.insert(key, value);
        Ok(())
    }

    pub fn local_del(&mut self, name: &str, key: &[u8]) -> Result<(), VMError> {
        self.local_state_mut(name)?.locals.remove(key);
        Ok(())
    }

    pub fn global_get(&self, app_id: u64, key: &[u8]) -> Result<Option<TypedValue>, VMError> {
        Ok(self.application(app_id)?.globals.get(key).cloned())
    }

    pub fn global_put(&mut self, key: Vec<u8>, value: TypedValue) -> Result<(), VMError> {
        self.current_application_mut()?.globals.insert(key, value);
        Ok(())
    }

    pub fn global_del(&mut self, key: &[u8]) -> Result<(), VMError> {
        self.current_application_mut()?.globals.remove(key);
        Ok(())
    }

    /// Reads a holding field, or `None` if the account does not hold the asset.
    pub fn asset_holding(
        &self,
        name: &str,
        asset_id: u64,
        field: AssetHoldingField,
    ) -> Result<Option<TypedValue>, VMError> {
        Ok(self
            .account(name)?
            .assets
            .get(&asset_id)
            .map(|holding| holding.field(field)))
    }

    /// Reads an asset parameter, or `None` if the asset is unknown.
    ///
    /// A known asset missing the requested parameter is a configuration error.
    pub fn asset_param(&self, asset_id: u64, field: AssetParamsField) -> Result<Option<TypedValue>, VMError> {
        let Some(params) = self.assets.get(&asset_id) else {
            return Ok(None);
        };
        params
            .get(field.name())
            .cloned()
            .map(Some)
            .ok_or_else(|| VMError::MissingAssetParam {
                asset_id,
                field: field.name().to_string(),
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const ALICE: &str = "alice";
    pub(crate) const APP_ID: u64 = 7;
    pub(crate) const ASSET_ID: u64 = 31566704;

    /// Ledger with one opted-in account, the current application and one asset.
    pub(crate) fn test_ledger() -> Ledger {
        let mut locals = KeyValues::new();
        locals.insert(b"count".to_vec(), TypedValue::Uint64(3));
        let mut alice = Account {
            balance: Some(1_000_000),
            min_balance: Some(100_000),
            ..Default::default()
        };
        alice.applications.insert(
            APP_ID,
            AppLocalState {
                opted_in: true,
                locals,
            },
        );
        alice.assets.insert(
            ASSET_ID,
            AssetHolding {
                amount: 500,
                frozen: false,
            },
        );

        let mut globals = KeyValues::new();
        globals.insert(b"owner".to_vec(), TypedValue::from("alice"));

        let mut params = AssetParams::new();
        params.insert("AssetTotal".to_string(), TypedValue::Uint64(1_000_000));
        params.insert("AssetUnitName".to_string(), TypedValue::from("USDC"));

        let mut ledger = Ledger::default();
        ledger.accounts.insert(ALICE.to_string(), alice);
        ledger.application = Some(Application { id: APP_ID, globals });
        ledger.assets.insert(ASSET_ID, params);
        ledger
    }

    #[test]
    fn missing_account_is_named() {
        let err = test_ledger().balance("bob").unwrap_err();
        assert!(matches!(err, VMError::AccountNotFound { ref account } if account == "bob"));
        assert!(err.to_string().contains("add this to \"accounts\""));
    }

    #[test]
    fn balances() {
        let mut ledger = test_ledger();
        assert_eq!(ledger.balance(ALICE).unwrap(), 1_000_000);
        assert_eq!(ledger.min_balance(ALICE).unwrap(), 100_000);
        ledger.accounts.get_mut(ALICE).unwrap().balance = None;
        assert!(matches!(ledger.balance(ALICE), Err(VMError::BalanceNotSet { .. })));
    }

    #[test]
    fn app_id_zero_is_current() {
        let ledger = test_ledger();
        assert_eq!(ledger.resolve_app_id(0).unwrap(), APP_ID);
        assert!(ledger.opted_in(ALICE, 0).unwrap());
        assert!(matches!(
            ledger.opted_in(ALICE, 99),
            Err(VMError::LocalStateNotFound { ref account, app_id: 99 }) if account == ALICE
        ));
        assert!(matches!(
            ledger.application(99),
            Err(VMError::ApplicationNotFound { app_id: 99 })
        ));
    }

    #[test]
    fn no_application_configured() {
        let mut ledger = test_ledger();
        ledger.application = None;
        assert!(matches!(
            ledger.global_put(b"k".to_vec(), TypedValue::Uint64(1)),
            Err(VMError::ApplicationNotFound { app_id: 0 })
        ));
    }

    #[test]
    fn local_state_round_trip() {
        let mut ledger = test_ledger();
        assert_eq!(
            ledger.local_get(ALICE, APP_ID, b"count").unwrap(),
            Some(TypedValue::Uint64(3))
        );
        ledger.local_put(ALICE, b"name".to_vec(), TypedValue::from("a")).unwrap();
        assert_eq!(
            ledger.local_get(ALICE, 0, b"name").unwrap(),
            Some(TypedValue::from("a"))
        );
        ledger.local_del(ALICE, b"count").unwrap();
        assert_eq!(ledger.local_get(ALICE, 0, b"count").unwrap(), None);
    }

    #[test]
    fn local_put_without_local_state() {
        let mut ledger = test_ledger();
        ledger.accounts.insert("bob".to_string(), Account::default());
        assert!(matches!(
            ledger.local_put("bob", b"k".to_vec(), TypedValue::Uint64(1)),
            Err(VMError::LocalStateNotFound { app_id: APP_ID, .. })
        ));
        assert!(matches!(
            ledger.local_get("bob", 0, b"k"),
            Err(VMError::LocalStateNotFound { app_id: APP_ID, .. })
        ));
        assert!(matches!(
            ledger.local_get(ALICE, 99, b"count"),
            Err(VMError::LocalStateNotFound { app_id: 99, .. })
        ));
    }

    #[test]
    fn global_state_round_trip() {
        let mut ledger = test_ledger();
        ledger.global_put(b"n".to_vec(), TypedValue::Uint64(5)).unwrap();
        assert_eq!(ledger.global_get(0, b"n").unwrap(), Some(TypedValue::Uint64(5)));
        ledger.global_del(b"n").unwrap();
        assert_eq!(ledger.global_get(APP_ID, b"n").unwrap(), None);
    }

    #[test]
    fn assets() {
        let ledger = test_ledger();
        assert_eq!(
            ledger
                .asset_holding(ALICE, ASSET_ID, AssetHoldingField::AssetBalance)
                .unwrap(),
            Some(TypedValue::Uint64(500))
        );
        assert_eq!(
            ledger.asset_holding(ALICE, 1, AssetHoldingField::AssetFrozen).unwrap(),
            None
        );
        assert_eq!(
            ledger.asset_param(ASSET_ID, AssetParamsField::AssetUnitName).unwrap(),
            Some(TypedValue::from("USDC"))
        );
        assert_eq!(ledger.asset_param(1, AssetParamsField::AssetTotal).unwrap(), None);
        assert!(matches!(
            ledger.asset_param(ASSET_ID, AssetParamsField::AssetURL),
            Err(VMError::MissingAssetParam { .. })
        ));
    }
}
