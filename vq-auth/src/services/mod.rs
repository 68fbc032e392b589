pub mod account;
pub mod clock;
pub mod credentials;
pub mod ephemeral;
pub mod password;
pub mod refresh_ledger;
pub mod session;
pub mod token_service;

use std::sync::Arc;

use crate::config::TokenSettings;
use crate::store::{CredentialStore, EphemeralTokenStore, RefreshTokenStore};

use account::AccountService;
use clock::Clock;
use credentials::CredentialService;
use ephemeral::EphemeralTokens;
use refresh_ledger::RefreshLedger;
use session::SessionService;
use token_service::AccessTokenIssuer;

/// The account core, wired once at startup.
pub struct Services {
    pub credentials: Arc<CredentialService>,
    pub sessions: SessionService,
    pub accounts: AccountService,
}

impl Services {
    pub fn new<S>(store: Arc<S>, settings: TokenSettings, clock: Arc<dyn Clock>) -> Self
    where
        S: CredentialStore + RefreshTokenStore + EphemeralTokenStore + 'static,
    {
        let credentials = Arc::new(CredentialService::new(store.clone(), clock.clone()));
        let access = Arc::new(AccessTokenIssuer::new(settings.clone(), clock.clone()));
        let ledger = Arc::new(RefreshLedger::new(
            store.clone(),
            store.clone(),
            access.clone(),
            settings.clone(),
            clock.clone(),
        ));

        Self {
            sessions: SessionService::new(credentials.clone(), access, ledger.clone()),
            accounts: AccountService::new(
                credentials.clone(),
                EphemeralTokens::new(store, clock),
                ledger,
                settings.ephemeral_ttl,
            ),
            credentials,
        }
    }
}
