//! Landing page: greets a logged-in user by name, renders the public
//! variant otherwise.

use tracing::error;

use crate::chain::HASH_STORAGE;
use crate::errors::Result;
use crate::identity;
use crate::ipfs::ContentStore;
use crate::provider::Provider;
use crate::view::{Phase, PhaseEvent};
use crate::AppEnv;

#[derive(Debug, Clone)]
pub struct HomePage {
    pub phase: Phase,
    pub username: Option<String>,
}

impl HomePage {
    pub async fn mount<P: Provider, C: ContentStore>(env: &AppEnv<P, C>) -> Self {
        match Self::load(env).await {
            Ok(page) => page,
            Err(e) => {
                error!("home mount failed: {e}");
                HomePage {
                    phase: Phase::Loading.on(PhaseEvent::ConnectFailed),
                    username: None,
                }
            }
        }
    }

    async fn load<P: Provider, C: ContentStore>(env: &AppEnv<P, C>) -> Result<Self> {
        let account = env.chain.active_account()?.clone();
        env.chain.require(&[HASH_STORAGE])?;

        let identity = identity::resolve(env, &account).await;
        if !identity.is_logged_in {
            return Ok(HomePage {
                phase: Phase::Loading.on(PhaseEvent::NotLoggedIn),
                username: None,
            });
        }

        Ok(HomePage {
            phase: Phase::Loading.on(PhaseEvent::LoggedIn),
            username: identity.profile.map(|p| p.username),
        })
    }
}
