//! Start-project form, members only: local validation, a name-collision
//! short-circuit before any send, then the ledger create plus a metadata
//! document linked to the newly assigned id.

use tracing::{error, warn};

use crate::chain::{CROWDSALE, HASH_STORAGE, PROJECT_LEDGER};
use crate::errors::{ClientError, Result};
use crate::identity;
use crate::ipfs::{self, ContentStore};
use crate::models::{Address, ProjectMetadata, TokenQuote};
use crate::provider::Provider;
use crate::view::{FieldError, FormStatus, Phase, PhaseEvent};
use crate::AppEnv;

pub const NAME_MAX: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct StartForm {
    pub name: String,
    /// Funding goal in display units.
    pub goal: u128,
    pub category: String,
    pub description: String,
    pub image_url: String,
}

#[derive(Debug, Clone)]
pub struct StartPage {
    pub phase: Phase,
    pub form: StartForm,
    pub errors: Vec<FieldError>,
    pub status: FormStatus,
    pub quote: Option<TokenQuote>,
    /// Id the ledger assigned to the created project.
    pub created_id: Option<u64>,
    viewer: Option<Address>,
}

impl StartPage {
    fn unloaded(phase: Phase) -> Self {
        StartPage {
            phase,
            form: StartForm::default(),
            errors: Vec::new(),
            status: FormStatus::default(),
            quote: None,
            created_id: None,
            viewer: None,
        }
    }

    pub async fn mount<P: Provider, C: ContentStore>(env: &AppEnv<P, C>) -> Self {
        match Self::load(env).await {
            Ok(page) => page,
            Err(e) => {
                error!("start-project mount failed: {e}");
                Self::unloaded(Phase::Loading.on(PhaseEvent::ConnectFailed))
            }
        }
    }

    async fn load<P: Provider, C: ContentStore>(env: &AppEnv<P, C>) -> Result<Self> {
        let account = env.chain.active_account()?.clone();
        env.chain.require(&[PROJECT_LEDGER, HASH_STORAGE, CROWDSALE])?;

        let viewer = identity::resolve(env, &account).await;
        if !viewer.is_logged_in {
            return Ok(Self::unloaded(Phase::Loading.on(PhaseEvent::NotLoggedIn)));
        }

        let quote = env.chain.token_quote().await?;

        Ok(StartPage {
            phase: Phase::Loading.on(PhaseEvent::LoggedIn),
            form: StartForm::default(),
            errors: Vec::new(),
            status: FormStatus::default(),
            quote: Some(quote),
            created_id: None,
            viewer: Some(account),
        })
    }

    pub fn form_changed(mut self, form: StartForm) -> Self {
        self.form = form;
        self
    }

    fn validate(form: &StartForm) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if form.name.trim().is_empty() {
            errors.push(FieldError::new("name", "please name the project"));
        } else if form.name.len() > NAME_MAX {
            errors.push(FieldError::new("name", "project name too long"));
        }
        if form.goal == 0 {
            errors.push(FieldError::new("goal", "the funding goal must be at least 1"));
        }
        errors
    }

    /// Create the project. The name collision check runs before anything
    /// is sent; the metadata document is linked after the ledger assigns
    /// an id.
    pub async fn submit<P: Provider, C: ContentStore>(mut self, env: &AppEnv<P, C>) -> Self {
        if self.status.is_submitting() {
            return self;
        }
        let (Some(viewer), Some(quote)) = (self.viewer.clone(), self.quote.clone()) else {
            return self;
        };

        self.errors = Self::validate(&self.form);
        if !self.errors.is_empty() {
            return self;
        }
        let name = self.form.name.trim().to_string();
        let goal = match quote.to_base(self.form.goal) {
            Ok(goal) => goal,
            Err(e) => {
                self.status = FormStatus::failed(e.to_string());
                return self;
            }
        };

        self.status = FormStatus::Submitting;

        match env.chain.ledger().project_exists(&name).await {
            Ok(true) => {
                self.status = FormStatus::failed("this project name is already used");
                return self;
            }
            Ok(false) => {}
            Err(e) => {
                self.status = FormStatus::failed(e.to_string());
                return self;
            }
        }

        let created: Result<u64> = async {
            env.chain.ledger().create(&name, goal).await?;
            // Ids are assigned by the ledger; the newest owned project is
            // the one just created.
            let ids = env.chain.ledger().owner_projects(&viewer).await?;
            ids.last().copied().ok_or_else(|| {
                ClientError::Transaction("created project not found on the ledger".to_string())
            })
        }
        .await;

        let id = match created {
            Ok(id) => id,
            Err(e) => {
                self.status = FormStatus::failed(e.to_string());
                return self;
            }
        };

        if let Err(e) = self.link_metadata(env, id).await {
            // The project exists either way; only its metadata link failed.
            warn!("metadata link for project {id} failed: {e}");
        }

        self.created_id = Some(id);
        self.status = FormStatus::Succeeded;
        self.form = StartForm::default();
        self
    }

    async fn link_metadata<P: Provider, C: ContentStore>(
        &self,
        env: &AppEnv<P, C>,
        id: u64,
    ) -> Result<()> {
        let metadata = ProjectMetadata {
            category: self.form.category.trim().to_string(),
            description: self.form.description.trim().to_string(),
            image_url: self.form.image_url.trim().to_string(),
            updates: Vec::new(),
        };
        if metadata == ProjectMetadata::default() {
            return Ok(());
        }
        let bytes = ipfs::to_document(&metadata)?;
        let hash = env.content.add(bytes).await?;
        env.chain.ledger().set_ipfs_hash(id, &hash).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{addr, test_env, MemoryContent, MockChain};

    fn member_chain() -> MockChain {
        MockChain::new().with_profile(addr(1), "ana", "pw123456")
    }

    fn filled_form(name: &str) -> StartForm {
        StartForm {
            name: name.to_string(),
            goal: 50,
            category: "water".to_string(),
            description: "a well for the village".to_string(),
            image_url: String::new(),
        }
    }

    #[tokio::test]
    async fn members_only() {
        let env = test_env(member_chain(), MemoryContent::default()).await;

        let page = StartPage::mount(&env).await;
        assert_eq!(page.phase, Phase::Unauthenticated);
    }

    #[tokio::test]
    async fn creates_a_project_and_links_its_metadata() {
        let chain = member_chain();
        let handle = chain.clone();
        let content = MemoryContent::default();
        let env = test_env(chain, content.clone()).await;
        env.session.start().unwrap();

        let page = StartPage::mount(&env).await.form_changed(filled_form("bridge"));
        let page = page.submit(&env).await;

        assert!(page.status.is_succeeded());
        assert_eq!(page.created_id, Some(0));
        assert!(page.form.name.is_empty());
        assert_eq!(handle.sends(), vec!["create", "setIpfsHash"]);

        let created = handle.project(0);
        assert_eq!(created.name, "bridge");
        // 50 display units at 2 decimals.
        assert_eq!(created.goal, 5_000);
        assert_eq!(created.owner, addr(1));
        assert!(!created.approved);

        let stored: ProjectMetadata =
            crate::ipfs::parse_document(&content.get(&created.ipfs_hash).unwrap()).unwrap();
        assert_eq!(stored.category, "water");
        assert!(stored.updates.is_empty());
    }

    #[tokio::test]
    async fn bare_form_skips_the_metadata_document() {
        let chain = member_chain();
        let handle = chain.clone();
        let env = test_env(chain, MemoryContent::default()).await;
        env.session.start().unwrap();

        let form = StartForm {
            name: "bridge".to_string(),
            goal: 10,
            ..StartForm::default()
        };
        let page = StartPage::mount(&env).await.form_changed(form).submit(&env).await;

        assert!(page.status.is_succeeded());
        assert_eq!(handle.sends(), vec!["create"]);
        assert!(handle.project(0).ipfs_hash.is_empty());
    }

    #[tokio::test]
    async fn duplicate_name_short_circuits_before_any_send() {
        let chain = member_chain().with_project("bridge", addr(2), 1_000, 0, true, true);
        let handle = chain.clone();
        let env = test_env(chain, MemoryContent::default()).await;
        env.session.start().unwrap();

        let page = StartPage::mount(&env).await.form_changed(filled_form("bridge"));
        let page = page.submit(&env).await;

        assert!(page.status.is_failed());
        assert!(handle.sends().is_empty());
        // Input survives for a rename.
        assert_eq!(page.form.name, "bridge");
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_the_chain() {
        let chain = member_chain();
        let handle = chain.clone();
        let env = test_env(chain, MemoryContent::default()).await;
        env.session.start().unwrap();

        let form = StartForm {
            name: "  ".to_string(),
            goal: 0,
            ..StartForm::default()
        };
        let page = StartPage::mount(&env).await.form_changed(form).submit(&env).await;

        assert_eq!(page.errors.len(), 2);
        assert_eq!(page.status, FormStatus::Idle);
        assert!(handle.sends().is_empty());
    }
}
