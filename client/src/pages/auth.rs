//! Login, registration and logout.
//!
//! Login proves ownership of the on-chain account's profile document:
//! the wallet address must hold a stored hash, and the entered
//! credentials must match the document behind it; only then does a local
//! session start. Registration refuses an address that already holds a
//! hash before anything is written.

use tracing::error;

use crate::chain::HASH_STORAGE;
use crate::errors::Result;
use crate::identity;
use crate::ipfs::{self, ContentStore};
use crate::models::{Address, UserProfile};
use crate::provider::Provider;
use crate::view::{FieldError, FormStatus, Phase, PhaseEvent};
use crate::AppEnv;

pub const USERNAME_MAX: usize = 30;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 30;

fn validate_credentials(username: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if username.is_empty() {
        errors.push(FieldError::new("username", "please enter a username"));
    } else if username.len() > USERNAME_MAX {
        errors.push(FieldError::new("username", "username too long"));
    }
    if password.len() < PASSWORD_MIN || password.len() > PASSWORD_MAX {
        errors.push(FieldError::new(
            "password",
            "password must be between 8 and 30 characters",
        ));
    }
    errors
}

// ─────────────────────────────────────────────────────────
// Login
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginPage {
    pub phase: Phase,
    pub form: LoginForm,
    pub errors: Vec<FieldError>,
    pub status: FormStatus,
    /// Already true on mount when a live session exists; the renderer
    /// redirects home instead of showing the form.
    pub logged_in: bool,
    viewer: Option<Address>,
}

impl LoginPage {
    fn unloaded(phase: Phase) -> Self {
        LoginPage {
            phase,
            form: LoginForm::default(),
            errors: Vec::new(),
            status: FormStatus::default(),
            logged_in: false,
            viewer: None,
        }
    }

    pub async fn mount<P: Provider, C: ContentStore>(env: &AppEnv<P, C>) -> Self {
        match Self::load(env).await {
            Ok(page) => page,
            Err(e) => {
                error!("login mount failed: {e}");
                Self::unloaded(Phase::Loading.on(PhaseEvent::ConnectFailed))
            }
        }
    }

    async fn load<P: Provider, C: ContentStore>(env: &AppEnv<P, C>) -> Result<Self> {
        let account = env.chain.active_account()?.clone();
        env.chain.require(&[HASH_STORAGE])?;

        let viewer = identity::resolve(env, &account).await;

        Ok(LoginPage {
            phase: Phase::Ready,
            form: LoginForm::default(),
            errors: Vec::new(),
            status: FormStatus::default(),
            logged_in: viewer.is_logged_in,
            viewer: Some(account),
        })
    }

    pub fn form_changed(mut self, form: LoginForm) -> Self {
        self.form = form;
        self
    }

    /// Check the entered credentials against the profile document behind
    /// the wallet's stored hash, then start the local session.
    pub async fn submit<P: Provider, C: ContentStore>(mut self, env: &AppEnv<P, C>) -> Self {
        if self.status.is_submitting() {
            return self;
        }
        let Some(viewer) = self.viewer.clone() else {
            return self;
        };

        self.errors = validate_credentials(&self.form.username, &self.form.password);
        if !self.errors.is_empty() {
            return self;
        }

        self.status = FormStatus::Submitting;

        match env.chain.hash_storage().account_has_hash(&viewer).await {
            Ok(true) => {}
            Ok(false) => {
                self.status = FormStatus::failed("no account is registered for this wallet");
                return self;
            }
            Err(e) => {
                self.status = FormStatus::failed(e.to_string());
                return self;
            }
        }

        let profile = match identity::fetch_profile(env, &viewer).await {
            Ok(profile) => profile,
            Err(e) => {
                self.status = FormStatus::failed(e.to_string());
                return self;
            }
        };

        if profile.username != self.form.username || profile.password != self.form.password {
            self.status = FormStatus::failed("incorrect username or password");
            return self;
        }

        match env.session.start() {
            Ok(()) => {
                self.logged_in = true;
                self.status = FormStatus::Succeeded;
            }
            Err(e) => self.status = FormStatus::failed(e.to_string()),
        }
        self
    }
}

// ─────────────────────────────────────────────────────────
// Registration
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub password: String,
    pub confirm_password: String,
    pub state: String,
    pub city: String,
}

#[derive(Debug, Clone)]
pub struct RegisterPage {
    pub phase: Phase,
    pub form: RegisterForm,
    pub errors: Vec<FieldError>,
    pub status: FormStatus,
    pub registered: bool,
    viewer: Option<Address>,
}

impl RegisterPage {
    fn unloaded(phase: Phase) -> Self {
        RegisterPage {
            phase,
            form: RegisterForm::default(),
            errors: Vec::new(),
            status: FormStatus::default(),
            registered: false,
            viewer: None,
        }
    }

    pub async fn mount<P: Provider, C: ContentStore>(env: &AppEnv<P, C>) -> Self {
        match Self::load(env).await {
            Ok(page) => page,
            Err(e) => {
                error!("register mount failed: {e}");
                Self::unloaded(Phase::Loading.on(PhaseEvent::ConnectFailed))
            }
        }
    }

    async fn load<P: Provider, C: ContentStore>(env: &AppEnv<P, C>) -> Result<Self> {
        let account = env.chain.active_account()?.clone();
        env.chain.require(&[HASH_STORAGE])?;

        Ok(RegisterPage {
            phase: Phase::Ready,
            form: RegisterForm::default(),
            errors: Vec::new(),
            status: FormStatus::default(),
            registered: false,
            viewer: Some(account),
        })
    }

    pub fn form_changed(mut self, form: RegisterForm) -> Self {
        self.form = form;
        self
    }

    fn validate(form: &RegisterForm) -> Vec<FieldError> {
        let mut errors = validate_credentials(&form.username, &form.password);
        if form.confirm_password != form.password {
            errors.push(FieldError::new("confirm_password", "passwords do not match"));
        }
        errors
    }

    /// Store the profile document and link its hash to the wallet
    /// address. An address that already holds a hash is rejected before
    /// any write is issued.
    pub async fn submit<P: Provider, C: ContentStore>(mut self, env: &AppEnv<P, C>) -> Self {
        if self.status.is_submitting() {
            return self;
        }
        let Some(viewer) = self.viewer.clone() else {
            return self;
        };

        self.errors = Self::validate(&self.form);
        if !self.errors.is_empty() {
            return self;
        }

        self.status = FormStatus::Submitting;

        match env.chain.hash_storage().account_has_hash(&viewer).await {
            Ok(false) => {}
            Ok(true) => {
                self.status = FormStatus::failed("this wallet already has an account");
                return self;
            }
            Err(e) => {
                self.status = FormStatus::failed(e.to_string());
                return self;
            }
        }

        let profile = UserProfile {
            username: self.form.username.trim().to_string(),
            email: self.form.email.trim().to_string(),
            firstname: self.form.firstname.trim().to_string(),
            lastname: self.form.lastname.trim().to_string(),
            password: self.form.password.clone(),
            state: self.form.state.trim().to_string(),
            city: self.form.city.trim().to_string(),
        };

        let stored: Result<()> = async {
            let bytes = ipfs::to_document(&profile)?;
            let hash = env.content.add(bytes).await?;
            env.chain.hash_storage().set_account_hash(&hash).await?;
            Ok(())
        }
        .await;

        match stored {
            Ok(()) => {
                // A fresh registration invalidates whatever session was
                // live; the new member logs in explicitly.
                env.session.end();
                self.registered = true;
                self.status = FormStatus::Succeeded;
            }
            Err(e) => self.status = FormStatus::failed(e.to_string()),
        }
        self
    }
}

// ─────────────────────────────────────────────────────────
// Logout
// ─────────────────────────────────────────────────────────

/// End the viewer's session unconditionally.
pub fn logout<P: Provider, C: ContentStore>(env: &AppEnv<P, C>) {
    env.session.end();
}
