//! Token enhancers
//!
//! Enhancers run in order after the standard claims are built and before the
//! token is signed. Each one may add custom claims; registered claims are
//! protected by [`Claims::set_custom`].

use std::sync::Arc;

use oauth2_token::Claims;
use serde_json::{Map, Value};

use crate::users::UserDirectory;

pub trait TokenEnhancer: Send + Sync {
    fn enhance(&self, claims: &mut Claims);
}

/// Ordered list of enhancers applied to every minted token.
#[derive(Default, Clone)]
pub struct EnhancerChain {
    enhancers: Vec<Arc<dyn TokenEnhancer>>,
}

impl EnhancerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, enhancer: impl TokenEnhancer + 'static) -> Self {
        self.enhancers.push(Arc::new(enhancer));
        self
    }

    pub fn len(&self) -> usize {
        self.enhancers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enhancers.is_empty()
    }
}

impl TokenEnhancer for EnhancerChain {
    fn enhance(&self, claims: &mut Claims) {
        for enhancer in &self.enhancers {
            enhancer.enhance(claims);
        }
    }
}

/// Copies the subject's display name and email into the token.
pub struct UserDetailsEnhancer {
    users: Arc<UserDirectory>,
}

impl UserDetailsEnhancer {
    pub fn new(users: Arc<UserDirectory>) -> Self {
        Self { users }
    }
}

impl TokenEnhancer for UserDetailsEnhancer {
    fn enhance(&self, claims: &mut Claims) {
        let Some(user) = self.users.get(&claims.sub) else {
            return;
        };
        if let Some(name) = &user.name {
            claims.set_custom("name", Value::String(name.clone()));
        }
        if let Some(email) = &user.email {
            claims.set_custom("email", Value::String(email.clone()));
        }
    }
}

/// Adds a fixed set of claims from configuration.
pub struct StaticClaimsEnhancer {
    claims: Map<String, Value>,
}

impl StaticClaimsEnhancer {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self { claims }
    }
}

impl TokenEnhancer for StaticClaimsEnhancer {
    fn enhance(&self, claims: &mut Claims) {
        for (name, value) in &self.claims {
            claims.set_custom(name.clone(), value.clone());
        }
    }
}
