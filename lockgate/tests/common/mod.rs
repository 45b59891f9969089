#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use lockgate::{CredentialVerifier, Verification, VerifierError};

pub const EMAIL: &str = "test@example.com";
pub const PASSWORD: &str = "password";

/// Verifier backed by a fixed email to password map.
#[derive(Default)]
pub struct StaticUsers {
    users: HashMap<String, String>,
    calls: AtomicUsize,
}

impl StaticUsers {
    pub fn with_user(mut self, email: &str, password: &str) -> Self {
        self.users.insert(email.to_string(), password.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialVerifier for StaticUsers {
    type Payload = String;

    async fn verify(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Verification<String>, VerifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.users.get(email) {
            Some(stored) if stored == password => Ok(Verification::Matched(email.to_string())),
            _ => Ok(Verification::Mismatched),
        }
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
