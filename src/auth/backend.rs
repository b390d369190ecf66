use crate::{
    auth::verifier::CredentialVerifier,
    data::user::User,
    error::GateError,
};
use axum_login::{AuthnBackend, UserId};
use secrecy::SecretString;
use std::sync::Arc;

#[derive(Clone)]
pub struct GateAuthBackend {
    verifier: Arc<dyn CredentialVerifier>,
}

impl GateAuthBackend {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { verifier }
    }
}

pub struct GateAuthCredentials {
    pub user_id: String,
    pub phrase: Option<SecretString>,
}

impl AuthnBackend for GateAuthBackend {
    type User = User;
    type Credentials = GateAuthCredentials;
    type Error = GateError;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        let GateAuthCredentials { user_id, phrase } = creds;
        let Some(user) = User::find_staff(&user_id) else {
            return Ok(None);
        };

        if !user.role.requires_phrase() {
            return Ok(Some(user.clone()));
        }

        let Some(phrase) = phrase else {
            return Ok(None);
        };

        Ok(if self.verifier.verify(user.role, phrase).await? {
            Some(user.clone())
        } else {
            warn!(user = user.id, "Rejected authorization key");
            None
        })
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        Ok(User::find_staff(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::verifier::SharedPhraseVerifier, config::auth::PhraseConfig};

    fn backend() -> GateAuthBackend {
        let verifier = SharedPhraseVerifier::with_cost(
            &PhraseConfig {
                admin_phrase: SecretString::from("humble"),
                nurse_phrase: SecretString::from("medical"),
            },
            4,
        )
        .unwrap();
        GateAuthBackend::new(Arc::new(verifier))
    }

    fn creds(user_id: &str, phrase: Option<&str>) -> GateAuthCredentials {
        GateAuthCredentials {
            user_id: user_id.into(),
            phrase: phrase.map(SecretString::from),
        }
    }

    #[tokio::test]
    async fn teacher_and_security_need_no_phrase() {
        let backend = backend();
        for id in ["teacher1", "sec1"] {
            let user = backend.authenticate(creds(id, None)).await.unwrap();
            assert_eq!(user.map(|u| u.id), Some(id));
        }
    }

    #[tokio::test]
    async fn admin_needs_the_right_phrase() {
        let backend = backend();
        assert!(backend.authenticate(creds("admin1", None)).await.unwrap().is_none());
        assert!(
            backend
                .authenticate(creds("admin1", Some("medical")))
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            backend
                .authenticate(creds("admin1", Some(" Humble")))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn unknown_users_are_nobody() {
        let backend = backend();
        assert!(backend.authenticate(creds("ghost", Some("humble"))).await.unwrap().is_none());
        assert!(backend.get_user(&"ghost".to_string()).await.unwrap().is_none());
        assert!(backend.get_user(&"nurse1".to_string()).await.unwrap().is_some());
    }
}
