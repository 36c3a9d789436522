use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use axum::extract::FromRef;
use axum_extra::extract::cookie::{Cookie, SameSite};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{config::SessionConfig, state::AppState};

pub const SESSION_COOKIE: &str = "tubescribe_session";

/// Signed session payload stored in the session cookie.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,      // user ID
    pub sid: Uuid,      // session ID, used for revocation
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    pub remember: bool, // persistent cookie
}

#[derive(Clone)]
pub struct SessionKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
    pub remember_ttl: Duration,
    pub secure_cookies: bool,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        let SessionConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
            remember_ttl_days,
            ..
        } = state.config.session.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            ttl: Duration::from_secs((ttl_minutes.max(1) as u64) * 60),
            remember_ttl: Duration::from_secs((remember_ttl_days.max(1) as u64) * 24 * 3600),
            secure_cookies: state.config.production,
        }
    }
}

/// A freshly signed session.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub claims: Claims,
}

impl SessionKeys {
    pub fn issue(&self, user_id: Uuid, remember: bool) -> anyhow::Result<IssuedSession> {
        self.issue_at(user_id, remember, OffsetDateTime::now_utc())
    }

    pub(crate) fn issue_at(
        &self,
        user_id: Uuid,
        remember: bool,
        now: OffsetDateTime,
    ) -> anyhow::Result<IssuedSession> {
        let ttl = if remember { self.remember_ttl } else { self.ttl };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            sid: Uuid::new_v4(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            remember,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, remember, "session signed");
        Ok(IssuedSession { token, claims })
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    /// Cookie carrying `session`. Without "remember" it lives as long as the browser.
    pub fn cookie(&self, session: &IssuedSession) -> Cookie<'static> {
        let mut builder = Cookie::build((SESSION_COOKIE, session.token.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookies);
        if session.claims.remember {
            builder = builder.max_age(TimeDuration::seconds(self.remember_ttl.as_secs() as i64));
        }
        builder.build()
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, ""))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookies)
            .build()
    }
}

/// Session ids revoked by logout, kept until their natural expiry.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    revoked: Mutex<HashMap<Uuid, usize>>,
}

impl SessionRegistry {
    pub fn revoke(&self, claims: &Claims) {
        let mut revoked = self.revoked.lock().unwrap_or_else(PoisonError::into_inner);
        revoked.insert(claims.sid, claims.exp);
    }

    pub fn is_revoked(&self, sid: Uuid) -> bool {
        let revoked = self.revoked.lock().unwrap_or_else(PoisonError::into_inner);
        revoked.contains_key(&sid)
    }

    /// Forget revocations whose session would have expired anyway.
    pub fn cleanup(&self, now: OffsetDateTime) {
        let now = now.unix_timestamp() as usize;
        let mut revoked = self.revoked.lock().unwrap_or_else(PoisonError::into_inner);
        revoked.retain(|_, exp| *exp > now);
    }
}
