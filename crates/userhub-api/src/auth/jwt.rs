//! JWT 토큰 처리.
//!
//! 토큰 발급(encode) 및 검증(decode) 로직. 서명 시크릿, 발급자, 대상,
//! 알고리즘은 기동 시 한 번 [`TokenCodec`]에 고정되며 이후 변경되지
//! 않습니다.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use userhub_core::config::{AuthConfig, MIN_SECRET_BYTES};
use userhub_core::error::{UserHubError, UserHubResult};

/// JWT 토큰 페이로드.
///
/// 사용자 식별자와 권한 역할을 포함합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - 사용자 이메일
    pub sub: String,
    /// Issuer - 토큰 발급자
    pub iss: String,
    /// Audience - 토큰 대상
    pub aud: String,
    /// 토큰에 내장된 역할 이름 목록
    pub roles: Vec<String>,
    /// Issued At - 토큰 발급 시간 (Unix timestamp)
    pub iat: i64,
    /// Expiration - 토큰 만료 시간 (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// 토큰이 만료되었는지 확인.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    /// 만료 시각을 UTC 타임스탬프로 반환.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// JWT 처리 에러.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("토큰 인코딩 실패: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),
    #[error("토큰 디코딩 실패")]
    DecodingError,
    #[error("토큰이 만료되었습니다")]
    TokenExpired,
    #[error("잘못된 토큰 형식")]
    InvalidToken,
    #[error("토큰 서명이 올바르지 않습니다")]
    InvalidSignature,
    #[error("토큰 발급자가 일치하지 않습니다")]
    InvalidIssuer,
    #[error("토큰 대상이 일치하지 않습니다")]
    InvalidAudience,
}

/// 토큰 발급/검증기.
///
/// 한 번 생성되면 내부 상태가 변하지 않으므로 여러 요청이 동시에
/// 공유해도 안전합니다.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    validation: Validation,
    issuer: String,
    audience: String,
    ttl: Duration,
}

// `EncodingKey`/`DecodingKey`는 Debug를 구현하지 않으므로 (시크릿 보호)
// 키 필드를 제외하고 수동으로 구현합니다.
impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// 인증 설정으로부터 코덱을 생성합니다.
    ///
    /// 시크릿 길이와 알고리즘은 여기서 한 번만 검사합니다. 실패하면
    /// 서비스는 기동을 중단해야 합니다.
    ///
    /// # Errors
    ///
    /// 시크릿이 32바이트 미만이거나 알고리즘이 HS256/HS384/HS512가
    /// 아니면 [`UserHubError::Config`]를 반환합니다.
    pub fn from_config(config: &AuthConfig) -> UserHubResult<Self> {
        if config.secret.len() < MIN_SECRET_BYTES {
            return Err(UserHubError::Config(format!(
                "signing secret must be at least {} bytes, got {}",
                MIN_SECRET_BYTES,
                config.secret.len()
            )));
        }

        let algorithm = match config.algorithm.as_str() {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => {
                return Err(UserHubError::Config(format!(
                    "unsupported signing algorithm: {}",
                    other
                )))
            }
        };

        if config.token_ttl_millis == 0 {
            return Err(UserHubError::Config(
                "token ttl must be greater than zero".to_string(),
            ));
        }

        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.validate_exp = true;
        // 만료 판정에 유예 시간을 두지 않습니다 (기본값은 60초).
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            header: Header::new(algorithm),
            validation,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl: Duration::milliseconds(config.token_ttl_millis as i64),
        })
    }

    /// 토큰 수명을 반환합니다.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 주어진 사용자에 대한 토큰을 발급합니다.
    ///
    /// # Arguments
    ///
    /// * `subject` - 사용자 이메일
    /// * `roles` - 토큰에 내장할 역할 이름 목록
    ///
    /// # Returns
    ///
    /// 인코딩된 JWT 문자열
    pub fn encode(&self, subject: &str, roles: &[String]) -> Result<String, JwtError> {
        self.encode_at(subject, roles, Utc::now())
    }

    /// 발급 시각을 지정해 토큰을 발급합니다.
    ///
    /// 만료 시각은 `issued_at + ttl`로 고정되므로 만료 동작을 결정적으로
    /// 검증할 수 있습니다.
    pub fn encode_at(
        &self,
        subject: &str,
        roles: &[String],
        issued_at: DateTime<Utc>,
    ) -> Result<String, JwtError> {
        let claims = Claims {
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            roles: roles.to_vec(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };

        encode(&self.header, &claims, &self.encoding_key).map_err(JwtError::from)
    }

    /// 토큰을 디코딩하고 서명/만료/발급자/대상을 검증합니다.
    ///
    /// # Errors
    ///
    /// 검증에 실패하면 실패 원인별 [`JwtError`] 변형을 반환합니다.
    pub fn decode(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
                jsonwebtoken::errors::ErrorKind::InvalidAudience => JwtError::InvalidAudience,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                jsonwebtoken::errors::ErrorKind::InvalidToken => JwtError::InvalidToken,
                _ => JwtError::DecodingError,
            })
    }
}
