//! 인증 및 인가 모듈.
//!
//! JWT 기반 인증의 전체 흐름을 담당합니다:
//!
//! - [`TokenCodec`]: 토큰 발급과 검증
//! - [`verify_credentials`]: 이메일/비밀번호 자격 증명 확인
//! - [`resolve_identity`]: 검증된 클레임을 저장된 계정과 대조
//! - [`authenticate_request`]: 요청별 인증 컨텍스트 구성 미들웨어
//! - [`AccessPolicy`]: 경로/메서드별 필요 권한 테이블
//! - [`CurrentIdentity`]: 핸들러에서 인증된 주체를 꺼내는 extractor

mod credentials;
mod identity;
mod jwt;
mod middleware;
mod password;
mod policy;

pub use credentials::{verify_credentials, CredentialError};
pub use identity::{resolve_identity, AuthContext, CurrentIdentity, IdentityError, Principal};
pub use jwt::{Claims, JwtError, TokenCodec};
pub use middleware::authenticate_request;
pub use password::{
    dummy_hash, hash_password, validate_password_strength, verify_password, PasswordError,
};
pub use policy::{AccessPolicy, PolicyDecision, RequiredAuthority, RouteRule};
