//! 사용자에게 연결된 전화번호.

use serde::{Deserialize, Serialize};

/// 전화번호 값 객체.
///
/// 전화번호는 소유한 사용자를 통해서만 접근되며, 사용자가 삭제되면
/// 함께 제거됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Phone {
    /// 전화번호
    pub number: String,
    /// 도시 코드
    pub city_code: String,
    /// 국가 코드
    pub country_code: String,
}

impl Phone {
    /// 새 전화번호를 생성합니다.
    pub fn new(
        number: impl Into<String>,
        city_code: impl Into<String>,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            number: number.into(),
            city_code: city_code.into(),
            country_code: country_code.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_serializes_camel_case() {
        let phone = Phone::new("987654321", "33", "56");
        let json = serde_json::to_value(&phone).unwrap();

        assert_eq!(json["number"], "987654321");
        assert_eq!(json["cityCode"], "33");
        assert_eq!(json["countryCode"], "56");
    }

    #[test]
    fn test_phone_round_trip() {
        let json = r#"{"number":"12345678","cityCode":"2","countryCode":"56"}"#;
        let phone: Phone = serde_json::from_str(json).unwrap();

        assert_eq!(phone, Phone::new("12345678", "2", "56"));
    }
}
