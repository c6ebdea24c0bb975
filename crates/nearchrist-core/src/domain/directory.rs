//! 디렉터리 레코드.
//!
//! 주(State), 교구(Diocese), 본당(Parish), 성체조배(Adoration),
//! 묵주기도 십자군(Crusade) 레코드를 정의합니다.
//! JSON 필드명은 웹 클라이언트와 동일한 camelCase를 사용합니다.

use chrono::NaiveTime;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use validator::Validate;

use crate::error::DirectoryResult;

/// 디렉터리 저장소에 보관되는 레코드.
///
/// 요청 본문도 같은 타입으로 역직렬화되며, 클라이언트가 보낸 ID는 무시됩니다.
pub trait DirectoryRecord:
    Clone + Serialize + DeserializeOwned + Validate + Send + Sync + 'static
{
    /// 로그와 에러 메시지에 사용할 레코드 종류 이름.
    const KIND: &'static str;

    /// 레코드 ID.
    fn id(&self) -> i64;

    /// 저장소가 ID를 부여할 때 호출합니다.
    fn assign_id(&mut self, id: i64);

    /// 필수 필드를 검사합니다.
    fn check_required(&self) -> DirectoryResult<()> {
        self.validate()?;
        Ok(())
    }
}

/// 주 (예: Tasmania).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct State {
    #[serde(default)]
    pub state_id: i64,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub state_name: String,
    #[serde(default)]
    pub state_abbreviation: Option<String>,
}

impl State {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            state_id: 0,
            state_name: name.into(),
            state_abbreviation: None,
        }
    }
}

impl DirectoryRecord for State {
    const KIND: &'static str = "state";

    fn id(&self) -> i64 {
        self.state_id
    }

    fn assign_id(&mut self, id: i64) {
        self.state_id = id;
    }
}

/// 교구.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Diocese {
    #[serde(default)]
    pub diocese_id: i64,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub diocese_name: String,
    #[serde(default)]
    pub diocese_street_no: Option<String>,
    #[serde(default)]
    pub diocese_street_name: Option<String>,
    #[serde(default)]
    pub diocese_suburb: Option<String>,
    #[serde(default)]
    pub diocese_postcode: Option<String>,
    #[serde(default)]
    pub diocese_phone: Option<String>,
    #[serde(default)]
    pub diocese_email: Option<String>,
    #[serde(default)]
    pub diocese_website: Option<String>,
    #[serde(default)]
    pub state_id: Option<i64>,
}

impl DirectoryRecord for Diocese {
    const KIND: &'static str = "diocese";

    fn id(&self) -> i64 {
        self.diocese_id
    }

    fn assign_id(&mut self, id: i64) {
        self.diocese_id = id;
    }
}

/// 본당.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Parish {
    #[serde(default)]
    pub parish_id: i64,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub parish_name: String,
    #[serde(default)]
    pub parish_st_number: Option<String>,
    #[serde(default)]
    pub parish_st_name: Option<String>,
    #[serde(default)]
    pub parish_suburb: Option<String>,
    #[serde(default)]
    pub parish_postcode: Option<String>,
    #[serde(default)]
    pub parish_phone: Option<String>,
    #[serde(default)]
    pub parish_email: Option<String>,
    #[serde(default)]
    pub parish_website: Option<String>,
    #[serde(default)]
    pub diocese_id: Option<i64>,
    #[serde(default)]
    pub state_id: Option<i64>,
}

impl DirectoryRecord for Parish {
    const KIND: &'static str = "parish";

    fn id(&self) -> i64 {
        self.parish_id
    }

    fn assign_id(&mut self, id: i64) {
        self.parish_id = id;
    }
}

/// 성체조배 일정.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Adoration {
    #[serde(default)]
    pub adoration_id: i64,
    /// 예: "Perpetual", "Weekly"
    #[serde(default)]
    #[validate(length(min = 1))]
    pub adoration_type: String,
    #[serde(default)]
    pub adoration_location: Option<String>,
    #[serde(default)]
    pub adoration_location_type: Option<String>,
    #[serde(default)]
    pub adoration_day: Option<String>,
    #[serde(default)]
    #[cfg_attr(feature = "utoipa-support", schema(value_type = Option<String>, example = "19:00:00"))]
    pub adoration_start: Option<NaiveTime>,
    #[serde(default)]
    #[cfg_attr(feature = "utoipa-support", schema(value_type = Option<String>, example = "20:00:00"))]
    pub adoration_end: Option<NaiveTime>,
    #[serde(default)]
    pub state_id: Option<i64>,
    #[serde(default)]
    pub diocese_id: Option<i64>,
    #[serde(default)]
    pub parish_id: Option<i64>,
}

impl DirectoryRecord for Adoration {
    const KIND: &'static str = "adoration";

    fn id(&self) -> i64 {
        self.adoration_id
    }

    fn assign_id(&mut self, id: i64) {
        self.adoration_id = id;
    }
}

/// 묵주기도 십자군 일정.
///
/// 필수 필드가 없으므로 빈 객체도 유효합니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Crusade {
    #[serde(default)]
    pub crusade_id: i64,
    #[serde(default)]
    pub state_id: Option<i64>,
    #[serde(default)]
    pub diocese_id: Option<i64>,
    #[serde(default)]
    pub parish_id: Option<i64>,
    #[serde(default)]
    #[cfg_attr(feature = "utoipa-support", schema(value_type = Option<String>))]
    pub confession_start_time: Option<NaiveTime>,
    #[serde(default)]
    #[cfg_attr(feature = "utoipa-support", schema(value_type = Option<String>))]
    pub confession_end_time: Option<NaiveTime>,
    #[serde(default)]
    #[cfg_attr(feature = "utoipa-support", schema(value_type = Option<String>))]
    pub mass_start_time: Option<NaiveTime>,
    #[serde(default)]
    #[cfg_attr(feature = "utoipa-support", schema(value_type = Option<String>))]
    pub mass_end_time: Option<NaiveTime>,
    #[serde(default)]
    #[cfg_attr(feature = "utoipa-support", schema(value_type = Option<String>))]
    pub crusade_start_time: Option<NaiveTime>,
    #[serde(default)]
    #[cfg_attr(feature = "utoipa-support", schema(value_type = Option<String>))]
    pub crusade_end_time: Option<NaiveTime>,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
}

impl DirectoryRecord for Crusade {
    const KIND: &'static str = "crusade";

    fn id(&self) -> i64 {
        self.crusade_id
    }

    fn assign_id(&mut self, id: i64) {
        self.crusade_id = id;
    }
}
