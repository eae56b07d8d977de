//! JSON wire types.
//!
//! Every type derives `utoipa::ToSchema` so the REST server can publish an OpenAPI
//! document. Conversions from core types live next to the types they produce.

use medinfo_core::{Credentials, MedicineRecord, RemoteSummary, SearchOutcome, UserProfile};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub id: u32,
    pub name: String,
    pub category: String,
    pub uses: String,
    pub dosage: String,
    pub side_effects: String,
    pub precautions: String,
    /// Cosmetic accent colour: blue, emerald, indigo or rose.
    pub color: String,
}

impl From<&MedicineRecord> for Medicine {
    fn from(m: &MedicineRecord) -> Self {
        let color = match m.color_tag {
            medinfo_core::ColorTag::Blue => "blue",
            medinfo_core::ColorTag::Emerald => "emerald",
            medinfo_core::ColorTag::Indigo => "indigo",
            medinfo_core::ColorTag::Rose => "rose",
        };
        Self {
            id: m.id,
            name: m.name.into(),
            category: m.category.into(),
            uses: m.uses.into(),
            dosage: m.dosage.into(),
            side_effects: m.side_effects.into(),
            precautions: m.precautions.into(),
            color: color.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListMedicinesRes {
    pub medicines: Vec<Medicine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Summary {
    pub title: String,
    pub description: Option<String>,
    pub extract: String,
    pub thumbnail_url: Option<String>,
    pub page_url: String,
}

impl From<&RemoteSummary> for Summary {
    fn from(s: &RemoteSummary) -> Self {
        Self {
            title: s.title.clone(),
            description: s.description.clone(),
            extract: s.extract.clone(),
            thumbnail_url: s.thumbnail_url.clone(),
            page_url: s.page_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SearchOutcomeKind {
    NoQuery,
    Local,
    Remote,
    NoInformation,
    Superseded,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Search term; blank or missing clears the results.
    pub q: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchRes {
    pub query: Option<String>,
    pub outcome: SearchOutcomeKind,
    pub medicines: Vec<Medicine>,
    pub summary: Option<Summary>,
}

impl SearchRes {
    pub fn new(query: Option<String>, outcome: &SearchOutcome) -> Self {
        let query = query.map(|q| q.trim().to_owned()).filter(|q| !q.is_empty());
        let (kind, medicines, summary) = match outcome {
            SearchOutcome::NoQuery => (SearchOutcomeKind::NoQuery, Vec::new(), None),
            SearchOutcome::Local(records) => (
                SearchOutcomeKind::Local,
                records.iter().map(|m| Medicine::from(*m)).collect(),
                None,
            ),
            SearchOutcome::Remote(s) => (SearchOutcomeKind::Remote, Vec::new(), Some(s.into())),
            SearchOutcome::NoInformation => (SearchOutcomeKind::NoInformation, Vec::new(), None),
            SearchOutcome::Superseded => (SearchOutcomeKind::Superseded, Vec::new(), None),
        };
        Self {
            query,
            outcome: kind,
            medicines,
            summary,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryRes {
    /// Most recent first, at most five entries.
    pub entries: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrendingRes {
    pub queries: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoginMode {
    #[default]
    SignIn,
    Register,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    #[serde(default)]
    pub mode: LoginMode,
    /// Required when registering.
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    pub password: String,
}

impl LoginReq {
    pub fn into_credentials(self) -> Credentials {
        match self.mode {
            LoginMode::SignIn => Credentials::SignIn {
                email: self.email,
                password: self.password,
            },
            LoginMode::Register => Credentials::Register {
                name: self.name.unwrap_or_default(),
                email: self.email,
                password: self.password,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub role: String,
    pub verified: bool,
    pub join_date: String,
}

impl From<UserProfile> for Profile {
    fn from(p: UserProfile) -> Self {
        Self {
            name: p.name,
            email: p.email,
            role: p.role,
            verified: p.verified,
            join_date: p.join_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionRes {
    pub authenticated: bool,
    pub profile: Option<Profile>,
}

impl SessionRes {
    pub fn from_profile(profile: Option<UserProfile>) -> Self {
        Self {
            authenticated: profile.is_some(),
            profile: profile.map(Profile::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_res_for_local_outcome() {
        let record = medinfo_core::catalogue::find_by_id(5).unwrap();
        let res = SearchRes::new(
            Some(" aspirin ".into()),
            &SearchOutcome::Local(vec![record]),
        );

        assert_eq!(res.query.as_deref(), Some("aspirin"));
        assert_eq!(res.outcome, SearchOutcomeKind::Local);
        assert_eq!(res.medicines.len(), 1);
        assert_eq!(res.medicines[0].color, "blue");
        assert!(res.summary.is_none());
    }

    #[test]
    fn test_search_res_serializes_outcome_snake_case() {
        let res = SearchRes::new(Some("".into()), &SearchOutcome::NoInformation);
        let value = serde_json::to_value(&res).unwrap();
        assert_eq!(value["outcome"], "no_information");
        assert!(value["query"].is_null());
    }

    #[test]
    fn test_login_req_defaults_to_sign_in() {
        let req: LoginReq =
            serde_json::from_str(r#"{"email": "a@b.org", "password": "pw"}"#).unwrap();
        assert!(matches!(req.into_credentials(), Credentials::SignIn { .. }));

        let req: LoginReq = serde_json::from_str(
            r#"{"mode": "register", "name": "Jane", "email": "a@b.org", "password": "pw"}"#,
        )
        .unwrap();
        assert!(matches!(
            req.into_credentials(),
            Credentials::Register { ref name, .. } if name == "Jane"
        ));
    }

    #[test]
    fn test_medicine_dto_uses_camel_case() {
        let value =
            serde_json::to_value(Medicine::from(medinfo_core::catalogue::find_by_id(2).unwrap()))
                .unwrap();
        assert!(value.get("sideEffects").is_some());
        assert_eq!(value["color"], "emerald");
    }
}
