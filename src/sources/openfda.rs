use std::borrow::Cow;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::FaersError;
use crate::utils::serde::StringOrVec;

pub(crate) const OPENFDA_BASE: &str = "https://api.fda.gov";
const OPENFDA_API: &str = "openfda";
const MAX_COUNT_LIMIT: usize = 1000;

pub struct OpenFdaClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

impl OpenFdaClient {
    pub fn new() -> Result<Self, FaersError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Borrowed(OPENFDA_BASE),
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(base: String) -> Result<Self, FaersError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
        })
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.as_ref().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub(crate) fn escape_query_value(value: &str) -> String {
        crate::utils::query::escape_lucene_value(value)
    }

    /// Sends `req` and decodes the body. openFDA answers 404 when a search
    /// matches nothing, which maps to `Ok(None)`.
    async fn get_json_optional<T: DeserializeOwned>(
        &self,
        req: reqwest_middleware::RequestBuilder,
    ) -> Result<Option<T>, FaersError> {
        let resp = req.send().await?;
        let status = resp.status();
        let content_type = resp.headers().get(reqwest::header::CONTENT_TYPE).cloned();
        let bytes = crate::sources::read_limited_body(resp, OPENFDA_API).await?;

        if status.as_u16() == 404 {
            return Ok(None);
        }

        if !status.is_success() {
            let excerpt = crate::sources::body_excerpt(&bytes);
            return Err(FaersError::Api {
                api: OPENFDA_API.to_string(),
                message: format!("HTTP {status}: {excerpt}"),
            });
        }

        crate::sources::ensure_json_content_type(OPENFDA_API, content_type.as_ref(), &bytes)?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| FaersError::ApiJson {
                api: OPENFDA_API.to_string(),
                source,
            })
    }

    /// Looks up at most one drug label whose generic name matches `generic_name` exactly.
    pub async fn label_search_exact(
        &self,
        generic_name: &str,
    ) -> Result<Option<OpenFdaResponse<LabelResult>>, FaersError> {
        let generic_name = generic_name.trim();
        if generic_name.is_empty() {
            return Err(FaersError::InvalidArgument(
                "Generic name is required for a label lookup".into(),
            ));
        }
        if generic_name.len() > 256 {
            return Err(FaersError::InvalidArgument(
                "Generic name is too long.".into(),
            ));
        }

        let escaped = Self::escape_query_value(generic_name);
        let q = format!("openfda.generic_name.exact:\"{escaped}\"");

        let url = self.endpoint("drug/label.json");
        let req = self
            .client
            .get(&url)
            .query(&[("search", q.as_str()), ("limit", "1")]);
        self.get_json_optional(req).await
    }

    /// Returns `meta.results.total` for a zero-limit FAERS search.
    pub async fn faers_total(&self, query: &str) -> Result<usize, FaersError> {
        let query = validated_query(query)?;

        let url = self.endpoint("drug/event.json");
        let req = self
            .client
            .get(&url)
            .query(&[("search", query), ("limit", "0")]);
        let resp: Option<OpenFdaTotalResponse> = self.get_json_optional(req).await?;
        Ok(resp.map(|r| r.meta.results.total).unwrap_or_default())
    }

    pub async fn faers_count(
        &self,
        query: &str,
        count_field: &str,
        limit: usize,
    ) -> Result<Option<OpenFdaCountResponse>, FaersError> {
        let query = validated_query(query)?;
        let count_field = count_field.trim();
        if count_field.is_empty() {
            return Err(FaersError::InvalidArgument(
                "A count query requires a field name".into(),
            ));
        }
        if limit == 0 || limit > MAX_COUNT_LIMIT {
            return Err(FaersError::InvalidArgument(format!(
                "Count limit must be between 1 and {MAX_COUNT_LIMIT}"
            )));
        }

        let url = self.endpoint("drug/event.json");
        let req = self.client.get(&url).query(&[
            ("search", query),
            ("count", count_field),
            ("limit", &limit.to_string()),
        ]);
        let value: Option<serde_json::Value> = self.get_json_optional(req).await?;
        let Some(value) = value else {
            return Ok(None);
        };

        if let Some(error) = value.get("error").and_then(serde_json::Value::as_object) {
            let code = error
                .get("code")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default();
            if code.eq_ignore_ascii_case("NOT_FOUND") {
                return Ok(None);
            }
            let details = error
                .get("message")
                .or_else(|| error.get("details"))
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default();
            return Err(FaersError::Api {
                api: OPENFDA_API.to_string(),
                message: format!("{code}: {details}"),
            });
        }

        serde_json::from_value::<OpenFdaCountResponse>(value)
            .map(Some)
            .map_err(|source| FaersError::ApiJson {
                api: OPENFDA_API.to_string(),
                source,
            })
    }

    /// Fetches the full FAERS report with the given `safetyreportid`.
    pub async fn faers_report(
        &self,
        report_id: &str,
    ) -> Result<Option<FaersEventResult>, FaersError> {
        let report_id = report_id.trim();
        if report_id.is_empty() {
            return Err(FaersError::InvalidArgument("Report id is required".into()));
        }

        let q = format!(
            "safetyreportid:\"{}\"",
            Self::escape_query_value(report_id)
        );
        let url = self.endpoint("drug/event.json");
        let req = self
            .client
            .get(&url)
            .query(&[("search", q.as_str()), ("limit", "1")]);
        let resp: Option<OpenFdaResponse<FaersEventResult>> = self.get_json_optional(req).await?;
        Ok(resp.and_then(|r| r.results.into_iter().next()))
    }
}

fn validated_query(query: &str) -> Result<&str, FaersError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(FaersError::InvalidArgument("Query is required.".into()));
    }
    if query.len() > 1024 {
        return Err(FaersError::InvalidArgument("Query is too long.".into()));
    }
    Ok(query)
}

#[derive(Debug, Deserialize)]
pub struct OpenFdaResponse<T> {
    #[serde(default)]
    #[allow(dead_code)]
    pub meta: Option<OpenFdaMeta>,
    #[serde(default)]
    pub results: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct OpenFdaTotalResponse {
    pub meta: OpenFdaMeta,
}

#[derive(Debug, Deserialize)]
pub struct OpenFdaMeta {
    pub results: OpenFdaMetaResults,
}

#[derive(Debug, Deserialize)]
pub struct OpenFdaMetaResults {
    #[serde(default)]
    #[allow(dead_code)]
    pub skip: usize,
    #[serde(default)]
    #[allow(dead_code)]
    pub limit: usize,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct OpenFdaCountResponse {
    #[serde(default)]
    pub results: Vec<OpenFdaCountBucket>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenFdaCountBucket {
    pub term: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelResult {
    #[serde(default)]
    pub openfda: Option<LabelOpenFda>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelOpenFda {
    #[serde(default)]
    pub product_type: StringOrVec,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaersEventResult {
    #[serde(default)]
    pub safetyreportid: Option<String>,
    #[serde(default)]
    pub receiptdate: Option<String>,
    /// `Some(None)` when the key is present with a null value.
    #[serde(default, deserialize_with = "crate::utils::serde::present")]
    pub occurcountry: Option<Option<String>>,
    #[serde(default)]
    pub patient: Option<FaersPatient>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaersPatient {
    #[serde(default)]
    pub patientonsetage: Option<String>,
    #[serde(default, deserialize_with = "crate::utils::serde::present")]
    pub patientsex: Option<Option<String>>,
    #[serde(default)]
    pub reaction: Vec<FaersReaction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaersReaction {
    #[serde(default)]
    pub reactionmeddrapt: Option<String>,
}
